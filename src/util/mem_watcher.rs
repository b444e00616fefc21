// Copyright (c) 2024 <Wei Li>.
//
// This source code is licensed under the GNU license found in the
// LICENSE file in the root directory of this source tree.

//! Memory usage monitoring for the teardown analysis. Only supported on
//! Linux; elsewhere the watcher reports nothing.

use log::error;
use nom::character::complete::{digit1, space1};
use nom::combinator::map_res;
use nom::multi::separated_list1;
use nom::IResult;
use std::fs::File;
use std::io::{Read, Result};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::util::map_result;

/// Memory usage processed from `/proc/self/statm`, in units of pages.
///
/// See `man 5 proc`.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct Statm {
    /// Total virtual memory size.
    pub size: usize,
    /// Resident non-swapped memory.
    pub resident: usize,
}

/// Peak resident memory over the watched period, sampled in a background
/// thread.
pub struct MemWatcher {
    initial_resident: usize,
    peak: Arc<AtomicUsize>,
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

/// The watcher's findings, in megabytes.
pub struct MemReport {
    pub initial_mb: usize,
    pub peak_mb: usize,
}

impl MemWatcher {
    /// Start sampling. If the statm file cannot be read (non-Linux), the
    /// watcher stays idle and later reports zeros.
    pub fn start() -> Self {
        let initial_resident = match statm_self() {
            Ok(statm) => statm.resident,
            Err(_) => {
                error!("Unable to read the statm file; memory reporting disabled");
                return MemWatcher {
                    initial_resident: 0,
                    peak: Arc::new(AtomicUsize::new(0)),
                    stop: Arc::new(AtomicBool::new(true)),
                    handle: None,
                };
            }
        };

        let peak = Arc::new(AtomicUsize::new(initial_resident));
        let stop = Arc::new(AtomicBool::new(false));

        let thread_peak = peak.clone();
        let thread_stop = stop.clone();
        let handle = thread::spawn(move || {
            while !thread_stop.load(Ordering::Relaxed) {
                if let Ok(statm) = statm_self() {
                    thread_peak.fetch_max(statm.resident, Ordering::Relaxed);
                }
                thread::sleep(Duration::from_millis(50));
            }
        });

        MemWatcher {
            initial_resident,
            peak,
            stop,
            handle: Some(handle),
        }
    }

    /// Stop sampling and report what was seen.
    pub fn stop(mut self) -> MemReport {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }

        MemReport {
            initial_mb: pages_to_megabytes(self.initial_resident),
            peak_mb: pages_to_megabytes(self.peak.load(Ordering::Relaxed)),
        }
    }
}

fn pages_to_megabytes(pages: usize) -> usize {
    pages * 4 / 1024
}

fn parse_usize(input: &str) -> IResult<&str, usize> {
    map_res(digit1, |s: &str| s.parse::<usize>())(input)
}

/// Parses the statm file format: seven space-separated page counts, of
/// which only the first two (size, resident) are interesting.
fn parse_statm(input: &str) -> IResult<&str, Statm> {
    map_res(separated_list1(space1, parse_usize), |fields| {
        if fields.len() < 2 {
            return Err("statm has too few fields");
        }
        Ok(Statm {
            size: fields[0],
            resident: fields[1],
        })
    })(input)
}

/// Returns memory status information for the current process.
pub fn statm_self() -> Result<Statm> {
    let mut buf = String::new();
    File::open("/proc/self/statm")?.read_to_string(&mut buf)?;
    map_result(parse_statm(buf.trim()))
}
