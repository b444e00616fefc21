// Copyright (c) 2024 <Wei Li>.
//
// This source code is licensed under the GNU license found in the
// LICENSE file in the root directory of this source tree.

//! The main routine of `ptrack`.
//!
//! Replays a recorded event trace through the same pipeline the live
//! callbacks use, then runs the teardown analysis. This makes the whole
//! partitioning reproducible offline: record once, re-partition under
//! different cost assumptions as often as needed.

use anyhow::{Context, Result};
use log::*;
use std::env;
use std::fs::File;
use std::io::BufReader;

use ptrack::analysis;
use ptrack::record::{cost, trace, EventSink};
use ptrack::util::options::AnalysisOptions;

fn main() -> Result<()> {
    if env::var("PTRACK_LOG").is_ok() {
        let e = env_logger::Env::new()
            .filter("PTRACK_LOG")
            .write_style("PTRACK_LOG_STYLE");
        env_logger::init_from_env(e);
    }

    let args = env::args().skip(1).collect::<Vec<_>>();
    let mut options = AnalysisOptions::default();
    options.parse_from_args(&args);
    info!("ptrack options: {:?}", options);

    let migration = options.migration_cost.unwrap_or(cost::MIGRATION_COST);
    let fault = options.fault_cost.unwrap_or(cost::PAGE_FAULT_COST);
    let mut sink = EventSink::with_costs(migration, fault);

    let file = File::open(&options.trace)
        .with_context(|| format!("cannot open trace '{}'", options.trace))?;
    let fed = trace::replay(BufReader::new(file), &mut sink)
        .with_context(|| format!("cannot replay trace '{}'", options.trace))?;
    debug!("replayed {} events from '{}'", fed, options.trace);

    let mut functions = sink.into_functions();
    analysis::run(&mut functions, &options);

    Ok(())
}
