// Copyright (c) 2024 <Wei Li>.
//
// This source code is licensed under the GNU license found in the
// LICENSE file in the root directory of this source tree.

//! The teardown-time analysis.
//!
//! Once the traced program has finished it is safe to process everything the
//! recorder saw: load the parallelism hints, fold the recordings into the
//! cost graph, pin the functions that must stay on the host, cut the graph
//! between the two compute anchors and report the resulting placement.
//!
//! Progress lines go to stdout prefixed with `###`; warnings and errors use
//! `### WARNING:` and `### ERROR:` on stderr. The annotated cost graph ends
//! up in a DOT file for inspection.

use itertools::Itertools;
use log::info;
use std::env;
use std::fs::File;
use std::io::{stdout, BufReader, BufWriter};
use std::path::Path;
use std::time::{Duration, Instant};

use crate::graph::{is_compute_anchor, FunctionGraph, UndirectedGraph, PIN_WEIGHT};
use crate::record::known_names;
use crate::util::graph_stat;
use crate::util::mem_watcher::MemWatcher;
use crate::util::options::AnalysisOptions;

/// Run the full teardown analysis over the recorded function graph.
pub fn run(functions: &mut FunctionGraph, options: &AnalysisOptions) {
    let started = Instant::now();
    let watcher = MemWatcher::start();

    println!(
        "### Recorded {} calls and {} memory accesses.",
        functions.total_calls(),
        functions.total_accesses()
    );

    load_parallel(functions, options);

    if options.dump_stats {
        let mut writer = BufWriter::new(stdout());
        if let Err(e) = graph_stat::dump_stats(functions, &mut writer) {
            eprintln!("### WARNING: could not dump statistics: {}", e);
        }
    }
    if let Some(path) = &options.call_graph_output {
        draw_or_die(functions.call_graph(), path);
    }
    if let Some(path) = &options.fault_graph_output {
        draw_or_die(functions.fault_graph(), path);
    }

    partition(functions, options);

    let report = watcher.stop();
    if report.peak_mb > 0 {
        println!(
            "### Analysis used {} MB at peak ({} MB before analysis).",
            report.peak_mb, report.initial_mb
        );
    }
    let elapsed = Duration::from_millis(started.elapsed().as_millis() as u64);
    println!("### Analysis completed in {}.", humantime::format_duration(elapsed));
}

/// Mark the functions named by `--parallel` or the PTRACK_PARALLEL
/// environment variable as parallel. A missing or unreadable list is
/// reported once; the analysis then continues without parallelism hints.
fn load_parallel(functions: &mut FunctionGraph, options: &AnalysisOptions) {
    let path = options
        .parallel_file
        .clone()
        .or_else(|| env::var("PTRACK_PARALLEL").ok());

    let path = match path {
        Some(path) => path,
        None => {
            eprintln!("### WARNING: PTRACK_PARALLEL was not specified.");
            return;
        }
    };

    match File::open(&path) {
        Err(_) => {
            eprintln!("### WARNING: parallelism file '{}' could not be read.", path);
        }
        Ok(f) => {
            println!("### Loading parallelism data from '{}'.", path);
            if let Err(e) = functions.load_parallel_functions(BufReader::new(f)) {
                eprintln!("### WARNING: failed reading '{}': {}", path, e);
            }
        }
    }
}

/// Force the well-known libc functions onto the host; with no recorded
/// compute cost of their own, nothing else stops a cut from taking them.
fn pin_host_functions(g: &mut UndirectedGraph, host_anchor: &str) {
    for f in known_names::HOST_ONLY_FUNCTIONS {
        if g.exists(f) {
            g.add_edge(host_anchor, f, PIN_WEIGHT);
        }
    }
}

/// Build the cost graph, cut it between the two compute anchors, print the
/// placement and write the annotated graph to disk.
fn partition(functions: &FunctionGraph, options: &AnalysisOptions) {
    let host = functions.anchor(0);
    let accelerator = functions.anchor(1);

    let mut g = functions.build_cost_graph();
    pin_host_functions(&mut g, host);

    let cost = g.partition_st(host, accelerator);
    println!("### Partitioning has cost {}.", cost);

    println!("### Functions to run on the accelerator:");
    let mut count = 0;
    for n in g.all_nodes_in(1).iter().sorted() {
        if !is_compute_anchor(n) {
            println!("#   {}", n);
            count += 1;
        }
    }
    if count == 0 {
        println!("### No functions placed on the accelerator.");
    }

    // The anchors must sit on their own sides; anything else means the cost
    // model collapsed (e.g. a pin fired on the wrong vertex).
    if g.partition_of(host) != 0 {
        eprintln!("### ERROR: host compute node mapped to the accelerator side.");
    }
    if g.partition_of(accelerator) != 1 {
        eprintln!("### ERROR: accelerator compute node mapped to the host side.");
    }

    // A function in the accelerator partition that is called from the host
    // partition sits on the boundary and needs an explicit migration
    // annotation in the source.
    println!("### Functions requiring explicit migration annotations:");
    let host_side = g.all_nodes_in(0);
    for n1 in g.all_nodes_in(1).iter().sorted() {
        if is_compute_anchor(n1) {
            continue;
        }
        let boundary = host_side
            .iter()
            .any(|n0| !is_compute_anchor(n0) && functions.num_calls(n0, n1) > 0);
        if boundary {
            println!("#|  {}", n1);
        }
    }

    draw_or_die(&g, &options.dot_output);
}

fn draw_or_die<Ty: petgraph::EdgeType>(g: &crate::graph::weighted::WeightGraph<Ty>, path: &str) {
    match g.draw(Path::new(path)) {
        Ok(()) => info!("graph written to {}", path),
        Err(e) => panic!("Failed to write dot file output: {:?}", e),
    }
}
