// Copyright (c) 2024 <Wei Li>.
//
// This source code is licensed under the GNU license found in the
// LICENSE file in the root directory of this source tree.

//! Analysis options.

use clap::{Arg, Command};

const PTRACK_USAGE: &str = r#"ptrack [OPTIONS] TRACE"#;

/// Creates the clap::Command metadata for argument parsing.
fn make_options_parser() -> Command<'static> {
    Command::new("ptrack")
        .override_usage(PTRACK_USAGE)
        .version(env!("CARGO_PKG_VERSION"))
        .arg(Arg::new("TRACE")
            .required(true)
            .help("The recorded event trace to analyse."))
        .arg(Arg::new("parallel-file")
            .long("parallel")
            .takes_value(true)
            .help("File listing parallel functions, one per line.")
            .long_help("Overrides the PTRACK_PARALLEL environment variable. \
                        Functions not present in the trace are silently ignored."))
        .arg(Arg::new("migration-cost")
            .long("migration-cost")
            .takes_value(true)
            .value_parser(clap::value_parser!(u64))
            .help("The cost of one cross-node migration, in nanoseconds."))
        .arg(Arg::new("fault-cost")
            .long("fault-cost")
            .takes_value(true)
            .value_parser(clap::value_parser!(u64))
            .help("The cost of one cross-node page fault, in nanoseconds."))
        .arg(Arg::new("dump-stats")
            .long("dump-stats")
            .takes_value(false)
            .help("Dump statistics of the recorded graphs before partitioning."))
        .arg(Arg::new("call-graph-output")
            .long("dump-call-graph")
            .takes_value(true)
            .help("Dump the recorded call graph in DOT format to the output file."))
        .arg(Arg::new("fault-graph-output")
            .long("dump-fault-graph")
            .takes_value(true)
            .help("Dump the recorded page-fault graph in DOT format to the output file."))
        .arg(Arg::new("dot-output")
            .long("dot-output")
            .takes_value(true)
            .default_value("graph.dot")
            .help("Where to write the partitioned cost graph in DOT format."))
}

#[derive(Clone, Debug)]
pub struct AnalysisOptions {
    /// The event trace to replay; empty when events arrive live through the
    /// callback interface.
    pub trace: String,
    /// Parallel-function list; `None` falls back to PTRACK_PARALLEL.
    pub parallel_file: Option<String>,
    pub migration_cost: Option<u64>,
    pub fault_cost: Option<u64>,

    pub dump_stats: bool,
    pub call_graph_output: Option<String>,
    pub fault_graph_output: Option<String>,
    pub dot_output: String,
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        Self {
            trace: String::new(),
            parallel_file: None,
            migration_cost: None,
            fault_cost: None,
            dump_stats: false,
            call_graph_output: None,
            fault_graph_output: None,
            dot_output: "graph.dot".to_owned(),
        }
    }
}

impl AnalysisOptions {
    /// Parses options from a list of strings. Errors and help requests exit
    /// the process with clap's diagnostics.
    pub fn parse_from_args(&mut self, args: &[String]) {
        let matches = match make_options_parser()
            .no_binary_name(true)
            .try_get_matches_from(args.iter())
        {
            Ok(matches) => matches,
            Err(e) => {
                e.exit();
            }
        };

        if let Some(s) = matches.get_one::<String>("TRACE") {
            self.trace = s.clone();
        }
        self.parallel_file = matches.get_one::<String>("parallel-file").cloned();
        self.migration_cost = matches.get_one::<u64>("migration-cost").cloned();
        self.fault_cost = matches.get_one::<u64>("fault-cost").cloned();

        self.dump_stats = matches.contains_id("dump-stats");
        self.call_graph_output = matches.get_one::<String>("call-graph-output").cloned();
        self.fault_graph_output = matches.get_one::<String>("fault-graph-output").cloned();
        if let Some(s) = matches.get_one::<String>("dot-output") {
            self.dot_output = s.clone();
        }
    }
}
