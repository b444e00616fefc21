// Copyright (c) 2024 <Wei Li>.
//
// This source code is licensed under the GNU license found in the
// LICENSE file in the root directory of this source tree.

//! Statistics over the recorded graphs.

use std::io::{BufWriter, Result, Write};

use crate::graph::FunctionGraph;

const SECTION_RULE: &str = "##########################################################";
const SUB_RULE: &str = "----------------------------------------------------------";

/// Write a summary of the recorded call and fault graphs.
pub fn dump_stats<W: Write>(functions: &FunctionGraph, writer: &mut BufWriter<W>) -> Result<()> {
    let all = functions.call_graph().all_nodes();
    let parallel = all.iter().filter(|f| functions.is_parallel(f)).count();

    writeln!(writer, "{}", SECTION_RULE)?;
    writeln!(writer, "Call Graph Statistics: ")?;
    writeln!(writer, "#Functions: {}", all.len())?;
    writeln!(writer, "#Parallel functions: {}", parallel)?;
    writeln!(writer, "#Call edges: {}", functions.call_graph().edge_count())?;
    writeln!(writer, "#Calls: {}", functions.total_calls())?;
    writeln!(writer, "{}", SUB_RULE)?;
    writeln!(writer, "Fault Graph Statistics: ")?;
    writeln!(writer, "#Fault edges: {}", functions.fault_graph().edge_count())?;
    writeln!(writer, "#Memory accesses: {}", functions.total_accesses())?;
    writeln!(writer, "{}", SECTION_RULE)?;

    writer.flush()
}
