// Copyright (c) 2024 <Wei Li>.
//
// This source code is licensed under the GNU license found in the
// LICENSE file in the root directory of this source tree.

pub mod function_graph;
pub mod weighted;

pub use function_graph::{CostParams, FunctionGraph};
pub use weighted::{
    is_compute_anchor, DirectedGraph, EdgeWeight, UndirectedGraph, PIN_WEIGHT,
};
