// Copyright (c) 2024 <Wei Li>.
//
// This source code is licensed under the GNU license found in the
// LICENSE file in the root directory of this source tree.

//! Runtime partitioning analysis for heterogeneous two-node systems.
//!
//! An instrumented program reports every function call and memory access
//! into the recorder ([`record`], or its C surface in [`ffi`]). The recorder
//! keeps two directed graphs — how often each function calls each other
//! function, and how often each function touches pages owned by another —
//! and at process exit [`analysis`] folds them, together with per-node
//! compute costs, into one undirected cost graph. Cutting that graph between
//! two synthetic compute anchors ([`partition`]) labels every function with
//! the node it should run on so that migration, page-fault and computation
//! costs are minimized together.
//!
//! Recording is strictly single-threaded: events must arrive serialized, in
//! program order, and the analysis runs inline once at teardown.

pub mod analysis;
pub mod ffi;
pub mod graph;
pub mod partition;
pub mod record;
pub mod util;
