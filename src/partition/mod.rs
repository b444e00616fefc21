// Copyright (c) 2024 <Wei Li>.
//
// This source code is licensed under the GNU license found in the
// LICENSE file in the root directory of this source tree.

//! The graph-cut algorithms behind partitioning.
//!
//! Both algorithms attach to [`UndirectedGraph`](crate::graph::UndirectedGraph)
//! and label every vertex's `partition` field with 0 or 1: a global minimum
//! cut (Stoer–Wagner) and an s–t minimum cut derived from max flow
//! (Edmonds–Karp). They operate directly on the integer vertex indices of
//! the underlying adjacency list; no property maps, no algorithm library.

pub mod edmonds_karp;
pub mod stoer_wagner;
