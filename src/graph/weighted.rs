// Copyright (c) 2024 <Wei Li>.
//
// This source code is licensed under the GNU license found in the
// LICENSE file in the root directory of this source tree.

//! Named, weighted multigraphs with duplicate-edge coalescing.
//!
//! Both the call-count and page-fault recordings and the final cost graph are
//! stored in a [`WeightGraph`]: a petgraph adjacency list whose vertices carry
//! a function name and a partition label, with a side map from names to node
//! indices so that all lookups happen by name content. Adding an edge between
//! endpoints that are already connected sums the weights instead of creating
//! a parallel edge.

use petgraph::graph::{Graph, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::{Directed, EdgeType, Undirected};
use std::collections::HashMap;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

/// Edge weights, shared by call counts, fault counts and costs. All costs
/// are meant to be commensurate (nanoseconds).
pub type EdgeWeight = u64;

/// The weight of an edge that pins two vertices onto the same side of a cut.
/// Large enough to dwarf any realistic recorded cost, small enough that a
/// handful of pins cannot overflow 64-bit arithmetic.
pub const PIN_WEIGHT: EdgeWeight = 1 << 60;

/// Synthetic compute-anchor vertices are marked by this leading character.
pub const COMPUTE_ANCHOR_MARKER: char = '&';

/// Returns true if `name` denotes a synthetic compute-anchor vertex rather
/// than an observed function.
#[inline]
pub fn is_compute_anchor(name: &str) -> bool {
    name.starts_with(COMPUTE_ANCHOR_MARKER)
}

/// The properties stored per vertex.
#[derive(Debug)]
pub struct Vertex {
    pub name: String,
    pub partition: i32,
}

impl Vertex {
    fn new(name: &str) -> Self {
        Vertex {
            name: name.to_owned(),
            partition: 0,
        }
    }
}

/// A labeled, weighted graph over either edge direction type.
pub struct WeightGraph<Ty: EdgeType> {
    /// The graph structure holding vertices and coalesced edge weights.
    pub(crate) graph: Graph<Vertex, EdgeWeight, Ty>,
    /// petgraph accesses vertices via indices, but the recording interface
    /// works in names, so keep a map from names to vertex indices.
    pub(crate) names: HashMap<String, NodeIndex>,
}

/// Call and fault recordings: edges have a direction.
pub type DirectedGraph = WeightGraph<Directed>;
/// The cost graph handed to the partitioning algorithms.
pub type UndirectedGraph = WeightGraph<Undirected>;

impl<Ty: EdgeType> Default for WeightGraph<Ty> {
    fn default() -> Self {
        Self::new()
    }
}

impl<Ty: EdgeType> WeightGraph<Ty> {
    pub fn new() -> Self {
        WeightGraph {
            graph: Graph::default(),
            names: HashMap::new(),
        }
    }

    pub(crate) fn node(&self, name: &str) -> Option<NodeIndex> {
        self.names.get(name).copied()
    }

    /// Add a new vertex. Adding a name that is already present is a bug in
    /// the caller.
    pub fn add_node(&mut self, name: &str) {
        assert!(
            !self.names.contains_key(name),
            "vertex '{}' already exists",
            name
        );
        let id = self.graph.add_node(Vertex::new(name));
        self.names.insert(name.to_owned(), id);
    }

    /// Add `weight` between `source` and `sink`. If the two vertices are
    /// already connected the weight is added onto the existing edge; for an
    /// undirected graph this makes (a,b) and (b,a) the same edge. Both
    /// endpoints must exist.
    pub fn add_edge(&mut self, source: &str, sink: &str, weight: EdgeWeight) {
        let source_v = self.node(source).expect("vertex not in graph");
        let sink_v = self.node(sink).expect("vertex not in graph");

        match self.graph.find_edge(source_v, sink_v) {
            Some(e) => {
                let old = self.graph[e];
                self.graph[e] = old.checked_add(weight).expect("edge weight overflow");
            }
            None => {
                self.graph.add_edge(source_v, sink_v, weight);
            }
        }
    }

    /// The weight between two vertices, 0 if they are not connected. Both
    /// endpoints must exist.
    pub fn edge(&self, source: &str, sink: &str) -> EdgeWeight {
        let source_v = self.node(source).expect("vertex not in graph");
        let sink_v = self.node(sink).expect("vertex not in graph");

        match self.graph.find_edge(source_v, sink_v) {
            Some(e) => self.graph[e],
            None => 0,
        }
    }

    /// The summed weight of the edges leaving `name`. Self-loops are
    /// included; for an undirected graph this covers all incident edges.
    pub fn out_weight(&self, name: &str) -> EdgeWeight {
        let v = self.node(name).expect("vertex not in graph");
        self.graph.edges(v).map(|e| *e.weight()).sum()
    }

    /// The names of every vertex, in insertion order.
    pub fn all_nodes(&self) -> Vec<String> {
        self.graph
            .node_indices()
            .map(|v| self.graph[v].name.clone())
            .collect()
    }

    /// The names of every vertex labeled with `partition`.
    pub fn all_nodes_in(&self, partition: i32) -> Vec<String> {
        self.graph
            .node_indices()
            .filter(|&v| self.graph[v].partition == partition)
            .map(|v| self.graph[v].name.clone())
            .collect()
    }

    /// The sum of all edge weights, each edge counted once.
    pub fn sum_edges(&self) -> EdgeWeight {
        self.graph.edge_references().map(|e| *e.weight()).sum()
    }

    pub fn exists(&self, name: &str) -> bool {
        self.names.contains_key(name)
    }

    /// The partition label of a vertex. Meaningful after one of the
    /// partitioning calls has labeled the graph.
    pub fn partition_of(&self, name: &str) -> i32 {
        let v = self.node(name).expect("vertex not in graph");
        self.graph[v].partition
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Write a DOT rendering of the graph to `path`. Compute anchors come
    /// out as blue boxes and partition-1 functions as red boxes; edges that
    /// touch a compute anchor are dotted blue with their weight as label.
    pub fn draw(&self, path: &Path) -> io::Result<()> {
        let (graph_str, edge_str) = if Ty::is_directed() {
            ("digraph", "->")
        } else {
            ("graph", "--")
        };

        let mut f = BufWriter::new(File::create(path)?);
        writeln!(f, "{} G {{", graph_str)?;

        for v in self.graph.node_indices() {
            let vertex = &self.graph[v];
            let compute = is_compute_anchor(&vertex.name);
            let partitioned = !compute && vertex.partition != 0;

            write!(f, "  \"{}\"", vertex.name)?;
            if compute {
                write!(f, " [shape=box, color=blue, fontcolor=blue]")?;
            }
            if partitioned {
                write!(f, " [shape=box, color=red, fontcolor=red]")?;
            }
            writeln!(f, ";")?;
        }

        for e in self.graph.edge_references() {
            let source = &self.graph[e.source()];
            let sink = &self.graph[e.target()];

            // An edge with a compute anchor on either end is a compute edge.
            let compute = is_compute_anchor(&source.name) || is_compute_anchor(&sink.name);

            write!(
                f,
                "  \"{}\" {} \"{}\" [label=\"{}\"",
                source.name,
                edge_str,
                sink.name,
                e.weight()
            )?;
            if compute {
                write!(f, ", style=dotted, color=blue, fontcolor=blue")?;
            }
            writeln!(f, "];")?;
        }

        writeln!(f, "}}")?;
        f.flush()
    }
}
