// Copyright (c) 2024 <Wei Li>.
//
// This source code is licensed under the GNU license found in the
// LICENSE file in the root directory of this source tree.

//! Global minimum cut (Stoer–Wagner).

use std::collections::HashMap;

use petgraph::graph::NodeIndex;
use petgraph::visit::EdgeRef;

use crate::graph::{EdgeWeight, UndirectedGraph};

impl UndirectedGraph {
    /// Find the global minimum cut and label every vertex with the side of
    /// the cut it falls on (0 or 1). Returns the cut weight.
    ///
    /// Classic Stoer–Wagner: run maximum-adjacency phases, each of which
    /// ends by separating the last-added vertex from the rest ("cut of the
    /// phase") and merging it into the second-to-last. The smallest phase
    /// cut is the global minimum, and the original vertices merged into the
    /// last-added supervertex at that point form one side of it.
    ///
    /// A graph with fewer than two vertices has no cut: the result is 0 and
    /// no label changes.
    pub fn partition(&mut self) -> EdgeWeight {
        let nodes: Vec<NodeIndex> = self.graph.node_indices().collect();
        let n = nodes.len();
        if n < 2 {
            return 0;
        }

        let index_of: HashMap<NodeIndex, usize> =
            nodes.iter().enumerate().map(|(i, &v)| (v, i)).collect();

        // Dense symmetric weight matrix. Self-loops carry no partitioning
        // meaning and are dropped.
        let mut weight = vec![vec![0 as EdgeWeight; n]; n];
        for e in self.graph.edge_references() {
            let a = index_of[&e.source()];
            let b = index_of[&e.target()];
            if a == b {
                continue;
            }
            weight[a][b] += *e.weight();
            weight[b][a] += *e.weight();
        }

        // Each supervertex is the set of original vertices merged into it.
        let mut merged: Vec<Vec<usize>> = (0..n).map(|i| vec![i]).collect();
        let mut active: Vec<usize> = (0..n).collect();

        let mut best_weight = EdgeWeight::MAX;
        let mut best_side: Vec<usize> = Vec::new();

        while active.len() > 1 {
            // Maximum-adjacency search: grow A from the first remaining
            // supervertex, always adding the vertex most tightly connected
            // to A. Ties break towards insertion order.
            let start = active[0];
            let mut in_a = vec![false; n];
            let mut connect = vec![0 as EdgeWeight; n];
            in_a[start] = true;
            for &u in &active {
                connect[u] = weight[start][u];
            }

            let mut second_last = start;
            let mut last = start;
            for _ in 1..active.len() {
                let mut next = usize::MAX;
                for &u in &active {
                    if !in_a[u] && (next == usize::MAX || connect[u] > connect[next]) {
                        next = u;
                    }
                }

                second_last = last;
                last = next;
                in_a[next] = true;
                for &u in &active {
                    if !in_a[u] {
                        connect[u] += weight[next][u];
                    }
                }
            }

            // The phase cut separates `last` from everything else; its
            // weight is what connected `last` to A when it was added.
            if connect[last] < best_weight {
                best_weight = connect[last];
                best_side = merged[last].clone();
            }

            // Merge `last` into `second_last`, discarding the edge between
            // the two.
            for &u in &active {
                if u != last && u != second_last {
                    weight[second_last][u] += weight[last][u];
                    weight[u][second_last] = weight[second_last][u];
                }
            }
            let absorbed = std::mem::take(&mut merged[last]);
            merged[second_last].extend(absorbed);
            active.retain(|&u| u != last);
        }

        // Mark the winning side as partition 1, the rest as 0.
        let mut side = vec![0; n];
        for i in best_side {
            side[i] = 1;
        }
        for (i, &v) in nodes.iter().enumerate() {
            self.graph[v].partition = side[i];
        }

        best_weight
    }
}

#[cfg(test)]
pub(crate) mod test {
    use crate::graph::UndirectedGraph;

    // A test graph for the partitioning algorithms: two clusters joined by
    // the single edge E--F, all weights 1, so the global minimum cut is
    // {A,B,C,D,E} / {F,G,H,I,J} with weight 1.
    //
    //      B        G
    //     / \      / \
    //    /   \    /   \
    //   A--D--E--F--I--J
    //    \   /    \   /
    //     \ /      \ /
    //      C        H
    pub(crate) fn barbell() -> UndirectedGraph {
        let mut g = UndirectedGraph::new();

        for n in ["A", "B", "C", "D", "E", "F", "G", "H", "I", "J"] {
            g.add_node(n);
        }

        // Left cluster.
        g.add_edge("A", "B", 1);
        g.add_edge("A", "C", 1);
        g.add_edge("A", "D", 1);
        g.add_edge("D", "E", 1);
        g.add_edge("B", "E", 1);
        g.add_edge("C", "E", 1);

        // Join.
        g.add_edge("E", "F", 1);

        // Right cluster.
        g.add_edge("F", "G", 1);
        g.add_edge("F", "H", 1);
        g.add_edge("F", "I", 1);
        g.add_edge("I", "J", 1);
        g.add_edge("G", "J", 1);
        g.add_edge("H", "J", 1);

        g
    }

    #[test]
    fn global_partitioning() {
        let mut g = barbell();

        assert_eq!(g.partition(), 1);

        // The two sides are exactly the two clusters; which cluster gets
        // which label is not specified.
        let left = g.partition_of("A");
        let right = g.partition_of("J");
        assert_ne!(left, right);
        for n in ["A", "B", "C", "D", "E"] {
            assert_eq!(g.partition_of(n), left);
        }
        for n in ["F", "G", "H", "I", "J"] {
            assert_eq!(g.partition_of(n), right);
        }
        assert_eq!(g.all_nodes_in(0).len(), 5);
        assert_eq!(g.all_nodes_in(1).len(), 5);
    }

    #[test]
    fn weighted_cut() {
        // Three vertices in a path; the cheap end edge is the cut.
        let mut g = UndirectedGraph::new();
        g.add_node("x");
        g.add_node("y");
        g.add_node("z");
        g.add_edge("x", "y", 10);
        g.add_edge("y", "z", 3);

        assert_eq!(g.partition(), 3);
        assert_eq!(g.partition_of("x"), g.partition_of("y"));
        assert_ne!(g.partition_of("y"), g.partition_of("z"));
    }

    #[test]
    fn empty_graph() {
        let mut g = UndirectedGraph::new();
        assert_eq!(g.partition(), 0);

        g.add_node("alone");
        assert_eq!(g.partition(), 0);
        assert_eq!(g.partition_of("alone"), 0);
    }

    #[test]
    fn cut_weight_matches_crossing_weight() {
        use rand::Rng;

        let mut rng = rand::thread_rng();
        let names: Vec<String> = (0..12).map(|i| format!("f{}", i)).collect();

        for _ in 0..20 {
            let mut g = UndirectedGraph::new();
            for name in &names {
                g.add_node(name);
            }
            // A random ring keeps the graph connected; random chords give
            // the cut something to choose between.
            for i in 0..names.len() {
                let j = (i + 1) % names.len();
                g.add_edge(&names[i], &names[j], rng.gen_range(1..20));
            }
            for _ in 0..8 {
                let i = rng.gen_range(0..names.len());
                let j = rng.gen_range(0..names.len());
                if i != j {
                    g.add_edge(&names[i], &names[j], rng.gen_range(1..20));
                }
            }

            let cut = g.partition();

            let mut crossing = 0;
            for a in g.all_nodes_in(0) {
                for b in g.all_nodes_in(1) {
                    crossing += g.edge(&a, &b);
                }
            }
            assert_eq!(cut, crossing);
            assert!(!g.all_nodes_in(0).is_empty());
            assert!(!g.all_nodes_in(1).is_empty());
        }
    }
}
