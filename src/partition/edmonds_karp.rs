// Copyright (c) 2024 <Wei Li>.
//
// This source code is licensed under the GNU license found in the
// LICENSE file in the root directory of this source tree.

//! s–t minimum cut via max flow (Edmonds–Karp).

use std::collections::{HashMap, VecDeque};

use petgraph::graph::NodeIndex;
use petgraph::visit::EdgeRef;

use crate::graph::{EdgeWeight, UndirectedGraph};

/// One direction of a flow-network edge. `rev` is the position of the
/// opposite direction in the adjacency list of `to`, so that augmenting one
/// direction can return capacity to the other.
struct FlowEdge {
    to: usize,
    cap: EdgeWeight,
    rev: usize,
}

impl UndirectedGraph {
    /// Find the minimum cut that places `source` and `sink` on opposite
    /// sides, label every vertex with its side (0 for `source`'s side, 1
    /// for `sink`'s) and return the cut weight.
    ///
    /// Implemented through max-flow/min-cut duality: the undirected graph
    /// becomes a flow network where each edge (u,v,w) expands into the
    /// anti-parallel pair u->v and v->u of capacity w, each the other's
    /// reverse. Edmonds–Karp repeatedly augments along a shortest residual
    /// path found by BFS; when no path remains, the vertices still reachable
    /// from `source` through positive residual capacity form side 0.
    ///
    /// Both vertices must exist and must be distinct.
    pub fn partition_st(&mut self, source: &str, sink: &str) -> EdgeWeight {
        let source_v = self.node(source).expect("vertex not in graph");
        let sink_v = self.node(sink).expect("vertex not in graph");
        assert!(source_v != sink_v, "s-t cut requires distinct vertices");

        let nodes: Vec<NodeIndex> = self.graph.node_indices().collect();
        let n = nodes.len();
        let index_of: HashMap<NodeIndex, usize> =
            nodes.iter().enumerate().map(|(i, &v)| (v, i)).collect();

        let mut network: Vec<Vec<FlowEdge>> = (0..n).map(|_| Vec::new()).collect();
        for e in self.graph.edge_references() {
            let a = index_of[&e.source()];
            let b = index_of[&e.target()];
            if a == b {
                continue;
            }
            let rev_a = network[a].len();
            let rev_b = network[b].len();
            network[a].push(FlowEdge { to: b, cap: *e.weight(), rev: rev_b });
            network[b].push(FlowEdge { to: a, cap: *e.weight(), rev: rev_a });
        }

        let src = index_of[&source_v];
        let dst = index_of[&sink_v];

        let mut flow: EdgeWeight = 0;
        loop {
            // BFS for the augmenting path with the fewest edges. `pred`
            // remembers, per reached vertex, which edge reached it.
            let mut pred: Vec<Option<(usize, usize)>> = vec![None; n];
            let mut seen = vec![false; n];
            let mut queue = VecDeque::new();
            seen[src] = true;
            queue.push_back(src);

            'bfs: while let Some(u) = queue.pop_front() {
                for (i, e) in network[u].iter().enumerate() {
                    if e.cap > 0 && !seen[e.to] {
                        seen[e.to] = true;
                        pred[e.to] = Some((u, i));
                        if e.to == dst {
                            break 'bfs;
                        }
                        queue.push_back(e.to);
                    }
                }
            }

            if !seen[dst] {
                break;
            }

            // Push the bottleneck along the path, returning the pushed
            // amount to each reverse edge.
            let mut bottleneck = EdgeWeight::MAX;
            let mut v = dst;
            while let Some((u, i)) = pred[v] {
                bottleneck = bottleneck.min(network[u][i].cap);
                v = u;
            }

            let mut v = dst;
            while let Some((u, i)) = pred[v] {
                network[u][i].cap -= bottleneck;
                let rev = network[u][i].rev;
                network[v][rev].cap += bottleneck;
                v = u;
            }

            flow += bottleneck;
        }

        // Everything starts on the sink's side; a DFS over the residual
        // network pulls the vertices still reachable from the source back
        // onto side 0.
        let mut side = vec![1; n];
        let mut stack = vec![src];
        side[src] = 0;
        while let Some(u) = stack.pop() {
            for e in &network[u] {
                if e.cap > 0 && side[e.to] == 1 {
                    side[e.to] = 0;
                    stack.push(e.to);
                }
            }
        }

        for (i, &v) in nodes.iter().enumerate() {
            self.graph[v].partition = side[i];
        }

        flow
    }
}

#[cfg(test)]
mod test {
    use crate::graph::UndirectedGraph;
    use crate::partition::stoer_wagner::test::barbell;

    #[test]
    fn st_partitioning() {
        let mut g = barbell();

        assert_eq!(g.partition_st("A", "J"), 1);

        // The source's side is always labeled 0.
        for n in ["A", "B", "C", "D", "E"] {
            assert_eq!(g.partition_of(n), 0);
        }
        for n in ["F", "G", "H", "I", "J"] {
            assert_eq!(g.partition_of(n), 1);
        }
    }

    #[test]
    fn st_partitioning_biased() {
        // The barbell has two equal cuts around B; bias one of the other
        // edges so isolating B (weight 2) becomes the unique minimum.
        let mut g = barbell();
        g.add_edge("A", "C", 1); // A--C now has weight 2.

        assert_eq!(g.partition_st("B", "C"), 2);

        assert_eq!(g.all_nodes_in(0), vec!["B".to_owned()]);
        assert_eq!(g.all_nodes_in(1).len(), 9);
    }

    #[test]
    fn flow_matches_crossing_weight() {
        use rand::Rng;

        let mut rng = rand::thread_rng();
        let names: Vec<String> = (0..10).map(|i| format!("f{}", i)).collect();

        for _ in 0..20 {
            let mut g = UndirectedGraph::new();
            for name in &names {
                g.add_node(name);
            }
            for i in 0..names.len() {
                let j = (i + 1) % names.len();
                g.add_edge(&names[i], &names[j], rng.gen_range(1..30));
            }
            for _ in 0..6 {
                let i = rng.gen_range(0..names.len());
                let j = rng.gen_range(0..names.len());
                if i != j {
                    g.add_edge(&names[i], &names[j], rng.gen_range(1..30));
                }
            }

            let flow = g.partition_st("f0", "f5");

            // Max-flow/min-cut duality: the produced labeling is a cut
            // whose crossing weight is exactly the flow value.
            let mut crossing = 0;
            for a in g.all_nodes_in(0) {
                for b in g.all_nodes_in(1) {
                    crossing += g.edge(&a, &b);
                }
            }
            assert_eq!(flow, crossing);
            assert_eq!(g.partition_of("f0"), 0);
            assert_eq!(g.partition_of("f5"), 1);
        }
    }

    #[test]
    #[should_panic(expected = "not in graph")]
    fn missing_vertex() {
        let mut g = barbell();
        g.partition_st("A", "nope");
    }

    #[test]
    #[should_panic(expected = "distinct")]
    fn source_equals_sink() {
        let mut g = barbell();
        g.partition_st("A", "A");
    }
}
