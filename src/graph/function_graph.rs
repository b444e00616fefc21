// Copyright (c) 2024 <Wei Li>.
//
// This source code is licensed under the GNU license found in the
// LICENSE file in the root directory of this source tree.

//! The per-function recording that the cost model is built on.
//!
//! A [`FunctionGraph`] records which functions call which and how often, and
//! which functions access pages owned by other functions. The raw counts live
//! in two directed graphs; the configured costs are applied only when the
//! undirected cost graph is built for partitioning.

use std::collections::HashMap;
use std::io::{self, BufRead};

use super::weighted::{DirectedGraph, EdgeWeight, UndirectedGraph, PIN_WEIGHT};

/// Compute cost and parallelism for one architecture. `per_access` is the
/// average compute cost charged per memory access, in the same unit as every
/// other cost; `parallelism` divides the compute cost of parallel functions.
#[derive(Clone, Copy, Debug)]
pub struct CostParams {
    pub per_access: EdgeWeight,
    pub parallelism: EdgeWeight,
}

pub struct FunctionGraph {
    /// The name of the compute-anchor vertex of each architecture.
    anchor_names: [String; 2],
    /// Per-access compute cost for new functions on each architecture.
    default_costs: [EdgeWeight; 2],
    parallelism: [EdgeWeight; 2],

    /// Whether each function is parallel. Every function that executed is in
    /// the map, even when it is not parallel.
    is_parallel: HashMap<String, bool>,

    /// The cost of a single cross-architecture migration or page fault.
    migration_cost: EdgeWeight,
    page_fault_cost: EdgeWeight,

    /// Raw event counts: how often x calls y, and how often x accesses a
    /// page owned by y. Costs are applied after recording has completed.
    call_graph: DirectedGraph,
    fault_graph: DirectedGraph,
}

impl FunctionGraph {
    /// Constructor for a two-architecture system. The partitioning
    /// algorithms all find binary cuts, so two is also the ceiling.
    pub fn new(
        migration_cost: EdgeWeight,
        page_fault_cost: EdgeWeight,
        name0: &str,
        arch0: CostParams,
        name1: &str,
        arch1: CostParams,
    ) -> Self {
        assert!(name0.starts_with('&'), "compute anchor names must start with '&'");
        assert!(name1.starts_with('&'), "compute anchor names must start with '&'");

        let mut fg = FunctionGraph {
            anchor_names: [name0.to_owned(), name1.to_owned()],
            default_costs: [arch0.per_access, arch1.per_access],
            parallelism: [arch0.parallelism, arch1.parallelism],
            is_parallel: HashMap::new(),
            migration_cost,
            page_fault_cost,
            call_graph: DirectedGraph::new(),
            fault_graph: DirectedGraph::new(),
        };

        // No call event ever names 'main' as a callee, so it is added up
        // front; it is also the default page owner.
        fg.add_node("main");
        fg
    }

    pub fn node_exists(&self, name: &str) -> bool {
        self.is_parallel.contains_key(name)
    }

    /// The compute-anchor name of an architecture.
    pub fn anchor(&self, architecture: usize) -> &str {
        &self.anchor_names[architecture]
    }

    /// Record `function` in all three structures if this is the first time
    /// it has been seen, otherwise do nothing.
    pub fn add_node(&mut self, function: &str) {
        if !self.node_exists(function) {
            self.is_parallel.insert(function.to_owned(), false);
            self.call_graph.add_node(function);
            self.fault_graph.add_node(function);
        }
    }

    /// Mark a function as parallel (or not). A function that was never
    /// recorded is ignored: it usually means the parallel-function list
    /// mentions dead or inlined code.
    ///
    /// Anything a parallel function calls is used in parallel even if it is
    /// not parallel itself, so marking propagates forward through the call
    /// graph to a fixed point. Already-marked functions stop the walk, which
    /// keeps call cycles finite.
    pub fn set_parallel(&mut self, function: &str, parallel: bool) {
        match self.is_parallel.get(function) {
            None => return,
            Some(&flag) if flag == parallel => return,
            Some(_) => {}
        }
        self.is_parallel.insert(function.to_owned(), parallel);

        if !parallel {
            return;
        }

        let mut worklist = vec![function.to_owned()];
        while let Some(f) = worklist.pop() {
            for callee in self.call_graph.all_nodes() {
                if self.call_graph.edge(&f, &callee) > 0 && !self.is_parallel[&callee] {
                    self.is_parallel.insert(callee.clone(), true);
                    worklist.push(callee);
                }
            }
        }
    }

    pub fn is_parallel(&self, function: &str) -> bool {
        *self.is_parallel.get(function).unwrap_or(&false)
    }

    /// Read one function name per line from `reader` and mark each as
    /// parallel. Trailing whitespace is trimmed and blank lines skipped.
    pub fn load_parallel_functions<R: BufRead>(&mut self, reader: R) -> io::Result<()> {
        for line in reader.lines() {
            let line = line?;
            let name = line.trim_end();
            if !name.is_empty() {
                self.set_parallel(name, true);
            }
        }
        Ok(())
    }

    /// `caller` dynamically called `callee` once. Calls that statically
    /// exist but never happen on this run are not recorded.
    pub fn call(&mut self, caller: &str, callee: &str) {
        // The callee is new whenever this is its first call; the caller can
        // be new too if it only ever ran via a function pointer.
        self.add_node(caller);
        self.add_node(callee);

        self.call_graph.add_edge(caller, callee, 1);
    }

    /// `accessor` touched a page most recently accessed by `previous_owner`.
    /// When the two are equal no fault actually occurs, but the access is
    /// still recorded as a self-edge: the totals feed the compute-cost model.
    pub fn incur_page_fault(&mut self, accessor: &str, previous_owner: &str, num: EdgeWeight) {
        // The accessor can be unknown when it was only ever called through a
        // function pointer the instrumentation could not resolve. The
        // previous owner is different: it can only have come from an earlier
        // recorded access, so an unknown owner is a contract violation.
        self.add_node(accessor);
        assert!(self.node_exists(previous_owner), "page fault from an unknown owner");

        self.fault_graph.add_edge(accessor, previous_owner, num);
    }

    /// Faults incurred directly by `function` accessing pages owned by
    /// `old`; faults via intermediary functions are not included.
    pub fn num_page_faults(&self, function: &str, old: &str) -> EdgeWeight {
        assert!(self.node_exists(function), "fault query for an unrecorded function");
        assert!(self.node_exists(old), "fault query for an unrecorded function");

        self.fault_graph.edge(function, old)
    }

    /// Memory accesses by `function` that are guaranteed not to fault,
    /// i.e. accesses to pages it already owned.
    pub fn num_non_faults(&self, function: &str) -> EdgeWeight {
        assert!(self.node_exists(function), "fault query for an unrecorded function");

        self.num_page_faults(function, function)
    }

    /// How many times `caller` directly calls `callee`.
    pub fn num_calls(&self, caller: &str, callee: &str) -> EdgeWeight {
        assert!(self.node_exists(caller), "cost query for an unrecorded function");
        assert!(self.node_exists(callee), "cost query for an unrecorded function");

        self.call_graph.edge(caller, callee)
    }

    /// Total memory accesses across the whole program, faulting or not.
    pub fn total_accesses(&self) -> EdgeWeight {
        self.fault_graph.sum_edges()
    }

    /// Total dynamic calls across the whole program.
    pub fn total_calls(&self) -> EdgeWeight {
        self.call_graph.sum_edges()
    }

    pub fn call_graph(&self) -> &DirectedGraph {
        &self.call_graph
    }

    pub fn fault_graph(&self) -> &DirectedGraph {
        &self.fault_graph
    }

    /// The local cost of cutting the boundary between `caller` and `callee`,
    /// covering only costs directly incurred by these two functions and only
    /// in the caller-to-callee direction.
    pub fn edge_cost(&self, caller: &str, callee: &str) -> EdgeWeight {
        assert!(self.node_exists(caller), "cost query for an unrecorded function");
        assert!(self.node_exists(callee), "cost query for an unrecorded function");

        // Each dynamic call across the boundary is a migration; each access
        // to a page held on the other side is a fault.
        let migrations = self.num_calls(caller, callee);
        let faults = self.num_page_faults(caller, callee);

        migrations * self.migration_cost + faults * self.page_fault_cost
    }

    /// The cost of computing `function` on an architecture. Default costs
    /// are scaled by the number of page accesses (including pages the
    /// function already owned): roughly speaking, a function rarely spends a
    /// long time computing without touching memory. Parallel functions have
    /// their cost divided by the architecture's parallelism.
    pub fn computation_cost(&self, function: &str, architecture: usize) -> EdgeWeight {
        assert!(architecture < self.default_costs.len(), "architecture index out of range");
        assert!(self.node_exists(function), "cost query for an unrecorded function");

        let accesses = self.fault_graph.out_weight(function);
        let cost = accesses * self.default_costs[architecture];

        let parallel = if self.is_parallel[function] {
            self.parallelism[architecture]
        } else {
            1
        };

        cost / parallel
    }

    /// Fold the two directed recordings into the single undirected cost
    /// graph that gets partitioned.
    pub fn build_cost_graph(&self) -> UndirectedGraph {
        let mut g = UndirectedGraph::new();
        let all = self.call_graph.all_nodes();

        // Same vertices as the recordings.
        for n in &all {
            g.add_node(n);
        }

        // Cost for every ordered pair; most pairs cost 0 and get no edge.
        // The sources are directed so both a->b and b->a are considered, and
        // the two contributions coalesce into a single a--b edge.
        for n1 in &all {
            for n2 in &all {
                if n1 == n2 {
                    continue;
                }
                let cost = self.edge_cost(n1, n2);
                if cost > 0 {
                    g.add_edge(n1, n2, cost);
                }
            }
        }

        // Computation cost enters through one synthetic vertex per
        // architecture, connected to every function.
        for anchor in &self.anchor_names {
            g.add_node(anchor);
        }

        for n in &all {
            // The anchor and architecture number are crossed on purpose.
            // The weight is the penalty of *not* running on that anchor: a
            // function that runs well on architecture 0 and badly on 1 must
            // be expensive to separate from anchor 0.
            g.add_edge(&self.anchor_names[0], n, self.computation_cost(n, 1));
            g.add_edge(n, &self.anchor_names[1], self.computation_cost(n, 0));
        }

        // 'main' can only legally live on the primary architecture, so give
        // it a weight no sensible cut would ever pay to separate.
        g.add_edge(&self.anchor_names[0], "main", PIN_WEIGHT);

        g
    }
}

#[cfg(test)]
mod test {
    use super::{CostParams, FunctionGraph};
    use crate::graph::weighted::PIN_WEIGHT;

    const MIGRATION_COST: u64 = 1000;
    const PAGE_FAULT_COST: u64 = 100;
    const COMPUTE_COST_ARCH0: u64 = 50;
    const COMPUTE_COST_ARCH1: u64 = 200;

    fn modeled() -> FunctionGraph {
        let mut fg = FunctionGraph::new(
            MIGRATION_COST,
            PAGE_FAULT_COST,
            "&A",
            CostParams { per_access: COMPUTE_COST_ARCH0, parallelism: 1 },
            "&B",
            CostParams { per_access: COMPUTE_COST_ARCH1, parallelism: 2 },
        );

        // 'main' only exists to kick off 'foo'.
        fg.call("main", "foo");

        // Call stack over time, with 100 accesses at each stage, every
        // stage touching the data of the one before it:
        //   foo           100
        //   foo bar       100
        //   foo bar baz   100
        //   foo           100
        fg.incur_page_fault("foo", "foo", 100);
        fg.call("foo", "bar");
        fg.incur_page_fault("bar", "foo", 100);
        fg.call("bar", "baz");
        fg.incur_page_fault("baz", "bar", 100);
        fg.incur_page_fault("foo", "baz", 100);

        fg
    }

    #[test]
    fn modeled_counts() {
        let fg = modeled();

        assert_eq!(fg.num_calls("foo", "foo"), 0);
        assert_eq!(fg.num_calls("foo", "bar"), 1);
        assert_eq!(fg.num_calls("foo", "baz"), 0);
        assert_eq!(fg.num_calls("bar", "foo"), 0);
        assert_eq!(fg.num_calls("bar", "baz"), 1);
        assert_eq!(fg.num_calls("baz", "bar"), 0);

        assert_eq!(fg.num_non_faults("foo"), 100);
        assert_eq!(fg.num_non_faults("bar"), 0);
        assert_eq!(fg.num_non_faults("baz"), 0);

        assert_eq!(fg.num_page_faults("foo", "bar"), 0);
        assert_eq!(fg.num_page_faults("foo", "baz"), 100);
        assert_eq!(fg.num_page_faults("bar", "foo"), 100);
        assert_eq!(fg.num_page_faults("baz", "bar"), 100);
        assert_eq!(fg.num_page_faults("baz", "foo"), 0);

        assert_eq!(fg.total_accesses(), 400); // 100 non-faults + 300 faults.
        assert_eq!(fg.total_calls(), 3); // main->foo->bar->baz
    }

    #[test]
    fn modeled_costs() {
        let fg = modeled();

        assert_eq!(fg.edge_cost("foo", "bar"), MIGRATION_COST);
        assert_eq!(fg.edge_cost("foo", "baz"), 100 * PAGE_FAULT_COST);
        assert_eq!(fg.edge_cost("bar", "foo"), 100 * PAGE_FAULT_COST);
        assert_eq!(fg.edge_cost("bar", "baz"), MIGRATION_COST);
        assert_eq!(fg.edge_cost("baz", "foo"), 0);
        assert_eq!(fg.edge_cost("baz", "bar"), 100 * PAGE_FAULT_COST);

        assert_eq!(fg.computation_cost("foo", 0), 200 * COMPUTE_COST_ARCH0);
        assert_eq!(fg.computation_cost("foo", 1), 200 * COMPUTE_COST_ARCH1);
        assert_eq!(fg.computation_cost("bar", 0), 100 * COMPUTE_COST_ARCH0);
        assert_eq!(fg.computation_cost("bar", 1), 100 * COMPUTE_COST_ARCH1);
        assert_eq!(fg.computation_cost("baz", 0), 100 * COMPUTE_COST_ARCH0);
        assert_eq!(fg.computation_cost("baz", 1), 100 * COMPUTE_COST_ARCH1);
    }

    #[test]
    fn parallel_scaling() {
        let mut fg = modeled();

        // Parallelism divides the compute cost, but only on architectures
        // that have any to offer (arch 0 is single-threaded here).
        fg.set_parallel("foo", true);
        assert_eq!(fg.computation_cost("foo", 0), 200 * COMPUTE_COST_ARCH0);
        assert_eq!(fg.computation_cost("foo", 1), 200 * COMPUTE_COST_ARCH1 / 2);
    }

    #[test]
    fn parallel_propagation() {
        let mut fg = FunctionGraph::new(
            1,
            1,
            "&A",
            CostParams { per_access: 1, parallelism: 1 },
            "&B",
            CostParams { per_access: 1, parallelism: 1 },
        );
        fg.call("main", "worker");
        fg.call("worker", "helper");
        fg.call("helper", "util");
        fg.call("main", "other");

        fg.set_parallel("worker", true);

        assert!(fg.is_parallel("worker"));
        assert!(fg.is_parallel("helper"));
        assert!(fg.is_parallel("util"));
        assert!(!fg.is_parallel("main"));
        assert!(!fg.is_parallel("other"));
    }

    #[test]
    fn parallel_propagation_terminates_on_cycles() {
        let mut fg = FunctionGraph::new(
            1,
            1,
            "&A",
            CostParams { per_access: 1, parallelism: 1 },
            "&B",
            CostParams { per_access: 1, parallelism: 1 },
        );
        fg.call("main", "ping");
        fg.call("ping", "pong");
        fg.call("pong", "ping");

        fg.set_parallel("ping", true);

        assert!(fg.is_parallel("ping"));
        assert!(fg.is_parallel("pong"));
        assert!(!fg.is_parallel("main"));
    }

    #[test]
    fn load_parallel_list() {
        let mut fg = FunctionGraph::new(
            1,
            1,
            "&A",
            CostParams { per_access: 1, parallelism: 1 },
            "&B",
            CostParams { per_access: 1, parallelism: 1 },
        );
        fg.call("main", "worker");
        fg.call("main", "other");

        let list = b"worker  \n\n\nnever_ran\n";
        fg.load_parallel_functions(&list[..]).unwrap();

        assert!(fg.is_parallel("worker"));
        assert!(!fg.is_parallel("other"));
        // Functions that never executed are silently skipped.
        assert!(!fg.node_exists("never_ran"));
    }

    #[test]
    fn cost_graph() {
        let fg = modeled();
        let g = fg.build_cost_graph();

        // foo->bar (one call) and bar->foo (100 faults) coalesce.
        assert_eq!(g.edge("foo", "bar"), MIGRATION_COST + 100 * PAGE_FAULT_COST);
        assert_eq!(g.edge("foo", "baz"), 100 * PAGE_FAULT_COST);
        assert_eq!(g.edge("bar", "baz"), MIGRATION_COST + 100 * PAGE_FAULT_COST);

        // Anchors carry the cost of running on the *other* architecture.
        assert_eq!(g.edge("&A", "foo"), 200 * COMPUTE_COST_ARCH1);
        assert_eq!(g.edge("foo", "&B"), 200 * COMPUTE_COST_ARCH0);

        // 'main' never touched memory: its compute cost is 0, leaving only
        // the pin onto the primary architecture.
        assert_eq!(g.edge("&A", "main"), PIN_WEIGHT);
        assert_eq!(g.edge("main", "&B"), 0);
    }
}
