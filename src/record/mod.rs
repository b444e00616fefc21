// Copyright (c) 2024 <Wei Li>.
//
// This source code is licensed under the GNU license found in the
// LICENSE file in the root directory of this source tree.

//! The event recorder that the instrumented program reports into.
//!
//! An [`EventSink`] owns the page tracker and the function graph and turns
//! the raw call/read/write event stream into graph updates. The traced
//! program talks to a single process-wide sink (see [`init`], [`teardown`]
//! and the C surface in [`crate::ffi`]); the replay driver owns one
//! directly.
//!
//! Recording is strictly single-threaded: every entry point runs to
//! completion before the traced program resumes, and no callback may be
//! issued concurrently from multiple threads. A multi-threaded program must
//! serialize its event dispatch before it reaches the sink; the mutex below
//! only enforces the contract, it does not make concurrent recording
//! meaningful.

use lazy_static::lazy_static;
use log::debug;
use std::sync::Mutex;

use crate::analysis;
use crate::graph::{EdgeWeight, FunctionGraph};
use crate::util::options::AnalysisOptions;

pub mod cost;
pub mod known_names;
pub mod page_tracker;
pub mod trace;

use page_tracker::PageTracker;

pub struct EventSink {
    tracker: PageTracker,
    functions: FunctionGraph,
}

impl Default for EventSink {
    fn default() -> Self {
        Self::new()
    }
}

impl EventSink {
    /// A sink with the default cost table.
    pub fn new() -> Self {
        Self::with_costs(cost::MIGRATION_COST, cost::PAGE_FAULT_COST)
    }

    /// A sink with overridden migration and page-fault scalars; the
    /// per-architecture compute costs stay at their defaults.
    pub fn with_costs(migration_cost: EdgeWeight, page_fault_cost: EdgeWeight) -> Self {
        EventSink {
            tracker: PageTracker::new(),
            functions: FunctionGraph::new(
                migration_cost,
                page_fault_cost,
                cost::HOST_ANCHOR,
                cost::host_costs(),
                cost::ACCELERATOR_ANCHOR,
                cost::accelerator_costs(),
            ),
        }
    }

    /// Reserved for future profiling; currently has no effect.
    pub fn enter_function(&mut self, _name: &str) {}

    /// `caller` is about to call `callee`.
    pub fn call_function(&mut self, caller: &str, callee: &str) {
        debug!("'{}' calling '{}'", caller, callee);

        if known_names::is_compiler_intrinsic(callee) {
            return;
        }

        self.functions.call(caller, callee);

        // Math-library bodies are never instrumented; charge them a token
        // number of self-accesses so their compute weight is not zero.
        if known_names::is_math_function(callee) {
            self.functions
                .incur_page_fault(callee, callee, known_names::MATH_CALL_FAULTS);
        }
    }

    /// `name` is about to read from `addr`.
    pub fn memory_read(&mut self, name: &str, addr: u64) {
        debug!("'{}' reading address {:#x}", name, addr);
        self.memory_access(name, addr);
    }

    /// `name` is about to write to `addr`.
    pub fn memory_write(&mut self, name: &str, addr: u64) {
        debug!("'{}' writing address {:#x}", name, addr);
        self.memory_access(name, addr);
    }

    // Ownership tracking never distinguishes reads from writes.
    fn memory_access(&mut self, name: &str, addr: u64) {
        let previous_owner = self.tracker.access(name, addr);

        // Always recorded, even when `name` already held the page (no fault
        // actually occurs then); the function graph knows the difference.
        if name != previous_owner {
            debug!("'{}' potentially faults against '{}'", name, previous_owner);
        }
        self.functions.incur_page_fault(name, &previous_owner, 1);
    }

    pub fn functions(&self) -> &FunctionGraph {
        &self.functions
    }

    /// Give up recording and hand the accumulated graphs to analysis.
    pub fn into_functions(self) -> FunctionGraph {
        self.functions
    }
}

lazy_static! {
    static ref SINK: Mutex<Option<EventSink>> = Mutex::new(None);
}

fn with_sink<R>(f: impl FnOnce(&mut EventSink) -> R) -> R {
    let mut guard = SINK.lock().unwrap();
    let sink = guard.as_mut().expect("ptrack has not been initialised");
    f(sink)
}

/// Create the process-wide sink. Must be called exactly once, before any
/// other entry point.
pub fn init() {
    let mut guard = SINK.lock().unwrap();
    assert!(guard.is_none(), "ptrack has already been initialised");
    *guard = Some(EventSink::new());
}

/// See [`EventSink::enter_function`].
pub fn enter_func(name: &str) {
    with_sink(|sink| sink.enter_function(name));
}

/// See [`EventSink::call_function`].
pub fn call_func(caller: &str, callee: &str) {
    with_sink(|sink| sink.call_function(caller, callee));
}

/// See [`EventSink::memory_read`].
pub fn mem_read(name: &str, addr: u64) {
    with_sink(|sink| sink.memory_read(name, addr));
}

/// See [`EventSink::memory_write`].
pub fn mem_write(name: &str, addr: u64) {
    with_sink(|sink| sink.memory_write(name, addr));
}

/// Consume the process-wide sink and run the teardown analysis with default
/// options. Called once at process exit; any entry point after this is a
/// bug in the instrumentation.
pub fn teardown() {
    let sink = SINK
        .lock()
        .unwrap()
        .take()
        .expect("ptrack has not been initialised");
    let mut functions = sink.into_functions();
    analysis::run(&mut functions, &AnalysisOptions::default());
}

#[cfg(test)]
mod test {
    use super::EventSink;

    #[test]
    fn records_calls_and_accesses() {
        let mut sink = EventSink::with_costs(1000, 100);

        sink.call_function("main", "foo");
        sink.memory_read("foo", 0x1000);
        sink.memory_write("foo", 0x1008);
        sink.memory_read("bar", 0x1010);

        let fg = sink.functions();
        assert_eq!(fg.num_calls("main", "foo"), 1);
        // First touch faults against 'main', the second is a non-fault, and
        // 'bar' then faults against 'foo'.
        assert_eq!(fg.num_page_faults("foo", "main"), 1);
        assert_eq!(fg.num_non_faults("foo"), 1);
        assert_eq!(fg.num_page_faults("bar", "foo"), 1);
        assert_eq!(fg.total_accesses(), 3);
    }

    #[test]
    fn drops_compiler_intrinsics() {
        let mut sink = EventSink::new();

        sink.call_function("main", "llvm.memset.p0i8.i64");

        let fg = sink.functions();
        assert!(!fg.node_exists("llvm.memset.p0i8.i64"));
        assert_eq!(fg.total_calls(), 0);
    }

    #[test]
    fn charges_math_library_calls() {
        let mut sink = EventSink::new();

        sink.call_function("kernel", "sqrt");

        let fg = sink.functions();
        assert_eq!(fg.num_calls("kernel", "sqrt"), 1);
        assert_eq!(fg.num_non_faults("sqrt"), 3);
    }

    #[test]
    fn enter_is_a_no_op() {
        let mut sink = EventSink::new();
        sink.enter_function("main");
        assert_eq!(sink.functions().total_calls(), 0);
        assert_eq!(sink.functions().total_accesses(), 0);
    }
}
