// Copyright (c) 2024 <Wei Li>.
//
// This source code is licensed under the GNU license found in the
// LICENSE file in the root directory of this source tree.

//! The C surface called by the instrumentation inserted into the traced
//! program.
//!
//! These are the only entry points the compiler pass knows about.
//! `ptrack_init` must run before main's body begins; it registers
//! `ptrack_destroy` to run at process exit, which performs the whole
//! analysis. Null or non-UTF-8 names mean the instrumentation itself is
//! broken, and abort.

use libc::{c_char, c_void};
use std::ffi::CStr;

use crate::record;

fn as_name<'a>(name: *const c_char) -> &'a str {
    assert!(!name.is_null(), "instrumentation passed a null function name");
    unsafe { CStr::from_ptr(name) }
        .to_str()
        .expect("instrumentation passed a non-UTF-8 function name")
}

/// Called once, before any other entry point. Initialises the recorder and
/// arranges for the analysis to run at process exit.
#[no_mangle]
pub extern "C" fn ptrack_init() {
    record::init();
    unsafe {
        libc::atexit(ptrack_destroy);
    }
}

/// Called upon entering a function. Currently has no effect.
#[no_mangle]
pub extern "C" fn ptrack_enter_func(fname: *const c_char) {
    record::enter_func(as_name(fname));
}

/// Called just before `caller` calls `callee`.
#[no_mangle]
pub extern "C" fn ptrack_call_func(caller: *const c_char, callee: *const c_char) {
    record::call_func(as_name(caller), as_name(callee));
}

/// Called just before `fname` reads from `addr`.
#[no_mangle]
pub extern "C" fn ptrack_memory_read(fname: *const c_char, addr: *const c_void) {
    record::mem_read(as_name(fname), addr as u64);
}

/// Called just before `fname` writes to `addr`.
#[no_mangle]
pub extern "C" fn ptrack_memory_write(fname: *const c_char, addr: *const c_void) {
    record::mem_write(as_name(fname), addr as u64);
}

/// Called once at process exit (normally via the atexit hook installed by
/// [`ptrack_init`]); processes everything recorded and emits the partition.
#[no_mangle]
pub extern "C" fn ptrack_destroy() {
    record::teardown();
}
