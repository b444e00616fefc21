// Copyright (c) 2024 <Wei Li>.
//
// This source code is licensed under the GNU license found in the
// LICENSE file in the root directory of this source tree.

//! Well-known function names that the recorder treats in special ways.

use crate::graph::EdgeWeight;

/// Compiler-synthesized intrinsics (memset and friends) start with this
/// prefix. They can run locally on any node and their bodies are invisible
/// to the instrumentation, so calls to them are dropped; counting them would
/// bias against partitioning because they are used from everywhere.
pub const INTRINSIC_PREFIX: &str = "llvm.";

#[inline]
pub fn is_compiler_intrinsic(name: &str) -> bool {
    name.starts_with(INTRINSIC_PREFIX)
}

/// Math library functions whose cost matters to compute kernels but whose
/// bodies the instrumentation never sees. Treating them as free would be
/// clearly wrong, so each call is charged [`MATH_CALL_FAULTS`] self-accesses
/// to give them nonzero computation weight.
pub const MATH_FUNCTIONS: &[&str] = &["sqrt", "pow", "log", "exp", "sin", "cos"];

/// Self-accesses charged per math-library call. Three base per-access costs
/// is a guess at the real weight of one libm call; nothing downstream is
/// sensitive to the exact magnitude.
pub const MATH_CALL_FAULTS: EdgeWeight = 3;

#[inline]
pub fn is_math_function(name: &str) -> bool {
    MATH_FUNCTIONS.contains(&name)
}

/// With no recorded compute cost, libc entry points are free for any cut to
/// pull across, which is rarely what anyone wants for I/O and allocation.
/// These are forced onto the host by pinning them to the host anchor before
/// the cut runs.
pub const HOST_ONLY_FUNCTIONS: &[&str] = &[
    "fopen",
    "fclose",
    "fputc",
    "fputs",
    "putc",
    "putchar",
    "puts",
    "printf",
    "fprintf",
    "fread",
    "fwrite",
    "fseek",
    "unlink",
    "gettimeofday",
    "settimeofday",
    "sprintf",
    "atoi",
    "malloc",
    "calloc",
    "free",
    "strcmp",
    "strncmp",
    "strcat",
    "strncat",
    "strcpy",
    "strncpy",
    "strchr",
];

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn intrinsics() {
        assert!(is_compiler_intrinsic("llvm.memset.p0i8.i64"));
        assert!(is_compiler_intrinsic("llvm.dbg.value"));
        assert!(!is_compiler_intrinsic("memset"));
        assert!(!is_compiler_intrinsic("my_llvm.helper"));
    }

    #[test]
    fn math_functions() {
        assert!(is_math_function("sqrt"));
        assert!(is_math_function("cos"));
        assert!(!is_math_function("sqrtf"));
        assert!(!is_math_function("printf"));
    }
}
