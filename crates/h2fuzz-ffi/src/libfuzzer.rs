//! libFuzzer custom mutator hooks, enabled by the `libfuzzer` feature.
#![allow(non_snake_case)]

use std::os::raw::c_uint;

use crate::mutate::{h2fuzz_crossover, h2fuzz_mutate};

/// # Safety
/// Called by libFuzzer: `data` is writable for `max_size` bytes.
#[no_mangle]
pub unsafe extern "C" fn LLVMFuzzerCustomMutator(
    data: *mut u8,
    size: usize,
    max_size: usize,
    seed: c_uint,
) -> usize {
    // SAFETY: Forwarded libFuzzer contract.
    unsafe { h2fuzz_mutate(data, size, max_size, u64::from(seed)) }
}

/// # Safety
/// Called by libFuzzer: both inputs are readable for their sizes and `out`
/// is writable for `max_out_size` bytes.
#[no_mangle]
pub unsafe extern "C" fn LLVMFuzzerCustomCrossOver(
    data1: *const u8,
    size1: usize,
    data2: *const u8,
    size2: usize,
    out: *mut u8,
    max_out_size: usize,
    seed: c_uint,
) -> usize {
    // SAFETY: Forwarded libFuzzer contract.
    unsafe { h2fuzz_crossover(data1, size1, data2, size2, out, max_out_size, u64::from(seed)) }
}
