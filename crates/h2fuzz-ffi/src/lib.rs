//! h2fuzz-ffi: C-ABI custom mutator and crossover entry points.
//!
//! Each thread keeps its own mutation profile; see [`h2fuzz_config_load`].

mod args;
mod config;
mod error;
#[cfg(feature = "libfuzzer")]
mod libfuzzer;
mod mutate;
mod types;

use std::panic::AssertUnwindSafe;

pub use config::{h2fuzz_config_load, h2fuzz_config_reset};
#[cfg(feature = "libfuzzer")]
pub use libfuzzer::{LLVMFuzzerCustomCrossOver, LLVMFuzzerCustomMutator};
pub use mutate::{h2fuzz_crossover, h2fuzz_mutate};
pub use types::{
    H2fuzzResult, H2FUZZ_ERR_CONFIG, H2FUZZ_ERR_ENCODING, H2FUZZ_ERR_INTERNAL,
    H2FUZZ_ERR_INVALID_ARGUMENT, H2FUZZ_ERR_MALFORMED_INPUT, H2FUZZ_NO_CHANGE, H2FUZZ_OK,
};

fn ffi_boundary<T>(on_panic: T, f: impl FnOnce() -> T) -> T {
    match std::panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(value) => value,
        Err(_) => {
            error::set_panic_error();
            on_panic
        }
    }
}

/// Message of the last failure on this thread, or an empty string.
#[no_mangle]
pub extern "C" fn h2fuzz_last_error() -> *const std::os::raw::c_char {
    ffi_boundary(std::ptr::null(), error::last_error_ptr)
}

/// Status of the last call on this thread. After a mutate or crossover call
/// that returned 0, this says why.
#[no_mangle]
pub extern "C" fn h2fuzz_last_error_code() -> H2fuzzResult {
    ffi_boundary(H2fuzzResult::Internal, error::last_error_code)
}
