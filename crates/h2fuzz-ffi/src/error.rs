use std::cell::{Cell, RefCell};
use std::ffi::CString;
use std::os::raw::c_char;

use h2fuzz_mutator::{ConfigError, MutateError, SkipReason};

use crate::types::H2fuzzResult;

thread_local! {
    static LAST_ERROR: RefCell<CString> = RefCell::new(CString::default());
    static LAST_CODE: Cell<H2fuzzResult> = const { Cell::new(H2fuzzResult::Ok) };
}

pub(crate) fn clear_error_state() {
    LAST_ERROR.with(|state| {
        *state.borrow_mut() = CString::default();
    });
    LAST_CODE.with(|code| code.set(H2fuzzResult::Ok));
}

fn set_error(code: H2fuzzResult, message: impl Into<String>) -> H2fuzzResult {
    let message = message.into();
    let sanitized = message.replace('\0', "?");
    LAST_ERROR.with(|state| {
        *state.borrow_mut() = CString::new(sanitized).unwrap_or_default();
    });
    LAST_CODE.with(|last| last.set(code));
    code
}

pub(crate) fn set_invalid_argument(message: impl Into<String>) -> H2fuzzResult {
    set_error(H2fuzzResult::InvalidArgument, message)
}

pub(crate) fn set_panic_error() {
    let _ = set_error(H2fuzzResult::Internal, "panic across FFI boundary");
}

pub(crate) fn set_no_change(reason: SkipReason) {
    let _ = set_error(H2fuzzResult::NoChange, format!("no change: {reason}"));
}

pub(crate) fn set_output_too_large(len: usize, max: usize) {
    let _ = set_error(
        H2fuzzResult::NoChange,
        format!("no change: output of {len} bytes exceeds {max}"),
    );
}

pub(crate) fn map_config_error(err: &ConfigError) -> H2fuzzResult {
    set_error(H2fuzzResult::ConfigError, err.to_string())
}

/// Record why a mutate or crossover call produced nothing.
pub(crate) fn map_mutate_error(err: &MutateError) -> H2fuzzResult {
    let code = match err {
        MutateError::Frame(frame) if frame.is_malformed() => {
            tracing::warn!(error = %frame, "rejected malformed input");
            H2fuzzResult::MalformedInput
        }
        MutateError::Frame(_) | MutateError::Hpack(_) => {
            tracing::error!(error = %err, "encoding defect");
            H2fuzzResult::EncodingError
        }
        MutateError::Config(_) => H2fuzzResult::ConfigError,
    };
    set_error(code, err.to_string())
}

pub(crate) fn last_error_ptr() -> *const c_char {
    LAST_ERROR.with(|state| state.borrow().as_ptr())
}

pub(crate) fn last_error_code() -> H2fuzzResult {
    LAST_CODE.with(Cell::get)
}
