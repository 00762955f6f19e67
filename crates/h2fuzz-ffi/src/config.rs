use std::cell::RefCell;
use std::os::raw::c_char;

use h2fuzz_mutator::{MutationConfig, Mutator};

use crate::args;
use crate::error;
use crate::types::H2fuzzResult;

thread_local! {
    static MUTATOR: RefCell<Mutator> = RefCell::new(Mutator::new(MutationConfig::default()));
}

/// Run `f` with this thread's mutator.
pub(crate) fn with_mutator<T>(f: impl FnOnce(&mut Mutator) -> T) -> T {
    MUTATOR.with(|mutator| f(&mut mutator.borrow_mut()))
}

/// Load a JSON mutation profile for the calling thread.
///
/// On failure the current profile is kept.
///
/// # Safety
/// `path` must be a non-null pointer to a valid UTF-8, NUL-terminated C string.
#[no_mangle]
pub unsafe extern "C" fn h2fuzz_config_load(path: *const c_char) -> H2fuzzResult {
    crate::ffi_boundary(H2fuzzResult::Internal, || {
        error::clear_error_state();

        let path = {
            // SAFETY: We validate null and UTF-8 in helper.
            match unsafe { args::required_str_arg(path, "path") } {
                Some(v) => v,
                None => return H2fuzzResult::InvalidArgument,
            }
        };

        match MutationConfig::from_file(path) {
            Ok(config) => {
                tracing::debug!(path, "loaded mutation profile");
                with_mutator(|mutator| *mutator = Mutator::new(config));
                H2fuzzResult::Ok
            }
            Err(err) => error::map_config_error(&err),
        }
    })
}

/// Go back to the default mutation profile on the calling thread.
#[no_mangle]
pub extern "C" fn h2fuzz_config_reset() {
    crate::ffi_boundary((), || {
        error::clear_error_state();
        with_mutator(|mutator| *mutator = Mutator::new(MutationConfig::default()));
    });
}

#[cfg(test)]
mod tests {
    use std::ffi::CString;

    use super::*;

    #[test]
    fn missing_file_keeps_default_profile() {
        let path = CString::new("/nonexistent/h2fuzz-profile.json").unwrap();
        // SAFETY: `path` is a valid NUL-terminated C string.
        let result = unsafe { h2fuzz_config_load(path.as_ptr()) };
        assert_eq!(result, H2fuzzResult::ConfigError);
        assert_eq!(error::last_error_code(), H2fuzzResult::ConfigError);
        with_mutator(|mutator| assert_eq!(mutator.config(), &MutationConfig::default()));
    }

    #[test]
    fn null_path_is_invalid() {
        // SAFETY: Null is handled by the argument check.
        let result = unsafe { h2fuzz_config_load(std::ptr::null()) };
        assert_eq!(result, H2fuzzResult::InvalidArgument);
    }

    #[test]
    fn load_then_reset() {
        let dir = std::env::temp_dir().join(format!("h2fuzz-ffi-config-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let file = dir.join("profile.json");
        std::fs::write(
            &file,
            r#"{"likelihoods": {"mutate_operators": {"bit": 0, "delete": 100, "dup": 0, "swap": 0, "fix": 0}}}"#,
        )
        .unwrap();

        let path = CString::new(file.to_str().unwrap()).unwrap();
        // SAFETY: `path` is a valid NUL-terminated C string.
        assert_eq!(unsafe { h2fuzz_config_load(path.as_ptr()) }, H2fuzzResult::Ok);
        with_mutator(|mutator| {
            assert_eq!(mutator.config().likelihoods.mutate_operators.delete, 100);
        });

        h2fuzz_config_reset();
        with_mutator(|mutator| assert_eq!(mutator.config(), &MutationConfig::default()));
        let _ = std::fs::remove_dir_all(&dir);
    }
}
