use std::fmt;
use std::io;

use h2fuzz_frame::FrameError;
use h2fuzz_mutator::{ConfigError, MutateError};

pub const SUCCESS: i32 = 0;
pub const FAILURE: i32 = 1;
pub const PERMISSION_DENIED: i32 = 50;
pub const DATA_INVALID: i32 = 60;
pub const USAGE: i32 = 64;
pub const NOT_FOUND: i32 = 66;
pub const INTERNAL: i32 = 125;

pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug)]
pub struct CliError {
    pub code: i32,
    pub message: String,
}

impl CliError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

pub fn io_error(context: &str, err: io::Error) -> CliError {
    let code = match err.kind() {
        io::ErrorKind::PermissionDenied => PERMISSION_DENIED,
        io::ErrorKind::NotFound => NOT_FOUND,
        _ => INTERNAL,
    };
    CliError::new(code, format!("{context}: {err}"))
}

/// Malformed input is the caller's data; anything else is an encoder defect.
pub fn frame_error(context: &str, err: FrameError) -> CliError {
    let code = if err.is_malformed() {
        DATA_INVALID
    } else {
        INTERNAL
    };
    CliError::new(code, format!("{context}: {err}"))
}

pub fn config_error(context: &str, err: ConfigError) -> CliError {
    match err {
        ConfigError::Io { source, .. } => io_error(context, source),
        other => CliError::new(USAGE, format!("{context}: {other}")),
    }
}

pub fn mutate_error(context: &str, err: MutateError) -> CliError {
    match err {
        MutateError::Frame(err) => frame_error(context, err),
        MutateError::Config(err) => config_error(context, err),
        MutateError::Hpack(err) => CliError::new(INTERNAL, format!("{context}: {err}")),
    }
}
