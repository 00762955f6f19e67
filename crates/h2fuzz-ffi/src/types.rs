/// Status codes of the configuration calls. The mutate and crossover calls
/// return a length instead; when it is 0, `h2fuzz_last_error_code` tells
/// why.
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum H2fuzzResult {
    Ok = 0,
    InvalidArgument = 1,
    ConfigError = 2,
    MalformedInput = 3,
    EncodingError = 4,
    /// The operation was skipped or its result did not fit.
    NoChange = 5,
    Internal = 99,
}

#[allow(dead_code)]
pub const H2FUZZ_OK: H2fuzzResult = H2fuzzResult::Ok;
#[allow(dead_code)]
pub const H2FUZZ_ERR_INVALID_ARGUMENT: H2fuzzResult = H2fuzzResult::InvalidArgument;
#[allow(dead_code)]
pub const H2FUZZ_ERR_CONFIG: H2fuzzResult = H2fuzzResult::ConfigError;
#[allow(dead_code)]
pub const H2FUZZ_ERR_MALFORMED_INPUT: H2fuzzResult = H2fuzzResult::MalformedInput;
#[allow(dead_code)]
pub const H2FUZZ_ERR_ENCODING: H2fuzzResult = H2fuzzResult::EncodingError;
#[allow(dead_code)]
pub const H2FUZZ_NO_CHANGE: H2fuzzResult = H2fuzzResult::NoChange;
#[allow(dead_code)]
pub const H2FUZZ_ERR_INTERNAL: H2fuzzResult = H2fuzzResult::Internal;
