use std::path::PathBuf;

use h2fuzz_frame::{FrameError, FrameKind};
use h2fuzz_hpack::HpackError;

use crate::config::{FieldGroup, FrameField};

/// Errors returned by the mutation and crossover engine.
///
/// A mutation that cannot be applied is not an error; see
/// [`Outcome`](crate::Outcome).
#[derive(Debug, thiserror::Error)]
pub enum MutateError {
    /// The input did not decode, or a frame could not be encoded.
    #[error(transparent)]
    Frame(#[from] FrameError),

    /// An operation produced a header encoding the table cannot back. The
    /// stream has been restored to its state before the call.
    #[error("illegal header encoding after mutation: {0}")]
    Hpack(#[from] HpackError),

    /// The mutation configuration is invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Errors raised while loading or validating a [`MutationConfig`](crate::MutationConfig).
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The configuration is not valid JSON or does not match the schema.
    #[error("invalid config JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// A probability table does not add up to 100.
    #[error("{group} likelihoods sum to {sum}, expected 100")]
    LikelihoodSum { group: &'static str, sum: u32 },

    /// A single probability lies outside 0..=100.
    #[error("probability {name} = {value} is outside 0..=100")]
    ProbabilityRange { name: &'static str, value: u32 },

    /// A field is listed under a frame kind that does not carry it.
    #[error("field {field:?} in group {group:?} does not apply to {frame} frames")]
    FieldNotApplicable {
        frame: FrameKind,
        field: FrameField,
        group: FieldGroup,
    },
}

pub type Result<T> = std::result::Result<T, MutateError>;
