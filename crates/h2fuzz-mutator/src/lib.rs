//! Structure-aware mutation and crossover of HTTP/2 frame streams.
//!
//! A [`Mutator`] edits a decoded [`Stream`](h2fuzz_frame::Stream) one unit at
//! a time: a frame, a field of a frame, one header of a header block or one
//! setting. HPACK references are repaired after every edit so the result
//! still decodes, and the serialized size never exceeds the caller's budget.
//!
//! ```
//! use h2fuzz_frame::{DataFrame, Stream};
//! use h2fuzz_mutator::{MutationConfig, Mutator, SeededRng};
//!
//! let mut stream = Stream::from_frames(vec![DataFrame::new(1, b"hello".to_vec())]).unwrap();
//! let mut mutator = Mutator::new(MutationConfig::default());
//! let outcome = mutator.mutate(&mut stream, &mut SeededRng::new(7), 256).unwrap();
//! assert!(stream.size() <= 256);
//! # let _ = outcome;
//! ```

pub mod byte_mutator;
pub mod config;
pub mod engine;
pub mod error;
pub mod patch;
pub mod rng;

mod crossover;
mod fields;
mod frames;
mod headers;
mod settings;
mod smart;

pub use byte_mutator::{ByteMutator, DefaultByteMutator};
pub use config::{
    CrossoverOperators, FieldGroup, FieldRep, FrameField, Likelihoods, MutableFields,
    MutateOperators, MutationConfig, ALL_FIELDS,
};
pub use engine::{Mutator, Outcome, SkipReason};
pub use error::{ConfigError, MutateError, Result};
pub use patch::HeaderPos;
pub use rng::{RandomSource, SeededRng, SequenceRng};
