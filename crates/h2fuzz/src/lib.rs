//! Structure-aware fuzzing of HTTP/2 frame streams.
//!
//! h2fuzz decodes raw HTTP/2 traffic into frames, mutates it one unit at a
//! time while keeping HPACK references valid, and encodes it back within a
//! size budget.
//!
//! # Crate Structure
//!
//! - [`hpack`]: HPACK integer/string primitives, tables, encoder and decoder
//! - [`frame`]: frame model, wire codec and the [`frame::Stream`] container
//! - [`mutator`]: mutation and crossover engine with dependency repair

/// Re-export HPACK types.
pub mod hpack {
    pub use h2fuzz_hpack::*;
}

/// Re-export frame types.
pub mod frame {
    pub use h2fuzz_frame::*;
}

/// Re-export mutation engine types.
pub mod mutator {
    pub use h2fuzz_mutator::*;
}
