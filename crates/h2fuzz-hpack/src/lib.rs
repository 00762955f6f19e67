//! Literal-only HPACK (RFC 7541) for structure-aware fuzzing.
//!
//! Unlike a conformant codec, every header field keeps the representation it
//! was decoded with:
//! - a [`PrefixType`] (indexed, literal with/without/never indexing)
//! - an [`IndexingType`] (which parts come from the table)
//!
//! Re-encoding reproduces those choices, and the [`Encoder`] refuses any
//! choice the current table state cannot back. Strings are never Huffman
//! coded.

pub mod decoder;
pub mod encoder;
pub mod error;
pub mod field;
pub mod primitives;
pub mod static_table;
pub mod table;

pub use decoder::{DecodedBlock, Decoder};
pub use encoder::Encoder;
pub use error::{HpackError, Result};
pub use field::{literal_size, HeaderField, IndexingType, PrefixType};
pub use primitives::{integer_len, string_len, STRING_PREFIX_BITS};
pub use static_table::STATIC_LEN;
pub use table::{
    entry_size, DynamicTable, TableMatch, DEFAULT_MAX_TABLE_SIZE, ENTRY_OVERHEAD, MAX_WIRE_INDEX,
};
