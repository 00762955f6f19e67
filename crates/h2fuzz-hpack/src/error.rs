/// Errors raised while encoding or decoding HPACK header blocks.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HpackError {
    /// The block ended in the middle of an integer, string, or opcode.
    #[error("header block truncated")]
    Truncated,

    /// A prefixed integer does not fit in 32 bits.
    #[error("HPACK integer overflow")]
    IntegerOverflow,

    /// An index references neither the static nor the dynamic table.
    #[error("table index {0} out of range")]
    InvalidIndex(u64),

    /// A dynamic table size update exceeds the negotiated maximum.
    #[error("table size update {size} exceeds maximum {max}")]
    SizeUpdateTooLarge { size: u64, max: usize },

    /// A dynamic table size update appeared after a header field.
    #[error("table size update after a header field")]
    SizeUpdateAfterField,

    /// Huffman-coded string literals are not supported.
    #[error("Huffman-coded string literal not supported")]
    HuffmanUnsupported,

    /// A prefix/indexing combination that cannot be encoded in the current
    /// table state. Only a mutator defect can produce this.
    #[error("illegal encoding for header {position}: {reason}")]
    IllegalEncoding {
        position: usize,
        reason: &'static str,
    },
}

impl HpackError {
    /// True for every variant raised while decoding untrusted input.
    pub fn is_malformed(&self) -> bool {
        !matches!(self, HpackError::IllegalEncoding { .. })
    }
}

pub type Result<T> = std::result::Result<T, HpackError>;
