use h2fuzz_hpack::HpackError;

/// Errors that can occur during frame encoding/decoding.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FrameError {
    /// The buffer ended before a complete frame header or payload.
    #[error("frame truncated (needed {needed} bytes, {available} available)")]
    Truncated { needed: usize, available: usize },

    /// The type byte is not one of the ten RFC 7540 frame kinds.
    #[error("unknown frame type 0x{0:02x}")]
    UnknownFrameType(u8),

    /// The stored length cannot hold the fields the flags announce.
    #[error("malformed frame: {0}")]
    Malformed(String),

    /// A header block failed to decode, or could not be encoded.
    #[error("HPACK: {0}")]
    Hpack(#[from] HpackError),
}

impl FrameError {
    /// True for errors caused by malformed input rather than an illegal
    /// encoding built in memory.
    pub fn is_malformed(&self) -> bool {
        match self {
            FrameError::Hpack(err) => err.is_malformed(),
            _ => true,
        }
    }
}

pub type Result<T> = std::result::Result<T, FrameError>;
