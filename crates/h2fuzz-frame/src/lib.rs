//! HTTP/2 frames for structure-aware fuzzing.
//!
//! Frames decode into a sealed [`Frame`] enum and serialize back byte for
//! byte. The stored length is never recomputed on the way out, so it can be
//! fuzzed independently of the payload. A [`Stream`] holds the frames of one
//! connection, encodes all header blocks with a single HPACK context, and
//! tracks its serialized size incrementally.

pub mod codec;
pub mod error;
pub mod frame;
pub mod header_list;
pub mod kind;
pub mod stream;

pub use codec::{decode_frame, encode_block, encode_frame};
pub use error::{FrameError, Result};
pub use frame::{
    ContinuationFrame, DataFrame, DepWeight, Frame, FrameHead, GoAwayFrame, HasHeaders,
    HasPadding, HeadersFrame, Padding, PingFrame, PriorityFrame, PushPromiseFrame,
    RstStreamFrame, Setting, SettingsFrame, WindowUpdateFrame, DEP_WEIGHT_SIZE, SETTING_SIZE,
    SETTINGS_INITIAL_WINDOW_SIZE,
};
pub use header_list::HeaderList;
pub use kind::{
    FrameKind, ACK, END_HEADERS, END_STREAM, HEADER_SIZE, MAX_LENGTH, MAX_STREAM_ID, PADDED,
    PRIORITY,
};
pub use stream::Stream;

pub use h2fuzz_hpack as hpack;
