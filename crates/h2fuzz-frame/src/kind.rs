//! Frame type codes and flag bits (RFC 7540 section 6).

/// Size of the fixed frame header.
pub const HEADER_SIZE: usize = 9;

/// Largest value the 24-bit length field can carry.
pub const MAX_LENGTH: u32 = 0x00ff_ffff;

/// Largest 31-bit stream identifier.
pub const MAX_STREAM_ID: u32 = 0x7fff_ffff;

pub const END_STREAM: u8 = 0x01;
pub const ACK: u8 = 0x01;
pub const END_HEADERS: u8 = 0x04;
pub const PADDED: u8 = 0x08;
pub const PRIORITY: u8 = 0x20;

/// The ten frame kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum FrameKind {
    Data = 0x0,
    Headers = 0x1,
    Priority = 0x2,
    RstStream = 0x3,
    Settings = 0x4,
    PushPromise = 0x5,
    Ping = 0x6,
    GoAway = 0x7,
    WindowUpdate = 0x8,
    Continuation = 0x9,
}

impl FrameKind {
    pub const ALL: [FrameKind; 10] = [
        FrameKind::Data,
        FrameKind::Headers,
        FrameKind::Priority,
        FrameKind::RstStream,
        FrameKind::Settings,
        FrameKind::PushPromise,
        FrameKind::Ping,
        FrameKind::GoAway,
        FrameKind::WindowUpdate,
        FrameKind::Continuation,
    ];

    pub fn from_u8(byte: u8) -> Option<Self> {
        Self::ALL.get(usize::from(byte)).copied()
    }

    pub fn as_u8(self) -> u8 {
        self as u8
    }

    /// RFC 7540 name, e.g. `PUSH_PROMISE`.
    pub fn name(self) -> &'static str {
        match self {
            FrameKind::Data => "DATA",
            FrameKind::Headers => "HEADERS",
            FrameKind::Priority => "PRIORITY",
            FrameKind::RstStream => "RST_STREAM",
            FrameKind::Settings => "SETTINGS",
            FrameKind::PushPromise => "PUSH_PROMISE",
            FrameKind::Ping => "PING",
            FrameKind::GoAway => "GOAWAY",
            FrameKind::WindowUpdate => "WINDOW_UPDATE",
            FrameKind::Continuation => "CONTINUATION",
        }
    }

    /// Whether END_STREAM is meaningful for this kind.
    pub fn can_end_stream(self) -> bool {
        matches!(self, FrameKind::Data | FrameKind::Headers)
    }

    /// Whether this kind carries a header block fragment.
    pub fn carries_headers(self) -> bool {
        matches!(
            self,
            FrameKind::Headers | FrameKind::PushPromise | FrameKind::Continuation
        )
    }
}

impl std::fmt::Display for FrameKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
