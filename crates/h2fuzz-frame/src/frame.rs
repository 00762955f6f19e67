use crate::header_list::HeaderList;
use crate::kind::{FrameKind, END_HEADERS, HEADER_SIZE, MAX_LENGTH, MAX_STREAM_ID, PADDED, PRIORITY};
use h2fuzz_hpack::HeaderField;

/// Size of the exclusive bit + stream dependency + weight block.
pub const DEP_WEIGHT_SIZE: usize = 5;

/// Size of one SETTINGS entry.
pub const SETTING_SIZE: usize = 6;

/// SETTINGS_INITIAL_WINDOW_SIZE.
pub const SETTINGS_INITIAL_WINDOW_SIZE: u16 = 0x4;

/// Fields shared by every frame kind.
///
/// `length` is stored, not derived: it is written to the wire verbatim, so
/// whoever edits the payload keeps it in step. `kind` is the raw type byte
/// and may disagree with the variant holding it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHead {
    pub length: u32,
    pub kind: u8,
    pub flags: u8,
    pub reserved: bool,
    pub stream_id: u32,
}

impl FrameHead {
    pub fn new(kind: FrameKind, flags: u8, stream_id: u32) -> Self {
        Self {
            length: 0,
            kind: kind.as_u8(),
            flags,
            reserved: false,
            stream_id: stream_id & MAX_STREAM_ID,
        }
    }

    pub fn has_flag(&self, flag: u8) -> bool {
        self.flags & flag != 0
    }

    pub fn set_flag(&mut self, flag: u8, on: bool) {
        if on {
            self.flags |= flag;
        } else {
            self.flags &= !flag;
        }
    }

    /// Shift the stored length by `delta`, wrapping inside 24 bits.
    pub fn adjust_length(&mut self, delta: i64) {
        let modulus = i64::from(MAX_LENGTH) + 1;
        self.length = (i64::from(self.length) + delta).rem_euclid(modulus) as u32;
    }
}

/// Padding of a PADDED frame. The pad length byte always equals
/// `bytes.len()`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Padding {
    pub bytes: Vec<u8>,
}

impl Padding {
    pub fn zeroed(len: u8) -> Self {
        Self {
            bytes: vec![0; usize::from(len)],
        }
    }

    pub fn pad_len(&self) -> u8 {
        self.bytes.len().min(usize::from(u8::MAX)) as u8
    }

    /// Payload bytes taken: the pad length byte plus the padding.
    pub fn wire_size(&self) -> usize {
        1 + usize::from(self.pad_len())
    }
}

/// Stream dependency and weight (RFC 7540 section 6.3).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DepWeight {
    pub exclusive: bool,
    pub dependency: u32,
    pub weight: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Setting {
    pub id: u16,
    pub value: u32,
}

impl Setting {
    pub fn new(id: u16, value: u32) -> Self {
        Self { id, value }
    }
}

/// Frames that may carry padding.
pub trait HasPadding {
    fn padding(&self) -> Option<&Padding>;
    fn padding_mut(&mut self) -> &mut Option<Padding>;
}

/// Frames that carry a header block fragment.
pub trait HasHeaders {
    fn headers(&self) -> &HeaderList;
    fn headers_mut(&mut self) -> &mut HeaderList;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataFrame {
    pub head: FrameHead,
    pub padding: Option<Padding>,
    pub data: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeadersFrame {
    pub head: FrameHead,
    pub padding: Option<Padding>,
    pub priority: Option<DepWeight>,
    pub headers: HeaderList,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriorityFrame {
    pub head: FrameHead,
    pub dep_weight: DepWeight,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RstStreamFrame {
    pub head: FrameHead,
    pub error_code: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettingsFrame {
    pub head: FrameHead,
    pub settings: Vec<Setting>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushPromiseFrame {
    pub head: FrameHead,
    pub padding: Option<Padding>,
    pub promised_reserved: bool,
    pub promised_stream_id: u32,
    pub headers: HeaderList,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PingFrame {
    pub head: FrameHead,
    pub data: [u8; 8],
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GoAwayFrame {
    pub head: FrameHead,
    pub last_reserved: bool,
    pub last_stream_id: u32,
    pub error_code: u32,
    pub debug_data: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowUpdateFrame {
    pub head: FrameHead,
    pub increment_reserved: bool,
    pub increment: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContinuationFrame {
    pub head: FrameHead,
    pub headers: HeaderList,
}

fn padding_size(padding: &Option<Padding>) -> usize {
    padding.as_ref().map_or(0, Padding::wire_size)
}

fn with_length<F: Into<Frame>>(frame: F) -> Frame {
    let mut frame = frame.into();
    let length = frame.payload_len() as u32 & MAX_LENGTH;
    frame.head_mut().length = length;
    frame
}

impl DataFrame {
    pub fn new(stream_id: u32, data: impl Into<Vec<u8>>) -> Frame {
        with_length(Self {
            head: FrameHead::new(FrameKind::Data, 0, stream_id),
            padding: None,
            data: data.into(),
        })
    }
}

impl HeadersFrame {
    /// A HEADERS frame with END_HEADERS set. The header block is not sized
    /// until the frame joins a stream.
    pub fn new(stream_id: u32, fields: Vec<HeaderField>) -> Frame {
        with_length(Self {
            head: FrameHead::new(FrameKind::Headers, END_HEADERS, stream_id),
            padding: None,
            priority: None,
            headers: HeaderList::new(fields),
        })
    }
}

impl PriorityFrame {
    pub fn new(stream_id: u32, dep_weight: DepWeight) -> Frame {
        with_length(Self {
            head: FrameHead::new(FrameKind::Priority, 0, stream_id),
            dep_weight,
        })
    }
}

impl RstStreamFrame {
    pub fn new(stream_id: u32, error_code: u32) -> Frame {
        with_length(Self {
            head: FrameHead::new(FrameKind::RstStream, 0, stream_id),
            error_code,
        })
    }
}

impl SettingsFrame {
    pub fn new(settings: Vec<Setting>) -> Frame {
        with_length(Self {
            head: FrameHead::new(FrameKind::Settings, 0, 0),
            settings,
        })
    }
}

impl PushPromiseFrame {
    pub fn new(stream_id: u32, promised_stream_id: u32, fields: Vec<HeaderField>) -> Frame {
        with_length(Self {
            head: FrameHead::new(FrameKind::PushPromise, END_HEADERS, stream_id),
            padding: None,
            promised_reserved: false,
            promised_stream_id: promised_stream_id & MAX_STREAM_ID,
            headers: HeaderList::new(fields),
        })
    }
}

impl PingFrame {
    pub fn new(data: [u8; 8]) -> Frame {
        with_length(Self {
            head: FrameHead::new(FrameKind::Ping, 0, 0),
            data,
        })
    }
}

impl GoAwayFrame {
    pub fn new(last_stream_id: u32, error_code: u32, debug_data: impl Into<Vec<u8>>) -> Frame {
        with_length(Self {
            head: FrameHead::new(FrameKind::GoAway, 0, 0),
            last_reserved: false,
            last_stream_id: last_stream_id & MAX_STREAM_ID,
            error_code,
            debug_data: debug_data.into(),
        })
    }
}

impl WindowUpdateFrame {
    pub fn new(stream_id: u32, increment: u32) -> Frame {
        with_length(Self {
            head: FrameHead::new(FrameKind::WindowUpdate, 0, stream_id),
            increment_reserved: false,
            increment: increment & MAX_STREAM_ID,
        })
    }
}

impl ContinuationFrame {
    pub fn new(stream_id: u32, fields: Vec<HeaderField>) -> Frame {
        with_length(Self {
            head: FrameHead::new(FrameKind::Continuation, END_HEADERS, stream_id),
            headers: HeaderList::new(fields),
        })
    }
}

macro_rules! impl_has_padding {
    ($($ty:ty),*) => {$(
        impl HasPadding for $ty {
            fn padding(&self) -> Option<&Padding> {
                self.padding.as_ref()
            }
            fn padding_mut(&mut self) -> &mut Option<Padding> {
                &mut self.padding
            }
        }
    )*};
}

macro_rules! impl_has_headers {
    ($($ty:ty),*) => {$(
        impl HasHeaders for $ty {
            fn headers(&self) -> &HeaderList {
                &self.headers
            }
            fn headers_mut(&mut self) -> &mut HeaderList {
                &mut self.headers
            }
        }
    )*};
}

impl_has_padding!(DataFrame, HeadersFrame, PushPromiseFrame);
impl_has_headers!(HeadersFrame, PushPromiseFrame, ContinuationFrame);

/// One HTTP/2 frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    Data(DataFrame),
    Headers(HeadersFrame),
    Priority(PriorityFrame),
    RstStream(RstStreamFrame),
    Settings(SettingsFrame),
    PushPromise(PushPromiseFrame),
    Ping(PingFrame),
    GoAway(GoAwayFrame),
    WindowUpdate(WindowUpdateFrame),
    Continuation(ContinuationFrame),
}

macro_rules! impl_from_variant {
    ($($variant:ident($ty:ty)),*) => {$(
        impl From<$ty> for Frame {
            fn from(frame: $ty) -> Self {
                Frame::$variant(frame)
            }
        }
    )*};
}

impl_from_variant!(
    Data(DataFrame),
    Headers(HeadersFrame),
    Priority(PriorityFrame),
    RstStream(RstStreamFrame),
    Settings(SettingsFrame),
    PushPromise(PushPromiseFrame),
    Ping(PingFrame),
    GoAway(GoAwayFrame),
    WindowUpdate(WindowUpdateFrame),
    Continuation(ContinuationFrame)
);

impl Frame {
    /// The kind of the variant, independent of the stored type byte.
    pub fn kind(&self) -> FrameKind {
        match self {
            Frame::Data(_) => FrameKind::Data,
            Frame::Headers(_) => FrameKind::Headers,
            Frame::Priority(_) => FrameKind::Priority,
            Frame::RstStream(_) => FrameKind::RstStream,
            Frame::Settings(_) => FrameKind::Settings,
            Frame::PushPromise(_) => FrameKind::PushPromise,
            Frame::Ping(_) => FrameKind::Ping,
            Frame::GoAway(_) => FrameKind::GoAway,
            Frame::WindowUpdate(_) => FrameKind::WindowUpdate,
            Frame::Continuation(_) => FrameKind::Continuation,
        }
    }

    pub fn head(&self) -> &FrameHead {
        match self {
            Frame::Data(f) => &f.head,
            Frame::Headers(f) => &f.head,
            Frame::Priority(f) => &f.head,
            Frame::RstStream(f) => &f.head,
            Frame::Settings(f) => &f.head,
            Frame::PushPromise(f) => &f.head,
            Frame::Ping(f) => &f.head,
            Frame::GoAway(f) => &f.head,
            Frame::WindowUpdate(f) => &f.head,
            Frame::Continuation(f) => &f.head,
        }
    }

    pub fn head_mut(&mut self) -> &mut FrameHead {
        match self {
            Frame::Data(f) => &mut f.head,
            Frame::Headers(f) => &mut f.head,
            Frame::Priority(f) => &mut f.head,
            Frame::RstStream(f) => &mut f.head,
            Frame::Settings(f) => &mut f.head,
            Frame::PushPromise(f) => &mut f.head,
            Frame::Ping(f) => &mut f.head,
            Frame::GoAway(f) => &mut f.head,
            Frame::WindowUpdate(f) => &mut f.head,
            Frame::Continuation(f) => &mut f.head,
        }
    }

    pub fn as_padded(&self) -> Option<&dyn HasPadding> {
        match self {
            Frame::Data(f) => Some(f),
            Frame::Headers(f) => Some(f),
            Frame::PushPromise(f) => Some(f),
            _ => None,
        }
    }

    pub fn as_padded_mut(&mut self) -> Option<&mut dyn HasPadding> {
        match self {
            Frame::Data(f) => Some(f),
            Frame::Headers(f) => Some(f),
            Frame::PushPromise(f) => Some(f),
            _ => None,
        }
    }

    pub fn header_list(&self) -> Option<&HeaderList> {
        match self {
            Frame::Headers(f) => Some(f.headers()),
            Frame::PushPromise(f) => Some(f.headers()),
            Frame::Continuation(f) => Some(f.headers()),
            _ => None,
        }
    }

    pub fn header_list_mut(&mut self) -> Option<&mut HeaderList> {
        match self {
            Frame::Headers(f) => Some(f.headers_mut()),
            Frame::PushPromise(f) => Some(f.headers_mut()),
            Frame::Continuation(f) => Some(f.headers_mut()),
            _ => None,
        }
    }

    /// True when the frame carries at least one header field.
    pub fn has_header_fields(&self) -> bool {
        self.header_list().is_some_and(|h| !h.is_empty())
    }

    /// The dependency/weight block: always present on PRIORITY, present on
    /// HEADERS only while PRIORITY is set.
    pub fn dep_weight_mut(&mut self) -> Option<&mut DepWeight> {
        match self {
            Frame::Priority(f) => Some(&mut f.dep_weight),
            Frame::Headers(f) => f.priority.as_mut(),
            _ => None,
        }
    }

    /// Bytes the frame emits after its 9-byte header, using the accounted
    /// block length for header lists.
    pub fn payload_len(&self) -> usize {
        match self {
            Frame::Data(f) => padding_size(&f.padding) + f.data.len(),
            Frame::Headers(f) => {
                padding_size(&f.padding)
                    + f.priority.map_or(0, |_| DEP_WEIGHT_SIZE)
                    + f.headers.block_len()
            }
            Frame::Priority(_) => DEP_WEIGHT_SIZE,
            Frame::RstStream(_) => 4,
            Frame::Settings(f) => SETTING_SIZE * f.settings.len(),
            Frame::PushPromise(f) => padding_size(&f.padding) + 4 + f.headers.block_len(),
            Frame::Ping(_) => 8,
            Frame::GoAway(f) => 8 + f.debug_data.len(),
            Frame::WindowUpdate(_) => 4,
            Frame::Continuation(f) => f.headers.block_len(),
        }
    }

    /// Serialized size including the frame header.
    pub fn wire_size(&self) -> usize {
        HEADER_SIZE + self.payload_len()
    }

    /// Largest size this frame can reach once its header block is re-encoded
    /// in any table state.
    pub fn worst_case_size(&self) -> usize {
        let block = self.header_list().map_or(0, |h| h.block_len());
        let literal = self.header_list().map_or(0, HeaderList::literal_size);
        self.wire_size() - block + literal
    }

    pub fn padded(&self) -> bool {
        self.head().has_flag(PADDED)
    }

    pub fn prioritized(&self) -> bool {
        self.head().has_flag(PRIORITY)
    }
}
