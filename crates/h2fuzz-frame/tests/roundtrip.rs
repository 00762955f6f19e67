use h2fuzz_frame::hpack::{HeaderField, PrefixType};
use h2fuzz_frame::{
    ContinuationFrame, DataFrame, DepWeight, Frame, FrameHead, FrameKind, GoAwayFrame,
    HeaderList, HeadersFrame, Padding, PingFrame, PriorityFrame, PushPromiseFrame,
    RstStreamFrame, Setting, SettingsFrame, Stream, WindowUpdateFrame, PADDED, PRIORITY,
};
use proptest::prelude::*;

fn head(kind: FrameKind, flags: u8, reserved: bool, stream_id: u32) -> FrameHead {
    let mut head = FrameHead::new(kind, flags, stream_id);
    head.reserved = reserved;
    head
}

fn padding() -> impl Strategy<Value = Option<Padding>> {
    prop::option::of(prop::collection::vec(any::<u8>(), 0..40).prop_map(|bytes| Padding { bytes }))
}

fn dep_weight() -> impl Strategy<Value = DepWeight> {
    (any::<bool>(), 0u32..=0x7fff_ffff, any::<u8>()).prop_map(|(exclusive, dependency, weight)| {
        DepWeight {
            exclusive,
            dependency,
            weight,
        }
    })
}

fn fields() -> impl Strategy<Value = Vec<HeaderField>> {
    let prefix = prop_oneof![
        Just(PrefixType::LiteralWithIndexing),
        Just(PrefixType::LiteralWithoutIndexing),
        Just(PrefixType::LiteralNeverIndexed),
    ];
    prop::collection::vec(("[a-z-]{1,10}", "[ -~]{0,20}", prefix), 0..5).prop_map(|v| {
        v.into_iter()
            .map(|(n, val, p)| HeaderField::literal(n.into_bytes(), val.into_bytes(), p))
            .collect()
    })
}

/// PADDED/PRIORITY follow the optional blocks; every other flag is free.
fn with_flag(flags: u8, flag: u8, on: bool) -> u8 {
    if on {
        flags | flag
    } else {
        flags & !flag
    }
}

fn frame() -> impl Strategy<Value = Frame> {
    let common = (any::<u8>(), any::<bool>(), 0u32..=0x7fff_ffff);
    prop_oneof![
        (common.clone(), padding(), prop::collection::vec(any::<u8>(), 0..64)).prop_map(
            |((flags, r, sid), padding, data)| {
                let flags = with_flag(flags, PADDED, padding.is_some());
                Frame::Data(DataFrame {
                    head: head(FrameKind::Data, flags, r, sid),
                    padding,
                    data,
                })
            }
        ),
        (common.clone(), padding(), prop::option::of(dep_weight()), fields()).prop_map(
            |((flags, r, sid), padding, priority, fields)| {
                let flags = with_flag(flags, PADDED, padding.is_some());
                let flags = with_flag(flags, PRIORITY, priority.is_some());
                Frame::Headers(HeadersFrame {
                    head: head(FrameKind::Headers, flags, r, sid),
                    padding,
                    priority,
                    headers: HeaderList::new(fields),
                })
            }
        ),
        (common.clone(), dep_weight()).prop_map(|((flags, r, sid), dep_weight)| {
            Frame::Priority(PriorityFrame {
                head: head(FrameKind::Priority, flags, r, sid),
                dep_weight,
            })
        }),
        (common.clone(), any::<u32>()).prop_map(|((flags, r, sid), error_code)| {
            Frame::RstStream(RstStreamFrame {
                head: head(FrameKind::RstStream, flags, r, sid),
                error_code,
            })
        }),
        (common.clone(), prop::collection::vec((any::<u16>(), any::<u32>()), 0..6)).prop_map(
            |((flags, r, sid), settings)| {
                Frame::Settings(SettingsFrame {
                    head: head(FrameKind::Settings, flags, r, sid),
                    settings: settings
                        .into_iter()
                        .map(|(id, value)| Setting::new(id, value))
                        .collect(),
                })
            }
        ),
        (common.clone(), padding(), any::<bool>(), 0u32..=0x7fff_ffff, fields()).prop_map(
            |((flags, r, sid), padding, promised_reserved, promised_stream_id, fields)| {
                let flags = with_flag(flags, PADDED, padding.is_some());
                Frame::PushPromise(PushPromiseFrame {
                    head: head(FrameKind::PushPromise, flags, r, sid),
                    padding,
                    promised_reserved,
                    promised_stream_id,
                    headers: HeaderList::new(fields),
                })
            }
        ),
        (common.clone(), any::<[u8; 8]>()).prop_map(|((flags, r, sid), data)| {
            Frame::Ping(PingFrame {
                head: head(FrameKind::Ping, flags, r, sid),
                data,
            })
        }),
        (
            common.clone(),
            any::<bool>(),
            0u32..=0x7fff_ffff,
            any::<u32>(),
            prop::collection::vec(any::<u8>(), 0..32)
        )
            .prop_map(|((flags, r, sid), last_reserved, last_stream_id, error_code, debug_data)| {
                Frame::GoAway(GoAwayFrame {
                    head: head(FrameKind::GoAway, flags, r, sid),
                    last_reserved,
                    last_stream_id,
                    error_code,
                    debug_data,
                })
            }),
        (common.clone(), any::<bool>(), 0u32..=0x7fff_ffff).prop_map(
            |((flags, r, sid), increment_reserved, increment)| {
                Frame::WindowUpdate(WindowUpdateFrame {
                    head: head(FrameKind::WindowUpdate, flags, r, sid),
                    increment_reserved,
                    increment,
                })
            }
        ),
        (common, fields()).prop_map(|((flags, r, sid), fields)| {
            Frame::Continuation(ContinuationFrame {
                head: head(FrameKind::Continuation, flags, r, sid),
                headers: HeaderList::new(fields),
            })
        }),
    ]
    .prop_map(|mut frame| {
        let length = frame.payload_len() as u32;
        frame.head_mut().length = length;
        frame
    })
}

proptest! {
    #[test]
    fn stream_roundtrips(frames in prop::collection::vec(frame(), 0..8)) {
        let stream = Stream::from_frames(frames).unwrap();
        let bytes = stream.encode().unwrap();
        prop_assert_eq!(bytes.len(), stream.size());

        let decoded = Stream::decode(&bytes).unwrap();
        prop_assert_eq!(&decoded, &stream);
        prop_assert_eq!(&decoded.encode().unwrap()[..], &bytes[..]);
    }
}

#[test]
fn every_kind_roundtrips_with_constructors() {
    let frames = vec![
        DataFrame::new(1, b"payload".to_vec()),
        HeadersFrame::new(1, vec![HeaderField::indexed(":method", "GET")]),
        PriorityFrame::new(1, DepWeight::default()),
        RstStreamFrame::new(1, 8),
        SettingsFrame::new(vec![Setting::new(4, 65_535)]),
        PushPromiseFrame::new(1, 2, vec![HeaderField::indexed(":path", "/")]),
        PingFrame::new(*b"pingpong"),
        GoAwayFrame::new(1, 0, b"bye".to_vec()),
        WindowUpdateFrame::new(0, 1024),
        ContinuationFrame::new(1, vec![HeaderField::indexed(":scheme", "https")]),
    ];
    let stream = Stream::from_frames(frames).unwrap();
    let bytes = stream.encode().unwrap();
    let decoded = Stream::decode(&bytes).unwrap();
    let kinds: Vec<FrameKind> = decoded.frames().iter().map(Frame::kind).collect();
    assert_eq!(kinds, FrameKind::ALL.to_vec());
    assert_eq!(decoded, stream);
}

#[test]
fn size_update_block_roundtrips_byte_exact() {
    // size update to 0, then :method GET
    let bytes = [0, 0, 2, 0x1, 0x4, 0, 0, 0, 1, 0x20, 0x82];
    let stream = Stream::decode(&bytes).unwrap();
    let headers = stream.frames()[0].header_list().unwrap();
    assert_eq!(headers.size_updates, vec![0]);
    assert_eq!(&stream.encode().unwrap()[..], &bytes[..]);
}

#[test]
fn static_name_index_survives_dynamic_shadow() {
    // ":authority: v" inserted, then ":authority: w" by static name index 1
    // although the dynamic copy at 62 now carries the same name
    let bytes = [
        0, 0, 6, 0x1, 0x4, 0, 0, 0, 1, 0x41, 0x01, b'v', 0x01, 0x01, b'w',
    ];
    let stream = Stream::decode(&bytes).unwrap();
    assert_eq!(stream.frames()[0].head().length, 6);
    assert_eq!(stream.size(), bytes.len());
    assert_eq!(&stream.encode().unwrap()[..], &bytes[..]);
}

#[test]
fn decode_keeps_wire_length() {
    // name index 15 spelled with a redundant continuation byte, empty value
    let bytes = [0, 0, 4, 0x1, 0x4, 0, 0, 0, 1, 0x0f, 0x80, 0x00, 0x00];
    let stream = Stream::decode(&bytes).unwrap();
    assert_eq!(stream.frames()[0].header_list().unwrap().block_len(), 4);
    assert_eq!(stream.frames()[0].head().length, 4);
    assert_eq!(stream.size(), bytes.len());
}

#[test]
fn fuzzed_length_on_fixed_frames_roundtrips() {
    let mut frames = vec![
        RstStreamFrame::new(1, 2),
        WindowUpdateFrame::new(1, 3),
        PriorityFrame::new(1, DepWeight::default()),
    ];
    for (i, frame) in frames.iter_mut().enumerate() {
        frame.head_mut().length = 0x00ab_cd00 + i as u32;
    }
    let stream = Stream::from_frames(frames).unwrap();
    let bytes = stream.encode().unwrap();
    assert_eq!(bytes.len(), 3 * 9 + 4 + 4 + 5);
    let decoded = Stream::decode(&bytes).unwrap();
    assert_eq!(decoded, stream);
}

#[test]
fn truncated_stream_fails() {
    let stream = Stream::from_frames(vec![DataFrame::new(1, b"hello".to_vec())]).unwrap();
    let bytes = stream.encode().unwrap();
    let err = Stream::decode(&bytes[..bytes.len() - 1]).unwrap_err();
    assert!(err.is_malformed());
}
