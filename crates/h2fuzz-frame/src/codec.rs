use bytes::{BufMut, BytesMut};
use h2fuzz_hpack::{Decoder, Encoder};

use crate::error::{FrameError, Result};
use crate::frame::{
    ContinuationFrame, DataFrame, DepWeight, Frame, FrameHead, GoAwayFrame, HeadersFrame,
    Padding, PingFrame, PriorityFrame, PushPromiseFrame, RstStreamFrame, Setting, SettingsFrame,
    WindowUpdateFrame, DEP_WEIGHT_SIZE, SETTING_SIZE,
};
use crate::header_list::HeaderList;
use crate::kind::{FrameKind, HEADER_SIZE, MAX_LENGTH, MAX_STREAM_ID, PADDED, PRIORITY};

const RESERVED_BIT: u32 = 0x8000_0000;

/// Encode one frame.
///
/// Wire format (RFC 7540 section 4.1):
/// ```text
/// ┌────────────────┬──────────┬───────────┬───┬──────────────────┬─────────┐
/// │ Length (24)    │ Type (8) │ Flags (8) │ R │ Stream ID (31)   │ Payload │
/// └────────────────┴──────────┴───────────┴───┴──────────────────┴─────────┘
/// ```
///
/// The stored `length` is written as is. The payload is laid out as pad
/// length, dependency/weight, type-specific fields, header block, data, then
/// padding. Returns the size of the encoded header block, 0 for kinds
/// without one.
pub fn encode_frame(frame: &Frame, encoder: &mut Encoder, dst: &mut BytesMut) -> Result<usize> {
    encode_head(frame.head(), dst);
    let mut block_len = 0;

    match frame {
        Frame::Data(f) => {
            put_pad_len(&f.padding, dst);
            dst.put_slice(&f.data);
            put_padding(&f.padding, dst);
        }
        Frame::Headers(f) => {
            put_pad_len(&f.padding, dst);
            if let Some(dep) = &f.priority {
                put_dep_weight(dep, dst);
            }
            block_len = encode_block(&f.headers, encoder, dst)?;
            put_padding(&f.padding, dst);
        }
        Frame::Priority(f) => put_dep_weight(&f.dep_weight, dst),
        Frame::RstStream(f) => dst.put_u32(f.error_code),
        Frame::Settings(f) => {
            for setting in &f.settings {
                dst.put_u16(setting.id);
                dst.put_u32(setting.value);
            }
        }
        Frame::PushPromise(f) => {
            put_pad_len(&f.padding, dst);
            put_stream_word(f.promised_reserved, f.promised_stream_id, dst);
            block_len = encode_block(&f.headers, encoder, dst)?;
            put_padding(&f.padding, dst);
        }
        Frame::Ping(f) => dst.put_slice(&f.data),
        Frame::GoAway(f) => {
            put_stream_word(f.last_reserved, f.last_stream_id, dst);
            dst.put_u32(f.error_code);
            dst.put_slice(&f.debug_data);
        }
        Frame::WindowUpdate(f) => put_stream_word(f.increment_reserved, f.increment, dst),
        Frame::Continuation(f) => block_len = encode_block(&f.headers, encoder, dst)?,
    }
    Ok(block_len)
}

/// Encode a header list with the stream-wide encoder, returning its size.
pub fn encode_block(list: &HeaderList, encoder: &mut Encoder, dst: &mut BytesMut) -> Result<usize> {
    Ok(encoder.encode(&list.size_updates, &list.fields, dst)?)
}

fn encode_head(head: &FrameHead, dst: &mut BytesMut) {
    dst.reserve(HEADER_SIZE);
    dst.put_uint(u64::from(head.length & MAX_LENGTH), 3);
    dst.put_u8(head.kind);
    dst.put_u8(head.flags);
    put_stream_word(head.reserved, head.stream_id, dst);
}

fn put_stream_word(reserved: bool, id: u32, dst: &mut BytesMut) {
    let bit = if reserved { RESERVED_BIT } else { 0 };
    dst.put_u32(bit | (id & MAX_STREAM_ID));
}

fn put_dep_weight(dep: &DepWeight, dst: &mut BytesMut) {
    put_stream_word(dep.exclusive, dep.dependency, dst);
    dst.put_u8(dep.weight);
}

fn put_pad_len(padding: &Option<Padding>, dst: &mut BytesMut) {
    if let Some(p) = padding {
        dst.put_u8(p.pad_len());
    }
}

fn put_padding(padding: &Option<Padding>, dst: &mut BytesMut) {
    if let Some(p) = padding {
        dst.put_slice(&p.bytes[..usize::from(p.pad_len())]);
    }
}

/// Bounds-checked reader over the whole input buffer.
struct Cursor<'a> {
    src: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        let end = self.pos.saturating_add(n);
        if end > self.src.len() {
            return Err(FrameError::Truncated {
                needed: end,
                available: self.src.len(),
            });
        }
        let src: &'a [u8] = self.src;
        let out = &src[self.pos..end];
        self.pos = end;
        Ok(out)
    }

    fn u8(&mut self) -> Result<u8> {
        Ok(self.take(1)?[0])
    }

    fn u16(&mut self) -> Result<u16> {
        let b = self.take(2)?;
        Ok(u16::from_be_bytes([b[0], b[1]]))
    }

    fn u32(&mut self) -> Result<u32> {
        let b = self.take(4)?;
        Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    /// Reserved bit and 31-bit identifier.
    fn stream_word(&mut self) -> Result<(bool, u32)> {
        let word = self.u32()?;
        Ok((word & RESERVED_BIT != 0, word & MAX_STREAM_ID))
    }

    fn dep_weight(&mut self) -> Result<DepWeight> {
        let (exclusive, dependency) = self.stream_word()?;
        let weight = self.u8()?;
        Ok(DepWeight {
            exclusive,
            dependency,
            weight,
        })
    }
}

/// Tracks how much of the stored length the fixed fields have used.
struct Remaining {
    kind: FrameKind,
    left: i64,
}

impl Remaining {
    fn consume(&mut self, n: usize, what: &str) -> Result<()> {
        self.left -= n as i64;
        if self.left < 0 {
            return Err(FrameError::Malformed(format!(
                "{} length too short for {}",
                self.kind, what
            )));
        }
        Ok(())
    }

    fn rest(&self) -> usize {
        self.left.max(0) as usize
    }
}

/// Decode one frame from the start of `src`, returning it with the number of
/// bytes consumed.
///
/// Header blocks are decoded with the stream-wide `decoder`. PRIORITY,
/// RST_STREAM, PING and WINDOW_UPDATE always consume their fixed payload and
/// SETTINGS consumes `length / 6` entries, whatever the stored length says.
pub fn decode_frame(src: &[u8], decoder: &mut Decoder) -> Result<(Frame, usize)> {
    let mut cur = Cursor { src, pos: 0 };
    let head_bytes = cur.take(HEADER_SIZE)?;
    let length = u32::from_be_bytes([0, head_bytes[0], head_bytes[1], head_bytes[2]]);
    let type_byte = head_bytes[3];
    let flags = head_bytes[4];
    let sid_word = u32::from_be_bytes([head_bytes[5], head_bytes[6], head_bytes[7], head_bytes[8]]);

    let kind = FrameKind::from_u8(type_byte).ok_or(FrameError::UnknownFrameType(type_byte))?;
    let head = FrameHead {
        length,
        kind: type_byte,
        flags,
        reserved: sid_word & RESERVED_BIT != 0,
        stream_id: sid_word & MAX_STREAM_ID,
    };
    let mut remaining = Remaining {
        kind,
        left: i64::from(length),
    };

    let frame = match kind {
        FrameKind::Data => {
            let pad_len = read_pad_len(&mut cur, &mut remaining, flags)?;
            let data = cur.take(remaining.rest())?.to_vec();
            let padding = read_padding(&mut cur, pad_len)?;
            Frame::Data(DataFrame {
                head,
                padding,
                data,
            })
        }
        FrameKind::Headers => {
            let pad_len = read_pad_len(&mut cur, &mut remaining, flags)?;
            let priority = if flags & PRIORITY != 0 {
                remaining.consume(DEP_WEIGHT_SIZE, "priority")?;
                Some(cur.dep_weight()?)
            } else {
                None
            };
            let headers = read_block(&mut cur, remaining.rest(), decoder)?;
            let padding = read_padding(&mut cur, pad_len)?;
            Frame::Headers(HeadersFrame {
                head,
                padding,
                priority,
                headers,
            })
        }
        FrameKind::Priority => Frame::Priority(PriorityFrame {
            head,
            dep_weight: cur.dep_weight()?,
        }),
        FrameKind::RstStream => Frame::RstStream(RstStreamFrame {
            head,
            error_code: cur.u32()?,
        }),
        FrameKind::Settings => {
            let count = length as usize / SETTING_SIZE;
            let mut settings = Vec::with_capacity(count.min(src.len() / SETTING_SIZE));
            for _ in 0..count {
                let id = cur.u16()?;
                let value = cur.u32()?;
                settings.push(Setting { id, value });
            }
            Frame::Settings(SettingsFrame { head, settings })
        }
        FrameKind::PushPromise => {
            let pad_len = read_pad_len(&mut cur, &mut remaining, flags)?;
            remaining.consume(4, "promised stream id")?;
            let (promised_reserved, promised_stream_id) = cur.stream_word()?;
            let headers = read_block(&mut cur, remaining.rest(), decoder)?;
            let padding = read_padding(&mut cur, pad_len)?;
            Frame::PushPromise(PushPromiseFrame {
                head,
                padding,
                promised_reserved,
                promised_stream_id,
                headers,
            })
        }
        FrameKind::Ping => {
            let mut data = [0u8; 8];
            data.copy_from_slice(cur.take(8)?);
            Frame::Ping(PingFrame { head, data })
        }
        FrameKind::GoAway => {
            remaining.consume(8, "last stream id and error code")?;
            let (last_reserved, last_stream_id) = cur.stream_word()?;
            let error_code = cur.u32()?;
            let debug_data = cur.take(remaining.rest())?.to_vec();
            Frame::GoAway(GoAwayFrame {
                head,
                last_reserved,
                last_stream_id,
                error_code,
                debug_data,
            })
        }
        FrameKind::WindowUpdate => {
            let (increment_reserved, increment) = cur.stream_word()?;
            Frame::WindowUpdate(WindowUpdateFrame {
                head,
                increment_reserved,
                increment,
            })
        }
        FrameKind::Continuation => Frame::Continuation(ContinuationFrame {
            head,
            headers: read_block(&mut cur, remaining.rest(), decoder)?,
        }),
    };

    Ok((frame, cur.pos))
}

fn read_pad_len(cur: &mut Cursor<'_>, remaining: &mut Remaining, flags: u8) -> Result<Option<u8>> {
    if flags & PADDED == 0 {
        return Ok(None);
    }
    remaining.consume(1, "pad length")?;
    let pad_len = cur.u8()?;
    remaining.consume(usize::from(pad_len), "padding")?;
    Ok(Some(pad_len))
}

fn read_padding(cur: &mut Cursor<'_>, pad_len: Option<u8>) -> Result<Option<Padding>> {
    match pad_len {
        Some(n) => Ok(Some(Padding {
            bytes: cur.take(usize::from(n))?.to_vec(),
        })),
        None => Ok(None),
    }
}

fn read_block(cur: &mut Cursor<'_>, len: usize, decoder: &mut Decoder) -> Result<HeaderList> {
    let block = cur.take(len)?;
    let decoded = decoder.decode(block)?;
    Ok(HeaderList::with_block_len(
        decoded.size_updates,
        decoded.fields,
        block.len(),
    ))
}
