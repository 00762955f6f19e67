use bytes::BytesMut;
use h2fuzz_hpack::{Decoder, Encoder};

use crate::codec::{decode_frame, encode_block, encode_frame};
use crate::error::Result;
use crate::frame::Frame;

/// An ordered sequence of frames sharing one HPACK context, with a running
/// count of its serialized size.
///
/// The size is kept in step by [`insert`](Self::insert),
/// [`remove`](Self::remove) and [`replace`](Self::replace). Code that edits a
/// frame in place through [`frames_mut`](Self::frames_mut) reports the
/// change with [`adjust_size`](Self::adjust_size).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Stream {
    frames: Vec<Frame>,
    size: usize,
}

impl Stream {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a stream from frames made in memory. Header blocks are encoded
    /// once so their sizes, and the lengths of the frames carrying them, are
    /// exact.
    pub fn from_frames(frames: Vec<Frame>) -> Result<Self> {
        let size = frames.iter().map(Frame::wire_size).sum();
        let mut stream = Self { frames, size };
        stream.refresh_header_blocks()?;
        Ok(stream)
    }

    /// Decode a whole buffer. Fails if any frame is malformed or the buffer
    /// ends mid-frame. Frame lengths and block sizes are kept as read.
    pub fn decode(src: &[u8]) -> Result<Self> {
        let mut decoder = Decoder::new();
        let mut frames = Vec::new();
        let mut pos = 0;
        while pos < src.len() {
            let (frame, used) = decode_frame(&src[pos..], &mut decoder)?;
            tracing::trace!(
                offset = pos,
                kind = %frame.kind(),
                length = frame.head().length,
                "decoded frame"
            );
            pos += used;
            frames.push(frame);
        }
        Ok(Self { frames, size: pos })
    }

    /// Serialize every frame with one shared HPACK encoder.
    pub fn encode(&self) -> Result<BytesMut> {
        let mut dst = BytesMut::with_capacity(self.size);
        self.encode_into(&mut dst)?;
        Ok(dst)
    }

    /// Append the serialized stream to `dst`, returning the bytes written.
    pub fn encode_into(&self, dst: &mut BytesMut) -> Result<usize> {
        let start = dst.len();
        let mut encoder = Encoder::new();
        for frame in &self.frames {
            encode_frame(frame, &mut encoder, dst)?;
        }
        Ok(dst.len() - start)
    }

    /// Re-encode every header block in wire order and fold any change in
    /// block size into the owning frame's length and the stream size.
    ///
    /// Returns the total size change. Fails with an illegal-encoding error
    /// when a field references an entry the table does not hold at that
    /// point; the stream is then only partially refreshed.
    pub fn refresh_header_blocks(&mut self) -> Result<i64> {
        let mut encoder = Encoder::new();
        let mut scratch = BytesMut::new();
        let mut total = 0i64;

        for frame in &mut self.frames {
            let (new_len, old_len) = match frame.header_list() {
                Some(list) => {
                    scratch.clear();
                    (encode_block(list, &mut encoder, &mut scratch)?, list.block_len())
                }
                None => continue,
            };
            if new_len == old_len {
                continue;
            }
            let delta = new_len as i64 - old_len as i64;
            if let Some(list) = frame.header_list_mut() {
                list.set_block_len(new_len);
            }
            frame.head_mut().adjust_length(delta);
            total += delta;
        }

        if total != 0 {
            tracing::trace!(delta = total, "header blocks resized");
        }
        self.adjust_size(total);
        Ok(total)
    }

    /// Serialized size as tracked.
    pub fn size(&self) -> usize {
        self.size
    }

    pub fn adjust_size(&mut self, delta: i64) {
        self.size = (self.size as i64 + delta).max(0) as usize;
    }

    /// Size computed from scratch from the frames.
    pub fn computed_size(&self) -> usize {
        self.frames.iter().map(Frame::wire_size).sum()
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    pub fn frames_mut(&mut self) -> &mut [Frame] {
        &mut self.frames
    }

    pub fn get(&self, index: usize) -> Option<&Frame> {
        self.frames.get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut Frame> {
        self.frames.get_mut(index)
    }

    pub fn push(&mut self, frame: Frame) {
        self.size += frame.wire_size();
        self.frames.push(frame);
    }

    /// Insert at `index`, clamped to the end of the stream.
    pub fn insert(&mut self, index: usize, frame: Frame) {
        self.size += frame.wire_size();
        let index = index.min(self.frames.len());
        self.frames.insert(index, frame);
    }

    pub fn remove(&mut self, index: usize) -> Option<Frame> {
        if index >= self.frames.len() {
            return None;
        }
        let frame = self.frames.remove(index);
        self.adjust_size(-(frame.wire_size() as i64));
        Some(frame)
    }

    /// Put `frame` at `index`, returning the frame it displaced.
    pub fn replace(&mut self, index: usize, frame: Frame) -> Option<Frame> {
        let slot = self.frames.get_mut(index)?;
        let added = frame.wire_size() as i64;
        let old = std::mem::replace(slot, frame);
        self.adjust_size(added - old.wire_size() as i64);
        Some(old)
    }

    pub fn swap(&mut self, a: usize, b: usize) {
        self.frames.swap(a, b);
    }

    pub fn into_frames(self) -> Vec<Frame> {
        self.frames
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::{DataFrame, HeadersFrame, Setting, SettingsFrame};
    use crate::kind::HEADER_SIZE;
    use h2fuzz_hpack::{HeaderField, PrefixType};

    fn sample() -> Stream {
        Stream::from_frames(vec![
            SettingsFrame::new(vec![Setting::new(3, 100)]),
            HeadersFrame::new(
                1,
                vec![
                    HeaderField::indexed(":method", "GET"),
                    HeaderField::literal("x-a", "1", PrefixType::LiteralWithIndexing),
                ],
            ),
            HeadersFrame::new(3, vec![HeaderField::indexed("x-a", "1")]),
            DataFrame::new(1, b"body".to_vec()),
        ])
        .unwrap()
    }

    #[test]
    fn test_from_frames_sizes_header_blocks() {
        let stream = sample();
        assert_eq!(stream.frames()[1].head().length, 1 + 7);
        assert_eq!(stream.frames()[2].head().length, 1);
        let bytes = stream.encode().unwrap();
        assert_eq!(stream.size(), bytes.len());
        assert_eq!(stream.size(), stream.computed_size());
    }

    #[test]
    fn test_decode_encode_roundtrip() {
        let stream = sample();
        let bytes = stream.encode().unwrap();
        let decoded = Stream::decode(&bytes).unwrap();
        assert_eq!(decoded, stream);
        assert_eq!(&decoded.encode().unwrap()[..], &bytes[..]);
    }

    #[test]
    fn test_insert_remove_track_size() {
        let mut stream = sample();
        let before = stream.size();
        stream.insert(99, DataFrame::new(1, b"x".to_vec()));
        assert_eq!(stream.size(), before + HEADER_SIZE + 1);
        let removed = stream.remove(0).unwrap();
        assert_eq!(removed.wire_size(), HEADER_SIZE + 6);
        assert_eq!(stream.size(), stream.computed_size());
        assert!(stream.remove(100).is_none());
    }

    #[test]
    fn test_refresh_after_reordering() {
        let mut stream = sample();
        // the indexed reference now precedes its insertion
        stream.swap(1, 2);
        assert!(stream.refresh_header_blocks().is_err());
    }

    #[test]
    fn test_refresh_tracks_demotion() {
        let mut stream = sample();
        let before = stream.size();
        if let Some(list) = stream.frames_mut()[2].header_list_mut() {
            list.fields[0] = HeaderField::literal("x-a", "1", PrefixType::LiteralWithoutIndexing);
        }
        let delta = stream.refresh_header_blocks().unwrap();
        assert_eq!(delta, 7 - 1);
        assert_eq!(stream.size(), before + 6);
        assert_eq!(stream.frames()[2].head().length, 7);
        assert_eq!(stream.encode().unwrap().len(), stream.size());
    }

    #[test]
    fn test_empty_buffer_is_empty_stream() {
        let stream = Stream::decode(&[]).unwrap();
        assert!(stream.is_empty());
        assert_eq!(stream.size(), 0);
    }
}
