//! HPACK dependency repair.
//!
//! Headers encoded as indexed, or with an indexed name, rely on entries that
//! earlier `LiteralWithIndexing` headers inserted. When an operation deletes,
//! demotes or moves such an inserting header, later headers that referenced
//! its entry are promoted so that the first of them inserts the entry again.
//! Size changes are not tracked here: the engine re-encodes the header
//! blocks after every operation and folds the exact deltas into the frame
//! lengths and the stream size.

use h2fuzz_frame::Stream;
use h2fuzz_hpack::{DynamicTable, HeaderField, IndexingType, PrefixType};

/// A header position: frame index, then header index inside that frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct HeaderPos {
    pub frame: usize,
    pub header: usize,
}

impl HeaderPos {
    pub fn new(frame: usize, header: usize) -> Self {
        Self { frame, header }
    }

    /// The first header of `frame`.
    pub fn frame_start(frame: usize) -> Self {
        Self { frame, header: 0 }
    }
}

/// Replay the stream's table side effects up to, but excluding, `at`.
///
/// Size updates of the frame at `at` are applied, since they precede every
/// field of its block. A size update the table rejects is skipped; the
/// decoder would not have produced one.
pub fn visible_table(stream: &Stream, at: HeaderPos) -> DynamicTable {
    let mut table = DynamicTable::default();
    for (index, frame) in stream.frames().iter().enumerate().take(at.frame + 1) {
        let Some(list) = frame.header_list() else {
            continue;
        };
        for limit in &list.size_updates {
            if table.update_limit(u64::from(*limit)).is_err() {
                continue;
            }
        }
        let end = if index == at.frame {
            at.header.min(list.len())
        } else {
            list.len()
        };
        for field in &list.fields[..end] {
            table.observe(field);
        }
    }
    table
}

/// The stream's table state after its last header.
pub fn final_table(stream: &Stream) -> DynamicTable {
    visible_table(stream, HeaderPos::frame_start(stream.len()))
}

/// Re-encode a field that is about to move to a point where `table` is the
/// visible state, so it only references what the table holds there.
pub fn patch_one(field: &mut HeaderField, table: &DynamicTable) {
    match field.indexing {
        IndexingType::All if !table.contains(&field.name, &field.value) => {
            field.prefix = PrefixType::LiteralWithIndexing;
            field.indexing = if table.contains_name(&field.name) {
                IndexingType::Name
            } else {
                IndexingType::None
            };
        }
        IndexingType::Name if !table.contains_name(&field.name) => {
            field.indexing = IndexingType::None;
        }
        _ => {}
    }
}

/// Replay the whole stream and promote every header whose reference the
/// table does not hold at its position. Returns the number of headers
/// changed; a stream with valid references is left as is.
pub fn repair_references(stream: &mut Stream) -> usize {
    let mut table = DynamicTable::default();
    let mut repaired = 0;
    for frame in stream.frames_mut() {
        let Some(list) = frame.header_list_mut() else {
            continue;
        };
        for limit in &list.size_updates {
            let _ = table.update_limit(u64::from(*limit));
        }
        for field in &mut list.fields {
            let before = (field.prefix, field.indexing);
            patch_one(field, &table);
            if (field.prefix, field.indexing) != before {
                repaired += 1;
            }
            table.observe(field);
        }
    }
    repaired
}

/// Headers visited by a forward scan: from `start` up to, but excluding,
/// `end`. Without an end the scan runs to the end of the stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PatchScope {
    pub start: HeaderPos,
    pub end: Option<HeaderPos>,
}

impl PatchScope {
    pub fn from(start: HeaderPos) -> Self {
        Self { start, end: None }
    }

    pub fn between(start: HeaderPos, end: HeaderPos) -> Self {
        Self {
            start,
            end: Some(end),
        }
    }

    /// Visit every header field in scope until `visit` returns true.
    fn scan(self, stream: &mut Stream, mut visit: impl FnMut(&mut HeaderField) -> bool) {
        let last_frame = self.end.map_or(stream.len(), |end| end.frame + 1);
        let frames = stream.frames_mut();
        let last_frame = last_frame.min(frames.len());
        for index in self.start.frame..last_frame {
            let Some(list) = frames[index].header_list_mut() else {
                continue;
            };
            let first = if index == self.start.frame {
                self.start.header
            } else {
                0
            };
            let end = match self.end {
                Some(end) if end.frame == index => end.header.min(list.len()),
                _ => list.len(),
            };
            if first >= end {
                continue;
            }
            for field in &mut list.fields[first..end] {
                if visit(field) {
                    return;
                }
            }
        }
    }
}

/// Repair references to `(name, value)` after the header that inserted it
/// stops doing so.
///
/// The first later exact match becomes `LiteralWithIndexing` and inserts the
/// entry again, which settles every header after it. Before that, if the
/// name was not otherwise available, the first header that only shares the
/// name is promoted to a literal-name insertion so the name becomes
/// available again.
pub fn post_patch(
    stream: &mut Stream,
    scope: PatchScope,
    name: &[u8],
    value: &[u8],
    name_available: bool,
) {
    let mut name_restored = false;
    scope.scan(stream, |field| {
        if field.name == name && field.value == value {
            field.prefix = PrefixType::LiteralWithIndexing;
            field.indexing = if name_restored {
                IndexingType::Name
            } else {
                IndexingType::None
            };
            tracing::trace!(indexing = ?field.indexing, "promoted exact match");
            return true;
        }
        if !name_available && !name_restored && field.name == name {
            field.prefix = PrefixType::LiteralWithIndexing;
            field.indexing = IndexingType::None;
            name_restored = true;
            tracing::trace!("promoted name match");
        }
        false
    });
}

/// Repair references to `(name, value)` after an inserting header kept its
/// name but changed its value. The name stays in the table, so the first
/// later exact match only needs to insert the pair again with an indexed
/// name.
pub fn post_patch_value(stream: &mut Stream, scope: PatchScope, name: &[u8], value: &[u8]) {
    scope.scan(stream, |field| {
        if field.name == name && field.value == value {
            field.prefix = PrefixType::LiteralWithIndexing;
            field.indexing = IndexingType::Name;
            tracing::trace!("promoted exact match after value change");
            return true;
        }
        false
    });
}

/// Repair later frames before the header-bearing frame at `frame` is
/// removed or overwritten. Only insertions the table did not already hold
/// need repair.
pub fn post_patch_frame_deletion(stream: &mut Stream, frame: usize) {
    post_patch_frame_range(stream, frame, None);
}

/// Like [`post_patch_frame_deletion`], but only repairs frames in
/// `frame + 1..end_frame`. Used when the frame moves to `end_frame`.
pub fn post_patch_frame_range(stream: &mut Stream, frame: usize, end_frame: Option<usize>) {
    let Some(list) = stream.get(frame).and_then(|f| f.header_list()) else {
        return;
    };
    let table = visible_table(stream, HeaderPos::frame_start(frame));
    let inserted: Vec<(Vec<u8>, Vec<u8>, bool)> = list
        .fields
        .iter()
        .filter(|h| h.inserts() && !table.contains(&h.name, &h.value))
        .map(|h| (h.name.clone(), h.value.clone(), table.contains_name(&h.name)))
        .collect();

    let start = HeaderPos::frame_start(frame + 1);
    let scope = match end_frame {
        Some(end) => PatchScope::between(start, HeaderPos::frame_start(end)),
        None => PatchScope::from(start),
    };
    for (name, value, name_available) in inserted {
        post_patch(stream, scope, &name, &value, name_available);
    }
}
