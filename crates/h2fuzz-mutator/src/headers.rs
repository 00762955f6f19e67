//! Operators on one header of a header block.
//!
//! Each operator first replays the table up to the chosen header, then
//! edits the header and repairs later references through
//! [`patch`](crate::patch).

use h2fuzz_frame::{ContinuationFrame, Frame, END_HEADERS, HEADER_SIZE};
use h2fuzz_hpack::{
    integer_len, string_len, DynamicTable, HeaderField, IndexingType, PrefixType,
    STRING_PREFIX_BITS,
};

use crate::config::FrameField;
use crate::engine::{skip, MutationCtx, Outcome, SkipReason};
use crate::error::Result;
use crate::patch::{post_patch, post_patch_value, visible_table, HeaderPos, PatchScope};
use crate::smart;

/// Longest name or value a mutation produces, so that its length prefix
/// stays one byte wide.
const MAX_STRING: usize = 126;

impl MutationCtx<'_> {
    pub(crate) fn mutate_header_list(&mut self, pos: usize, field: FrameField) -> Result<Outcome> {
        let len = match self.stream.get(pos).and_then(Frame::header_list) {
            Some(list) if !list.is_empty() => list.len(),
            _ => return skip(SkipReason::NotApplicable),
        };
        let at = HeaderPos::new(pos, self.fuzz.pick(len));
        let table = visible_table(self.stream, at);
        tracing::debug!(frame = pos, header = at.header, ?field, "mutate header");

        match field {
            FrameField::Name => self.mutate_name(at, &table),
            FrameField::Value => self.mutate_value(at, &table),
            FrameField::Encoding => self.mutate_encoding(at, &table),
            FrameField::Dup => self.dup_header(at),
            FrameField::Delete => self.delete_header(at, &table),
            FrameField::Swap => self.swap_headers(at),
            FrameField::Split => self.split_headers(at),
            _ => skip(SkipReason::NotApplicable),
        }
    }

    fn header(&self, at: HeaderPos) -> Option<&HeaderField> {
        self.stream
            .get(at.frame)?
            .header_list()?
            .fields
            .get(at.header)
    }

    fn set_header(&mut self, at: HeaderPos, field: HeaderField) {
        if let Some(slot) = self
            .stream
            .get_mut(at.frame)
            .and_then(Frame::header_list_mut)
            .and_then(|list| list.fields.get_mut(at.header))
        {
            *slot = field;
        }
    }

    fn after(at: HeaderPos) -> PatchScope {
        PatchScope::from(HeaderPos::new(at.frame, at.header + 1))
    }

    fn mutate_name(&mut self, at: HeaderPos, table: &DynamicTable) -> Result<Outcome> {
        let Some(old) = self.header(at).cloned() else {
            return skip(SkipReason::NotApplicable);
        };
        let full_ok = table.contains(&old.name, &old.value);
        let name_ok = table.contains_name(&old.name);
        let size = self.stream.size();
        let name_prefix = integer_len(old.name.len() as u64, STRING_PREFIX_BITS);

        // room for the new name, once the field no longer indexes it
        let allowed = if old.indexing == IndexingType::All || old.inserts() {
            if !self.fits(old.literal_size() - 1) {
                return skip(SkipReason::BudgetExceeded);
            }
            self.max_size
                .saturating_sub(size + string_len(&old.value) + name_prefix)
        } else if old.indexing == IndexingType::Name {
            if !self.fits(string_len(&old.name)) {
                return skip(SkipReason::BudgetExceeded);
            }
            self.max_size.saturating_sub(size + name_prefix)
        } else {
            self.max_size.saturating_sub(size) + old.name.len()
        };
        let allowed = allowed.min(MAX_STRING);
        if allowed < old.name.len() {
            return skip(SkipReason::BudgetExceeded);
        }

        let mut field = old.clone();
        if !self.fuzz.mutate_bytes(&mut field.name, allowed) {
            return skip(SkipReason::ByteMutatorFailed);
        }
        if old.prefix == PrefixType::IndexedHeader && !table.contains(&field.name, &field.value) {
            field.prefix = PrefixType::LiteralWithIndexing;
            field.indexing = IndexingType::Name;
        }
        if field.indexing != IndexingType::None && !table.contains_name(&field.name) {
            field.indexing = IndexingType::None;
        }
        self.set_header(at, field);

        if !full_ok && old.inserts() {
            post_patch(self.stream, Self::after(at), &old.name, &old.value, name_ok);
        }
        Ok(Outcome::Applied)
    }

    fn mutate_value(&mut self, at: HeaderPos, table: &DynamicTable) -> Result<Outcome> {
        let Some(old) = self.header(at).cloned() else {
            return skip(SkipReason::NotApplicable);
        };
        let full_ok = table.contains(&old.name, &old.value);
        if (old.indexing == IndexingType::All || old.inserts())
            && !self.fits(string_len(&old.value))
        {
            return skip(SkipReason::BudgetExceeded);
        }
        let allowed = (self.headroom() + old.value.len()).min(MAX_STRING);
        if allowed < old.value.len() {
            return skip(SkipReason::BudgetExceeded);
        }

        let mut field = old.clone();
        if !smart::mutate_value(&field.name, &mut field.value, allowed, self.stream, &mut self.fuzz) {
            return skip(SkipReason::ByteMutatorFailed);
        }
        if old.prefix == PrefixType::IndexedHeader && !table.contains(&field.name, &field.value) {
            // the name is still in the table
            field.prefix = PrefixType::LiteralWithIndexing;
            field.indexing = IndexingType::Name;
        }
        self.set_header(at, field);

        if !full_ok && old.inserts() {
            post_patch_value(self.stream, Self::after(at), &old.name, &old.value);
        }
        Ok(Outcome::Applied)
    }

    /// Re-draw the representation of one header.
    fn mutate_encoding(&mut self, at: HeaderPos, table: &DynamicTable) -> Result<Outcome> {
        let Some(old) = self.header(at).cloned() else {
            return skip(SkipReason::NotApplicable);
        };
        if !self.fits(old.literal_size() - 1) {
            return skip(SkipReason::BudgetExceeded);
        }
        let full_ok = table.contains(&old.name, &old.value);
        let name_ok = table.contains_name(&old.name);

        let prefix = match self.fuzz.below(if full_ok { 4 } else { 3 }) {
            0 => PrefixType::LiteralWithIndexing,
            1 => PrefixType::LiteralNeverIndexed,
            2 => PrefixType::LiteralWithoutIndexing,
            _ => PrefixType::IndexedHeader,
        };
        let indexing = if prefix == PrefixType::IndexedHeader {
            IndexingType::All
        } else if name_ok && self.fuzz.below(2) == 1 {
            IndexingType::Name
        } else {
            IndexingType::None
        };

        let mut field = old.clone();
        field.prefix = prefix;
        field.indexing = indexing;
        self.set_header(at, field);

        if !full_ok && old.inserts() && prefix != PrefixType::LiteralWithIndexing {
            post_patch(self.stream, Self::after(at), &old.name, &old.value, name_ok);
        }
        Ok(Outcome::Applied)
    }

    /// Insert a copy in front of the header; both see the same table.
    fn dup_header(&mut self, at: HeaderPos) -> Result<Outcome> {
        let Some(field) = self.header(at).cloned() else {
            return skip(SkipReason::NotApplicable);
        };
        if !self.fits(field.estimated_size(field.indexing)) {
            return skip(SkipReason::BudgetExceeded);
        }
        let Some(list) = self.stream.get_mut(at.frame).and_then(Frame::header_list_mut) else {
            return skip(SkipReason::NotApplicable);
        };
        list.fields.insert(at.header, field);
        Ok(Outcome::Applied)
    }

    fn delete_header(&mut self, at: HeaderPos, table: &DynamicTable) -> Result<Outcome> {
        let Some(old) = self.header(at).cloned() else {
            return skip(SkipReason::NotApplicable);
        };
        if old.inserts() && !table.contains(&old.name, &old.value) {
            let name_ok = table.contains_name(&old.name);
            post_patch(self.stream, Self::after(at), &old.name, &old.value, name_ok);
        }
        if let Some(list) = self.stream.get_mut(at.frame).and_then(Frame::header_list_mut) {
            list.fields.remove(at.header);
        }
        Ok(Outcome::Applied)
    }

    fn swap_headers(&mut self, at: HeaderPos) -> Result<Outcome> {
        let len = match self.stream.get(at.frame).and_then(Frame::header_list) {
            Some(list) => list.len(),
            None => return skip(SkipReason::NotApplicable),
        };
        let other = self.fuzz.pick(len);
        let (sm, lg) = (at.header.min(other), at.header.max(other));
        if sm == lg {
            return skip(SkipReason::SameIndex);
        }

        let table = visible_table(self.stream, HeaderPos::new(at.frame, sm));
        let (Some(low), Some(high)) = (
            self.header(HeaderPos::new(at.frame, sm)).cloned(),
            self.header(HeaderPos::new(at.frame, lg)).cloned(),
        ) else {
            return skip(SkipReason::NotApplicable);
        };

        // the lower header's insertion moves past the headers in between
        let low_ok = !low.inserts() || table.contains(&low.name, &low.value);
        // the higher header moves to where only `table` is visible
        let high_ok = high.indexing == IndexingType::None
            || table.contains(&high.name, &high.value)
            || (high.indexing == IndexingType::Name && table.contains_name(&high.name));

        let worst: usize = [(&low, low_ok), (&high, high_ok)]
            .iter()
            .filter(|(_, ok)| !ok)
            .map(|(h, _)| h.literal_size() - 1)
            .sum();
        if !self.fits(worst) {
            return skip(SkipReason::BudgetExceeded);
        }

        if !high_ok {
            let mut high = high;
            high.prefix = PrefixType::LiteralWithIndexing;
            high.indexing = if table.contains_name(&high.name) {
                IndexingType::Name
            } else {
                IndexingType::None
            };
            self.set_header(HeaderPos::new(at.frame, lg), high);
        }
        if !low_ok {
            let scope = PatchScope::between(
                HeaderPos::new(at.frame, sm + 1),
                HeaderPos::new(at.frame, lg),
            );
            let name_ok = table.contains_name(&low.name);
            post_patch(self.stream, scope, &low.name, &low.value, name_ok);
        }

        if let Some(list) = self.stream.get_mut(at.frame).and_then(Frame::header_list_mut) {
            list.fields.swap(sm, lg);
        }
        Ok(Outcome::Applied)
    }

    /// Move the tail of a header block into a new CONTINUATION frame right
    /// after it. END_HEADERS moves with the tail.
    fn split_headers(&mut self, at: HeaderPos) -> Result<Outcome> {
        let len = match self.stream.get(at.frame).and_then(Frame::header_list) {
            Some(list) => list.len(),
            None => return skip(SkipReason::NotApplicable),
        };
        if len < 2 {
            return skip(SkipReason::NotApplicable);
        }
        if !self.fits(HEADER_SIZE) {
            return skip(SkipReason::BudgetExceeded);
        }
        // both halves keep at least one entry
        let split = 1 + self.fuzz.pick(len - 1);

        let Some(frame) = self.stream.get_mut(at.frame) else {
            return skip(SkipReason::NotApplicable);
        };
        let stream_id = frame.head().stream_id;
        let end_headers = frame.head().has_flag(END_HEADERS);
        let Some(tail) = frame.header_list_mut().map(|list| list.split_off(split)) else {
            return skip(SkipReason::NotApplicable);
        };
        frame.head_mut().set_flag(END_HEADERS, false);

        let mut continuation = ContinuationFrame::new(stream_id, tail.fields);
        continuation.head_mut().set_flag(END_HEADERS, end_headers);
        self.stream.insert(at.frame + 1, continuation);
        Ok(Outcome::Applied)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::byte_mutator::DefaultByteMutator;
    use crate::engine::Entropy;
    use crate::rng::SequenceRng;
    use h2fuzz_frame::{HeadersFrame, Stream};

    fn lit(name: &str, value: &str, prefix: PrefixType, indexing: IndexingType) -> HeaderField {
        HeaderField::new(name, value, prefix, indexing)
    }

    fn run(stream: &mut Stream, draws: Vec<u32>, field: FrameField) -> Outcome {
        let mut rng = SequenceRng::new(draws);
        let mut bytes = DefaultByteMutator;
        let mut ctx = MutationCtx {
            stream: &mut *stream,
            fuzz: Entropy::new(&mut rng, &mut bytes),
            max_size: 1024,
        };
        let outcome = ctx.mutate_header_list(0, field).unwrap();
        stream.refresh_header_blocks().unwrap();
        outcome
    }

    fn encodings(stream: &Stream, frame: usize) -> Vec<(PrefixType, IndexingType)> {
        stream.frames()[frame]
            .header_list()
            .unwrap()
            .fields
            .iter()
            .map(|h| (h.prefix, h.indexing))
            .collect()
    }

    fn chain() -> Stream {
        Stream::from_frames(vec![HeadersFrame::new(
            1,
            vec![
                lit("name", "value", PrefixType::LiteralWithIndexing, IndexingType::None),
                lit("name", "other", PrefixType::LiteralWithoutIndexing, IndexingType::Name),
                HeaderField::indexed("name", "value"),
            ],
        )])
        .unwrap()
    }

    #[test]
    fn test_delete_promotes_dependents() {
        let mut stream = chain();
        assert_eq!(run(&mut stream, vec![0], FrameField::Delete), Outcome::Applied);
        assert_eq!(
            encodings(&stream, 0),
            vec![
                (PrefixType::LiteralWithIndexing, IndexingType::None),
                (PrefixType::LiteralWithIndexing, IndexingType::Name),
            ]
        );
        let decoded = Stream::decode(&stream.encode().unwrap()).unwrap();
        let pairs: Vec<_> = decoded.frames()[0]
            .header_list()
            .unwrap()
            .fields
            .iter()
            .map(|h| (h.name.clone(), h.value.clone()))
            .collect();
        assert_eq!(
            pairs,
            vec![
                (b"name".to_vec(), b"other".to_vec()),
                (b"name".to_vec(), b"value".to_vec()),
            ]
        );
    }

    #[test]
    fn test_encoding_demotion_patches_dependents() {
        let mut stream = chain();
        // header 0, prefix 2 (without indexing); name not in table, no second draw
        assert_eq!(run(&mut stream, vec![0, 2], FrameField::Encoding), Outcome::Applied);
        assert_eq!(
            encodings(&stream, 0),
            vec![
                (PrefixType::LiteralWithoutIndexing, IndexingType::None),
                (PrefixType::LiteralWithIndexing, IndexingType::None),
                (PrefixType::LiteralWithIndexing, IndexingType::Name),
            ]
        );
        assert_eq!(stream.encode().unwrap().len(), stream.size());
    }

    #[test]
    fn test_dup_header_copies_in_place() {
        let mut stream = chain();
        run(&mut stream, vec![2], FrameField::Dup);
        let list = stream.frames()[0].header_list().unwrap();
        assert_eq!(list.len(), 4);
        assert_eq!(list.fields[2], list.fields[3]);
    }

    #[test]
    fn test_swap_promotes_moved_reference() {
        let mut stream = chain();
        // headers 2 and 0
        assert_eq!(run(&mut stream, vec![2, 0], FrameField::Swap), Outcome::Applied);
        let list = stream.frames()[0].header_list().unwrap();
        assert_eq!(list.fields[0].value, b"value");
        assert_eq!(list.fields[0].prefix, PrefixType::LiteralWithIndexing);
        assert_eq!(list.fields[1].indexing, IndexingType::None);
        assert_eq!(stream.encode().unwrap().len(), stream.size());
    }

    #[test]
    fn test_swap_same_index() {
        let mut stream = chain();
        assert_eq!(
            run(&mut stream, vec![1, 1], FrameField::Swap),
            Outcome::Skipped(SkipReason::SameIndex)
        );
    }

    #[test]
    fn test_split_moves_tail_and_end_headers() {
        let mut stream = chain();
        let before = stream.size();
        assert_eq!(run(&mut stream, vec![0, 0], FrameField::Split), Outcome::Applied);
        assert_eq!(stream.len(), 2);
        assert!(!stream.frames()[0].head().has_flag(END_HEADERS));
        assert!(stream.frames()[1].head().has_flag(END_HEADERS));
        assert_eq!(stream.frames()[1].header_list().unwrap().len(), 2);
        assert_eq!(stream.size(), before + HEADER_SIZE);
        assert_eq!(stream.encode().unwrap().len(), stream.size());
    }

    #[test]
    fn test_split_keeps_both_halves_non_empty() {
        for draw in 0..4 {
            let mut stream = chain();
            assert_eq!(run(&mut stream, vec![0, draw], FrameField::Split), Outcome::Applied);
            assert_eq!(stream.len(), 2);
            for frame in stream.frames() {
                assert!(!frame.header_list().unwrap().is_empty());
            }
        }
    }

    #[test]
    fn test_value_change_repoints_exact_copy() {
        let mut stream = chain();
        // header 0; draw 60 skips smart values; byte op 2 (change byte) at 0 to 'V'
        assert_eq!(run(&mut stream, vec![0, 60, 2, 0, 86], FrameField::Value), Outcome::Applied);
        let list = stream.frames()[0].header_list().unwrap();
        assert_eq!(list.fields[0].value, b"Value");
        assert_eq!(
            (list.fields[2].prefix, list.fields[2].indexing),
            (PrefixType::LiteralWithIndexing, IndexingType::Name)
        );
    }
}
