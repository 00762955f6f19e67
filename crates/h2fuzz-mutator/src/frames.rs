//! Frame-level operators: delete, dup, swap and fix.

use h2fuzz_frame::{HeaderList, END_HEADERS, END_STREAM};
use h2fuzz_hpack::DynamicTable;

use crate::engine::{skip, MutationCtx, Outcome, SkipReason};
use crate::error::Result;
use crate::patch::{patch_one, post_patch_frame_deletion, post_patch_frame_range, visible_table, HeaderPos};

impl MutationCtx<'_> {
    pub(crate) fn delete_frame(&mut self, pos: usize) -> Result<Outcome> {
        let has_headers = self.stream.get(pos).is_some_and(|f| f.has_header_fields());
        if has_headers && pos + 1 < self.stream.len() {
            post_patch_frame_deletion(self.stream, pos);
        }
        match self.stream.remove(pos) {
            Some(_) => Ok(Outcome::Applied),
            None => skip(SkipReason::NotApplicable),
        }
    }

    /// Insert a deep copy of the frame at `pos` in front of it. The copy
    /// sees the same table state the original did.
    pub(crate) fn dup_frame(&mut self, pos: usize) -> Result<Outcome> {
        let Some(frame) = self.stream.get(pos).cloned() else {
            return skip(SkipReason::NotApplicable);
        };
        if !self.fits(frame.wire_size()) {
            return skip(SkipReason::BudgetExceeded);
        }
        self.stream.insert(pos, frame);
        Ok(Outcome::Applied)
    }

    pub(crate) fn swap_frames(&mut self, pos: usize) -> Result<Outcome> {
        let other = self.fuzz.pick(self.stream.len());
        let (sm, lg) = (pos.min(other), pos.max(other));
        if sm == lg {
            return skip(SkipReason::SameIndex);
        }

        // re-encoding either block can at most turn every field into a literal
        let worst: usize = [sm, lg]
            .iter()
            .filter_map(|&i| self.stream.get(i).and_then(|f| f.header_list()))
            .map(HeaderList::literal_size)
            .sum();
        if !self.fits(worst) {
            return skip(SkipReason::BudgetExceeded);
        }

        let table = visible_table(self.stream, HeaderPos::frame_start(sm));
        post_patch_frame_range(self.stream, sm, Some(lg));
        if let Some(list) = self.stream.get_mut(lg).and_then(|f| f.header_list_mut()) {
            repoint(list, table);
        }

        self.stream.swap(sm, lg);

        // the block now at `lg` sees the table after everything in between,
        // which size updates or evictions may have emptied
        let table = visible_table(self.stream, HeaderPos::frame_start(lg));
        if let Some(list) = self.stream.get_mut(lg).and_then(|f| f.header_list_mut()) {
            repoint(list, table);
        }
        Ok(Outcome::Applied)
    }

    /// Leave END_STREAM only on the last frame that can carry it and
    /// END_HEADERS only on the last header-bearing frame.
    pub(crate) fn fix_flags(&mut self) -> Result<Outcome> {
        let mut end_stream_seen = false;
        let mut end_headers_seen = false;
        for frame in self.stream.frames_mut().iter_mut().rev() {
            let kind = frame.kind();
            let head = frame.head_mut();
            if kind.can_end_stream() {
                head.set_flag(END_STREAM, !end_stream_seen);
                end_stream_seen = true;
            }
            if kind.carries_headers() {
                head.set_flag(END_HEADERS, !end_headers_seen);
                end_headers_seen = true;
            }
        }
        Ok(Outcome::Applied)
    }
}

/// Re-encode a block that moves to a point where `table` is visible,
/// replaying its own size updates and insertions as it goes.
pub(crate) fn repoint(list: &mut HeaderList, mut table: DynamicTable) {
    for limit in &list.size_updates {
        let _ = table.update_limit(u64::from(*limit));
    }
    for field in &mut list.fields {
        patch_one(field, &table);
        table.observe(field);
    }
}
