//! Crossover: move a frame, a header or a setting from a donor stream into
//! the stream being mutated.

use h2fuzz_frame::{Frame, Setting, Stream, SETTING_SIZE};

use crate::config::MutationConfig;
use crate::engine::{skip, MutationCtx, Outcome, SkipReason};
use crate::error::Result;
use crate::frames::repoint;
use crate::patch::{
    patch_one, post_patch, post_patch_frame_deletion, visible_table, HeaderPos, PatchScope,
};

/// A list in the recipient stream that donor units can be added to or
/// spliced into.
trait UnitTarget {
    type Unit: Clone;

    fn len(&self, stream: &Stream) -> usize;

    /// Most the stream can grow by when `unit` is added.
    fn cost(&self, unit: &Self::Unit) -> usize;

    /// Bytes given back when the unit at `index` is overwritten.
    fn freed(&self, stream: &Stream, index: usize) -> usize;

    fn insert(&self, ctx: &mut MutationCtx<'_>, index: usize, unit: Self::Unit);

    fn replace(&self, ctx: &mut MutationCtx<'_>, index: usize, unit: Self::Unit);
}

/// The frames of the stream.
struct FrameList;

impl FrameList {
    /// Fit a donor frame to the table state at `index`. Its size updates
    /// belong to the donor's connection and are dropped.
    fn adapt(stream: &Stream, index: usize, frame: &mut Frame) {
        if let Some(list) = frame.header_list_mut() {
            list.size_updates.clear();
            repoint(list, visible_table(stream, HeaderPos::frame_start(index)));
        }
    }
}

impl UnitTarget for FrameList {
    type Unit = Frame;

    fn len(&self, stream: &Stream) -> usize {
        stream.len()
    }

    fn cost(&self, frame: &Frame) -> usize {
        frame.worst_case_size()
    }

    fn freed(&self, stream: &Stream, index: usize) -> usize {
        match stream.get(index) {
            // a replaced header block can make later blocks grow
            Some(frame) if !frame.has_header_fields() => frame.wire_size(),
            _ => 0,
        }
    }

    fn insert(&self, ctx: &mut MutationCtx<'_>, index: usize, mut frame: Frame) {
        Self::adapt(ctx.stream, index, &mut frame);
        ctx.stream.insert(index, frame);
    }

    fn replace(&self, ctx: &mut MutationCtx<'_>, index: usize, mut frame: Frame) {
        let had_headers = ctx.stream.get(index).is_some_and(Frame::has_header_fields);
        if had_headers && index + 1 < ctx.stream.len() {
            post_patch_frame_deletion(ctx.stream, index);
        }
        Self::adapt(ctx.stream, index, &mut frame);
        ctx.stream.replace(index, frame);
    }
}

/// The settings list of the SETTINGS frame at `pos`.
struct SettingsList {
    pos: usize,
}

impl SettingsList {
    fn entries<'s>(&self, stream: &'s mut Stream) -> Option<&'s mut Vec<Setting>> {
        match stream.get_mut(self.pos)? {
            Frame::Settings(frame) => Some(&mut frame.settings),
            _ => None,
        }
    }
}

impl UnitTarget for SettingsList {
    type Unit = Setting;

    fn len(&self, stream: &Stream) -> usize {
        match stream.get(self.pos) {
            Some(Frame::Settings(frame)) => frame.settings.len(),
            _ => 0,
        }
    }

    fn cost(&self, _: &Setting) -> usize {
        SETTING_SIZE
    }

    fn freed(&self, _: &Stream, _: usize) -> usize {
        SETTING_SIZE
    }

    fn insert(&self, ctx: &mut MutationCtx<'_>, index: usize, setting: Setting) {
        if let Some(list) = self.entries(ctx.stream) {
            list.insert(index.min(list.len()), setting);
            ctx.resize_frame(self.pos, SETTING_SIZE as i64);
        }
    }

    fn replace(&self, ctx: &mut MutationCtx<'_>, index: usize, setting: Setting) {
        if let Some(slot) = self.entries(ctx.stream).and_then(|list| list.get_mut(index)) {
            *slot = setting;
        }
    }
}

impl MutationCtx<'_> {
    pub(crate) fn crossover(&mut self, config: &MutationConfig, donor: &Stream) -> Result<Outcome> {
        if donor.is_empty() {
            return skip(SkipReason::EmptyStream);
        }
        if !self.stream.is_empty() {
            let this_idx = self.fuzz.pick(self.stream.len());
            let other_idx = self.fuzz.pick(donor.len());
            if let (Some(this), Some(other)) = (self.stream.get(this_idx), donor.get(other_idx)) {
                let (this_kind, other_kind) = (this.kind(), other.kind());
                let both_settings =
                    matches!((this, other), (Frame::Settings(_), Frame::Settings(_)));
                let both_headers = this_kind.carries_headers() && other_kind.carries_headers();
                if (both_settings || both_headers)
                    && self.fuzz.below(100) < config.likelihoods.mutate_hdr_settings
                {
                    tracing::debug!(frame = this_idx, donor = other_idx, kind = %this_kind, "crossover entries");
                    return match other {
                        Frame::Settings(frame) => self.add_or_splice(
                            config,
                            SettingsList { pos: this_idx },
                            &frame.settings,
                        ),
                        _ => self.crossover_header(config, this_idx, other),
                    };
                }
            }
        }
        tracing::debug!("crossover frames");
        self.add_or_splice(config, FrameList, donor.frames())
    }

    fn add_or_splice<T: UnitTarget>(
        &mut self,
        config: &MutationConfig,
        target: T,
        donor: &[T::Unit],
    ) -> Result<Outcome> {
        if donor.is_empty() {
            return skip(SkipReason::NotApplicable);
        }
        let unit = donor[self.fuzz.pick(donor.len())].clone();
        let add = self.fuzz.below(100) < config.likelihoods.crossover_operators.add;
        let len = target.len(self.stream);
        let index = if add {
            self.fuzz.pick(len + 1)
        } else if len == 0 {
            return skip(SkipReason::NotApplicable);
        } else {
            self.fuzz.pick(len)
        };

        let freed = if add { 0 } else { target.freed(self.stream, index) };
        if target.cost(&unit) > self.headroom() + freed {
            return skip(SkipReason::BudgetExceeded);
        }
        if add {
            target.insert(self, index, unit);
        } else {
            target.replace(self, index, unit);
        }
        Ok(Outcome::Applied)
    }

    /// Add or splice one header of `donor` into the block of the frame at
    /// `pos`.
    fn crossover_header(&mut self, config: &MutationConfig, pos: usize, donor: &Frame) -> Result<Outcome> {
        let Some(donor_list) = donor.header_list().filter(|list| !list.is_empty()) else {
            return skip(SkipReason::NotApplicable);
        };
        let mut field = donor_list.fields[self.fuzz.pick(donor_list.len())].clone();
        if !self.fits(field.literal_size()) {
            return skip(SkipReason::BudgetExceeded);
        }

        let add = self.fuzz.below(100) < config.likelihoods.crossover_operators.add;
        let len = self
            .stream
            .get(pos)
            .and_then(Frame::header_list)
            .map_or(0, |list| list.len());
        let index = if add {
            self.fuzz.pick(len + 1)
        } else if len == 0 {
            return skip(SkipReason::NotApplicable);
        } else {
            self.fuzz.pick(len)
        };

        let at = HeaderPos::new(pos, index);
        let table = visible_table(self.stream, at);
        patch_one(&mut field, &table);

        if !add {
            let old = self
                .stream
                .get(pos)
                .and_then(Frame::header_list)
                .and_then(|list| list.fields.get(index))
                .cloned();
            if let Some(old) = old.filter(|old| old.inserts() && !table.contains(&old.name, &old.value)) {
                let scope = PatchScope::from(HeaderPos::new(pos, index + 1));
                let name_ok = table.contains_name(&old.name);
                post_patch(self.stream, scope, &old.name, &old.value, name_ok);
            }
        }

        let Some(list) = self.stream.get_mut(pos).and_then(Frame::header_list_mut) else {
            return skip(SkipReason::NotApplicable);
        };
        if add {
            list.fields.insert(index, field);
        } else if let Some(slot) = list.fields.get_mut(index) {
            *slot = field;
        }
        Ok(Outcome::Applied)
    }
}
