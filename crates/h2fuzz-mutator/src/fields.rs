//! Bit mutation of single frame fields.

use h2fuzz_frame::{
    DepWeight, Frame, Padding, DEP_WEIGHT_SIZE, MAX_LENGTH, MAX_STREAM_ID, PADDED, PRIORITY,
};

use crate::config::{FieldGroup, FieldRep, FrameField};
use crate::engine::{skip, MutationCtx, Outcome, SkipReason};
use crate::error::Result;

/// Largest padding a single pad length byte can announce.
const MAX_PAD: usize = u8::MAX as usize;

impl MutationCtx<'_> {
    /// Mutate `rep` of the frame at `pos`.
    pub(crate) fn mutate_field(&mut self, pos: usize, rep: FieldRep) -> Result<Outcome> {
        let Some(kind) = self.stream.get(pos).map(Frame::kind) else {
            return skip(SkipReason::NotApplicable);
        };
        if !rep.applies_to(kind) {
            return skip(SkipReason::NotApplicable);
        }
        tracing::debug!(frame = pos, %kind, field = ?rep.field(), group = ?rep.group(), "mutate field");

        match rep.group() {
            FieldGroup::Base => self.mutate_base(pos, rep.field()),
            FieldGroup::Pad => self.mutate_pad(pos, rep.field()),
            FieldGroup::DepWeight => self.mutate_dep_weight(pos, rep.field()),
            FieldGroup::Headers => self.toggle_priority(pos),
            FieldGroup::Header => self.mutate_header_list(pos, rep.field()),
            FieldGroup::Settings => self.mutate_settings(pos, rep.field()),
            FieldGroup::Data
            | FieldGroup::RstStream
            | FieldGroup::PushProm
            | FieldGroup::Ping
            | FieldGroup::GoAway
            | FieldGroup::WinUpdate => self.mutate_payload_field(pos, rep.field()),
        }
    }

    fn mutate_base(&mut self, pos: usize, field: FrameField) -> Result<Outcome> {
        let Some(frame) = self.stream.get_mut(pos) else {
            return skip(SkipReason::NotApplicable);
        };
        let head = frame.head_mut();
        match field {
            FrameField::Length => head.length = self.fuzz.mutate_u32(head.length) & MAX_LENGTH,
            FrameField::Type => head.kind = self.fuzz.mutate_u8(head.kind),
            FrameField::Flags => {
                // PADDED and PRIORITY announce optional payload fields
                let structural = PADDED | PRIORITY;
                let flags = self.fuzz.mutate_u8(head.flags);
                head.flags = (flags & !structural) | (head.flags & structural);
            }
            FrameField::Reserved => head.reserved = !head.reserved,
            FrameField::StreamId => {
                head.stream_id = self.fuzz.mutate_u32(head.stream_id) & MAX_STREAM_ID;
            }
            _ => return skip(SkipReason::NotApplicable),
        }
        Ok(Outcome::Applied)
    }

    fn mutate_pad(&mut self, pos: usize, field: FrameField) -> Result<Outcome> {
        let headroom = self.headroom();
        let Some(padded) = self.stream.get_mut(pos).and_then(Frame::as_padded_mut) else {
            return skip(SkipReason::NotApplicable);
        };
        let slot = padded.padding_mut();

        let delta = match field {
            FrameField::PadFlag => match slot.take() {
                Some(padding) => -(padding.wire_size() as i64),
                None => {
                    if headroom == 0 {
                        return skip(SkipReason::BudgetExceeded);
                    }
                    let allowed = (headroom - 1).min(MAX_PAD);
                    let pad_len = self.fuzz.below(allowed as u32 + 1) as u8;
                    let padding = Padding::zeroed(pad_len);
                    let delta = padding.wire_size() as i64;
                    *slot = Some(padding);
                    delta
                }
            },
            FrameField::Length => {
                let Some(padding) = slot.as_mut() else {
                    return skip(SkipReason::NotApplicable);
                };
                let old = padding.bytes.len();
                let allowed = (headroom + old).min(MAX_PAD);
                let new = usize::from(self.fuzz.mutate_u8(padding.pad_len())).min(allowed);
                padding.bytes.resize(new, 0);
                new as i64 - old as i64
            }
            FrameField::Padding => {
                let Some(padding) = slot.as_mut() else {
                    return skip(SkipReason::NotApplicable);
                };
                let allowed = (headroom + padding.bytes.len()).min(MAX_PAD);
                match self.fuzz.mutate_sized(&mut padding.bytes, allowed) {
                    Some(delta) => delta,
                    None => return skip(SkipReason::ByteMutatorFailed),
                }
            }
            _ => return skip(SkipReason::NotApplicable),
        };

        let is_padded = slot.is_some();
        if let Some(frame) = self.stream.get_mut(pos) {
            frame.head_mut().set_flag(PADDED, is_padded);
        }
        self.resize_frame(pos, delta);
        Ok(Outcome::Applied)
    }

    fn mutate_dep_weight(&mut self, pos: usize, field: FrameField) -> Result<Outcome> {
        let Some(dep) = self.stream.get_mut(pos).and_then(Frame::dep_weight_mut) else {
            return skip(SkipReason::NotApplicable);
        };
        match field {
            FrameField::Exclusive => dep.exclusive = !dep.exclusive,
            FrameField::StreamId => {
                dep.dependency = self.fuzz.mutate_u32(dep.dependency) & MAX_STREAM_ID;
            }
            FrameField::Weight => dep.weight = self.fuzz.mutate_u8(dep.weight),
            _ => return skip(SkipReason::NotApplicable),
        }
        Ok(Outcome::Applied)
    }

    /// Add or remove the dependency/weight block of a HEADERS frame.
    fn toggle_priority(&mut self, pos: usize) -> Result<Outcome> {
        let fits = self.fits(DEP_WEIGHT_SIZE);
        let Some(Frame::Headers(frame)) = self.stream.get_mut(pos) else {
            return skip(SkipReason::NotApplicable);
        };
        let delta = if frame.priority.take().is_some() {
            -(DEP_WEIGHT_SIZE as i64)
        } else {
            if !fits {
                return skip(SkipReason::BudgetExceeded);
            }
            frame.priority = Some(DepWeight::default());
            DEP_WEIGHT_SIZE as i64
        };
        let prioritized = frame.priority.is_some();
        frame.head.set_flag(PRIORITY, prioritized);
        self.resize_frame(pos, delta);
        Ok(Outcome::Applied)
    }

    /// Fields specific to one frame kind.
    fn mutate_payload_field(&mut self, pos: usize, field: FrameField) -> Result<Outcome> {
        let headroom = self.headroom();
        let Some(frame) = self.stream.get_mut(pos) else {
            return skip(SkipReason::NotApplicable);
        };
        let fuzz = &mut self.fuzz;

        let delta = match (frame, field) {
            (Frame::Data(f), FrameField::Data) => {
                let allowed = headroom + f.data.len();
                match fuzz.mutate_sized(&mut f.data, allowed) {
                    Some(delta) => delta,
                    None => return skip(SkipReason::ByteMutatorFailed),
                }
            }
            (Frame::RstStream(f), FrameField::ErrCode) => {
                f.error_code = fuzz.mutate_u32(f.error_code);
                0
            }
            (Frame::PushPromise(f), FrameField::Reserved) => {
                f.promised_reserved = !f.promised_reserved;
                0
            }
            (Frame::PushPromise(f), FrameField::StreamId) => {
                f.promised_stream_id = fuzz.mutate_u32(f.promised_stream_id) & MAX_STREAM_ID;
                0
            }
            (Frame::Ping(f), FrameField::Data) => {
                f.data = fuzz.mutate_array(f.data);
                0
            }
            (Frame::GoAway(f), FrameField::Reserved) => {
                f.last_reserved = !f.last_reserved;
                0
            }
            (Frame::GoAway(f), FrameField::StreamId) => {
                f.last_stream_id = fuzz.mutate_u32(f.last_stream_id) & MAX_STREAM_ID;
                0
            }
            (Frame::GoAway(f), FrameField::ErrCode) => {
                f.error_code = fuzz.mutate_u32(f.error_code);
                0
            }
            (Frame::GoAway(f), FrameField::Data) => {
                let allowed = headroom + f.debug_data.len();
                match fuzz.mutate_sized(&mut f.debug_data, allowed) {
                    Some(delta) => delta,
                    None => return skip(SkipReason::ByteMutatorFailed),
                }
            }
            (Frame::WindowUpdate(f), FrameField::Reserved) => {
                f.increment_reserved = !f.increment_reserved;
                0
            }
            (Frame::WindowUpdate(f), FrameField::Increment) => {
                f.increment = fuzz.mutate_u32(f.increment) & MAX_STREAM_ID;
                0
            }
            _ => return skip(SkipReason::NotApplicable),
        };

        self.resize_frame(pos, delta);
        Ok(Outcome::Applied)
    }
}
