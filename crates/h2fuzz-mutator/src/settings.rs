use h2fuzz_frame::{
    Frame, Setting, SettingsFrame, HEADER_SIZE, SETTINGS_INITIAL_WINDOW_SIZE, SETTING_SIZE,
};

use crate::config::FrameField;
use crate::engine::{skip, MutationCtx, Outcome, SkipReason};
use crate::error::Result;

impl MutationCtx<'_> {
    pub(crate) fn mutate_settings(&mut self, pos: usize, field: FrameField) -> Result<Outcome> {
        let len = match self.stream.get(pos) {
            Some(Frame::Settings(frame)) if !frame.settings.is_empty() => frame.settings.len(),
            _ => return skip(SkipReason::NotApplicable),
        };
        let idx = self.fuzz.pick(len);
        tracing::debug!(frame = pos, setting = idx, ?field, "mutate setting");

        match field {
            FrameField::Id => {
                let Some(setting) = self.setting(pos, idx) else {
                    return skip(SkipReason::NotApplicable);
                };
                // the initial window size drives body lengths downstream
                if setting.id == SETTINGS_INITIAL_WINDOW_SIZE {
                    return skip(SkipReason::NotApplicable);
                }
                let mut id = self.fuzz.mutate_u16(setting.id);
                if id == SETTINGS_INITIAL_WINDOW_SIZE {
                    id = u16::MAX;
                }
                self.update_setting(pos, idx, |s| s.id = id);
                Ok(Outcome::Applied)
            }
            FrameField::Value => {
                let Some(setting) = self.setting(pos, idx) else {
                    return skip(SkipReason::NotApplicable);
                };
                if setting.id == SETTINGS_INITIAL_WINDOW_SIZE {
                    return skip(SkipReason::NotApplicable);
                }
                let value = self.fuzz.mutate_u32(setting.value);
                self.update_setting(pos, idx, |s| s.value = value);
                Ok(Outcome::Applied)
            }
            FrameField::Dup => {
                if !self.fits(SETTING_SIZE) {
                    return skip(SkipReason::BudgetExceeded);
                }
                let Some(setting) = self.setting(pos, idx) else {
                    return skip(SkipReason::NotApplicable);
                };
                if let Some(list) = self.settings_mut(pos) {
                    list.insert(idx, setting);
                }
                self.resize_frame(pos, SETTING_SIZE as i64);
                Ok(Outcome::Applied)
            }
            FrameField::Delete => {
                if let Some(list) = self.settings_mut(pos) {
                    list.remove(idx);
                }
                self.resize_frame(pos, -(SETTING_SIZE as i64));
                Ok(Outcome::Applied)
            }
            FrameField::Swap => {
                let other = self.fuzz.pick(len);
                if other == idx {
                    return skip(SkipReason::SameIndex);
                }
                if let Some(list) = self.settings_mut(pos) {
                    list.swap(idx, other);
                }
                Ok(Outcome::Applied)
            }
            FrameField::Split => self.split_settings(pos, len),
            _ => skip(SkipReason::NotApplicable),
        }
    }

    fn setting(&self, pos: usize, idx: usize) -> Option<Setting> {
        match self.stream.get(pos)? {
            Frame::Settings(frame) => frame.settings.get(idx).copied(),
            _ => None,
        }
    }

    fn settings_mut(&mut self, pos: usize) -> Option<&mut Vec<Setting>> {
        match self.stream.get_mut(pos)? {
            Frame::Settings(frame) => Some(&mut frame.settings),
            _ => None,
        }
    }

    fn update_setting(&mut self, pos: usize, idx: usize, f: impl FnOnce(&mut Setting)) {
        if let Some(setting) = self.settings_mut(pos).and_then(|list| list.get_mut(idx)) {
            f(setting);
        }
    }

    /// Move the tail of the settings list into a new SETTINGS frame right
    /// after this one, with the same flags and stream id.
    fn split_settings(&mut self, pos: usize, len: usize) -> Result<Outcome> {
        if len < 2 {
            return skip(SkipReason::NotApplicable);
        }
        if !self.fits(HEADER_SIZE) {
            return skip(SkipReason::BudgetExceeded);
        }
        // both halves keep at least one entry
        let split = 1 + self.fuzz.pick(len - 1);

        let Some(Frame::Settings(frame)) = self.stream.get_mut(pos) else {
            return skip(SkipReason::NotApplicable);
        };
        let tail = frame.settings.split_off(split);
        frame.head.length = (frame.settings.len() * SETTING_SIZE) as u32;
        let head = frame.head;
        // the tail leaves this frame and comes back with the new one
        self.stream.adjust_size(-((tail.len() * SETTING_SIZE) as i64));

        let mut second = SettingsFrame::new(tail);
        let second_head = second.head_mut();
        second_head.flags = head.flags;
        second_head.reserved = head.reserved;
        second_head.stream_id = head.stream_id;
        self.stream.insert(pos + 1, second);
        Ok(Outcome::Applied)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::byte_mutator::DefaultByteMutator;
    use crate::engine::Entropy;
    use crate::rng::SequenceRng;
    use h2fuzz_frame::{Stream, ACK};

    fn four() -> Stream {
        Stream::from_frames(vec![SettingsFrame::new(vec![
            Setting::new(1, 4096),
            Setting::new(SETTINGS_INITIAL_WINDOW_SIZE, 65535),
            Setting::new(3, 100),
            Setting::new(5, 16384),
        ])])
        .unwrap()
    }

    fn run(stream: &mut Stream, draws: Vec<u32>, field: FrameField) -> Outcome {
        let mut rng = SequenceRng::new(draws);
        let mut bytes = DefaultByteMutator;
        let mut ctx = MutationCtx {
            stream: &mut *stream,
            fuzz: Entropy::new(&mut rng, &mut bytes),
            max_size: 1024,
        };
        ctx.mutate_settings(0, field).unwrap()
    }

    fn entries(stream: &Stream) -> Vec<Setting> {
        stream
            .frames()
            .iter()
            .flat_map(|f| match f {
                Frame::Settings(s) => s.settings.clone(),
                _ => Vec::new(),
            })
            .collect()
    }

    #[test]
    fn test_split_keeps_order_and_flags() {
        let mut stream = four();
        if let Some(frame) = stream.get_mut(0) {
            frame.head_mut().set_flag(ACK, true);
        }
        let original = entries(&stream);
        let before = stream.size();

        assert_eq!(run(&mut stream, vec![1, 1], FrameField::Split), Outcome::Applied);
        assert_eq!(stream.len(), 2);
        for frame in stream.frames() {
            assert_eq!(frame.head().length, 12);
            assert!(frame.head().has_flag(ACK));
        }
        assert_eq!(entries(&stream), original);
        assert_eq!(stream.size(), before + HEADER_SIZE);
        assert_eq!(stream.encode().unwrap().len(), stream.size());
    }

    #[test]
    fn test_split_never_leaves_an_empty_frame() {
        for draw in 0..6 {
            let mut stream = Stream::from_frames(vec![SettingsFrame::new(vec![
                Setting::new(1, 4096),
                Setting::new(3, 100),
            ])])
            .unwrap();
            assert_eq!(run(&mut stream, vec![0, draw], FrameField::Split), Outcome::Applied);
            for frame in stream.frames() {
                assert_eq!(frame.head().length, SETTING_SIZE as u32);
            }
        }
        let mut stream = Stream::from_frames(vec![SettingsFrame::new(vec![Setting::new(1, 1)])])
            .unwrap();
        assert_eq!(
            run(&mut stream, vec![0, 0], FrameField::Split),
            Outcome::Skipped(SkipReason::NotApplicable)
        );
    }

    #[test]
    fn test_initial_window_size_is_protected() {
        let mut stream = four();
        let before = stream.clone();
        assert_eq!(
            run(&mut stream, vec![1], FrameField::Value),
            Outcome::Skipped(SkipReason::NotApplicable)
        );
        assert_eq!(
            run(&mut stream, vec![1], FrameField::Id),
            Outcome::Skipped(SkipReason::NotApplicable)
        );
        assert_eq!(stream, before);
    }

    #[test]
    fn test_id_never_becomes_initial_window_size() {
        let mut stream = four();
        // setting 0 (id 1); change byte 1 of the id to 4
        run(&mut stream, vec![0, 2, 1, 4], FrameField::Id);
        assert_eq!(entries(&stream)[0].id, u16::MAX);
    }

    #[test]
    fn test_dup_and_delete_track_length() {
        let mut stream = four();
        let before = stream.size();
        run(&mut stream, vec![2], FrameField::Dup);
        assert_eq!(stream.frames()[0].head().length, 30);
        assert_eq!(entries(&stream)[2], entries(&stream)[3]);
        assert_eq!(stream.size(), before + SETTING_SIZE);

        run(&mut stream, vec![0], FrameField::Delete);
        run(&mut stream, vec![0], FrameField::Delete);
        assert_eq!(stream.frames()[0].head().length, 18);
        assert_eq!(stream.size(), before - SETTING_SIZE);
        assert_eq!(stream.encode().unwrap().len(), stream.size());
    }

    #[test]
    fn test_empty_list_is_not_applicable() {
        let mut stream = Stream::from_frames(vec![SettingsFrame::new(Vec::new())]).unwrap();
        assert_eq!(
            run(&mut stream, vec![0], FrameField::Swap),
            Outcome::Skipped(SkipReason::NotApplicable)
        );
    }
}
