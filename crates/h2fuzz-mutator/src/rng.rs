use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// The engine's only source of randomness. Every choice the engine makes is
/// one call to [`below`](Self::below), so a recorded sequence replays a
/// mutation exactly.
pub trait RandomSource {
    /// A value in `0..bound`. Returns 0 when `bound` is 0.
    fn below(&mut self, bound: u32) -> u32;
}

/// Seeded pseudo-random source. The same seed yields the same sequence on
/// every platform.
#[derive(Debug, Clone)]
pub struct SeededRng(StdRng);

impl SeededRng {
    pub fn new(seed: u64) -> Self {
        Self(StdRng::seed_from_u64(seed))
    }
}

impl RandomSource for SeededRng {
    fn below(&mut self, bound: u32) -> u32 {
        if bound == 0 {
            return 0;
        }
        self.0.gen_range(0..bound)
    }
}

/// Replays a fixed list of values, cycling when it runs out. Each value is
/// reduced modulo the requested bound.
#[derive(Debug, Clone, Default)]
pub struct SequenceRng {
    values: Vec<u32>,
    pos: usize,
}

impl SequenceRng {
    pub fn new(values: impl Into<Vec<u32>>) -> Self {
        Self {
            values: values.into(),
            pos: 0,
        }
    }

    /// Number of values handed out so far.
    pub fn consumed(&self) -> usize {
        self.pos
    }
}

impl RandomSource for SequenceRng {
    fn below(&mut self, bound: u32) -> u32 {
        if bound == 0 || self.values.is_empty() {
            return 0;
        }
        let value = self.values[self.pos % self.values.len()];
        self.pos += 1;
        value % bound
    }
}
