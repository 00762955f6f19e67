use std::fmt;

use bytes::BytesMut;
use h2fuzz_frame::{FrameError, Stream};

use crate::byte_mutator::{ByteMutator, DefaultByteMutator};
use crate::config::{FieldRep, MutateOperators, MutationConfig};
use crate::error::{MutateError, Result};
use crate::patch::repair_references;
use crate::rng::{RandomSource, SeededRng};

/// Result of one mutation or crossover attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The stream was changed and is within budget.
    Applied,
    /// Nothing was changed.
    Skipped(SkipReason),
}

impl Outcome {
    pub fn is_applied(self) -> bool {
        self == Outcome::Applied
    }
}

/// Why an attempt left the stream unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SkipReason {
    /// The stream, or the donor, has no frames.
    EmptyStream,
    /// The result could exceed the size budget.
    BudgetExceeded,
    /// The chosen frame or list does not support the operation.
    NotApplicable,
    /// The configuration lists no mutable fields for the chosen frame kind.
    NoMutableFields,
    /// The byte mutator could not change the field.
    ByteMutatorFailed,
    /// A swap drew the same index twice.
    SameIndex,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SkipReason::EmptyStream => "empty_stream",
            SkipReason::BudgetExceeded => "budget_exceeded",
            SkipReason::NotApplicable => "not_applicable",
            SkipReason::NoMutableFields => "no_mutable_fields",
            SkipReason::ByteMutatorFailed => "byte_mutator_failed",
            SkipReason::SameIndex => "same_index",
        })
    }
}

pub(crate) fn skip(reason: SkipReason) -> Result<Outcome> {
    Ok(Outcome::Skipped(reason))
}

/// The random source and byte mutator of one call.
pub(crate) struct Entropy<'a> {
    rng: &'a mut dyn RandomSource,
    bytes: &'a mut dyn ByteMutator,
}

impl<'a> Entropy<'a> {
    pub(crate) fn new(rng: &'a mut dyn RandomSource, bytes: &'a mut dyn ByteMutator) -> Self {
        Self { rng, bytes }
    }

    pub(crate) fn below(&mut self, bound: u32) -> u32 {
        self.rng.below(bound)
    }

    /// An index into a collection of `len` items.
    pub(crate) fn pick(&mut self, len: usize) -> usize {
        self.rng.below(u32::try_from(len).unwrap_or(u32::MAX)) as usize
    }

    pub(crate) fn mutate_bytes(&mut self, data: &mut Vec<u8>, max_len: usize) -> bool {
        self.bytes.mutate(data, max_len, &mut *self.rng)
    }

    /// Mutate a variable-length field, returning the change in length.
    pub(crate) fn mutate_sized(&mut self, data: &mut Vec<u8>, max_len: usize) -> Option<i64> {
        let before = data.len() as i64;
        self.mutate_bytes(data, max_len)
            .then(|| data.len() as i64 - before)
    }

    /// Mutate a fixed-width big-endian field through the byte mutator,
    /// padding or truncating the result back to its width.
    fn mutate_fixed<const N: usize>(&mut self, field: [u8; N]) -> [u8; N] {
        let mut buf = field.to_vec();
        self.mutate_bytes(&mut buf, N);
        buf.resize(N, 0);
        let mut out = [0u8; N];
        out.copy_from_slice(&buf);
        out
    }

    pub(crate) fn mutate_u8(&mut self, value: u8) -> u8 {
        self.mutate_fixed([value])[0]
    }

    pub(crate) fn mutate_u16(&mut self, value: u16) -> u16 {
        u16::from_be_bytes(self.mutate_fixed(value.to_be_bytes()))
    }

    pub(crate) fn mutate_u32(&mut self, value: u32) -> u32 {
        u32::from_be_bytes(self.mutate_fixed(value.to_be_bytes()))
    }

    pub(crate) fn mutate_array<const N: usize>(&mut self, value: [u8; N]) -> [u8; N] {
        self.mutate_fixed(value)
    }
}

/// State of one operation: the stream being edited, the randomness, and
/// the size budget.
///
/// Operations keep `stream.size()` in step with every payload change they
/// make, except header blocks: those are re-encoded and re-sized once the
/// operation returns.
pub(crate) struct MutationCtx<'a> {
    pub(crate) stream: &'a mut Stream,
    pub(crate) fuzz: Entropy<'a>,
    pub(crate) max_size: usize,
}

impl MutationCtx<'_> {
    pub(crate) fn headroom(&self) -> usize {
        self.max_size.saturating_sub(self.stream.size())
    }

    /// Whether the stream may grow by `extra` bytes.
    pub(crate) fn fits(&self, extra: usize) -> bool {
        self.stream.size().saturating_add(extra) <= self.max_size
    }

    /// Account for a payload change of the frame at `pos`.
    pub(crate) fn resize_frame(&mut self, pos: usize, delta: i64) {
        if delta == 0 {
            return;
        }
        if let Some(frame) = self.stream.get_mut(pos) {
            frame.head_mut().adjust_length(delta);
        }
        self.stream.adjust_size(delta);
    }

    /// Pick a frame and a frame-level operator and apply it.
    fn mutate_stream(&mut self, config: &MutationConfig) -> Result<Outcome> {
        let pos = self.fuzz.pick(self.stream.len());
        let op = FrameOp::choose(&config.likelihoods.mutate_operators, self.fuzz.below(100));
        tracing::debug!(frame = pos, ?op, "mutate");
        match op {
            FrameOp::Bit => self.bit_mutation(config, pos),
            FrameOp::Delete => self.delete_frame(pos),
            FrameOp::Dup => self.dup_frame(pos),
            FrameOp::Swap => self.swap_frames(pos),
            FrameOp::Fix => self.fix_flags(),
        }
    }

    fn bit_mutation(&mut self, config: &MutationConfig, pos: usize) -> Result<Outcome> {
        let Some(kind) = self.stream.get(pos).map(|f| f.kind()) else {
            return skip(SkipReason::NotApplicable);
        };
        let fields = config.mutable_fields.for_kind(kind);
        if fields.is_empty() {
            return skip(SkipReason::NoMutableFields);
        }
        let rep = fields[self.fuzz.pick(fields.len())];
        self.mutate_field(pos, rep)
    }
}

/// Frame-level operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FrameOp {
    Bit,
    Delete,
    Dup,
    Swap,
    Fix,
}

impl FrameOp {
    /// Map a draw in `0..100` onto the cumulative weights, in the order
    /// swap, dup, delete, fix, with bit taking the rest.
    fn choose(weights: &MutateOperators, score: u32) -> Self {
        let mut bound = weights.swap;
        if score < bound {
            return FrameOp::Swap;
        }
        bound += weights.dup;
        if score < bound {
            return FrameOp::Dup;
        }
        bound += weights.delete;
        if score < bound {
            return FrameOp::Delete;
        }
        bound += weights.fix;
        if score < bound {
            return FrameOp::Fix;
        }
        FrameOp::Bit
    }
}

/// Structure-aware mutator for HTTP/2 frame streams.
///
/// Every entry point is transactional: the stream is either changed into a
/// valid stream within the size budget, or left exactly as it was.
#[derive(Debug, Clone, Default)]
pub struct Mutator<B = DefaultByteMutator> {
    config: MutationConfig,
    byte_mutator: B,
}

impl Mutator {
    pub fn new(config: MutationConfig) -> Self {
        Self::with_byte_mutator(config, DefaultByteMutator)
    }
}

impl<B: ByteMutator> Mutator<B> {
    pub fn with_byte_mutator(config: MutationConfig, byte_mutator: B) -> Self {
        Self {
            config,
            byte_mutator,
        }
    }

    pub fn config(&self) -> &MutationConfig {
        &self.config
    }

    /// Apply one randomly chosen frame-level operator.
    pub fn mutate(
        &mut self,
        stream: &mut Stream,
        rng: &mut dyn RandomSource,
        max_size: usize,
    ) -> Result<Outcome> {
        if stream.is_empty() {
            return skip(SkipReason::EmptyStream);
        }
        self.transaction(stream, rng, max_size, |config, ctx| {
            ctx.mutate_stream(config)
        })
    }

    /// Mutate one specific field of the frame at `frame`.
    pub fn mutate_field(
        &mut self,
        stream: &mut Stream,
        frame: usize,
        field: FieldRep,
        rng: &mut dyn RandomSource,
        max_size: usize,
    ) -> Result<Outcome> {
        self.transaction(stream, rng, max_size, |_, ctx| {
            ctx.mutate_field(frame, field)
        })
    }

    /// Move material from `donor` into `stream`.
    pub fn crossover(
        &mut self,
        stream: &mut Stream,
        donor: &Stream,
        rng: &mut dyn RandomSource,
        max_size: usize,
    ) -> Result<Outcome> {
        if donor.is_empty() {
            return skip(SkipReason::EmptyStream);
        }
        self.transaction(stream, rng, max_size, |config, ctx| {
            ctx.crossover(config, donor)
        })
    }

    /// Decode `data`, mutate it with a seeded source and re-encode it.
    /// Returns `None` when the mutation was skipped.
    pub fn mutate_buffer(
        &mut self,
        data: &[u8],
        seed: u64,
        max_size: usize,
    ) -> Result<Option<BytesMut>> {
        let mut stream = Stream::decode(data)?;
        let mut rng = SeededRng::new(seed);
        let outcome = self.mutate(&mut stream, &mut rng, max_size)?;
        finish(&stream, outcome, max_size)
    }

    /// Decode both buffers, cross `donor` into `data` with a seeded source
    /// and re-encode the result.
    pub fn crossover_buffers(
        &mut self,
        data: &[u8],
        donor: &[u8],
        seed: u64,
        max_size: usize,
    ) -> Result<Option<BytesMut>> {
        let mut stream = Stream::decode(data)?;
        let donor = Stream::decode(donor)?;
        let mut rng = SeededRng::new(seed);
        let outcome = self.crossover(&mut stream, &donor, &mut rng, max_size)?;
        finish(&stream, outcome, max_size)
    }

    fn transaction<F>(
        &mut self,
        stream: &mut Stream,
        rng: &mut dyn RandomSource,
        max_size: usize,
        op: F,
    ) -> Result<Outcome>
    where
        F: FnOnce(&MutationConfig, &mut MutationCtx<'_>) -> Result<Outcome>,
    {
        let snapshot = stream.clone();
        let result = {
            let mut ctx = MutationCtx {
                stream: &mut *stream,
                fuzz: Entropy::new(rng, &mut self.byte_mutator),
                max_size,
            };
            op(&self.config, &mut ctx)
        };

        let outcome = match result {
            Ok(Outcome::Applied) => {
                let repaired = repair_references(stream);
                if repaired > 0 {
                    tracing::debug!(repaired, "promoted headers whose table entries were gone");
                }
                match stream.refresh_header_blocks() {
                    Ok(_) if stream.size() <= max_size => return Ok(Outcome::Applied),
                    Ok(_) => Outcome::Skipped(SkipReason::BudgetExceeded),
                    Err(err) => {
                        tracing::error!(error = %err, "operation left an unencodable stream, rolled back");
                        *stream = snapshot;
                        return Err(encoding_error(err));
                    }
                }
            }
            Ok(skipped) => skipped,
            Err(err) => {
                *stream = snapshot;
                return Err(err);
            }
        };
        tracing::debug!(?outcome, "no change");
        *stream = snapshot;
        Ok(outcome)
    }
}

fn encoding_error(err: FrameError) -> MutateError {
    match err {
        FrameError::Hpack(err) => MutateError::Hpack(err),
        other => MutateError::Frame(other),
    }
}

fn finish(stream: &Stream, outcome: Outcome, max_size: usize) -> Result<Option<BytesMut>> {
    if !outcome.is_applied() {
        return Ok(None);
    }
    let out = stream.encode()?;
    Ok((out.len() <= max_size).then_some(out))
}
