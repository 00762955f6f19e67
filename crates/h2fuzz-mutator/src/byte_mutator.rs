use crate::rng::RandomSource;

/// Raw byte mutation used for variable-length fields (payloads, padding,
/// header names and values) and, truncated to their width, for fixed
/// fields.
pub trait ByteMutator {
    /// Mutate `data` in place without growing it past `max_len`. Returns
    /// false when no mutation could be applied.
    fn mutate(&mut self, data: &mut Vec<u8>, max_len: usize, rng: &mut dyn RandomSource) -> bool;
}

/// How many operations are tried before giving up.
const MAX_ATTEMPTS: usize = 10;

/// Largest run of bytes one shuffle touches.
const MAX_SHUFFLE: u32 = 8;

/// A small libFuzzer-style mutator. All choices come from the injected
/// random source.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultByteMutator;

impl ByteMutator for DefaultByteMutator {
    fn mutate(&mut self, data: &mut Vec<u8>, max_len: usize, rng: &mut dyn RandomSource) -> bool {
        for _ in 0..MAX_ATTEMPTS {
            let applied = match rng.below(6) {
                0 => erase_byte(data, rng),
                1 => insert_byte(data, max_len, rng),
                2 => change_byte(data, rng),
                3 => flip_bit(data, rng),
                4 => shuffle_bytes(data, rng),
                _ => change_ascii_integer(data, max_len, rng),
            };
            if applied {
                return true;
            }
        }
        false
    }
}

fn pick(len: usize, rng: &mut dyn RandomSource) -> usize {
    rng.below(len.min(u32::MAX as usize) as u32) as usize
}

fn erase_byte(data: &mut Vec<u8>, rng: &mut dyn RandomSource) -> bool {
    if data.is_empty() {
        return false;
    }
    let pos = pick(data.len(), rng);
    data.remove(pos);
    true
}

fn insert_byte(data: &mut Vec<u8>, max_len: usize, rng: &mut dyn RandomSource) -> bool {
    if data.len() >= max_len {
        return false;
    }
    let pos = pick(data.len() + 1, rng);
    let byte = rng.below(256) as u8;
    data.insert(pos, byte);
    true
}

fn change_byte(data: &mut [u8], rng: &mut dyn RandomSource) -> bool {
    if data.is_empty() {
        return false;
    }
    let pos = pick(data.len(), rng);
    data[pos] = rng.below(256) as u8;
    true
}

fn flip_bit(data: &mut [u8], rng: &mut dyn RandomSource) -> bool {
    if data.is_empty() {
        return false;
    }
    let pos = pick(data.len(), rng);
    data[pos] ^= 1 << rng.below(8);
    true
}

fn shuffle_bytes(data: &mut [u8], rng: &mut dyn RandomSource) -> bool {
    if data.len() < 2 {
        return false;
    }
    let run = 2 + pick((MAX_SHUFFLE as usize).min(data.len()) - 1, rng);
    let start = pick(data.len() - run + 1, rng);
    let window = &mut data[start..start + run];
    for i in (1..window.len()).rev() {
        let j = pick(i + 1, rng);
        window.swap(i, j);
    }
    true
}

/// Find a run of ASCII digits and replace it with a nearby or random
/// number.
fn change_ascii_integer(data: &mut Vec<u8>, max_len: usize, rng: &mut dyn RandomSource) -> bool {
    if data.is_empty() {
        return false;
    }
    let from = pick(data.len(), rng);
    let Some(start) = data[from..].iter().position(u8::is_ascii_digit).map(|p| p + from) else {
        return false;
    };
    let end = data[start..]
        .iter()
        .position(|b| !b.is_ascii_digit())
        .map_or(data.len(), |p| p + start);

    let current = data[start..end]
        .iter()
        .fold(0u64, |acc, b| acc.saturating_mul(10).saturating_add(u64::from(b - b'0')));
    let next = match rng.below(5) {
        0 => current.saturating_add(1),
        1 => current.saturating_sub(1),
        2 => current / 2,
        3 => current.saturating_mul(2),
        _ => u64::from(rng.below(u32::MAX)),
    };
    let digits = next.to_string().into_bytes();
    if data.len() - (end - start) + digits.len() > max_len {
        return false;
    }
    data.splice(start..end, digits);
    true
}
