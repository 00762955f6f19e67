use h2fuzz_frame::Stream;
use h2fuzz_mutator::{MutateError, Outcome, SeededRng};

use crate::args;
use crate::config::with_mutator;
use crate::error;

/// Encode an applied result, or record why there is none.
fn finish(stream: &Stream, outcome: Outcome, max_size: usize) -> Option<Vec<u8>> {
    if let Outcome::Skipped(reason) = outcome {
        error::set_no_change(reason);
        return None;
    }
    match stream.encode() {
        Ok(bytes) if bytes.len() <= max_size => Some(bytes.to_vec()),
        Ok(bytes) => {
            error::set_output_too_large(bytes.len(), max_size);
            None
        }
        Err(err) => {
            let _ = error::map_mutate_error(&MutateError::from(err));
            None
        }
    }
}

fn mutate_bytes(input: &[u8], max_size: usize, seed: u64) -> Option<Vec<u8>> {
    let mut stream = match Stream::decode(input) {
        Ok(stream) => stream,
        Err(err) => {
            let _ = error::map_mutate_error(&MutateError::from(err));
            return None;
        }
    };
    let mut rng = SeededRng::new(seed);
    match with_mutator(|mutator| mutator.mutate(&mut stream, &mut rng, max_size)) {
        Ok(outcome) => finish(&stream, outcome, max_size),
        Err(err) => {
            let _ = error::map_mutate_error(&err);
            None
        }
    }
}

fn crossover_bytes(a: &[u8], b: &[u8], max_size: usize, seed: u64) -> Option<Vec<u8>> {
    let decoded = Stream::decode(a).and_then(|a| Ok((a, Stream::decode(b)?)));
    let (mut stream, donor) = match decoded {
        Ok(pair) => pair,
        Err(err) => {
            let _ = error::map_mutate_error(&MutateError::from(err));
            return None;
        }
    };
    let mut rng = SeededRng::new(seed);
    match with_mutator(|mutator| mutator.crossover(&mut stream, &donor, &mut rng, max_size)) {
        Ok(outcome) => finish(&stream, outcome, max_size),
        Err(err) => {
            let _ = error::map_mutate_error(&err);
            None
        }
    }
}

/// Mutate the frame stream in `buf[..len]` in place.
///
/// Returns the new length, or 0 when the input does not parse, the
/// mutation was skipped, or the result would exceed `max_size`. `buf` is
/// only written when the return value is non-zero.
///
/// # Safety
/// `buf` must be non-null, readable for `len` bytes and writable for
/// `max_size` bytes.
#[no_mangle]
pub unsafe extern "C" fn h2fuzz_mutate(buf: *mut u8, len: usize, max_size: usize, seed: u64) -> usize {
    crate::ffi_boundary(0, || {
        error::clear_error_state();
        if buf.is_null() {
            let _ = error::set_invalid_argument("buf cannot be null");
            return 0;
        }
        if len > max_size {
            let _ = error::set_invalid_argument("len cannot exceed max_size");
            return 0;
        }

        let out = {
            // SAFETY: `buf` is non-null and readable for `len` bytes per the caller contract.
            let input = match unsafe { args::bytes_arg(buf, len, "buf") } {
                Some(v) => v,
                None => return 0,
            };
            mutate_bytes(input, max_size, seed)
        };

        match out {
            // SAFETY: `buf` is writable for `max_size` bytes and `bytes` fits.
            Some(bytes) => unsafe { args::write_out(buf, max_size, &bytes) },
            None => 0,
        }
    })
}

/// Cross the frame stream `b` into `a`, writing the result to `out`.
///
/// Returns the length written, or 0 when either input does not parse, the
/// crossover was skipped, or the result would exceed `max_size`. `out` is
/// only written when the return value is non-zero.
///
/// # Safety
/// `a` and `b` must be readable for `len_a` and `len_b` bytes. `out` must be
/// non-null, writable for `max_size` bytes, and must not overlap `a` or `b`.
#[no_mangle]
pub unsafe extern "C" fn h2fuzz_crossover(
    a: *const u8,
    len_a: usize,
    b: *const u8,
    len_b: usize,
    out: *mut u8,
    max_size: usize,
    seed: u64,
) -> usize {
    crate::ffi_boundary(0, || {
        error::clear_error_state();
        if out.is_null() {
            let _ = error::set_invalid_argument("out cannot be null");
            return 0;
        }

        let result = {
            // SAFETY: Pointer validity is guaranteed by the caller; null is checked in helper.
            let (Some(a), Some(b)) = (unsafe { args::bytes_arg(a, len_a, "a") }, unsafe {
                args::bytes_arg(b, len_b, "b")
            }) else {
                return 0;
            };
            crossover_bytes(a, b, max_size, seed)
        };

        match result {
            // SAFETY: `out` is writable for `max_size` bytes and `bytes` fits.
            Some(bytes) => unsafe { args::write_out(out, max_size, &bytes) },
            None => 0,
        }
    })
}
