//! Semantically meaningful replacements for well-known header values.

use h2fuzz_frame::{Frame, Stream, END_STREAM};

use crate::engine::Entropy;

/// Below this draw out of 100 a smart value is tried.
const SMART_CUTOFF: u32 = 50;

/// Below this draw the smart value is combined with the current value
/// instead of replacing it.
const COMBINE_CUTOFF: u32 = SMART_CUTOFF / 2;

const METHODS: &[&str] = &["DELETE", "GET", "HEAD", "POST", "PUT", "CONNECT", "OPTIONS", "TRACE"];
const SCHEMES: &[&str] = &["http", "https"];
const TRANSFER_CODINGS: &[&str] = &["chunked", "identity", "gzip", "trailers"];
const CONNECTION_TOKENS: &[&str] = &["close", "host", "cookie", "keep-alive", "upgrade"];
const AUTHORITY_PREFIXES: &[&str] = &["akamai.test.com", "https://", "http://", "test://", "test.com@"];

/// True when `value` equals `target` once leading and trailing spaces and
/// tabs are ignored.
pub(crate) fn special_match(value: &[u8], target: &str) -> bool {
    let is_ws = |b: &u8| *b == b' ' || *b == b'\t';
    let Some(start) = value.iter().position(|b| !is_ws(b)) else {
        return false;
    };
    let end = value.iter().rposition(|b| !is_ws(b)).map_or(start, |e| e + 1);
    &value[start..end] == target.as_bytes()
}

fn hex(n: u32) -> String {
    format!("{n:#x}")
}

fn choose(candidates: &[&str], fuzz: &mut Entropy<'_>) -> String {
    candidates[fuzz.pick(candidates.len())].to_string()
}

/// Candidate content-length values: a random number, the current value, and
/// the DATA byte totals the stream actually carries, each in decimal and
/// hex.
fn content_length(value: &[u8], stream: &Stream, fuzz: &mut Entropy<'_>) -> String {
    let random = fuzz.below(1_000_000);
    let mut candidates = vec![
        random.to_string(),
        hex(random),
        String::from_utf8_lossy(value).into_owned(),
    ];
    if let Some(current) = std::str::from_utf8(value)
        .ok()
        .and_then(|s| s.trim().parse::<u32>().ok())
    {
        candidates.push(hex(current));
    }

    let mut total = 0u32;
    for frame in stream.frames() {
        if let Frame::Data(data) = frame {
            total = total.saturating_add(data.data.len() as u32);
            if data.head.has_flag(END_STREAM) {
                candidates.push(total.to_string());
                candidates.push(hex(total));
            }
        }
    }
    candidates.push(total.to_string());
    candidates.push(hex(total));

    let index = fuzz.pick(candidates.len());
    candidates.swap_remove(index)
}

/// Mutate a header value, preferring a smart value for recognized names and
/// falling back to raw byte mutation. `allowed` bounds the new length.
/// Returns false when nothing could be changed.
pub(crate) fn mutate_value(
    name: &[u8],
    value: &mut Vec<u8>,
    allowed: usize,
    stream: &Stream,
    fuzz: &mut Entropy<'_>,
) -> bool {
    let draw = fuzz.below(100);
    if draw < SMART_CUTOFF {
        if let Some(applied) = try_smart(name, value, allowed, draw, stream, fuzz) {
            return applied;
        }
    }
    fuzz.mutate_bytes(value, allowed)
}

/// `Some(true)` when a smart value was written, `None` to fall back.
fn try_smart(
    name: &[u8],
    value: &mut Vec<u8>,
    allowed: usize,
    draw: u32,
    stream: &Stream,
    fuzz: &mut Entropy<'_>,
) -> Option<bool> {
    let name = name.to_ascii_lowercase();
    let avail = allowed.saturating_sub(value.len());

    let smart = match name.as_slice() {
        b":method" if allowed >= 8 => choose(METHODS, fuzz),
        b":status" if allowed >= 4 => (100 + fuzz.below(500)).to_string(),
        b":scheme" if allowed >= 6 => choose(SCHEMES, fuzz),
        n if (special_match(n, "transfer-encoding") || special_match(n, "te")) && allowed >= 9 => {
            choose(TRANSFER_CODINGS, fuzz)
        }
        b"connection" if allowed >= 11 => choose(CONNECTION_TOKENS, fuzz),
        n if special_match(n, "content-length") && allowed >= 7 => {
            content_length(value, stream, fuzz)
        }
        b"expect" if allowed >= 12 => {
            *value = b"100-continue".to_vec();
            return Some(true);
        }
        n if (n == b":authority" || n == b":path" || special_match(n, "host"))
            && allowed > AUTHORITY_PREFIXES[0].len() =>
        {
            let prefix = choose(AUTHORITY_PREFIXES, fuzz);
            if draw < COMBINE_CUTOFF && 1 + prefix.len() <= avail {
                value.splice(0..0, prefix.into_bytes());
                return Some(true);
            }
            prefix
        }
        _ => return None,
    };

    if draw < COMBINE_CUTOFF {
        if 1 + smart.len() <= avail {
            value.push(b',');
            value.extend_from_slice(smart.as_bytes());
            return Some(true);
        }
        None
    } else if smart.len() <= allowed {
        *value = smart.into_bytes();
        Some(true)
    } else {
        None
    }
}
