use std::ffi::CStr;

use h2fuzz_ffi::{h2fuzz_crossover, h2fuzz_last_error, h2fuzz_last_error_code, h2fuzz_mutate, H2fuzzResult};
use h2fuzz_frame::hpack::HeaderField;
use h2fuzz_frame::{DataFrame, HeadersFrame, Setting, SettingsFrame, Stream};

fn request() -> Vec<u8> {
    Stream::from_frames(vec![
        SettingsFrame::new(vec![Setting::new(1, 4096), Setting::new(3, 100)]),
        HeadersFrame::new(
            1,
            vec![
                HeaderField::indexed(":method", "GET"),
                HeaderField::indexed(":path", "/"),
            ],
        ),
        DataFrame::new(1, b"body".to_vec()),
    ])
    .unwrap()
    .encode()
    .unwrap()
    .to_vec()
}

fn last_error() -> String {
    // SAFETY: h2fuzz_last_error returns a pointer to a thread-local CString.
    unsafe { CStr::from_ptr(h2fuzz_last_error()) }
        .to_string_lossy()
        .into_owned()
}

#[test]
fn mutate_round_trips_through_the_abi() {
    let input = request();
    let max = input.len() + 64;
    let mut changed = 0;
    for seed in 0..64u64 {
        let mut buf = input.clone();
        buf.resize(max, 0);
        // SAFETY: `buf` is valid for `max` bytes.
        let n = unsafe { h2fuzz_mutate(buf.as_mut_ptr(), input.len(), max, seed) };
        if n == 0 {
            assert_eq!(&buf[..input.len()], input.as_slice());
            let code = h2fuzz_last_error_code();
            assert_eq!(code, H2fuzzResult::NoChange, "{}", last_error());
            continue;
        }
        changed += 1;
        assert!(n <= max);
        assert!(Stream::decode(&buf[..n]).is_ok());
    }
    assert!(changed > 0);
}

#[test]
fn crossover_rejects_truncated_donor() {
    let a = request();
    let b = [0u8, 0, 4, 1];
    let mut out = vec![0u8; 512];
    // SAFETY: all pointers are valid for the given lengths.
    let n = unsafe { h2fuzz_crossover(a.as_ptr(), a.len(), b.as_ptr(), b.len(), out.as_mut_ptr(), 512, 3) };
    assert_eq!(n, 0);
    assert!(out.iter().all(|&b| b == 0));
    assert_eq!(h2fuzz_last_error_code(), H2fuzzResult::MalformedInput);
    assert!(!last_error().is_empty());
}
