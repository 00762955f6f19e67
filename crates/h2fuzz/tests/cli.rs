#![cfg(feature = "cli")]

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use h2fuzz::frame::hpack::HeaderField;
use h2fuzz::frame::{DataFrame, HeadersFrame, Setting, SettingsFrame, Stream, WindowUpdateFrame};

fn unique_temp_dir(tag: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!(
        "h2fuzz-cli-{tag}-{}-{}",
        std::process::id(),
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .expect("time should be after epoch")
            .as_nanos()
    ));
    std::fs::create_dir_all(&dir).expect("temp dir should be creatable");
    dir
}

fn sample_stream() -> Vec<u8> {
    let stream = Stream::from_frames(vec![
        SettingsFrame::new(vec![Setting::new(1, 4096), Setting::new(3, 100)]),
        HeadersFrame::new(
            1,
            vec![
                HeaderField::indexed(":method", "GET"),
                HeaderField::indexed(":path", "/"),
                HeaderField::indexed(":scheme", "https"),
            ],
        ),
        WindowUpdateFrame::new(0, 65535),
        DataFrame::new(1, b"hello h2".to_vec()),
    ])
    .expect("sample stream should build");
    stream.encode().expect("sample stream should encode").to_vec()
}

fn write_sample(dir: &Path, name: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, sample_stream()).expect("sample should be writable");
    path
}

fn h2fuzz() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_h2fuzz"));
    cmd.args(["--log-level", "error"]);
    cmd
}

fn run(cmd: &mut Command) -> Output {
    cmd.output().expect("h2fuzz should run")
}

#[test]
fn version_prints_package_version() {
    let out = run(h2fuzz().arg("version").arg("--extended"));
    assert_eq!(out.status.code(), Some(0));
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.starts_with(&format!("h2fuzz {}", env!("CARGO_PKG_VERSION"))));
    assert!(stdout.contains("features: cli"));
}

#[test]
fn decode_lists_frames_as_json() {
    let dir = unique_temp_dir("decode");
    let input = write_sample(&dir, "in.bin");

    let out = run(h2fuzz().arg("--format").arg("json").arg("decode").arg(&input));
    assert_eq!(out.status.code(), Some(0));

    let frames: serde_json::Value =
        serde_json::from_slice(&out.stdout).expect("decode output should be JSON");
    let frames = frames.as_array().expect("decode output should be an array");
    assert_eq!(frames.len(), 4);
    assert_eq!(frames[0]["type"], "SETTINGS");
    assert_eq!(frames[1]["headers"].as_array().map(Vec::len), Some(3));
}

#[test]
fn roundtrip_of_valid_stream_succeeds() {
    let dir = unique_temp_dir("roundtrip");
    let input = write_sample(&dir, "in.bin");

    let out = run(h2fuzz().arg("--format").arg("json").arg("roundtrip").arg(&input));
    assert_eq!(out.status.code(), Some(0));

    let summary: serde_json::Value =
        serde_json::from_slice(&out.stdout).expect("roundtrip output should be JSON");
    assert_eq!(summary["identical"], true);
    assert_eq!(summary["frames"], 4);
}

#[test]
fn mutate_is_bounded_and_reproducible() {
    let dir = unique_temp_dir("mutate");
    let input = write_sample(&dir, "in.bin");
    let first = dir.join("first.bin");
    let second = dir.join("second.bin");

    for output in [&first, &second] {
        let out = run(
            h2fuzz()
                .arg("--format")
                .arg("json")
                .arg("mutate")
                .arg(&input)
                .arg("--seed")
                .arg("11")
                .arg("--iterations")
                .arg("8")
                .arg("--max-size")
                .arg("256")
                .arg("-o")
                .arg(output),
        );
        assert!(matches!(out.status.code(), Some(0) | Some(1)));
    }

    let a = std::fs::read(&first).expect("first output should exist");
    let b = std::fs::read(&second).expect("second output should exist");
    assert_eq!(a, b);
    assert!(a.len() <= 256);
    assert!(Stream::decode(&a).is_ok());
}

#[test]
fn crossover_writes_decodable_output() {
    let dir = unique_temp_dir("crossover");
    let input = write_sample(&dir, "in.bin");
    let donor = write_sample(&dir, "donor.bin");
    let output = dir.join("out.bin");

    let out = run(
        h2fuzz()
            .arg("--format")
            .arg("json")
            .arg("crossover")
            .arg(&input)
            .arg(&donor)
            .arg("--seed")
            .arg("3")
            .arg("-o")
            .arg(&output),
    );
    assert!(matches!(out.status.code(), Some(0) | Some(1)));

    let bytes = std::fs::read(&output).expect("output should exist");
    assert!(bytes.len() <= 4096);
    assert!(Stream::decode(&bytes).is_ok());
}

#[test]
fn malformed_input_exits_data_invalid() {
    let dir = unique_temp_dir("malformed");
    let input = dir.join("bad.bin");
    std::fs::write(&input, [0u8, 0, 5, 0]).expect("input should be writable");

    let out = run(h2fuzz().arg("decode").arg(&input));
    assert_eq!(out.status.code(), Some(60));
    assert!(String::from_utf8_lossy(&out.stderr).contains("error:"));
}

#[test]
fn missing_input_exits_not_found() {
    let dir = unique_temp_dir("missing");
    let input = dir.join("absent.bin");

    let out = run(h2fuzz().arg("decode").arg(&input));
    assert_eq!(out.status.code(), Some(66));
}

#[test]
fn invalid_profile_exits_usage() {
    let dir = unique_temp_dir("profile");
    let input = write_sample(&dir, "in.bin");
    let config = dir.join("profile.json");
    std::fs::write(&config, r#"{"likelihoods": {"mutate_hdr_settings": 150}}"#)
        .expect("profile should be writable");

    let out = run(h2fuzz().arg("mutate").arg(&input).arg("--config").arg(&config));
    assert_eq!(out.status.code(), Some(64));
}
