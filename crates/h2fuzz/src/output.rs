use std::io::{IsTerminal, Write};

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use h2fuzz_frame::{Frame, Stream};
use serde::Serialize;

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
    Raw,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

#[derive(Serialize)]
pub struct HeaderOutput {
    pub name: String,
    pub value: String,
    pub encoding: String,
}

#[derive(Serialize)]
pub struct FrameOutput {
    pub index: usize,
    #[serde(rename = "type")]
    pub kind: String,
    pub length: u32,
    pub flags: String,
    pub stream_id: u32,
    pub wire_size: usize,
    pub detail: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub headers: Vec<HeaderOutput>,
}

impl FrameOutput {
    pub fn new(index: usize, frame: &Frame) -> Self {
        let head = frame.head();
        let headers = frame
            .header_list()
            .map(|list| {
                list.fields
                    .iter()
                    .map(|h| HeaderOutput {
                        name: text_preview(&h.name),
                        value: text_preview(&h.value),
                        encoding: format!("{:?}/{:?}", h.prefix, h.indexing),
                    })
                    .collect()
            })
            .unwrap_or_default();

        Self {
            index,
            kind: frame.kind().to_string(),
            length: head.length,
            flags: format!("0x{:02x}", head.flags),
            stream_id: head.stream_id,
            wire_size: frame.wire_size(),
            detail: detail(frame),
            headers,
        }
    }
}

fn detail(frame: &Frame) -> String {
    match frame {
        Frame::Data(f) => format!("{} data bytes", f.data.len()),
        Frame::Headers(f) => format!("{} headers", f.headers.len()),
        Frame::Priority(f) => format!(
            "dependency={} weight={} exclusive={}",
            f.dep_weight.dependency, f.dep_weight.weight, f.dep_weight.exclusive
        ),
        Frame::RstStream(f) => format!("error_code={}", f.error_code),
        Frame::Settings(f) => f
            .settings
            .iter()
            .map(|s| format!("{}={}", s.id, s.value))
            .collect::<Vec<_>>()
            .join(" "),
        Frame::PushPromise(f) => format!(
            "promised={} headers={}",
            f.promised_stream_id,
            f.headers.len()
        ),
        Frame::Ping(f) => f.data.iter().map(|b| format!("{b:02x}")).collect(),
        Frame::GoAway(f) => format!(
            "last_stream_id={} error_code={} debug={}",
            f.last_stream_id,
            f.error_code,
            text_preview(&f.debug_data)
        ),
        Frame::WindowUpdate(f) => format!("increment={}", f.increment),
        Frame::Continuation(f) => format!("{} headers", f.headers.len()),
    }
}

pub fn print_stream(stream: &Stream, format: OutputFormat) {
    let frames: Vec<FrameOutput> = stream
        .frames()
        .iter()
        .enumerate()
        .map(|(i, f)| FrameOutput::new(i, f))
        .collect();

    match format {
        OutputFormat::Json => print_json(&frames),
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["#", "TYPE", "LENGTH", "FLAGS", "STREAM", "DETAIL"]);
            for frame in &frames {
                table.add_row(vec![
                    frame.index.to_string(),
                    frame.kind.clone(),
                    frame.length.to_string(),
                    frame.flags.clone(),
                    frame.stream_id.to_string(),
                    frame.detail.clone(),
                ]);
            }
            println!("{table}");
        }
        OutputFormat::Pretty => {
            for frame in &frames {
                println!(
                    "#{} {} length={} flags={} stream={} {}",
                    frame.index, frame.kind, frame.length, frame.flags, frame.stream_id, frame.detail
                );
                for header in &frame.headers {
                    println!("    {}: {} ({})", header.name, header.value, header.encoding);
                }
            }
        }
        OutputFormat::Raw => {
            for frame in stream.frames() {
                println!("{frame:?}");
            }
        }
    }
}

pub fn print_json<T: Serialize>(value: &T) {
    println!(
        "{}",
        serde_json::to_string(value).unwrap_or_else(|_| "{}".to_string())
    );
}

pub fn print_raw(data: &[u8]) {
    let mut out = std::io::stdout();
    let _ = out.write_all(data);
    let _ = out.flush();
}

fn text_preview(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(text) => text.to_string(),
        Err(_) => format!("<binary {} bytes>", bytes.len()),
    }
}
