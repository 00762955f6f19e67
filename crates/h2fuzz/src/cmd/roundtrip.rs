use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use h2fuzz_frame::Stream;
use serde::Serialize;

use crate::cmd::{read_input, RoundtripArgs};
use crate::exit::{frame_error, CliResult, DATA_INVALID, SUCCESS};
use crate::output::{print_json, print_raw, OutputFormat};

#[derive(Serialize)]
struct RoundtripOutput {
    frames: usize,
    input_size: usize,
    output_size: usize,
    tracked_size: usize,
    identical: bool,
    /// Offset of the first differing byte.
    first_difference: Option<usize>,
}

pub fn run(args: RoundtripArgs, format: OutputFormat) -> CliResult<i32> {
    let input = read_input(&args.input)?;
    let stream = Stream::decode(&input).map_err(|err| frame_error("decode", err))?;
    let output = stream.encode().map_err(|err| frame_error("encode", err))?;

    let first_difference = input
        .iter()
        .zip(output.iter())
        .position(|(a, b)| a != b)
        .or_else(|| (input.len() != output.len()).then(|| input.len().min(output.len())));
    let out = RoundtripOutput {
        frames: stream.len(),
        input_size: input.len(),
        output_size: output.len(),
        tracked_size: stream.size(),
        identical: first_difference.is_none(),
        first_difference,
    };

    match format {
        OutputFormat::Json => print_json(&out),
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["FRAMES", "INPUT", "OUTPUT", "IDENTICAL", "FIRST DIFF"])
                .add_row(vec![
                    out.frames.to_string(),
                    out.input_size.to_string(),
                    out.output_size.to_string(),
                    out.identical.to_string(),
                    out.first_difference
                        .map_or_else(|| "-".to_string(), |d| d.to_string()),
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            if out.identical {
                println!("{} frames, {} bytes, identical", out.frames, out.input_size);
            } else {
                println!(
                    "{} frames, {} -> {} bytes, first difference at offset {}",
                    out.frames,
                    out.input_size,
                    out.output_size,
                    out.first_difference.unwrap_or_default()
                );
            }
        }
        OutputFormat::Raw => print_raw(&output),
    }

    if out.identical {
        Ok(SUCCESS)
    } else {
        tracing::warn!(offset = ?out.first_difference, "re-encoded stream differs from input");
        Ok(DATA_INVALID)
    }
}
