use std::collections::BTreeMap;

use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use h2fuzz_frame::Stream;
use h2fuzz_mutator::{MutateError, Mutator, Outcome, SeededRng};
use serde::Serialize;

use crate::cmd::{load_config, read_input, write_output, MutateArgs};
use crate::exit::{frame_error, mutate_error, CliResult, FAILURE, SUCCESS};
use crate::output::{print_json, print_raw, OutputFormat};

/// Tally of one command run, shared by `mutate` and `crossover`.
#[derive(Serialize, Default)]
pub(crate) struct RunSummary {
    pub seed: u64,
    pub max_size: usize,
    pub input_size: usize,
    pub output_size: usize,
    pub frames: usize,
    pub applied: u32,
    pub skipped: BTreeMap<String, u32>,
    /// Attempts undone because the header blocks could not be re-encoded.
    pub rolled_back: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
}

impl RunSummary {
    pub fn record(&mut self, result: Result<Outcome, MutateError>) -> CliResult<()> {
        match result {
            Ok(Outcome::Applied) => self.applied += 1,
            Ok(Outcome::Skipped(reason)) => {
                *self.skipped.entry(reason.to_string()).or_default() += 1;
            }
            Err(MutateError::Hpack(err)) => {
                tracing::warn!(error = %err, "attempt rolled back");
                self.rolled_back += 1;
            }
            Err(err) => return Err(mutate_error("mutate", err)),
        }
        Ok(())
    }

    pub fn exit_code(&self) -> i32 {
        if self.applied == 0 {
            FAILURE
        } else {
            SUCCESS
        }
    }
}

pub fn run(args: MutateArgs, format: OutputFormat) -> CliResult<i32> {
    let config = load_config(args.config.as_deref())?;
    let input = read_input(&args.input)?;
    let mut stream = Stream::decode(&input).map_err(|err| frame_error("decode", err))?;

    let mut mutator = Mutator::new(config);
    let mut rng = SeededRng::new(args.seed);
    let mut summary = RunSummary {
        seed: args.seed,
        max_size: args.max_size,
        input_size: input.len(),
        ..RunSummary::default()
    };
    for _ in 0..args.iterations {
        let result = mutator.mutate(&mut stream, &mut rng, args.max_size);
        summary.record(result)?;
    }

    finish(&stream, summary, args.output.as_deref(), format)
}

/// Encode the final stream, write or print it and report the summary.
pub(crate) fn finish(
    stream: &Stream,
    mut summary: RunSummary,
    output: Option<&std::path::Path>,
    format: OutputFormat,
) -> CliResult<i32> {
    let bytes = stream.encode().map_err(|err| frame_error("encode", err))?;
    summary.output_size = bytes.len();
    summary.frames = stream.len();
    tracing::info!(
        applied = summary.applied,
        rolled_back = summary.rolled_back,
        size = bytes.len(),
        "run finished"
    );

    if let Some(path) = output {
        write_output(path, &bytes)?;
        summary.output = Some(path.display().to_string());
    } else if matches!(format, OutputFormat::Raw) {
        print_raw(&bytes);
        return Ok(summary.exit_code());
    }

    print_summary(&summary, format);
    Ok(summary.exit_code())
}

fn print_summary(summary: &RunSummary, format: OutputFormat) {
    let skipped = summary
        .skipped
        .iter()
        .map(|(reason, count)| format!("{reason}={count}"))
        .collect::<Vec<_>>()
        .join(" ");

    match format {
        OutputFormat::Json | OutputFormat::Raw => print_json(summary),
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["SEED", "INPUT", "OUTPUT", "FRAMES", "APPLIED", "SKIPPED"])
                .add_row(vec![
                    summary.seed.to_string(),
                    summary.input_size.to_string(),
                    summary.output_size.to_string(),
                    summary.frames.to_string(),
                    summary.applied.to_string(),
                    skipped,
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!(
                "seed {}: {} applied, {} -> {} bytes in {} frames",
                summary.seed,
                summary.applied,
                summary.input_size,
                summary.output_size,
                summary.frames
            );
            if !skipped.is_empty() {
                println!("skipped: {skipped}");
            }
            if let Some(path) = &summary.output {
                println!("written to {path}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use h2fuzz_mutator::SkipReason;

    #[test]
    fn summary_counts_skips_by_reason() {
        let mut summary = RunSummary::default();
        summary.record(Ok(Outcome::Skipped(SkipReason::SameIndex))).unwrap();
        summary.record(Ok(Outcome::Skipped(SkipReason::SameIndex))).unwrap();
        summary.record(Ok(Outcome::Applied)).unwrap();

        assert_eq!(summary.applied, 1);
        assert_eq!(summary.skipped.get("same_index"), Some(&2));
        assert_eq!(summary.exit_code(), SUCCESS);
    }

    #[test]
    fn nothing_applied_is_a_failure() {
        let mut summary = RunSummary::default();
        summary.record(Ok(Outcome::Skipped(SkipReason::EmptyStream))).unwrap();
        assert_eq!(summary.exit_code(), FAILURE);
    }
}
