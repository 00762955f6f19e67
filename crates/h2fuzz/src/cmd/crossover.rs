use h2fuzz_frame::Stream;
use h2fuzz_mutator::{Mutator, SeededRng};

use crate::cmd::mutate::{finish, RunSummary};
use crate::cmd::{load_config, read_input, CrossoverArgs};
use crate::exit::{frame_error, CliResult};
use crate::output::OutputFormat;

pub fn run(args: CrossoverArgs, format: OutputFormat) -> CliResult<i32> {
    let config = load_config(args.config.as_deref())?;
    let input = read_input(&args.input)?;
    let donor_bytes = read_input(&args.donor)?;
    let mut stream = Stream::decode(&input).map_err(|err| frame_error("decode input", err))?;
    let donor = Stream::decode(&donor_bytes).map_err(|err| frame_error("decode donor", err))?;
    tracing::debug!(
        frames = stream.len(),
        donor_frames = donor.len(),
        "crossing streams"
    );

    let mut mutator = Mutator::new(config);
    let mut rng = SeededRng::new(args.seed);
    let mut summary = RunSummary {
        seed: args.seed,
        max_size: args.max_size,
        input_size: input.len(),
        ..RunSummary::default()
    };
    let result = mutator.crossover(&mut stream, &donor, &mut rng, args.max_size);
    summary.record(result)?;

    finish(&stream, summary, args.output.as_deref(), format)
}
