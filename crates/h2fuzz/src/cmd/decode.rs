use h2fuzz_frame::Stream;

use crate::cmd::{read_input, DecodeArgs};
use crate::exit::{frame_error, CliResult, SUCCESS};
use crate::output::{print_stream, OutputFormat};

pub fn run(args: DecodeArgs, format: OutputFormat) -> CliResult<i32> {
    let input = read_input(&args.input)?;
    let stream = Stream::decode(&input).map_err(|err| frame_error("decode", err))?;
    tracing::debug!(frames = stream.len(), bytes = input.len(), "decoded stream");
    print_stream(&stream, format);
    Ok(SUCCESS)
}
