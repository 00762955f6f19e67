use clap::{Args, Subcommand};
use std::path::{Path, PathBuf};

use h2fuzz_mutator::MutationConfig;

use crate::exit::{config_error, io_error, CliResult};
use crate::output::OutputFormat;

pub mod crossover;
pub mod decode;
pub mod mutate;
pub mod roundtrip;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List the frames of a captured HTTP/2 stream.
    Decode(DecodeArgs),
    /// Decode and re-encode a stream, checking it is byte-identical.
    Roundtrip(RoundtripArgs),
    /// Apply seeded mutations to a stream.
    Mutate(MutateArgs),
    /// Cross a donor stream into a stream.
    Crossover(CrossoverArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Decode(args) => decode::run(args, format),
        Command::Roundtrip(args) => roundtrip::run(args, format),
        Command::Mutate(args) => mutate::run(args, format),
        Command::Crossover(args) => crossover::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Args, Debug)]
pub struct DecodeArgs {
    /// File holding the raw frames (no connection preface).
    pub input: PathBuf,
}

#[derive(Args, Debug)]
pub struct RoundtripArgs {
    /// File holding the raw frames.
    pub input: PathBuf,
}

#[derive(Args, Debug)]
pub struct MutateArgs {
    /// File holding the raw frames.
    pub input: PathBuf,
    /// Seed of the random source; the same seed replays the same mutations.
    #[arg(long, default_value = "0")]
    pub seed: u64,
    /// Largest encoded size the result may have.
    #[arg(long, default_value = "4096")]
    pub max_size: usize,
    /// Number of mutations applied in sequence.
    #[arg(long, default_value = "1", value_parser = clap::value_parser!(u32).range(1..))]
    pub iterations: u32,
    /// JSON mutation profile.
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,
    /// Write the mutated stream here.
    #[arg(long, short = 'o', value_name = "FILE")]
    pub output: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct CrossoverArgs {
    /// File holding the recipient frames.
    pub input: PathBuf,
    /// File holding the donor frames.
    pub donor: PathBuf,
    /// Seed of the random source.
    #[arg(long, default_value = "0")]
    pub seed: u64,
    /// Largest encoded size the result may have.
    #[arg(long, default_value = "4096")]
    pub max_size: usize,
    /// JSON mutation profile.
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,
    /// Write the result here.
    #[arg(long, short = 'o', value_name = "FILE")]
    pub output: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

pub(crate) fn read_input(path: &Path) -> CliResult<Vec<u8>> {
    std::fs::read(path).map_err(|err| io_error(&format!("read {}", path.display()), err))
}

pub(crate) fn write_output(path: &Path, bytes: &[u8]) -> CliResult<()> {
    std::fs::write(path, bytes).map_err(|err| io_error(&format!("write {}", path.display()), err))
}

pub(crate) fn load_config(path: Option<&Path>) -> CliResult<MutationConfig> {
    match path {
        Some(path) => {
            let config = MutationConfig::from_file(path).map_err(|err| config_error("load config", err))?;
            tracing::info!(path = %path.display(), "loaded mutation profile");
            Ok(config)
        }
        None => Ok(MutationConfig::default()),
    }
}
