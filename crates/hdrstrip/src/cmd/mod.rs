use clap::{Args, Subcommand, ValueEnum};
use std::path::PathBuf;

use hdrstrip_pipeline::{OverlongLine, SentinelMatch, DEFAULT_MAX_LINE_LEN, DEFAULT_SENTINEL};

use crate::exit::CliResult;
use crate::output::OutputFormat;

pub mod strip;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Copy everything after the sentinel line to the output file.
    Strip(StripArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Strip(args) => strip::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Copy, Clone, Debug, ValueEnum)]
pub enum MatchMode {
    /// The sentinel appears anywhere in the line.
    Contains,
    /// The whole line, minus its terminator, is the sentinel.
    Exact,
}

impl From<MatchMode> for SentinelMatch {
    fn from(mode: MatchMode) -> Self {
        match mode {
            MatchMode::Contains => SentinelMatch::Contains,
            MatchMode::Exact => SentinelMatch::Exact,
        }
    }
}

#[derive(Copy, Clone, Debug, ValueEnum)]
pub enum OverlongMode {
    /// Relay long lines in chunks of at most --max-line-len bytes.
    Split,
    /// Fail on the first line longer than --max-line-len.
    Reject,
}

impl From<OverlongMode> for OverlongLine {
    fn from(mode: OverlongMode) -> Self {
        match mode {
            OverlongMode::Split => OverlongLine::Split,
            OverlongMode::Reject => OverlongLine::Reject,
        }
    }
}

#[derive(Args, Debug)]
pub struct StripArgs {
    /// Source file with a header section.
    #[arg(default_value = "data.txt")]
    pub input: PathBuf,
    /// Destination file (created or truncated).
    #[arg(default_value = "src.txt")]
    pub output: PathBuf,
    /// Text marking the end of the header.
    #[arg(long, env = "HDRSTRIP_SENTINEL", default_value = DEFAULT_SENTINEL)]
    pub sentinel: String,
    /// How lines are compared with the sentinel.
    #[arg(long = "match", value_name = "MODE", default_value = "contains")]
    pub match_mode: MatchMode,
    /// Maximum bytes per line, terminator included.
    #[arg(long, env = "HDRSTRIP_MAX_LINE_LEN", default_value_t = DEFAULT_MAX_LINE_LEN)]
    pub max_line_len: usize,
    /// What to do with lines longer than --max-line-len.
    #[arg(long, value_name = "POLICY", default_value = "split")]
    pub overlong: OverlongMode,
    /// Exit with status 1 when the sentinel never appears.
    #[arg(long)]
    pub require_sentinel: bool,
    /// Do not print the run summary.
    #[arg(long, short = 'q')]
    pub quiet: bool,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}
