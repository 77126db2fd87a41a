use anyhow::Result;
use camino::Utf8PathBuf;
use clap::{Args, Parser, Subcommand, ValueEnum};
use clap_complete::Shell;

use crate::ostype::OsType;

#[derive(Parser, Debug)]
#[command(
    name = env!("CARGO_PKG_NAME"),
    version = env!("CARGO_PKG_VERSION"),
    about = env!("CARGO_PKG_DESCRIPTION"),
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Apply cloud-config documents to an instance
    Apply(ApplyArgs),

    /// Validate cloud-config documents without contacting an instance
    Validate(ValidateArgs),

    /// Print whether a path exists on an instance
    FileExists(FileExistsArgs),

    /// Print the version
    Version,

    /// Generate shell completion scripts
    Completions(CompletionsArgs),
}

impl Commands {
    /// Returns the log level requested by the command, if it logs at all.
    pub fn log_level(&self) -> Option<LogLevel> {
        match self {
            Commands::Apply(opts) => Some(opts.common.log_level),
            Commands::Validate(opts) => Some(opts.common.log_level),
            Commands::FileExists(opts) => Some(opts.common.log_level),
            Commands::Version | Commands::Completions(_) => None,
        }
    }
}

/// Options shared by the commands that log.
#[derive(Args, Debug)]
pub struct CommonArgs {
    /// Set the log level
    #[arg(short, long, default_value = "info")]
    pub log_level: LogLevel,
}

/// Selection of the instance to operate on.
#[derive(Args, Debug)]
pub struct TargetArgs {
    /// LXD instance to configure
    #[arg(short, long)]
    pub instance: String,

    /// lxc remote the instance lives on (default: the client's default remote)
    #[arg(long)]
    pub remote: Option<String>,
}

#[derive(Args, Debug)]
pub struct ApplyArgs {
    #[command(flatten)]
    pub target: TargetArgs,

    /// OS type, required to install packages
    #[arg(long = "ostype", value_enum)]
    pub os: Option<OsType>,

    /// Do not run, just show what would be done
    #[arg(long)]
    pub dry_run: bool,

    /// Do not log command output; stderr still goes to the terminal
    #[arg(short, long)]
    pub quiet: bool,

    #[command(flatten)]
    pub common: CommonArgs,

    /// cloud-config documents to apply, in order (`-` reads standard input)
    #[arg(required = true)]
    pub files: Vec<Utf8PathBuf>,
}

#[derive(Args, Debug)]
pub struct ValidateArgs {
    #[command(flatten)]
    pub common: CommonArgs,

    /// cloud-config documents to validate (`-` reads standard input)
    #[arg(required = true)]
    pub files: Vec<Utf8PathBuf>,
}

#[derive(Args, Debug)]
pub struct FileExistsArgs {
    #[command(flatten)]
    pub target: TargetArgs,

    #[command(flatten)]
    pub common: CommonArgs,

    /// Absolute path on the instance
    pub path: Utf8PathBuf,
}

#[derive(Args, Debug)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    pub shell: Shell,
}

/// Represents log levels for controlling the verbosity of logging output.
///
/// Maps directly to the levels of the `tracing` crate. Remote command output
/// is logged at `info` (stdout) and `warn` (stderr), so `--log-level warn`
/// keeps only the remote stderr and errors.
#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

pub fn parse_args() -> Result<Cli> {
    Ok(Cli::parse())
}
