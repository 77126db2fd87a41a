pub mod cli;
pub mod configurer;
pub mod document;
pub mod error;
pub mod ostype;
pub mod target;

pub use configurer::Configurer;
pub use error::CloudConfigError;

use anyhow::{Context, Result};
use tracing::info;
use tracing_subscriber::{FmtSubscriber, filter::LevelFilter};

use crate::target::{LxcTarget, OutputSink, RemoteTarget};

pub fn init_logging(log_level: cli::LogLevel) -> Result<()> {
    let filter = match log_level {
        cli::LogLevel::Trace => LevelFilter::TRACE,
        cli::LogLevel::Debug => LevelFilter::DEBUG,
        cli::LogLevel::Info => LevelFilter::INFO,
        cli::LogLevel::Warn => LevelFilter::WARN,
        cli::LogLevel::Error => LevelFilter::ERROR,
    };

    tracing::subscriber::set_global_default(
        FmtSubscriber::builder().with_max_level(filter).finish(),
    )
    .context("failed to set global default tracing subscriber")
}

/// Builds the `lxc`-backed target selected on the command line.
pub fn build_target(args: &cli::TargetArgs, dry_run: bool) -> Result<LxcTarget, CloudConfigError> {
    LxcTarget::new(&args.instance, args.remote.as_deref(), dry_run)
}

/// Loads all documents named in `opts`, then applies them to `target`.
pub fn run_apply(opts: &cli::ApplyArgs, target: &dyn RemoteTarget) -> Result<()> {
    let output = if opts.quiet {
        OutputSink::Stderr
    } else {
        OutputSink::Log
    };
    let mut configurer = Configurer::new(target).with_os(opts.os).with_output(output);
    configurer.apply_documents(&opts.files)?;
    info!("applied {} document(s) to {}", opts.files.len(), target.name());
    Ok(())
}

/// Loads and validates all documents named in `opts`.
pub fn run_validate(opts: &cli::ValidateArgs) -> Result<()> {
    let documents = document::load_documents(&opts.files)?;
    for document in &documents {
        info!("validation successful: {}\n{:#?}", document.name, document.config);
    }
    Ok(())
}

/// Returns whether the path named in `opts` exists on `target`.
pub fn run_file_exists(opts: &cli::FileExistsArgs, target: &dyn RemoteTarget) -> Result<bool> {
    Configurer::new(target).file_exists(&opts.path)
}
