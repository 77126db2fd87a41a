use std::io;
use std::process;

use anyhow::Result;
use clap::CommandFactory;
use cloudconfig_lxd::{build_target, cli, init_logging, run_apply, run_file_exists, run_validate};
use tracing::error;

fn run(args: &cli::Cli) -> Result<()> {
    match &args.command {
        cli::Commands::Apply(opts) => {
            let target = build_target(&opts.target, opts.dry_run)?;
            run_apply(opts, &target)
        }
        cli::Commands::Validate(opts) => run_validate(opts),
        cli::Commands::FileExists(opts) => {
            let target = build_target(&opts.target, false)?;
            let exists = run_file_exists(opts, &target)?;
            println!("{}: {}", opts.path, exists);
            Ok(())
        }
        cli::Commands::Version => {
            println!("{}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        cli::Commands::Completions(opts) => {
            let mut cmd = cli::Cli::command();
            clap_complete::generate(opts.shell, &mut cmd, env!("CARGO_PKG_NAME"), &mut io::stdout());
            Ok(())
        }
    }
}

fn main() -> Result<()> {
    let args = cli::parse_args()?;

    if let Some(log_level) = args.command.log_level() {
        init_logging(log_level)?;
    }

    if let Err(e) = run(&args) {
        error!("{:#}", e);
        process::exit(1);
    }

    Ok(())
}
