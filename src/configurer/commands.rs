//! Command execution on the remote instance.

use anyhow::{Context, Result};
use tracing::{debug, info};

use super::Configurer;
use crate::document::Command;
use crate::error::CloudConfigError;
use crate::target::{ExecSpec, ExecutionResult};

/// Interpreter that receives script commands on standard input.
pub const SHELL: &str = "/bin/sh";

/// Returns an `Execution` error if the remote command did not succeed.
fn check_execution_result(
    result: &ExecutionResult,
    command: &[String],
    instance: &str,
) -> Result<()> {
    if result.success() {
        return Ok(());
    }
    let status = match result.exit_code {
        Some(code) => format!("exit code {}", code),
        None => "unknown status".to_string(),
    };
    Err(CloudConfigError::execution(instance, command, status).into())
}

impl Configurer<'_> {
    /// Runs one command directive and waits for it to complete.
    pub fn run_command(&self, command: &Command) -> Result<()> {
        match command {
            Command::Script(script) => self.exec(vec![SHELL.to_string()], Some(script.as_str())),
            Command::Args(args) => self.exec(args.clone(), None),
        }
    }

    /// Runs command directives in order, stopping at the first failure.
    pub fn run_commands(&self, commands: &[Command]) -> Result<()> {
        for command in commands {
            self.run_command(command)?;
        }
        Ok(())
    }

    /// Executes `args` on the instance, optionally feeding `stdin`.
    ///
    /// An empty argument vector is rejected before any remote call. Transport
    /// failures and non-zero exits are annotated with the instance name.
    pub(super) fn exec(&self, args: Vec<String>, stdin: Option<&str>) -> Result<()> {
        if args.is_empty() {
            return Err(CloudConfigError::Validation("empty command".to_string()).into());
        }

        let mut spec = ExecSpec::new(args).with_output(self.output);
        match stdin {
            Some(input) => {
                info!("{} << ---", spec.args.join(" "));
                debug!("{}\n---", input);
                spec = spec.with_stdin(input);
            }
            None => info!("{}", spec.args.join(" ")),
        }

        let instance = self.instance();
        let result = self
            .target
            .exec(&spec)
            .with_context(|| instance.to_string())?;
        check_execution_result(&result, &spec.args, instance)
    }
}
