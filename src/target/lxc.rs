//! [`RemoteTarget`] implementation backed by the `lxc` client.
//!
//! The client owns server discovery (unix socket or HTTPS remote) and
//! credentials, so this target only has to build `lxc exec` and
//! `lxc file push` invocations for one instance and wait for them.

use std::io::{self, Read, Write};
use std::process::{Child, Command, Stdio};
use std::thread::{self, JoinHandle};

use anyhow::{Context, Result};
use camino::Utf8Path;
use which::which;

use super::pipe::{StreamType, panic_message, read_pipe_to_log};
use super::{
    ExecSpec, ExecutionResult, FileUpload, OutputSink, RemoteTarget, WriteMode,
    format_command_args,
};
use crate::error::CloudConfigError;

const LXC: &str = "lxc";

/// Appends stdin to `$1`, creating it if needed, then applies mode `$2`.
const APPEND_SCRIPT: &str = r#"cat >> "$1" && chmod "$2" "$1""#;

/// Kills a child process and joins its reader threads.
///
/// Called from error paths so that a failed spawn or wait leaves no process
/// or thread behind.
fn cleanup_child_process<I>(child: &mut Child, handles: I)
where
    I: IntoIterator<Item = JoinHandle<()>>,
{
    let pid = child.id();
    if let Err(e) = child.kill() {
        tracing::debug!(pid = pid, "kill returned error (process may have already exited): {}", e);
    }
    if let Err(e) = child.wait() {
        tracing::warn!(pid = pid, "failed to wait for child process after kill: {}", e);
    }
    for handle in handles {
        if let Err(e) = handle.join() {
            tracing::warn!("reader thread panicked during cleanup: {}", panic_message(&*e));
        }
    }
}

/// Starts a thread that logs the lines of `pipe`, if the pipe was captured.
fn spawn_reader<R>(
    pipe: Option<R>,
    stream_type: StreamType,
    instance: &str,
) -> io::Result<Option<JoinHandle<()>>>
where
    R: Read + Send + 'static,
{
    let Some(pipe) = pipe else {
        return Ok(None);
    };
    let instance = instance.to_string();
    thread::Builder::new()
        .name(format!("{}-reader", stream_type))
        .spawn(move || read_pipe_to_log(Some(pipe), stream_type, &instance))
        .map(Some)
}

/// An LXD instance reached through the `lxc` command line client.
///
/// When `dry_run` is set, invocations are logged but not run, and `lxc` is
/// never looked up.
#[derive(Debug, Clone)]
pub struct LxcTarget {
    reference: String,
    dry_run: bool,
}

impl LxcTarget {
    /// Creates a target for `instance`, optionally on a named lxc remote.
    pub fn new(
        instance: &str,
        remote: Option<&str>,
        dry_run: bool,
    ) -> Result<Self, CloudConfigError> {
        let instance = instance.trim();
        if instance.is_empty() {
            return Err(CloudConfigError::Validation("missing instance".to_string()));
        }
        if instance.contains('/') {
            return Err(CloudConfigError::Validation(format!(
                "invalid instance name: {}",
                instance
            )));
        }
        let reference = match remote.map(str::trim).filter(|r| !r.is_empty()) {
            Some(remote) => format!("{}:{}", remote, instance),
            None => instance.to_string(),
        };
        Ok(Self { reference, dry_run })
    }

    /// Returns the `[remote:]instance` reference passed to `lxc`.
    pub fn reference(&self) -> &str {
        &self.reference
    }

    fn exec_args(&self, command: &[String]) -> Vec<String> {
        let mut args = Vec::with_capacity(command.len() + 4);
        args.push("exec".to_string());
        args.push(self.reference.clone());
        args.push("--mode=non-interactive".to_string());
        args.push("--".to_string());
        args.extend(command.iter().cloned());
        args
    }

    fn push_args(&self, upload: &FileUpload) -> Vec<String> {
        vec![
            "file".to_string(),
            "push".to_string(),
            format!("--mode={:04o}", upload.mode),
            "-".to_string(),
            format!("{}{}", self.reference, upload.path),
        ]
    }

    fn append_args(&self, upload: &FileUpload) -> Vec<String> {
        self.exec_args(&[
            "sh".to_string(),
            "-c".to_string(),
            APPEND_SCRIPT.to_string(),
            "sh".to_string(),
            upload.path.to_string(),
            format!("{:04o}", upload.mode),
        ])
    }

    /// Runs `lxc` with `args`, feeding `stdin` and routing output per `output`.
    fn run_lxc(
        &self,
        args: &[String],
        stdin: Option<&[u8]>,
        output: OutputSink,
    ) -> Result<ExecutionResult> {
        if self.dry_run {
            tracing::info!("dry run: {} {}", LXC, format_command_args(args));
            return Ok(ExecutionResult::dry_run());
        }

        let lxc = which(LXC).with_context(|| format!("command not found: {}", LXC))?;
        tracing::trace!("command found: {}: {}", LXC, lxc.to_string_lossy());

        let mut command = Command::new(lxc);
        command.args(args);
        command.stdin(if stdin.is_some() {
            Stdio::piped()
        } else {
            Stdio::null()
        });
        match output {
            OutputSink::Log => {
                command.stdout(Stdio::piped());
                command.stderr(Stdio::piped());
            }
            OutputSink::Stderr => {
                command.stdout(Stdio::null());
                command.stderr(Stdio::inherit());
            }
        }

        let mut child = command
            .spawn()
            .with_context(|| format!("failed to spawn `{} {}`", LXC, args.join(" ")))?;
        tracing::trace!("spawned {}: pid={}", LXC, child.id());

        let failure = |status: String| CloudConfigError::execution(&self.reference, args, status);

        let stdout_handle =
            match spawn_reader(child.stdout.take(), StreamType::Stdout, &self.reference) {
                Ok(handle) => handle,
                Err(e) => {
                    cleanup_child_process(&mut child, []);
                    return Err(failure(format!("failed to spawn stdout reader thread: {}", e)).into());
                }
            };
        let stderr_handle =
            match spawn_reader(child.stderr.take(), StreamType::Stderr, &self.reference) {
                Ok(handle) => handle,
                Err(e) => {
                    cleanup_child_process(&mut child, stdout_handle);
                    return Err(failure(format!("failed to spawn stderr reader thread: {}", e)).into());
                }
            };
        let handles: Vec<JoinHandle<()>> = stdout_handle.into_iter().chain(stderr_handle).collect();

        if let (Some(input), Some(mut pipe)) = (stdin, child.stdin.take()) {
            // The pipe is dropped at the end of this block, closing the
            // command's stdin.
            match pipe.write_all(input) {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::BrokenPipe => {
                    tracing::debug!("command closed stdin before reading all input");
                }
                Err(e) => {
                    cleanup_child_process(&mut child, handles);
                    return Err(failure(format!("failed to write stdin: {}", e)).into());
                }
            }
        }

        let status = match child.wait() {
            Ok(s) => s,
            Err(e) => {
                cleanup_child_process(&mut child, handles);
                return Err(failure(format!("failed to wait for command: {}", e)).into());
            }
        };

        for handle in handles {
            if let Err(e) = handle.join() {
                tracing::error!(panic = panic_message(&*e), "reader thread panicked");
            }
        }

        match status.code() {
            Some(code) => {
                tracing::trace!("{} exited with code {}", LXC, code);
                Ok(ExecutionResult::exited(code))
            }
            None => Err(failure(format!("terminated by signal ({})", status)).into()),
        }
    }

    /// Runs `args` and turns a non-zero exit into an `Execution` error.
    fn run_checked(
        &self,
        args: &[String],
        stdin: Option<&[u8]>,
        output: OutputSink,
    ) -> Result<()> {
        let result = self.run_lxc(args, stdin, output)?;
        if result.success() {
            return Ok(());
        }
        let code = result.exit_code.unwrap_or_default();
        Err(CloudConfigError::execution(&self.reference, args, format!("exit code {}", code))
            .into())
    }
}

impl RemoteTarget for LxcTarget {
    fn name(&self) -> &str {
        &self.reference
    }

    fn exec(&self, spec: &ExecSpec) -> Result<ExecutionResult> {
        let args = self.exec_args(&spec.args);
        self.run_lxc(&args, spec.stdin.as_deref().map(str::as_bytes), spec.output)
    }

    fn put_file(&self, upload: &FileUpload) -> Result<()> {
        let args = match upload.write_mode {
            WriteMode::Overwrite => self.push_args(upload),
            WriteMode::Append => self.append_args(upload),
        };
        self.run_checked(&args, Some(&upload.content), upload.output)
    }

    fn file_exists(&self, path: &Utf8Path) -> Result<bool> {
        let args = self.exec_args(&["test".to_string(), "-e".to_string(), path.to_string()]);
        let result = self.run_lxc(&args, None, OutputSink::Stderr)?;
        match result.exit_code {
            None => Ok(false),
            Some(0) => Ok(true),
            Some(1) => Ok(false),
            Some(code) => Err(CloudConfigError::execution(
                &self.reference,
                &args,
                format!("exit code {}", code),
            )
            .into()),
        }
    }
}
