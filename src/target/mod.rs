//! Remote instance abstraction.
//!
//! This module provides:
//! - [`RemoteTarget`]: Trait for the two primitives the configurer needs on an
//!   instance (synchronous command execution and file upload), plus an
//!   existence probe
//! - [`ExecSpec`]: Specification for a command to run on the instance
//! - [`ExecutionResult`]: Result of a remote command
//! - [`FileUpload`]: Specification for a file upload
//! - [`LxcTarget`]: Production implementation that drives the `lxc` client

mod lxc;
mod pipe;

use std::fmt;

use anyhow::Result;
use camino::{Utf8Path, Utf8PathBuf};

pub use lxc::LxcTarget;

/// Formats command arguments into a space-separated, debug-quoted string.
///
/// Used by dry-run output to show exactly which arguments would be passed.
pub(crate) fn format_command_args(args: &[String]) -> String {
    args.iter()
        .map(|a| format!("{:?}", a))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Where the output of a remote command goes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputSink {
    /// Both streams are forwarded line by line to the log (stdout at INFO,
    /// stderr at WARN).
    #[default]
    Log,
    /// No log sink: stderr goes to this process's standard error and stdout
    /// is discarded.
    Stderr,
}

/// How an upload treats an existing file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum WriteMode {
    /// Replace the file content.
    #[default]
    Overwrite,
    /// Append to the file, creating it if it does not exist.
    Append,
}

impl fmt::Display for WriteMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Overwrite => f.write_str("overwrite"),
            Self::Append => f.write_str("append"),
        }
    }
}

/// Specification for a command to run on the instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecSpec {
    /// Program and arguments.
    pub args: Vec<String>,
    /// Text supplied on the command's standard input.
    pub stdin: Option<String>,
    /// Destination of the command's output.
    pub output: OutputSink,
}

impl ExecSpec {
    /// Creates a spec with no input that logs its output.
    #[must_use]
    pub fn new(args: Vec<String>) -> Self {
        Self {
            args,
            stdin: None,
            output: OutputSink::default(),
        }
    }

    /// Sets the standard input text.
    #[must_use]
    pub fn with_stdin(mut self, stdin: impl Into<String>) -> Self {
        self.stdin = Some(stdin.into());
        self
    }

    /// Sets the output sink.
    #[must_use]
    pub fn with_output(mut self, output: OutputSink) -> Self {
        self.output = output;
        self
    }
}

/// Result of a remote command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecutionResult {
    /// Exit code of the command (None in dry-run mode).
    pub exit_code: Option<i32>,
}

impl ExecutionResult {
    /// A result carrying the given exit code.
    pub fn exited(code: i32) -> Self {
        Self {
            exit_code: Some(code),
        }
    }

    /// The result of a command that was not run.
    pub fn dry_run() -> Self {
        Self { exit_code: None }
    }

    /// Returns true if the command completed successfully.
    ///
    /// In dry-run mode (no exit code), this always returns true.
    pub fn success(&self) -> bool {
        self.exit_code.is_none_or(|code| code == 0)
    }
}

/// Specification for a file upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileUpload {
    /// Absolute path on the instance.
    pub path: Utf8PathBuf,
    /// Bytes to write.
    pub content: Vec<u8>,
    /// Permission bits applied to the file.
    pub mode: u32,
    /// Overwrite or append.
    pub write_mode: WriteMode,
    /// Destination of the upload command's output.
    pub output: OutputSink,
}

/// Capability interface over one remote instance.
///
/// Every method blocks until the instance reports completion. A transport
/// failure is an `Err`; a command that ran and failed is an `Ok` result with
/// a non-zero exit code, which callers check.
pub trait RemoteTarget {
    /// Returns the identity of the instance, used to annotate errors.
    fn name(&self) -> &str;

    /// Runs a command on the instance and waits for it to finish.
    fn exec(&self, spec: &ExecSpec) -> Result<ExecutionResult>;

    /// Uploads a file to the instance.
    fn put_file(&self, upload: &FileUpload) -> Result<()>;

    /// Returns whether a path exists on the instance.
    fn file_exists(&self, path: &Utf8Path) -> Result<bool>;
}
