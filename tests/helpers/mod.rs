use std::cell::RefCell;

use anyhow::bail;
use camino::{Utf8Path, Utf8PathBuf};
use cloudconfig_lxd::target::{
    ExecSpec, ExecutionResult, FileUpload, OutputSink, RemoteTarget, WriteMode,
};

/// Name reported by [`RecordingTarget`].
#[allow(dead_code)]
pub const INSTANCE: &str = "test-instance";

/// One call made against a [`RecordingTarget`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Exec {
        args: Vec<String>,
        stdin: Option<String>,
        output: OutputSink,
    },
    Put {
        path: String,
        content: Vec<u8>,
        mode: u32,
        write_mode: WriteMode,
        output: OutputSink,
    },
    Exists(String),
}

/// In-memory remote target that records every call in order.
///
/// Commands whose program matches `fail_program` exit with code 1. Commands
/// whose program matches `unreachable_program` fail with a transport error,
/// as do uploads when `fail_uploads` is set.
#[derive(Default)]
pub struct RecordingTarget {
    calls: RefCell<Vec<Call>>,
    fail_program: Option<String>,
    unreachable_program: Option<String>,
    fail_uploads: bool,
    existing: Vec<String>,
}

#[allow(dead_code)]
impl RecordingTarget {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_program(mut self, program: &str) -> Self {
        self.fail_program = Some(program.to_string());
        self
    }

    pub fn failing_transport(mut self, program: &str) -> Self {
        self.unreachable_program = Some(program.to_string());
        self
    }

    pub fn failing_uploads(mut self) -> Self {
        self.fail_uploads = true;
        self
    }

    pub fn with_existing(mut self, path: &str) -> Self {
        self.existing.push(path.to_string());
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.borrow().clone()
    }

    /// Argument vectors of the exec calls only.
    pub fn exec_args(&self) -> Vec<Vec<String>> {
        self.calls
            .borrow()
            .iter()
            .filter_map(|call| match call {
                Call::Exec { args, .. } => Some(args.clone()),
                _ => None,
            })
            .collect()
    }

    /// Number of `mkdir` invocations.
    pub fn mkdir_count(&self) -> usize {
        self.exec_args()
            .iter()
            .filter(|args| args.first().map(String::as_str) == Some("mkdir"))
            .count()
    }
}

impl RemoteTarget for RecordingTarget {
    fn name(&self) -> &str {
        INSTANCE
    }

    fn exec(&self, spec: &ExecSpec) -> anyhow::Result<ExecutionResult> {
        self.calls.borrow_mut().push(Call::Exec {
            args: spec.args.clone(),
            stdin: spec.stdin.clone(),
            output: spec.output,
        });
        if let Some(program) = &self.unreachable_program
            && spec.args.first() == Some(program)
        {
            bail!("connection to instance lost");
        }
        if let Some(program) = &self.fail_program
            && spec.args.first() == Some(program)
        {
            return Ok(ExecutionResult::exited(1));
        }
        Ok(ExecutionResult::exited(0))
    }

    fn put_file(&self, upload: &FileUpload) -> anyhow::Result<()> {
        self.calls.borrow_mut().push(Call::Put {
            path: upload.path.to_string(),
            content: upload.content.clone(),
            mode: upload.mode,
            write_mode: upload.write_mode,
            output: upload.output,
        });
        if self.fail_uploads {
            bail!("upload refused");
        }
        Ok(())
    }

    fn file_exists(&self, path: &Utf8Path) -> anyhow::Result<bool> {
        self.calls.borrow_mut().push(Call::Exists(path.to_string()));
        Ok(self.existing.iter().any(|p| p == path.as_str()))
    }
}

/// Shorthand for an expected exec call without input that logs its output.
#[allow(dead_code)]
pub fn exec(args: &[&str]) -> Call {
    Call::Exec {
        args: args.iter().map(|a| a.to_string()).collect(),
        stdin: None,
        output: OutputSink::Log,
    }
}

/// Output sinks of every call, in order.
#[allow(dead_code)]
pub fn outputs(calls: &[Call]) -> Vec<OutputSink> {
    calls
        .iter()
        .filter_map(|call| match call {
            Call::Exec { output, .. } | Call::Put { output, .. } => Some(*output),
            Call::Exists(_) => None,
        })
        .collect()
}

/// Writes `content` to `dir/name` and returns its path.
#[allow(dead_code)]
pub fn write_document(dir: &tempfile::TempDir, name: &str, content: &str) -> Utf8PathBuf {
    let path = Utf8PathBuf::from_path_buf(dir.path().join(name)).expect("path should be valid UTF-8");
    std::fs::write(&path, content).expect("failed to write document");
    path
}
