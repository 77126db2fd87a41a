//! Streaming of remote command output into the log.
//!
//! `lxc exec` relays the instance's stdout and stderr on its own pipes; each
//! pipe is drained by a reader thread that logs one event per line.

use std::io::{BufRead, BufReader, Read};

/// Type of output stream for logging purposes.
#[derive(Clone, Copy)]
pub(super) enum StreamType {
    Stdout,
    Stderr,
}

impl std::fmt::Display for StreamType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Stdout => f.write_str("stdout"),
            Self::Stderr => f.write_str("stderr"),
        }
    }
}

/// Extracts a human-readable message from a thread panic.
pub(super) fn panic_message(err: &(dyn std::any::Any + Send)) -> &str {
    err.downcast_ref::<&str>()
        .copied()
        .or_else(|| err.downcast_ref::<String>().map(|s| s.as_str()))
        .unwrap_or("unknown panic")
}

/// Reads from a pipe and logs each line, tagged with the instance name.
///
/// - stdout is logged at INFO level, stderr at WARN level
/// - Binary data uses lossy UTF-8 conversion
/// - I/O errors stop reading but don't fail the command; success is decided
///   by the exit code alone
/// - A `None` pipe means the stream was not captured and is ignored
pub(super) fn read_pipe_to_log<R: Read>(pipe: Option<R>, stream_type: StreamType, instance: &str) {
    let Some(pipe) = pipe else {
        return;
    };

    let mut reader = BufReader::new(pipe);
    let mut line_buf = Vec::new();

    loop {
        line_buf.clear();
        match reader.read_until(b'\n', &mut line_buf) {
            Ok(0) => break,
            Ok(_) => {
                let content = line_buf.strip_suffix(b"\n").unwrap_or(&line_buf);
                log_line(content, stream_type, instance);
            }
            Err(e) => {
                tracing::error!(stream = %stream_type, instance, error = %e, "I/O error, stopping read");
                break;
            }
        }
    }
}

/// Logs a complete line; a trailing CR is trimmed.
fn log_line(line: &[u8], stream_type: StreamType, instance: &str) {
    let text = String::from_utf8_lossy(line);
    let trimmed = text.trim_end_matches('\r');
    match stream_type {
        StreamType::Stdout => tracing::info!(stream = %stream_type, instance, "{}", trimmed),
        StreamType::Stderr => tracing::warn!(stream = %stream_type, instance, "{}", trimmed),
    }
}
