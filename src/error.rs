//! Domain-specific error types for cloudconfig-lxd.
//!
//! This module defines `CloudConfigError`, a `thiserror`-based enum that
//! provides typed error variants for the failure modes of document loading
//! and configuration application. Document loading returns
//! `Result<T, CloudConfigError>` directly, while the configurer and the
//! remote target boundary use `anyhow::Result` so that errors can be
//! annotated with the instance, path or document they concern.
//!
//! `CloudConfigError` implements `Into<anyhow::Error>`, so the `?` operator
//! converts it automatically, and callers can recover the typed variant with
//! `downcast_ref::<CloudConfigError>()`.

use std::io;

/// Formats an IO error kind into a human-readable message.
///
/// Gives consistent messages for common IO error kinds (e.g.
/// "I/O error: not found") instead of the OS-level text. Unrecognized kinds
/// fall back to the OS-level error message.
pub(crate) fn io_error_kind_message(err: &io::Error) -> String {
    match err.kind() {
        io::ErrorKind::NotFound => "I/O error: not found".to_string(),
        io::ErrorKind::PermissionDenied => "I/O error: permission denied".to_string(),
        io::ErrorKind::IsADirectory => "I/O error: is a directory".to_string(),
        _ => format!("I/O error: {}", err),
    }
}

/// Domain-specific error type for cloudconfig-lxd.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum CloudConfigError {
    /// A precondition or constraint was violated before any remote call.
    #[error("validation error: {0}")]
    Validation(String),

    /// A document does not begin with the cloud-config marker comment.
    #[error("{document}: does not start with {marker}")]
    MissingMarker {
        /// Path of the rejected document (`<stdin>` for standard input).
        document: String,
        /// The marker that was expected on the first line.
        marker: &'static str,
    },

    /// A document could not be decoded as YAML into a configuration.
    #[error("{document}: YAML parse error: {message}")]
    Parse {
        /// Path of the rejected document.
        document: String,
        /// Parser message, including line information when available.
        message: String,
    },

    /// A document decoded but one of its directives is invalid.
    ///
    /// The directive error is only reachable as the source, so `{:#}` shows
    /// it once.
    #[error("{document}: invalid document")]
    InvalidDocument {
        /// Path of the rejected document.
        document: String,
        /// The directive-level error.
        #[source]
        source: Box<CloudConfigError>,
    },

    /// A file permission string is not an octal mode.
    #[error("invalid permissions {value:?} for {path}: expected an octal mode")]
    InvalidPermissions {
        /// Remote path of the file directive.
        path: String,
        /// The rejected permission string.
        value: String,
    },

    /// An OS-specific operation was requested without an OS type.
    #[error("cannot {operation}: missing OS type")]
    MissingOs {
        /// The operation that needed an OS strategy (e.g. "install packages").
        operation: String,
    },

    /// A remote command completed unsuccessfully.
    #[error("{instance}: command failed: {command}: {status}")]
    Execution {
        /// The instance the command ran in.
        instance: String,
        /// The command line that was executed.
        command: String,
        /// Exit code or other reason for the failure.
        status: String,
    },

    /// A local I/O operation failed with contextual information.
    #[error("{context}: {message}")]
    Io {
        /// What was being done (usually a document path).
        context: String,
        /// Description derived from [`io_error_kind_message`].
        message: String,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

impl CloudConfigError {
    /// Creates an `Io` variant with the `message` field derived from `source`.
    pub(crate) fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            message: io_error_kind_message(&source),
            source,
        }
    }

    /// Creates an `Execution` variant from a command vector.
    pub(crate) fn execution(
        instance: impl Into<String>,
        command: &[String],
        status: impl Into<String>,
    ) -> Self {
        Self::Execution {
            instance: instance.into(),
            command: command.join(" "),
            status: status.into(),
        }
    }
}
