//! Cloud-config document model and loading.
//!
//! A document is a YAML file whose first line is the `#cloud-config` marker.
//! The recognized keys are decoded into a [`Config`]; all other keys are
//! ignored. Loading a batch of documents decodes and validates every one of
//! them before returning, so that no remote work starts on a batch that
//! contains a broken document.

use std::fmt;
use std::fs;
use std::io::{self, Read};

use camino::{Utf8Path, Utf8PathBuf};
use serde::Deserialize;
use serde::de::{self, Deserializer, SeqAccess, Visitor};
use tracing::debug;

use crate::error::CloudConfigError;
use crate::target::WriteMode;

/// Comment that must open every cloud-config document.
pub const MARKER: &str = "#cloud-config";

/// Mode applied to written files that do not specify `permissions`.
pub const DEFAULT_FILE_MODE: u32 = 0o644;

/// Document path that reads from standard input.
pub const STDIN_PATH: &str = "-";

const STDIN_NAME: &str = "<stdin>";

/// The parsed unit of work of one document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Refresh the package index before installing packages.
    pub package_update: bool,
    /// Upgrade installed packages before installing packages.
    pub package_upgrade: bool,
    /// Packages to install, in order.
    pub packages: Vec<String>,
    /// Files to write, in order.
    #[serde(rename = "write_files", alias = "files")]
    pub files: Vec<FileSpec>,
    /// Commands to run after packages and files, in order.
    #[serde(rename = "runcmd")]
    pub commands: Vec<Command>,
}

impl Config {
    /// Validates every directive of the configuration.
    ///
    /// Runs before any remote call is made, so a bad permission string or an
    /// empty command fails the document instead of leaving it half applied.
    pub fn validate(&self) -> Result<(), CloudConfigError> {
        for package in &self.packages {
            if package.trim().is_empty() {
                return Err(CloudConfigError::Validation(
                    "package name must not be empty".to_string(),
                ));
            }
        }
        for file in &self.files {
            file.validate()?;
        }
        for command in &self.commands {
            command.validate()?;
        }
        Ok(())
    }

    /// Returns true if the configuration has nothing to apply.
    pub fn is_empty(&self) -> bool {
        !self.package_update
            && !self.package_upgrade
            && self.packages.is_empty()
            && self.files.is_empty()
            && self.commands.is_empty()
    }
}

/// A file to write on the instance.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FileSpec {
    /// Absolute path on the instance.
    pub path: Utf8PathBuf,
    /// File content.
    #[serde(default)]
    pub content: String,
    /// Octal mode string such as `"0600"`; [`DEFAULT_FILE_MODE`] when absent.
    #[serde(default, deserialize_with = "deserialize_permissions")]
    pub permissions: Option<String>,
    /// `user` or `user:group` to chown the file to after writing it.
    #[serde(default)]
    pub owner: Option<String>,
    /// Append to the file instead of replacing it.
    #[serde(default)]
    pub append: bool,
}

impl FileSpec {
    /// Creates a file directive with default mode, no owner, overwrite semantics.
    pub fn new(path: impl Into<Utf8PathBuf>, content: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            content: content.into(),
            permissions: None,
            owner: None,
            append: false,
        }
    }

    /// Sets the permission string.
    #[must_use]
    pub fn with_permissions(mut self, permissions: impl Into<String>) -> Self {
        self.permissions = Some(permissions.into());
        self
    }

    /// Sets the owner.
    #[must_use]
    pub fn with_owner(mut self, owner: impl Into<String>) -> Self {
        self.owner = Some(owner.into());
        self
    }

    /// Selects append semantics.
    #[must_use]
    pub fn appending(mut self) -> Self {
        self.append = true;
        self
    }

    /// Returns the numeric mode to apply to the file.
    pub fn mode(&self) -> Result<u32, CloudConfigError> {
        match &self.permissions {
            None => Ok(DEFAULT_FILE_MODE),
            Some(value) => parse_mode(value).ok_or_else(|| CloudConfigError::InvalidPermissions {
                path: self.path.to_string(),
                value: value.clone(),
            }),
        }
    }

    /// Returns the write mode selected by `append`.
    pub fn write_mode(&self) -> WriteMode {
        if self.append {
            WriteMode::Append
        } else {
            WriteMode::Overwrite
        }
    }

    /// Validates the path, permissions and owner of the directive.
    pub fn validate(&self) -> Result<(), CloudConfigError> {
        if self.path.as_str().is_empty() {
            return Err(CloudConfigError::Validation("file path must not be empty".to_string()));
        }
        if !self.path.is_absolute() {
            return Err(CloudConfigError::Validation(format!(
                "file path must be absolute: {}",
                self.path
            )));
        }
        if self.owner.as_deref().is_some_and(|o| o.trim().is_empty()) {
            return Err(CloudConfigError::Validation(format!(
                "owner of {} must not be empty",
                self.path
            )));
        }
        self.mode()?;
        Ok(())
    }
}

/// Parses an octal mode, accepting an optional `0o` prefix.
fn parse_mode(value: &str) -> Option<u32> {
    let trimmed = value.trim();
    let digits = trimmed.strip_prefix("0o").unwrap_or(trimmed);
    if digits.is_empty() || !digits.bytes().all(|b| (b'0'..=b'7').contains(&b)) {
        return None;
    }
    u32::from_str_radix(digits, 8)
        .ok()
        .filter(|mode| *mode <= 0o7777)
}

/// Accepts `permissions` only as a string.
///
/// YAML reads an unquoted `644` or `0o644` as an integer, and the written
/// digits cannot be recovered from it (`0o644` arrives as 420). Integers are
/// therefore rejected instead of being guessed at.
fn deserialize_permissions<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    struct PermissionsVisitor;

    impl<'de> Visitor<'de> for PermissionsVisitor {
        type Value = Option<String>;

        fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
            formatter.write_str("a quoted octal mode such as \"0644\"")
        }

        fn visit_none<E: de::Error>(self) -> Result<Self::Value, E> {
            Ok(None)
        }

        fn visit_unit<E: de::Error>(self) -> Result<Self::Value, E> {
            Ok(None)
        }

        fn visit_some<D>(self, deserializer: D) -> Result<Self::Value, D::Error>
        where
            D: Deserializer<'de>,
        {
            deserializer.deserialize_any(self)
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
            Ok(Some(v.to_string()))
        }

        fn visit_string<E: de::Error>(self, v: String) -> Result<Self::Value, E> {
            Ok(Some(v))
        }

        fn visit_i64<E: de::Error>(self, v: i64) -> Result<Self::Value, E> {
            Err(unquoted_mode(v))
        }

        fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
            Err(unquoted_mode(v))
        }
    }

    deserializer.deserialize_option(PermissionsVisitor)
}

fn unquoted_mode<E: de::Error>(value: impl fmt::Display) -> E {
    E::custom(format_args!(
        "permissions must be a quoted octal string such as \"0644\" (YAML read an integer {})",
        value
    ))
}

/// A directive to run on the instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Script text piped to `/bin/sh` on standard input.
    Script(String),
    /// Argument vector executed directly.
    Args(Vec<String>),
}

impl Command {
    /// Creates a script command.
    pub fn script(script: impl Into<String>) -> Self {
        Self::Script(script.into())
    }

    /// Creates an argument-vector command.
    pub fn args<I, S>(args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Args(args.into_iter().map(Into::into).collect())
    }

    /// Rejects an argument vector with no program.
    pub fn validate(&self) -> Result<(), CloudConfigError> {
        match self {
            Self::Script(_) => Ok(()),
            Self::Args(args) if args.is_empty() => {
                Err(CloudConfigError::Validation("empty command".to_string()))
            }
            Self::Args(_) => Ok(()),
        }
    }
}

impl<'de> Deserialize<'de> for Command {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct CommandVisitor;

        impl<'de> Visitor<'de> for CommandVisitor {
            type Value = Command;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a script string or a non-empty list of arguments")
            }

            fn visit_str<E>(self, v: &str) -> Result<Command, E>
            where
                E: de::Error,
            {
                Ok(Command::Script(v.to_string()))
            }

            fn visit_string<E>(self, v: String) -> Result<Command, E>
            where
                E: de::Error,
            {
                Ok(Command::Script(v))
            }

            fn visit_seq<A>(self, mut seq: A) -> Result<Command, A::Error>
            where
                A: SeqAccess<'de>,
            {
                let mut args = Vec::with_capacity(seq.size_hint().unwrap_or(0));
                while let Some(Token(arg)) = seq.next_element()? {
                    args.push(arg);
                }
                if args.is_empty() {
                    return Err(de::Error::invalid_length(0, &self));
                }
                Ok(Command::Args(args))
            }
        }

        deserializer.deserialize_any(CommandVisitor)
    }
}

/// A YAML scalar read as its string form (`5` becomes `"5"`).
struct Token(String);

impl<'de> Deserialize<'de> for Token {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct TokenVisitor;

        impl Visitor<'_> for TokenVisitor {
            type Value = Token;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a string, number or boolean")
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<Token, E> {
                Ok(Token(v.to_string()))
            }

            fn visit_string<E: de::Error>(self, v: String) -> Result<Token, E> {
                Ok(Token(v))
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<Token, E> {
                Ok(Token(v.to_string()))
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<Token, E> {
                Ok(Token(v.to_string()))
            }

            fn visit_f64<E: de::Error>(self, v: f64) -> Result<Token, E> {
                Ok(Token(v.to_string()))
            }

            fn visit_bool<E: de::Error>(self, v: bool) -> Result<Token, E> {
                Ok(Token(v.to_string()))
            }
        }

        deserializer.deserialize_any(TokenVisitor)
    }
}

/// A loaded document together with the name used in error messages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    /// The path the document was read from, or `<stdin>`.
    pub name: String,
    /// The decoded and validated configuration.
    pub config: Config,
}

/// Byte order mark some editors put at the start of UTF-8 files.
const UTF8_BOM: &[u8] = b"\xef\xbb\xbf";

fn strip_bom(data: &[u8]) -> &[u8] {
    data.strip_prefix(UTF8_BOM).unwrap_or(data)
}

/// Returns true if `data` starts with the [`MARKER`] comment, after an
/// optional UTF-8 byte order mark.
pub fn has_marker(data: &[u8]) -> bool {
    strip_bom(data)
        .strip_prefix(MARKER.as_bytes())
        .is_some_and(|rest| rest.first().is_none_or(|b| b.is_ascii_whitespace()))
}

/// Decodes and validates the content of one document.
///
/// `document` names the source in error messages.
pub fn parse_document(document: &str, data: &[u8]) -> Result<Config, CloudConfigError> {
    let data = strip_bom(data);
    if !has_marker(data) {
        return Err(CloudConfigError::MissingMarker {
            document: document.to_string(),
            marker: MARKER,
        });
    }

    let parse_error = |e: serde_yaml::Error| CloudConfigError::Parse {
        document: document.to_string(),
        message: e.to_string(),
    };

    // A document holding only the marker decodes to YAML null.
    let value: serde_yaml::Value = serde_yaml::from_slice(data).map_err(parse_error)?;
    let config = if value.is_null() {
        Config::default()
    } else {
        serde_yaml::from_slice::<Config>(data).map_err(parse_error)?
    };

    config
        .validate()
        .map_err(|e| CloudConfigError::InvalidDocument {
            document: document.to_string(),
            source: Box::new(e),
        })?;

    debug!(
        "loaded {}: {} package(s), {} file(s), {} command(s)",
        document,
        config.packages.len(),
        config.files.len(),
        config.commands.len()
    );
    Ok(config)
}

/// Reads, decodes and validates a document from a file.
pub fn load_document(path: &Utf8Path) -> Result<Config, CloudConfigError> {
    let data = fs::read(path).map_err(|e| CloudConfigError::io(path.as_str(), e))?;
    parse_document(path.as_str(), &data)
}

/// Reads, decodes and validates a document from a reader.
pub fn read_document<R: Read>(name: &str, mut reader: R) -> Result<Config, CloudConfigError> {
    let mut data = Vec::new();
    reader
        .read_to_end(&mut data)
        .map_err(|e| CloudConfigError::io(name, e))?;
    parse_document(name, &data)
}

/// Loads every document of a batch, in order.
///
/// A path of `-` reads standard input and may appear at most once. The first
/// document that fails to load fails the whole batch.
pub fn load_documents(paths: &[Utf8PathBuf]) -> Result<Vec<Document>, CloudConfigError> {
    if paths.is_empty() {
        return Err(CloudConfigError::Validation("no documents given".to_string()));
    }
    if paths.iter().filter(|p| p.as_str() == STDIN_PATH).count() > 1 {
        return Err(CloudConfigError::Validation(
            "standard input may only be given once".to_string(),
        ));
    }

    paths
        .iter()
        .map(|path| {
            if path.as_str() == STDIN_PATH {
                let config = read_document(STDIN_NAME, io::stdin().lock())?;
                Ok(Document {
                    name: STDIN_NAME.to_string(),
                    config,
                })
            } else {
                let config = load_document(path)?;
                Ok(Document {
                    name: path.to_string(),
                    config,
                })
            }
        })
        .collect()
}
