//! Configuration application engine.
//!
//! A [`Configurer`] is a session bound to one remote instance. It applies
//! [`Config`]s in a fixed order (packages, then files, then commands),
//! remembers which directories it has already created on the instance, and
//! stops at the first failure. Nothing is retried or rolled back.
//!
//! The session's directory cache describes one instance only, so a
//! `Configurer` must not be reused for a different target.

mod commands;
mod dirs;
mod files;
mod packages;

use std::collections::HashSet;

use anyhow::{Context, Result};
use camino::{Utf8Path, Utf8PathBuf};
use tracing::info;

use crate::document::{self, Config, Document};
use crate::ostype::{OsType, PackageManager};
use crate::target::{OutputSink, RemoteTarget};

/// Applies cloud-config directives to one remote instance.
pub struct Configurer<'a> {
    target: &'a dyn RemoteTarget,
    package_manager: Option<Box<dyn PackageManager>>,
    output: OutputSink,
    /// Directories known to exist on the instance, with all their ancestors.
    /// Only ever grows.
    created_dirs: HashSet<Utf8PathBuf>,
}

impl<'a> Configurer<'a> {
    /// Creates a session for `target` with no OS strategy that logs command output.
    pub fn new(target: &'a dyn RemoteTarget) -> Self {
        Self {
            target,
            package_manager: None,
            output: OutputSink::default(),
            created_dirs: HashSet::new(),
        }
    }

    /// Selects the OS strategy of a known OS family; `None` leaves it unset.
    #[must_use]
    pub fn with_os(mut self, os: Option<OsType>) -> Self {
        self.package_manager = os.map(|os| os.as_package_manager());
        self
    }

    /// Installs a custom OS strategy.
    #[must_use]
    pub fn with_package_manager(mut self, package_manager: Box<dyn PackageManager>) -> Self {
        self.package_manager = Some(package_manager);
        self
    }

    /// Sets where the output of remote commands goes.
    #[must_use]
    pub fn with_output(mut self, output: OutputSink) -> Self {
        self.output = output;
        self
    }

    /// Returns the identity of the instance this session is bound to.
    pub fn instance(&self) -> &str {
        self.target.name()
    }

    /// Returns true if `dir` is known to exist on the instance.
    pub fn is_known_dir(&self, dir: &Utf8Path) -> bool {
        self.created_dirs.contains(dir)
    }

    /// Applies one configuration: packages, then files, then commands.
    ///
    /// Commands may rely on the packages and files of the same configuration
    /// being in place.
    pub fn apply(&mut self, config: &Config) -> Result<()> {
        self.apply_packages(config)?;
        self.write_files(&config.files)?;
        self.run_commands(&config.commands)?;
        Ok(())
    }

    /// Loads every document in `paths`, then applies them in order.
    ///
    /// No document is applied unless all of them load, so a broken document
    /// late in the list fails the batch before any remote change is made. A
    /// `-` path reads a document from standard input.
    pub fn apply_documents(&mut self, paths: &[Utf8PathBuf]) -> Result<()> {
        let documents = document::load_documents(paths)?;
        self.apply_loaded(&documents)
    }

    /// Applies already loaded documents in order, stopping at the first failure.
    ///
    /// The error of a failing document is annotated with its name.
    pub fn apply_loaded(&mut self, documents: &[Document]) -> Result<()> {
        for (index, document) in documents.iter().enumerate() {
            info!(
                "applying {} to {} ({}/{})",
                document.name,
                self.instance(),
                index + 1,
                documents.len()
            );
            self.apply(&document.config)
                .with_context(|| document.name.clone())?;
        }
        Ok(())
    }

    /// Returns whether `path` exists on the instance.
    pub fn file_exists(&self, path: &Utf8Path) -> Result<bool> {
        self.target
            .file_exists(path)
            .with_context(|| self.instance().to_string())
    }
}
