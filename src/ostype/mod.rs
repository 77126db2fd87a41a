//! OS package strategies.
//!
//! Each supported OS family implements [`PackageManager`], which turns a
//! package name into the [`Command`] that installs it with that family's
//! package manager. The installer only talks to the trait; supporting a new
//! family means adding an implementation and an [`OsType`] variant.

pub mod alpine;
pub mod debian;
pub mod fedora;

use clap::ValueEnum;
use strum::Display;

pub use alpine::Alpine;
pub use debian::Debian;
pub use fedora::Fedora;

use crate::document::Command;

/// Capability of producing package-management commands for one OS family.
pub trait PackageManager {
    /// Returns the name of the package manager (e.g. "apk").
    fn name(&self) -> &'static str;

    /// Returns the command that installs `package`.
    fn install_command(&self, package: &str) -> Command;

    /// Returns the command that refreshes the package index.
    fn update_command(&self) -> Command;

    /// Returns the command that upgrades all installed packages.
    fn upgrade_command(&self) -> Command;
}

/// Known OS families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, ValueEnum)]
#[strum(serialize_all = "lowercase")]
pub enum OsType {
    /// Alpine Linux (apk)
    Alpine,
    /// Debian and Ubuntu (apt)
    Debian,
    /// Fedora and other dnf-based distributions
    Fedora,
}

impl OsType {
    /// Returns a boxed package strategy for this OS family.
    pub fn as_package_manager(&self) -> Box<dyn PackageManager> {
        match self {
            OsType::Alpine => Box::new(Alpine),
            OsType::Debian => Box::new(Debian),
            OsType::Fedora => Box::new(Fedora),
        }
    }
}
