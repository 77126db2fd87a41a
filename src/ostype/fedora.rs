//! Fedora package strategy.

use super::PackageManager;
use crate::document::Command;

/// Installs packages with `dnf`.
#[derive(Debug, Default, Clone)]
pub struct Fedora;

impl PackageManager for Fedora {
    fn name(&self) -> &'static str {
        "dnf"
    }

    fn install_command(&self, package: &str) -> Command {
        Command::args(["dnf", "install", "-y", package])
    }

    fn update_command(&self) -> Command {
        Command::args(["dnf", "makecache"])
    }

    fn upgrade_command(&self) -> Command {
        Command::args(["dnf", "upgrade", "-y"])
    }
}
