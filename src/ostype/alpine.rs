//! Alpine Linux package strategy.

use super::PackageManager;
use crate::document::Command;

/// Installs packages with `apk`.
#[derive(Debug, Default, Clone)]
pub struct Alpine;

impl PackageManager for Alpine {
    fn name(&self) -> &'static str {
        "apk"
    }

    fn install_command(&self, package: &str) -> Command {
        Command::args(["apk", "add", package])
    }

    fn update_command(&self) -> Command {
        Command::args(["apk", "update"])
    }

    fn upgrade_command(&self) -> Command {
        Command::args(["apk", "upgrade"])
    }
}
