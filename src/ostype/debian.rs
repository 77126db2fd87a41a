//! Debian/Ubuntu package strategy.

use super::PackageManager;
use crate::document::Command;

/// Runs apt-get without interactive debconf prompts.
fn apt_get<'a>(args: impl IntoIterator<Item = &'a str>) -> Command {
    let prefix: [&'a str; 3] = ["env", "DEBIAN_FRONTEND=noninteractive", "apt-get"];
    Command::args(prefix.into_iter().chain(args))
}

/// Installs packages with `apt-get`.
#[derive(Debug, Default, Clone)]
pub struct Debian;

impl PackageManager for Debian {
    fn name(&self) -> &'static str {
        "apt"
    }

    fn install_command(&self, package: &str) -> Command {
        apt_get(["install", "-y", package])
    }

    fn update_command(&self) -> Command {
        apt_get(["update"])
    }

    fn upgrade_command(&self) -> Command {
        apt_get(["upgrade", "-y"])
    }
}
