//! Package installation through the configured OS strategy.

use anyhow::Result;
use tracing::info;

use super::Configurer;
use crate::document::{Command, Config};
use crate::error::CloudConfigError;
use crate::ostype::PackageManager;

impl Configurer<'_> {
    /// Installs packages in order, one install command per package.
    ///
    /// An empty list is a no-op and does not need an OS strategy.
    pub fn install_packages(&self, packages: &[String]) -> Result<()> {
        if packages.is_empty() {
            return Ok(());
        }
        let package_manager = self.require_package_manager("install packages")?;
        info!("installing {} package(s) with {}", packages.len(), package_manager.name());
        let commands: Vec<Command> = packages
            .iter()
            .map(|package| package_manager.install_command(package))
            .collect();
        self.run_commands(&commands)
    }

    /// Refreshes the package index.
    pub fn update_packages(&self) -> Result<()> {
        let package_manager = self.require_package_manager("update packages")?;
        self.run_command(&package_manager.update_command())
    }

    /// Upgrades all installed packages.
    pub fn upgrade_packages(&self) -> Result<()> {
        let package_manager = self.require_package_manager("upgrade packages")?;
        self.run_command(&package_manager.upgrade_command())
    }

    /// Runs the package step of a configuration: update, upgrade, installs.
    pub(super) fn apply_packages(&self, config: &Config) -> Result<()> {
        if config.package_update {
            self.update_packages()?;
        }
        if config.package_upgrade {
            self.upgrade_packages()?;
        }
        self.install_packages(&config.packages)
    }

    fn require_package_manager(
        &self,
        operation: &str,
    ) -> Result<&dyn PackageManager, CloudConfigError> {
        self.package_manager
            .as_deref()
            .ok_or_else(|| CloudConfigError::MissingOs {
                operation: operation.to_string(),
            })
    }
}
