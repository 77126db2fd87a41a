//! Remote directory creation with per-session memoization.

use anyhow::{Context, Result};
use camino::Utf8Path;
use tracing::trace;

use super::Configurer;

/// Paths that always exist and never need creating.
fn is_root(dir: &Utf8Path) -> bool {
    matches!(dir.as_str(), "" | "." | "/")
}

impl Configurer<'_> {
    /// Makes sure `dir` exists on the instance.
    ///
    /// Issues at most one `mkdir -p` per directory not already known to
    /// exist. On success `dir` and all its ancestors are recorded, so later
    /// calls for any of them are free. On failure nothing is recorded.
    pub fn ensure_dir(&mut self, dir: &Utf8Path) -> Result<()> {
        if is_root(dir) {
            return Ok(());
        }
        if self.created_dirs.contains(dir) {
            trace!("directory already ensured: {}", dir);
            return Ok(());
        }

        self.exec(vec!["mkdir".to_string(), "-p".to_string(), dir.to_string()], None)
            .with_context(|| format!("failed to create directory {}", dir))?;

        for ancestor in dir.ancestors().take_while(|d| !is_root(d)) {
            self.created_dirs.insert(ancestor.to_owned());
        }
        Ok(())
    }
}
