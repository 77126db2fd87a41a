//! File writing on the remote instance.

use anyhow::{Context, Result};
use tracing::{debug, info};

use super::Configurer;
use crate::document::FileSpec;
use crate::target::FileUpload;

impl Configurer<'_> {
    /// Writes one file directive.
    ///
    /// Ensures the parent directory, uploads the content with the requested
    /// mode, then changes ownership if an owner is given. The ownership change
    /// only runs after a successful upload.
    pub fn write_file(&mut self, file: &FileSpec) -> Result<()> {
        file.validate()?;
        let mode = file.mode()?;
        let write_mode = file.write_mode();

        info!("write file: {}", file.path);
        debug!("mode: {:04o}, write mode: {}, {} byte(s)", mode, write_mode, file.content.len());

        if let Some(dir) = file.path.parent() {
            self.ensure_dir(dir)?;
        }

        let upload = FileUpload {
            path: file.path.clone(),
            content: file.content.as_bytes().to_vec(),
            mode,
            write_mode,
            output: self.output,
        };
        self.target
            .put_file(&upload)
            .with_context(|| file.path.to_string())?;

        if let Some(owner) = &file.owner {
            self.exec(vec!["chown".to_string(), owner.clone(), file.path.to_string()], None)?;
        }
        Ok(())
    }

    /// Writes file directives in order, stopping at the first failure.
    pub fn write_files(&mut self, files: &[FileSpec]) -> Result<()> {
        for file in files {
            self.write_file(file)?;
        }
        Ok(())
    }
}
