//! Local staging of downloaded attachments.

use std::path::{Path, PathBuf};

use {
    tempfile::TempPath,
    tracing::{debug, info, warn},
};

use crate::{Error, Result, attachment::Attachment, sink::AttachmentFetcher};

/// Prefix of every staging file, used to recognize leftovers.
pub const STAGING_PREFIX: &str = "davdrop-";

/// Directory holding staged attachments.
#[derive(Debug, Clone)]
pub struct StagingArea {
    root: PathBuf,
}

impl StagingArea {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Create the directory and delete files left by an earlier run.
    ///
    /// Returns the number of leftovers removed.
    pub async fn prepare(&self) -> Result<usize> {
        tokio::fs::create_dir_all(&self.root)
            .await
            .map_err(|e| Error::staging("create staging directory", e))?;

        let mut entries = tokio::fs::read_dir(&self.root)
            .await
            .map_err(|e| Error::staging("read staging directory", e))?;
        let mut removed = 0;
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| Error::staging("read staging directory", e))?
        {
            let is_leftover = entry
                .file_name()
                .to_str()
                .is_some_and(|name| name.starts_with(STAGING_PREFIX));
            if !is_leftover || !entry.file_type().await.is_ok_and(|t| t.is_file()) {
                continue;
            }
            match tokio::fs::remove_file(entry.path()).await {
                Ok(()) => removed += 1,
                Err(e) => warn!(path = %entry.path().display(), error = %e, "failed to remove leftover staging file"),
            }
        }

        if removed > 0 {
            info!(removed, dir = %self.root.display(), "removed leftover staging files");
        }
        Ok(removed)
    }

    /// Reserve a fresh, empty staging file for `file_name`.
    pub fn allocate(&self, file_name: &str) -> Result<StagedFile> {
        let suffix = Path::new(file_name)
            .extension()
            .and_then(|ext| ext.to_str())
            .filter(|ext| ext.len() <= 16)
            .map(|ext| format!(".{ext}"))
            .unwrap_or_default();

        let file = tempfile::Builder::new()
            .prefix(STAGING_PREFIX)
            .suffix(&suffix)
            .tempfile_in(&self.root)
            .map_err(|e| Error::staging("create staging file", e))?;
        let path = file.into_temp_path();
        debug!(path = %path.display(), file_name, "allocated staging file");
        Ok(StagedFile { path })
    }

    /// Allocate a staging file and download `attachment` into it.
    pub async fn download(
        &self,
        fetcher: &dyn AttachmentFetcher,
        attachment: &Attachment,
    ) -> Result<StagedFile> {
        let staged = self.allocate(&attachment.file_name)?;
        match fetcher.fetch(&attachment.source_id, staged.path()).await {
            Ok(bytes) => {
                debug!(file_name = %attachment.file_name, bytes, "downloaded attachment");
                Ok(staged)
            },
            Err(e) => {
                staged.discard_logged();
                Err(Error::fetch(&attachment.source_id, &e))
            },
        }
    }
}

/// A staged attachment on local disk.
///
/// `discard` deletes it and reports failures; dropping it deletes it silently.
#[derive(Debug)]
pub struct StagedFile {
    path: TempPath,
}

impl StagedFile {
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn discard(self) -> Result<()> {
        let path_display = self.path.display().to_string();
        self.path
            .close()
            .map_err(|e| Error::staging("delete staging file", e))?;
        debug!(path = %path_display, "deleted staging file");
        Ok(())
    }

    /// `discard`, logging instead of returning a failure.
    pub fn discard_logged(self) {
        if let Err(e) = self.discard() {
            warn!(error = %e, "failed to delete staging file");
        }
    }
}
