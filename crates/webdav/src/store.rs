//! Remote store trait consumed by the relay core.

use std::{path::Path, sync::Arc};

use async_trait::async_trait;

use crate::Result;

/// One entry of a directory listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteEntry {
    /// Decoded last path segment, without slashes.
    pub name: String,
    pub is_directory: bool,
}

/// Directory-oriented file store.
///
/// Paths are absolute from the store root (`/inbox/report.pdf`). All
/// operations are safe to repeat with the same arguments.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Whether a file or directory exists at `path`.
    async fn exists(&self, path: &str) -> Result<bool>;

    /// Create a directory. Creating one that already exists succeeds.
    async fn create_directory(&self, path: &str) -> Result<()>;

    /// Entries directly below the store root.
    async fn list_top_level(&self) -> Result<Vec<RemoteEntry>>;

    /// Upload a local file to `remote_path`, replacing any existing file.
    async fn upload(&self, local_path: &Path, remote_path: &str) -> Result<()>;
}

/// Thread-safe shared remote store.
pub type SharedRemoteStore = Arc<dyn RemoteStore>;
