//! Destination directories offered to senders.

use std::{collections::BTreeSet, sync::Arc};

use {
    davdrop_webdav::SharedRemoteStore,
    tracing::{error, info},
};

use crate::{Result, routes::ChannelRoutes};

/// Union of mapped directories and the remote store's top-level directories.
#[derive(Clone)]
pub struct DirectoryCatalog {
    store: SharedRemoteStore,
    routes: Arc<ChannelRoutes>,
}

impl DirectoryCatalog {
    pub fn new(store: SharedRemoteStore, routes: Arc<ChannelRoutes>) -> Self {
        Self { store, routes }
    }

    /// Sorted, deduplicated directory paths, queried fresh on every call.
    ///
    /// A failed remote listing degrades to the mapped directories.
    pub async fn list_available(&self) -> Vec<String> {
        let mut directories: BTreeSet<String> = self.routes.directories();

        match self.store.list_top_level().await {
            Ok(entries) => {
                directories.extend(
                    entries
                        .into_iter()
                        .filter(|e| e.is_directory)
                        .map(|e| format!("/{}", e.name)),
                );
            },
            Err(e) => error!(error = %e, "failed to list remote directories"),
        }

        directories.into_iter().collect()
    }

    /// Create every mapped directory missing on the remote store.
    pub async fn ensure_configured(&self) -> Result<()> {
        for directory in self.routes.directories() {
            if self.store.exists(&directory).await? {
                continue;
            }
            info!(directory = %directory, "creating mapped directory");
            self.store.create_directory(&directory).await?;
        }
        Ok(())
    }
}
