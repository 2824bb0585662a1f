//! In-memory collaborators for relay tests.
#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::{
    collections::BTreeSet,
    path::Path,
    sync::{
        Arc, Mutex,
        atomic::{AtomicBool, AtomicI32, Ordering},
    },
};

use {
    async_trait::async_trait,
    davdrop_config::ChannelMapping,
    davdrop_webdav::{RemoteEntry, RemoteStore},
};

use crate::{
    attachment::{Attachment, AttachmentKind, InboundMedia},
    catalog::DirectoryCatalog,
    channel::ChannelRelay,
    intake::Intake,
    routes::ChannelRoutes,
    selection::SelectionFlow,
    sink::{AttachmentFetcher, MessageRef, OptionButton, ReplySink},
    staging::StagingArea,
};

pub fn mapping(chat_id: i64, directory: &str) -> ChannelMapping {
    ChannelMapping {
        chat_id,
        directory: directory.into(),
    }
}

pub fn attachment(source_id: &str, file_name: &str) -> Attachment {
    Attachment {
        source_id: source_id.into(),
        file_name: file_name.into(),
        kind: AttachmentKind::Document,
    }
}

pub fn document(source_id: &str, file_name: &str) -> InboundMedia {
    InboundMedia::Document {
        source_id: source_id.into(),
        file_name: Some(file_name.into()),
    }
}

fn server_error(status: u16) -> davdrop_webdav::Error {
    davdrop_webdav::Error::UnexpectedStatus {
        method: "TEST",
        path: "/".into(),
        status,
    }
}

// ── Remote store ─────────────────────────────────────────────

#[derive(Default)]
struct StoreState {
    directories: BTreeSet<String>,
    files: BTreeSet<String>,
    created: Vec<String>,
    uploads: Vec<(String, Vec<u8>)>,
    calls: usize,
}

#[derive(Default)]
pub struct FakeStore {
    state: Mutex<StoreState>,
    fail_listing: AtomicBool,
    fail_mkcol: AtomicBool,
    fail_upload: AtomicBool,
}

impl FakeStore {
    pub fn with_directories(directories: &[&str]) -> Self {
        let store = Self::default();
        store
            .state
            .lock()
            .unwrap()
            .directories
            .extend(directories.iter().map(|d| d.to_string()));
        store
    }

    pub fn add_file(&self, path: &str) {
        self.state.lock().unwrap().files.insert(path.into());
    }

    pub fn fail_listing(&self) {
        self.fail_listing.store(true, Ordering::SeqCst);
    }

    pub fn fail_mkcol(&self) {
        self.fail_mkcol.store(true, Ordering::SeqCst);
    }

    pub fn fail_upload(&self) {
        self.fail_upload.store(true, Ordering::SeqCst);
    }

    pub fn has_directory(&self, path: &str) -> bool {
        self.state.lock().unwrap().directories.contains(path)
    }

    pub fn created(&self) -> Vec<String> {
        self.state.lock().unwrap().created.clone()
    }

    /// Successful uploads as `(remote path, bytes)`.
    pub fn uploads(&self) -> Vec<(String, Vec<u8>)> {
        self.state.lock().unwrap().uploads.clone()
    }

    pub fn calls(&self) -> usize {
        self.state.lock().unwrap().calls
    }
}

#[async_trait]
impl RemoteStore for FakeStore {
    async fn exists(&self, path: &str) -> davdrop_webdav::Result<bool> {
        let mut state = self.state.lock().unwrap();
        state.calls += 1;
        Ok(state.directories.contains(path) || state.files.contains(path))
    }

    async fn create_directory(&self, path: &str) -> davdrop_webdav::Result<()> {
        let mut state = self.state.lock().unwrap();
        state.calls += 1;
        if self.fail_mkcol.load(Ordering::SeqCst) {
            return Err(server_error(409));
        }
        if state.directories.insert(path.into()) {
            state.created.push(path.into());
        }
        Ok(())
    }

    async fn list_top_level(&self) -> davdrop_webdav::Result<Vec<RemoteEntry>> {
        let mut state = self.state.lock().unwrap();
        state.calls += 1;
        if self.fail_listing.load(Ordering::SeqCst) {
            return Err(server_error(500));
        }
        let directories = state.directories.iter().map(|d| (d, true));
        let files = state.files.iter().map(|f| (f, false));
        Ok(directories
            .chain(files)
            .filter(|(path, _)| path.matches('/').count() == 1)
            .map(|(path, is_directory)| RemoteEntry {
                name: path.trim_start_matches('/').to_string(),
                is_directory,
            })
            .collect())
    }

    async fn upload(&self, local_path: &Path, remote_path: &str) -> davdrop_webdav::Result<()> {
        let bytes = std::fs::read(local_path)?;
        let mut state = self.state.lock().unwrap();
        state.calls += 1;
        if self.fail_upload.load(Ordering::SeqCst) {
            return Err(server_error(507));
        }
        state.files.insert(remote_path.into());
        state.uploads.push((remote_path.into(), bytes));
        Ok(())
    }
}

// ── Attachment fetcher ───────────────────────────────────────

#[derive(Default)]
pub struct FakeFetcher {
    fail: AtomicBool,
}

impl FakeFetcher {
    pub fn fail(&self) {
        self.fail.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl AttachmentFetcher for FakeFetcher {
    async fn fetch(&self, source_id: &str, destination: &Path) -> anyhow::Result<u64> {
        if self.fail.load(Ordering::SeqCst) {
            anyhow::bail!("file {source_id} is gone");
        }
        let bytes = format!("bytes of {source_id}");
        tokio::fs::write(destination, &bytes).await?;
        Ok(bytes.len() as u64)
    }
}

// ── Reply sink ───────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SinkCall {
    Text {
        chat_id: i64,
        text: String,
    },
    Options {
        chat_id: i64,
        text: String,
        rows: Vec<Vec<OptionButton>>,
        message: MessageRef,
    },
    Edit {
        message: MessageRef,
        text: String,
    },
}

#[derive(Default)]
pub struct FakeSink {
    calls: Mutex<Vec<SinkCall>>,
    next_message_id: AtomicI32,
    fail_options: AtomicBool,
}

impl FakeSink {
    pub fn fail_options(&self) {
        self.fail_options.store(true, Ordering::SeqCst);
    }

    pub fn calls(&self) -> Vec<SinkCall> {
        self.calls.lock().unwrap().clone()
    }

    /// Text of every reply, sent or edited, in order.
    pub fn texts(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .map(|call| match call {
                SinkCall::Text { text, .. }
                | SinkCall::Options { text, .. }
                | SinkCall::Edit { text, .. } => text,
            })
            .collect()
    }

    pub fn last_text(&self) -> String {
        self.texts().pop().unwrap_or_default()
    }

    /// The most recent options message and its rows.
    pub fn last_options(&self) -> (MessageRef, Vec<Vec<OptionButton>>) {
        self.calls()
            .into_iter()
            .rev()
            .find_map(|call| match call {
                SinkCall::Options { message, rows, .. } => Some((message, rows)),
                _ => None,
            })
            .expect("no options were sent")
    }
}

#[async_trait]
impl ReplySink for FakeSink {
    async fn send_text(&self, chat_id: i64, text: &str) -> anyhow::Result<()> {
        self.calls.lock().unwrap().push(SinkCall::Text {
            chat_id,
            text: text.into(),
        });
        Ok(())
    }

    async fn send_options(
        &self,
        chat_id: i64,
        text: &str,
        rows: &[Vec<OptionButton>],
    ) -> anyhow::Result<MessageRef> {
        if self.fail_options.load(Ordering::SeqCst) {
            anyhow::bail!("chat not found");
        }
        let message = MessageRef {
            chat_id,
            message_id: self.next_message_id.fetch_add(1, Ordering::SeqCst) + 1,
        };
        self.calls.lock().unwrap().push(SinkCall::Options {
            chat_id,
            text: text.into(),
            rows: rows.to_vec(),
            message,
        });
        Ok(message)
    }

    async fn edit_text(&self, message: MessageRef, text: &str) -> anyhow::Result<()> {
        self.calls.lock().unwrap().push(SinkCall::Edit {
            message,
            text: text.into(),
        });
        Ok(())
    }
}

// ── Wiring ───────────────────────────────────────────────────

pub struct Harness {
    pub store: Arc<FakeStore>,
    pub sink: Arc<FakeSink>,
    pub fetcher: Arc<FakeFetcher>,
    pub routes: Arc<ChannelRoutes>,
    staging_dir: tempfile::TempDir,
}

impl Harness {
    pub fn new(mappings: &[ChannelMapping], remote_directories: &[&str]) -> Self {
        Self {
            store: Arc::new(FakeStore::with_directories(remote_directories)),
            sink: Arc::new(FakeSink::default()),
            fetcher: Arc::new(FakeFetcher::default()),
            routes: Arc::new(ChannelRoutes::new(mappings)),
            staging_dir: tempfile::tempdir().unwrap(),
        }
    }

    pub fn staging(&self) -> StagingArea {
        StagingArea::new(self.staging_dir.path())
    }

    pub fn catalog(&self) -> DirectoryCatalog {
        DirectoryCatalog::new(self.store.clone(), self.routes.clone())
    }

    pub fn selection(&self) -> SelectionFlow {
        SelectionFlow::new(
            self.catalog(),
            self.store.clone(),
            self.fetcher.clone(),
            self.sink.clone(),
            self.staging(),
        )
    }

    pub fn channel_relay(&self) -> ChannelRelay {
        ChannelRelay::new(
            self.routes.clone(),
            self.store.clone(),
            self.fetcher.clone(),
            self.staging(),
        )
    }

    pub fn intake(&self, authorized: &[u64]) -> Intake {
        Intake::new(
            authorized.iter().copied(),
            self.routes.clone(),
            self.catalog(),
            Arc::new(self.selection()),
            self.channel_relay(),
            self.sink.clone(),
        )
    }

    /// Number of files currently in the staging directory.
    pub fn staged_files(&self) -> usize {
        std::fs::read_dir(self.staging_dir.path()).unwrap().count()
    }
}
