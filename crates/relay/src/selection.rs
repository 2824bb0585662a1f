//! Interactive directory selection for authorized direct senders.
//!
//! One [`PendingSelection`] per sender moves through
//! `selecting → (awaiting new directory name) → terminated`. Every terminal
//! transition hands the selection to [`SelectionFlow::retire`], which deletes
//! its staging file. Events of one sender are serialized by a per-sender
//! async mutex, so a new attachment waits for the previous event and then
//! supersedes the pending selection.

use std::{sync::Arc, time::Duration};

use {
    dashmap::DashMap,
    davdrop_webdav::SharedRemoteStore,
    tokio::{
        sync::Mutex,
        time::{Instant, MissedTickBehavior},
    },
    tokio_util::sync::CancellationToken,
    tracing::{debug, error, info, warn},
};

use crate::{
    Error, Result,
    attachment::{Attachment, InboundMedia},
    catalog::DirectoryCatalog,
    replies,
    routes::remote_path,
    sink::{MessageRef, OptionButton, SharedAttachmentFetcher, SharedReplySink},
    staging::{StagedFile, StagingArea},
};

pub const DIRECTORY_PAYLOAD_PREFIX: &str = "dir:";
pub const NEW_DIRECTORY_PAYLOAD: &str = "new_dir";

/// Sender identity within one conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SenderKey {
    pub chat_id: i64,
    pub user_id: u64,
}

/// Decoded option payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Choice {
    Directory(String),
    NewDirectory,
    Unknown,
}

#[must_use]
pub fn parse_choice(payload: &str) -> Choice {
    if payload == NEW_DIRECTORY_PAYLOAD {
        return Choice::NewDirectory;
    }
    match payload.strip_prefix(DIRECTORY_PAYLOAD_PREFIX) {
        Some(directory) if !directory.is_empty() => Choice::Directory(directory.to_string()),
        _ => Choice::Unknown,
    }
}

/// Reject names that are empty, contain a path separator or are `.`/`..`.
pub fn validate_directory_name(name: &str) -> Result<()> {
    let reason = if name.is_empty() {
        "name is empty"
    } else if name.contains(['/', '\\']) {
        "name contains a path separator"
    } else if name == "." || name == ".." {
        "name is reserved"
    } else {
        return Ok(());
    };
    Err(Error::InvalidDirectoryName { reason })
}

/// Directory options two per row, then the "create new directory" option.
#[must_use]
pub fn option_rows(directories: &[String]) -> Vec<Vec<OptionButton>> {
    let mut rows: Vec<Vec<OptionButton>> = directories
        .chunks(2)
        .map(|pair| {
            pair.iter()
                .map(|dir| OptionButton::new(dir, format!("{DIRECTORY_PAYLOAD_PREFIX}{dir}")))
                .collect()
        })
        .collect();
    rows.push(vec![OptionButton::new(
        replies::NEW_DIRECTORY_LABEL,
        NEW_DIRECTORY_PAYLOAD,
    )]);
    rows
}

/// Result of feeding one event into the flow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    /// Options presented, waiting for a choice.
    AwaitingSelection,
    AwaitingDirectoryName,
    /// Name rejected; still waiting for a name.
    InvalidDirectoryName,
    Uploaded {
        remote_path: String,
    },
    UploadFailed,
    DirectoryCreationFailed,
    InvalidOption,
    Cancelled,
    Unsupported,
    StagingFailed,
    /// The options could not be delivered, so the file was dropped.
    PromptFailed,
    /// No selection matched the event.
    NoSelection,
    /// Text from a sender with nothing pending.
    Ignored,
}

#[derive(Debug)]
struct PendingSelection {
    attachment: Attachment,
    staged: StagedFile,
    awaiting_new_directory_name: bool,
    /// Message carrying the options.
    prompt: MessageRef,
    last_activity: Instant,
}

type Slot = Arc<Mutex<Option<PendingSelection>>>;

#[derive(Debug, Clone, Copy)]
enum ReplyTarget {
    Chat(i64),
    Edit(MessageRef),
}

/// Per-sender directory selection state machine.
pub struct SelectionFlow {
    pending: DashMap<SenderKey, Slot>,
    catalog: DirectoryCatalog,
    store: SharedRemoteStore,
    fetcher: SharedAttachmentFetcher,
    sink: SharedReplySink,
    staging: StagingArea,
}

impl SelectionFlow {
    pub fn new(
        catalog: DirectoryCatalog,
        store: SharedRemoteStore,
        fetcher: SharedAttachmentFetcher,
        sink: SharedReplySink,
        staging: StagingArea,
    ) -> Self {
        Self {
            pending: DashMap::new(),
            catalog,
            store,
            fetcher,
            sink,
            staging,
        }
    }

    /// Stage an attachment and present the directory options.
    pub async fn handle_attachment(&self, key: SenderKey, media: &InboundMedia) -> Transition {
        let Some(attachment) = media.normalize() else {
            let error = Error::unsupported(media.kind_label());
            info!(chat_id = key.chat_id, user_id = key.user_id, error = %error, "rejecting attachment");
            self.reply(ReplyTarget::Chat(key.chat_id), replies::UNSUPPORTED)
                .await;
            return Transition::Unsupported;
        };

        let slot = self.slot(key);
        let mut pending = slot.lock().await;

        if let Some(previous) = pending.take() {
            info!(
                chat_id = key.chat_id,
                user_id = key.user_id,
                file_name = %previous.attachment.file_name,
                "new attachment supersedes pending selection"
            );
            let prompt = previous.prompt;
            Self::retire(previous);
            self.reply(ReplyTarget::Edit(prompt), replies::SUPERSEDED)
                .await;
        }

        let staged = match self
            .staging
            .download(self.fetcher.as_ref(), &attachment)
            .await
        {
            Ok(staged) => staged,
            Err(e) => {
                error!(chat_id = key.chat_id, file_name = %attachment.file_name, error = %e, "failed to stage attachment");
                self.reply(ReplyTarget::Chat(key.chat_id), replies::STAGING_FAILED)
                    .await;
                return Transition::StagingFailed;
            },
        };

        let directories = self.catalog.list_available().await;
        let prompt = match self
            .sink
            .send_options(
                key.chat_id,
                &replies::choose_directory(&attachment.file_name),
                &option_rows(&directories),
            )
            .await
        {
            Ok(prompt) => prompt,
            Err(e) => {
                error!(chat_id = key.chat_id, error = %e, "failed to present directory options");
                staged.discard_logged();
                return Transition::PromptFailed;
            },
        };

        debug!(
            chat_id = key.chat_id,
            user_id = key.user_id,
            file_name = %attachment.file_name,
            options = directories.len(),
            "awaiting directory selection"
        );
        *pending = Some(PendingSelection {
            attachment,
            staged,
            awaiting_new_directory_name: false,
            prompt,
            last_activity: Instant::now(),
        });
        Transition::AwaitingSelection
    }

    /// Handle an option press on `message`.
    pub async fn handle_callback(
        &self,
        key: SenderKey,
        payload: &str,
        message: MessageRef,
    ) -> Transition {
        let slot = self.slot(key);
        let mut guard = slot.lock().await;

        let Some(mut pending) = guard.take_if(|p| p.prompt == message) else {
            debug!(chat_id = key.chat_id, payload, "option press without a matching selection");
            self.reply(ReplyTarget::Edit(message), replies::STALE_SELECTION)
                .await;
            return Transition::NoSelection;
        };

        match parse_choice(payload) {
            Choice::Directory(directory) => {
                self.upload(key, pending, &directory, ReplyTarget::Edit(message))
                    .await
            },
            Choice::NewDirectory => {
                pending.awaiting_new_directory_name = true;
                pending.last_activity = Instant::now();
                *guard = Some(pending);
                self.reply(ReplyTarget::Edit(message), replies::ASK_DIRECTORY_NAME)
                    .await;
                Transition::AwaitingDirectoryName
            },
            Choice::Unknown => {
                warn!(chat_id = key.chat_id, payload, "unknown option");
                Self::retire(pending);
                self.reply(ReplyTarget::Edit(message), replies::INVALID_OPTION)
                    .await;
                Transition::InvalidOption
            },
        }
    }

    /// Handle free text, which only means something as a new directory name.
    pub async fn handle_text(&self, key: SenderKey, text: &str) -> Transition {
        let Some(slot) = self.existing_slot(key) else {
            return Transition::Ignored;
        };
        let mut guard = slot.lock().await;
        let Some(mut pending) = guard.take() else {
            return Transition::Ignored;
        };
        let reply_to = ReplyTarget::Chat(key.chat_id);

        if !pending.awaiting_new_directory_name {
            info!(chat_id = key.chat_id, "text received while selecting a directory");
            Self::retire(pending);
            self.reply(reply_to, replies::INVALID_OPTION).await;
            return Transition::InvalidOption;
        }

        let name = text.trim();
        if let Err(e) = validate_directory_name(name) {
            info!(chat_id = key.chat_id, error = %e, "rejected directory name");
            pending.last_activity = Instant::now();
            *guard = Some(pending);
            self.reply(reply_to, replies::INVALID_DIRECTORY_NAME).await;
            return Transition::InvalidDirectoryName;
        }

        let directory = format!("/{name}");
        if let Err(e) = self.store.create_directory(&directory).await {
            error!(chat_id = key.chat_id, directory = %directory, error = %e, "failed to create directory");
            Self::retire(pending);
            self.reply(reply_to, &replies::directory_creation_failed(&e))
                .await;
            return Transition::DirectoryCreationFailed;
        }
        info!(chat_id = key.chat_id, user_id = key.user_id, directory = %directory, "created directory");

        self.upload(key, pending, &directory, reply_to).await
    }

    /// Drop the sender's pending selection, if any.
    pub async fn handle_cancel(&self, key: SenderKey) -> Transition {
        let slot = self.existing_slot(key);
        let pending = match slot {
            Some(slot) => slot.lock().await.take(),
            None => None,
        };

        match pending {
            Some(pending) => {
                info!(chat_id = key.chat_id, user_id = key.user_id, "selection cancelled");
                Self::retire(pending);
                self.reply(ReplyTarget::Chat(key.chat_id), replies::CANCELLED)
                    .await;
                Transition::Cancelled
            },
            None => {
                self.reply(ReplyTarget::Chat(key.chat_id), replies::NOTHING_TO_CANCEL)
                    .await;
                Transition::NoSelection
            },
        }
    }

    /// Whether `key` has a selection in progress.
    pub async fn has_pending(&self, key: SenderKey) -> bool {
        match self.existing_slot(key) {
            Some(slot) => slot.lock().await.is_some(),
            None => false,
        }
    }

    /// Retire selections idle for at least `max_idle`. Busy senders are skipped.
    ///
    /// Returns how many expired.
    pub async fn sweep_expired(&self, max_idle: Duration) -> usize {
        let mut expired = 0;
        for (key, slot) in self.slots() {
            let Ok(mut guard) = slot.try_lock() else {
                continue;
            };
            let Some(pending) = guard.take_if(|p| p.last_activity.elapsed() >= max_idle) else {
                continue;
            };
            info!(chat_id = key.chat_id, user_id = key.user_id, file_name = %pending.attachment.file_name, "selection expired");
            let target = if pending.awaiting_new_directory_name {
                ReplyTarget::Chat(key.chat_id)
            } else {
                ReplyTarget::Edit(pending.prompt)
            };
            Self::retire(pending);
            self.reply(target, replies::EXPIRED).await;
            expired += 1;
        }
        expired
    }

    /// Run [`Self::sweep_expired`] every `period` until cancelled.
    pub async fn run_sweeper(
        &self,
        max_idle: Duration,
        period: Duration,
        cancel: CancellationToken,
    ) {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                () = cancel.cancelled() => break,
                _ = ticker.tick() => {
                    let expired = self.sweep_expired(max_idle).await;
                    if expired > 0 {
                        info!(expired, "retired idle selections");
                    }
                },
            }
        }
        debug!("selection sweeper stopped");
    }

    /// Retire every idle selection at shutdown. Returns how many were dropped.
    pub fn retire_all(&self) -> usize {
        let mut retired = 0;
        for (_, slot) in self.slots() {
            if let Ok(mut guard) = slot.try_lock()
                && let Some(pending) = guard.take()
            {
                Self::retire(pending);
                retired += 1;
            }
        }
        retired
    }

    async fn upload(
        &self,
        key: SenderKey,
        pending: PendingSelection,
        directory: &str,
        reply_to: ReplyTarget,
    ) -> Transition {
        let file_name = pending.attachment.file_name.clone();
        let remote_path = remote_path(directory, &file_name);
        let result = self.store.upload(pending.staged.path(), &remote_path).await;
        Self::retire(pending);

        match result {
            Ok(()) => {
                info!(chat_id = key.chat_id, user_id = key.user_id, remote_path = %remote_path, "uploaded attachment");
                self.reply(reply_to, &replies::uploaded(&file_name, directory))
                    .await;
                Transition::Uploaded { remote_path }
            },
            Err(e) => {
                error!(chat_id = key.chat_id, remote_path = %remote_path, error = %e, "upload failed");
                self.reply(reply_to, &replies::upload_failed(&e)).await;
                Transition::UploadFailed
            },
        }
    }

    /// The single cleanup routine for every terminal transition.
    fn retire(pending: PendingSelection) {
        pending.staged.discard_logged();
    }

    async fn reply(&self, target: ReplyTarget, text: &str) {
        let result = match target {
            ReplyTarget::Chat(chat_id) => self.sink.send_text(chat_id, text).await,
            ReplyTarget::Edit(message) => self.sink.edit_text(message, text).await,
        };
        if let Err(e) = result {
            warn!(?target, error = %e, "failed to deliver reply");
        }
    }

    fn slot(&self, key: SenderKey) -> Slot {
        Arc::clone(&self.pending.entry(key).or_default())
    }

    fn existing_slot(&self, key: SenderKey) -> Option<Slot> {
        self.pending.get(&key).map(|slot| Arc::clone(&slot))
    }

    fn slots(&self) -> Vec<(SenderKey, Slot)> {
        self.pending
            .iter()
            .map(|entry| (*entry.key(), Arc::clone(entry.value())))
            .collect()
    }
}
