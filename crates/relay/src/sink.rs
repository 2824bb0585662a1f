//! Transport collaborators injected into the relay core.

use std::{path::Path, sync::Arc};

use async_trait::async_trait;

/// One clickable option presented to a sender.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptionButton {
    pub label: String,
    pub payload: String,
}

impl OptionButton {
    pub fn new(label: impl Into<String>, payload: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            payload: payload.into(),
        }
    }
}

/// Handle to a message previously sent by the sink, for in-place edits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MessageRef {
    pub chat_id: i64,
    pub message_id: i32,
}

/// Outbound replies.
#[async_trait]
pub trait ReplySink: Send + Sync {
    async fn send_text(&self, chat_id: i64, text: &str) -> anyhow::Result<()>;

    /// Send `text` with rows of options below it.
    async fn send_options(
        &self,
        chat_id: i64,
        text: &str,
        rows: &[Vec<OptionButton>],
    ) -> anyhow::Result<MessageRef>;

    /// Replace the text of a sent message, dropping its options.
    async fn edit_text(&self, message: MessageRef, text: &str) -> anyhow::Result<()>;
}

/// Downloads attachment bytes from the transport.
#[async_trait]
pub trait AttachmentFetcher: Send + Sync {
    /// Write the bytes behind `source_id` to `destination`, returning the size.
    async fn fetch(&self, source_id: &str, destination: &Path) -> anyhow::Result<u64>;
}

pub type SharedReplySink = Arc<dyn ReplySink>;
pub type SharedAttachmentFetcher = Arc<dyn AttachmentFetcher>;
