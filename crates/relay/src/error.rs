/// Crate-wide result type for relay operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Failure kinds of the relay core.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Sender is not in the authorized set.
    #[error("sender {user_id:?} in chat {chat_id} is not authorized")]
    Unauthorized { chat_id: i64, user_id: Option<u64> },

    /// Attachment arrived on a chat without a directory mapping.
    #[error("chat {chat_id} has no directory mapping")]
    UnconfiguredOrigin { chat_id: i64 },

    /// Message carried no document, photo, video or audio.
    #[error("unsupported attachment: {kind}")]
    UnsupportedAttachment { kind: String },

    /// A requested new directory name was rejected.
    #[error("invalid directory name: {reason}")]
    InvalidDirectoryName { reason: &'static str },

    /// Listing, creation or upload on the remote store failed.
    #[error(transparent)]
    RemoteStore(#[from] davdrop_webdav::Error),

    /// Downloading the attachment bytes from the transport failed.
    #[error("download of {source_id} failed: {message}")]
    Fetch { source_id: String, message: String },

    /// Local staging file could not be created or removed.
    #[error("{context}: {source}")]
    Staging {
        context: &'static str,
        #[source]
        source: std::io::Error,
    },
}

impl Error {
    #[must_use]
    pub fn unsupported(kind: impl Into<String>) -> Self {
        Self::UnsupportedAttachment { kind: kind.into() }
    }

    #[must_use]
    pub fn fetch(source_id: impl Into<String>, error: &anyhow::Error) -> Self {
        Self::Fetch {
            source_id: source_id.into(),
            message: format!("{error:#}"),
        }
    }

    #[must_use]
    pub fn staging(context: &'static str, source: std::io::Error) -> Self {
        Self::Staging { context, source }
    }
}
