/// Crate-wide result type for remote store operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Typed WebDAV errors.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Transport-level failure (connect, TLS, timeout).
    #[error(transparent)]
    Http(#[from] reqwest::Error),

    /// Reading the local file for an upload failed.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// A WebDAV extension method could not be built.
    #[error(transparent)]
    InvalidMethod(#[from] http::method::InvalidMethod),

    /// The configured base URL or a derived resource URL is unusable.
    #[error("invalid WebDAV URL '{url}': {message}")]
    InvalidUrl { url: String, message: String },

    /// The server answered with a status the operation does not accept.
    #[error("{method} {path} failed with HTTP {status}")]
    UnexpectedStatus {
        method: &'static str,
        path: String,
        status: u16,
    },

    /// A `207 Multi-Status` body could not be interpreted.
    #[error("malformed multistatus response: {message}")]
    Malformed { message: String },
}

impl Error {
    #[must_use]
    pub fn invalid_url(url: impl Into<String>, message: impl std::fmt::Display) -> Self {
        Self::InvalidUrl {
            url: url.into(),
            message: message.to_string(),
        }
    }

    #[must_use]
    pub fn malformed(message: impl std::fmt::Display) -> Self {
        Self::Malformed {
            message: message.to_string(),
        }
    }

    /// HTTP status carried by the error, if the server answered at all.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::UnexpectedStatus { status, .. } => Some(*status),
            Self::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}
