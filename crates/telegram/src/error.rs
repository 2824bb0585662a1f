use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Telegram(#[from] teloxide::RequestError),

    /// Transport failure; the URL is stripped because it embeds the token.
    #[error(transparent)]
    Reqwest(#[from] reqwest::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("file download failed with HTTP {status}")]
    Download { status: u16 },

    #[error("invalid Telegram API URL '{url}': {message}")]
    InvalidApiUrl { url: String, message: String },
}

impl Error {
    #[must_use]
    pub fn invalid_api_url(url: impl Into<String>, message: impl std::fmt::Display) -> Self {
        Self::InvalidApiUrl {
            url: url.into(),
            message: message.to_string(),
        }
    }

    /// Wrap a reqwest error without the request URL.
    #[must_use]
    pub fn transport(error: reqwest::Error) -> Self {
        Self::Reqwest(error.without_url())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
