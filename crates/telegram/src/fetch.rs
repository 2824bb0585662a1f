//! Downloads attachment bytes from Telegram's file endpoint.

use std::{path::Path, time::Duration};

use {
    async_trait::async_trait,
    davdrop_relay::AttachmentFetcher,
    teloxide::prelude::*,
    tokio::io::AsyncWriteExt,
    tracing::debug,
};

use crate::error::{Error, Result};

/// Generous upper bound for a single file transfer.
const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(300);

pub struct TelegramFetcher {
    bot: Bot,
    http: reqwest::Client,
    api_base: String,
}

impl TelegramFetcher {
    pub fn new(bot: Bot, api_url: &str) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(DOWNLOAD_TIMEOUT)
            .build()
            .map_err(Error::transport)?;
        Ok(Self {
            bot,
            http,
            api_base: api_url.trim_end_matches('/').to_string(),
        })
    }

    /// `{api}/file/bot{token}/{path}`; contains the token, never log it.
    fn download_url(&self, file_path: &str) -> String {
        format!(
            "{}/file/bot{}/{}",
            self.api_base,
            self.bot.token(),
            file_path.trim_start_matches('/')
        )
    }

    async fn download(&self, source_id: &str, destination: &Path) -> Result<u64> {
        let file = self.bot.get_file(source_id).await?;

        let mut response = self
            .http
            .get(self.download_url(&file.path))
            .send()
            .await
            .map_err(Error::transport)?;
        let status = response.status();
        if !status.is_success() {
            return Err(Error::Download {
                status: status.as_u16(),
            });
        }

        let mut out = tokio::fs::File::create(destination).await?;
        let mut written = 0u64;
        while let Some(chunk) = response.chunk().await.map_err(Error::transport)? {
            out.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        out.flush().await?;

        debug!(source_id, bytes = written, "downloaded telegram file");
        Ok(written)
    }
}

#[async_trait]
impl AttachmentFetcher for TelegramFetcher {
    async fn fetch(&self, source_id: &str, destination: &Path) -> anyhow::Result<u64> {
        Ok(self.download(source_id, destination).await?)
    }
}
