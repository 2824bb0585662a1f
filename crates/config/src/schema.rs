/// Config schema types (telegram, webdav, channel mappings, staging).
use std::path::PathBuf;

use {
    secrecy::{ExposeSecret, Secret},
    serde::{Deserialize, Serialize},
};

/// Default Telegram Bot API endpoint.
pub const DEFAULT_TELEGRAM_API_URL: &str = "https://api.telegram.org";

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DavdropConfig {
    pub telegram: TelegramConfig,
    pub webdav: WebDavConfig,
    /// Static chat → directory bindings for non-interactive relaying.
    pub channels: Vec<ChannelMapping>,
    pub staging: StagingConfig,
}

impl DavdropConfig {
    /// Directory bound to a chat, if the chat is mapped.
    #[must_use]
    pub fn channel_directory(&self, chat_id: i64) -> Option<&str> {
        self.channels
            .iter()
            .find(|m| m.chat_id == chat_id)
            .map(|m| m.directory.as_str())
    }
}

/// Telegram bot settings.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TelegramConfig {
    /// Bot token from @BotFather.
    #[serde(serialize_with = "serialize_secret")]
    pub token: Secret<String>,

    /// Telegram user IDs allowed to upload through direct messages.
    pub authorized_users: Vec<u64>,

    /// Bot API base URL (override for self-hosted Bot API servers).
    pub api_url: String,
}

impl std::fmt::Debug for TelegramConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramConfig")
            .field("token", &"[REDACTED]")
            .field("authorized_users", &self.authorized_users)
            .field("api_url", &self.api_url)
            .finish()
    }
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            token: Secret::new(String::new()),
            authorized_users: Vec::new(),
            api_url: DEFAULT_TELEGRAM_API_URL.into(),
        }
    }
}

/// WebDAV server settings.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WebDavConfig {
    /// Base URL of the WebDAV root that directories are created under.
    pub url: String,
    pub username: String,
    #[serde(serialize_with = "serialize_secret")]
    pub password: Secret<String>,
    /// Per-request timeout in seconds (uploads included).
    pub timeout_secs: u64,
}

impl std::fmt::Debug for WebDavConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebDavConfig")
            .field("url", &self.url)
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl Default for WebDavConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            username: String::new(),
            password: Secret::new(String::new()),
            timeout_secs: 120,
        }
    }
}

/// Binds a chat (usually a channel) to a fixed remote directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelMapping {
    pub chat_id: i64,
    pub directory: String,
}

/// Local staging of downloaded attachments.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StagingConfig {
    /// Directory for in-flight downloads. Defaults to `<tmp>/davdrop`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dir: Option<PathBuf>,

    /// Idle timeout for an open directory selection, in seconds. `0` disables.
    pub selection_timeout_secs: u64,
}

impl StagingConfig {
    /// Resolved staging directory.
    #[must_use]
    pub fn resolved_dir(&self) -> PathBuf {
        self.dir
            .clone()
            .unwrap_or_else(|| std::env::temp_dir().join("davdrop"))
    }
}

impl Default for StagingConfig {
    fn default() -> Self {
        Self {
            dir: None,
            selection_timeout_secs: 3600,
        }
    }
}

fn serialize_secret<S: serde::Serializer>(
    secret: &Secret<String>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(secret.expose_secret())
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let cfg = DavdropConfig::default();
        assert!(cfg.channels.is_empty());
        assert!(cfg.telegram.authorized_users.is_empty());
        assert_eq!(cfg.telegram.api_url, DEFAULT_TELEGRAM_API_URL);
        assert_eq!(cfg.webdav.timeout_secs, 120);
        assert_eq!(cfg.staging.selection_timeout_secs, 3600);
    }

    #[test]
    fn deserialize_from_toml() {
        let raw = r#"
            [telegram]
            token = "123:ABC"
            authorized_users = [1001, 1002]

            [webdav]
            url = "https://dav.example.com/files"
            username = "me"
            password = "hunter2"

            [[channels]]
            chat_id = -100555
            directory = "/inbox"
        "#;
        let cfg: DavdropConfig = toml::from_str(raw).unwrap();
        assert_eq!(cfg.telegram.token.expose_secret(), "123:ABC");
        assert_eq!(cfg.telegram.authorized_users, vec![1001, 1002]);
        assert_eq!(cfg.webdav.password.expose_secret(), "hunter2");
        assert_eq!(cfg.channel_directory(-100555), Some("/inbox"));
        assert_eq!(cfg.channel_directory(555), None);
        // defaults for unspecified fields
        assert_eq!(cfg.telegram.api_url, DEFAULT_TELEGRAM_API_URL);
        assert_eq!(cfg.webdav.timeout_secs, 120);
    }

    #[test]
    fn debug_redacts_secrets() {
        let mut cfg = DavdropConfig::default();
        cfg.telegram.token = Secret::new("123:SECRET".into());
        cfg.webdav.password = Secret::new("hunter2".into());
        let rendered = format!("{cfg:?}");
        assert!(!rendered.contains("SECRET"));
        assert!(!rendered.contains("hunter2"));
        assert!(rendered.contains("[REDACTED]"));
    }

    #[test]
    fn staging_dir_defaults_under_tmp() {
        let staging = StagingConfig::default();
        assert!(staging.resolved_dir().ends_with("davdrop"));

        let custom = StagingConfig {
            dir: Some(PathBuf::from("/var/tmp/drop")),
            ..Default::default()
        };
        assert_eq!(custom.resolved_dir(), PathBuf::from("/var/tmp/drop"));
    }
}
