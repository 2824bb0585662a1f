//! Configuration validation.
//!
//! Checks a loaded [`DavdropConfig`] for missing credentials, malformed URLs
//! and inconsistent channel mappings before the bot starts.

use std::collections::HashSet;

use secrecy::ExposeSecret;

use crate::schema::DavdropConfig;

/// Severity level for a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Error,
    Warning,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Error => write!(f, "error"),
            Self::Warning => write!(f, "warning"),
        }
    }
}

/// A single validation diagnostic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub severity: Severity,
    /// Dotted path, e.g. "webdav.url"
    pub path: String,
    pub message: String,
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}: {}", self.severity, self.path, self.message)
    }
}

/// Result of validating a configuration.
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    pub diagnostics: Vec<Diagnostic>,
}

impl ValidationResult {
    /// Returns `true` if any diagnostic is an error.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|d| d.severity == Severity::Error)
    }

    fn push(&mut self, severity: Severity, path: impl Into<String>, message: impl Into<String>) {
        self.diagnostics.push(Diagnostic {
            severity,
            path: path.into(),
            message: message.into(),
        });
    }
}

/// Validate a fully resolved config (file plus environment overrides).
#[must_use]
pub fn validate(config: &DavdropConfig) -> ValidationResult {
    let mut result = ValidationResult::default();

    if config.telegram.token.expose_secret().trim().is_empty() {
        result.push(
            Severity::Error,
            "telegram.token",
            "bot token is required (set TELEGRAM_BOT_TOKEN)",
        );
    }
    if let Err(e) = url::Url::parse(&config.telegram.api_url) {
        result.push(
            Severity::Error,
            "telegram.api_url",
            format!("invalid URL: {e}"),
        );
    }

    if config.webdav.url.trim().is_empty() {
        result.push(
            Severity::Error,
            "webdav.url",
            "WebDAV URL is required (set WEBDAV_HOSTNAME)",
        );
    } else {
        match url::Url::parse(&config.webdav.url) {
            Ok(u) if !matches!(u.scheme(), "http" | "https") => result.push(
                Severity::Error,
                "webdav.url",
                format!("unsupported scheme '{}'", u.scheme()),
            ),
            Ok(_) => {},
            Err(e) => result.push(Severity::Error, "webdav.url", format!("invalid URL: {e}")),
        }
    }
    if config.webdav.username.trim().is_empty() {
        result.push(
            Severity::Error,
            "webdav.username",
            "WebDAV username is required (set WEBDAV_USERNAME)",
        );
    }
    if config.webdav.password.expose_secret().is_empty() {
        result.push(
            Severity::Error,
            "webdav.password",
            "WebDAV password is required (set WEBDAV_PASSWORD)",
        );
    }
    if config.webdav.timeout_secs == 0 {
        result.push(
            Severity::Error,
            "webdav.timeout_secs",
            "timeout must be greater than zero",
        );
    }

    let mut seen = HashSet::new();
    for (i, mapping) in config.channels.iter().enumerate() {
        let path = format!("channels[{i}]");
        if !seen.insert(mapping.chat_id) {
            result.push(
                Severity::Error,
                &path,
                format!("chat {} is mapped more than once", mapping.chat_id),
            );
        }
        let dir = mapping.directory.trim();
        if dir.is_empty() || dir == "/" {
            result.push(
                Severity::Error,
                format!("{path}.directory"),
                "directory must name a folder below the WebDAV root",
            );
        } else if !dir.starts_with('/') {
            result.push(
                Severity::Warning,
                format!("{path}.directory"),
                format!("'{dir}' is relative; it will be resolved against the WebDAV root"),
            );
        }
    }

    if config.telegram.authorized_users.is_empty() {
        result.push(
            Severity::Warning,
            "telegram.authorized_users",
            "no authorized users: direct uploads are disabled",
        );
        if config.channels.is_empty() {
            result.push(
                Severity::Warning,
                "channels",
                "no channel mappings either: the bot will not store anything",
            );
        }
    }

    result
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::schema::ChannelMapping,
        secrecy::Secret,
    };

    fn valid() -> DavdropConfig {
        let mut cfg = DavdropConfig::default();
        cfg.telegram.token = Secret::new("123:ABC".into());
        cfg.telegram.authorized_users = vec![1001];
        cfg.webdav.url = "https://dav.example.com/files".into();
        cfg.webdav.username = "me".into();
        cfg.webdav.password = Secret::new("hunter2".into());
        cfg.channels = vec![ChannelMapping {
            chat_id: -100555,
            directory: "/inbox".into(),
        }];
        cfg
    }

    fn paths(result: &ValidationResult, severity: Severity) -> Vec<String> {
        result
            .diagnostics
            .iter()
            .filter(|d| d.severity == severity)
            .map(|d| d.path.clone())
            .collect()
    }

    #[test]
    fn complete_config_has_no_diagnostics() {
        let result = validate(&valid());
        assert!(result.diagnostics.is_empty(), "{:?}", result.diagnostics);
    }

    #[test]
    fn default_config_reports_missing_credentials() {
        let result = validate(&DavdropConfig::default());
        assert!(result.has_errors());
        let errors = paths(&result, Severity::Error);
        for expected in [
            "telegram.token",
            "webdav.url",
            "webdav.username",
            "webdav.password",
        ] {
            assert!(errors.iter().any(|p| p == expected), "missing {expected}");
        }
    }

    #[test]
    fn non_http_webdav_url_is_rejected() {
        let mut cfg = valid();
        cfg.webdav.url = "ftp://dav.example.com".into();
        assert_eq!(paths(&validate(&cfg), Severity::Error), vec!["webdav.url"]);
    }

    #[test]
    fn duplicate_and_root_mappings_are_errors() {
        let mut cfg = valid();
        cfg.channels.push(ChannelMapping {
            chat_id: -100555,
            directory: "/".into(),
        });
        let errors = paths(&validate(&cfg), Severity::Error);
        assert_eq!(errors, vec!["channels[1]", "channels[1].directory"]);
    }

    #[test]
    fn relative_directory_is_a_warning() {
        let mut cfg = valid();
        cfg.channels[0].directory = "inbox".into();
        let result = validate(&cfg);
        assert!(!result.has_errors());
        assert_eq!(paths(&result, Severity::Warning), vec![
            "channels[0].directory"
        ]);
    }

    #[test]
    fn no_authorized_users_is_a_warning() {
        let mut cfg = valid();
        cfg.telegram.authorized_users.clear();
        let result = validate(&cfg);
        assert!(!result.has_errors());
        assert_eq!(paths(&result, Severity::Warning), vec![
            "telegram.authorized_users"
        ]);
    }
}
