use std::path::{Path, PathBuf};

use {
    anyhow::Context,
    secrecy::Secret,
    tracing::{debug, warn},
};

use crate::{
    env_subst::substitute_env,
    schema::{ChannelMapping, DavdropConfig},
};

/// Standard config file names, checked in order.
const CONFIG_FILENAMES: &[&str] = &[
    "davdrop.toml",
    "davdrop.yaml",
    "davdrop.yml",
    "davdrop.json",
];

/// Load config from the given path (any supported format).
pub fn load_config(path: &Path) -> anyhow::Result<DavdropConfig> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let raw = substitute_env(&raw);
    parse_config(&raw, path)
}

/// Discover and load config from standard locations.
///
/// Search order:
/// 1. `./davdrop.{toml,yaml,yml,json}` (working directory)
/// 2. `~/.config/davdrop/davdrop.{toml,yaml,yml,json}` (user-global)
///
/// Returns `DavdropConfig::default()` if no config file is found; the
/// environment overrides can still supply a complete configuration.
pub fn discover_and_load() -> DavdropConfig {
    if let Some(path) = find_config_file() {
        debug!(path = %path.display(), "loading config");
        match load_config(&path) {
            Ok(cfg) => return cfg,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to load config, using defaults");
            },
        }
    } else {
        debug!("no config file found, using defaults");
    }
    DavdropConfig::default()
}

/// Find the first config file in standard locations.
fn find_config_file() -> Option<PathBuf> {
    for name in CONFIG_FILENAMES {
        let p = PathBuf::from(name);
        if p.exists() {
            return Some(p);
        }
    }

    let config_dir = config_dir()?;
    CONFIG_FILENAMES
        .iter()
        .map(|name| config_dir.join(name))
        .find(|p| p.exists())
}

/// Returns the user-global config directory (`~/.config/davdrop/`).
pub fn config_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "davdrop").map(|d| d.config_dir().to_path_buf())
}

fn parse_config(raw: &str, path: &Path) -> anyhow::Result<DavdropConfig> {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("toml");

    match ext {
        "toml" => Ok(toml::from_str(raw)?),
        "yaml" | "yml" => Ok(serde_yaml::from_str(raw)?),
        "json" => Ok(serde_json::from_str(raw)?),
        _ => anyhow::bail!("unsupported config format: .{ext}"),
    }
}

/// Apply the deployment environment variables on top of a loaded config.
///
/// Recognised variables: `TELEGRAM_BOT_TOKEN`, `WEBDAV_HOSTNAME`,
/// `WEBDAV_USERNAME`, `WEBDAV_PASSWORD`, `CHANNEL_MAPPINGS`
/// (`id:dir,id:dir`), `AUTHORIZED_USERS` (`id,id`), `DAVDROP_STAGING_DIR`,
/// `DAVDROP_SELECTION_TIMEOUT_SECS`. Empty values are ignored.
pub fn apply_env_overrides(config: DavdropConfig) -> anyhow::Result<DavdropConfig> {
    apply_overrides_with(config, |name| std::env::var(name).ok())
}

fn apply_overrides_with(
    mut config: DavdropConfig,
    lookup: impl Fn(&str) -> Option<String>,
) -> anyhow::Result<DavdropConfig> {
    let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

    if let Some(token) = get("TELEGRAM_BOT_TOKEN") {
        config.telegram.token = Secret::new(token.trim().to_string());
    }
    if let Some(url) = get("WEBDAV_HOSTNAME") {
        config.webdav.url = url.trim().to_string();
    }
    if let Some(username) = get("WEBDAV_USERNAME") {
        config.webdav.username = username.trim().to_string();
    }
    if let Some(password) = get("WEBDAV_PASSWORD") {
        config.webdav.password = Secret::new(password);
    }
    if let Some(raw) = get("CHANNEL_MAPPINGS") {
        config.channels = parse_channel_mappings(&raw).context("invalid CHANNEL_MAPPINGS")?;
    }
    if let Some(raw) = get("AUTHORIZED_USERS") {
        config.telegram.authorized_users =
            parse_authorized_users(&raw).context("invalid AUTHORIZED_USERS")?;
    }
    if let Some(dir) = get("DAVDROP_STAGING_DIR") {
        config.staging.dir = Some(PathBuf::from(dir.trim()));
    }
    if let Some(secs) = get("DAVDROP_SELECTION_TIMEOUT_SECS") {
        config.staging.selection_timeout_secs = secs
            .trim()
            .parse()
            .context("invalid DAVDROP_SELECTION_TIMEOUT_SECS")?;
    }

    Ok(config)
}

/// Parse `CHAT_ID:DIRECTORY` pairs separated by commas.
///
/// Entries without a `:` are skipped; the directory may itself contain `:`.
pub fn parse_channel_mappings(raw: &str) -> anyhow::Result<Vec<ChannelMapping>> {
    let mut mappings = Vec::new();
    for entry in raw.split(',') {
        let Some((chat_id, directory)) = entry.split_once(':') else {
            continue;
        };
        let chat_id = chat_id
            .trim()
            .parse::<i64>()
            .with_context(|| format!("chat id '{}' is not an integer", chat_id.trim()))?;
        mappings.push(ChannelMapping {
            chat_id,
            directory: directory.trim().to_string(),
        });
    }
    Ok(mappings)
}

/// Parse comma-separated Telegram user IDs, ignoring blank entries.
pub fn parse_authorized_users(raw: &str) -> anyhow::Result<Vec<u64>> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<u64>()
                .with_context(|| format!("user id '{s}' is not an unsigned integer"))
        })
        .collect()
}
