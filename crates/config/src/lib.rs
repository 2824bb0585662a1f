//! Configuration loading, env substitution, environment overrides and validation.
//!
//! Config files: `davdrop.toml`, `davdrop.yaml`, or `davdrop.json`
//! Searched in `./` then `~/.config/davdrop/`.
//!
//! Supports `${ENV_VAR}` substitution in all string values.

pub mod env_subst;
pub mod loader;
pub mod schema;
pub mod validate;

pub use {
    loader::{
        apply_env_overrides, config_dir, discover_and_load, load_config, parse_authorized_users,
        parse_channel_mappings,
    },
    schema::{ChannelMapping, DavdropConfig, StagingConfig, TelegramConfig, WebDavConfig},
    validate::{Diagnostic, Severity, ValidationResult, validate},
};
