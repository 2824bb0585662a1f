mod check_commands;
mod run_commands;

use std::{path::PathBuf, sync::Arc, time::Duration};

use {
    clap::{Parser, Subcommand},
    davdrop_config::DavdropConfig,
    davdrop_webdav::WebDavClient,
    tracing::info,
    tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt},
};

#[derive(Parser)]
#[command(name = "davdrop", about = "davdrop: relay Telegram files into WebDAV")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Config file to load instead of searching the standard locations.
    #[arg(long, global = true, env = "DAVDROP_CONFIG")]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Output logs as JSON instead of human-readable.
    #[arg(long, global = true, default_value_t = false)]
    json_logs: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the bot (default when no subcommand is provided).
    Run,
    /// Validate the configuration and probe the WebDAV server.
    Check,
    /// Print the directories offered for selection.
    Dirs,
}

fn init_telemetry(cli: &Cli) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));

    let registry = tracing_subscriber::registry().with(filter);

    if cli.json_logs {
        registry
            .with(fmt::layer().json().with_target(true).with_thread_ids(false))
            .init();
    } else {
        registry
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_thread_ids(false)
                    .with_ansi(true),
            )
            .init();
    }
}

/// Load the config file (explicit or discovered) and apply env overrides.
fn load_config(path: Option<&PathBuf>) -> anyhow::Result<DavdropConfig> {
    let config = match path {
        Some(path) => davdrop_config::load_config(path)?,
        None => davdrop_config::discover_and_load(),
    };
    davdrop_config::apply_env_overrides(config)
}

fn build_store(config: &DavdropConfig) -> anyhow::Result<Arc<WebDavClient>> {
    let client = WebDavClient::new(
        &config.webdav.url,
        config.webdav.username.clone(),
        config.webdav.password.clone(),
        Duration::from_secs(config.webdav.timeout_secs),
    )?;
    Ok(Arc::new(client))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    init_telemetry(&cli);

    info!(version = env!("CARGO_PKG_VERSION"), "davdrop starting");

    let config = load_config(cli.config.as_ref())?;

    match cli.command {
        None | Some(Commands::Run) => run_commands::run(config).await,
        Some(Commands::Check) => check_commands::check(&config).await,
        Some(Commands::Dirs) => check_commands::dirs(&config).await,
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, clap::CommandFactory};

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn run_is_the_default_command() {
        let cli = Cli::try_parse_from(["davdrop"]).unwrap();
        assert!(cli.command.is_none());
        assert_eq!(cli.log_level, "info");
        assert!(!cli.json_logs);
    }

    #[test]
    fn global_flags_follow_subcommands() {
        let cli = Cli::try_parse_from([
            "davdrop",
            "check",
            "--config",
            "/etc/davdrop.toml",
            "--json-logs",
        ])
        .unwrap();
        assert!(matches!(cli.command, Some(Commands::Check)));
        assert_eq!(cli.config, Some(PathBuf::from("/etc/davdrop.toml")));
        assert!(cli.json_logs);
    }

    #[test]
    fn explicit_config_file_is_loaded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("davdrop.toml");
        std::fs::write(
            &path,
            r#"
[webdav]
url = "https://dav.example.com/files"
username = "me"
timeout_secs = 30

[[channels]]
chat_id = -100
directory = "/inbox"
"#,
        )
        .unwrap();

        let config = load_config(Some(&path)).unwrap();
        assert_eq!(config.webdav.timeout_secs, 30);
        assert_eq!(config.channel_directory(-100), Some("/inbox"));
    }

    #[test]
    fn missing_explicit_config_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_config(Some(&dir.path().join("absent.toml"))).is_err());
    }
}
