use std::{sync::Arc, time::Duration};

use {
    anyhow::{Context, Result},
    davdrop_config::{DavdropConfig, Severity, validate},
    davdrop_relay::{ChannelRelay, ChannelRoutes, DirectoryCatalog, Intake, SelectionFlow, StagingArea},
    davdrop_telegram::{TelegramFetcher, TelegramReplySink},
    tokio_util::sync::CancellationToken,
    tracing::{error, info, warn},
};

use crate::build_store;

/// How often idle selections are checked for expiry.
const SWEEP_PERIOD: Duration = Duration::from_secs(60);

pub async fn run(config: DavdropConfig) -> Result<()> {
    let result = validate(&config);
    for d in &result.diagnostics {
        match d.severity {
            Severity::Error => error!(path = %d.path, "{}", d.message),
            Severity::Warning => warn!(path = %d.path, "{}", d.message),
        }
    }
    if result.has_errors() {
        anyhow::bail!("configuration is invalid; run `davdrop check` for details");
    }

    let store = build_store(&config)?;
    let routes = Arc::new(ChannelRoutes::new(&config.channels));
    let catalog = || DirectoryCatalog::new(store.clone(), routes.clone());

    catalog()
        .ensure_configured()
        .await
        .context("failed to prepare mapped WebDAV directories")?;

    let staging = StagingArea::new(config.staging.resolved_dir());
    let removed = staging
        .prepare()
        .await
        .context("failed to prepare staging directory")?;
    info!(
        dir = %staging.root().display(),
        removed_leftovers = removed,
        "staging directory ready"
    );

    let bot = davdrop_telegram::build_bot(&config.telegram.token, &config.telegram.api_url)?;
    let sink = Arc::new(TelegramReplySink::new(bot.clone()));
    let fetcher = Arc::new(TelegramFetcher::new(bot.clone(), &config.telegram.api_url)?);

    let selection = Arc::new(SelectionFlow::new(
        catalog(),
        store.clone(),
        fetcher.clone(),
        sink.clone(),
        staging.clone(),
    ));
    let channel = ChannelRelay::new(routes.clone(), store.clone(), fetcher, staging);
    let intake = Arc::new(Intake::new(
        config.telegram.authorized_users.iter().copied(),
        routes.clone(),
        catalog(),
        Arc::clone(&selection),
        channel,
        sink,
    ));

    if config.telegram.authorized_users.is_empty() {
        warn!("no authorized users configured; only channel uploads will be relayed");
    }
    info!(
        channels = routes.len(),
        authorized_users = config.telegram.authorized_users.len(),
        webdav = %store.base_url(),
        "davdrop configured"
    );

    let cancel = CancellationToken::new();

    let sweeper = (config.staging.selection_timeout_secs > 0).then(|| {
        let selection = Arc::clone(&selection);
        let max_idle = Duration::from_secs(config.staging.selection_timeout_secs);
        let cancel = cancel.clone();
        tokio::spawn(async move {
            selection.run_sweeper(max_idle, SWEEP_PERIOD, cancel).await;
        })
    });

    let poller = davdrop_telegram::start_polling(bot, intake, cancel.clone()).await?;

    tokio::select! {
        signal = tokio::signal::ctrl_c() => {
            signal.context("failed to listen for shutdown signal")?;
            info!("shutdown requested");
        },
        () = cancel.cancelled() => {
            warn!("polling stopped, shutting down");
        },
    }
    cancel.cancel();

    if let Err(e) = poller.await {
        warn!(error = %e, "polling task ended abnormally");
    }
    if let Some(sweeper) = sweeper
        && let Err(e) = sweeper.await
    {
        warn!(error = %e, "selection sweeper ended abnormally");
    }

    let retired = selection.retire_all();
    info!(retired, "davdrop stopped");
    Ok(())
}
