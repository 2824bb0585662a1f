use std::{sync::Arc, time::Duration};

use {
    davdrop_relay::{Command, Intake},
    secrecy::{ExposeSecret, Secret},
    teloxide::{
        ApiError, RequestError,
        prelude::*,
        types::{AllowedUpdate, BotCommand, UpdateKind},
    },
    tokio::task::JoinHandle,
    tokio_util::sync::CancellationToken,
    tracing::{debug, info, warn},
};

use crate::{
    error::{Error, Result},
    handlers,
};

/// Long-poll window requested from `getUpdates`.
const POLL_TIMEOUT_SECS: u32 = 30;
const POLL_RETRY_DELAY: Duration = Duration::from_secs(5);

/// Build a bot client for `api_url`.
///
/// The client timeout is longer than the long-polling window so requests are
/// not aborted before Telegram responds.
pub fn build_bot(token: &Secret<String>, api_url: &str) -> Result<Bot> {
    let client = teloxide::net::default_reqwest_settings()
        .timeout(Duration::from_secs(45))
        .build()
        .map_err(Error::transport)?;
    let api_url = reqwest::Url::parse(api_url).map_err(|e| Error::invalid_api_url(api_url, e))?;
    Ok(Bot::with_client(token.expose_secret(), client).set_api_url(api_url))
}

fn bot_commands() -> Vec<BotCommand> {
    Command::ALL
        .into_iter()
        .map(|c| BotCommand::new(c.name(), c.description()))
        .collect()
}

/// Verify credentials and start the update loop.
///
/// Each update is handled on its own task. The loop ends when `cancel` fires
/// or when another instance starts polling with the same token, in which case
/// `cancel` is triggered as well.
pub async fn start_polling(
    bot: Bot,
    intake: Arc<Intake>,
    cancel: CancellationToken,
) -> anyhow::Result<JoinHandle<()>> {
    let me = bot.get_me().await?;
    let bot_username: Option<Arc<str>> = me.username.as_deref().map(Arc::from);

    // Long polling does not work while a webhook is set.
    bot.delete_webhook().send().await?;

    if let Err(e) = bot.set_my_commands(bot_commands()).await {
        warn!("failed to register bot commands: {e}");
    }

    info!(username = ?bot_username, "telegram bot connected (webhook cleared)");

    let handle = tokio::spawn(async move {
        info!("starting telegram polling loop");
        let mut offset: i32 = 0;

        loop {
            let request = bot
                .get_updates()
                .offset(offset)
                .timeout(POLL_TIMEOUT_SECS)
                .allowed_updates(vec![
                    AllowedUpdate::Message,
                    AllowedUpdate::ChannelPost,
                    AllowedUpdate::CallbackQuery,
                ])
                .send();

            let result = tokio::select! {
                () = cancel.cancelled() => break,
                result = request => result,
            };

            match result {
                Ok(updates) => {
                    debug!(count = updates.len(), "got telegram updates");
                    for update in updates {
                        offset = update.id.as_offset();
                        dispatch(update.kind, &bot, &intake, bot_username.clone());
                    }
                },
                Err(e) => {
                    if matches!(&e, RequestError::Api(ApiError::TerminatedByOtherGetUpdates)) {
                        warn!(
                            "telegram polling stopped: another instance is already running with this token"
                        );
                        cancel.cancel();
                        break;
                    }

                    warn!(error = %e, "telegram getUpdates failed");
                    tokio::select! {
                        () = cancel.cancelled() => break,
                        () = tokio::time::sleep(POLL_RETRY_DELAY) => {},
                    }
                },
            }
        }
        info!("telegram polling stopped");
    });

    Ok(handle)
}

fn dispatch(kind: UpdateKind, bot: &Bot, intake: &Arc<Intake>, bot_username: Option<Arc<str>>) {
    let intake = Arc::clone(intake);
    match kind {
        UpdateKind::Message(msg) | UpdateKind::ChannelPost(msg) => {
            debug!(chat_id = msg.chat.id.0, "received telegram message");
            tokio::spawn(async move {
                handlers::handle_message(msg, &intake, bot_username.as_deref()).await;
            });
        },
        UpdateKind::CallbackQuery(query) => {
            debug!(callback_data = ?query.data, "received telegram callback query");
            let bot = bot.clone();
            tokio::spawn(async move {
                handlers::handle_callback_query(query, &bot, &intake).await;
            });
        },
        other => {
            debug!("ignoring unexpected update: {other:?}");
        },
    }
}
