use {
    anyhow::Result,
    async_trait::async_trait,
    davdrop_relay::{MessageRef, OptionButton, ReplySink},
    std::{future::Future, time::Duration},
    teloxide::{
        ApiError, RequestError,
        payloads::SendMessageSetters,
        prelude::*,
        types::{ChatId, InlineKeyboardButton, InlineKeyboardMarkup, MessageId},
    },
    tracing::{debug, warn},
};

/// Telegram rejects inline buttons whose callback data exceeds this many bytes.
pub const MAX_CALLBACK_DATA_LEN: usize = 64;

const TELEGRAM_RETRY_AFTER_MAX_RETRIES: usize = 4;

/// Reply sink backed by the Bot API. Replies are sent as plain text.
#[derive(Clone)]
pub struct TelegramReplySink {
    bot: Bot,
}

impl TelegramReplySink {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }
}

async fn run_with_retry<T, F, Fut>(
    chat_id: i64,
    operation: &'static str,
    mut request: F,
) -> std::result::Result<T, RequestError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = std::result::Result<T, RequestError>>,
{
    let mut retries = 0usize;

    loop {
        match request().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                let Some(wait) = retry_after_duration(&err) else {
                    return Err(err);
                };

                if retries >= TELEGRAM_RETRY_AFTER_MAX_RETRIES {
                    warn!(
                        chat_id,
                        operation,
                        retries,
                        retry_after_secs = wait.as_secs(),
                        "telegram rate limit persisted after retries"
                    );
                    return Err(err);
                }

                retries += 1;
                warn!(
                    chat_id,
                    operation,
                    retries,
                    retry_after_secs = wait.as_secs(),
                    "telegram rate limited, waiting before retry"
                );
                tokio::time::sleep(wait).await;
            },
        }
    }
}

fn retry_after_duration(error: &RequestError) -> Option<Duration> {
    match error {
        RequestError::RetryAfter(wait) => Some(wait.duration()),
        _ => None,
    }
}

fn is_message_not_modified_error(error: &RequestError) -> bool {
    matches!(error, RequestError::Api(ApiError::MessageNotModified))
}

/// Build an inline keyboard from option rows.
///
/// Buttons whose payload would be rejected by Telegram are dropped, and rows
/// left empty are removed.
pub fn inline_keyboard(rows: &[Vec<OptionButton>]) -> InlineKeyboardMarkup {
    let rows: Vec<Vec<InlineKeyboardButton>> = rows
        .iter()
        .map(|row| {
            row.iter()
                .filter(|button| {
                    let fits = button.payload.len() <= MAX_CALLBACK_DATA_LEN;
                    if !fits {
                        warn!(
                            label = %button.label,
                            payload_len = button.payload.len(),
                            "option payload exceeds callback data limit, dropping button"
                        );
                    }
                    fits
                })
                .map(|button| {
                    InlineKeyboardButton::callback(button.label.clone(), button.payload.clone())
                })
                .collect::<Vec<_>>()
        })
        .filter(|row| !row.is_empty())
        .collect();
    InlineKeyboardMarkup::new(rows)
}

#[async_trait]
impl ReplySink for TelegramReplySink {
    async fn send_text(&self, chat_id: i64, text: &str) -> Result<()> {
        run_with_retry(chat_id, "send_message", || {
            self.bot.send_message(ChatId(chat_id), text).send()
        })
        .await?;
        debug!(chat_id, "telegram reply sent");
        Ok(())
    }

    async fn send_options(
        &self,
        chat_id: i64,
        text: &str,
        rows: &[Vec<OptionButton>],
    ) -> Result<MessageRef> {
        let keyboard = inline_keyboard(rows);
        let sent = run_with_retry(chat_id, "send_options", || {
            self.bot
                .send_message(ChatId(chat_id), text)
                .reply_markup(keyboard.clone())
                .send()
        })
        .await?;
        debug!(chat_id, message_id = sent.id.0, "telegram options sent");
        Ok(MessageRef {
            chat_id: sent.chat.id.0,
            message_id: sent.id.0,
        })
    }

    async fn edit_text(&self, message: MessageRef, text: &str) -> Result<()> {
        let result = run_with_retry(message.chat_id, "edit_message_text", || {
            self.bot
                .edit_message_text(ChatId(message.chat_id), MessageId(message.message_id), text)
                .send()
        })
        .await;
        match result {
            Ok(_) => Ok(()),
            Err(e) if is_message_not_modified_error(&e) => {
                debug!(
                    chat_id = message.chat_id,
                    message_id = message.message_id,
                    "telegram message already up to date"
                );
                Ok(())
            },
            Err(e) => Err(e.into()),
        }
    }
}
