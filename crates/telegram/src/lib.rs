//! Telegram transport for davdrop.
//!
//! Polls the Bot API, turns updates into relay events, and implements the
//! relay's reply and download seams on top of teloxide.

pub mod bot;
pub mod error;
pub mod fetch;
pub mod handlers;
pub mod outbound;

#[cfg(test)]
mod mock_api;

pub use {
    bot::{build_bot, start_polling},
    error::{Error, Result},
    fetch::TelegramFetcher,
    outbound::TelegramReplySink,
};
