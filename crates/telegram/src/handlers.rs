//! Translation of Telegram updates into relay events.

use {
    davdrop_relay::{Command, InboundEvent, InboundMedia, Intake, MessageRef, Origin, OriginKind},
    teloxide::{
        prelude::*,
        types::{CallbackQuery, Chat, ChatKind, MediaKind, MessageKind, PublicChatKind},
    },
    tracing::{debug, warn},
};

fn origin_kind(chat: &Chat) -> OriginKind {
    match chat.kind {
        ChatKind::Private(_) => OriginKind::Private,
        ChatKind::Public(ref p) => match p.kind {
            PublicChatKind::Channel(_) => OriginKind::Channel,
            _ => OriginKind::Group,
        },
    }
}

/// Chat and sender of a message. Channel posts carry no sender.
pub fn origin_of(msg: &Message) -> Origin {
    Origin {
        chat_id: msg.chat.id.0,
        kind: origin_kind(&msg.chat),
        sender_id: msg.from.as_ref().map(|u| u.id.0),
        sender_name: msg.from.as_ref().map(|u| u.first_name.clone()),
    }
}

/// Describe a non-relayable media kind for logs and rejections.
fn describe_media_kind(media: &MediaKind) -> &'static str {
    match media {
        MediaKind::Animation(_) => "animation",
        MediaKind::Contact(_) => "contact",
        MediaKind::Game(_) => "game",
        MediaKind::Location(_) => "location",
        MediaKind::Poll(_) => "poll",
        MediaKind::Sticker(_) => "sticker",
        MediaKind::Venue(_) => "venue",
        MediaKind::VideoNote(_) => "video note",
        MediaKind::Voice(_) => "voice",
        _ => "unknown media",
    }
}

/// Extract the attachment carried by a message, if any.
///
/// Plain text yields `None`; media the relay cannot store yields
/// [`InboundMedia::Unsupported`].
pub fn extract_media(msg: &Message) -> Option<InboundMedia> {
    let MessageKind::Common(common) = &msg.kind else {
        return None;
    };
    let media = match &common.media_kind {
        MediaKind::Text(_) => return None,
        MediaKind::Document(d) => InboundMedia::Document {
            source_id: d.document.file.id.clone(),
            file_name: d.document.file_name.clone(),
        },
        // Sizes arrive smallest first.
        MediaKind::Photo(p) => InboundMedia::Photo {
            variants: p.photo.iter().map(|ps| ps.file.id.clone()).collect(),
        },
        MediaKind::Video(v) => InboundMedia::Video {
            source_id: v.video.file.id.clone(),
            file_name: v.video.file_name.clone(),
        },
        MediaKind::Audio(a) => InboundMedia::Audio {
            source_id: a.audio.file.id.clone(),
            file_name: a.audio.file_name.clone(),
        },
        other => InboundMedia::Unsupported {
            kind: describe_media_kind(other).to_string(),
        },
    };
    Some(media)
}

fn extract_text(msg: &Message) -> Option<&str> {
    match &msg.kind {
        MessageKind::Common(common) => match &common.media_kind {
            MediaKind::Text(t) => Some(t.text.as_str()),
            _ => None,
        },
        _ => None,
    }
}

/// Parse `/name`, `/name args` or `/name@bot`.
///
/// Commands addressed to another bot and unknown names yield `None`.
pub fn parse_command(text: &str, bot_username: Option<&str>) -> Option<Command> {
    let word = text.strip_prefix('/')?.split_whitespace().next()?;
    let (name, target) = match word.split_once('@') {
        Some((name, target)) => (name, Some(target)),
        None => (word, None),
    };
    if let (Some(target), Some(me)) = (target, bot_username)
        && !target.eq_ignore_ascii_case(me)
    {
        return None;
    }
    Command::parse(name)
}

/// Map a message to a relay event. Service messages and unknown commands
/// yield `None`.
pub fn message_event(msg: &Message, bot_username: Option<&str>) -> Option<InboundEvent> {
    let origin = origin_of(msg);
    if let Some(media) = extract_media(msg) {
        return Some(InboundEvent::Attachment { origin, media });
    }

    let text = extract_text(msg)?;
    if text.starts_with('/') {
        return match parse_command(text, bot_username) {
            Some(command) => Some(InboundEvent::Command { origin, command }),
            None => {
                debug!(chat_id = origin.chat_id, "ignoring unknown command");
                None
            },
        };
    }
    Some(InboundEvent::Text {
        origin,
        text: text.to_string(),
    })
}

/// Map an option press to a relay event. Presses without data or without
/// their originating message yield `None`.
pub fn callback_event(query: &CallbackQuery) -> Option<InboundEvent> {
    let payload = query.data.clone()?;
    let message = query.message.as_ref()?;
    let chat = message.chat();
    Some(InboundEvent::Callback {
        origin: Origin {
            chat_id: chat.id.0,
            kind: origin_kind(chat),
            sender_id: Some(query.from.id.0),
            sender_name: Some(query.from.first_name.clone()),
        },
        payload,
        message: MessageRef {
            chat_id: chat.id.0,
            message_id: message.id().0,
        },
    })
}

pub async fn handle_message(msg: Message, intake: &Intake, bot_username: Option<&str>) {
    match message_event(&msg, bot_username) {
        Some(event) => intake.handle(event).await,
        None => debug!(
            chat_id = msg.chat.id.0,
            message_id = msg.id.0,
            "ignoring message without relayable content"
        ),
    }
}

/// Acknowledge the press first so the client stops its spinner, then route it.
pub async fn handle_callback_query(query: CallbackQuery, bot: &Bot, intake: &Intake) {
    if let Err(e) = bot.answer_callback_query(&query.id).await {
        warn!(error = %e, "failed to answer callback query");
    }
    match callback_event(&query) {
        Some(event) => intake.handle(event).await,
        None => debug!(callback_id = %query.id, "ignoring callback without data or message"),
    }
}
