//! Routing of inbound events by origin and authorization.

use std::{collections::HashSet, sync::Arc};

use tracing::{debug, error, warn};

use crate::{
    Error, Result,
    attachment::InboundMedia,
    catalog::DirectoryCatalog,
    channel::ChannelRelay,
    replies,
    routes::ChannelRoutes,
    selection::{SelectionFlow, SenderKey},
    sink::{MessageRef, SharedReplySink},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OriginKind {
    Private,
    Group,
    Channel,
}

/// Where an event came from and who sent it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Origin {
    pub chat_id: i64,
    pub kind: OriginKind,
    /// Absent for channel posts.
    pub sender_id: Option<u64>,
    pub sender_name: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Start,
    Help,
    List,
    Cancel,
}

impl Command {
    pub const ALL: [Self; 4] = [Self::Start, Self::Help, Self::List, Self::Cancel];

    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Help => "help",
            Self::List => "list",
            Self::Cancel => "cancel",
        }
    }

    #[must_use]
    pub fn description(self) -> &'static str {
        match self {
            Self::Start => "Start the bot",
            Self::Help => "Show usage and configured channels",
            Self::List => "List available directories",
            Self::Cancel => "Cancel the current upload",
        }
    }

    /// Parse a command name without the leading slash.
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|c| c.name().eq_ignore_ascii_case(name))
    }
}

/// Transport-independent inbound event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundEvent {
    Attachment {
        origin: Origin,
        media: InboundMedia,
    },
    Text {
        origin: Origin,
        text: String,
    },
    Command {
        origin: Origin,
        command: Command,
    },
    /// An option was pressed on `message`.
    Callback {
        origin: Origin,
        payload: String,
        message: MessageRef,
    },
}

/// Entry point for every inbound event.
pub struct Intake {
    authorized: HashSet<u64>,
    routes: Arc<ChannelRoutes>,
    catalog: DirectoryCatalog,
    selection: Arc<SelectionFlow>,
    channel: ChannelRelay,
    sink: SharedReplySink,
}

impl Intake {
    pub fn new(
        authorized: impl IntoIterator<Item = u64>,
        routes: Arc<ChannelRoutes>,
        catalog: DirectoryCatalog,
        selection: Arc<SelectionFlow>,
        channel: ChannelRelay,
        sink: SharedReplySink,
    ) -> Self {
        Self {
            authorized: authorized.into_iter().collect(),
            routes,
            catalog,
            selection,
            channel,
            sink,
        }
    }

    pub async fn handle(&self, event: InboundEvent) {
        match event {
            InboundEvent::Attachment { origin, media } => self.on_attachment(&origin, &media).await,
            InboundEvent::Text { origin, text } => self.on_text(&origin, &text).await,
            InboundEvent::Command { origin, command } => self.on_command(&origin, command).await,
            InboundEvent::Callback {
                origin,
                payload,
                message,
            } => self.on_callback(&origin, &payload, message).await,
        }
    }

    fn authorize(&self, origin: &Origin) -> Result<SenderKey> {
        match origin.sender_id {
            Some(user_id) if self.authorized.contains(&user_id) => Ok(SenderKey {
                chat_id: origin.chat_id,
                user_id,
            }),
            user_id => Err(Error::Unauthorized {
                chat_id: origin.chat_id,
                user_id,
            }),
        }
    }

    async fn on_attachment(&self, origin: &Origin, media: &InboundMedia) {
        if origin.kind != OriginKind::Private {
            match self.channel.relay(origin.chat_id, media).await {
                Ok(_) => {},
                Err(e @ Error::UnconfiguredOrigin { .. }) => {
                    warn!(chat_id = origin.chat_id, error = %e, "ignoring attachment from unconfigured chat");
                },
                Err(e) => error!(chat_id = origin.chat_id, error = %e, "channel relay failed"),
            }
            return;
        }

        match self.authorize(origin) {
            Ok(key) => {
                self.selection.handle_attachment(key, media).await;
            },
            Err(e) => {
                warn!(error = %e, "rejecting direct attachment");
                self.send(origin.chat_id, replies::NOT_AUTHORIZED).await;
            },
        }
    }

    async fn on_text(&self, origin: &Origin, text: &str) {
        if origin.kind != OriginKind::Private {
            return;
        }
        match self.authorize(origin) {
            Ok(key) => {
                self.selection.handle_text(key, text).await;
            },
            Err(e) => debug!(error = %e, "ignoring text"),
        }
    }

    async fn on_callback(&self, origin: &Origin, payload: &str, message: MessageRef) {
        match self.authorize(origin) {
            Ok(key) => {
                self.selection
                    .handle_callback(key, payload, message)
                    .await;
            },
            Err(e) => warn!(error = %e, payload, "ignoring option press"),
        }
    }

    async fn on_command(&self, origin: &Origin, command: Command) {
        debug!(chat_id = origin.chat_id, command = command.name(), "command");
        match command {
            Command::Start => {
                let authorized = self.authorize(origin).is_ok();
                let text = replies::start(origin.sender_name.as_deref(), authorized);
                self.send(origin.chat_id, &text).await;
            },
            Command::Help => {
                if self.require_authorized(origin, command).await.is_some() {
                    self.send(origin.chat_id, &replies::help(&self.routes))
                        .await;
                }
            },
            Command::List => {
                if self.require_authorized(origin, command).await.is_none() {
                    return;
                }
                let directories = self.catalog.list_available().await;
                let text = if directories.is_empty() {
                    replies::NO_DIRECTORIES.to_string()
                } else {
                    replies::directory_list(&directories)
                };
                self.send(origin.chat_id, &text).await;
            },
            Command::Cancel => {
                if let Some(key) = self.require_authorized(origin, command).await {
                    self.selection.handle_cancel(key).await;
                }
            },
        }
    }

    /// Sender key of an authorized sender; anyone else gets a rejection reply.
    async fn require_authorized(&self, origin: &Origin, command: Command) -> Option<SenderKey> {
        match self.authorize(origin) {
            Ok(key) => Some(key),
            Err(e) => {
                warn!(error = %e, command = command.name(), "rejecting command");
                self.send(origin.chat_id, replies::NOT_AUTHORIZED).await;
                None
            },
        }
    }

    async fn send(&self, chat_id: i64, text: &str) {
        if let Err(e) = self.sink.send_text(chat_id, text).await {
            warn!(chat_id, error = %e, "failed to send reply");
        }
    }
}
