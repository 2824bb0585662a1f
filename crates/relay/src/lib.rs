//! File relay core: routes inbound attachments either straight into a mapped
//! remote directory or through an interactive directory selection.
//!
//! The chat transport and the remote store are injected through
//! [`ReplySink`], [`AttachmentFetcher`] and [`davdrop_webdav::RemoteStore`].

pub mod attachment;
pub mod catalog;
pub mod channel;
pub mod error;
pub mod intake;
pub mod replies;
pub mod routes;
pub mod selection;
pub mod sink;
pub mod staging;

#[cfg(test)]
mod test_support;

pub use {
    attachment::{Attachment, AttachmentKind, InboundMedia},
    catalog::DirectoryCatalog,
    channel::ChannelRelay,
    error::{Error, Result},
    intake::{Command, InboundEvent, Intake, Origin, OriginKind},
    routes::ChannelRoutes,
    selection::{SelectionFlow, SenderKey, Transition},
    sink::{
        AttachmentFetcher, MessageRef, OptionButton, ReplySink, SharedAttachmentFetcher,
        SharedReplySink,
    },
    staging::{StagedFile, StagingArea},
};
