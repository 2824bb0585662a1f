//! Unattended relay for attachments posted in mapped chats.

use std::sync::Arc;

use {
    davdrop_webdav::SharedRemoteStore,
    tracing::{debug, info},
};

use crate::{
    Error, Result,
    attachment::InboundMedia,
    routes::{ChannelRoutes, remote_path},
    sink::SharedAttachmentFetcher,
    staging::StagingArea,
};

/// Uploads channel attachments into their mapped directory without replying.
pub struct ChannelRelay {
    routes: Arc<ChannelRoutes>,
    store: SharedRemoteStore,
    fetcher: SharedAttachmentFetcher,
    staging: StagingArea,
}

impl ChannelRelay {
    pub fn new(
        routes: Arc<ChannelRoutes>,
        store: SharedRemoteStore,
        fetcher: SharedAttachmentFetcher,
        staging: StagingArea,
    ) -> Self {
        Self {
            routes,
            store,
            fetcher,
            staging,
        }
    }

    /// Relay one attachment from `chat_id`, returning the remote path.
    ///
    /// The staging file is deleted whether or not the upload succeeds.
    pub async fn relay(&self, chat_id: i64, media: &InboundMedia) -> Result<String> {
        let directory = self
            .routes
            .directory_for(chat_id)
            .ok_or(Error::UnconfiguredOrigin { chat_id })?;
        let attachment = media
            .normalize()
            .ok_or_else(|| Error::unsupported(media.kind_label()))?;

        let remote_path = remote_path(directory, &attachment.file_name);
        debug!(chat_id, remote_path = %remote_path, kind = %attachment.kind, "relaying channel attachment");

        let staged = self
            .staging
            .download(self.fetcher.as_ref(), &attachment)
            .await?;
        let result = self.store.upload(staged.path(), &remote_path).await;
        staged.discard_logged();
        result?;

        info!(chat_id, remote_path = %remote_path, "uploaded channel attachment");
        Ok(remote_path)
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::test_support::{Harness, document, mapping},
    };

    fn harness() -> Harness {
        Harness::new(&[mapping(-100, "/inbox")], &["/inbox"])
    }

    #[tokio::test]
    async fn uploads_into_mapped_directory() {
        let h = harness();

        let remote = h
            .channel_relay()
            .relay(-100, &InboundMedia::Video {
                source_id: "abc123".into(),
                file_name: None,
            })
            .await
            .unwrap();

        assert_eq!(remote, "/inbox/video_abc123.mp4");
        assert_eq!(h.store.uploads(), vec![(
            "/inbox/video_abc123.mp4".to_string(),
            b"bytes of abc123".to_vec()
        )]);
        assert_eq!(h.staged_files(), 0);
        assert!(h.sink.calls().is_empty());
    }

    #[tokio::test]
    async fn failed_upload_still_removes_staging_file() {
        let h = harness();
        h.store.fail_upload();

        let err = h
            .channel_relay()
            .relay(-100, &document("doc-1", "report.pdf"))
            .await
            .unwrap_err();

        assert!(matches!(err, Error::RemoteStore(_)));
        assert_eq!(h.staged_files(), 0);
    }

    #[tokio::test]
    async fn unmapped_chat_touches_nothing() {
        let h = harness();

        let err = h
            .channel_relay()
            .relay(555, &document("doc-2", "report.pdf"))
            .await
            .unwrap_err();

        assert!(matches!(err, Error::UnconfiguredOrigin { chat_id: 555 }));
        assert_eq!(h.store.calls(), 0);
        assert_eq!(h.staged_files(), 0);
    }

    #[tokio::test]
    async fn unsupported_media_is_rejected() {
        let h = harness();

        let err = h
            .channel_relay()
            .relay(-100, &InboundMedia::Unsupported {
                kind: "poll".into(),
            })
            .await
            .unwrap_err();

        assert!(matches!(err, Error::UnsupportedAttachment { .. }));
        assert_eq!(h.store.calls(), 0);
    }

    #[tokio::test]
    async fn failed_download_skips_upload() {
        let h = harness();
        h.fetcher.fail();

        let err = h
            .channel_relay()
            .relay(-100, &document("doc-3", "a.txt"))
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Fetch { .. }));
        assert_eq!(h.store.calls(), 0);
        assert_eq!(h.staged_files(), 0);
    }
}
