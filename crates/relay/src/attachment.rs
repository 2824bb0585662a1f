//! Inbound media and the canonical attachment it normalizes to.

use std::fmt;

/// Media carried by an inbound message, as reported by the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundMedia {
    Document {
        source_id: String,
        file_name: Option<String>,
    },
    /// Resolution variants ordered from smallest to largest.
    Photo { variants: Vec<String> },
    Video {
        source_id: String,
        file_name: Option<String>,
    },
    Audio {
        source_id: String,
        file_name: Option<String>,
    },
    /// Anything else (stickers, voice notes, ...), named by its kind.
    Unsupported { kind: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttachmentKind {
    Document,
    Photo,
    Video,
    Audio,
}

impl AttachmentKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Document => "document",
            Self::Photo => "photo",
            Self::Video => "video",
            Self::Audio => "audio",
        }
    }
}

impl fmt::Display for AttachmentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A file ready to be downloaded and stored under `file_name`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub source_id: String,
    pub file_name: String,
    pub kind: AttachmentKind,
}

impl InboundMedia {
    /// Short label for logs and the unsupported error.
    #[must_use]
    pub fn kind_label(&self) -> &str {
        match self {
            Self::Document { .. } => "document",
            Self::Photo { .. } => "photo",
            Self::Video { .. } => "video",
            Self::Audio { .. } => "audio",
            Self::Unsupported { kind } => kind,
        }
    }

    /// Canonical attachment, or `None` when the media cannot be relayed.
    #[must_use]
    pub fn normalize(&self) -> Option<Attachment> {
        let (source_id, file_name, kind) = match self {
            Self::Document {
                source_id,
                file_name,
            } => (
                source_id,
                declared_or(file_name.as_deref(), || format!("document_{source_id}")),
                AttachmentKind::Document,
            ),
            // Photos never keep a declared name; the last variant is the largest.
            Self::Photo { variants } => {
                let source_id = variants.last()?;
                (
                    source_id,
                    format!("photo_{source_id}.jpg"),
                    AttachmentKind::Photo,
                )
            },
            Self::Video {
                source_id,
                file_name,
            } => (
                source_id,
                declared_or(file_name.as_deref(), || format!("video_{source_id}.mp4")),
                AttachmentKind::Video,
            ),
            Self::Audio {
                source_id,
                file_name,
            } => (
                source_id,
                declared_or(file_name.as_deref(), || format!("audio_{source_id}.mp3")),
                AttachmentKind::Audio,
            ),
            Self::Unsupported { .. } => return None,
        };

        Some(Attachment {
            source_id: source_id.clone(),
            file_name,
            kind,
        })
    }
}

/// Declared name with path separators neutralized, or the synthesized fallback
/// when nothing usable was declared. Whitespace is kept as sent.
fn declared_or(declared: Option<&str>, fallback: impl FnOnce() -> String) -> String {
    let name = declared.unwrap_or_default();
    if name.is_empty() || name == "." || name == ".." {
        return fallback();
    }
    name.replace(['/', '\\'], "_")
}
