use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::code::Code;

/// Kinds whose delivery operation takes no caption.
pub const NO_CAPTION_KINDS: [ContentKind; 2] = [ContentKind::VideoNote, ContentKind::Sticker];

/// The kind of media a reference points at.
///
/// Selects the gateway delivery operation and whether a caption may be sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentKind {
    Document,
    Photo,
    Video,
    Audio,
    Voice,
    VideoNote,
    Animation,
    Sticker,
}

impl ContentKind {
    /// Every kind, in the order uploads are inspected.
    pub const ALL: [ContentKind; 8] = [
        ContentKind::Document,
        ContentKind::Photo,
        ContentKind::Video,
        ContentKind::Audio,
        ContentKind::Voice,
        ContentKind::VideoNote,
        ContentKind::Animation,
        ContentKind::Sticker,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ContentKind::Document => "document",
            ContentKind::Photo => "photo",
            ContentKind::Video => "video",
            ContentKind::Audio => "audio",
            ContentKind::Voice => "voice",
            ContentKind::VideoNote => "video_note",
            ContentKind::Animation => "animation",
            ContentKind::Sticker => "sticker",
        }
    }

    pub fn supports_caption(&self) -> bool {
        !NO_CAPTION_KINDS.contains(self)
    }

    /// Name shown to the operator when the upload carried none.
    pub fn default_display_name(&self) -> &'static str {
        match self {
            ContentKind::Document => "file",
            ContentKind::Photo => "photo.jpg",
            ContentKind::Video => "video.mp4",
            ContentKind::Audio => "audio.mp3",
            ContentKind::Voice => "voice.ogg",
            ContentKind::VideoNote => "circle.mp4",
            ContentKind::Animation => "animation.gif",
            ContentKind::Sticker => "sticker",
        }
    }
}

impl fmt::Display for ContentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error for kind strings read back from storage that this build does not know.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown content kind: {0}")]
pub struct UnknownKind(pub String);

impl FromStr for ContentKind {
    type Err = UnknownKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ContentKind::ALL
            .iter()
            .copied()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| UnknownKind(s.to_string()))
    }
}

/// What the operator uploaded, before a code is assigned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentDraft {
    pub kind: ContentKind,
    pub external_id: String,
    pub display_name: Option<String>,
    pub caption: Option<String>,
}

impl ContentDraft {
    pub fn new(kind: ContentKind, external_id: impl Into<String>) -> Self {
        Self {
            kind,
            external_id: external_id.into(),
            display_name: None,
            caption: None,
        }
    }

    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }

    pub fn with_caption(mut self, caption: impl Into<String>) -> Self {
        self.caption = Some(caption.into());
        self
    }

    /// Materialize the draft under `code` with a zero download count.
    pub fn into_reference(self, code: Code, created_at: DateTime<Utc>) -> ContentReference {
        let display_name = self
            .display_name
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| self.kind.default_display_name().to_string());
        ContentReference {
            code,
            kind: self.kind,
            external_id: self.external_id,
            display_name,
            caption: self.caption.filter(|c| !c.is_empty()),
            download_count: 0,
            created_at,
        }
    }
}

/// One stored item, addressed by its code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentReference {
    pub code: Code,
    pub kind: ContentKind,
    pub external_id: String,
    pub display_name: String,
    pub caption: Option<String>,
    pub download_count: u64,
    pub created_at: DateTime<Utc>,
}

impl ContentReference {
    /// Caption to hand to the gateway, dropped for kinds that cannot carry one.
    pub fn delivery_caption(&self) -> Option<&str> {
        if self.kind.supports_caption() {
            self.caption.as_deref()
        } else {
            None
        }
    }
}
