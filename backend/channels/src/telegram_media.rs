//! Telegram Media Handler
//!
//! Turns an inbound message carrying media into a [`ContentDraft`]. Only the
//! file id is kept; nothing is downloaded.

use teloxide::types::Message;

use linkdrop_core::{ContentDraft, ContentKind};

fn id(file_id: &str) -> String {
    file_id.to_owned()
}

/// The media this message carries, if any.
///
/// Animations are checked before documents because Telegram ships a GIF as
/// both. Photos keep their largest size.
pub fn draft_from_message(msg: &Message) -> Option<ContentDraft> {
    let (mut draft, file_name) = if let Some(animation) = msg.animation() {
        (
            ContentDraft::new(ContentKind::Animation, id(&animation.file.id)),
            animation.file_name.clone(),
        )
    } else if let Some(document) = msg.document() {
        (
            ContentDraft::new(ContentKind::Document, id(&document.file.id)),
            document.file_name.clone(),
        )
    } else if let Some(largest) = msg.photo().and_then(|sizes| sizes.last()) {
        (ContentDraft::new(ContentKind::Photo, id(&largest.file.id)), None)
    } else if let Some(video) = msg.video() {
        (
            ContentDraft::new(ContentKind::Video, id(&video.file.id)),
            video.file_name.clone(),
        )
    } else if let Some(audio) = msg.audio() {
        (
            ContentDraft::new(ContentKind::Audio, id(&audio.file.id)),
            audio.file_name.clone().or_else(|| audio.title.clone()),
        )
    } else if let Some(voice) = msg.voice() {
        (ContentDraft::new(ContentKind::Voice, id(&voice.file.id)), None)
    } else if let Some(note) = msg.video_note() {
        (ContentDraft::new(ContentKind::VideoNote, id(&note.file.id)), None)
    } else if let Some(sticker) = msg.sticker() {
        (ContentDraft::new(ContentKind::Sticker, id(&sticker.file.id)), None)
    } else {
        return None;
    };

    if let Some(name) = file_name {
        draft = draft.with_display_name(name);
    }
    if let Some(caption) = msg.caption() {
        draft = draft.with_caption(caption);
    }
    Some(draft)
}
