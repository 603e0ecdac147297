//! Message-content decoder (component B). Pure functions over a tagged
//! `ProtoMessage`, mirroring the way the wire protocol's `wa::Message` is a
//! struct of mutually-exclusive optional variants (see the Design Notes).

use wacore::proto_helpers::MessageExt;
use waproto::whatsapp as wa;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaKind {
    Image,
    Video,
    Audio,
    Sticker,
    Document,
}

impl MediaKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaKind::Image => "image",
            MediaKind::Video => "video",
            MediaKind::Audio => "audio",
            MediaKind::Sticker => "sticker",
            MediaKind::Document => "document",
        }
    }
}

#[derive(Debug, Clone)]
pub struct ReplyContext {
    pub quoted_raw_id: String,
}

#[derive(Debug, Clone)]
pub enum ProtoMessage {
    Text {
        body: String,
    },
    ExtendedText {
        body: String,
        context: Option<ReplyContext>,
    },
    Image {
        caption: Option<String>,
        mime: String,
    },
    Video {
        caption: Option<String>,
        mime: String,
    },
    Audio {
        mime: String,
        voice: bool,
    },
    Sticker {
        mime: String,
    },
    Document {
        caption: Option<String>,
        mime: String,
    },
    Reaction {
        target_raw_id: String,
        emoji: String,
    },
    Other,
}

const DEFAULT_MIME: &str = "application/octet-stream";

impl ProtoMessage {
    /// Flattens the wire protocol's struct-of-optionals message into this
    /// tagged form. Variant precedence mirrors `extract_body`'s cascade:
    /// the first populated sub-message wins.
    pub fn from_wire(msg: &wa::Message) -> Self {
        let base = msg.get_base_message();

        if let Some(reaction) = &base.reaction_message {
            return ProtoMessage::Reaction {
                target_raw_id: reaction
                    .key
                    .as_ref()
                    .and_then(|k| k.id.clone())
                    .unwrap_or_default(),
                emoji: reaction.text.clone().unwrap_or_default(),
            };
        }
        if let Some(img) = &base.image_message {
            return ProtoMessage::Image {
                caption: img.caption.clone().filter(|s| !s.is_empty()),
                mime: img.mimetype.clone().unwrap_or_else(|| DEFAULT_MIME.to_string()),
            };
        }
        if let Some(vid) = &base.video_message {
            return ProtoMessage::Video {
                caption: vid.caption.clone().filter(|s| !s.is_empty()),
                mime: vid.mimetype.clone().unwrap_or_else(|| DEFAULT_MIME.to_string()),
            };
        }
        if let Some(aud) = &base.audio_message {
            return ProtoMessage::Audio {
                mime: aud.mimetype.clone().unwrap_or_else(|| DEFAULT_MIME.to_string()),
                voice: aud.ptt.unwrap_or(false),
            };
        }
        if let Some(sticker) = &base.sticker_message {
            return ProtoMessage::Sticker {
                mime: sticker
                    .mimetype
                    .clone()
                    .unwrap_or_else(|| DEFAULT_MIME.to_string()),
            };
        }
        if let Some(doc) = &base.document_message {
            return ProtoMessage::Document {
                caption: doc.caption.clone().filter(|s| !s.is_empty()),
                mime: doc.mimetype.clone().unwrap_or_else(|| DEFAULT_MIME.to_string()),
            };
        }
        if let Some(ext) = &base.extended_text_message {
            return ProtoMessage::ExtendedText {
                body: ext.text.clone().unwrap_or_default(),
                context: ext.context_info.as_ref().and_then(|ctx| {
                    ctx.stanza_id.clone().map(|id| ReplyContext { quoted_raw_id: id })
                }),
            };
        }
        if let Some(text) = msg.text_content() {
            return ProtoMessage::Text {
                body: text.to_string(),
            };
        }

        ProtoMessage::Other
    }
}

/// First non-empty of { plain text, extended text, image/video/document
/// caption }, else empty string.
pub fn extract_body(msg: &ProtoMessage) -> String {
    match msg {
        ProtoMessage::Text { body } => body.clone(),
        ProtoMessage::ExtendedText { body, .. } => body.clone(),
        ProtoMessage::Image { caption, .. }
        | ProtoMessage::Video { caption, .. }
        | ProtoMessage::Document { caption, .. } => caption.clone().unwrap_or_default(),
        ProtoMessage::Audio { .. }
        | ProtoMessage::Sticker { .. }
        | ProtoMessage::Reaction { .. }
        | ProtoMessage::Other => String::new(),
    }
}

/// First matching of { image, video, audio, sticker, document }, else none.
pub fn detect_media_kind(msg: &ProtoMessage) -> Option<MediaKind> {
    match msg {
        ProtoMessage::Image { .. } => Some(MediaKind::Image),
        ProtoMessage::Video { .. } => Some(MediaKind::Video),
        ProtoMessage::Audio { .. } => Some(MediaKind::Audio),
        ProtoMessage::Sticker { .. } => Some(MediaKind::Sticker),
        ProtoMessage::Document { .. } => Some(MediaKind::Document),
        _ => None,
    }
}

/// MIME string from whichever media sub-variant is present, else the
/// generic octet-stream fallback.
pub fn detect_media_mime(msg: &ProtoMessage) -> String {
    match msg {
        ProtoMessage::Image { mime, .. }
        | ProtoMessage::Video { mime, .. }
        | ProtoMessage::Audio { mime, .. }
        | ProtoMessage::Sticker { mime, .. }
        | ProtoMessage::Document { mime, .. } => mime.clone(),
        _ => DEFAULT_MIME.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_body_passes_through() {
        let msg = ProtoMessage::Text {
            body: "hi".to_string(),
        };
        assert_eq!(extract_body(&msg), "hi");
        assert!(detect_media_kind(&msg).is_none());
        assert_eq!(detect_media_mime(&msg), DEFAULT_MIME);
    }

    #[test]
    fn extended_text_carries_reply_context() {
        let msg = ProtoMessage::ExtendedText {
            body: "re".to_string(),
            context: Some(ReplyContext {
                quoted_raw_id: "ABC".to_string(),
            }),
        };
        assert_eq!(extract_body(&msg), "re");
    }

    #[test]
    fn image_caption_becomes_body_and_kind_is_image() {
        let msg = ProtoMessage::Image {
            caption: Some("look".to_string()),
            mime: "image/jpeg".to_string(),
        };
        assert_eq!(extract_body(&msg), "look");
        assert_eq!(detect_media_kind(&msg), Some(MediaKind::Image));
        assert_eq!(detect_media_mime(&msg), "image/jpeg");
    }

    #[test]
    fn image_without_caption_has_empty_body() {
        let msg = ProtoMessage::Image {
            caption: None,
            mime: "image/png".to_string(),
        };
        assert_eq!(extract_body(&msg), "");
    }

    #[test]
    fn audio_has_no_body_but_has_media_kind() {
        let msg = ProtoMessage::Audio {
            mime: "audio/ogg".to_string(),
            voice: true,
        };
        assert_eq!(extract_body(&msg), "");
        assert_eq!(detect_media_kind(&msg), Some(MediaKind::Audio));
    }

    #[test]
    fn reaction_has_no_body_and_no_media_kind() {
        let msg = ProtoMessage::Reaction {
            target_raw_id: "XYZ".to_string(),
            emoji: "👍".to_string(),
        };
        assert_eq!(extract_body(&msg), "");
        assert!(detect_media_kind(&msg).is_none());
        assert_eq!(detect_media_mime(&msg), DEFAULT_MIME);
    }

    #[test]
    fn other_variant_is_fully_empty() {
        assert_eq!(extract_body(&ProtoMessage::Other), "");
        assert!(detect_media_kind(&ProtoMessage::Other).is_none());
    }
}
