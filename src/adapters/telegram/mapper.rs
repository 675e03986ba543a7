//! Map Grammers types to domain entities.
//!
//! Extracts text, album grouping and the media payload from
//! grammers_client tl types.

use crate::domain::{Chat, ChatType, MediaPayload, Message};
use grammers_client::peer::Peer;
use grammers_client::tl;

/// Map a grammers Peer to domain ChatType.
pub fn chat_type_from_peer(peer: &Peer) -> ChatType {
    match peer {
        Peer::User(_) => ChatType::User,
        Peer::Group(g) => {
            if g.is_megagroup() {
                ChatType::Supergroup
            } else {
                ChatType::Group
            }
        }
        Peer::Channel(_) => ChatType::Channel,
    }
}

/// Build a domain Chat from resolved dialog data.
pub fn dialog_to_chat(id: i64, title: &str, username: Option<&str>, kind: ChatType) -> Chat {
    Chat {
        id,
        title: title.to_string(),
        username: username.map(String::from),
        kind,
    }
}

/// Map a grammers Message to a domain Message. Service and empty messages
/// are dropped.
pub fn message_to_domain(msg: &tl::enums::Message, chat_id: i64) -> Option<Message> {
    match msg {
        tl::enums::Message::Empty(_) | tl::enums::Message::Service(_) => None,
        tl::enums::Message::Message(m) => Some(Message {
            id: m.id as i64,
            chat_id,
            date: m.date as i64,
            text: m.message.clone(),
            grouped_id: m.grouped_id,
            media: m
                .media
                .as_ref()
                .map(media_payload)
                .unwrap_or(MediaPayload::None),
        }),
    }
}

/// Collapse the TL media union into one payload variant. Precedence follows
/// the classifier: photo, then video, animation, voice, sticker, document.
fn media_payload(media: &tl::enums::MessageMedia) -> MediaPayload {
    match media {
        tl::enums::MessageMedia::Photo(_) => MediaPayload::Photo,
        tl::enums::MessageMedia::Document(d) => match d.document.as_ref() {
            Some(tl::enums::Document::Document(doc)) => document_payload(doc),
            _ => MediaPayload::Document {
                file_name: None,
                mime_type: None,
            },
        },
        // Contacts, polls, geo and the rest carry nothing downloadable.
        _ => MediaPayload::None,
    }
}

fn document_payload(doc: &tl::types::Document) -> MediaPayload {
    let mut has_video = false;
    let mut has_animated = false;
    let mut has_voice = false;
    let mut has_sticker = false;
    let mut file_name: Option<String> = None;

    for attr in &doc.attributes {
        match attr {
            tl::enums::DocumentAttribute::Video(_) => has_video = true,
            tl::enums::DocumentAttribute::Animated => has_animated = true,
            tl::enums::DocumentAttribute::Audio(a) => has_voice |= a.voice,
            tl::enums::DocumentAttribute::Sticker(_) => has_sticker = true,
            tl::enums::DocumentAttribute::Filename(f) => file_name = Some(f.file_name.clone()),
            _ => {}
        }
    }

    if has_video {
        MediaPayload::Video
    } else if has_animated {
        MediaPayload::Animation
    } else if has_voice {
        MediaPayload::Voice
    } else if has_sticker || doc.mime_type == "application/x-tgsticker" {
        MediaPayload::Sticker
    } else {
        MediaPayload::Document {
            file_name,
            mime_type: if doc.mime_type.is_empty() {
                None
            } else {
                Some(doc.mime_type.clone())
            },
        }
    }
}
