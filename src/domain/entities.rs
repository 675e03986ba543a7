//! Domain entities. Pure data structures for the core business.
//!
//! No Telegram/IO types here — these are mapped from adapters.

use serde::{Deserialize, Serialize};

/// Represents a Telegram chat (user, group, or channel).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chat {
    pub id: i64,
    pub title: String,
    pub username: Option<String>,
    pub kind: ChatType,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatType {
    User,
    Group,
    Supergroup,
    Channel,
}

/// A single message from a chat. Mapped once at the adapter boundary,
/// immutable afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: i64,
    pub chat_id: i64,
    /// Unix timestamp (seconds).
    pub date: i64,
    /// Message text or media caption. Empty when absent.
    pub text: String,
    /// Album id shared by all messages uploaded together.
    pub grouped_id: Option<i64>,
    pub media: MediaPayload,
}

impl Message {
    /// Caption text with surrounding whitespace removed.
    pub fn caption(&self) -> &str {
        self.text.trim()
    }

    pub fn is_grouped(&self) -> bool {
        self.grouped_id.is_some()
    }

    pub fn has_media(&self) -> bool {
        !matches!(self.media, MediaPayload::None)
    }

    /// Identifiers that mark this message as processed: its own id plus the
    /// album id when it belongs to one.
    pub fn seen_ids(&self) -> Vec<i64> {
        match self.grouped_id {
            Some(group_id) => vec![self.id, group_id],
            None => vec![self.id],
        }
    }
}

/// Outcome of a sign-in attempt.
#[derive(Debug)]
pub enum SignInResult {
    Success,
    PasswordRequired { hint: Option<String> },
}

/// Media attached to a message, as an exhaustive variant instead of a set of
/// optional probes. Exactly one variant per message; text-only and service
/// messages carry [`MediaPayload::None`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", tag = "kind")]
pub enum MediaPayload {
    Photo,
    Video,
    Animation,
    Voice,
    Sticker,
    Document {
        file_name: Option<String>,
        mime_type: Option<String>,
    },
    None,
}
