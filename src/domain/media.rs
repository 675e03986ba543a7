//! Media classification and extension resolution.
//!
//! Pure and total: every well-formed message maps to exactly one kind and
//! one extension. Precedence photo > video > animation > voice > sticker >
//! document is enforced at the adapter mapper, which emits a single payload
//! variant per message.

use crate::domain::entities::{MediaPayload, Message};
use crate::domain::errors::DomainError;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// Closed set of media kinds a message can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaKind {
    Photo,
    Video,
    Animation,
    Voice,
    Sticker,
    Document,
    None,
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            MediaKind::Photo => "photo",
            MediaKind::Video => "video",
            MediaKind::Animation => "animation",
            MediaKind::Voice => "voice",
            MediaKind::Sticker => "sticker",
            MediaKind::Document => "document",
            MediaKind::None => "none",
        };
        f.write_str(s)
    }
}

impl FromStr for MediaKind {
    type Err = DomainError;

    /// Parse an allow-list entry. `gif` is accepted as an alias for
    /// animation.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "photo" => Ok(MediaKind::Photo),
            "video" => Ok(MediaKind::Video),
            "gif" | "animation" => Ok(MediaKind::Animation),
            "voice" => Ok(MediaKind::Voice),
            "sticker" => Ok(MediaKind::Sticker),
            "document" => Ok(MediaKind::Document),
            other => Err(DomainError::Config(format!(
                "unknown media type '{other}' (expected photo, video, gif, voice, sticker, document)"
            ))),
        }
    }
}

impl Message {
    /// Classify the attached media. A message without media yields
    /// [`MediaKind::None`].
    pub fn media_kind(&self) -> MediaKind {
        self.media.kind()
    }

    /// File extension for the attached media, dot included.
    pub fn extension(&self) -> String {
        self.media.extension()
    }
}

impl MediaPayload {
    pub fn kind(&self) -> MediaKind {
        match self {
            MediaPayload::Photo => MediaKind::Photo,
            MediaPayload::Video => MediaKind::Video,
            MediaPayload::Animation => MediaKind::Animation,
            MediaPayload::Voice => MediaKind::Voice,
            MediaPayload::Sticker => MediaKind::Sticker,
            MediaPayload::Document { .. } => MediaKind::Document,
            MediaPayload::None => MediaKind::None,
        }
    }

    /// Resolve a file extension. Documents try the declared filename first,
    /// then the declared MIME type, then fall back to `.bin`. Other kinds
    /// map to fixed extensions.
    pub fn extension(&self) -> String {
        match self {
            MediaPayload::Photo => ".jpg".into(),
            MediaPayload::Video => ".mp4".into(),
            MediaPayload::Animation => ".gif".into(),
            MediaPayload::Voice => ".ogg".into(),
            MediaPayload::Sticker => ".webp".into(),
            MediaPayload::Document {
                file_name,
                mime_type,
            } => file_name
                .as_deref()
                .and_then(declared_extension)
                .or_else(|| mime_type.as_deref().and_then(extension_from_mime))
                .unwrap_or_else(|| ".bin".into()),
            MediaPayload::None => ".bin".into(),
        }
    }
}

/// Extension from a declared filename, e.g. `report.final.pdf` → `.pdf`.
fn declared_extension(file_name: &str) -> Option<String> {
    Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| format!(".{e}"))
}

/// Extension guessed from a declared MIME type, e.g. `application/pdf` → `.pdf`.
fn extension_from_mime(mime: &str) -> Option<String> {
    mime_guess::get_mime_extensions_str(mime)
        .and_then(|exts| exts.first())
        .map(|e| format!(".{e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(file_name: Option<&str>, mime_type: Option<&str>) -> MediaPayload {
        MediaPayload::Document {
            file_name: file_name.map(String::from),
            mime_type: mime_type.map(String::from),
        }
    }

    #[test]
    fn fixed_extensions_for_non_documents() {
        assert_eq!(MediaPayload::Photo.extension(), ".jpg");
        assert_eq!(MediaPayload::Video.extension(), ".mp4");
        assert_eq!(MediaPayload::Animation.extension(), ".gif");
        assert_eq!(MediaPayload::Voice.extension(), ".ogg");
        assert_eq!(MediaPayload::Sticker.extension(), ".webp");
        assert_eq!(MediaPayload::None.extension(), ".bin");
    }

    #[test]
    fn document_prefers_declared_filename() {
        let payload = doc(Some("report.final.pdf"), Some("application/zip"));
        assert_eq!(payload.extension(), ".pdf");
    }

    #[test]
    fn document_falls_back_to_mime_type() {
        let payload = doc(None, Some("application/pdf"));
        assert_eq!(payload.extension(), ".pdf");
        let payload = doc(Some("noext"), Some("application/pdf"));
        assert_eq!(payload.extension(), ".pdf");
    }

    #[test]
    fn document_falls_back_to_bin() {
        assert_eq!(doc(None, None).extension(), ".bin");
        assert_eq!(doc(Some("noext"), Some("made/up")).extension(), ".bin");
    }

    #[test]
    fn classification_is_exhaustive() {
        assert_eq!(MediaPayload::Photo.kind(), MediaKind::Photo);
        assert_eq!(doc(None, None).kind(), MediaKind::Document);
        assert_eq!(MediaPayload::None.kind(), MediaKind::None);
    }

    #[test]
    fn allow_list_parsing() {
        assert_eq!("photo".parse::<MediaKind>().unwrap(), MediaKind::Photo);
        assert_eq!("GIF".parse::<MediaKind>().unwrap(), MediaKind::Animation);
        assert_eq!(
            "animation".parse::<MediaKind>().unwrap(),
            MediaKind::Animation
        );
        assert!("movie".parse::<MediaKind>().is_err());
    }
}
