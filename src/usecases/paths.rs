//! Destination folder and filename policy.
//!
//! Captions become folder names for albums; collisions between unrelated
//! albums with the same caption get a numeric suffix. Folder creation is
//! recursive and idempotent.

use crate::domain::{DomainError, Message};
use crate::shared::config::StructureMode;
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use tokio::fs;

/// Placeholder when a caption sanitizes down to nothing.
const EMPTY_CAPTION: &str = "untitled";

/// Folder name for albums without a caption.
const NO_CAPTION_DIR: &str = "NC";

/// Max length of a caption-derived file or folder name.
const MAX_NAME_LEN: usize = 50;

/// Strip a caption down to a safe file/folder name: trim, newlines to
/// spaces, periods to underscores, path-illegal characters removed,
/// truncated to 50 characters.
pub fn sanitize_caption(caption: &str) -> String {
    let cleaned: String = caption
        .trim()
        .chars()
        .map(|c| match c {
            '\n' | '\r' => ' ',
            '.' => '_',
            other => other,
        })
        .filter(|c| !matches!(c, '\\' | '/' | '*' | '?' | ':' | '"' | '<' | '>' | '|'))
        .collect();
    let capped: String = cleaned.trim().chars().take(MAX_NAME_LEN).collect();
    if capped.is_empty() {
        EMPTY_CAPTION.to_string()
    } else {
        capped
    }
}

/// Computes destination folders and filenames for one run.
pub struct PathResolver {
    base_dir: PathBuf,
    structure: StructureMode,
}

impl PathResolver {
    pub fn new(base_dir: impl Into<PathBuf>, structure: StructureMode) -> Self {
        Self {
            base_dir: base_dir.into(),
            structure,
        }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// `YYYY-MM` bucket from the message timestamp.
    fn month_bucket(msg: &Message) -> String {
        DateTime::<Utc>::from_timestamp(msg.date, 0)
            .map(|dt| dt.format("%Y-%m").to_string())
            .unwrap_or_else(|| "unknown".to_string())
    }

    /// Destination folder for a message, created (recursively, idempotent)
    /// before returning. Caption-named album folders that already exist get
    /// an incrementing numeric suffix so two unrelated albums never merge.
    pub async fn resolve_folder(
        &self,
        msg: &Message,
        caption: &str,
        grouped: bool,
    ) -> Result<PathBuf, DomainError> {
        let folder = match self.structure {
            StructureMode::Flat => {
                if grouped {
                    if caption.is_empty() {
                        self.base_dir.join(NO_CAPTION_DIR)
                    } else {
                        unique_folder(self.base_dir.join(sanitize_caption(caption))).await
                    }
                } else {
                    self.base_dir.clone()
                }
            }
            StructureMode::Monthly => {
                let bucket = Self::month_bucket(msg);
                if grouped {
                    if caption.is_empty() {
                        self.base_dir.join(&bucket).join(NO_CAPTION_DIR)
                    } else {
                        unique_folder(
                            self.base_dir
                                .join(&bucket)
                                .join("captions")
                                .join(sanitize_caption(caption)),
                        )
                        .await
                    }
                } else {
                    self.base_dir.join(&bucket).join("individual")
                }
            }
        };
        fs::create_dir_all(&folder)
            .await
            .map_err(|e| DomainError::Storage(format!("create folder {}: {}", folder.display(), e)))?;
        Ok(folder)
    }

    /// Filename for a message. Flat-mode individual items keep the caption
    /// in the name so the output root stays scannable; everything else is
    /// id + extension (album captions live in the folder name).
    pub fn resolve_filename(
        &self,
        msg: &Message,
        caption: &str,
        ext: &str,
        grouped: bool,
    ) -> String {
        if self.structure == StructureMode::Flat && !grouped && !caption.is_empty() {
            format!("{}_{}{}", sanitize_caption(caption), msg.id, ext)
        } else {
            format!("{}{}", msg.id, ext)
        }
    }
}

/// First free variant of `candidate`: the path itself, then `_1`, `_2`, …
async fn unique_folder(candidate: PathBuf) -> PathBuf {
    if !exists(&candidate).await {
        return candidate;
    }
    let base = candidate.as_os_str().to_string_lossy().into_owned();
    let mut i = 1;
    loop {
        let variant = PathBuf::from(format!("{}_{}", base, i));
        if !exists(&variant).await {
            return variant;
        }
        i += 1;
    }
}

async fn exists(path: &Path) -> bool {
    fs::try_exists(path).await.unwrap_or(false)
}
