//! Application configuration. API credentials, paths, run options.

use crate::domain::{DomainError, MediaKind};
use chrono::NaiveDate;
use serde::Deserialize;
use std::str::FromStr;

/// Default number of simultaneous media transfers.
pub const DEFAULT_CONCURRENT_DOWNLOADS: usize = 6;

/// Output layout policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StructureMode {
    /// Everything directly under the output root; albums get per-caption
    /// subfolders.
    #[default]
    Flat,
    /// Bucketed under `YYYY-MM`, split into `captions/`, `NC` and
    /// `individual`.
    Monthly,
}

impl FromStr for StructureMode {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "flat" => Ok(StructureMode::Flat),
            "monthly" => Ok(StructureMode::Monthly),
            other => Err(DomainError::Config(format!(
                "unrecognized structure mode '{other}' (expected flat or monthly)"
            ))),
        }
    }
}

#[derive(Debug, Deserialize, Default)]
pub struct AppConfig {
    pub api_id: Option<i32>,
    pub api_hash: Option<String>,
    pub session_path: Option<String>,
    /// Output root for downloads and seen.json. Read from TG_MDL_OUTPUT_DIR.
    pub output_dir: Option<String>,

    /// Target chat id. When unset, an interactive picker is shown.
    #[serde(default)]
    pub chat_id: Option<i64>,

    /// Max messages to process this run.
    #[serde(default)]
    pub limit: Option<usize>,

    /// Inclusive date bounds, YYYY-MM-DD.
    #[serde(default)]
    pub min_date: Option<String>,
    #[serde(default)]
    pub max_date: Option<String>,

    /// Comma-separated allow-list for album members
    /// (photo,video,gif,voice,sticker,document).
    #[serde(default)]
    pub media_types: Option<String>,

    /// Process oldest messages first.
    #[serde(default)]
    pub reverse: Option<bool>,

    /// Save captions only; media transfers are skipped.
    #[serde(default)]
    pub caption_only: Option<bool>,

    /// Ignore seen history and reprocess everything.
    #[serde(default)]
    pub skip_seen: Option<bool>,

    /// Output layout: flat (default) or monthly.
    #[serde(default)]
    pub structure: Option<String>,

    /// Also save standalone text messages as text_<id>.txt.
    #[serde(default)]
    pub download_text: Option<bool>,

    /// Simultaneous downloads (default 6).
    #[serde(default)]
    pub concurrent: Option<usize>,
}

impl AppConfig {
    pub fn load() -> Result<Self, config::ConfigError> {
        dotenv::dotenv().ok();
        let mut c = config::Config::builder();
        c = c.add_source(config::Environment::with_prefix("TG_MDL").try_parsing(true));
        if let Ok(path) = std::env::var("TG_MDL_CONFIG") {
            c = c.add_source(config::File::with_name(&path));
        }
        c.build()?.try_deserialize()
    }

    pub fn output_dir_or_default(&self) -> String {
        self.output_dir
            .clone()
            .unwrap_or_else(|| "downloads".to_string())
    }

    pub fn concurrent_or_default(&self) -> usize {
        self.concurrent
            .filter(|n| *n > 0)
            .unwrap_or(DEFAULT_CONCURRENT_DOWNLOADS)
    }

    /// Build the validated options for one session. Unparseable dates, media
    /// types, or structure mode abort before any processing starts.
    pub fn run_config(&self, chat_id: i64) -> Result<RunConfig, DomainError> {
        let structure = match self.structure.as_deref() {
            Some(s) => s.parse()?,
            None => StructureMode::Flat,
        };
        let media_types = match self.media_types.as_deref() {
            Some(list) => list
                .split(',')
                .filter(|s| !s.trim().is_empty())
                .map(str::parse)
                .collect::<Result<Vec<MediaKind>, _>>()?,
            None => Vec::new(),
        };
        Ok(RunConfig {
            chat_id,
            limit: self.limit,
            min_date: parse_date(self.min_date.as_deref())?,
            max_date: parse_date(self.max_date.as_deref())?,
            media_types,
            reverse: self.reverse.unwrap_or(false),
            caption_only: self.caption_only.unwrap_or(false),
            skip_seen: self.skip_seen.unwrap_or(false),
            structure,
            download_text: self.download_text.unwrap_or(false),
        })
    }
}

fn parse_date(s: Option<&str>) -> Result<Option<NaiveDate>, DomainError> {
    match s {
        None => Ok(None),
        Some(raw) => NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
            .map(Some)
            .map_err(|e| DomainError::Config(format!("invalid date '{raw}': {e}"))),
    }
}

/// Validated options for one download session.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub chat_id: i64,
    pub limit: Option<usize>,
    pub min_date: Option<NaiveDate>,
    pub max_date: Option<NaiveDate>,
    /// Allow-list for album members. Empty = all kinds.
    pub media_types: Vec<MediaKind>,
    pub reverse: bool,
    pub caption_only: bool,
    pub skip_seen: bool,
    pub structure: StructureMode,
    pub download_text: bool,
}

impl RunConfig {
    pub fn allows(&self, kind: MediaKind) -> bool {
        self.media_types.is_empty() || self.media_types.contains(&kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn structure_mode_parses_known_values() {
        assert_eq!("flat".parse::<StructureMode>().unwrap(), StructureMode::Flat);
        assert_eq!(
            "Monthly".parse::<StructureMode>().unwrap(),
            StructureMode::Monthly
        );
    }

    #[test]
    fn structure_mode_rejects_unknown_value() {
        let err = "weekly".parse::<StructureMode>().unwrap_err();
        assert!(matches!(err, DomainError::Config(_)));
    }

    #[test]
    fn run_config_parses_media_types_and_dates() {
        let cfg = AppConfig {
            media_types: Some("photo, gif".to_string()),
            min_date: Some("2024-03-01".to_string()),
            ..AppConfig::default()
        };
        let run = cfg.run_config(42).unwrap();
        assert_eq!(run.media_types, vec![MediaKind::Photo, MediaKind::Animation]);
        assert_eq!(
            run.min_date,
            Some(NaiveDate::from_ymd_opt(2024, 3, 1).unwrap())
        );
        assert!(run.allows(MediaKind::Photo));
        assert!(!run.allows(MediaKind::Video));
    }

    #[test]
    fn run_config_rejects_bad_date() {
        let cfg = AppConfig {
            max_date: Some("03/15/2024".to_string()),
            ..AppConfig::default()
        };
        assert!(matches!(
            cfg.run_config(1),
            Err(DomainError::Config(_))
        ));
    }

    #[test]
    fn empty_allow_list_allows_everything() {
        let run = AppConfig::default().run_config(1).unwrap();
        assert!(run.allows(MediaKind::Sticker));
        assert!(run.allows(MediaKind::Document));
    }
}
