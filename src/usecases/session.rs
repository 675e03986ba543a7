//! Session driver: iterate the chat's history, filter, dispatch individual
//! vs album handling, and drive the downloader.
//!
//! - Date bounds and seen history filter before any transfer happens
//! - Albums are rebuilt around the first member encountered and downloaded
//!   as one batch (fan-out, join) before the stream advances
//! - Seen ids are persisted after every processed unit
//! - No single message or album failure aborts the run

use crate::domain::{DomainError, Message};
use crate::ports::{ChatGateway, SeenStorePort};
use crate::shared::config::RunConfig;
use crate::usecases::album::AlbumReconstructor;
use crate::usecases::downloader::MediaDownloader;
use crate::usecases::paths::PathResolver;
use chrono::{DateTime, Utc};
use indicatif::ProgressBar;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::fs;
use tracing::{error, info};

/// Messages fetched per history request.
const PAGE_SIZE: i32 = 100;

/// Result of one session run.
#[derive(Debug, Default)]
pub struct RunStats {
    pub processed: usize,
    pub downloaded: usize,
    pub text_saved: usize,
    pub skipped: usize,
    pub failed: usize,
}

/// Orchestrates one bulk-download session over a single chat.
pub struct SessionService {
    gateway: Arc<dyn ChatGateway>,
    seen: Arc<dyn SeenStorePort>,
    downloader: Arc<MediaDownloader>,
    albums: AlbumReconstructor,
    output_root: PathBuf,
}

impl SessionService {
    pub fn new(
        gateway: Arc<dyn ChatGateway>,
        seen: Arc<dyn SeenStorePort>,
        downloader: Arc<MediaDownloader>,
        albums: AlbumReconstructor,
        output_root: impl Into<PathBuf>,
    ) -> Self {
        Self {
            gateway,
            seen,
            downloader,
            albums,
            output_root: output_root.into(),
        }
    }

    /// Run the session: paginate the message stream in the configured
    /// direction, process each message, and keep going past per-item
    /// failures.
    pub async fn run(&self, cfg: &RunConfig) -> Result<RunStats, DomainError> {
        let resolver = PathResolver::new(&self.output_root, cfg.structure);
        let mut stats = RunStats::default();
        let progress = ProgressBar::new_spinner();
        progress.set_message("processing messages");

        let mut remaining = cfg.limit;
        let mut cursor_min: i64 = 0;
        let mut cursor_max: i64 = 0;

        loop {
            let batch_limit = match remaining {
                Some(0) => break,
                Some(n) => (n.min(PAGE_SIZE as usize)) as i32,
                None => PAGE_SIZE,
            };
            let batch = self
                .gateway
                .get_history(cfg.chat_id, batch_limit, cfg.reverse, cursor_min, cursor_max)
                .await?;
            if batch.is_empty() {
                break;
            }

            for msg in &batch {
                if let Err(e) = self.process_message(msg, cfg, &resolver, &mut stats).await {
                    error!(
                        unit_id = msg.grouped_id.unwrap_or(msg.id),
                        error = %e,
                        "error processing message, continuing"
                    );
                    stats.failed += 1;
                }
                stats.processed += 1;
                progress.inc(1);
            }

            let batch_min = batch.iter().map(|m| m.id).min().unwrap_or(0);
            let batch_max = batch.iter().map(|m| m.id).max().unwrap_or(0);
            if cfg.reverse {
                cursor_min = batch_max + 1;
            } else {
                cursor_max = batch_min - 1;
                if cursor_max <= 0 {
                    remaining = Some(0);
                }
            }
            if let Some(n) = remaining {
                remaining = Some(n.saturating_sub(batch.len()));
            }
            if batch.len() < batch_limit as usize {
                break;
            }
        }

        progress.finish_and_clear();
        info!(
            processed = stats.processed,
            downloaded = stats.downloaded,
            text_saved = stats.text_saved,
            skipped = stats.skipped,
            failed = stats.failed,
            "session complete"
        );
        Ok(stats)
    }

    /// Terminal actions in precedence order: date filter, empty filter,
    /// seen filter, then individual media / standalone text / album.
    async fn process_message(
        &self,
        msg: &Message,
        cfg: &RunConfig,
        resolver: &PathResolver,
        stats: &mut RunStats,
    ) -> Result<(), DomainError> {
        if !within_date_bounds(msg, cfg) {
            stats.skipped += 1;
            return Ok(());
        }
        if !msg.has_media() && msg.caption().is_empty() {
            stats.skipped += 1;
            return Ok(());
        }

        let seen_ids = msg.seen_ids();
        if !cfg.skip_seen && self.seen.contains_any(&seen_ids).await {
            stats.skipped += 1;
            return Ok(());
        }

        if let Some(group_id) = msg.grouped_id {
            return self.process_album(msg, group_id, cfg, resolver, stats).await;
        }

        if msg.has_media() {
            if cfg.caption_only {
                // Individual media stays unseen so a later full run picks
                // it up.
                stats.skipped += 1;
                return Ok(());
            }
            let caption = msg.caption().to_string();
            let folder = resolver.resolve_folder(msg, &caption, false).await?;
            let ext = msg.extension();
            let filename = resolver.resolve_filename(msg, &caption, &ext, false);
            match self.downloader.fetch(msg, &folder, &filename).await {
                Ok(_) => stats.downloaded += 1,
                Err(e) => {
                    error!(msg_id = msg.id, error = %e, "download failed permanently");
                    stats.failed += 1;
                }
            }
            self.seen.insert(&seen_ids).await?;
            return Ok(());
        }

        if cfg.download_text {
            let folder = resolver.resolve_folder(msg, "", false).await?;
            let path = folder.join(format!("text_{}.txt", msg.id));
            fs::write(&path, &msg.text)
                .await
                .map_err(|e| DomainError::Storage(format!("save text message: {}", e)))?;
            info!(msg_id = msg.id, path = %path.display(), "text message saved");
            self.seen.insert(&seen_ids).await?;
            stats.text_saved += 1;
            return Ok(());
        }

        stats.skipped += 1;
        Ok(())
    }

    /// Rebuild the album, download every qualifying member concurrently,
    /// save the shared caption, then mark the anchor's ids seen. The batch
    /// is joined before the stream advances, so two albums are never in
    /// flight together.
    async fn process_album(
        &self,
        anchor: &Message,
        group_id: i64,
        cfg: &RunConfig,
        resolver: &PathResolver,
        stats: &mut RunStats,
    ) -> Result<(), DomainError> {
        let members = self.albums.reconstruct(anchor, group_id).await?;
        let caption = members
            .iter()
            .map(|m| m.caption())
            .find(|c| !c.is_empty())
            .unwrap_or("")
            .to_string();
        let folder = resolver.resolve_folder(anchor, &caption, true).await?;

        if !cfg.caption_only {
            let mut batch = tokio::task::JoinSet::new();
            for member in members {
                if !member.has_media() || !cfg.allows(member.media_kind()) {
                    continue;
                }
                let ext = member.extension();
                let filename = resolver.resolve_filename(&member, "", &ext, true);
                let downloader = Arc::clone(&self.downloader);
                let folder = folder.clone();
                batch.spawn(async move {
                    let id = member.id;
                    (id, downloader.fetch(&member, &folder, &filename).await)
                });
            }
            while let Some(joined) = batch.join_next().await {
                match joined {
                    Ok((_, Ok(_))) => stats.downloaded += 1,
                    Ok((id, Err(e))) => {
                        error!(msg_id = id, group_id, error = %e, "album item failed permanently");
                        stats.failed += 1;
                    }
                    Err(e) => {
                        error!(group_id, error = %e, "album download task aborted");
                        stats.failed += 1;
                    }
                }
            }
        }

        if !caption.is_empty() {
            let path = folder.join("text.txt");
            fs::write(&path, &caption)
                .await
                .map_err(|e| DomainError::Storage(format!("save album caption: {}", e)))?;
            info!(group_id, path = %path.display(), "album caption saved");
            stats.text_saved += 1;
        }

        self.seen.insert(&anchor.seen_ids()).await?;
        Ok(())
    }
}

fn within_date_bounds(msg: &Message, cfg: &RunConfig) -> bool {
    if cfg.min_date.is_none() && cfg.max_date.is_none() {
        return true;
    }
    let Some(date) = DateTime::<Utc>::from_timestamp(msg.date, 0).map(|dt| dt.date_naive())
    else {
        return true;
    };
    if let Some(min) = cfg.min_date {
        if date < min {
            return false;
        }
    }
    if let Some(max) = cfg.max_date {
        if date > max {
            return false;
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::persistence::SeenJson;
    use crate::domain::{MediaKind, MediaPayload};
    use crate::shared::config::StructureMode;
    use crate::usecases::album::AlbumSearch;
    use crate::usecases::downloader::RetryPolicy;
    use crate::usecases::test_support::{msg, MockGateway};
    use chrono::{NaiveDate, TimeZone};
    use std::path::Path;
    use std::time::Duration;

    fn march_2024() -> i64 {
        Utc.with_ymd_and_hms(2024, 3, 15, 12, 0, 0).unwrap().timestamp()
    }

    fn base_config(structure: StructureMode) -> RunConfig {
        RunConfig {
            chat_id: 100,
            limit: None,
            min_date: None,
            max_date: None,
            media_types: Vec::new(),
            reverse: false,
            caption_only: false,
            skip_seen: false,
            structure,
            download_text: false,
        }
    }

    async fn service(
        gateway: Arc<MockGateway>,
        out: &Path,
        retry: RetryPolicy,
    ) -> (SessionService, Arc<SeenJson>) {
        let seen = Arc::new(SeenJson::new(out.join("seen.json")));
        seen.load().await.unwrap();
        let gw = Arc::clone(&gateway) as Arc<dyn ChatGateway>;
        let downloader = Arc::new(MediaDownloader::new(Arc::clone(&gw), 3, retry));
        let albums = AlbumReconstructor::new(Arc::clone(&gw), AlbumSearch::default());
        let svc = SessionService::new(
            gw,
            Arc::clone(&seen) as Arc<dyn SeenStorePort>,
            downloader,
            albums,
            out,
        );
        (svc, seen)
    }

    #[tokio::test]
    async fn monthly_album_scenario() {
        let dir = tempfile::tempdir().unwrap();
        let stream = vec![
            msg(200, march_2024(), "Trip", Some(55), MediaPayload::Photo),
            msg(201, march_2024(), "", Some(55), MediaPayload::Photo),
            msg(202, march_2024(), "", Some(55), MediaPayload::Video),
        ];
        let gateway = Arc::new(MockGateway::new(stream));
        let (svc, seen) = service(Arc::clone(&gateway), dir.path(), RetryPolicy::default()).await;

        let stats = svc.run(&base_config(StructureMode::Monthly)).await.unwrap();

        let album_dir = dir.path().join("2024-03").join("captions").join("Trip");
        assert!(album_dir.join("200.jpg").is_file());
        assert!(album_dir.join("201.jpg").is_file());
        assert!(album_dir.join("202.mp4").is_file());
        assert_eq!(
            std::fs::read_to_string(album_dir.join("text.txt")).unwrap(),
            "Trip"
        );
        assert_eq!(stats.downloaded, 3);
        // Anchor (newest first: 202) and the group id are recorded.
        assert!(seen.contains_any(&[55]).await);
        assert!(seen.contains_any(&[202]).await);
    }

    #[tokio::test]
    async fn second_run_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let stream = vec![
            msg(200, march_2024(), "Trip", Some(55), MediaPayload::Photo),
            msg(201, march_2024(), "", Some(55), MediaPayload::Photo),
            msg(300, march_2024(), "", None, MediaPayload::Photo),
        ];
        let gateway = Arc::new(MockGateway::new(stream));
        let (svc, _seen) = service(Arc::clone(&gateway), dir.path(), RetryPolicy::default()).await;
        let cfg = base_config(StructureMode::Flat);

        let first = svc.run(&cfg).await.unwrap();
        assert_eq!(first.downloaded, 3);
        let attempts_after_first = gateway.attempts();

        let second = svc.run(&cfg).await.unwrap();
        assert_eq!(second.downloaded, 0);
        assert_eq!(gateway.attempts(), attempts_after_first);
    }

    #[tokio::test]
    async fn skip_seen_replay_short_circuits_on_existing_files() {
        let dir = tempfile::tempdir().unwrap();
        let stream = vec![msg(300, march_2024(), "", None, MediaPayload::Photo)];
        let gateway = Arc::new(MockGateway::new(stream));
        let (svc, _seen) = service(Arc::clone(&gateway), dir.path(), RetryPolicy::default()).await;
        let mut cfg = base_config(StructureMode::Flat);
        cfg.skip_seen = true;

        svc.run(&cfg).await.unwrap();
        assert_eq!(gateway.attempts(), 1);

        // History is bypassed, but the file on disk still short-circuits.
        let replay = svc.run(&cfg).await.unwrap();
        assert_eq!(gateway.attempts(), 1);
        assert_eq!(replay.downloaded, 1);
    }

    #[tokio::test]
    async fn flat_individual_embeds_caption_in_filename() {
        let dir = tempfile::tempdir().unwrap();
        let stream = vec![msg(42, march_2024(), "Nice pic", None, MediaPayload::Photo)];
        let gateway = Arc::new(MockGateway::new(stream));
        let (svc, seen) = service(Arc::clone(&gateway), dir.path(), RetryPolicy::default()).await;

        svc.run(&base_config(StructureMode::Flat)).await.unwrap();

        assert!(dir.path().join("Nice pic_42.jpg").is_file());
        assert!(seen.contains_any(&[42]).await);
    }

    #[tokio::test]
    async fn standalone_text_saved_when_requested() {
        let dir = tempfile::tempdir().unwrap();
        let stream = vec![msg(9, march_2024(), "hello there", None, MediaPayload::None)];
        let gateway = Arc::new(MockGateway::new(stream));
        let (svc, seen) = service(Arc::clone(&gateway), dir.path(), RetryPolicy::default()).await;

        let mut cfg = base_config(StructureMode::Flat);
        let stats = svc.run(&cfg).await.unwrap();
        assert_eq!(stats.text_saved, 0);
        assert!(!seen.contains_any(&[9]).await);

        cfg.download_text = true;
        let stats = svc.run(&cfg).await.unwrap();
        assert_eq!(stats.text_saved, 1);
        assert_eq!(
            std::fs::read_to_string(dir.path().join("text_9.txt")).unwrap(),
            "hello there"
        );
        assert!(seen.contains_any(&[9]).await);
    }

    #[tokio::test]
    async fn permanent_failure_does_not_stop_the_run() {
        let dir = tempfile::tempdir().unwrap();
        let stream = vec![
            msg(10, march_2024(), "", None, MediaPayload::Photo),
            msg(20, march_2024(), "", None, MediaPayload::Photo),
        ];
        // Newest-first iteration processes 20 first; its single attempt fails.
        let gateway = Arc::new(MockGateway::failing_first(stream, 1));
        let retry = RetryPolicy {
            max_attempts: 1,
            base_delay: Duration::from_millis(1),
        };
        let (svc, seen) = service(Arc::clone(&gateway), dir.path(), retry).await;

        let stats = svc.run(&base_config(StructureMode::Flat)).await.unwrap();

        assert_eq!(stats.failed, 1);
        assert_eq!(stats.downloaded, 1);
        assert!(dir.path().join("10.jpg").is_file());
        assert!(!dir.path().join("20.jpg").exists());
        // Both are recorded as processed.
        assert!(seen.contains_any(&[10]).await);
        assert!(seen.contains_any(&[20]).await);
    }

    #[tokio::test]
    async fn date_bounds_filter_messages() {
        let dir = tempfile::tempdir().unwrap();
        let feb = Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap().timestamp();
        let stream = vec![
            msg(1, feb, "", None, MediaPayload::Photo),
            msg(2, march_2024(), "", None, MediaPayload::Photo),
        ];
        let gateway = Arc::new(MockGateway::new(stream));
        let (svc, seen) = service(Arc::clone(&gateway), dir.path(), RetryPolicy::default()).await;

        let mut cfg = base_config(StructureMode::Flat);
        cfg.min_date = NaiveDate::from_ymd_opt(2024, 3, 1);
        let stats = svc.run(&cfg).await.unwrap();

        assert_eq!(stats.downloaded, 1);
        assert!(dir.path().join("2.jpg").is_file());
        assert!(!dir.path().join("1.jpg").exists());
        assert!(!seen.contains_any(&[1]).await);
    }

    #[tokio::test]
    async fn album_members_respect_media_allow_list() {
        let dir = tempfile::tempdir().unwrap();
        let stream = vec![
            msg(200, march_2024(), "Mixed", Some(55), MediaPayload::Photo),
            msg(
                201,
                march_2024(),
                "",
                Some(55),
                MediaPayload::Document {
                    file_name: Some("notes.pdf".to_string()),
                    mime_type: None,
                },
            ),
        ];
        let gateway = Arc::new(MockGateway::new(stream));
        let (svc, _seen) = service(Arc::clone(&gateway), dir.path(), RetryPolicy::default()).await;

        let mut cfg = base_config(StructureMode::Flat);
        cfg.media_types = vec![MediaKind::Photo];
        let stats = svc.run(&cfg).await.unwrap();

        let album_dir = dir.path().join("Mixed");
        assert!(album_dir.join("200.jpg").is_file());
        assert!(!album_dir.join("201.pdf").exists());
        assert_eq!(stats.downloaded, 1);
    }

    #[tokio::test]
    async fn caption_only_saves_album_text_without_transfers() {
        let dir = tempfile::tempdir().unwrap();
        let stream = vec![
            msg(200, march_2024(), "Trip", Some(55), MediaPayload::Photo),
            msg(201, march_2024(), "", Some(55), MediaPayload::Photo),
            msg(300, march_2024(), "solo", None, MediaPayload::Photo),
        ];
        let gateway = Arc::new(MockGateway::new(stream));
        let (svc, seen) = service(Arc::clone(&gateway), dir.path(), RetryPolicy::default()).await;

        let mut cfg = base_config(StructureMode::Flat);
        cfg.caption_only = true;
        svc.run(&cfg).await.unwrap();

        assert_eq!(gateway.attempts(), 0);
        assert_eq!(
            std::fs::read_to_string(dir.path().join("Trip").join("text.txt")).unwrap(),
            "Trip"
        );
        // The album is done; the standalone photo is left for a full run.
        assert!(seen.contains_any(&[55]).await);
        assert!(!seen.contains_any(&[300]).await);
    }

    #[tokio::test]
    async fn limit_caps_processed_messages() {
        let dir = tempfile::tempdir().unwrap();
        let stream: Vec<Message> = (1..=5)
            .map(|id| msg(id, march_2024(), "", None, MediaPayload::Photo))
            .collect();
        let gateway = Arc::new(MockGateway::new(stream));
        let (svc, _seen) = service(Arc::clone(&gateway), dir.path(), RetryPolicy::default()).await;

        let mut cfg = base_config(StructureMode::Flat);
        cfg.limit = Some(2);
        let stats = svc.run(&cfg).await.unwrap();

        assert_eq!(stats.processed, 2);
        assert_eq!(stats.downloaded, 2);
        // Newest first: ids 5 and 4.
        assert!(dir.path().join("5.jpg").is_file());
        assert!(dir.path().join("4.jpg").is_file());
        assert!(!dir.path().join("3.jpg").exists());
    }
}
