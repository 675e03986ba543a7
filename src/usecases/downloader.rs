//! Bounded, retrying media downloads.
//!
//! One process-wide semaphore caps in-flight transfers; each transfer is
//! retried with exponential backoff. A destination that already exists on
//! disk short-circuits to success so re-runs stay idempotent.

use crate::domain::{DomainError, Message};
use crate::ports::ChatGateway;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tracing::{debug, warn};

/// Backoff schedule for transfer retries.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Total attempts, first try included.
    pub max_attempts: u32,
    /// Wait after the first failure; doubles on each further failure.
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 4,
            base_delay: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    /// Wait before the retry following failed attempt `attempt` (1-based):
    /// base, 2·base, 4·base, …
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        self.base_delay * 2u32.saturating_pow(attempt.saturating_sub(1))
    }
}

/// What a fetch did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DownloadOutcome {
    Fetched,
    /// Destination already existed; nothing was transferred.
    AlreadyPresent,
}

/// Downloads one media item under the global concurrency cap.
pub struct MediaDownloader {
    gateway: Arc<dyn ChatGateway>,
    permits: Arc<Semaphore>,
    retry: RetryPolicy,
}

impl MediaDownloader {
    pub fn new(gateway: Arc<dyn ChatGateway>, concurrent: usize, retry: RetryPolicy) -> Self {
        Self {
            gateway,
            permits: Arc::new(Semaphore::new(concurrent.max(1))),
            retry,
        }
    }

    /// Fetch the message's media into `folder/filename`. One permit is held
    /// across the whole attempt chain, so retries do not release the slot.
    pub async fn fetch(
        &self,
        msg: &Message,
        folder: &Path,
        filename: &str,
    ) -> Result<DownloadOutcome, DomainError> {
        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|_| DomainError::Transfer("downloader shut down".into()))?;

        let dest = folder.join(filename);
        if tokio::fs::try_exists(&dest).await.unwrap_or(false) {
            debug!(msg_id = msg.id, path = %dest.display(), "file already exists, skipping");
            return Ok(DownloadOutcome::AlreadyPresent);
        }

        let mut attempt = 1u32;
        loop {
            match self.gateway.download_media(msg, &dest).await {
                Ok(()) => {
                    debug!(msg_id = msg.id, path = %dest.display(), attempt, "media downloaded");
                    return Ok(DownloadOutcome::Fetched);
                }
                Err(e) if attempt < self.retry.max_attempts => {
                    let delay = self.retry.backoff_delay(attempt);
                    warn!(
                        msg_id = msg.id,
                        error = %e,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        "transfer failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => {
                    return Err(DomainError::Transfer(format!(
                        "message {} after {} attempts: {}",
                        msg.id, attempt, e
                    )));
                }
            }
        }
    }
}
