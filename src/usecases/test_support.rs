//! Shared test doubles for use-case tests.

use crate::domain::{Chat, DomainError, MediaPayload, Message};
use crate::ports::ChatGateway;
use std::path::Path;
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::Mutex;

pub fn msg(
    id: i64,
    date: i64,
    text: &str,
    grouped_id: Option<i64>,
    media: MediaPayload,
) -> Message {
    Message {
        id,
        chat_id: 100,
        date,
        text: text.to_string(),
        grouped_id,
        media,
    }
}

/// In-memory gateway over a fixed message list.
///
/// `download_media` writes a small file at the destination on success; the
/// first `fail_first` transfer attempts (counted across all messages) fail
/// with a transfer error. `history_windows` records every searched
/// (min_id, max_id) pair.
pub struct MockGateway {
    messages: Vec<Message>,
    pub fail_first: AtomicU32,
    pub download_attempts: AtomicU32,
    pub history_windows: Mutex<Vec<(i64, i64)>>,
    in_flight: AtomicUsize,
    pub max_in_flight: AtomicUsize,
    pub download_delay: Option<Duration>,
}

impl MockGateway {
    pub fn new(messages: Vec<Message>) -> Self {
        Self {
            messages,
            fail_first: AtomicU32::new(0),
            download_attempts: AtomicU32::new(0),
            history_windows: Mutex::new(Vec::new()),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            download_delay: None,
        }
    }

    pub fn failing_first(messages: Vec<Message>, failures: u32) -> Self {
        let gw = Self::new(messages);
        gw.fail_first.store(failures, Ordering::SeqCst);
        gw
    }

    pub fn with_download_delay(mut self, delay: Duration) -> Self {
        self.download_delay = Some(delay);
        self
    }

    pub fn attempts(&self) -> u32 {
        self.download_attempts.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl ChatGateway for MockGateway {
    async fn get_dialogs(&self) -> Result<Vec<Chat>, DomainError> {
        Ok(vec![])
    }

    async fn get_history(
        &self,
        _chat_id: i64,
        limit: i32,
        reverse: bool,
        min_id: i64,
        max_id: i64,
    ) -> Result<Vec<Message>, DomainError> {
        self.history_windows.lock().await.push((min_id, max_id));
        let mut batch: Vec<Message> = self
            .messages
            .iter()
            .filter(|m| (min_id == 0 || m.id >= min_id) && (max_id == 0 || m.id <= max_id))
            .cloned()
            .collect();
        if reverse {
            batch.sort_by_key(|m| m.id);
        } else {
            batch.sort_by_key(|m| std::cmp::Reverse(m.id));
        }
        batch.truncate(limit.max(0) as usize);
        Ok(batch)
    }

    async fn download_media(&self, msg: &Message, dest: &Path) -> Result<(), DomainError> {
        self.download_attempts.fetch_add(1, Ordering::SeqCst);

        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);
        if let Some(delay) = self.download_delay {
            tokio::time::sleep(delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        let remaining = self.fail_first.load(Ordering::SeqCst);
        if remaining > 0 {
            self.fail_first.store(remaining - 1, Ordering::SeqCst);
            return Err(DomainError::Transfer(format!(
                "simulated transfer failure for message {}",
                msg.id
            )));
        }

        tokio::fs::write(dest, b"media")
            .await
            .map_err(|e| DomainError::Transfer(e.to_string()))
    }
}
