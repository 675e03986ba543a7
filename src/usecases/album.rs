//! Album reconstruction by windowed, expanding-range search.
//!
//! Albums arrive as individual messages sharing a grouped id; siblings sit
//! close together in id space. Scan an id window around the anchor, widen it
//! when too few members turn up, and stop once the observed album-size
//! ceiling is reached or a wider round finds nothing new.

use crate::domain::{DomainError, Message};
use crate::ports::ChatGateway;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Batch size for window scans.
const SCAN_BATCH: i32 = 100;

/// Search constants. A bounded-cost heuristic: albums spanning more than the
/// widest window are only partially collected.
#[derive(Debug, Clone, Copy)]
pub struct AlbumSearch {
    /// Half-width of the first id window around the anchor.
    pub initial_radius: i64,
    /// Total search rounds; the radius doubles between rounds.
    pub expand_rounds: u32,
    /// Stop expanding once this many members are found (observed platform
    /// album size ceiling).
    pub stop_count: usize,
}

impl Default for AlbumSearch {
    fn default() -> Self {
        Self {
            initial_radius: 40,
            expand_rounds: 3,
            stop_count: 10,
        }
    }
}

/// Discovers all sibling messages of an album around an anchor message.
pub struct AlbumReconstructor {
    gateway: Arc<dyn ChatGateway>,
    search: AlbumSearch,
}

impl AlbumReconstructor {
    pub fn new(gateway: Arc<dyn ChatGateway>, search: AlbumSearch) -> Self {
        Self { gateway, search }
    }

    /// Collect the album containing `anchor`, ascending by id. Best-effort:
    /// membership is discovered by proximity, never guaranteed complete.
    pub async fn reconstruct(
        &self,
        anchor: &Message,
        group_id: i64,
    ) -> Result<Vec<Message>, DomainError> {
        let mut members: BTreeMap<i64, Message> = BTreeMap::new();
        let mut radius = self.search.initial_radius;

        for round in 0..self.search.expand_rounds {
            let found_before = members.len();
            let min_id = (anchor.id - radius).max(1);
            let max_id = anchor.id + radius;
            self.scan_window(anchor.chat_id, min_id, max_id, group_id, &mut members)
                .await?;

            if members.len() >= self.search.stop_count {
                break;
            }
            // A wider round that added nothing means the album is fully
            // inside the previous window; stop instead of scanning wider.
            if round > 0 && members.len() == found_before {
                break;
            }
            radius *= 2;
        }

        Ok(members.into_values().collect())
    }

    /// Scan one inclusive id window ascending, paginating by id cursor.
    async fn scan_window(
        &self,
        chat_id: i64,
        min_id: i64,
        max_id: i64,
        group_id: i64,
        members: &mut BTreeMap<i64, Message>,
    ) -> Result<(), DomainError> {
        let mut cursor = min_id;
        loop {
            let batch = self
                .gateway
                .get_history(chat_id, SCAN_BATCH, true, cursor, max_id)
                .await?;
            if batch.is_empty() {
                break;
            }
            let batch_len = batch.len();
            let batch_max = batch.iter().map(|m| m.id).max().unwrap_or(max_id);
            for m in batch {
                if m.grouped_id == Some(group_id) {
                    members.entry(m.id).or_insert(m);
                }
            }
            if batch_len < SCAN_BATCH as usize || batch_max >= max_id {
                break;
            }
            cursor = batch_max + 1;
        }
        Ok(())
    }
}
