//! Implements ChatGateway using grammers Client.
//!
//! Handles FloodWait by sleeping and retrying. Uses raw invoke for
//! GetHistory so history can be fetched inside an id window in either
//! direction (album search needs ascending windows).

use crate::adapters::telegram::mapper;
use crate::domain::{Chat, DomainError, Message};
use crate::ports::ChatGateway;
use async_trait::async_trait;
use grammers_client::tl;
use grammers_client::Client;
use grammers_client::InvocationError;
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// Telegram gateway adapter. Wraps a grammers Client (clone shared with the
/// auth adapter in main).
pub struct GrammersChatGateway {
    client: Client,
    /// Cache InputPeer by chat_id so repeated history windows don't call
    /// iter_dialogs every time (avoids FLOOD_WAIT).
    peer_cache: Mutex<HashMap<i64, tl::enums::InputPeer>>,
}

impl GrammersChatGateway {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            peer_cache: Mutex::new(HashMap::new()),
        }
    }

    /// Resolve chat_id to InputPeer, using the cache to avoid repeated
    /// getDialogs requests.
    async fn resolve_input_peer(&self, chat_id: i64) -> Result<tl::enums::InputPeer, DomainError> {
        {
            let cache = self.peer_cache.lock().await;
            if let Some(peer) = cache.get(&chat_id) {
                return Ok(peer.clone());
            }
        }
        let peer = {
            let mut dialogs = self.client.iter_dialogs();
            let mut found = None;
            while let Some(dialog) = dialogs
                .next()
                .await
                .map_err(|e| DomainError::Gateway(e.to_string()))?
            {
                let p = dialog.peer();
                if p.id().bot_api_dialog_id_unchecked() == chat_id {
                    found = Some(p.clone());
                    break;
                }
            }
            found.ok_or_else(|| {
                DomainError::Gateway(format!("peer {} not found in dialogs", chat_id))
            })?
        };
        let peer_ref = peer
            .to_ref()
            .await
            .map_err(|e| DomainError::Gateway(e.to_string()))?
            .ok_or_else(|| DomainError::Gateway("peer not in session cache".into()))?;
        let input_peer: tl::enums::InputPeer = peer_ref.into();
        self.peer_cache
            .lock()
            .await
            .insert(chat_id, input_peer.clone());
        Ok(input_peer)
    }
}

#[async_trait]
impl ChatGateway for GrammersChatGateway {
    async fn get_dialogs(&self) -> Result<Vec<Chat>, DomainError> {
        let mut dialogs = self.client.iter_dialogs();
        let mut chats = Vec::new();
        while let Some(dialog) = dialogs
            .next()
            .await
            .map_err(|e| DomainError::Gateway(e.to_string()))?
        {
            let peer = dialog.peer();
            let id = peer.id().bot_api_dialog_id_unchecked();
            let title = peer
                .name()
                .map(String::from)
                .unwrap_or_else(|| peer.id().to_string());
            let kind = mapper::chat_type_from_peer(peer);
            chats.push(mapper::dialog_to_chat(
                id,
                &title,
                peer.username(),
                kind,
            ));
        }
        Ok(chats)
    }

    async fn get_history(
        &self,
        chat_id: i64,
        limit: i32,
        reverse: bool,
        min_id: i64,
        max_id: i64,
    ) -> Result<Vec<Message>, DomainError> {
        use tl::enums::messages::Messages;

        let input_peer = self.resolve_input_peer(chat_id).await?;

        // Domain bounds are inclusive; the TL request excludes both ends.
        let tl_min = if min_id > 0 { (min_id - 1) as i32 } else { 0 };
        let tl_max = if max_id > 0 { (max_id + 1) as i32 } else { 0 };

        // Newest-first pages start just below max_id. Oldest-first pages are
        // anchored at min_id and shifted toward newer ids with a negative
        // add_offset.
        let (offset_id, add_offset) = if reverse {
            (tl_min.max(1), -limit)
        } else {
            (tl_max, 0)
        };

        for attempt in 0..3 {
            let req = tl::functions::messages::GetHistory {
                peer: input_peer.clone(),
                offset_id,
                offset_date: 0,
                add_offset,
                limit,
                max_id: tl_max,
                min_id: tl_min,
                hash: 0,
            };

            match self.client.invoke(&req).await {
                Ok(raw) => {
                    let messages = match raw {
                        Messages::Messages(m) => m.messages,
                        Messages::Slice(m) => m.messages,
                        Messages::ChannelMessages(m) => m.messages,
                        Messages::NotModified(_) => return Ok(vec![]),
                    };
                    let mut out: Vec<Message> = messages
                        .iter()
                        .filter_map(|msg| mapper::message_to_domain(msg, chat_id))
                        .collect();
                    // Defensive: only keep messages inside the requested
                    // window (the API may return boundary rows).
                    out.retain(|m| {
                        (min_id == 0 || m.id >= min_id) && (max_id == 0 || m.id <= max_id)
                    });
                    if reverse {
                        out.sort_by_key(|m| m.id);
                    } else {
                        out.sort_by_key(|m| std::cmp::Reverse(m.id));
                    }
                    out.truncate(limit.max(0) as usize);
                    debug!(chat_id, count = out.len(), reverse, "history batch fetched");
                    return Ok(out);
                }
                Err(InvocationError::Rpc(rpc)) if rpc.code == 420 => {
                    let wait_secs = rpc.value.unwrap_or(60) as u64;
                    warn!(attempt, wait_secs, "FloodWait, sleeping");
                    tokio::time::sleep(Duration::from_secs(wait_secs)).await;
                }
                Err(e) => return Err(DomainError::Gateway(e.to_string())),
            }
        }
        Err(DomainError::Gateway("FloodWait max retries".into()))
    }

    async fn download_media(&self, msg: &Message, dest: &Path) -> Result<(), DomainError> {
        let peer = {
            let mut dialogs = self.client.iter_dialogs();
            let mut found = None;
            while let Some(dialog) = dialogs
                .next()
                .await
                .map_err(|e| DomainError::Gateway(e.to_string()))?
            {
                let p = dialog.peer();
                if p.id().bot_api_dialog_id_unchecked() == msg.chat_id {
                    found = Some(p.clone());
                    break;
                }
            }
            found.ok_or_else(|| {
                DomainError::Transfer(format!("peer {} not found", msg.chat_id))
            })?
        };

        let peer_ref = peer
            .to_ref()
            .await
            .map_err(|e| DomainError::Transfer(e.to_string()))?
            .ok_or_else(|| DomainError::Transfer("peer not in session cache".into()))?;

        let messages = self
            .client
            .get_messages_by_id(peer_ref, &[msg.id as i32])
            .await
            .map_err(|e| DomainError::Transfer(e.to_string()))?;

        let full = messages
            .into_iter()
            .next()
            .flatten()
            .ok_or_else(|| DomainError::Transfer(format!("message {} not found", msg.id)))?;

        let media = full
            .media()
            .ok_or_else(|| DomainError::Transfer(format!("message {} has no media", msg.id)))?;

        self.client
            .download_media(&media, dest)
            .await
            .map_err(|e| DomainError::Transfer(e.to_string()))?;

        debug!(
            chat_id = msg.chat_id,
            msg_id = msg.id,
            path = %dest.display(),
            "media downloaded"
        );
        Ok(())
    }
}
