//! Outbound ports. Application calls into infrastructure.
//!
//! Implemented by adapters.

use crate::domain::{Chat, DomainError, Message, SignInResult};
use std::path::Path;

/// Telegram API gateway. Fetch dialogs, message history, media bytes.
#[async_trait::async_trait]
pub trait ChatGateway: Send + Sync {
    /// Fetch all dialogs (chats) the user participates in.
    async fn get_dialogs(&self) -> Result<Vec<Chat>, DomainError>;

    /// Fetch one batch of history from a chat, bounded to an inclusive id
    /// window.
    ///
    /// - `min_id`/`max_id`: inclusive id bounds; 0 = unbounded on that side
    /// - `limit`: max messages in the batch
    /// - `reverse`: true = oldest first (ascending ids), false = newest first
    ///
    /// Callers paginate by moving the window past the last id of the
    /// previous batch.
    async fn get_history(
        &self,
        chat_id: i64,
        limit: i32,
        reverse: bool,
        min_id: i64,
        max_id: i64,
    ) -> Result<Vec<Message>, DomainError>;

    /// Download the message's media to `dest`. Leaves no partial file
    /// behind on failure.
    async fn download_media(&self, msg: &Message, dest: &Path) -> Result<(), DomainError>;
}

/// Seen-state port. The single source of dedup truth across runs.
#[async_trait::async_trait]
pub trait SeenStorePort: Send + Sync {
    /// True when any of `ids` was processed in a prior run.
    async fn contains_any(&self, ids: &[i64]) -> bool;

    /// Record `ids` as processed and persist the full set before returning.
    async fn insert(&self, ids: &[i64]) -> Result<(), DomainError>;
}

/// Auth port: login/2FA flow.
#[async_trait::async_trait]
pub trait AuthPort: Send + Sync {
    async fn is_authenticated(&self) -> Result<bool, DomainError>;

    async fn request_login_code(&self, phone: &str, api_hash: &str) -> Result<(), DomainError>;

    /// Consume the login code. May demand a 2FA password.
    async fn sign_in(&self, code: &str) -> Result<SignInResult, DomainError>;

    async fn check_password(&self, password: &[u8]) -> Result<(), DomainError>;
}
