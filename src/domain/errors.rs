//! Domain errors. Used by ports and use cases.
//!
//! Adapters map infrastructure errors into these.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DomainError {
    /// Invalid or missing configuration. Fatal before processing starts.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Login/2FA failure. Fatal before processing starts.
    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Telegram gateway error: {0}")]
    Gateway(String),

    /// Transient media transfer failure; retried with backoff by the
    /// downloader before being recorded as a per-item failure.
    #[error("Media transfer failed: {0}")]
    Transfer(String),

    #[error("Seen-state error: {0}")]
    State(String),

    /// Local filesystem failure (folders, caption/text files).
    #[error("Storage error: {0}")]
    Storage(String),
}
