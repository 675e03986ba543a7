//! Persistent grammers session storage.
//!
//! Authorization survives restarts through an SqliteSession file; a missing
//! file means a fresh login is saved there afterwards.

use grammers_session::storages::SqliteSession;
use std::path::Path;

/// Opens the session storage at `path`, creating parent directories as
/// needed.
pub async fn open_file_session(path: impl AsRef<Path>) -> anyhow::Result<SqliteSession> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| anyhow::anyhow!("create session directory {}: {}", parent.display(), e))?;
    }
    SqliteSession::open(path)
        .await
        .map_err(|e| anyhow::anyhow!("open session file {}: {}", path.display(), e))
}
