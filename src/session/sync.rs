//! Session Synchronizer
//!
//! Bridges the chat client's local auth directory to the session store:
//! restore on boot, snapshot on every credential rotation, clear on reset.
//! The client writes the directory itself during normal operation; this
//! module only reads it (snapshot) or rewrites it whole (restore).

use super::store::{SessionFiles, SessionStore, StoreError};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("filesystem error: {0}")]
    Io(#[from] std::io::Error),
}

/// Synchronizes one auth directory with one session row.
pub struct SessionSync {
    store: Arc<dyn SessionStore>,
    auth_dir: PathBuf,
    session_id: String,
}

impl SessionSync {
    pub fn new(store: Arc<dyn SessionStore>, auth_dir: PathBuf, session_id: String) -> Self {
        Self {
            store,
            auth_dir,
            session_id,
        }
    }

    pub fn auth_dir(&self) -> &Path {
        &self.auth_dir
    }

    /// Restore the last snapshot into the auth directory.
    ///
    /// Returns whether a snapshot was applied. An absent snapshot leaves the
    /// directory untouched. A file whose payload fails to decode is skipped
    /// with a log line; the client detects an incomplete credential set
    /// itself and falls back to a fresh pairing flow.
    ///
    /// Must complete before the chat client is constructed — the client
    /// reads its auth directory synchronously at startup.
    pub async fn restore(&self) -> Result<bool, SyncError> {
        let Some(snapshot) = self.store.load(&self.session_id).await? else {
            tracing::info!("No stored session for '{}'", self.session_id);
            return Ok(false);
        };

        std::fs::create_dir_all(&self.auth_dir)?;
        let mut written = 0usize;
        for (name, encoded) in &snapshot.files {
            let bytes = match BASE64.decode(encoded) {
                Ok(bytes) => bytes,
                Err(e) => {
                    tracing::warn!("Skipping corrupt auth file '{}': {}", name, e);
                    continue;
                }
            };
            std::fs::write(self.auth_dir.join(name), bytes)?;
            written += 1;
        }
        tracing::info!(
            "Restored session '{}' ({} file(s), stored at {})",
            self.session_id,
            written,
            snapshot.updated_at
        );
        Ok(true)
    }

    /// Snapshot the auth directory into the store, replacing the prior row.
    ///
    /// Reads regular files directly inside the directory (non-recursive; the
    /// client keeps a flat layout). A missing directory means there is
    /// nothing to persist yet.
    pub async fn snapshot(&self) -> Result<(), SyncError> {
        if !self.auth_dir.exists() {
            tracing::debug!("Auth directory absent, nothing to snapshot");
            return Ok(());
        }

        let mut files = SessionFiles::new();
        for entry in std::fs::read_dir(&self.auth_dir)? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            let bytes = std::fs::read(entry.path())?;
            files.insert(
                entry.file_name().to_string_lossy().into_owned(),
                BASE64.encode(&bytes),
            );
        }

        self.store.save(&self.session_id, &files).await?;
        tracing::debug!(
            "Saved session '{}' ({} file(s))",
            self.session_id,
            files.len()
        );
        Ok(())
    }

    /// Snapshot in the background, logging and swallowing failures. A failed
    /// write must not reach the credential-rotation event handler's caller.
    pub fn spawn_snapshot(self: &Arc<Self>) -> tokio::task::JoinHandle<()> {
        let sync = Arc::clone(self);
        tokio::spawn(async move {
            if let Err(e) = sync.snapshot().await {
                tracing::warn!("Session snapshot failed (will retry on next rotation): {}", e);
            }
        })
    }

    /// Discard all session state: empty the auth directory, then delete the
    /// store row. Directory removal completes first so a reinitialized client
    /// cannot pick up stale keys.
    pub async fn reset(&self) -> Result<(), SyncError> {
        if self.auth_dir.exists() {
            std::fs::remove_dir_all(&self.auth_dir)?;
        }
        std::fs::create_dir_all(&self.auth_dir)?;
        self.store.clear(&self.session_id).await?;
        tracing::info!("Session '{}' reset", self.session_id);
        Ok(())
    }
}
