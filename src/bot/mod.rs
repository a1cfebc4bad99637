//! Bot Runtime
//!
//! Shared runtime state, the command dispatcher, and the connection
//! supervisor. State lives in one [`BotState`] object handed to the event
//! loop and the HTTP handlers by `Arc`, instead of process-wide globals.

pub mod commands;
pub mod supervisor;

pub use commands::ResponseTable;
pub use supervisor::Supervisor;

use crate::client::{ChatClient, ConnectionState};
use crate::session::SessionSync;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{watch, RwLock};

/// Session-manager state shared between the dispatch loop and HTTP handlers.
pub struct BotState {
    connection: RwLock<ConnectionState>,
    pairing_code: RwLock<Option<String>>,
    client: RwLock<Option<Arc<dyn ChatClient>>>,
    responses: RwLock<ResponseTable>,
    started_at: Instant,
}

impl Default for BotState {
    fn default() -> Self {
        Self::new()
    }
}

impl BotState {
    pub fn new() -> Self {
        Self {
            connection: RwLock::new(ConnectionState::Closed { logged_out: false }),
            pairing_code: RwLock::new(None),
            client: RwLock::new(None),
            responses: RwLock::new(ResponseTable::default()),
            started_at: Instant::now(),
        }
    }

    pub async fn connection(&self) -> ConnectionState {
        *self.connection.read().await
    }

    pub async fn set_connection(&self, state: ConnectionState) {
        *self.connection.write().await = state;
    }

    pub async fn is_connected(&self) -> bool {
        self.connection.read().await.is_open()
    }

    pub async fn pairing_code(&self) -> Option<String> {
        self.pairing_code.read().await.clone()
    }

    pub async fn set_pairing_code(&self, code: Option<String>) {
        *self.pairing_code.write().await = code;
    }

    pub async fn client(&self) -> Option<Arc<dyn ChatClient>> {
        self.client.read().await.clone()
    }

    pub async fn set_client(&self, client: Arc<dyn ChatClient>) {
        *self.client.write().await = Some(client);
    }

    pub async fn clear_client(&self) {
        *self.client.write().await = None;
    }

    pub async fn responses(&self) -> ResponseTable {
        self.responses.read().await.clone()
    }

    pub async fn set_responses(&self, table: ResponseTable) {
        *self.responses.write().await = table;
    }

    pub fn uptime(&self) -> Duration {
        self.started_at.elapsed()
    }
}

/// Resident set size of this process from procfs, assuming 4 KiB pages.
/// `None` on platforms without /proc.
pub fn rss_bytes() -> Option<u64> {
    let statm = std::fs::read_to_string("/proc/self/statm").ok()?;
    let pages: u64 = statm.split_whitespace().nth(1)?.parse().ok()?;
    Some(pages * 4096)
}

/// Operator reset: discard all session state and force a fresh pairing flow.
///
/// Logs out the live client best-effort first; a logout failure must never
/// block the directory/store clearing that follows. The restart signal is a
/// watch channel rather than a plain notifier: the supervisor marks it seen
/// when it parks in the terminal logged-out state, so a reset absorbed by a
/// still-running connection cycle cannot wake a later genuine logout.
pub async fn reset_session(
    state: &BotState,
    sync: &SessionSync,
    restart: &watch::Sender<()>,
) -> Result<(), crate::session::SyncError> {
    if let Some(client) = state.client().await
        && let Err(e) = client.logout().await
    {
        tracing::warn!("Logout during reset failed (continuing): {}", e);
    }
    state.clear_client().await;
    state.set_pairing_code(None).await;
    state
        .set_connection(ConnectionState::Closed { logged_out: true })
        .await;

    sync.reset().await?;
    // No receiver means the supervisor is already gone (shutdown)
    let _ = restart.send(());
    Ok(())
}
