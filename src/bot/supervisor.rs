//! Connection Supervisor
//!
//! Owns the connect/reconnect lifecycle of the chat client and the single
//! dispatch loop consuming its event stream. Retries transient disconnects
//! forever; a logout is terminal until the operator resets the session.

use super::{commands, BotState};
use crate::client::{ClientEvent, ClientFactory, Connection, ConnectionState};
use crate::config::BotConfig;
use crate::session::SessionSync;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

/// Fixed delay before reconnecting after a non-logout close.
const RETRY_DELAY: Duration = Duration::from_secs(5);
/// Longer delay after a connection-setup failure.
const SETUP_RETRY_DELAY: Duration = Duration::from_secs(10);

enum Exit {
    /// Transient close; reconnect after the fixed delay.
    Retry,
    /// Explicit logout; wait for an operator reset.
    LoggedOut,
}

pub struct Supervisor {
    state: Arc<BotState>,
    sync: Arc<SessionSync>,
    factory: Arc<dyn ClientFactory>,
    bot_config: BotConfig,
    restart: watch::Receiver<()>,
    retry_delay: Duration,
    setup_retry_delay: Duration,
}

impl Supervisor {
    pub fn new(
        state: Arc<BotState>,
        sync: Arc<SessionSync>,
        factory: Arc<dyn ClientFactory>,
        bot_config: BotConfig,
        restart: watch::Receiver<()>,
    ) -> Self {
        Self {
            state,
            sync,
            factory,
            bot_config,
            restart,
            retry_delay: RETRY_DELAY,
            setup_retry_delay: SETUP_RETRY_DELAY,
        }
    }

    /// Override the reconnect delays (tests).
    #[cfg(test)]
    pub fn with_delays(mut self, retry: Duration, setup_retry: Duration) -> Self {
        self.retry_delay = retry;
        self.setup_retry_delay = setup_retry;
        self
    }

    /// Run forever. Restores the stored session exactly once, before the
    /// first connect; the auth directory then persists across reconnects
    /// within this process lifetime.
    pub async fn run(self) {
        let mut restart = self.restart.clone();
        match self.sync.restore().await {
            Ok(true) => tracing::info!("Session restored, reconnecting with stored credentials"),
            Ok(false) => tracing::info!("Starting unauthenticated, a pairing flow will begin"),
            // Degrade to a fresh, unauthenticated start
            Err(e) => tracing::warn!("Session restore failed, starting unauthenticated: {}", e),
        }

        loop {
            self.state.set_connection(ConnectionState::Connecting).await;
            let conn = match self.factory.connect(self.sync.auth_dir()).await {
                Ok(conn) => conn,
                Err(e) => {
                    tracing::error!(
                        "Connection setup failed, retrying in {:?}: {}",
                        self.setup_retry_delay,
                        e
                    );
                    tokio::time::sleep(self.setup_retry_delay).await;
                    continue;
                }
            };

            self.state.set_client(conn.client.clone()).await;
            let outcome = self.dispatch(conn).await;
            self.state.clear_client().await;

            match outcome {
                Exit::Retry => {
                    self.state
                        .set_connection(ConnectionState::Closed { logged_out: false })
                        .await;
                    tracing::info!("Connection closed, reconnecting in {:?}", self.retry_delay);
                    tokio::time::sleep(self.retry_delay).await;
                }
                Exit::LoggedOut => {
                    self.state
                        .set_connection(ConnectionState::Closed { logged_out: true })
                        .await;
                    tracing::warn!("Logged out; waiting for an operator reset before pairing again");
                    // A reset raised while this cycle was still running has
                    // already been absorbed by it; only a reset issued from
                    // the terminal state may restart pairing.
                    restart.mark_unchanged();
                    if restart.changed().await.is_err() {
                        // Reset side is gone; nothing can ever wake us
                        return;
                    }
                }
            }
        }
    }

    /// Consume the event stream until the connection ends.
    async fn dispatch(&self, mut conn: Connection) -> Exit {
        while let Some(event) = conn.events.recv().await {
            match event {
                ClientEvent::CredsUpdated => {
                    tracing::debug!("Credentials rotated, persisting session");
                    self.sync.spawn_snapshot();
                }
                ClientEvent::PairingCode(code) => {
                    tracing::info!("Pairing code available, scan it via the /qr endpoint");
                    self.state.set_pairing_code(Some(code)).await;
                }
                ClientEvent::ConnectionStateChanged(state) => match state {
                    ConnectionState::Open => {
                        tracing::info!("Connection open");
                        // Pairing artifact is no longer needed once open
                        self.state.set_pairing_code(None).await;
                        self.state.set_connection(ConnectionState::Open).await;
                    }
                    ConnectionState::Connecting => {
                        self.state.set_connection(ConnectionState::Connecting).await;
                    }
                    ConnectionState::Closed { logged_out } => {
                        return if logged_out {
                            Exit::LoggedOut
                        } else {
                            Exit::Retry
                        };
                    }
                },
                ClientEvent::MessageReceived(msg) => {
                    let table = self.state.responses().await;
                    let uptime = self.state.uptime();
                    if let Some(reply) =
                        commands::build_reply(&table, &self.bot_config, &msg, uptime)
                        && let Err(e) = conn.client.send_text(&msg.chat, &reply).await
                    {
                        tracing::error!("Failed to send reply to {}: {}", msg.chat, e);
                    }
                }
            }
        }
        // Stream ended without a close event: treat as a transient drop
        Exit::Retry
    }
}
