//! Stdio Transport
//!
//! Development transport: each stdin line arrives as an operator message and
//! replies are printed to stdout. Lets the whole daemon (dispatch, HTTP
//! surface, session machinery) run without a paired WhatsApp account. The
//! production transport plugs into the same [`ClientFactory`] seam.

use super::{
    ChatClient, ClientError, ClientEvent, ClientFactory, Connection, ConnectionState,
    IncomingMessage,
};
use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

const OPERATOR_CHAT: &str = "operator@stdio";

pub struct StdioFactory;

#[async_trait]
impl ClientFactory for StdioFactory {
    async fn connect(&self, _auth_dir: &Path) -> Result<Connection, ClientError> {
        let (tx, rx) = mpsc::channel(32);

        let _ = tx
            .send(ClientEvent::ConnectionStateChanged(ConnectionState::Open))
            .await;

        let reader_tx = tx.clone();
        tokio::spawn(async move {
            let mut lines = BufReader::new(tokio::io::stdin()).lines();
            loop {
                match lines.next_line().await {
                    Ok(Some(line)) => {
                        let text = line.trim().to_string();
                        if text.is_empty() {
                            continue;
                        }
                        let event = ClientEvent::MessageReceived(IncomingMessage {
                            chat: OPERATOR_CHAT.to_string(),
                            sender: OPERATOR_CHAT.to_string(),
                            text,
                            from_me: false,
                            is_group: false,
                        });
                        if reader_tx.send(event).await.is_err() {
                            break;
                        }
                    }
                    // EOF or a read error ends the session for good; there is
                    // no terminal left to reconnect to.
                    Ok(None) | Err(_) => {
                        let _ = reader_tx
                            .send(ClientEvent::ConnectionStateChanged(
                                ConnectionState::Closed { logged_out: true },
                            ))
                            .await;
                        break;
                    }
                }
            }
        });

        Ok(Connection {
            client: Arc::new(StdioClient { events: tx }),
            events: rx,
        })
    }
}

pub struct StdioClient {
    events: mpsc::Sender<ClientEvent>,
}

#[async_trait]
impl ChatClient for StdioClient {
    async fn send_text(&self, chat: &str, text: &str) -> Result<(), ClientError> {
        println!("[{}] {}", chat, text);
        Ok(())
    }

    async fn logout(&self) -> Result<(), ClientError> {
        self.events
            .send(ClientEvent::ConnectionStateChanged(
                ConnectionState::Closed { logged_out: true },
            ))
            .await
            .map_err(|_| ClientError::NotConnected)
    }
}
