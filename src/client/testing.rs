//! Scripted client doubles for exercising the supervisor and HTTP handlers.

use super::{ChatClient, ClientError, ClientEvent, ClientFactory, Connection};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};

/// Client that records outgoing calls instead of sending anything.
#[derive(Default)]
pub struct RecordingClient {
    pub sent: Mutex<Vec<(String, String)>>,
    pub logouts: AtomicUsize,
    pub fail_sends: bool,
}

impl RecordingClient {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            fail_sends: true,
            ..Self::default()
        })
    }
}

#[async_trait]
impl ChatClient for RecordingClient {
    async fn send_text(&self, chat: &str, text: &str) -> Result<(), ClientError> {
        if self.fail_sends {
            return Err(ClientError::Transport("scripted send failure".into()));
        }
        self.sent
            .lock()
            .await
            .push((chat.to_string(), text.to_string()));
        Ok(())
    }

    async fn logout(&self) -> Result<(), ClientError> {
        self.logouts.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// One scripted connection: a fixed event sequence played into the channel.
/// With `keep_open` the channel stays open after the last event, simulating
/// a live connection that has gone quiet.
pub struct Script {
    pub events: Vec<ClientEvent>,
    pub keep_open: bool,
    pub client: Arc<RecordingClient>,
}

impl Script {
    pub fn new(events: Vec<ClientEvent>) -> Self {
        Self {
            events,
            keep_open: false,
            client: RecordingClient::new(),
        }
    }

    pub fn keep_open(mut self) -> Self {
        self.keep_open = true;
        self
    }

    pub fn with_client(mut self, client: Arc<RecordingClient>) -> Self {
        self.client = client;
        self
    }
}

/// Factory serving a queue of scripts. When the queue runs dry, `connect`
/// pends forever so a supervisor loop under test cannot spin.
#[derive(Default)]
pub struct ScriptedFactory {
    scripts: Mutex<VecDeque<Result<Script, ClientError>>>,
    /// Keeps `keep_open` channels alive for the life of the factory.
    held_senders: Mutex<Vec<mpsc::Sender<ClientEvent>>>,
    pub connects: AtomicUsize,
    /// Auth-dir file listing captured at each connect, oldest first.
    pub auth_files_at_connect: Mutex<Vec<Vec<String>>>,
}

impl ScriptedFactory {
    pub fn new(scripts: Vec<Result<Script, ClientError>>) -> Arc<Self> {
        Arc::new(Self {
            scripts: Mutex::new(scripts.into_iter().collect()),
            ..Self::default()
        })
    }

    /// Feed a late event into the most recent `keep_open` connection.
    pub async fn push_event(&self, event: ClientEvent) {
        let senders = self.held_senders.lock().await;
        let tx = senders.last().expect("no open scripted connection");
        tx.send(event).await.expect("scripted connection closed");
    }

    fn list_files(dir: &Path) -> Vec<String> {
        let Ok(entries) = std::fs::read_dir(dir) else {
            return Vec::new();
        };
        let mut names: Vec<String> = entries
            .filter_map(|e| e.ok())
            .map(|e| e.file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }
}

#[async_trait]
impl ClientFactory for ScriptedFactory {
    async fn connect(&self, auth_dir: &Path) -> Result<Connection, ClientError> {
        let script = self.scripts.lock().await.pop_front();
        let Some(script) = script else {
            std::future::pending::<()>().await;
            unreachable!()
        };
        self.connects.fetch_add(1, Ordering::SeqCst);
        self.auth_files_at_connect
            .lock()
            .await
            .push(Self::list_files(auth_dir));

        let script = script?;
        let (tx, rx) = mpsc::channel(script.events.len().max(1));
        for event in script.events {
            let _ = tx.send(event).await;
        }
        if script.keep_open {
            self.held_senders.lock().await.push(tx);
        }
        Ok(Connection {
            client: script.client,
            events: rx,
        })
    }
}
