//! Session Persistence
//!
//! Durable persistence for the chat client's login credentials. The client
//! owns a flat directory of small auth files; this module snapshots that
//! directory into a single `sessions` row (filename -> base64 content in a
//! jsonb column) and restores it on boot, so a redeployed daemon reconnects
//! without a new pairing flow.

pub mod store;
pub mod sync;

pub use store::{MemoryStore, PgStore, SessionSnapshot, SessionStore, StoreError};
pub use sync::{SessionSync, SyncError};
