//! Wacrab - WhatsApp Chat-Bot Daemon
//!
//! A single-process WhatsApp bot that delegates the wire protocol to an
//! external client library and focuses on the machinery around it:
//!
//! - **Session persistence:** the client's flat auth directory is snapshotted
//!   to a Postgres row (base64-encoded files in a jsonb column) on every
//!   credential rotation, and restored from it on boot.
//! - **Reconnect supervision:** unbounded retries on transient disconnects,
//!   terminal stop on logout until an operator reset.
//! - **Command dispatch:** prefix commands (`!help`, `!ping`, ...) answered
//!   from an editable response table.
//! - **HTTP control surface:** status, pairing QR, send-message, reset and
//!   response-table endpoints for the operator.
//!
//! ## Quick Start
//!
//! ```bash
//! # Run against Postgres (connection parameters from the environment)
//! PGHOST=localhost PGDATABASE=wacrab wacrab
//!
//! # Run without a database (sessions kept in memory)
//! wacrab --debug
//! ```

pub mod api;
pub mod bot;
pub mod cli;
pub mod client;
pub mod config;
pub mod keepalive;
pub mod logging;
pub mod session;

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");
