//! Command Dispatcher
//!
//! Prefix commands answered from an editable response table, plus a welcome
//! auto-reply for direct chats. Pure functions over the incoming message so
//! the whole surface is testable without a transport.

use crate::client::IncomingMessage;
use crate::config::BotConfig;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Canned response strings, editable at runtime through the HTTP surface.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ResponseTable {
    pub welcome: String,
    pub help: String,
    pub ping: String,
    pub info: String,
    pub unknown: String,
    pub not_authorized: String,
}

impl Default for ResponseTable {
    fn default() -> Self {
        Self {
            welcome: "Hello! I am a WhatsApp bot. Type !help for commands.".to_string(),
            help: "Available commands:\n\
                   !help - Show this help message\n\
                   !ping - Check if bot is online\n\
                   !echo <message> - Echo your message\n\
                   !time - Get current time\n\
                   !info - Get bot information\n\
                   !status - Bot status (owner only)"
                .to_string(),
            ping: "Pong! Bot is online".to_string(),
            info: "I am a WhatsApp bot written in Rust.".to_string(),
            unknown: "Unknown command. Type !help for available commands.".to_string(),
            not_authorized: "You are not authorized to use this command.".to_string(),
        }
    }
}

/// Whether the sender is the configured owner. The sender is a JID like
/// "1234567890@s.whatsapp.net"; matching on containment mirrors how loosely
/// owner numbers tend to be configured (with or without country prefix).
fn is_owner(config: &BotConfig, sender: &str) -> bool {
    config
        .owner_number
        .as_deref()
        .is_some_and(|owner| !owner.is_empty() && sender.contains(owner.trim_start_matches('+')))
}

/// Compute the reply for an incoming message, if any.
///
/// Returns `None` for the bot's own echoes, group chatter without the
/// prefix, and plain messages that don't trigger the welcome reply.
pub fn build_reply(
    table: &ResponseTable,
    config: &BotConfig,
    msg: &IncomingMessage,
    uptime: Duration,
) -> Option<String> {
    if msg.from_me {
        return None;
    }

    let text = msg.text.trim();
    if text.is_empty() {
        return None;
    }

    let Some(rest) = text.strip_prefix(config.prefix.as_str()) else {
        // Welcome auto-reply for direct chats only
        if !msg.is_group && text.to_lowercase().contains("hello") {
            return Some(table.welcome.clone());
        }
        return None;
    };

    let mut parts = rest.trim().split_whitespace();
    let command = parts.next()?.to_lowercase();
    let args: Vec<&str> = parts.collect();

    let reply = match command.as_str() {
        "help" => table.help.clone(),
        "ping" => table.ping.clone(),
        "echo" => {
            if args.is_empty() {
                "Please provide a message to echo.".to_string()
            } else {
                args.join(" ")
            }
        }
        "time" => format!(
            "Current time: {}",
            chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
        ),
        "info" => format!("{} — {}", config.name, table.info),
        "status" => {
            if is_owner(config, &msg.sender) {
                let mut reply =
                    format!("Bot Status: Online\nUptime: {} seconds", uptime.as_secs());
                if let Some(rss) = crate::bot::rss_bytes() {
                    reply.push_str(&format!("\nMemory: {} MB", rss / (1024 * 1024)));
                }
                reply
            } else {
                table.not_authorized.clone()
            }
        }
        _ => table.unknown.clone(),
    };
    Some(reply)
}
