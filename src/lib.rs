#![deny(missing_docs)]
//! Oxide Media Relay
//!
//! A Telegram bot that watches chats for social-media links, downloads the
//! referenced media through `yt-dlp` or a Cobalt resolver, and relays the
//! file back into the chat.

/// Telegram bot implementation
pub mod bot;
/// Configuration management
pub mod config;
/// Link classification, resolver client and download backends
pub mod media;
/// Telegram runtime entrypoint
pub mod runner;
pub mod utils;
