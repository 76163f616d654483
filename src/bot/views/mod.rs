//! View layer for bot UI components
//!
//! Contains the texts and formatting for Telegram replies.

pub mod relay;

pub use relay::*;
