/// Command and text message handlers
pub mod handlers;
/// Link download and video relay flow
pub mod relay;
/// Telegram API calls with retry
pub mod resilient;
/// User-facing texts
pub mod views;
