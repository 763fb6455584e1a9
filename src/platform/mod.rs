pub mod telegram;

use chrono::{DateTime, Utc};

/// A message received from the platform. Ephemeral — lives for one
/// request-response cycle only.
#[derive(Debug, Clone)]
pub struct IncomingMessage {
    /// Platform-specific chat ID
    pub chat_id: i64,
    /// The message text
    pub text: String,
    /// When this process received the message
    pub received_at: DateTime<Utc>,
}
