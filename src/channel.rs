//! Outbound Messaging
//!
//! The narrow interface the pipeline uses to talk back to users and to the
//! admin chat. Telegram implements it in [`crate::telegram`]; tests use an
//! in-memory recorder.

use async_trait::async_trait;

/// Error types for channel operations
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    #[error("Send failed: {0}")]
    SendFailed(String),
}

/// How a text should be rendered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextFormat {
    /// Sent verbatim
    #[default]
    Plain,
    /// `**bold**` markup, rendered by the channel
    Formatted,
}

/// Sending side of a chat platform
#[async_trait]
pub trait Channel: Send + Sync {
    /// Channel name identifier
    fn name(&self) -> &str;

    /// Send a text message to a chat
    async fn send_text(&self, chat_id: i64, text: &str, format: TextFormat) -> Result<(), ChannelError>;

    /// Show the typing indicator
    async fn send_typing(&self, chat_id: i64) -> Result<(), ChannelError>;
}

/// Split text into chunks of at most `max` bytes on char boundaries
pub fn chunk_message(text: &str, max: usize) -> Vec<&str> {
    let mut chunks = Vec::new();
    let mut remaining = text;
    while !remaining.is_empty() {
        let split_at = remaining
            .char_indices()
            .take_while(|(i, c)| i + c.len_utf8() <= max)
            .last()
            .map(|(i, c)| i + c.len_utf8())
            .unwrap_or_else(|| remaining.chars().next().map(|c| c.len_utf8()).unwrap_or(remaining.len()));
        let (chunk, rest) = remaining.split_at(split_at);
        chunks.push(chunk);
        remaining = rest;
    }
    chunks
}
