//! Admin Notifier
//!
//! Best-effort alert to an operator chat when a crisis or emergency is
//! detected. Failures are logged and swallowed; the user's reply never
//! depends on this succeeding.

use chrono::{DateTime, Local};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

use crate::channel::{Channel, TextFormat};
use crate::session::UserId;

/// Characters of the user's message included in an alert
const ALERT_PREVIEW_CHARS: usize = 200;

const SEND_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertKind {
    Emergency,
    Crisis,
}

impl AlertKind {
    pub fn title(&self) -> &'static str {
        match self {
            Self::Emergency => "🚨 **EMERGENCY ALERT**",
            Self::Crisis => "⚠️ **CRISIS ALERT**",
        }
    }
}

/// Build the alert text
pub fn format_alert(
    kind: AlertKind,
    username: &str,
    user: UserId,
    at: DateTime<Local>,
    message: &str,
) -> String {
    let preview: String = message.chars().take(ALERT_PREVIEW_CHARS).collect();
    format!(
        "{}\n\nUser: {} (ID: {})\nTime: {}\nMessage: {}",
        kind.title(),
        username,
        user,
        at.format("%Y-%m-%d %H:%M:%S"),
        preview
    )
}

/// Sends alerts to the configured admin chat, if any
pub struct AdminNotifier {
    channel: Arc<dyn Channel>,
    admin_chat_id: Option<i64>,
}

impl AdminNotifier {
    pub fn new(channel: Arc<dyn Channel>, admin_chat_id: Option<i64>) -> Self {
        Self { channel, admin_chat_id }
    }

    /// Send an alert. Returns whether it was delivered.
    pub async fn notify(&self, kind: AlertKind, username: &str, user: UserId, message: &str) -> bool {
        let Some(admin_chat) = self.admin_chat_id else {
            return false;
        };

        let text = format_alert(kind, username, user, Local::now(), message);
        let send = self.channel.send_text(admin_chat, &text, TextFormat::Formatted);

        match tokio::time::timeout(SEND_TIMEOUT, send).await {
            Ok(Ok(())) => {
                info!("Admin alert ({:?}) sent for user {}", kind, user);
                true
            }
            Ok(Err(e)) => {
                error!("Failed to send admin alert: {}", e);
                false
            }
            Err(_) => {
                error!("Failed to send admin alert: timed out after {:?}", SEND_TIMEOUT);
                false
            }
        }
    }
}
