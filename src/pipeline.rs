//! Message Pipeline
//!
//! One inbound message flows through:
//! debounce → classify → select → reply (canned or AI) → alert / log.
//!
//! The pipeline owns every collaborator explicitly; nothing here is global.
//! The transport buffers each fragment with [`Pipeline::buffer_text`] as it
//! arrives, then spawns [`Pipeline::respond_to_turn`] and lets the debouncer
//! decide which task answers.

use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

use crate::channel::{Channel, TextFormat};
use crate::classifier::classify;
use crate::conversation_log::{extract_phone_number, ConversationLogger};
use crate::debounce::{Debouncer, DEFAULT_WAIT};
use crate::generator::{GeneratorConfig, ResponseGenerator};
use crate::llm::LanguageModel;
use crate::notifier::AdminNotifier;
use crate::selector::{select, ResponseBranch};
use crate::session::{SessionStore, UserId, DEFAULT_MAX_HISTORY};

/// Tunables for a pipeline instance
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Quiet period before a buffered turn is answered
    pub debounce_wait: Duration,
    /// Memory entries kept per user
    pub max_history: usize,
    pub admin_chat_id: Option<i64>,
    pub generator: GeneratorConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            debounce_wait: DEFAULT_WAIT,
            max_history: DEFAULT_MAX_HISTORY,
            admin_chat_id: None,
            generator: GeneratorConfig::default(),
        }
    }
}

/// A text fragment from a user
#[derive(Debug, Clone)]
pub struct InboundMessage {
    pub user_id: UserId,
    pub chat_id: i64,
    pub username: String,
    /// Phone number supplied by the platform, if any
    pub phone: Option<String>,
    pub text: String,
}

/// A downloaded photo from a user
#[derive(Debug, Clone)]
pub struct PhotoMessage {
    pub user_id: UserId,
    pub chat_id: i64,
    pub username: String,
    pub phone: Option<String>,
    pub caption: String,
    pub image: Vec<u8>,
}

/// What happened to one submitted fragment
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnOutcome {
    /// A newer fragment from the same user owns the reply
    Superseded,
    OffTopic,
    Emergency,
    Crisis,
    Answered(String),
}

impl TurnOutcome {
    pub fn reply(&self) -> Option<&str> {
        match self {
            Self::Answered(text) => Some(text),
            _ => None,
        }
    }
}

pub struct Pipeline {
    sessions: Arc<SessionStore>,
    debouncer: Debouncer,
    generator: ResponseGenerator,
    notifier: AdminNotifier,
    logger: ConversationLogger,
    channel: Arc<dyn Channel>,
}

impl Pipeline {
    pub fn new(
        channel: Arc<dyn Channel>,
        model: Arc<dyn LanguageModel>,
        logger: ConversationLogger,
        config: PipelineConfig,
    ) -> Self {
        let sessions = Arc::new(SessionStore::new(config.max_history));
        let debouncer = Debouncer::new(sessions.clone(), config.debounce_wait);
        let generator = ResponseGenerator::new(model, sessions.clone(), config.generator);
        let notifier = AdminNotifier::new(channel.clone(), config.admin_chat_id);

        Self {
            sessions,
            debouncer,
            generator,
            notifier,
            logger,
            channel,
        }
    }

    pub fn sessions(&self) -> &Arc<SessionStore> {
        &self.sessions
    }

    pub fn channel(&self) -> &Arc<dyn Channel> {
        &self.channel
    }

    pub fn is_ai_available(&self) -> bool {
        self.generator.is_available()
    }

    async fn send(&self, chat_id: i64, text: &str, format: TextFormat) {
        if let Err(e) = self.channel.send_text(chat_id, text, format).await {
            error!("Failed to send reply to chat {}: {}", chat_id, e);
        }
    }

    async fn typing(&self, chat_id: i64) {
        if let Err(e) = self.channel.send_typing(chat_id).await {
            warn!("Failed to send typing indicator to chat {}: {}", chat_id, e);
        }
    }

    /// Handle one text fragment end to end
    pub async fn handle_text(&self, msg: &InboundMessage) -> TurnOutcome {
        let generation = self.buffer_text(msg);
        self.respond_to_turn(msg, generation).await
    }

    /// Buffer a fragment in arrival order. Must run before the caller
    /// spawns or yields, so concurrent fragments keep their order.
    pub fn buffer_text(&self, msg: &InboundMessage) -> u64 {
        self.debouncer.push(msg.user_id, &msg.text)
    }

    /// Wait out the debounce window for a buffered fragment, then answer
    /// the combined turn unless a newer fragment took it over.
    pub async fn respond_to_turn(&self, msg: &InboundMessage, generation: u64) -> TurnOutcome {
        let decision = self.debouncer.wait_for_turn(msg.user_id, generation).await;
        if !decision.should_respond {
            return TurnOutcome::Superseded;
        }

        let turn = decision.combined_text;
        let preview: String = turn.chars().take(50).collect();
        info!(
            "Processing combined message from {} (ID: {}): {}...",
            msg.username, msg.user_id, preview
        );

        let branch = select(&classify(&turn));
        match branch {
            ResponseBranch::OffTopic => info!("Off-topic message detected from user {}", msg.user_id),
            ResponseBranch::Emergency => error!("EMERGENCY DETECTED from user {}", msg.user_id),
            ResponseBranch::Crisis => warn!("CRISIS DETECTED from user {}", msg.user_id),
            ResponseBranch::Ai => {}
        }

        if let Some(text) = branch.canned_text() {
            self.send(msg.chat_id, text, TextFormat::Formatted).await;
            if let Some(kind) = branch.alert() {
                self.notifier.notify(kind, &msg.username, msg.user_id, &turn).await;
            }
            return match branch {
                ResponseBranch::OffTopic => TurnOutcome::OffTopic,
                ResponseBranch::Emergency => TurnOutcome::Emergency,
                _ => TurnOutcome::Crisis,
            };
        }

        self.typing(msg.chat_id).await;
        let reply = self.generator.generate(&turn, msg.user_id).await;
        self.send(msg.chat_id, &reply, TextFormat::Plain).await;

        let phone = msg.phone.clone().or_else(|| extract_phone_number(&turn));
        self.logger
            .save(&msg.username, phone.as_deref(), &turn, &reply)
            .await;

        TurnOutcome::Answered(reply)
    }

    /// Handle a photo; returns the reply sent
    pub async fn handle_photo(&self, msg: &PhotoMessage) -> String {
        let preview: String = msg.caption.chars().take(50).collect();
        info!(
            "Photo from {} (ID: {}) with caption: {}...",
            msg.username,
            msg.user_id,
            if preview.is_empty() { "none" } else { preview.as_str() }
        );

        self.typing(msg.chat_id).await;
        let reply = self
            .generator
            .analyze_image(&msg.image, &msg.caption, msg.user_id)
            .await;
        self.send(msg.chat_id, &reply, TextFormat::Plain).await;

        let question = if msg.caption.is_empty() {
            "[Image sent]".to_string()
        } else {
            format!("[Image] {}", msg.caption)
        };
        let phone = msg
            .phone
            .clone()
            .or_else(|| extract_phone_number(&msg.caption));
        self.logger
            .save(&msg.username, phone.as_deref(), &question, &reply)
            .await;

        reply
    }
}
