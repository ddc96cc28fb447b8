//! Mirai - Mental Health Support Bot
//!
//! Telegram companion that answers emotional-support messages with short,
//! empathetic replies from a Groq-hosted model, and steers everything else
//! back on topic.
//!
//! # Features
//!
//! - **Debouncing**: rapid fragments from one user become a single turn
//! - **Pattern Classifier**: scope, crisis and emergency rule tables
//! - **Safety Replies**: fixed hotline and emergency texts plus admin alerts
//! - **Conversation Memory**: bounded per-user history for prompt context
//! - **Vision**: replies to shared photos using the caption and recent context
//! - **Conversation Log**: Google Sheets or local SQLite
//! - **Website**: static landing page served beside the bot
//!
//! # Architecture
//!
//! ```text
//! Telegram ──► Debouncer ──► Classifier ──► Selector ──┬── canned reply ──► Admin alert
//!                  │                                   │
//!                  └──── SessionStore ◄── Generator ◄──┘──► Groq API
//!                                            │
//!                                            └──► Conversation log (Sheets / SQLite)
//! ```

pub mod channel;
pub mod classifier;
pub mod config;
pub mod conversation_log;
pub mod debounce;
pub mod format;
pub mod generator;
pub mod llm;
pub mod notifier;
pub mod pipeline;
pub mod prompt;
pub mod responses;
pub mod selector;
pub mod session;
pub mod sheets;
pub mod telegram;
pub mod web;

pub use channel::{Channel, ChannelError, TextFormat};
pub use classifier::{classify, Classification};
pub use config::{Config, CredentialsSource};
pub use conversation_log::{ConversationLog, ConversationLogger, LogError, LogRecord, SqliteLog};
pub use debounce::{Debouncer, Decision};
pub use generator::{GeneratorConfig, ResponseGenerator};
pub use llm::{GroqClient, LanguageModel, LlmError};
pub use notifier::{AdminNotifier, AlertKind};
pub use pipeline::{InboundMessage, PhotoMessage, Pipeline, PipelineConfig, TurnOutcome};
pub use selector::{select, ResponseBranch};
pub use session::{MemoryEntry, Role, SessionStore, UserId};
pub use sheets::{ServiceAccountKey, SheetsLog};
pub use telegram::TelegramChannel;
pub use web::WebServer;
