//! Conversation Log
//!
//! Best-effort record of answered turns (username, phone, question,
//! answer). Sinks implement [`ConversationLog`]; the pipeline only sees
//! [`ConversationLogger::save`], which never fails and never blocks longer
//! than its timeout.
//!
//! Two sinks ship with the bot:
//! - [`crate::sheets::SheetsLog`] appends rows to a Google Sheet
//! - [`SqliteLog`] writes to a local SQLite file

use anyhow::Result;
use async_trait::async_trait;
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use regex::Regex;
use rusqlite::{params, Connection};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info};

/// Max chars of the user's question stored
pub const MAX_QUESTION_CHARS: usize = 500;

/// Max chars of the bot's answer stored
pub const MAX_ANSWER_CHARS: usize = 1000;

const SAVE_TIMEOUT: Duration = Duration::from_secs(10);

/// Error types for log sinks
#[derive(Debug, thiserror::Error)]
pub enum LogError {
    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error {status}: {body}")]
    Api { status: u16, body: String },

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Invalid credentials: {0}")]
    Credentials(String),

    #[error("Background write failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// One logged exchange, already truncated to the storage ceilings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogRecord {
    pub username: String,
    pub phone: Option<String>,
    pub question: String,
    pub answer: String,
}

impl LogRecord {
    pub fn new(username: &str, phone: Option<&str>, question: &str, answer: &str) -> Self {
        let username = if username.trim().is_empty() { "Unknown" } else { username };
        Self {
            username: username.to_string(),
            phone: phone.map(|p| p.to_string()),
            question: truncate_chars(question, MAX_QUESTION_CHARS),
            answer: truncate_chars(answer, MAX_ANSWER_CHARS),
        }
    }
}

/// Storage backend for logged exchanges
#[async_trait]
pub trait ConversationLog: Send + Sync {
    fn name(&self) -> &str;

    async fn append(&self, record: &LogRecord) -> Result<(), LogError>;
}

/// Front for the configured sink. Swallows and logs every failure.
#[derive(Clone, Default)]
pub struct ConversationLogger {
    sink: Option<Arc<dyn ConversationLog>>,
}

impl ConversationLogger {
    pub fn new(sink: Arc<dyn ConversationLog>) -> Self {
        Self { sink: Some(sink) }
    }

    pub fn disabled() -> Self {
        Self { sink: None }
    }

    pub fn is_enabled(&self) -> bool {
        self.sink.is_some()
    }

    /// Save an exchange. Returns whether it was stored.
    pub async fn save(&self, username: &str, phone: Option<&str>, question: &str, answer: &str) -> bool {
        let Some(sink) = &self.sink else {
            return false;
        };

        let record = LogRecord::new(username, phone, question, answer);
        match tokio::time::timeout(SAVE_TIMEOUT, sink.append(&record)).await {
            Ok(Ok(())) => {
                info!("Saved conversation to {}: {}", sink.name(), record.username);
                true
            }
            Ok(Err(e)) => {
                error!("Failed to save to {}: {}", sink.name(), e);
                false
            }
            Err(_) => {
                error!("Failed to save to {}: timed out after {:?}", sink.name(), SAVE_TIMEOUT);
                false
            }
        }
    }
}

/// Truncate to at most `max` chars (UTF-8 safe)
pub fn truncate_chars(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((idx, _)) => s[..idx].to_string(),
        None => s.to_string(),
    }
}

static PHONE_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"\+?\d{1,3}[-.\s]?\(?\d{3}\)?[-.\s]?\d{3}[-.\s]?\d{4}", // +1-555-123-4567
        r"\+?\d{10,13}",                                        // +919876543210
        r"\(?\d{3}\)?[-.\s]?\d{3}[-.\s]?\d{4}",                 // (555) 123-4567
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

static PHONE_SEPARATORS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[-.\s()]").unwrap());

/// Find a phone number in free text, normalised to digits and `+`
pub fn extract_phone_number(text: &str) -> Option<String> {
    PHONE_PATTERNS
        .iter()
        .find_map(|re| re.find(text))
        .map(|m| PHONE_SEPARATORS.replace_all(m.as_str(), "").into_owned())
}

/// Local SQLite sink
pub struct SqliteLog {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteLog {
    /// Open or create the log database
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS conversation_log (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                username TEXT NOT NULL,
                phone TEXT,
                question TEXT NOT NULL,
                answer TEXT NOT NULL,
                timestamp INTEGER NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_conversation_log_username
                ON conversation_log(username);
            "#,
        )?;

        info!("Conversation log opened: {}", path.display());
        Ok(Self { conn: Arc::new(Mutex::new(conn)) })
    }

    /// Most recent records, newest last
    pub fn recent(&self, limit: usize) -> Result<Vec<LogRecord>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT username, phone, question, answer FROM conversation_log
             ORDER BY id DESC
             LIMIT ?1",
        )?;

        let mut records: Vec<LogRecord> = stmt
            .query_map(params![limit as i64], |row| {
                Ok(LogRecord {
                    username: row.get(0)?,
                    phone: row.get(1)?,
                    question: row.get(2)?,
                    answer: row.get(3)?,
                })
            })?
            .filter_map(|r| r.ok())
            .collect();

        records.reverse();
        Ok(records)
    }

    pub fn count(&self) -> Result<usize> {
        let conn = self.conn.lock();
        let n: i64 = conn.query_row("SELECT COUNT(*) FROM conversation_log", [], |row| row.get(0))?;
        Ok(n as usize)
    }
}

#[async_trait]
impl ConversationLog for SqliteLog {
    fn name(&self) -> &str {
        "sqlite"
    }

    async fn append(&self, record: &LogRecord) -> Result<(), LogError> {
        // The insert blocks; keep it and the lock off the async workers
        let conn = self.conn.clone();
        let record = record.clone();
        let timestamp = chrono::Utc::now().timestamp_millis();

        tokio::task::spawn_blocking(move || -> Result<(), LogError> {
            conn.lock().execute(
                "INSERT INTO conversation_log (username, phone, question, answer, timestamp)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    record.username,
                    record.phone,
                    record.question,
                    record.answer,
                    timestamp
                ],
            )?;
            debug!("Logged exchange for {}", record.username);
            Ok(())
        })
        .await?
    }
}
