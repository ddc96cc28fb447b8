//! Configuration management

use anyhow::{bail, Result};
use std::path::PathBuf;
use std::time::Duration;
use tracing::warn;

use crate::generator::GeneratorConfig;
use crate::llm::{DEFAULT_TEXT_MODEL, DEFAULT_VISION_MODEL, GROQ_API_URL};
use crate::pipeline::PipelineConfig;
use crate::session::DEFAULT_MAX_HISTORY;

/// Where the Google service account key comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialsSource {
    /// Path to a key file
    File(PathBuf),
    /// Raw or base64-encoded JSON held in the environment
    Inline(String),
}

/// Bot configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Telegram bot token (required)
    pub telegram_bot_token: String,

    /// Groq API key (optional - replies fall back to templates without it)
    pub groq_api_key: Option<String>,

    /// Chat completions endpoint
    pub groq_api_url: String,

    pub text_model: String,
    pub vision_model: String,

    /// Chat receiving crisis and emergency alerts
    pub admin_chat_id: Option<i64>,

    /// Google Sheet for the conversation log
    pub google_sheet_id: Option<String>,
    pub google_credentials: Option<CredentialsSource>,

    /// Local SQLite conversation log, used when no sheet is configured
    pub conversation_log_db: Option<PathBuf>,

    /// Static website port
    pub port: u16,
    pub website_dir: PathBuf,

    /// Debounce window
    pub message_wait: Duration,

    /// Minimum spacing between one user's model requests
    pub min_request_interval: Duration,

    /// Memory entries kept per user
    pub max_memory_length: usize,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from any key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let Some(telegram_bot_token) = var("TELEGRAM_BOT_TOKEN") else {
            bail!("TELEGRAM_BOT_TOKEN not found in environment variables");
        };

        let groq_api_key = var("GROQ_API_KEY");
        let groq_api_url = var("GROQ_API_URL").unwrap_or_else(|| GROQ_API_URL.to_string());
        let text_model = var("GROQ_MODEL_NAME").unwrap_or_else(|| DEFAULT_TEXT_MODEL.to_string());
        let vision_model = var("GROQ_VISION_MODEL").unwrap_or_else(|| DEFAULT_VISION_MODEL.to_string());

        let admin_chat_id = var("ADMIN_CHAT_ID").and_then(|v| match v.parse::<i64>() {
            Ok(id) => Some(id),
            Err(_) => {
                warn!("ADMIN_CHAT_ID is not a valid chat id: {}", v);
                None
            }
        });

        let google_sheet_id = var("GOOGLE_SHEET_ID");
        let google_credentials = var("GOOGLE_CREDENTIALS_JSON")
            .map(CredentialsSource::Inline)
            .or_else(|| var("GOOGLE_CREDENTIALS_PATH").map(|p| CredentialsSource::File(PathBuf::from(p))));

        let conversation_log_db = var("CONVERSATION_LOG_DB").map(PathBuf::from);

        let port = parse_or(&var, "PORT", 8080u16);
        let website_dir = var("WEBSITE_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("website"));

        let message_wait = Duration::from_secs(parse_or(&var, "MESSAGE_WAIT_SECS", 3u64));
        let min_request_interval = Duration::from_millis(parse_or(&var, "MIN_REQUEST_INTERVAL_MS", 1000u64));
        let max_memory_length = parse_or(&var, "MAX_MEMORY_LENGTH", DEFAULT_MAX_HISTORY).max(1);

        Ok(Self {
            telegram_bot_token,
            groq_api_key,
            groq_api_url,
            text_model,
            vision_model,
            admin_chat_id,
            google_sheet_id,
            google_credentials,
            conversation_log_db,
            port,
            website_dir,
            message_wait,
            min_request_interval,
            max_memory_length,
        })
    }

    pub fn generator_config(&self) -> GeneratorConfig {
        GeneratorConfig {
            text_model: self.text_model.clone(),
            vision_model: self.vision_model.clone(),
            min_request_interval: self.min_request_interval,
            ..Default::default()
        }
    }

    pub fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig {
            debounce_wait: self.message_wait,
            max_history: self.max_memory_length,
            admin_chat_id: self.admin_chat_id,
            generator: self.generator_config(),
        }
    }
}

fn parse_or<T, F>(var: &F, key: &str, default: T) -> T
where
    T: std::str::FromStr + std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match var(key) {
        Some(raw) => raw.parse().unwrap_or_else(|_| {
            warn!("Invalid {}={}, using default {}", key, raw, default);
            default
        }),
        None => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(pairs: &[(&str, &str)]) -> Result<Config> {
        let env: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| env.get(key).cloned())
    }

    #[test]
    fn test_missing_token_is_error() {
        assert!(load(&[]).is_err());
        assert!(load(&[("TELEGRAM_BOT_TOKEN", "  ")]).is_err());
    }

    #[test]
    fn test_defaults() {
        let config = load(&[("TELEGRAM_BOT_TOKEN", "123:abc")]).unwrap();
        assert_eq!(config.telegram_bot_token, "123:abc");
        assert_eq!(config.groq_api_key, None);
        assert_eq!(config.text_model, DEFAULT_TEXT_MODEL);
        assert_eq!(config.vision_model, DEFAULT_VISION_MODEL);
        assert_eq!(config.port, 8080);
        assert_eq!(config.website_dir, PathBuf::from("website"));
        assert_eq!(config.message_wait, Duration::from_secs(3));
        assert_eq!(config.min_request_interval, Duration::from_secs(1));
        assert_eq!(config.max_memory_length, DEFAULT_MAX_HISTORY);
        assert_eq!(config.google_credentials, None);
    }

    #[test]
    fn test_overrides() {
        let config = load(&[
            ("TELEGRAM_BOT_TOKEN", "t"),
            ("GROQ_API_KEY", "gsk_live"),
            ("GROQ_MODEL_NAME", "llama-3.1-8b-instant"),
            ("ADMIN_CHAT_ID", "-1001234"),
            ("PORT", "9000"),
            ("MESSAGE_WAIT_SECS", "5"),
            ("MAX_MEMORY_LENGTH", "4"),
            ("GOOGLE_CREDENTIALS_PATH", "creds.json"),
        ])
        .unwrap();

        assert_eq!(config.groq_api_key.as_deref(), Some("gsk_live"));
        assert_eq!(config.admin_chat_id, Some(-1001234));
        assert_eq!(config.port, 9000);
        assert_eq!(
            config.google_credentials,
            Some(CredentialsSource::File(PathBuf::from("creds.json")))
        );

        let pipeline = config.pipeline_config();
        assert_eq!(pipeline.debounce_wait, Duration::from_secs(5));
        assert_eq!(pipeline.max_history, 4);
        assert_eq!(pipeline.generator.text_model, "llama-3.1-8b-instant");
    }

    #[test]
    fn test_inline_credentials_win_over_path() {
        let config = load(&[
            ("TELEGRAM_BOT_TOKEN", "t"),
            ("GOOGLE_CREDENTIALS_JSON", "{}"),
            ("GOOGLE_CREDENTIALS_PATH", "creds.json"),
        ])
        .unwrap();
        assert_eq!(config.google_credentials, Some(CredentialsSource::Inline("{}".to_string())));
    }

    #[test]
    fn test_bad_numbers_fall_back() {
        let config = load(&[
            ("TELEGRAM_BOT_TOKEN", "t"),
            ("ADMIN_CHAT_ID", "not-a-number"),
            ("PORT", "eighty"),
        ])
        .unwrap();
        assert_eq!(config.admin_chat_id, None);
        assert_eq!(config.port, 8080);
    }
}
