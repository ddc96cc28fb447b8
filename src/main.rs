//! Mirai Bot - Entry Point
//!
//! Starts the static website on a background task, then runs the Telegram
//! bot until Ctrl+C.

use mirai_bot::{
    Config, ConversationLogger, CredentialsSource, GroqClient, Pipeline, ServiceAccountKey,
    SheetsLog, SqliteLog, TelegramChannel, WebServer,
};
use std::sync::Arc;
use teloxide::Bot;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment
    dotenvy::dotenv().ok();

    let args: Vec<String> = std::env::args().collect();
    if args.iter().any(|a| a == "--help" || a == "-h") {
        print_help();
        return Ok(());
    }

    init_logging()?;

    info!("Mirai Bot v{}", env!("CARGO_PKG_VERSION"));

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("{}", e);
            return Err(e);
        }
    };

    let web = WebServer::new(config.port, config.website_dir.clone());
    tokio::spawn(async move {
        if let Err(e) = web.run().await {
            error!("Web server stopped: {:#}", e);
        }
    });

    let bot = Bot::new(config.telegram_bot_token.clone());
    let channel = Arc::new(TelegramChannel::new(bot.clone()));
    let model = Arc::new(GroqClient::from_config(&config));
    let logger = build_conversation_logger(&config).await;

    if config.admin_chat_id.is_some() {
        info!("Admin alerts enabled");
    }

    let pipeline = Arc::new(Pipeline::new(channel, model, logger, config.pipeline_config()));

    mirai_bot::telegram::run_bot(bot, pipeline).await
}

fn init_logging() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let json = std::env::var("LOG_FORMAT").map(|v| v == "json").unwrap_or(false);

    if json {
        let subscriber = FmtSubscriber::builder()
            .with_env_filter(filter)
            .with_ansi(false)
            .json()
            .finish();
        tracing::subscriber::set_global_default(subscriber)?;
    } else {
        let subscriber = FmtSubscriber::builder()
            .with_env_filter(filter)
            .with_ansi(true)
            .finish();
        tracing::subscriber::set_global_default(subscriber)?;
    }

    Ok(())
}

/// Pick the conversation log sink: Google Sheets, then SQLite, else none
async fn build_conversation_logger(config: &Config) -> ConversationLogger {
    if let (Some(sheet_id), Some(source)) = (&config.google_sheet_id, &config.google_credentials) {
        let key = match source {
            CredentialsSource::File(path) => ServiceAccountKey::from_file(path),
            CredentialsSource::Inline(value) => ServiceAccountKey::from_env_value(value),
        };

        match key {
            Ok(key) => {
                let sheets = SheetsLog::new(key, sheet_id);
                match sheets.connect().await {
                    Ok(()) => return ConversationLogger::new(Arc::new(sheets)),
                    Err(e) => warn!("Google Sheets unavailable: {}", e),
                }
            }
            Err(e) => warn!("Google Sheets credentials not usable: {}", e),
        }
    } else if config.google_sheet_id.is_some() {
        warn!("GOOGLE_SHEET_ID set without GOOGLE_CREDENTIALS_PATH or GOOGLE_CREDENTIALS_JSON");
    }

    if let Some(path) = &config.conversation_log_db {
        match SqliteLog::open(path) {
            Ok(log) => return ConversationLogger::new(Arc::new(log)),
            Err(e) => warn!("Failed to open conversation log {}: {:#}", path.display(), e),
        }
    }

    info!("Conversation logging disabled");
    ConversationLogger::disabled()
}

fn print_help() {
    println!("Mirai Bot v{}", env!("CARGO_PKG_VERSION"));
    println!();
    println!("Usage: mirai-bot [--help]");
    println!();
    println!("Environment variables:");
    println!("  TELEGRAM_BOT_TOKEN       Telegram bot token (required)");
    println!("  GROQ_API_KEY             Groq API key (fallback replies without it)");
    println!("  GROQ_MODEL_NAME          Text model (default: llama-3.3-70b-versatile)");
    println!("  GROQ_VISION_MODEL        Vision model (default: meta-llama/llama-4-scout-17b-16e-instruct)");
    println!("  GROQ_API_URL             Chat completions endpoint");
    println!("  ADMIN_CHAT_ID            Chat receiving crisis/emergency alerts");
    println!("  GOOGLE_SHEET_ID          Spreadsheet for the conversation log");
    println!("  GOOGLE_CREDENTIALS_PATH  Service account key file");
    println!("  GOOGLE_CREDENTIALS_JSON  Service account key (raw or base64 JSON)");
    println!("  CONVERSATION_LOG_DB      SQLite conversation log (used without a sheet)");
    println!("  PORT                     Website port (default: 8080)");
    println!("  WEBSITE_DIR              Website directory (default: website)");
    println!("  MESSAGE_WAIT_SECS        Debounce window (default: 3)");
    println!("  MIN_REQUEST_INTERVAL_MS  Per-user model request spacing (default: 1000)");
    println!("  MAX_MEMORY_LENGTH        Memory entries per user (default: 16)");
    println!("  RUST_LOG                 Log filter (default: info)");
    println!("  LOG_FORMAT               Set to 'json' for JSON logs");
}
