//! Telegram Bot integration for Mirai
//!
//! Long-polls Telegram and hands every update to the [`Pipeline`] on its
//! own task. The dispatcher serialises updates per chat, so waiting inside
//! the handler would hold a user's later fragments behind the debounce
//! window. Text is buffered in the handler itself, in arrival order, and
//! only the wait and reply run on the spawned task.
//!
//! Uses explicit Dispatcher pattern for reliable message polling.

use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;
use teloxide::{
    dispatching::{Dispatcher, UpdateFilterExt},
    dptree,
    error_handlers::LoggingErrorHandler,
    net::Download,
    prelude::*,
    types::{ChatAction, ParseMode, PhotoSize, Update, User},
};

use crate::channel::{chunk_message, Channel, ChannelError, TextFormat};
use crate::format::{markdown_to_telegram_html, strip_markup};
use crate::pipeline::{InboundMessage, PhotoMessage, Pipeline};
use crate::responses::{HELP_MESSAGE, IMAGE_ERROR_RESPONSE, RESOURCES_MESSAGE, WELCOME_MESSAGE};
use crate::session::UserId;

/// Telegram rejects messages over 4096 chars; leave headroom for markup
const MAX_MESSAGE_CHARS: usize = 4000;

/// Outbound side of the bot
#[derive(Clone)]
pub struct TelegramChannel {
    bot: Bot,
}

impl TelegramChannel {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }

    async fn send_plain(&self, chat_id: ChatId, text: &str) -> Result<(), ChannelError> {
        for chunk in chunk_message(text, MAX_MESSAGE_CHARS) {
            self.bot
                .send_message(chat_id, chunk)
                .await
                .map_err(|e| ChannelError::SendFailed(e.to_string()))?;
        }
        Ok(())
    }
}

#[async_trait]
impl Channel for TelegramChannel {
    fn name(&self) -> &str {
        "telegram"
    }

    async fn send_text(&self, chat_id: i64, text: &str, format: TextFormat) -> Result<(), ChannelError> {
        let chat_id = ChatId(chat_id);

        if format == TextFormat::Plain {
            return self.send_plain(chat_id, text).await;
        }

        let html = markdown_to_telegram_html(text);
        if html.len() <= MAX_MESSAGE_CHARS {
            // Try HTML first, fall back to plain text if it fails
            match self.bot.send_message(chat_id, &html).parse_mode(ParseMode::Html).await {
                Ok(_) => return Ok(()),
                Err(e) => tracing::warn!("HTML send failed ({}), retrying as plain text", e),
            }
        }

        // Splitting could break tags, so long texts go out plain
        self.send_plain(chat_id, &strip_markup(text)).await
    }

    async fn send_typing(&self, chat_id: i64) -> Result<(), ChannelError> {
        self.bot
            .send_chat_action(ChatId(chat_id), ChatAction::Typing)
            .await
            .map_err(|e| ChannelError::SendFailed(e.to_string()))?;
        Ok(())
    }
}

/// Run the Telegram bot with explicit Dispatcher for reliable polling
pub async fn run_bot(bot: Bot, pipeline: Arc<Pipeline>) -> Result<()> {
    // Verify bot token by calling getMe
    tracing::info!("Verifying bot token...");
    match bot.get_me().await {
        Ok(me) => {
            tracing::info!(
                "Bot authenticated: @{} (ID: {})",
                me.username.as_deref().unwrap_or("unknown"),
                me.id
            );
        }
        Err(e) => {
            tracing::error!("Failed to authenticate bot: {}", e);
            anyhow::bail!("Bot authentication failed: {}", e);
        }
    }

    // Delete any existing webhook to ensure polling works
    if let Err(e) = bot.delete_webhook().await {
        tracing::warn!("Failed to delete webhook: {} (continuing anyway)", e);
    }

    if pipeline.is_ai_available() {
        tracing::info!("Groq API configured");
    } else {
        tracing::warn!("GROQ_API_KEY not set, replies will use fallback templates");
    }

    let handler = dptree::entry().branch(Update::filter_message().endpoint(message_handler));

    tracing::info!("Bot is running! Press Ctrl+C to stop.");

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![pipeline])
        .default_handler(|upd| async move {
            tracing::debug!("Unhandled update: {:?}", upd);
        })
        .error_handler(LoggingErrorHandler::with_custom_text(
            "Error in message handler",
        ))
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    tracing::warn!("Dispatcher stopped");
    Ok(())
}

/// Message handler endpoint for the dispatcher
async fn message_handler(bot: Bot, msg: Message, pipeline: Arc<Pipeline>) -> ResponseResult<()> {
    let user_id = msg.from.as_ref().map(|u| u.id.0).unwrap_or(0);
    tracing::debug!("Message received: user={}, chat={}", user_id, msg.chat.id.0);

    // Buffer text before spawning so fragments keep arrival order
    if let Some(inbound) = inbound_text(&msg) {
        let generation = pipeline.buffer_text(&inbound);
        tokio::spawn(async move {
            pipeline.respond_to_turn(&inbound, generation).await;
        });
        return Ok(());
    }

    tokio::spawn(async move {
        if let Err(e) = handle_message(bot, msg, pipeline).await {
            tracing::error!("Error handling message: {}", e);
        }
    });

    Ok(())
}

/// A plain (non-command) text message from a known user
fn inbound_text(msg: &Message) -> Option<InboundMessage> {
    let user = msg.from.as_ref()?;
    let text = msg.text().filter(|t| !t.starts_with('/'))?;
    Some(InboundMessage {
        user_id: UserId(user.id.0 as i64),
        chat_id: msg.chat.id.0,
        username: display_name(user),
        phone: None,
        text: text.to_string(),
    })
}

/// Commands and photos
async fn handle_message(bot: Bot, msg: Message, pipeline: Arc<Pipeline>) -> Result<()> {
    let Some(user) = msg.from.as_ref() else {
        return Ok(());
    };
    let user_id = UserId(user.id.0 as i64);
    let chat_id = msg.chat.id.0;
    let username = display_name(user);

    if let Some(text) = msg.text() {
        if text.starts_with('/') {
            return handle_command(&pipeline, chat_id, text).await;
        }
        return Ok(());
    }

    if let Some(photo) = msg.photo().and_then(|photos| photos.last()) {
        let caption = msg.caption().unwrap_or_default().to_string();

        let image = match download_photo(&bot, photo).await {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::error!("Error handling photo: {}", e);
                pipeline
                    .channel()
                    .send_text(chat_id, IMAGE_ERROR_RESPONSE, TextFormat::Plain)
                    .await?;
                return Ok(());
            }
        };

        let photo_msg = PhotoMessage {
            user_id,
            chat_id,
            username,
            phone: None,
            caption,
            image,
        };
        pipeline.handle_photo(&photo_msg).await;
    }

    Ok(())
}

/// Download the largest photo size into memory
async fn download_photo(bot: &Bot, photo: &PhotoSize) -> Result<Vec<u8>> {
    let file = bot.get_file(&photo.file.id).await?;
    let mut dst = Vec::new();
    bot.download_file(&file.path, &mut dst).await?;
    Ok(dst)
}

async fn handle_command(pipeline: &Pipeline, chat_id: i64, text: &str) -> Result<()> {
    let reply = match command_name(text) {
        Some("start") => WELCOME_MESSAGE,
        Some("help") => HELP_MESSAGE,
        Some("resources") => RESOURCES_MESSAGE,
        other => {
            tracing::debug!("Ignoring unknown command: {:?}", other);
            return Ok(());
        }
    };

    pipeline
        .channel()
        .send_text(chat_id, reply, TextFormat::Formatted)
        .await?;
    Ok(())
}

/// `/start@MiraiBot now` → `start`
fn command_name(text: &str) -> Option<&str> {
    let first = text.split_whitespace().next()?.strip_prefix('/')?;
    let name = first.split('@').next().unwrap_or(first);
    (!name.is_empty()).then_some(name)
}

fn display_name(user: &User) -> String {
    user.username
        .clone()
        .unwrap_or_else(|| user.first_name.clone())
}
