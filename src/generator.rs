//! AI Response Generator
//!
//! Builds prompts from conversation memory, spaces out each user's requests,
//! and calls the language model. Every failure degrades to a canned reply:
//! nothing in here returns an error to the caller.

use base64::Engine;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use crate::llm::{ChatMessage, CompletionRequest, LanguageModel, LlmError, DEFAULT_TEXT_MODEL, DEFAULT_VISION_MODEL};
use crate::prompt::{image_memory_note, vision_prompt, SYSTEM_PROMPT};
use crate::responses::{fallback_response, image_caption_fallback, IMAGE_UNAVAILABLE_RESPONSE};
use crate::session::{MemoryEntry, Role, SessionStore, UserId};

/// Generator configuration
#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    pub text_model: String,
    pub vision_model: String,
    /// Minimum spacing between one user's model requests
    pub min_request_interval: Duration,
    /// History entries sent with a text request
    pub context_window: usize,
    /// History entries scanned for vision context
    pub vision_context_window: usize,
    pub text_timeout: Duration,
    pub vision_timeout: Duration,
    pub text_temperature: f32,
    pub text_max_tokens: u32,
    pub text_top_p: f32,
    pub vision_temperature: f32,
    pub vision_max_tokens: u32,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            text_model: DEFAULT_TEXT_MODEL.to_string(),
            vision_model: DEFAULT_VISION_MODEL.to_string(),
            min_request_interval: Duration::from_secs(1),
            context_window: 10,
            vision_context_window: 4,
            text_timeout: Duration::from_secs(10),
            vision_timeout: Duration::from_secs(15),
            text_temperature: 0.85,
            text_max_tokens: 80,  // keeps replies to ~3 lines
            text_top_p: 0.95,
            vision_temperature: 0.7,
            vision_max_tokens: 150,
        }
    }
}

/// Produces replies for in-scope turns
pub struct ResponseGenerator {
    model: Arc<dyn LanguageModel>,
    sessions: Arc<SessionStore>,
    config: GeneratorConfig,
}

impl ResponseGenerator {
    pub fn new(model: Arc<dyn LanguageModel>, sessions: Arc<SessionStore>, config: GeneratorConfig) -> Self {
        Self { model, sessions, config }
    }

    pub fn is_available(&self) -> bool {
        self.model.is_available()
    }

    /// Generate an empathetic reply to a turn, falling back on any failure
    pub async fn generate(&self, turn: &str, user: UserId) -> String {
        if !self.model.is_available() {
            debug!("Language model not configured, using fallback for user {}", user);
            return fallback_response(turn).to_string();
        }

        self.wait_for_slot(user).await;

        self.sessions.remember(user, Role::User, turn);

        let mut messages = Vec::with_capacity(self.config.context_window + 1);
        messages.push(ChatMessage::system(SYSTEM_PROMPT));
        messages.extend(
            self.sessions
                .recent(user, self.config.context_window)
                .iter()
                .map(ChatMessage::from),
        );

        let request = CompletionRequest {
            model: self.config.text_model.clone(),
            messages,
            temperature: self.config.text_temperature,
            max_tokens: self.config.text_max_tokens,
            top_p: Some(self.config.text_top_p),
        };

        match self.call(&request, self.config.text_timeout).await {
            Ok(reply) => {
                self.sessions.put(user, MemoryEntry::assistant(reply.clone()));
                reply
            }
            Err(e) => {
                error!("Groq API error for user {}: {}, using fallback response", user, e);
                fallback_response(turn).to_string()
            }
        }
    }

    /// Reply to a shared image, using the caption and recent context
    pub async fn analyze_image(&self, image: &[u8], caption: &str, user: UserId) -> String {
        if !self.model.is_available() {
            return IMAGE_UNAVAILABLE_RESPONSE.to_string();
        }

        self.wait_for_slot(user).await;

        let recent = self.sessions.recent(user, self.config.vision_context_window);
        let prompt = vision_prompt(&recent, caption);
        let data_url = format!(
            "data:image/jpeg;base64,{}",
            base64::engine::general_purpose::STANDARD.encode(image)
        );

        let request = CompletionRequest {
            model: self.config.vision_model.clone(),
            messages: vec![ChatMessage::user_with_image(&prompt, data_url)],
            temperature: self.config.vision_temperature,
            max_tokens: self.config.vision_max_tokens,
            top_p: None,
        };

        let reply = match self.call(&request, self.config.vision_timeout).await {
            Ok(reply) => {
                info!("Vision response for user {}", user);
                reply
            }
            Err(e) => {
                warn!("Vision model failed for user {}: {}, answering from caption", user, e);
                image_caption_fallback(caption).to_string()
            }
        };

        self.sessions.put(user, MemoryEntry::user(image_memory_note(caption)));
        self.sessions.put(user, MemoryEntry::assistant(reply.clone()));

        reply
    }

    async fn wait_for_slot(&self, user: UserId) {
        let wait = self
            .sessions
            .reserve_request_slot(user, self.config.min_request_interval);
        if !wait.is_zero() {
            debug!("Rate limiting user {} for {:?}", user, wait);
            tokio::time::sleep(wait).await;
        }
    }

    /// Model call with a hard deadline on top of the client's own timeout
    async fn call(&self, request: &CompletionRequest, timeout: Duration) -> Result<String, LlmError> {
        match tokio::time::timeout(timeout, self.model.complete(request, timeout)).await {
            Ok(result) => result,
            Err(_) => Err(LlmError::Timeout(timeout)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use parking_lot::Mutex;

    /// Scripted language model
    struct FakeModel {
        available: bool,
        reply: Result<String, ()>,
        delay: Duration,
        requests: Mutex<Vec<CompletionRequest>>,
    }

    impl FakeModel {
        fn replying(text: &str) -> Self {
            Self {
                available: true,
                reply: Ok(text.to_string()),
                delay: Duration::ZERO,
                requests: Mutex::new(Vec::new()),
            }
        }

        fn failing() -> Self {
            Self { reply: Err(()), ..Self::replying("") }
        }

        fn hanging() -> Self {
            Self { delay: Duration::from_secs(60), ..Self::replying("too late") }
        }

        fn unconfigured() -> Self {
            Self { available: false, ..Self::replying("unused") }
        }
    }

    #[async_trait]
    impl LanguageModel for FakeModel {
        fn is_available(&self) -> bool {
            self.available
        }

        async fn complete(&self, request: &CompletionRequest, _timeout: Duration) -> Result<String, LlmError> {
            self.requests.lock().push(request.clone());
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            self.reply
                .clone()
                .map_err(|_| LlmError::Status { status: 500, body: "boom".to_string() })
        }
    }

    fn generator(model: FakeModel) -> (ResponseGenerator, Arc<FakeModel>, Arc<SessionStore>) {
        let model = Arc::new(model);
        let sessions = Arc::new(SessionStore::default());
        let generator = ResponseGenerator::new(model.clone(), sessions.clone(), GeneratorConfig::default());
        (generator, model, sessions)
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_stores_exchange() {
        let (gen, model, sessions) = generator(FakeModel::replying("You are not alone."));
        let user = UserId(1);

        let reply = gen.generate("I feel lonely", user).await;

        assert_eq!(reply, "You are not alone.");
        assert_eq!(
            sessions.history(user),
            vec![MemoryEntry::user("I feel lonely"), MemoryEntry::assistant("You are not alone.")]
        );

        let requests = model.requests.lock();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].messages[0].text(), Some(SYSTEM_PROMPT));
        assert_eq!(requests[0].messages[1].text(), Some("I feel lonely"));
        assert_eq!(requests[0].max_tokens, 80);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_returns_fallback() {
        let (gen, _model, _sessions) = generator(FakeModel::hanging());
        let turn = "I'm so anxious about tomorrow";

        let reply = gen.generate(turn, UserId(1)).await;

        assert_eq!(reply, fallback_response(turn));
    }

    #[tokio::test(start_paused = true)]
    async fn test_api_error_returns_fallback() {
        let (gen, _model, sessions) = generator(FakeModel::failing());
        let turn = "My boss yelled at me";

        let reply = gen.generate(turn, UserId(1)).await;

        assert_eq!(reply, fallback_response(turn));
        // The turn is remembered, no assistant entry is added
        assert_eq!(sessions.history(UserId(1)), vec![MemoryEntry::user(turn)]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unconfigured_model_skips_memory() {
        let (gen, model, sessions) = generator(FakeModel::unconfigured());

        let reply = gen.generate("I can't sleep", UserId(1)).await;

        assert_eq!(reply, fallback_response("I can't sleep"));
        assert!(model.requests.lock().is_empty());
        assert_eq!(sessions.history_len(UserId(1)), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_context_window_limits_history() {
        let (gen, model, sessions) = generator(FakeModel::replying("ok"));
        let user = UserId(9);
        for i in 0..14 {
            sessions.remember(user, Role::User, &format!("old {}", i));
        }

        gen.generate("newest", user).await;

        let requests = model.requests.lock();
        // system + last 10 entries
        assert_eq!(requests[0].messages.len(), 11);
        assert_eq!(requests[0].messages.last().and_then(|m| m.text()), Some("newest"));
        assert!(sessions.history_len(user) <= sessions.max_history());
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_limit_spaces_requests() {
        let (gen, _model, _sessions) = generator(FakeModel::replying("ok"));
        let user = UserId(3);

        let start = tokio::time::Instant::now();
        gen.generate("first", user).await;
        gen.generate("second", user).await;

        assert!(start.elapsed() >= Duration::from_secs(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_image_success() {
        let (gen, model, sessions) = generator(FakeModel::replying("That view looks peaceful."));
        let user = UserId(5);
        sessions.remember(user, Role::User, "I went to the sea");

        let reply = gen.analyze_image(&[0xff, 0xd8, 0xff], "the sea", user).await;

        assert_eq!(reply, "That view looks peaceful.");
        let requests = model.requests.lock();
        assert_eq!(requests[0].model, DEFAULT_VISION_MODEL);
        assert_eq!(requests[0].max_tokens, 150);
        let history = sessions.history(user);
        assert_eq!(history[1], MemoryEntry::user("[Shared an image: the sea]"));
        assert_eq!(history[2], MemoryEntry::assistant("That view looks peaceful."));
    }

    #[tokio::test(start_paused = true)]
    async fn test_image_failure_uses_caption() {
        let (gen, _model, _sessions) = generator(FakeModel::failing());

        let reply = gen.analyze_image(&[1, 2, 3], "she left me", UserId(5)).await;
        assert_eq!(reply, image_caption_fallback("she left me"));

        let reply = gen.analyze_image(&[1, 2, 3], "", UserId(6)).await;
        assert!(reply.starts_with("Thank you for sharing"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_image_without_model() {
        let (gen, _model, sessions) = generator(FakeModel::unconfigured());

        let reply = gen.analyze_image(&[1], "x", UserId(5)).await;

        assert_eq!(reply, IMAGE_UNAVAILABLE_RESPONSE);
        assert_eq!(sessions.history_len(UserId(5)), 0);
    }
}
