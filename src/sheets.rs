//! Google Sheets Conversation Log
//!
//! Appends one row per answered turn to a spreadsheet using a service
//! account. Auth is the OAuth2 JWT-bearer flow: sign an RS256 assertion
//! with the account's private key, exchange it for an access token, and
//! reuse that token until shortly before it expires.

use async_trait::async_trait;
use base64::Engine;
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::conversation_log::{ConversationLog, LogError, LogRecord};

const SHEETS_API_URL: &str = "https://sheets.googleapis.com/v4/spreadsheets";
const SHEETS_SCOPE: &str = "https://www.googleapis.com/auth/spreadsheets";
const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";

/// Refresh this long before the token actually expires
const TOKEN_REFRESH_MARGIN_SECS: i64 = 60;

const HTTP_TIMEOUT: Duration = Duration::from_secs(10);

pub const HEADER_ROW: [&str; 4] = ["Username", "Phone", "User Question", "Bot Answer"];

/// Fields of a service account key file that the flow needs
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceAccountKey {
    pub client_email: String,
    pub private_key: String,
    #[serde(default)]
    pub private_key_id: Option<String>,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

impl ServiceAccountKey {
    pub fn from_json(json: &str) -> Result<Self, LogError> {
        serde_json::from_str(json).map_err(|e| LogError::Credentials(e.to_string()))
    }

    /// Load a key file from disk
    pub fn from_file(path: &Path) -> Result<Self, LogError> {
        let json = std::fs::read_to_string(path)
            .map_err(|e| LogError::Credentials(format!("{}: {}", path.display(), e)))?;
        Self::from_json(&json)
    }

    /// Parse an environment value holding raw JSON or base64-encoded JSON
    pub fn from_env_value(value: &str) -> Result<Self, LogError> {
        let trimmed = value.trim();
        if trimmed.starts_with('{') {
            return Self::from_json(trimmed);
        }

        let bytes = base64::engine::general_purpose::STANDARD
            .decode(trimmed)
            .map_err(|e| LogError::Credentials(format!("not JSON or base64: {}", e)))?;
        let json = String::from_utf8(bytes).map_err(|e| LogError::Credentials(e.to_string()))?;
        Self::from_json(&json)
    }
}

/// JWT claims for the token exchange
#[derive(Debug, Serialize, PartialEq)]
struct Claims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_expires_in")]
    expires_in: i64,
}

fn default_expires_in() -> i64 {
    3600
}

#[derive(Debug, Clone)]
struct CachedToken {
    value: String,
    expires_at: i64,
}

#[derive(Debug, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<serde_json::Value>>,
}

#[derive(Debug, Serialize)]
struct AppendBody<'a> {
    values: Vec<Vec<&'a str>>,
}

/// Google Sheets sink
pub struct SheetsLog {
    client: Client,
    key: ServiceAccountKey,
    sheet_id: String,
    token: Mutex<Option<CachedToken>>,
    header_checked: AtomicBool,
}

impl SheetsLog {
    pub fn new(key: ServiceAccountKey, sheet_id: &str) -> Self {
        let client = Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()
            .unwrap_or_default();

        Self {
            client,
            key,
            sheet_id: sheet_id.to_string(),
            token: Mutex::new(None),
            header_checked: AtomicBool::new(false),
        }
    }

    fn claims(&self, now: i64) -> Claims<'_> {
        Claims {
            iss: &self.key.client_email,
            scope: SHEETS_SCOPE,
            aud: &self.key.token_uri,
            iat: now,
            exp: now + 3600,
        }
    }

    fn signed_assertion(&self, now: i64) -> Result<String, LogError> {
        let mut header = Header::new(Algorithm::RS256);
        header.kid = self.key.private_key_id.clone();

        let key = EncodingKey::from_rsa_pem(self.key.private_key.as_bytes())
            .map_err(|e| LogError::Credentials(format!("private key: {}", e)))?;

        jsonwebtoken::encode(&header, &self.claims(now), &key)
            .map_err(|e| LogError::Auth(e.to_string()))
    }

    /// Cached access token, refreshed when close to expiry
    async fn access_token(&self) -> Result<String, LogError> {
        let now = chrono::Utc::now().timestamp();
        let mut cached = self.token.lock().await;

        if let Some(token) = cached.as_ref() {
            if token.expires_at - TOKEN_REFRESH_MARGIN_SECS > now {
                return Ok(token.value.clone());
            }
        }

        let assertion = self.signed_assertion(now)?;
        let response = self
            .client
            .post(&self.key.token_uri)
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(LogError::Auth(format!("token exchange {}: {}", status, body)));
        }

        let token: TokenResponse = response.json().await?;
        debug!("Obtained Sheets access token (expires in {}s)", token.expires_in);

        *cached = Some(CachedToken {
            value: token.access_token.clone(),
            expires_at: now + token.expires_in,
        });
        Ok(token.access_token)
    }

    async fn check(response: reqwest::Response) -> Result<reqwest::Response, LogError> {
        if response.status().is_success() {
            Ok(response)
        } else {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            Err(LogError::Api { status, body })
        }
    }

    async fn append_row(&self, token: &str, row: Vec<&str>) -> Result<(), LogError> {
        let url = format!("{}/{}/values/A1:append", SHEETS_API_URL, self.sheet_id);
        let response = self
            .client
            .post(&url)
            .bearer_auth(token)
            .query(&[("valueInputOption", "USER_ENTERED"), ("insertDataOption", "INSERT_ROWS")])
            .json(&AppendBody { values: vec![row] })
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }

    /// Write the header row if the sheet's first cell is empty
    async fn ensure_header(&self, token: &str) -> Result<(), LogError> {
        if self.header_checked.load(Ordering::Acquire) {
            return Ok(());
        }

        let url = format!("{}/{}/values/A1:D1", SHEETS_API_URL, self.sheet_id);
        let response = self.client.get(&url).bearer_auth(token).send().await?;
        let range: ValueRange = Self::check(response).await?.json().await?;

        if first_cell_empty(&range) {
            self.append_row(token, HEADER_ROW.to_vec()).await?;
            info!("Added headers to sheet {}", self.sheet_id);
        }

        self.header_checked.store(true, Ordering::Release);
        Ok(())
    }

    /// Verify credentials and sheet access once at startup
    pub async fn connect(&self) -> Result<(), LogError> {
        let token = self.access_token().await?;
        self.ensure_header(&token).await?;
        info!("Connected to Google Sheet: {}", self.sheet_id);
        Ok(())
    }
}

fn first_cell_empty(range: &ValueRange) -> bool {
    match range.values.first().and_then(|row| row.first()) {
        None => true,
        Some(serde_json::Value::String(s)) => s.trim().is_empty(),
        Some(serde_json::Value::Null) => true,
        Some(_) => false,
    }
}

fn row_for(record: &LogRecord) -> Vec<&str> {
    vec![
        record.username.as_str(),
        record.phone.as_deref().unwrap_or(""),
        record.question.as_str(),
        record.answer.as_str(),
    ]
}

#[async_trait]
impl ConversationLog for SheetsLog {
    fn name(&self) -> &str {
        "google_sheets"
    }

    async fn append(&self, record: &LogRecord) -> Result<(), LogError> {
        let token = self.access_token().await?;
        if let Err(e) = self.ensure_header(&token).await {
            warn!("Could not verify sheet header: {}", e);
        }
        self.append_row(&token, row_for(record)).await
    }
}
