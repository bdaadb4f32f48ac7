//! Telegram bot API transport
//!
//! Every operation is one `POST {api_base}/bot{token}/{method}` with a JSON
//! body, answered by the envelope `{ok, result, error_code, description}`.

use crate::error::{Result, TickerError, TransportError, TransportResult};
use crate::platforms::ChatTransport;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{Value, json};
use std::fmt;
use std::time::Duration;
use tracing::debug;

const DEFAULT_API_BASE: &str = "https://api.telegram.org";

/// Telegram bot configuration
#[derive(Clone, PartialEq, Eq)]
pub struct TelegramConfig {
    /// Bot token from BotFather
    pub token: String,

    /// Destination chat id or @channel username
    pub chat_id: String,

    /// Bot API root
    pub api_base: String,
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            token: String::new(),
            chat_id: String::new(),
            api_base: DEFAULT_API_BASE.to_string(),
        }
    }
}

// Keeps the token out of logs
impl fmt::Debug for TelegramConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TelegramConfig")
            .field("token", &"<redacted>")
            .field("chat_id", &self.chat_id)
            .field("api_base", &self.api_base)
            .finish()
    }
}

impl TelegramConfig {
    /// Create a config for the public bot API
    pub fn new(token: impl Into<String>, chat_id: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            chat_id: chat_id.into(),
            api_base: DEFAULT_API_BASE.to_string(),
        }
    }

    /// Point at another bot API server
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    /// Create config from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: &F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let token = lookup("TG_BOT_TOKEN")
            .ok_or_else(|| TickerError::ConfigError("TG_BOT_TOKEN not set".to_string()))?;
        let chat_id = lookup("TG_CHAT_ID")
            .ok_or_else(|| TickerError::ConfigError("TG_CHAT_ID not set".to_string()))?;

        let mut config = Self::new(token.trim(), chat_id.trim());
        if let Some(base) = lookup("TELEGRAM_API_BASE") {
            config = config.with_api_base(base.trim());
        }

        config.validate()?;
        Ok(config)
    }

    /// Validate credential and chat
    pub fn validate(&self) -> Result<()> {
        if self.token.trim().is_empty() {
            return Err(TickerError::ConfigError("TG_BOT_TOKEN not set".to_string()));
        }
        if self.chat_id.trim().is_empty() {
            return Err(TickerError::ConfigError("TG_CHAT_ID not set".to_string()));
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
struct Envelope {
    ok: bool,
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error_code: Option<i64>,
    #[serde(default)]
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SentMessage {
    message_id: i64,
}

/// How a failure description maps onto the transport contract
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Failure {
    /// Target message is gone or permanently uneditable
    NotFound,
    /// Edit with identical content; the message already shows the text
    NotModified,
    Other,
}

const NOT_FOUND_MARKERS: &[&str] = &[
    "message to edit not found",
    "message to delete not found",
    "message to pin not found",
    "message to unpin not found",
    "message can't be edited",
    "message_id_invalid",
];

fn classify(description: &str) -> Failure {
    let description = description.to_ascii_lowercase();
    if description.contains("message is not modified") {
        Failure::NotModified
    } else if NOT_FOUND_MARKERS.iter().any(|m| description.contains(m)) {
        Failure::NotFound
    } else {
        Failure::Other
    }
}

/// Telegram transport bound to one chat
pub struct TelegramTransport {
    client: Client,
    method_base: String,
    chat_id: String,
    parse_mode: Option<String>,
}

impl TelegramTransport {
    /// Create a new transport
    ///
    /// # Arguments
    /// * `config` - Credential and chat
    /// * `timeout` - Per-request timeout
    /// * `parse_mode` - Markup mode for message text (e.g. "HTML")
    pub fn new(config: &TelegramConfig, timeout: Duration, parse_mode: Option<&str>) -> Result<Self> {
        config.validate()?;

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| TickerError::ConfigError(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            method_base: format!(
                "{}/bot{}",
                config.api_base.trim_end_matches('/'),
                config.token
            ),
            chat_id: config.chat_id.clone(),
            parse_mode: parse_mode.map(ToString::to_string),
        })
    }

    /// Perform one API call, returning the `result` payload on success.
    ///
    /// `target` is the message the call operates on; failures about a missing
    /// target are reported as `MessageNotFound`.
    async fn call(&self, method: &str, body: Value, target: Option<i64>) -> TransportResult<Value> {
        debug!(method, "Telegram API call");

        let response = self
            .client
            .post(format!("{}/{method}", self.method_base))
            .json(&body)
            .send()
            .await
            // The URL carries the bot token
            .map_err(|e| TransportError::Http(e.without_url()))?;

        let status = response.status();
        let bytes = response
            .bytes()
            .await
            .map_err(|e| TransportError::Http(e.without_url()))?;

        let envelope: Envelope = match serde_json::from_slice(&bytes) {
            Ok(envelope) => envelope,
            Err(e) if status.is_success() => {
                return Err(TransportError::Decode {
                    method: method.to_string(),
                    reason: e.to_string(),
                });
            }
            Err(_) => {
                return Err(TransportError::Rejected {
                    method: method.to_string(),
                    status: status.as_u16(),
                    error_code: None,
                    description: String::from_utf8_lossy(&bytes).chars().take(200).collect(),
                });
            }
        };

        if envelope.ok {
            return Ok(envelope.result.unwrap_or(Value::Null));
        }

        let description = envelope.description.unwrap_or_default();
        match (classify(&description), target) {
            (Failure::NotFound, Some(message_id)) => {
                Err(TransportError::MessageNotFound { message_id })
            }
            // Only edits can be "not modified"; the text is already current
            (Failure::NotModified, Some(_)) if method == "editMessageText" => Ok(Value::Null),
            _ => Err(TransportError::Rejected {
                method: method.to_string(),
                status: status.as_u16(),
                error_code: envelope.error_code,
                description,
            }),
        }
    }

    fn text_body(&self, text: &str) -> Value {
        let mut body = json!({
            "chat_id": self.chat_id,
            "text": text,
            "disable_web_page_preview": true,
        });
        if let Some(mode) = &self.parse_mode {
            body["parse_mode"] = json!(mode);
        }
        body
    }
}

#[async_trait]
impl ChatTransport for TelegramTransport {
    async fn send(&self, text: &str) -> TransportResult<i64> {
        let result = self.call("sendMessage", self.text_body(text), None).await?;
        let sent: SentMessage =
            serde_json::from_value(result).map_err(|e| TransportError::Decode {
                method: "sendMessage".to_string(),
                reason: e.to_string(),
            })?;
        Ok(sent.message_id)
    }

    async fn edit(&self, message_id: i64, text: &str) -> TransportResult<()> {
        let mut body = self.text_body(text);
        body["message_id"] = json!(message_id);
        self.call("editMessageText", body, Some(message_id)).await?;
        Ok(())
    }

    async fn delete(&self, message_id: i64) -> TransportResult<()> {
        let body = json!({ "chat_id": self.chat_id, "message_id": message_id });
        self.call("deleteMessage", body, Some(message_id)).await?;
        Ok(())
    }

    async fn pin(&self, message_id: i64) -> TransportResult<()> {
        let body = json!({
            "chat_id": self.chat_id,
            "message_id": message_id,
            "disable_notification": true,
        });
        self.call("pinChatMessage", body, Some(message_id)).await?;
        Ok(())
    }

    async fn unpin(&self, message_id: i64) -> TransportResult<()> {
        let body = json!({ "chat_id": self.chat_id, "message_id": message_id });
        self.call("unpinChatMessage", body, Some(message_id)).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::{assert_err, assert_ok};
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const TOKEN: &str = "123:SECRET";

    async fn transport(server: &MockServer) -> TelegramTransport {
        let config = TelegramConfig::new(TOKEN, "-1001").with_api_base(server.uri());
        TelegramTransport::new(&config, Duration::from_secs(5), Some("HTML")).unwrap()
    }

    fn api_path(method: &str) -> String {
        format!("/bot{TOKEN}/{method}")
    }

    fn failure(code: i64, description: &str) -> ResponseTemplate {
        ResponseTemplate::new(u16::try_from(code).unwrap()).set_body_json(json!({
            "ok": false,
            "error_code": code,
            "description": description,
        }))
    }

    #[test]
    fn test_telegram_config_from_lookup() {
        let lookup = |key: &str| match key {
            "TG_BOT_TOKEN" => Some("test_token".to_string()),
            "TG_CHAT_ID" => Some("@prices".to_string()),
            _ => None,
        };
        let config = TelegramConfig::from_lookup(&lookup).unwrap();
        assert_eq!(config.token, "test_token");
        assert_eq!(config.chat_id, "@prices");
        assert_eq!(config.api_base, "https://api.telegram.org");
    }

    #[test]
    fn test_telegram_config_debug_redacts_token() {
        let config = TelegramConfig::new(TOKEN, "-1001");
        let debug = format!("{config:?}");
        assert!(!debug.contains("SECRET"));
        assert!(debug.contains("-1001"));
    }

    #[test]
    fn test_classify() {
        assert_eq!(
            classify("Bad Request: message to edit not found"),
            Failure::NotFound
        );
        assert_eq!(
            classify("Bad Request: message can't be edited"),
            Failure::NotFound
        );
        assert_eq!(classify("Bad Request: MESSAGE_ID_INVALID"), Failure::NotFound);
        assert_eq!(
            classify(
                "Bad Request: message is not modified: specified new message content and reply markup are exactly the same"
            ),
            Failure::NotModified
        );
        assert_eq!(classify("Bad Request: message text is empty"), Failure::Other);
        assert_eq!(classify("Forbidden: bot was kicked"), Failure::Other);
    }

    #[tokio::test]
    async fn test_send_returns_message_id() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(api_path("sendMessage")))
            .and(body_partial_json(json!({
                "chat_id": "-1001",
                "text": "hello",
                "parse_mode": "HTML",
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "ok": true,
                "result": {"message_id": 77, "date": 0, "chat": {"id": -1001}},
            })))
            .expect(1)
            .mount(&server)
            .await;

        let id = assert_ok!(transport(&server).await.send("hello").await);
        assert_eq!(id, 77);
    }

    #[tokio::test]
    async fn test_send_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(api_path("sendMessage")))
            .respond_with(failure(403, "Forbidden: bot is not a member of the channel chat"))
            .mount(&server)
            .await;

        let err = assert_err!(transport(&server).await.send("hello").await);
        match err {
            TransportError::Rejected {
                status,
                error_code,
                description,
                ..
            } => {
                assert_eq!(status, 403);
                assert_eq!(error_code, Some(403));
                assert!(description.contains("not a member"));
            }
            other => panic!("Expected Rejected, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_edit_not_found_is_classified() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(api_path("editMessageText")))
            .and(body_partial_json(json!({"message_id": 42})))
            .respond_with(failure(400, "Bad Request: message to edit not found"))
            .mount(&server)
            .await;

        let err = assert_err!(transport(&server).await.edit(42, "text").await);
        assert!(matches!(err, TransportError::MessageNotFound { message_id: 42 }));
    }

    #[tokio::test]
    async fn test_edit_not_modified_is_success() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(api_path("editMessageText")))
            .respond_with(failure(
                400,
                "Bad Request: message is not modified: specified new message content and reply markup are exactly the same as a current content and reply markup of the message",
            ))
            .mount(&server)
            .await;

        assert_ok!(transport(&server).await.edit(42, "same").await);
    }

    #[tokio::test]
    async fn test_edit_other_rejection() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(api_path("editMessageText")))
            .respond_with(failure(429, "Too Many Requests: retry after 5"))
            .mount(&server)
            .await;

        let err = assert_err!(transport(&server).await.edit(42, "text").await);
        assert!(matches!(err, TransportError::Rejected { status: 429, .. }));
    }

    #[tokio::test]
    async fn test_pin_is_silent() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(api_path("pinChatMessage")))
            .and(body_partial_json(json!({
                "message_id": 77,
                "disable_notification": true,
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true, "result": true})))
            .expect(1)
            .mount(&server)
            .await;

        assert_ok!(transport(&server).await.pin(77).await);
    }

    #[tokio::test]
    async fn test_delete_and_unpin() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(api_path("unpinChatMessage")))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true, "result": true})))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path(api_path("deleteMessage")))
            .respond_with(failure(400, "Bad Request: message to delete not found"))
            .expect(1)
            .mount(&server)
            .await;

        let transport = transport(&server).await;
        assert_ok!(transport.unpin(42).await);
        let err = assert_err!(transport.delete(42).await);
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_non_json_failure_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(502).set_body_string("<html>Bad Gateway</html>"))
            .mount(&server)
            .await;

        let err = assert_err!(transport(&server).await.send("hello").await);
        assert!(matches!(err, TransportError::Rejected { status: 502, .. }));
    }

    #[tokio::test]
    async fn test_network_error_hides_token() {
        let config = TelegramConfig::new(TOKEN, "-1001").with_api_base("http://127.0.0.1:1");
        let transport =
            TelegramTransport::new(&config, Duration::from_millis(500), None).unwrap();

        let err = assert_err!(transport.send("hello").await);
        assert!(matches!(err, TransportError::Http(_)));
        assert!(!err.to_string().contains("SECRET"));
    }
}
