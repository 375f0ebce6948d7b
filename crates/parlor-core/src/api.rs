//! HTTP client for the chat service.

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

use crate::error::ClientError;
use crate::model::{Conversation, Credentials, EntryId, Identifier, Session};

/// Operations the chat service offers.
///
/// `ApiClient` talks HTTP; tests can plug in anything else.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    async fn login(&self, credentials: &Credentials) -> Result<Session, ClientError>;
    async fn register(&self, credentials: &Credentials) -> Result<Session, ClientError>;
    async fn send_message(&self, username: &str, message: &str) -> Result<Conversation, ClientError>;
    async fn history(&self, username: &str) -> Result<Vec<Conversation>, ClientError>;
}

#[derive(Deserialize)]
struct AuthResponse {
    #[serde(default)]
    success: bool,
    username: Option<String>,
    user_id: Option<Identifier>,
    error: Option<String>,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    username: &'a str,
    message: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    success: bool,
    conversation_id: Option<Identifier>,
    user_message: Option<String>,
    ai_response: Option<String>,
    timestamp: Option<String>,
    error: Option<String>,
}

#[derive(Deserialize)]
struct HistoryResponse {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    conversations: Vec<serde_json::Value>,
    error: Option<String>,
}

/// A conversation as stored by the service.
///
/// Only `id` is required. Stored rows can lack a response (the model call
/// failed server-side) and still belong in the history.
#[derive(Debug, Clone, Deserialize)]
pub struct ConversationRecord {
    pub id: Identifier,
    #[serde(default)]
    pub user_message: Option<String>,
    #[serde(default)]
    pub ai_response: Option<String>,
    #[serde(default)]
    pub timestamp: Option<String>,
}

impl From<ConversationRecord> for Conversation {
    fn from(record: ConversationRecord) -> Self {
        Self {
            id: EntryId::Confirmed(record.id),
            user_message: record.user_message.unwrap_or_default(),
            ai_response: record.ai_response.unwrap_or_default(),
            timestamp: record
                .timestamp
                .unwrap_or_else(|| chrono::Utc::now().to_rfc3339()),
            loading: false,
        }
    }
}

#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Like [`ApiClient::new`], with a per-request timeout.
    pub fn with_timeout(base_url: &str, timeout: Duration) -> Result<Self, ClientError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn authenticate(
        &self,
        endpoint: &str,
        credentials: &Credentials,
        fallback: &str,
    ) -> Result<Session, ClientError> {
        let url = format!("{}/{}", self.base_url, endpoint);
        debug!(%url, username = %credentials.username, "sending auth request");

        let response = self
            .client
            .post(&url)
            .json(credentials)
            .send()
            .await?;

        let auth: AuthResponse = read_json(response).await?;
        if !auth.success {
            return Err(server_error(auth.error, fallback));
        }

        Ok(Session {
            username: auth.username.ok_or(ClientError::MissingField("username"))?,
            user_id: auth.user_id.ok_or(ClientError::MissingField("user_id"))?,
        })
    }
}

#[async_trait]
impl ChatBackend for ApiClient {
    async fn login(&self, credentials: &Credentials) -> Result<Session, ClientError> {
        self.authenticate("login", credentials, "Login failed").await
    }

    async fn register(&self, credentials: &Credentials) -> Result<Session, ClientError> {
        self.authenticate("register", credentials, "Registration failed").await
    }

    async fn send_message(&self, username: &str, message: &str) -> Result<Conversation, ClientError> {
        let url = format!("{}/chat", self.base_url);
        debug!(%url, %username, chars = message.chars().count(), "sending chat message");

        let response = self
            .client
            .post(&url)
            .json(&ChatRequest { username, message })
            .send()
            .await?;

        let chat: ChatResponse = read_json(response).await?;
        if !chat.success {
            return Err(server_error(chat.error, "Failed to send message"));
        }

        Ok(Conversation {
            id: EntryId::Confirmed(
                chat.conversation_id
                    .ok_or(ClientError::MissingField("conversation_id"))?,
            ),
            user_message: chat.user_message.unwrap_or_else(|| message.to_string()),
            ai_response: chat.ai_response.ok_or(ClientError::MissingField("ai_response"))?,
            timestamp: chat
                .timestamp
                .unwrap_or_else(|| chrono::Utc::now().to_rfc3339()),
            loading: false,
        })
    }

    async fn history(&self, username: &str) -> Result<Vec<Conversation>, ClientError> {
        let url = format!("{}/history/{}", self.base_url, urlencoding::encode(username));
        debug!(%url, "fetching history");

        let response = self
            .client
            .get(&url)
            .header(CONTENT_TYPE, "application/json")
            .send()
            .await?;

        let history: HistoryResponse = read_json(response).await?;
        if !history.success {
            return Err(server_error(history.error, "Failed to load chat history"));
        }

        let total = history.conversations.len();
        let conversations: Vec<Conversation> = history
            .conversations
            .into_iter()
            .enumerate()
            .filter_map(|(index, value)| {
                match serde_json::from_value::<ConversationRecord>(value) {
                    Ok(record) => Some(Conversation::from(record)),
                    Err(e) => {
                        warn!(index, error = %e, "skipping unreadable history entry");
                        None
                    }
                }
            })
            .collect();
        debug!(total, kept = conversations.len(), "history decoded");

        Ok(conversations)
    }
}

/// Decode the body as JSON whatever the status code; the service reports
/// failures in the body.
async fn read_json<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ClientError> {
    let status = response.status();
    let body = response.bytes().await?;
    debug!(%status, bytes = body.len(), "response received");
    Ok(serde_json::from_slice(&body)?)
}

fn server_error(error: Option<String>, fallback: &str) -> ClientError {
    ClientError::Server(
        error
            .filter(|e| !e.is_empty())
            .unwrap_or_else(|| fallback.to_string()),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn creds(username: &str, password: &str) -> Credentials {
        Credentials {
            username: username.to_string(),
            password: password.to_string(),
        }
    }

    #[test]
    fn test_trailing_slash_is_stripped() {
        let client = ApiClient::new("http://localhost:5000/");
        assert_eq!(client.base_url(), "http://localhost:5000");
    }

    #[tokio::test]
    async fn test_login_success() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/login"))
            .and(header("content-type", "application/json"))
            .and(body_json(json!({"username": "al", "password": "x"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "success": true, "username": "al", "user_id": 7
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = ApiClient::new(&server.uri());
        let session = client.login(&creds("al", "x")).await.unwrap();

        assert_eq!(session.username, "al");
        assert_eq!(session.user_id, Identifier::Number(7));
    }

    #[tokio::test]
    async fn test_login_server_error_on_non_2xx_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/login"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({
                "success": false, "error": "Invalid username or password"
            })))
            .mount(&server)
            .await;

        let client = ApiClient::new(&server.uri());
        let err = client.login(&creds("al", "nope")).await.unwrap_err();

        assert!(err.is_server_reported());
        assert_eq!(err.user_message(), "Invalid username or password");
    }

    #[tokio::test]
    async fn test_register_failure_without_message_uses_default() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/register"))
            .and(header("content-type", "application/json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"success": false})))
            .mount(&server)
            .await;

        let client = ApiClient::new(&server.uri());
        let err = client.register(&creds("al", "secret")).await.unwrap_err();

        assert_eq!(err.user_message(), "Registration failed");
    }

    #[tokio::test]
    async fn test_malformed_json_is_a_transport_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/login"))
            .respond_with(ResponseTemplate::new(502).set_body_string("<html>Bad Gateway</html>"))
            .mount(&server)
            .await;

        let client = ApiClient::new(&server.uri());
        let err = client.login(&creds("al", "x")).await.unwrap_err();

        assert!(matches!(err, ClientError::Decode(_)));
        assert_eq!(err.user_message(), crate::error::CONNECT_FAILURE);
    }

    #[tokio::test]
    async fn test_success_without_user_id_is_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/login"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "success": true, "username": "al"
            })))
            .mount(&server)
            .await;

        let client = ApiClient::new(&server.uri());
        let err = client.login(&creds("al", "x")).await.unwrap_err();

        assert!(matches!(err, ClientError::MissingField("user_id")));
    }

    #[tokio::test]
    async fn test_send_message_returns_confirmed_entry() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat"))
            .and(header("content-type", "application/json"))
            .and(body_json(json!({"username": "al", "message": "  hi there "})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "success": true,
                "conversation_id": 42,
                "user_message": "  hi there ",
                "ai_response": "Hello!",
                "timestamp": "2024-05-01T09:15:30"
            })))
            .mount(&server)
            .await;

        let client = ApiClient::new(&server.uri());
        let conv = client.send_message("al", "  hi there ").await.unwrap();

        assert_eq!(conv.id, EntryId::Confirmed(Identifier::Number(42)));
        assert_eq!(conv.ai_response, "Hello!");
        assert_eq!(conv.timestamp, "2024-05-01T09:15:30");
        assert!(!conv.loading);
    }

    #[tokio::test]
    async fn test_history_encodes_username_and_keeps_order() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/history/al%20b"))
            .and(header("content-type", "application/json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "success": true,
                "conversations": [
                    {"id": 2, "user_message": "second", "ai_response": "b", "timestamp": "2024-05-01T10:00:00"},
                    {"id": "1", "user_message": "first", "ai_response": "a", "timestamp": "2024-05-01T09:00:00"}
                ]
            })))
            .mount(&server)
            .await;

        let client = ApiClient::new(&server.uri());
        let history = client.history("al b").await.unwrap();

        assert_eq!(history.len(), 2);
        assert_eq!(history[0].user_message, "second");
        assert_eq!(history[1].id, EntryId::Confirmed(Identifier::Text("1".to_string())));
        assert!(history.iter().all(|c| !c.loading));
    }

    #[tokio::test]
    async fn test_history_keeps_entries_with_missing_fields() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/history/al"))
            .and(header("content-type", "application/json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "success": true,
                "conversations": [
                    {"id": 3, "user_message": "broken", "ai_response": null, "timestamp": "2024-05-01T11:00:00"},
                    {"id": 2, "user_message": "fine", "ai_response": "ok", "timestamp": "2024-05-01T10:00:00"},
                    {"id": 1, "user_message": "no time", "ai_response": "sure"}
                ]
            })))
            .mount(&server)
            .await;

        let client = ApiClient::new(&server.uri());
        let history = client.history("al").await.unwrap();

        assert_eq!(history.len(), 3);
        assert_eq!(history[0].user_message, "broken");
        assert_eq!(history[0].ai_response, "");
        assert_eq!(history[1].ai_response, "ok");
        assert_eq!(history[2].ai_response, "sure");
        assert!(!history[2].timestamp.is_empty());
    }

    #[tokio::test]
    async fn test_history_skips_only_unreadable_entries() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/history/al"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "success": true,
                "conversations": [
                    {"user_message": "no id", "ai_response": "x"},
                    "garbage",
                    {"id": 1, "user_message": "kept", "ai_response": "y", "timestamp": "2024-05-01T09:00:00"}
                ]
            })))
            .mount(&server)
            .await;

        let client = ApiClient::new(&server.uri());
        let history = client.history("al").await.unwrap();

        assert_eq!(history.len(), 1);
        assert_eq!(history[0].user_message, "kept");
    }

    #[tokio::test]
    async fn test_unreachable_server_is_http_error() {
        // Nothing listens on the discard port.
        let client = ApiClient::with_timeout("http://127.0.0.1:9", Duration::from_secs(2)).unwrap();
        let err = client.history("al").await.unwrap_err();

        assert!(matches!(err, ClientError::Http(_)));
        assert_eq!(err.user_message(), crate::error::CONNECT_FAILURE);
    }
}
