//! HTTP client for the role-play backend
//!
//! Thin wrappers around `/api/chat` and `/api/roles`. Every failure is
//! translated into an [`ApiError`] whose `Display` text is fit to show the
//! user directly; nothing here retries.
//!
//! The chat store and persona store depend on the [`ChatBackend`] and
//! [`RoleBackend`] traits rather than on [`ApiClient`], so tests can swap in
//! scripted backends.

use crate::config::ApiConfig;
use crate::error::{Result, RoleplayError};

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;
use url::Url;

pub mod chat;
pub mod roles;

pub use chat::{ChatReply, ChatRequest, HistoryEntry};
pub use roles::{NewPersona, Persona};

/// Failure of a backend call, classified for display
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    /// The server rejected the request parameters (HTTP 400)
    #[error("Invalid request parameters, please check your input")]
    BadRequest {
        /// Server-provided detail, if any
        detail: Option<String>,
    },

    /// The AI service is down (HTTP 503)
    #[error("AI service is temporarily unavailable, please try again later")]
    ServiceUnavailable,

    /// The request was sent but no response came back
    #[error("Unable to connect to the server, please check your network connection")]
    Unreachable(String),

    /// The requested resource does not exist (HTTP 404)
    #[error("Not found: {0}")]
    NotFound(String),

    /// Any other non-success status
    #[error("Server error {status}: {message}")]
    Status {
        /// HTTP status code
        status: u16,
        /// Server-provided message or reason phrase
        message: String,
    },

    /// The server refused the operation with its own explanation
    #[error("{0}")]
    Rejected(String),

    /// The request could not be built
    #[error("An error occurred while sending the request: {0}")]
    Request(String),

    /// The response body did not match the expected shape
    #[error("Unexpected response from server: {0}")]
    Decode(String),

    /// Input rejected before any request was made
    #[error("{0}")]
    Validation(String),
}

impl ApiError {
    /// Text suitable for an in-conversation error message
    pub fn user_message(&self) -> String {
        self.to_string()
    }

    /// Whether the failure happened before reaching the server
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Unreachable(_) | Self::Request(_))
    }
}

/// Error body produced by the backend's exception handler
#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
}

/// Backend operations used by the chat store
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Send one message; a `None` session id asks the server to open a session
    async fn chat(
        &self,
        role_id: u64,
        session_id: Option<&str>,
        message: &str,
    ) -> std::result::Result<ChatReply, ApiError>;

    /// Fetch the history of a session, newest entry first
    ///
    /// An unknown session yields an empty list.
    async fn history(&self, session_id: &str) -> std::result::Result<Vec<HistoryEntry>, ApiError>;
}

/// Backend operations used by the persona store and editor
#[async_trait]
pub trait RoleBackend: Send + Sync {
    /// List every persona
    async fn list_roles(&self) -> std::result::Result<Vec<Persona>, ApiError>;

    /// Fetch one persona
    async fn get_role(&self, id: u64) -> std::result::Result<Persona, ApiError>;

    /// Create a persona, uploading the avatar file when present
    async fn create_role(&self, persona: &NewPersona) -> std::result::Result<Persona, ApiError>;
}

/// reqwest-based client for the backend
///
/// # Examples
///
/// ```
/// use roleplay_chat::api::ApiClient;
/// use roleplay_chat::config::ApiConfig;
///
/// let client = ApiClient::new(&ApiConfig::default()).unwrap();
/// assert_eq!(client.base_url().as_str(), "http://localhost:8080/");
/// ```
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: Client,
    base_url: Url,
}

impl ApiClient {
    /// Create a client from configuration
    ///
    /// # Errors
    ///
    /// Returns error if the base URL is invalid or the HTTP client cannot be built
    pub fn new(config: &ApiConfig) -> Result<Self> {
        let mut base = config.base_url.trim().to_string();
        if !base.ends_with('/') {
            base.push('/');
        }
        let base_url = Url::parse(&base)
            .map_err(|e| RoleplayError::Config(format!("Invalid api.base_url: {}", e)))?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .user_agent(concat!("roleplay-chat/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| RoleplayError::Config(format!("Failed to create HTTP client: {}", e)))?;

        tracing::info!("Initialized API client: base_url={}", base_url);

        Ok(Self { client, base_url })
    }

    /// Normalized base URL (always ends with `/`)
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub(crate) fn endpoint(&self, path: &str) -> std::result::Result<Url, ApiError> {
        self.base_url
            .join(path.trim_start_matches('/'))
            .map_err(|e| ApiError::Request(e.to_string()))
    }

    pub(crate) fn http(&self) -> &Client {
        &self.client
    }
}

/// Map a failed `send()` to an [`ApiError`]
pub(crate) fn classify_send_error(err: reqwest::Error) -> ApiError {
    if err.is_builder() {
        ApiError::Request(err.to_string())
    } else {
        ApiError::Unreachable(err.to_string())
    }
}

/// Turn a non-success response into an [`ApiError`], consuming the body
pub(crate) async fn classify_status(response: Response) -> ApiError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    let message = server_message(&body);
    tracing::error!("Server returned error {}: {}", status, body);

    match status {
        StatusCode::BAD_REQUEST => ApiError::BadRequest { detail: message },
        StatusCode::SERVICE_UNAVAILABLE => ApiError::ServiceUnavailable,
        StatusCode::NOT_FOUND => ApiError::NotFound(message.unwrap_or_else(|| body.clone())),
        other => ApiError::Status {
            status: other.as_u16(),
            message: message.unwrap_or_else(|| {
                other
                    .canonical_reason()
                    .unwrap_or("unknown error")
                    .to_string()
            }),
        },
    }
}

/// Extract the `message` field from a backend error body
pub(crate) fn server_message(body: &str) -> Option<String> {
    serde_json::from_str::<ErrorBody>(body)
        .ok()
        .and_then(|b| b.message)
        .filter(|m| !m.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_gets_trailing_slash() {
        let config = ApiConfig {
            base_url: "http://example.com/backend".to_string(),
            ..Default::default()
        };
        let client = ApiClient::new(&config).unwrap();
        assert_eq!(client.base_url().as_str(), "http://example.com/backend/");
        assert_eq!(
            client.endpoint("/api/chat").unwrap().as_str(),
            "http://example.com/backend/api/chat"
        );
    }

    #[test]
    fn test_invalid_base_url_is_config_error() {
        let config = ApiConfig {
            base_url: "::not a url::".to_string(),
            ..Default::default()
        };
        let err = ApiClient::new(&config).unwrap_err();
        assert!(err.to_string().contains("Invalid api.base_url"));
    }

    #[test]
    fn test_server_message_extraction() {
        assert_eq!(
            server_message(r#"{"status":400,"error":"Bad Request","message":"name is blank"}"#),
            Some("name is blank".to_string())
        );
        assert_eq!(server_message(r#"{"message":"  "}"#), None);
        assert_eq!(server_message("plain text"), None);
    }

    #[test]
    fn test_user_messages() {
        assert_eq!(
            ApiError::BadRequest { detail: None }.user_message(),
            "Invalid request parameters, please check your input"
        );
        assert_eq!(
            ApiError::ServiceUnavailable.user_message(),
            "AI service is temporarily unavailable, please try again later"
        );
        assert_eq!(
            ApiError::Unreachable("connection refused".into()).user_message(),
            "Unable to connect to the server, please check your network connection"
        );
        assert!(ApiError::Unreachable(String::new()).is_transport());
        assert!(!ApiError::ServiceUnavailable.is_transport());
    }
}
