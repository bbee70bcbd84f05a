//! `/api/chat` wire types and calls

use super::{classify_send_error, classify_status, ApiClient, ApiError, ChatBackend};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Body of `POST /api/chat`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    /// Persona the message is addressed to
    pub role_id: u64,
    /// Existing session, or `null` to open one
    pub session_id: Option<String>,
    /// User message
    pub message: String,
}

/// Response of `POST /api/chat`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatReply {
    /// Session the exchange was recorded under
    pub session_id: String,
    /// Full assistant reply
    pub reply: String,
}

/// One stored exchange from `GET /api/chat/history`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub id: u64,
    pub user_message: String,
    pub assistant_reply: String,
    #[serde(default)]
    pub created_at: Option<String>,
}

#[async_trait]
impl ChatBackend for ApiClient {
    async fn chat(
        &self,
        role_id: u64,
        session_id: Option<&str>,
        message: &str,
    ) -> Result<ChatReply, ApiError> {
        let url = self.endpoint("api/chat")?;
        let request = ChatRequest {
            role_id,
            session_id: session_id.map(str::to_string),
            message: message.to_string(),
        };

        tracing::debug!(
            role_id,
            session_id = ?request.session_id,
            "Sending chat message ({} chars)",
            message.chars().count()
        );

        let response = self
            .http()
            .post(url)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                tracing::error!("Chat request failed: {}", e);
                classify_send_error(e)
            })?;

        if !response.status().is_success() {
            return Err(classify_status(response).await);
        }

        response.json::<ChatReply>().await.map_err(|e| {
            tracing::error!("Failed to parse chat response: {}", e);
            ApiError::Decode(e.to_string())
        })
    }

    async fn history(&self, session_id: &str) -> Result<Vec<HistoryEntry>, ApiError> {
        let url = self.endpoint("api/chat/history")?;

        tracing::debug!(session_id, "Fetching chat history");

        let response = self
            .http()
            .get(url)
            .query(&[("sessionId", session_id)])
            .send()
            .await
            .map_err(|e| {
                tracing::error!("History request failed: {}", e);
                classify_send_error(e)
            })?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            tracing::debug!(session_id, "Session not found, treating history as empty");
            return Ok(Vec::new());
        }

        if !response.status().is_success() {
            return Err(classify_status(response).await);
        }

        response.json::<Vec<HistoryEntry>>().await.map_err(|e| {
            tracing::error!("Failed to parse history response: {}", e);
            ApiError::Decode(e.to_string())
        })
    }
}
