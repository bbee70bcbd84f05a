//! `/api/roles` wire types and calls

use super::{
    classify_send_error, classify_status, server_message, ApiClient, ApiError, RoleBackend,
};

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// A selectable role-play character
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Persona {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, alias = "avatarUrl")]
    pub avatar: Option<String>,
}

/// Fields for `POST /api/roles/addrole`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewPersona {
    pub name: String,
    pub description: String,
    pub avatar: Option<PathBuf>,
}

impl NewPersona {
    /// Reject blank fields before anything goes over the wire
    pub fn validate(&self) -> Result<(), ApiError> {
        if self.name.trim().is_empty() {
            return Err(ApiError::Validation(
                "Persona name cannot be empty".to_string(),
            ));
        }
        if self.description.trim().is_empty() {
            return Err(ApiError::Validation(
                "Persona description cannot be empty".to_string(),
            ));
        }
        Ok(())
    }
}

const CREATE_FAILED: &str = "Failed to create persona";

fn avatar_mime(path: &Path) -> &'static str {
    match path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .as_deref()
    {
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        _ => "application/octet-stream",
    }
}

async fn avatar_part(path: &Path) -> Result<Part, ApiError> {
    let bytes = tokio::fs::read(path).await.map_err(|e| {
        ApiError::Validation(format!(
            "Cannot read avatar file {}: {}",
            path.display(),
            e
        ))
    })?;
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "avatar".to_string());

    Part::bytes(bytes)
        .file_name(file_name)
        .mime_str(avatar_mime(path))
        .map_err(|e| ApiError::Request(e.to_string()))
}

#[async_trait]
impl RoleBackend for ApiClient {
    async fn list_roles(&self) -> Result<Vec<Persona>, ApiError> {
        let url = self.endpoint("api/roles")?;
        tracing::debug!("Fetching persona list");

        let response = self.http().get(url).send().await.map_err(|e| {
            tracing::error!("Failed to fetch persona list: {}", e);
            classify_send_error(e)
        })?;

        if !response.status().is_success() {
            return Err(classify_status(response).await);
        }

        response.json::<Vec<Persona>>().await.map_err(|e| {
            tracing::error!("Failed to parse persona list: {}", e);
            ApiError::Decode(e.to_string())
        })
    }

    async fn get_role(&self, id: u64) -> Result<Persona, ApiError> {
        let url = self.endpoint(&format!("api/roles/{}", id))?;
        tracing::debug!(id, "Fetching persona");

        let response = self.http().get(url).send().await.map_err(|e| {
            tracing::error!("Failed to fetch persona {}: {}", id, e);
            classify_send_error(e)
        })?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(ApiError::NotFound(format!("persona {}", id)));
        }
        if !response.status().is_success() {
            return Err(classify_status(response).await);
        }

        response.json::<Persona>().await.map_err(|e| {
            tracing::error!("Failed to parse persona {}: {}", id, e);
            ApiError::Decode(e.to_string())
        })
    }

    async fn create_role(&self, persona: &NewPersona) -> Result<Persona, ApiError> {
        persona.validate()?;
        let url = self.endpoint("api/roles/addrole")?;

        let mut form = Form::new()
            .text("name", persona.name.trim().to_string())
            .text("description", persona.description.trim().to_string());
        if let Some(path) = &persona.avatar {
            form = form.part("avatar", avatar_part(path).await?);
        }

        tracing::info!(name = %persona.name, with_avatar = persona.avatar.is_some(), "Creating persona");

        let response = self
            .http()
            .post(url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| {
                tracing::error!("Failed to create persona: {}", e);
                classify_send_error(e)
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!("Persona creation rejected {}: {}", status, body);
            let message = server_message(&body).unwrap_or_else(|| CREATE_FAILED.to_string());
            return Err(ApiError::Rejected(message));
        }

        response.json::<Persona>().await.map_err(|e| {
            tracing::error!("Failed to parse created persona: {}", e);
            ApiError::Decode(e.to_string())
        })
    }
}
