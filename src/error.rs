//! Error types for roleplay-chat
//!
//! This module defines the crate-wide error type used for configuration,
//! storage and plumbing failures, using `thiserror` for ergonomic error
//! handling. HTTP classification lives in [`crate::api::ApiError`] and speech
//! failures in [`crate::speech`], since both carry user-facing text.

use thiserror::Error;

/// Main error type for roleplay-chat operations
///
/// Covers everything that is not an API or speech failure: configuration
/// loading, session-id storage, routing and the usual IO/serde conversions.
#[derive(Error, Debug)]
pub enum RoleplayError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Session-id storage errors (database operations)
    #[error("Storage error: {0}")]
    Storage(String),

    /// A path did not match any known screen
    #[error("Unknown route: {0}")]
    UnknownRoute(String),

    /// A persona id that the backend does not know about
    #[error("Persona not found: {0}")]
    PersonaNotFound(u64),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// YAML parsing errors
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// URL parsing errors
    #[error("URL error: {0}")]
    Url(#[from] url::ParseError),
}

/// Result type alias for roleplay-chat operations
///
/// Uses `anyhow::Error` so command handlers can mix typed errors from the
/// API, speech and storage layers with added context.
pub type Result<T> = anyhow::Result<T>;
