//! roleplay-chat - terminal client for role-playing AI personas
//!
//! This library provides the core functionality of the `roleplay` CLI: the
//! HTTP client for the role-play backend, the persona and chat stores, the
//! simulated typing reveal and the speech bridge.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//!
//! - `api`: HTTP client for chat, history and persona endpoints
//! - `personas`: Cached persona list
//! - `chat`: Conversation state, session handling and simulated typing
//! - `speech`: Text-to-speech and speech recognition through local engines
//! - `storage`: Persona-to-session id persistence
//! - `routes`: Screen paths (`/`, `/chat/:id`, ...)
//! - `views`: Terminal rendering of each screen
//! - `commands`: Subcommand handlers
//! - `config`: Configuration management and validation
//! - `error`: Error types and result aliases
//! - `cli`: Command-line interface definition
//!
//! # Example
//!
//! ```no_run
//! use roleplay_chat::Config;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load("config.yaml", &Default::default())?;
//!     config.validate()?;
//!
//!     let ctx = roleplay_chat::commands::AppContext::new(config)?;
//!     roleplay_chat::commands::roles::list_roles(&ctx, false).await
//! }
//! ```

pub mod api;
pub mod chat;
pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod personas;
pub mod routes;
pub mod speech;
pub mod storage;
pub mod views;

// Re-export commonly used types
pub use api::{ApiClient, ApiError, Persona};
pub use chat::{ChatMessage, ChatState, ChatStore};
pub use config::Config;
pub use error::{Result, RoleplayError};
pub use personas::PersonaStore;
pub use routes::Route;
pub use speech::SpeechBridge;

#[cfg(test)]
pub mod test_utils;
