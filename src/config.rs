//! Configuration management for roleplay-chat
//!
//! This module handles loading, parsing, validating, and managing
//! configuration from files, environment variables, and CLI overrides.

use crate::error::{Result, RoleplayError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main configuration structure for roleplay-chat
///
/// Holds the backend location, chat pacing, speech settings and the
/// location of the session-id store.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Backend API settings
    #[serde(default)]
    pub api: ApiConfig,
    /// Chat session behavior
    #[serde(default)]
    pub chat: ChatConfig,
    /// Voice input/output settings
    #[serde(default)]
    pub speech: SpeechConfig,
    /// Local session-id storage
    #[serde(default)]
    pub storage: StorageConfig,
}

/// Backend API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Base URL of the backend; `/api/chat` and `/api/roles` hang off it
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Public URL of the web client, used to build share links
    #[serde(default = "default_public_url")]
    pub public_url: String,

    /// Request timeout (seconds)
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
}

fn default_base_url() -> String {
    "http://localhost:8080".to_string()
}

fn default_public_url() -> String {
    "http://localhost:5173".to_string()
}

fn default_timeout() -> u64 {
    60
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            public_url: default_public_url(),
            timeout_seconds: default_timeout(),
        }
    }
}

/// Chat session configuration
///
/// Controls the greeting that opens a new session, the pacing of the
/// simulated typing effect and the "AI is thinking" indicator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatConfig {
    /// Synthetic message sent to open a new session
    #[serde(default = "default_greeting")]
    pub greeting: String,

    /// Base per-character delay for the typing effect (milliseconds)
    #[serde(default = "default_typing_base_delay")]
    pub typing_base_delay_ms: u64,

    /// Reply length at which typing runs at half the base delay
    #[serde(default = "default_typing_length_scale")]
    pub typing_length_scale: usize,

    /// Lower bound for the length speed-up factor
    #[serde(default = "default_typing_min_factor")]
    pub typing_min_factor: f64,

    /// Earliest moment the thinking placeholder may appear (milliseconds)
    #[serde(default = "default_thinking_min")]
    pub thinking_min_ms: u64,

    /// Latest moment the thinking placeholder may appear (milliseconds)
    #[serde(default = "default_thinking_max")]
    pub thinking_max_ms: u64,

    /// Read replies aloud once they finish typing
    #[serde(default = "default_true")]
    pub auto_speak: bool,
}

fn default_greeting() -> String {
    "Hello".to_string()
}

fn default_typing_base_delay() -> u64 {
    50
}

fn default_typing_length_scale() -> usize {
    200
}

fn default_typing_min_factor() -> f64 {
    0.2
}

fn default_thinking_min() -> u64 {
    500
}

fn default_thinking_max() -> u64 {
    1500
}

fn default_true() -> bool {
    true
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            greeting: default_greeting(),
            typing_base_delay_ms: default_typing_base_delay(),
            typing_length_scale: default_typing_length_scale(),
            typing_min_factor: default_typing_min_factor(),
            thinking_min_ms: default_thinking_min(),
            thinking_max_ms: default_thinking_max(),
            auto_speak: default_true(),
        }
    }
}

/// Speech configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpeechConfig {
    /// Master switch for voice input and output
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// BCP-47 language tag for recognition and synthesis
    #[serde(default = "default_language")]
    pub language: String,

    /// Synthesis rate (1.0 = normal)
    #[serde(default = "default_rate")]
    pub rate: f32,

    /// Synthesis pitch (1.0 = normal)
    #[serde(default = "default_rate")]
    pub pitch: f32,

    /// Recognition is force-stopped after this many seconds
    #[serde(default = "default_recognition_timeout")]
    pub recognition_timeout_seconds: u64,

    /// Synthesizer commands tried in order; the first found on PATH wins
    #[serde(default = "default_synthesizers")]
    pub synthesizers: Vec<String>,

    /// Recognizer commands tried in order; each prints a transcript on stdout
    #[serde(default)]
    pub recognizers: Vec<String>,
}

fn default_language() -> String {
    "zh-CN".to_string()
}

fn default_rate() -> f32 {
    1.0
}

fn default_recognition_timeout() -> u64 {
    10
}

fn default_synthesizers() -> Vec<String> {
    vec![
        "say".to_string(),
        "espeak-ng".to_string(),
        "espeak".to_string(),
        "spd-say".to_string(),
    ]
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            language: default_language(),
            rate: default_rate(),
            pitch: default_rate(),
            recognition_timeout_seconds: default_recognition_timeout(),
            synthesizers: default_synthesizers(),
            recognizers: Vec::new(),
        }
    }
}

/// Session-id storage configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Database path; defaults to the platform data directory
    #[serde(default)]
    pub db_path: Option<PathBuf>,
}

impl Config {
    /// Load configuration from file with environment and CLI overrides
    ///
    /// # Arguments
    ///
    /// * `path` - Path to configuration file
    /// * `cli` - CLI arguments for overrides
    ///
    /// # Returns
    ///
    /// Returns the loaded and merged configuration
    ///
    /// # Errors
    ///
    /// Returns error if the file exists but cannot be read or parsed
    pub fn load(path: &str, cli: &crate::cli::Cli) -> Result<Self> {
        let mut config = if Path::new(path).exists() {
            Self::from_file(path)?
        } else {
            tracing::warn!("Config file not found at {}, using defaults", path);
            Self::default()
        };

        config.apply_env_vars();
        config.apply_cli_overrides(cli);

        Ok(config)
    }

    fn from_file(path: &str) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| RoleplayError::Config(format!("Failed to read config file: {}", e)))?;
        serde_yaml::from_str(&contents)
            .map_err(|e| RoleplayError::Config(format!("Failed to parse config: {}", e)).into())
    }

    fn apply_env_vars(&mut self) {
        if let Ok(base_url) = std::env::var("ROLEPLAY_API_BASE_URL") {
            tracing::debug!(base_url = %base_url, "Env override: ROLEPLAY_API_BASE_URL");
            self.api.base_url = base_url;
        }

        if let Ok(public_url) = std::env::var("ROLEPLAY_PUBLIC_URL") {
            tracing::debug!(public_url = %public_url, "Env override: ROLEPLAY_PUBLIC_URL");
            self.api.public_url = public_url;
        }

        if let Ok(timeout) = std::env::var("ROLEPLAY_TIMEOUT_SECONDS") {
            if let Ok(value) = timeout.parse() {
                self.api.timeout_seconds = value;
            } else {
                tracing::warn!("Invalid ROLEPLAY_TIMEOUT_SECONDS: {}", timeout);
            }
        }

        if let Ok(enabled) = std::env::var("ROLEPLAY_SPEECH_ENABLED") {
            match enabled.parse::<bool>() {
                Ok(v) => self.speech.enabled = v,
                Err(_) => tracing::warn!("Invalid value for ROLEPLAY_SPEECH_ENABLED: {}", enabled),
            }
        }

        if let Ok(language) = std::env::var("ROLEPLAY_SPEECH_LANGUAGE") {
            self.speech.language = language;
        }

        if let Ok(db_path) = std::env::var("ROLEPLAY_STORAGE_DB") {
            self.storage.db_path = Some(PathBuf::from(db_path));
        }
    }

    fn apply_cli_overrides(&mut self, cli: &crate::cli::Cli) {
        if let Some(api_url) = &cli.api_url {
            tracing::debug!("CLI override: api.base_url = {}", api_url);
            self.api.base_url = api_url.clone();
        }
        if cli.no_speech {
            self.speech.enabled = false;
        }
    }

    /// Validate the configuration
    ///
    /// # Errors
    ///
    /// Returns error if any value is out of range or a URL does not parse
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("api.base_url", &self.api.base_url),
            ("api.public_url", &self.api.public_url),
        ] {
            if value.trim().is_empty() {
                return Err(RoleplayError::Config(format!("{} cannot be empty", name)).into());
            }
            url::Url::parse(value).map_err(|e| {
                RoleplayError::Config(format!("{} is not a valid URL: {}", name, e))
            })?;
        }

        if self.api.timeout_seconds == 0 {
            return Err(RoleplayError::Config(
                "api.timeout_seconds must be greater than 0".to_string(),
            )
            .into());
        }

        if self.chat.greeting.trim().is_empty() {
            return Err(RoleplayError::Config("chat.greeting cannot be empty".to_string()).into());
        }

        if self.chat.thinking_min_ms > self.chat.thinking_max_ms {
            return Err(RoleplayError::Config(
                "chat.thinking_min_ms must not exceed chat.thinking_max_ms".to_string(),
            )
            .into());
        }

        if self.chat.typing_length_scale == 0 {
            return Err(RoleplayError::Config(
                "chat.typing_length_scale must be greater than 0".to_string(),
            )
            .into());
        }

        if self.chat.typing_min_factor <= 0.0 || self.chat.typing_min_factor > 1.0 {
            return Err(RoleplayError::Config(
                "chat.typing_min_factor must be between 0.0 and 1.0".to_string(),
            )
            .into());
        }

        if self.speech.rate <= 0.0 || self.speech.pitch <= 0.0 {
            return Err(RoleplayError::Config(
                "speech.rate and speech.pitch must be greater than 0".to_string(),
            )
            .into());
        }

        if self.speech.recognition_timeout_seconds == 0 {
            return Err(RoleplayError::Config(
                "speech.recognition_timeout_seconds must be greater than 0".to_string(),
            )
            .into());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::Cli;
    use serial_test::serial;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.api.base_url, "http://localhost:8080");
        assert_eq!(config.chat.greeting, "Hello");
        assert_eq!(config.chat.thinking_min_ms, 500);
        assert_eq!(config.chat.thinking_max_ms, 1500);
        assert_eq!(config.speech.language, "zh-CN");
        assert_eq!(config.speech.recognition_timeout_seconds, 10);
    }

    #[test]
    fn test_config_validation_success() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_config_validation_bad_base_url() {
        let mut config = Config::default();
        config.api.base_url = "not a url".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_empty_public_url() {
        let mut config = Config::default();
        config.api.public_url = "  ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_zero_timeout() {
        let mut config = Config::default();
        config.api.timeout_seconds = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_inverted_thinking_range() {
        let mut config = Config::default();
        config.chat.thinking_min_ms = 2000;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_bad_min_factor() {
        let mut config = Config::default();
        config.chat.typing_min_factor = 0.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_zero_rate() {
        let mut config = Config::default();
        config.speech.rate = 0.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_from_yaml() {
        let yaml = r#"
api:
  base_url: "http://backend:9000"
chat:
  greeting: "Hi there"
  auto_speak: false
speech:
  language: "en-US"
  recognizers: ["my-stt"]
"#;
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.api.base_url, "http://backend:9000");
        assert_eq!(config.api.timeout_seconds, 60);
        assert_eq!(config.chat.greeting, "Hi there");
        assert!(!config.chat.auto_speak);
        assert_eq!(config.speech.language, "en-US");
        assert_eq!(config.speech.recognizers, vec!["my-stt".to_string()]);
        assert_eq!(config.speech.synthesizers.len(), 4);
    }

    #[test]
    #[serial]
    fn test_load_missing_file_uses_defaults() {
        let cli = Cli::default();
        let config = Config::load("/nonexistent/config.yaml", &cli).unwrap();
        assert_eq!(config.chat.greeting, "Hello");
    }

    #[test]
    #[serial]
    fn test_env_overrides() {
        std::env::set_var("ROLEPLAY_API_BASE_URL", "http://env-host:1234");
        std::env::set_var("ROLEPLAY_SPEECH_ENABLED", "false");
        std::env::set_var("ROLEPLAY_TIMEOUT_SECONDS", "not-a-number");

        let cli = Cli::default();
        let config = Config::load("/nonexistent/config.yaml", &cli).unwrap();
        assert_eq!(config.api.base_url, "http://env-host:1234");
        assert!(!config.speech.enabled);
        assert_eq!(config.api.timeout_seconds, 60);

        std::env::remove_var("ROLEPLAY_API_BASE_URL");
        std::env::remove_var("ROLEPLAY_SPEECH_ENABLED");
        std::env::remove_var("ROLEPLAY_TIMEOUT_SECONDS");
    }

    #[test]
    #[serial]
    fn test_cli_overrides_win_over_env() {
        std::env::set_var("ROLEPLAY_API_BASE_URL", "http://env-host:1234");

        let cli = Cli {
            api_url: Some("http://cli-host:4321".to_string()),
            no_speech: true,
            ..Cli::default()
        };
        let config = Config::load("/nonexistent/config.yaml", &cli).unwrap();
        assert_eq!(config.api.base_url, "http://cli-host:4321");
        assert!(!config.speech.enabled);

        std::env::remove_var("ROLEPLAY_API_BASE_URL");
    }
}
