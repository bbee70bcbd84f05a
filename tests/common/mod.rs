use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;

use roleplay_chat::api::ApiClient;
use roleplay_chat::config::{ApiConfig, ChatConfig};
use roleplay_chat::storage::SqliteStorage;

#[allow(dead_code)]
pub fn create_temp_storage() -> (SqliteStorage, TempDir) {
    let tmp = TempDir::new().expect("failed to create tempdir");
    let db_path = tmp.path().join("storage.db");
    let storage =
        SqliteStorage::new_with_path(db_path).expect("failed to create sqlite storage with path");
    (storage, tmp)
}

#[allow(dead_code)]
pub fn temp_config_file(contents: &str) -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().expect("failed to create tempdir");
    let config_path = temp_dir.path().join("config.yaml");
    fs::write(&config_path, contents).expect("failed to write config file");
    (temp_dir, config_path)
}

/// Client pointed at a mock server
#[allow(dead_code)]
pub fn api_client(base_url: &str) -> Arc<ApiClient> {
    let config = ApiConfig {
        base_url: base_url.to_string(),
        timeout_seconds: 5,
        ..Default::default()
    };
    Arc::new(ApiClient::new(&config).expect("valid api config"))
}

/// Chat pacing fast enough for real-time tests
#[allow(dead_code)]
pub fn fast_chat_config() -> ChatConfig {
    ChatConfig {
        typing_base_delay_ms: 1,
        thinking_min_ms: 5,
        thinking_max_ms: 10,
        auto_speak: false,
        ..Default::default()
    }
}
