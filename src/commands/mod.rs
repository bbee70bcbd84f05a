/*!
Command handlers for the CLI

Each handler backs one subcommand (and one route of the web client):

- `roles`: persona list and details, the persona editor and share links
- `chat`: interactive chat with a persona
- `session`: maintenance of stored session ids

Handlers share an [`AppContext`] holding the configuration, the HTTP
backends and the persona store.
*/

use crate::api::{ApiClient, ChatBackend, RoleBackend};
use crate::chat::ChatStore;
use crate::config::Config;
use crate::error::Result;
use crate::personas::PersonaStore;
use crate::routes::Route;
use crate::speech::SpeechBridge;
use crate::storage::{LocalStorage, SqliteStorage};

use std::sync::Arc;

pub mod chat;
pub mod roles;
pub mod session;
pub mod special_commands;

/// Services shared by every command handler
pub struct AppContext {
    pub config: Config,
    pub chat: Arc<dyn ChatBackend>,
    pub roles: Arc<dyn RoleBackend>,
    pub personas: Arc<PersonaStore>,
}

impl AppContext {
    /// Build the HTTP client described by `config`
    pub fn new(config: Config) -> Result<Self> {
        let api = Arc::new(ApiClient::new(&config.api)?);
        Ok(Self::with_backends(config, api.clone(), api))
    }

    /// Use explicit backends
    pub fn with_backends(
        config: Config,
        chat: Arc<dyn ChatBackend>,
        roles: Arc<dyn RoleBackend>,
    ) -> Self {
        let personas = Arc::new(PersonaStore::new(roles.clone()));
        Self {
            config,
            chat,
            roles,
            personas,
        }
    }

    /// Open the session-id store
    pub fn open_storage(&self) -> Result<Arc<dyn LocalStorage>> {
        Ok(Arc::new(SqliteStorage::open(&self.config.storage)?))
    }

    /// Chat store wired to this context's backends
    pub fn chat_store(
        &self,
        storage: Arc<dyn LocalStorage>,
        speech: Arc<SpeechBridge>,
    ) -> ChatStore {
        ChatStore::new(
            self.chat.clone(),
            self.personas.clone(),
            storage,
            speech,
            self.config.chat.clone(),
        )
    }
}

/// Open the screen addressed by `path` (e.g. `/chat/3`)
pub async fn open_path(ctx: &AppContext, path: &str) -> Result<()> {
    let route = Route::parse(path)?;
    tracing::info!("Opening {}", route);

    match route {
        Route::PersonaList => roles::list_roles(ctx, false).await,
        Route::Chat(id) => chat::run_chat(ctx, id, false, false).await,
        Route::PersonaEditor => roles::add_role(ctx, None, None, None).await,
        Route::Share(id) => roles::share_role(ctx, id).await,
    }
}
