//! Persona store
//!
//! Caches the persona list fetched from the backend together with a loading
//! flag and the last load error. Views read snapshots; nothing here returns
//! an error from `load_personas`, a failed load is recorded in `error`.

use crate::api::{ApiError, Persona, RoleBackend};

use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Message stored when the persona list cannot be fetched
pub const LOAD_FAILED_MESSAGE: &str = "Failed to load personas, please check your network connection";

/// Observable state of the persona store
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PersonaState {
    pub personas: Vec<Persona>,
    pub loading: bool,
    pub error: Option<String>,
}

/// Fetch-and-cache store for personas
pub struct PersonaStore {
    backend: Arc<dyn RoleBackend>,
    state: RwLock<PersonaState>,
}

impl PersonaStore {
    /// Create an empty store backed by `backend`
    pub fn new(backend: Arc<dyn RoleBackend>) -> Self {
        Self {
            backend,
            state: RwLock::new(PersonaState::default()),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, PersonaState> {
        self.state.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, PersonaState> {
        self.state.write().unwrap_or_else(|e| e.into_inner())
    }

    /// Fetch the persona list, replacing the cache on success
    pub async fn load_personas(&self) {
        {
            let mut state = self.write();
            state.loading = true;
            state.error = None;
        }

        let result = self.backend.list_roles().await;

        let mut state = self.write();
        match result {
            Ok(personas) => {
                tracing::info!("Loaded {} personas", personas.len());
                state.personas = personas;
            }
            Err(e) => {
                tracing::error!("Failed to load personas: {}", e);
                state.error = Some(LOAD_FAILED_MESSAGE.to_string());
            }
        }
        state.loading = false;
    }

    /// Load the list unless it is already populated
    pub async fn ensure_loaded(&self) {
        if self.read().personas.is_empty() {
            self.load_personas().await;
        }
    }

    /// Snapshot of the whole state
    pub fn snapshot(&self) -> PersonaState {
        self.read().clone()
    }

    /// Cached personas
    pub fn personas(&self) -> Vec<Persona> {
        self.read().personas.clone()
    }

    pub fn is_loading(&self) -> bool {
        self.read().loading
    }

    pub fn error(&self) -> Option<String> {
        self.read().error.clone()
    }

    /// Look up a cached persona
    pub fn get(&self, id: u64) -> Option<Persona> {
        self.read().personas.iter().find(|p| p.id == id).cloned()
    }

    /// Look up a persona, asking the backend when it is not cached
    pub async fn find_or_fetch(&self, id: u64) -> Result<Persona, ApiError> {
        if let Some(persona) = self.get(id) {
            return Ok(persona);
        }

        let persona = self.backend.get_role(id).await?;
        let mut state = self.write();
        if !state.personas.iter().any(|p| p.id == persona.id) {
            state.personas.push(persona.clone());
        }
        Ok(persona)
    }
}
