//! Chat session store
//!
//! [`ChatStore`] owns the conversation with one persona at a time: it resolves
//! or creates the backend session, keeps the message list, paces replies with
//! a simulated typing effect, shows an "AI is thinking" placeholder when a
//! reply is slow and hands finished replies to the speech bridge.
//!
//! State lives behind a mutex that is never held across an `.await`. Views
//! read [`ChatStore::snapshot`] and follow [`ChatEvent`]s from
//! [`ChatStore::subscribe`].
//!
//! A send moves through `idle -> sending -> streaming -> idle`; any failure
//! returns to `idle` with an error-styled message appended.

mod message;
mod typing;

pub use message::{ChatEvent, ChatMessage, ChatState, Sender, THINKING_TEXT};
pub use typing::{char_factor, TypingProfile};

use crate::api::{ApiError, ChatBackend};
use crate::config::ChatConfig;
use crate::error::Result;
use crate::personas::PersonaStore;
use crate::speech::SpeechBridge;
use crate::storage::{session_key, LocalStorage};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

const EVENT_CAPACITY: usize = 1024;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

/// Conversation state machine for the active persona
pub struct ChatStore {
    backend: Arc<dyn ChatBackend>,
    personas: Arc<PersonaStore>,
    storage: Arc<dyn LocalStorage>,
    speech: Arc<SpeechBridge>,
    config: ChatConfig,
    typing: TypingProfile,
    state: Arc<Mutex<ChatState>>,
    events: broadcast::Sender<ChatEvent>,
    rng: Mutex<StdRng>,
    thinking: Mutex<Option<JoinHandle<()>>>,
    /// Current thinking-timer ticket; bumped under the state lock when the
    /// reply arrives so a timer that already fired sees it is stale
    thinking_ticket: Arc<AtomicU64>,
    streaming: Mutex<Option<JoinHandle<()>>>,
    active_streams: Arc<Mutex<HashSet<u64>>>,
    /// Bumped on every reset so late replies can tell they are stale
    epoch: AtomicU64,
    last_id: AtomicU64,
}

impl ChatStore {
    pub fn new(
        backend: Arc<dyn ChatBackend>,
        personas: Arc<PersonaStore>,
        storage: Arc<dyn LocalStorage>,
        speech: Arc<SpeechBridge>,
        config: ChatConfig,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            backend,
            personas,
            storage,
            speech,
            typing: TypingProfile::from(&config),
            config,
            state: Arc::new(Mutex::new(ChatState::default())),
            events,
            rng: Mutex::new(StdRng::from_os_rng()),
            thinking: Mutex::new(None),
            thinking_ticket: Arc::new(AtomicU64::new(0)),
            streaming: Mutex::new(None),
            active_streams: Arc::new(Mutex::new(HashSet::new())),
            epoch: AtomicU64::new(0),
            last_id: AtomicU64::new(0),
        }
    }

    /// Use a deterministic random source for typing jitter and thinking delay
    pub fn with_seed(self, seed: u64) -> Self {
        *lock(&self.rng) = StdRng::seed_from_u64(seed);
        self
    }

    /// Copy of the current state
    pub fn snapshot(&self) -> ChatState {
        lock(&self.state).clone()
    }

    /// Follow state changes
    pub fn subscribe(&self) -> broadcast::Receiver<ChatEvent> {
        self.events.subscribe()
    }

    pub fn speech(&self) -> &Arc<SpeechBridge> {
        &self.speech
    }

    pub fn personas(&self) -> &Arc<PersonaStore> {
        &self.personas
    }

    fn emit(&self, event: ChatEvent) {
        // No subscribers is fine
        let _ = self.events.send(event);
    }

    fn epoch(&self) -> u64 {
        self.epoch.load(Ordering::SeqCst)
    }

    /// Millisecond timestamp, strictly increasing per store
    fn next_id(&self) -> u64 {
        let now = chrono::Utc::now().timestamp_millis().max(0) as u64;
        match self
            .last_id
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| {
                Some(now.max(last + 1))
            }) {
            Ok(last) | Err(last) => now.max(last + 1),
        }
    }

    fn reset(&self, role_id: Option<u64>) {
        self.epoch.fetch_add(1, Ordering::SeqCst);
        if let Some(handle) = lock(&self.thinking).take() {
            handle.abort();
        }
        *lock(&self.state) = ChatState::for_role(role_id);
        self.emit(ChatEvent::Reset { role_id });
    }

    fn push_message(&self, message: ChatMessage) {
        lock(&self.state).messages.push(message.clone());
        self.emit(ChatEvent::MessageAppended(message));
    }

    // ------------------------------------------------------------------
    // Session lifecycle
    // ------------------------------------------------------------------

    /// Open the conversation with `persona_id`
    ///
    /// Resumes the stored session unless `force_new`; a stored session with
    /// no history is treated as expired and replaced. Failures end up in the
    /// message list as error messages.
    pub async fn init_chat(&self, persona_id: u64, force_new: bool) {
        self.reset(Some(persona_id));
        tracing::info!(persona_id, force_new, "Initializing chat");

        self.personas.ensure_loaded().await;

        let key = session_key(persona_id);
        let stored = if force_new {
            None
        } else {
            self.storage.get_item(&key).unwrap_or_else(|e| {
                tracing::warn!("Failed to read stored session id: {:#}", e);
                None
            })
        };

        if let Some(session_id) = stored {
            tracing::info!(persona_id, %session_id, "Resuming stored session");
            lock(&self.state).session_id = Some(session_id.clone());

            match self.fetch_history(&session_id).await {
                Ok(messages) if !messages.is_empty() => {
                    self.replace_messages(&session_id, messages);
                    return;
                }
                Ok(_) => {
                    tracing::info!(%session_id, "Stored session has no history, starting a new one");
                    if let Err(e) = self.storage.remove_item(&key) {
                        tracing::warn!("Failed to remove stored session id: {:#}", e);
                    }
                    lock(&self.state).session_id = None;
                }
                Err(e) => {
                    tracing::error!("Failed to resume session {}: {}", session_id, e);
                    self.push_message(ChatMessage::error(e.user_message()));
                    return;
                }
            }
        }

        self.create_session(persona_id).await;
    }

    async fn create_session(&self, persona_id: u64) {
        let epoch = self.epoch();

        match self
            .backend
            .chat(persona_id, None, &self.config.greeting)
            .await
        {
            Ok(reply) => {
                if self.epoch() != epoch {
                    return;
                }
                self.record_session(persona_id, &reply.session_id);

                let history = self.load_history().await;
                if history.is_empty() && self.epoch() == epoch {
                    let text = self.welcome_text(persona_id).await;
                    self.push_message(ChatMessage::welcome(text));
                }
            }
            Err(e) => {
                tracing::error!("Failed to create session: {}", e);
                self.push_message(ChatMessage::error(e.user_message()));
            }
        }
    }

    async fn welcome_text(&self, persona_id: u64) -> String {
        match self.personas.find_or_fetch(persona_id).await {
            Ok(persona) if persona.description.trim().is_empty() => format!(
                "Hi, I'm {}. What would you like to talk about?",
                persona.name
            ),
            Ok(persona) => format!("Hi, I'm {}. {}", persona.name, persona.description.trim()),
            Err(e) => {
                tracing::warn!("Could not look up persona {}: {}", persona_id, e);
                "Hi! Say something to start the conversation.".to_string()
            }
        }
    }

    /// Adopt `session_id` for `role_id`, persisting it when it changed
    fn record_session(&self, role_id: u64, session_id: &str) {
        {
            let mut state = lock(&self.state);
            if state.session_id.as_deref() == Some(session_id) {
                return;
            }
            state.session_id = Some(session_id.to_string());
        }

        if let Err(e) = self.storage.set_item(&session_key(role_id), session_id) {
            tracing::warn!("Failed to persist session id: {:#}", e);
        }
        tracing::info!(role_id, session_id, "Session started");
        self.emit(ChatEvent::SessionChanged(session_id.to_string()));
    }

    // ------------------------------------------------------------------
    // History
    // ------------------------------------------------------------------

    async fn fetch_history(
        &self,
        session_id: &str,
    ) -> std::result::Result<Vec<ChatMessage>, ApiError> {
        let mut entries = match self.backend.history(session_id).await {
            Ok(entries) => entries,
            Err(ApiError::NotFound(_)) => Vec::new(),
            Err(e) => return Err(e),
        };
        entries.reverse();
        Ok(entries.iter().flat_map(ChatMessage::from_history).collect())
    }

    fn replace_messages(&self, session_id: &str, messages: Vec<ChatMessage>) {
        let mut state = lock(&self.state);
        if state.session_id.as_deref() != Some(session_id) {
            tracing::debug!(session_id, "Discarding history for an inactive session");
            return;
        }
        let count = messages.len();
        state.messages = messages;
        self.emit(ChatEvent::HistoryLoaded { count });
    }

    /// Replace the message list with the current session's history
    ///
    /// Returns the loaded messages. Without a session, or when the fetch
    /// fails, the list is left alone and an empty vector is returned.
    pub async fn load_history(&self) -> Vec<ChatMessage> {
        let Some(session_id) = lock(&self.state).session_id.clone() else {
            tracing::debug!("No session, skipping history load");
            return Vec::new();
        };

        match self.fetch_history(&session_id).await {
            Ok(messages) => {
                tracing::debug!(%session_id, "Loaded {} history messages", messages.len());
                self.replace_messages(&session_id, messages.clone());
                messages
            }
            Err(e) => {
                tracing::error!("Failed to load chat history: {}", e);
                Vec::new()
            }
        }
    }

    // ------------------------------------------------------------------
    // Sending
    // ------------------------------------------------------------------

    /// Send `text` to the active persona
    ///
    /// Returns false without touching state for blank input, when a send is
    /// already in flight or when no persona is active.
    pub async fn send_message(&self, text: &str) -> bool {
        if text.trim().is_empty() {
            tracing::warn!("Ignoring empty message");
            return false;
        }

        let (role_id, session_id) = {
            let mut state = lock(&self.state);
            if state.is_sending {
                tracing::warn!("A reply is still in progress, message not sent");
                return false;
            }
            let Some(role_id) = state.role_id else {
                tracing::warn!("No persona selected, message not sent");
                return false;
            };
            state.is_sending = true;
            let message = ChatMessage::user(text);
            state.messages.push(message.clone());
            self.emit(ChatEvent::MessageAppended(message));
            (role_id, state.session_id.clone())
        };

        let epoch = self.epoch();
        self.start_thinking();

        let result = self
            .backend
            .chat(role_id, session_id.as_deref(), text)
            .await;

        if self.epoch() != epoch {
            tracing::debug!("Chat was reset while waiting for a reply, dropping it");
            return true;
        }
        self.stop_thinking();

        match result {
            Ok(reply) => {
                self.record_session(role_id, &reply.session_id);

                let id = self.next_id();
                {
                    let mut state = lock(&self.state);
                    state.is_streaming = true;
                    state.streaming_message_id = Some(id);
                    let message = ChatMessage::ai("").with_id(id);
                    state.messages.push(message.clone());
                    self.emit(ChatEvent::MessageAppended(message));
                }
                self.simulate_streaming(id, &reply.reply);
            }
            Err(e) => {
                tracing::error!("Failed to send message: {}", e);
                {
                    let mut state = lock(&self.state);
                    state.is_sending = false;
                    state.is_streaming = false;
                    state.streaming_message_id = None;
                }
                self.push_message(ChatMessage::error(e.user_message()));
            }
        }

        true
    }

    fn start_thinking(&self) {
        let (low, high) = (
            self.config.thinking_min_ms.min(self.config.thinking_max_ms),
            self.config.thinking_min_ms.max(self.config.thinking_max_ms),
        );
        let delay = lock(&self.rng).random_range(low..=high);
        let id = self.next_id();
        let ticket = self.thinking_ticket.fetch_add(1, Ordering::SeqCst) + 1;
        let shared = Arc::clone(&self.state);
        let events = self.events.clone();
        let current = Arc::clone(&self.thinking_ticket);

        let handle = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(delay)).await;
            show_thinking(&shared, &events, &current, ticket, id);
        });

        if let Some(previous) = lock(&self.thinking).replace(handle) {
            previous.abort();
        }
    }

    fn stop_thinking(&self) {
        if let Some(handle) = lock(&self.thinking).take() {
            handle.abort();
        }

        let mut state = lock(&self.state);
        self.thinking_ticket.fetch_add(1, Ordering::SeqCst);
        let before = state.messages.len();
        state.messages.retain(|m| !m.is_thinking);
        state.is_thinking = false;
        if state.messages.len() != before {
            self.emit(ChatEvent::ThinkingCleared);
        }
    }

    /// Reveal `text` into the message with `message_id` one character at a time
    ///
    /// Returns false if that message is already streaming. When the reveal
    /// completes the in-flight flags are cleared and the reply is read aloud
    /// unless speech is muted or auto-speak is off.
    pub fn simulate_streaming(&self, message_id: u64, text: &str) -> bool {
        if !lock(&self.active_streams).insert(message_id) {
            tracing::warn!(message_id, "Message is already streaming");
            return false;
        }

        let delays = self.typing.schedule(text, &mut *lock(&self.rng));
        let text = text.to_string();
        let shared = Arc::clone(&self.state);
        let events = self.events.clone();
        let active = Arc::clone(&self.active_streams);
        let speech = Arc::clone(&self.speech);
        let auto_speak = self.config.auto_speak;

        let handle = tokio::spawn(async move {
            let mut detached = false;
            for (c, delay) in text.chars().zip(delays) {
                tokio::time::sleep(delay).await;

                let mut state = lock(&shared);
                let Some(message) = state
                    .messages
                    .iter_mut()
                    .find(|m| m.id == Some(message_id))
                else {
                    detached = true;
                    break;
                };
                message.content.push(c);
                let _ = events.send(ChatEvent::StreamChunk {
                    id: message_id,
                    chunk: c.to_string(),
                });
            }

            {
                let mut state = lock(&shared);
                if state.streaming_message_id == Some(message_id) {
                    state.is_sending = false;
                    state.is_streaming = false;
                    state.streaming_message_id = None;
                }
            }
            lock(&active).remove(&message_id);
            let _ = events.send(ChatEvent::StreamFinished { id: message_id });

            if detached {
                tracing::debug!(message_id, "Streamed message was cleared before it finished");
                return;
            }
            tracing::debug!(message_id, "Finished streaming reply");

            if auto_speak {
                let _ = speech.speak_text(
                    &text,
                    || tracing::debug!("Finished reading reply aloud"),
                    |e| tracing::warn!("Could not read reply aloud: {}", e),
                );
            }
        });

        *lock(&self.streaming) = Some(handle);
        true
    }

    /// Wait for the current streaming reveal, if any, to finish
    pub async fn wait_until_idle(&self) {
        let handle = lock(&self.streaming).take();
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                tracing::warn!("Streaming task ended abnormally: {}", e);
            }
        }
    }

    // ------------------------------------------------------------------
    // Voice input
    // ------------------------------------------------------------------

    /// Listen for one phrase and send it
    ///
    /// Returns false if voice input was already active. Recognition errors
    /// are appended as error messages.
    pub async fn start_voice_input(&self) -> bool {
        {
            let mut state = lock(&self.state);
            if state.is_listening {
                tracing::warn!("Voice input is already active");
                return false;
            }
            state.is_listening = true;
        }
        self.emit(ChatEvent::ListeningChanged(true));

        let result = self.speech.recognize().await;

        lock(&self.state).is_listening = false;
        self.emit(ChatEvent::ListeningChanged(false));

        match result {
            Ok(Some(transcript)) if !transcript.trim().is_empty() => {
                tracing::info!("Recognized {} chars of speech", transcript.chars().count());
                self.send_message(&transcript).await;
            }
            Ok(_) => tracing::debug!("No speech recognized"),
            Err(e) => {
                tracing::warn!("Voice input failed: {}", e);
                self.push_message(ChatMessage::error(e.user_message()));
            }
        }
        true
    }

    // ------------------------------------------------------------------
    // Clearing
    // ------------------------------------------------------------------

    /// Drop the in-memory conversation, keeping the active persona
    pub fn clear_chat(&self) {
        let role_id = lock(&self.state).role_id;
        self.reset(role_id);
        tracing::info!("Chat cleared");
    }

    /// Forget the stored session of `persona_id`
    ///
    /// Also clears the in-memory conversation when that persona is active.
    pub fn clear_role_session(&self, persona_id: u64) -> Result<()> {
        self.storage.remove_item(&session_key(persona_id))?;
        tracing::info!(persona_id, "Cleared stored session");

        if lock(&self.state).role_id == Some(persona_id) {
            self.clear_chat();
        }
        Ok(())
    }
}

/// Insert the thinking placeholder if `ticket` is still current and the
/// reply has not started; returns whether it was inserted
fn show_thinking(
    shared: &Mutex<ChatState>,
    events: &broadcast::Sender<ChatEvent>,
    current: &AtomicU64,
    ticket: u64,
    id: u64,
) -> bool {
    let mut state = lock(shared);
    if current.load(Ordering::SeqCst) != ticket
        || !state.is_sending
        || state.is_streaming
        || state.is_thinking
    {
        return false;
    }
    state.is_thinking = true;
    state.messages.push(ChatMessage::thinking(id));
    let _ = events.send(ChatEvent::ThinkingStarted);
    true
}
