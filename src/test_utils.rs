//! Test doubles shared by unit tests
//!
//! In-memory backends that script replies and record calls, plus a
//! synthesizer that records what it was asked to say and a recognizer that
//! hears a fixed phrase.

use crate::api::{ApiError, ChatBackend, ChatReply, HistoryEntry, NewPersona, Persona, RoleBackend};
use crate::speech::{
    RecognitionEngine, RecognitionError, SynthesisEngine, SynthesisError, VoiceSettings,
};

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// Build a persona with a generated description
pub fn persona(id: u64, name: &str) -> Persona {
    Persona {
        id,
        name: name.to_string(),
        description: format!("{} description", name),
        avatar: None,
    }
}

/// One recorded `chat` call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentMessage {
    pub role_id: u64,
    pub session_id: Option<String>,
    pub message: String,
}

/// Scripted chat backend
///
/// Replies are served in order. Successful exchanges are appended to the
/// session history (newest first) unless recording is turned off.
pub struct FakeChatBackend {
    replies: Mutex<VecDeque<Result<ChatReply, ApiError>>>,
    histories: Mutex<HashMap<String, Vec<HistoryEntry>>>,
    history_error: Mutex<Option<ApiError>>,
    sent: Mutex<Vec<SentMessage>>,
    history_calls: AtomicUsize,
    next_entry_id: AtomicU64,
    record_history: AtomicBool,
    delay: Mutex<Duration>,
}

impl Default for FakeChatBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeChatBackend {
    pub fn new() -> Self {
        Self {
            replies: Mutex::new(VecDeque::new()),
            histories: Mutex::new(HashMap::new()),
            history_error: Mutex::new(None),
            sent: Mutex::new(Vec::new()),
            history_calls: AtomicUsize::new(0),
            next_entry_id: AtomicU64::new(1),
            record_history: AtomicBool::new(true),
            delay: Mutex::new(Duration::ZERO),
        }
    }

    pub fn push_reply(&self, session_id: &str, reply: &str) {
        self.replies.lock().unwrap().push_back(Ok(ChatReply {
            session_id: session_id.to_string(),
            reply: reply.to_string(),
        }));
    }

    pub fn push_error(&self, error: ApiError) {
        self.replies.lock().unwrap().push_back(Err(error));
    }

    /// Seed a session history, given oldest first
    pub fn set_history(&self, session_id: &str, exchanges: &[(&str, &str)]) {
        let mut entries: Vec<HistoryEntry> = exchanges
            .iter()
            .map(|(user, ai)| HistoryEntry {
                id: self.next_entry_id.fetch_add(1, Ordering::SeqCst),
                user_message: user.to_string(),
                assistant_reply: ai.to_string(),
                created_at: None,
            })
            .collect();
        entries.reverse();
        self.histories
            .lock()
            .unwrap()
            .insert(session_id.to_string(), entries);
    }

    pub fn fail_history(&self, error: ApiError) {
        *self.history_error.lock().unwrap() = Some(error);
    }

    pub fn set_record_history(&self, record: bool) {
        self.record_history.store(record, Ordering::SeqCst);
    }

    /// Make every `chat` call take `delay`
    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock().unwrap() = delay;
    }

    pub fn sent(&self) -> Vec<SentMessage> {
        self.sent.lock().unwrap().clone()
    }

    pub fn history_calls(&self) -> usize {
        self.history_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ChatBackend for FakeChatBackend {
    async fn chat(
        &self,
        role_id: u64,
        session_id: Option<&str>,
        message: &str,
    ) -> Result<ChatReply, ApiError> {
        let delay = *self.delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        self.sent.lock().unwrap().push(SentMessage {
            role_id,
            session_id: session_id.map(str::to_string),
            message: message.to_string(),
        });

        let reply = self
            .replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(ApiError::Unreachable("no scripted reply".into())))?;

        if self.record_history.load(Ordering::SeqCst) {
            let entry = HistoryEntry {
                id: self.next_entry_id.fetch_add(1, Ordering::SeqCst),
                user_message: message.to_string(),
                assistant_reply: reply.reply.clone(),
                created_at: None,
            };
            self.histories
                .lock()
                .unwrap()
                .entry(reply.session_id.clone())
                .or_default()
                .insert(0, entry);
        }

        Ok(reply)
    }

    async fn history(&self, session_id: &str) -> Result<Vec<HistoryEntry>, ApiError> {
        self.history_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(error) = self.history_error.lock().unwrap().clone() {
            return Err(error);
        }
        Ok(self
            .histories
            .lock()
            .unwrap()
            .get(session_id)
            .cloned()
            .unwrap_or_default())
    }
}

/// Role backend over a fixed list
pub struct FakeRoleBackend {
    personas: Vec<Persona>,
    fail: bool,
    list_calls: AtomicUsize,
    get_calls: AtomicUsize,
}

impl FakeRoleBackend {
    pub fn new(personas: Vec<Persona>) -> Self {
        Self {
            personas,
            fail: false,
            list_calls: AtomicUsize::new(0),
            get_calls: AtomicUsize::new(0),
        }
    }

    /// A backend whose lookups always fail with a transport error
    pub fn unreachable() -> Self {
        Self {
            fail: true,
            ..Self::new(Vec::new())
        }
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    pub fn get_calls(&self) -> usize {
        self.get_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RoleBackend for FakeRoleBackend {
    async fn list_roles(&self) -> Result<Vec<Persona>, ApiError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(ApiError::Unreachable("down".into()));
        }
        Ok(self.personas.clone())
    }

    async fn get_role(&self, id: u64) -> Result<Persona, ApiError> {
        self.get_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(ApiError::Unreachable("down".into()));
        }
        self.personas
            .iter()
            .find(|p| p.id == id)
            .cloned()
            .ok_or_else(|| ApiError::NotFound(format!("persona {}", id)))
    }

    async fn create_role(&self, persona: &NewPersona) -> Result<Persona, ApiError> {
        persona.validate()?;
        Ok(Persona {
            id: self.personas.len() as u64 + 1,
            name: persona.name.clone(),
            description: persona.description.clone(),
            avatar: None,
        })
    }
}

/// Synthesizer that records utterances instead of playing them
#[derive(Default)]
pub struct RecordingSynth {
    pub spoken: Mutex<Vec<String>>,
    pub cancels: AtomicUsize,
    pub speaking: AtomicBool,
}

impl RecordingSynth {
    pub fn spoken(&self) -> Vec<String> {
        self.spoken.lock().unwrap().clone()
    }
}

#[async_trait]
impl SynthesisEngine for RecordingSynth {
    fn name(&self) -> &str {
        "recording"
    }

    async fn speak(&self, text: &str, _voice: &VoiceSettings) -> Result<(), SynthesisError> {
        self.spoken.lock().unwrap().push(text.to_string());
        Ok(())
    }

    fn cancel(&self) {
        self.cancels.fetch_add(1, Ordering::SeqCst);
    }

    fn pause(&self) -> bool {
        true
    }

    fn resume(&self) -> bool {
        true
    }

    fn is_speaking(&self) -> bool {
        self.speaking.load(Ordering::SeqCst)
    }
}

/// Recognizer that returns a fixed result after a delay
pub struct ScriptedRecognizer {
    result: Result<Option<String>, RecognitionError>,
    delay: Duration,
    aborted: AtomicBool,
    listens: AtomicUsize,
}

impl ScriptedRecognizer {
    pub fn new(result: Result<Option<String>, RecognitionError>, delay: Duration) -> Self {
        Self {
            result,
            delay,
            aborted: AtomicBool::new(false),
            listens: AtomicUsize::new(0),
        }
    }

    /// Hears `phrase` immediately
    pub fn hearing(phrase: &str) -> Self {
        Self::new(Ok(Some(phrase.to_string())), Duration::ZERO)
    }

    pub fn was_aborted(&self) -> bool {
        self.aborted.load(Ordering::SeqCst)
    }

    pub fn listens(&self) -> usize {
        self.listens.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RecognitionEngine for ScriptedRecognizer {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn listen(&self, _language: &str) -> Result<Option<String>, RecognitionError> {
        self.listens.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.result.clone()
    }

    fn abort(&self) {
        self.aborted.store(true, Ordering::SeqCst);
    }
}
