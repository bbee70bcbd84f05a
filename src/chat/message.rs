//! Chat messages, store state and change events

use crate::api::HistoryEntry;

/// Content of the transient placeholder shown while a reply is pending
pub const THINKING_TEXT: &str = "AI is thinking...";

/// Who wrote a message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sender {
    User,
    Ai,
}

impl std::fmt::Display for Sender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Sender::User => write!(f, "user"),
            Sender::Ai => write!(f, "ai"),
        }
    }
}

/// One entry of the conversation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    pub sender: Sender,
    pub content: String,
    /// History entry id, or the local id of a streamed reply
    pub id: Option<u64>,
    pub is_error: bool,
    pub is_welcome: bool,
    pub is_thinking: bool,
}

impl ChatMessage {
    fn new(sender: Sender, content: impl Into<String>) -> Self {
        Self {
            sender,
            content: content.into(),
            id: None,
            is_error: false,
            is_welcome: false,
            is_thinking: false,
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Sender::User, content)
    }

    pub fn ai(content: impl Into<String>) -> Self {
        Self::new(Sender::Ai, content)
    }

    /// Error-styled AI message
    pub fn error(content: impl Into<String>) -> Self {
        Self {
            is_error: true,
            ..Self::ai(content)
        }
    }

    /// Locally generated greeting for an empty conversation
    pub fn welcome(content: impl Into<String>) -> Self {
        Self {
            is_welcome: true,
            ..Self::ai(content)
        }
    }

    /// "AI is thinking" placeholder
    pub fn thinking(id: u64) -> Self {
        Self {
            id: Some(id),
            is_thinking: true,
            ..Self::ai(THINKING_TEXT)
        }
    }

    pub fn with_id(mut self, id: u64) -> Self {
        self.id = Some(id);
        self
    }

    /// Expand a stored exchange into its user and AI halves
    pub fn from_history(entry: &HistoryEntry) -> [ChatMessage; 2] {
        [
            ChatMessage::user(entry.user_message.clone()).with_id(entry.id),
            ChatMessage::ai(entry.assistant_reply.clone()).with_id(entry.id),
        ]
    }
}

/// Everything a chat view needs to render
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChatState {
    pub role_id: Option<u64>,
    pub session_id: Option<String>,
    pub messages: Vec<ChatMessage>,
    pub is_sending: bool,
    pub is_streaming: bool,
    pub is_thinking: bool,
    pub is_listening: bool,
    pub streaming_message_id: Option<u64>,
}

impl ChatState {
    /// Fresh state bound to `role_id`
    pub fn for_role(role_id: Option<u64>) -> Self {
        Self {
            role_id,
            ..Self::default()
        }
    }

    /// True when no send, stream or placeholder is in progress
    pub fn is_idle(&self) -> bool {
        !self.is_sending && !self.is_streaming && !self.is_thinking
    }

    pub fn message(&self, id: u64) -> Option<&ChatMessage> {
        self.messages.iter().find(|m| m.id == Some(id))
    }
}

/// Change notifications broadcast by [`super::ChatStore`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatEvent {
    /// In-memory state was reset
    Reset { role_id: Option<u64> },
    /// The message list was replaced by fetched history
    HistoryLoaded { count: usize },
    MessageAppended(ChatMessage),
    ThinkingStarted,
    ThinkingCleared,
    SessionChanged(String),
    /// One more character of a streamed reply
    StreamChunk { id: u64, chunk: String },
    StreamFinished { id: u64 },
    ListeningChanged(bool),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constructors_set_flags() {
        let user = ChatMessage::user("hi");
        assert_eq!(user.sender, Sender::User);
        assert!(!user.is_error && !user.is_welcome && !user.is_thinking);

        assert!(ChatMessage::error("x").is_error);
        assert!(ChatMessage::welcome("x").is_welcome);

        let thinking = ChatMessage::thinking(7);
        assert!(thinking.is_thinking);
        assert_eq!(thinking.id, Some(7));
        assert_eq!(thinking.sender, Sender::Ai);
    }

    #[test]
    fn test_from_history_keeps_entry_id() {
        let entry = HistoryEntry {
            id: 3,
            user_message: "question".into(),
            assistant_reply: "answer".into(),
            created_at: None,
        };
        let [user, ai] = ChatMessage::from_history(&entry);
        assert_eq!(user, ChatMessage::user("question").with_id(3));
        assert_eq!(ai, ChatMessage::ai("answer").with_id(3));
    }

    #[test]
    fn test_state_idle() {
        let mut state = ChatState::for_role(Some(1));
        assert!(state.is_idle());
        state.is_streaming = true;
        assert!(!state.is_idle());
    }
}
