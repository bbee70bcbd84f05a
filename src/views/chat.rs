//! Chat screen rendering
//!
//! [`ChatRenderer`] turns [`ChatEvent`]s into terminal output: streamed
//! characters are printed as they arrive, the thinking indicator is drawn on
//! its own line and erased when the reply shows up.

use crate::chat::{ChatEvent, ChatMessage, ChatState, Sender};
use crate::speech::SpeechBridge;

use colored::Colorize;
use std::io::Write;

/// ANSI sequence that returns to column 0 and clears the line
const CLEAR_LINE: &str = "\r\x1b[2K";

/// One message as a printable line
pub fn format_message(message: &ChatMessage, persona_name: &str) -> String {
    if message.is_error {
        return format!("{} {}", "Error:".red().bold(), message.content.red());
    }
    if message.is_thinking {
        return format!("{}", format!("{} is thinking...", persona_name).dimmed());
    }

    match message.sender {
        Sender::User => format!("{} {}", "You:".green().bold(), message.content),
        Sender::Ai if message.is_welcome => format!(
            "{} {}",
            format!("{}:", persona_name).cyan().bold(),
            message.content.italic()
        ),
        Sender::Ai => format!(
            "{} {}",
            format!("{}:", persona_name).cyan().bold(),
            message.content
        ),
    }
}

/// Print every message in the conversation
pub fn print_transcript(state: &ChatState, persona_name: &str) {
    for message in &state.messages {
        println!("{}", format_message(message, persona_name));
    }
    if !state.messages.is_empty() {
        println!();
    }
}

/// Box banner shown when a chat starts
pub fn print_welcome_banner(persona_name: &str, description: &str, speech: &SpeechBridge) {
    println!("\n╔══════════════════════════════════════════════════════════════╗");
    println!("║                Role-Play Chat - Welcome!                     ║");
    println!("╚══════════════════════════════════════════════════════════════╝\n");
    println!("Persona: {}", persona_name.cyan().bold());
    if !description.is_empty() {
        println!("         {}", description.dimmed());
    }
    println!("Voice:   {}\n", voice_status(speech));
    println!("Type '/help' for available commands, '/exit' to quit\n");
}

fn voice_status(speech: &SpeechBridge) -> String {
    if !speech.is_enabled() {
        "disabled".dimmed().to_string()
    } else if speech.is_muted() {
        "muted".yellow().to_string()
    } else {
        "on".green().to_string()
    }
}

/// Session details for `/status`
pub fn print_status(state: &ChatState, persona_name: &str, speech: &SpeechBridge) {
    println!("\n╔══════════════════════════════════════════════════════════════╗");
    println!("║                     Chat Session Status                      ║");
    println!("╚══════════════════════════════════════════════════════════════╝\n");
    println!("Persona:      {}", persona_name.cyan());
    println!(
        "Session:      {}",
        state.session_id.as_deref().unwrap_or("(none)")
    );
    println!("Messages:     {}", state.messages.len());
    println!("Voice output: {}", voice_status(speech));
    if speech.is_paused() {
        println!("Playback:     {}", "paused".yellow());
    } else if speech.is_speaking() {
        println!("Playback:     {}", "speaking".green());
    }
    println!();
}

/// Stateful printer for chat events
pub struct ChatRenderer {
    persona_name: String,
    echo_user: bool,
    thinking_shown: bool,
}

impl ChatRenderer {
    pub fn new(persona_name: impl Into<String>) -> Self {
        Self {
            persona_name: persona_name.into(),
            echo_user: false,
            thinking_shown: false,
        }
    }

    /// Print user messages too (they are normally echoed by the line editor)
    pub fn set_echo_user(&mut self, echo: bool) {
        self.echo_user = echo;
    }

    /// Terminal output for `event`, if any
    pub fn render(&mut self, event: &ChatEvent) -> Option<String> {
        match event {
            ChatEvent::MessageAppended(message) => {
                let prefix = self.take_thinking_line();
                if message.sender == Sender::User && !self.echo_user {
                    return prefix;
                }
                let body = if message.sender == Sender::Ai
                    && message.content.is_empty()
                    && message.id.is_some()
                {
                    // Streamed reply; characters follow
                    format!("{} ", format!("{}:", self.persona_name).cyan().bold())
                } else {
                    format!("{}\n", format_message(message, &self.persona_name))
                };
                Some(format!("{}{}", prefix.unwrap_or_default(), body))
            }
            ChatEvent::StreamChunk { chunk, .. } => Some(chunk.clone()),
            ChatEvent::StreamFinished { .. } => Some("\n\n".to_string()),
            ChatEvent::ThinkingStarted => {
                self.thinking_shown = true;
                Some(
                    format!("{}", format!("{} is thinking...", self.persona_name).dimmed()),
                )
            }
            ChatEvent::ThinkingCleared => self.take_thinking_line(),
            ChatEvent::ListeningChanged(true) => {
                Some(format!("{}\n", "Listening... speak now".magenta()))
            }
            ChatEvent::ListeningChanged(false) => None,
            ChatEvent::SessionChanged(session_id) => {
                tracing::debug!(%session_id, "Session changed");
                None
            }
            ChatEvent::Reset { .. } | ChatEvent::HistoryLoaded { .. } => None,
        }
    }

    fn take_thinking_line(&mut self) -> Option<String> {
        if std::mem::take(&mut self.thinking_shown) {
            Some(CLEAR_LINE.to_string())
        } else {
            None
        }
    }

    /// Render `event` to stdout
    pub fn emit(&mut self, event: &ChatEvent) {
        if let Some(text) = self.render(event) {
            let mut stdout = std::io::stdout();
            let _ = stdout.write_all(text.as_bytes());
            let _ = stdout.flush();
        }
    }
}
