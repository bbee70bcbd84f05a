//! Special commands parser for the interactive chat
//!
//! Lines starting with `/` control the session instead of being sent to the
//! persona. Commands are case-insensitive; `exit` and `quit` work without
//! the slash.

use thiserror::Error;

/// Errors that can occur when parsing special commands
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CommandError {
    /// Unknown command was entered
    #[error("Unknown command: {0}\n\nType '/help' to see available commands")]
    UnknownCommand(String),

    /// Command was given an argument it does not take
    #[error("Unsupported argument for {command}: {arg}\n\nType '/help' to see valid usage")]
    UnsupportedArgument { command: String, arg: String },
}

/// Special commands that can be executed during a chat
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpecialCommand {
    /// Show available commands
    Help,

    /// Drop the stored session and start a new conversation
    NewSession,

    /// Clear the conversation on screen
    Clear,

    /// Speak a message instead of typing it
    Voice,

    /// Turn voice output off
    Mute,

    /// Turn voice output back on
    Unmute,

    /// Pause or resume the reply being read aloud
    Pause,

    /// Stop reading the current reply
    Stop,

    /// Show session details
    Status,

    /// Leave the chat
    Exit,

    /// Not a special command; send the line as a message
    None,
}

/// Parse one line of user input
///
/// # Examples
///
/// ```
/// use roleplay_chat::commands::special_commands::{parse_special_command, SpecialCommand};
///
/// assert_eq!(parse_special_command("/mute").unwrap(), SpecialCommand::Mute);
/// assert_eq!(parse_special_command("hello").unwrap(), SpecialCommand::None);
/// assert!(parse_special_command("/foo").is_err());
/// ```
pub fn parse_special_command(input: &str) -> Result<SpecialCommand, CommandError> {
    let trimmed = input.trim();
    let lower = trimmed.to_lowercase();

    if !trimmed.starts_with('/') {
        return Ok(match lower.as_str() {
            "exit" | "quit" => SpecialCommand::Exit,
            _ => SpecialCommand::None,
        });
    }

    let mut parts = lower.splitn(2, char::is_whitespace);
    let command = parts.next().unwrap_or_default();
    let arg = parts.next().map(str::trim).unwrap_or_default();

    let parsed = match command {
        "/help" | "/?" => SpecialCommand::Help,
        "/new" => SpecialCommand::NewSession,
        "/clear" => SpecialCommand::Clear,
        "/voice" | "/mic" => SpecialCommand::Voice,
        "/mute" => SpecialCommand::Mute,
        "/unmute" => SpecialCommand::Unmute,
        "/pause" | "/resume" => SpecialCommand::Pause,
        "/stop" => SpecialCommand::Stop,
        "/status" => SpecialCommand::Status,
        "/exit" | "/quit" => SpecialCommand::Exit,
        other => return Err(CommandError::UnknownCommand(other.to_string())),
    };

    if !arg.is_empty() {
        return Err(CommandError::UnsupportedArgument {
            command: command.to_string(),
            arg: arg.to_string(),
        });
    }

    Ok(parsed)
}

/// Display help text for special commands
pub fn print_help() {
    println!(
        r#"
Chat Commands
=============

CONVERSATION:
  /new            - Forget the stored session and start over
  /clear          - Clear the conversation on screen
  /status         - Show session and voice status

VOICE:
  /voice          - Speak your next message (alias: /mic)
  /mute           - Stop reading replies aloud
  /unmute         - Read replies aloud again
  /pause          - Pause or resume the reply being read (alias: /resume)
  /stop           - Stop reading the current reply

OTHER:
  /help           - Show this help message (alias: /?)
  /exit           - Leave the chat (also: exit, quit, Ctrl-D)

Anything else you type is sent to the persona.
"#
    );
}
