//! Command-line interface definition for roleplay-chat
//!
//! This module defines the CLI structure using clap's derive API. Each
//! subcommand corresponds to one screen of the client (persona list, chat,
//! persona editor, share link) or a maintenance action on stored sessions.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// roleplay - chat with role-playing AI personas from the terminal
#[derive(Parser, Debug, Clone)]
#[command(name = "roleplay")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config/config.yaml")]
    pub config: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long)]
    pub json_logs: bool,

    /// Override the backend base URL
    #[arg(long)]
    pub api_url: Option<String>,

    /// Disable voice input and output for this run
    #[arg(long)]
    pub no_speech: bool,

    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// List available personas
    Roles {
        /// Print the list as JSON
        #[arg(long)]
        json: bool,
    },

    /// Inspect or create personas
    Role {
        /// Persona subcommand
        #[command(subcommand)]
        command: RoleCommand,
    },

    /// Start an interactive chat with a persona
    Chat {
        /// Persona id
        id: u64,

        /// Ignore the stored session and start a new conversation
        #[arg(short, long)]
        new: bool,

        /// Start with voice output muted
        #[arg(short, long)]
        mute: bool,
    },

    /// Manage stored chat sessions
    Session {
        /// Session subcommand
        #[command(subcommand)]
        command: SessionCommand,
    },

    /// Print a shareable link to a persona's chat
    Share {
        /// Persona id
        id: u64,
    },

    /// Open a screen by its path (e.g. `/chat/3`)
    Open {
        /// Route path
        path: String,
    },
}

/// Persona subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum RoleCommand {
    /// Show a single persona
    Show {
        /// Persona id
        id: u64,
    },

    /// Create a new persona (prompts for missing fields)
    Add {
        /// Persona name
        #[arg(short, long)]
        name: Option<String>,

        /// Persona description
        #[arg(short, long)]
        description: Option<String>,

        /// Avatar image file
        #[arg(short, long)]
        avatar: Option<PathBuf>,
    },
}

/// Session subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum SessionCommand {
    /// Forget the stored session for a persona
    Clear {
        /// Persona id
        id: u64,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

impl Default for Cli {
    fn default() -> Self {
        Self {
            config: Some("config/config.yaml".to_string()),
            verbose: false,
            json_logs: false,
            api_url: None,
            no_speech: false,
            command: Commands::Roles { json: false },
        }
    }
}
