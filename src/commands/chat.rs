//! Interactive chat with a persona
//!
//! Runs a line-editor loop on top of [`ChatStore`]. While a store operation
//! is in flight its events are rendered as they arrive, so the thinking
//! indicator and the character-by-character reply show up live.

use super::special_commands::{parse_special_command, print_help, SpecialCommand};
use super::AppContext;
use crate::api::{ApiError, Persona};
use crate::chat::{ChatEvent, ChatStore};
use crate::error::{Result, RoleplayError};
use crate::speech::{SpeechBridge, SpeechToggle};
use crate::views::chat::{print_status, print_transcript, print_welcome_banner, ChatRenderer};

use colored::Colorize;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::broadcast::{self, error::RecvError, error::TryRecvError};

/// Drive `operation` to completion, rendering store events meanwhile
///
/// Events still queued when the operation finishes are rendered before
/// returning.
pub async fn pump<F, T>(
    operation: F,
    events: &mut broadcast::Receiver<ChatEvent>,
    renderer: &mut ChatRenderer,
) -> T
where
    F: Future<Output = T>,
{
    tokio::pin!(operation);

    let output = loop {
        tokio::select! {
            output = &mut operation => break output,
            event = events.recv() => match event {
                Ok(event) => renderer.emit(&event),
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!("Chat output skipped {} events", skipped);
                }
                Err(RecvError::Closed) => break operation.await,
            },
        }
    };

    loop {
        match events.try_recv() {
            Ok(event) => renderer.emit(&event),
            Err(TryRecvError::Lagged(skipped)) => {
                tracing::warn!("Chat output skipped {} events", skipped);
            }
            Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => break,
        }
    }

    output
}

/// Persona shown in the banner; falls back to a placeholder when the
/// backend cannot be reached so the chat screen still opens
async fn resolve_persona(ctx: &AppContext, persona_id: u64) -> Result<Persona> {
    match ctx.personas.find_or_fetch(persona_id).await {
        Ok(persona) => Ok(persona),
        Err(ApiError::NotFound(_)) => Err(RoleplayError::PersonaNotFound(persona_id).into()),
        Err(e) => {
            tracing::warn!("Could not look up persona {}: {}", persona_id, e);
            Ok(Persona {
                id: persona_id,
                name: format!("Persona #{}", persona_id),
                description: String::new(),
                avatar: None,
            })
        }
    }
}

/// Open the conversation and print it
async fn open_conversation(
    store: &ChatStore,
    persona: &Persona,
    force_new: bool,
    events: &mut broadcast::Receiver<ChatEvent>,
) {
    store.init_chat(persona.id, force_new).await;
    // The transcript is printed in full; events raised while opening are stale
    *events = events.resubscribe();
    print_transcript(&store.snapshot(), &persona.name);
}

/// Start an interactive chat with a persona
///
/// # Arguments
///
/// * `ctx` - Shared command context
/// * `persona_id` - Persona to talk to
/// * `force_new` - Ignore the stored session
/// * `mute` - Start with voice output muted
pub async fn run_chat(
    ctx: &AppContext,
    persona_id: u64,
    force_new: bool,
    mute: bool,
) -> Result<()> {
    tracing::info!("Starting interactive chat with persona {}", persona_id);

    let persona = resolve_persona(ctx, persona_id).await?;
    let storage = ctx.open_storage()?;
    let speech = Arc::new(SpeechBridge::from_config(&ctx.config.speech));
    if mute {
        speech.mute_speech();
    }

    let store = ctx.chat_store(storage, speech.clone());
    let mut events = store.subscribe();
    let mut renderer = ChatRenderer::new(persona.name.as_str());

    print_welcome_banner(&persona.name, &persona.description, &speech);
    open_conversation(&store, &persona, force_new, &mut events).await;

    let mut rl = DefaultEditor::new()?;
    let prompt = format!("{} ", "you>".green().bold());

    loop {
        match rl.readline(&prompt) {
            Ok(line) => {
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    continue;
                }

                let command = match parse_special_command(trimmed) {
                    Ok(command) => command,
                    Err(e) => {
                        eprintln!("{}", e.to_string().red());
                        continue;
                    }
                };

                match command {
                    SpecialCommand::Help => print_help(),
                    SpecialCommand::NewSession => {
                        speech.stop_all_speech();
                        open_conversation(&store, &persona, true, &mut events).await;
                        println!("{}\n", "Started a new conversation".green());
                    }
                    SpecialCommand::Clear => {
                        store.clear_chat();
                        events = events.resubscribe();
                        println!("{}\n", "Conversation cleared".green());
                    }
                    SpecialCommand::Voice => {
                        renderer.set_echo_user(true);
                        let started =
                            pump(store.start_voice_input(), &mut events, &mut renderer).await;
                        if started {
                            pump(store.wait_until_idle(), &mut events, &mut renderer).await;
                        } else {
                            println!("{}", "Voice input is already active".yellow());
                        }
                        renderer.set_echo_user(false);
                    }
                    SpecialCommand::Mute => {
                        speech.mute_speech();
                        println!("{}\n", "Voice output muted".yellow());
                    }
                    SpecialCommand::Unmute => {
                        speech.unmute_speech();
                        println!("{}\n", "Voice output on".green());
                    }
                    SpecialCommand::Pause => match speech.toggle_speech() {
                        SpeechToggle::Paused => println!("{}\n", "Playback paused".yellow()),
                        SpeechToggle::Resumed => println!("{}\n", "Playback resumed".green()),
                        SpeechToggle::Idle => println!("Nothing is being read aloud\n"),
                    },
                    SpecialCommand::Stop => {
                        speech.stop_all_speech();
                        println!("{}\n", "Playback stopped".yellow());
                    }
                    SpecialCommand::Status => {
                        print_status(&store.snapshot(), &persona.name, &speech)
                    }
                    SpecialCommand::Exit => break,
                    SpecialCommand::None => {
                        if let Err(e) = rl.add_history_entry(trimmed) {
                            tracing::debug!("Could not add history entry: {}", e);
                        }
                        let sent = pump(store.send_message(trimmed), &mut events, &mut renderer)
                            .await;
                        if sent {
                            pump(store.wait_until_idle(), &mut events, &mut renderer).await;
                        } else {
                            println!("{}", "Still replying, please wait".yellow());
                        }
                    }
                }
            }
            Err(ReadlineError::Interrupted) => {
                println!("CTRL-C");
                break;
            }
            Err(ReadlineError::Eof) => {
                println!("CTRL-D");
                break;
            }
            Err(err) => {
                tracing::error!("Readline error: {:?}", err);
                break;
            }
        }
    }

    speech.stop_all_speech();
    println!("Goodbye!");
    Ok(())
}
