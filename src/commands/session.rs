//! Stored session maintenance

use super::AppContext;
use crate::error::Result;
use crate::speech::SpeechBridge;

use colored::Colorize;
use std::sync::Arc;

/// Forget the stored session of a persona so the next chat starts fresh
pub async fn clear_session(ctx: &AppContext, persona_id: u64) -> Result<()> {
    let storage = ctx.open_storage()?;
    let store = ctx.chat_store(storage, Arc::new(SpeechBridge::disabled()));
    store.clear_role_session(persona_id)?;

    println!(
        "{}",
        format!("Cleared stored session for persona #{}", persona_id).green()
    );
    Ok(())
}
