//! Persona commands: list, details, editor and share link

use super::AppContext;
use crate::api::{ApiError, Persona};
use crate::error::{Result, RoleplayError};
use crate::routes::share_url;
use crate::views::editor::{complete_persona, print_created, prompt_line};
use crate::views::persona_list::{personas_json, print_persona, print_personas};

use colored::Colorize;
use rustyline::DefaultEditor;
use std::path::PathBuf;

/// Lookup that turns a 404 into [`RoleplayError::PersonaNotFound`]
async fn find_persona(ctx: &AppContext, id: u64) -> Result<Persona> {
    ctx.personas.find_or_fetch(id).await.map_err(|e| match e {
        ApiError::NotFound(_) => RoleplayError::PersonaNotFound(id).into(),
        other => other.into(),
    })
}

/// Persona list screen
pub async fn list_roles(ctx: &AppContext, json: bool) -> Result<()> {
    ctx.personas.load_personas().await;

    if let Some(error) = ctx.personas.error() {
        return Err(anyhow::anyhow!(error));
    }

    let personas = ctx.personas.personas();
    if json {
        println!("{}", personas_json(&personas)?);
    } else {
        print_personas(&personas);
    }
    Ok(())
}

/// Details of one persona
pub async fn show_role(ctx: &AppContext, id: u64) -> Result<()> {
    let persona = find_persona(ctx, id).await?;
    print_persona(&persona);
    Ok(())
}

/// Persona editor screen
///
/// Fields missing from the command line are asked for interactively.
pub async fn add_role(
    ctx: &AppContext,
    name: Option<String>,
    description: Option<String>,
    avatar: Option<PathBuf>,
) -> Result<()> {
    let mut editor: Option<DefaultEditor> = None;
    let new_persona = complete_persona(name, description, avatar, |label| {
        let current = match editor.take() {
            Some(current) => current,
            None => DefaultEditor::new()?,
        };
        prompt_line(editor.insert(current), label)
    })?;

    tracing::info!("Creating persona {}", new_persona.name);
    let persona = ctx.roles.create_role(&new_persona).await?;
    print_created(&persona);
    Ok(())
}

/// Share link screen
///
/// The link is printed even when the persona cannot be looked up because
/// the backend is unreachable; an unknown persona is an error.
pub async fn share_role(ctx: &AppContext, id: u64) -> Result<()> {
    let url = share_url(&ctx.config.api.public_url, id)?;

    match ctx.personas.find_or_fetch(id).await {
        Ok(persona) => println!("Share a chat with {}:", persona.name.cyan().bold()),
        Err(ApiError::NotFound(_)) => return Err(RoleplayError::PersonaNotFound(id).into()),
        Err(e) => {
            tracing::warn!("Could not look up persona {}: {}", id, e);
            println!("Share a chat with persona #{}:", id);
        }
    }
    println!("{}\n", url.as_str().underline());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::test_utils::{persona, FakeChatBackend, FakeRoleBackend};
    use std::sync::Arc;

    fn context(roles: FakeRoleBackend) -> AppContext {
        AppContext::with_backends(
            Config::default(),
            Arc::new(FakeChatBackend::new()),
            Arc::new(roles),
        )
    }

    #[tokio::test]
    async fn test_list_roles_fails_when_backend_unreachable() {
        let ctx = context(FakeRoleBackend::unreachable());
        let err = list_roles(&ctx, true).await.unwrap_err();
        assert!(err.to_string().contains("Failed to load personas"));
    }

    #[tokio::test]
    async fn test_show_role_unknown_id() {
        let ctx = context(FakeRoleBackend::new(vec![persona(1, "Alice")]));
        let err = show_role(&ctx, 42).await.unwrap_err();
        assert!(err.to_string().contains("Persona not found: 42"));
    }

    #[tokio::test]
    async fn test_share_role_known_persona() {
        let ctx = context(FakeRoleBackend::new(vec![persona(1, "Alice")]));
        assert!(share_role(&ctx, 1).await.is_ok());
        assert!(share_role(&ctx, 2).await.is_err());
    }

    #[tokio::test]
    async fn test_add_role_with_all_fields() {
        let ctx = context(FakeRoleBackend::new(vec![]));
        add_role(&ctx, Some("Holmes".into()), Some("Detective".into()), None)
            .await
            .unwrap();
    }
}
