//! roleplay - chat with role-playing AI personas
//!
#![doc = "roleplay - chat with role-playing AI personas"]
#![doc = "Main entry point for the roleplay chat client."]

use anyhow::Result;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use roleplay_chat::cli::{Cli, Commands, RoleCommand, SessionCommand};
use roleplay_chat::commands::{self, AppContext};
use roleplay_chat::config::Config;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let cli = Cli::parse_args();

    init_tracing(cli.verbose, cli.json_logs);

    // Load configuration
    let config_path = cli.config.as_deref().unwrap_or("config/config.yaml");
    let config = Config::load(config_path, &cli)?;

    // Validate configuration
    config.validate()?;

    let ctx = AppContext::new(config)?;

    // Execute command
    match cli.command {
        Commands::Roles { json } => {
            tracing::debug!("Listing personas");
            commands::roles::list_roles(&ctx, json).await?;
            Ok(())
        }
        Commands::Role { command } => match command {
            RoleCommand::Show { id } => {
                commands::roles::show_role(&ctx, id).await?;
                Ok(())
            }
            RoleCommand::Add {
                name,
                description,
                avatar,
            } => {
                tracing::info!("Starting persona editor");
                commands::roles::add_role(&ctx, name, description, avatar).await?;
                Ok(())
            }
        },
        Commands::Chat { id, new, mute } => {
            if new {
                tracing::debug!("Ignoring stored session");
            }
            if mute {
                tracing::debug!("Voice output starts muted");
            }
            commands::chat::run_chat(&ctx, id, new, mute).await?;
            Ok(())
        }
        Commands::Session { command } => match command {
            SessionCommand::Clear { id } => {
                commands::session::clear_session(&ctx, id).await?;
                Ok(())
            }
        },
        Commands::Share { id } => {
            commands::roles::share_role(&ctx, id).await?;
            Ok(())
        }
        Commands::Open { path } => {
            commands::open_path(&ctx, &path).await?;
            Ok(())
        }
    }
}

/// Logs go to stderr so they never interleave with piped output
fn init_tracing(verbose: bool, json: bool) {
    let default_filter = if verbose {
        "roleplay_chat=debug"
    } else {
        "roleplay_chat=info"
    };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    let registry = tracing_subscriber::registry().with(env_filter);
    if json {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}
