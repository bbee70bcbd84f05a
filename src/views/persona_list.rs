//! Persona list and persona detail screens

use super::truncate;
use crate::api::Persona;
use crate::error::{Result, RoleplayError};

use colored::Colorize;
use prettytable::{format, row, Table};

const DESCRIPTION_WIDTH: usize = 60;

/// Table with one row per persona
pub fn persona_table(personas: &[Persona]) -> Table {
    let mut table = Table::new();
    table.set_format(*format::consts::FORMAT_BORDERS_ONLY);
    table.set_titles(row!["ID".bold(), "Name".bold(), "Description".bold()]);

    for persona in personas {
        table.add_row(row![
            persona.id.to_string().cyan(),
            persona.name,
            truncate(&persona.description, DESCRIPTION_WIDTH)
        ]);
    }
    table
}

/// Print the persona list screen
pub fn print_personas(personas: &[Persona]) {
    if personas.is_empty() {
        println!("{}", "No personas available yet.".yellow());
        println!(
            "Use {} to create one.\n",
            "roleplay role add".cyan()
        );
        return;
    }

    println!("\nAvailable personas:");
    persona_table(personas).printstd();
    println!();
    println!("Use {} to start chatting.\n", "roleplay chat <ID>".cyan());
}

/// Persona list as pretty-printed JSON
pub fn personas_json(personas: &[Persona]) -> Result<String> {
    serde_json::to_string_pretty(personas).map_err(|e| RoleplayError::Serialization(e).into())
}

/// Print one persona in detail
pub fn print_persona(persona: &Persona) {
    println!("\n{} {}", persona.name.bold(), format!("#{}", persona.id).dimmed());
    if !persona.description.is_empty() {
        println!("{}", persona.description);
    }
    if let Some(avatar) = &persona.avatar {
        println!("{} {}", "Avatar:".dimmed(), avatar);
    }
    println!();
}
