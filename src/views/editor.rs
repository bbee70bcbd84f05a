//! Persona editor screen

use crate::api::{ApiError, NewPersona, Persona};
use crate::error::Result;

use colored::Colorize;
use rustyline::DefaultEditor;
use std::path::PathBuf;

/// Fill in the fields not given on the command line
///
/// `prompt` is asked for each missing field. The avatar is only asked for
/// when another field had to be prompted, so a fully specified command never
/// blocks on input.
pub fn complete_persona<P>(
    name: Option<String>,
    description: Option<String>,
    avatar: Option<PathBuf>,
    mut prompt: P,
) -> Result<NewPersona>
where
    P: FnMut(&str) -> Result<String>,
{
    let mut interactive = false;

    let name = match name.filter(|n| !n.trim().is_empty()) {
        Some(name) => name,
        None => {
            interactive = true;
            prompt("Name: ")?
        }
    };

    let description = match description.filter(|d| !d.trim().is_empty()) {
        Some(description) => description,
        None => {
            interactive = true;
            prompt("Description: ")?
        }
    };

    let avatar = match avatar {
        Some(path) => Some(path),
        None if interactive => {
            let answer = prompt("Avatar image (optional, Enter to skip): ")?;
            let answer = answer.trim();
            (!answer.is_empty()).then(|| PathBuf::from(answer))
        }
        None => None,
    };

    let persona = NewPersona {
        name: name.trim().to_string(),
        description: description.trim().to_string(),
        avatar,
    };
    persona.validate()?;

    if let Some(path) = &persona.avatar {
        if !path.is_file() {
            return Err(
                ApiError::Validation(format!("Avatar file not found: {}", path.display())).into(),
            );
        }
    }

    Ok(persona)
}

/// Line-editor prompt used by the interactive editor
pub fn prompt_line(editor: &mut DefaultEditor, label: &str) -> Result<String> {
    Ok(editor.readline(label)?)
}

pub fn print_created(persona: &Persona) {
    println!(
        "{}",
        format!("Created persona {} (#{})", persona.name, persona.id).green()
    );
    println!(
        "Start chatting with {}\n",
        format!("roleplay chat {}", persona.id).cyan()
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;

    fn answers(list: &[&str]) -> impl FnMut(&str) -> Result<String> {
        let mut queue: VecDeque<String> = list.iter().map(|s| s.to_string()).collect();
        move |_label| Ok(queue.pop_front().expect("unexpected prompt"))
    }

    #[test]
    fn test_complete_persona_uses_given_fields_without_prompting() {
        let persona = complete_persona(
            Some("Sherlock".into()),
            Some("A detective".into()),
            None,
            |_| panic!("should not prompt"),
        )
        .unwrap();
        assert_eq!(persona.name, "Sherlock");
        assert_eq!(persona.description, "A detective");
        assert!(persona.avatar.is_none());
    }

    #[test]
    fn test_complete_persona_prompts_for_missing_fields() {
        let persona = complete_persona(
            None,
            None,
            None,
            answers(&["  Watson ", "A doctor", ""]),
        )
        .unwrap();
        assert_eq!(persona.name, "Watson");
        assert_eq!(persona.description, "A doctor");
        assert!(persona.avatar.is_none());
    }

    #[test]
    fn test_complete_persona_rejects_blank_answers() {
        let err = complete_persona(Some("Name".into()), None, None, answers(&["   ", ""]))
            .unwrap_err();
        assert!(err.to_string().contains("description"));
    }

    #[test]
    fn test_complete_persona_checks_avatar_exists() {
        let err = complete_persona(
            Some("A".into()),
            Some("B".into()),
            Some(PathBuf::from("/nonexistent/avatar.png")),
            |_| panic!("should not prompt"),
        )
        .unwrap_err();
        assert!(err.to_string().contains("Avatar file not found"));
    }

    #[test]
    fn test_complete_persona_accepts_existing_avatar() {
        let dir = tempfile::tempdir().unwrap();
        let avatar = dir.path().join("face.png");
        std::fs::write(&avatar, b"png").unwrap();

        let persona =
            complete_persona(None, Some("B".into()), None, answers(&["A", avatar.to_str().unwrap()]))
                .unwrap();
        assert_eq!(persona.avatar.as_deref(), Some(avatar.as_path()));
    }
}
