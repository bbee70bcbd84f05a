//! Screen routing
//!
//! Paths mirror the web client's URLs so links can be shared between the
//! two: `/`, `/chat/:id`, `/roles/new` and `/share/:id`. Full URLs are
//! accepted too; only their path is used.

use crate::error::{Result, RoleplayError};

use regex::Regex;
use url::Url;

const ID_ROUTE_PATTERN: &str = r"^/(chat|share)/(\d+)$";

/// A screen of the application
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// Persona list (`/`)
    PersonaList,
    /// Conversation with a persona (`/chat/:id`)
    Chat(u64),
    /// Persona editor (`/roles/new`)
    PersonaEditor,
    /// Share link for a persona (`/share/:id`)
    Share(u64),
}

impl Route {
    /// Parse a path or absolute URL
    ///
    /// # Examples
    ///
    /// ```
    /// use roleplay_chat::routes::Route;
    ///
    /// assert_eq!(Route::parse("/chat/3").unwrap(), Route::Chat(3));
    /// assert_eq!(
    ///     Route::parse("http://localhost:5173/share/4").unwrap(),
    ///     Route::Share(4)
    /// );
    /// assert!(Route::parse("/settings").is_err());
    /// ```
    pub fn parse(input: &str) -> Result<Self> {
        let input = input.trim();
        let path = if input.starts_with("http://") || input.starts_with("https://") {
            Url::parse(input)?.path().to_string()
        } else {
            input
                .split(['?', '#'])
                .next()
                .unwrap_or_default()
                .to_string()
        };

        let path = match path.trim_end_matches('/') {
            "" => "/",
            trimmed => trimmed,
        };

        match path {
            "/" => return Ok(Route::PersonaList),
            "/roles/new" => return Ok(Route::PersonaEditor),
            _ => {}
        }

        let pattern = Regex::new(ID_ROUTE_PATTERN)?;
        let route = pattern.captures(path).and_then(|caps| {
            let id = caps[2].parse::<u64>().ok().filter(|id| *id > 0)?;
            match &caps[1] {
                "chat" => Some(Route::Chat(id)),
                "share" => Some(Route::Share(id)),
                _ => None,
            }
        });

        route.ok_or_else(|| RoleplayError::UnknownRoute(input.to_string()).into())
    }

    /// Path for this route
    pub fn path(&self) -> String {
        match self {
            Route::PersonaList => "/".to_string(),
            Route::Chat(id) => format!("/chat/{}", id),
            Route::PersonaEditor => "/roles/new".to_string(),
            Route::Share(id) => format!("/share/{}", id),
        }
    }

    /// Absolute URL of this route under `public_url`
    ///
    /// A path prefix on `public_url` is kept.
    pub fn url(&self, public_url: &str) -> Result<Url> {
        let mut base = Url::parse(public_url)?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        Ok(base.join(self.path().trim_start_matches('/'))?)
    }
}

impl std::fmt::Display for Route {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.path())
    }
}

/// Link that opens a chat with `persona_id` in the web client
pub fn share_url(public_url: &str, persona_id: u64) -> Result<Url> {
    Route::Chat(persona_id).url(public_url)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_known_routes() {
        assert_eq!(Route::parse("/").unwrap(), Route::PersonaList);
        assert_eq!(Route::parse("").unwrap(), Route::PersonaList);
        assert_eq!(Route::parse("/chat/12").unwrap(), Route::Chat(12));
        assert_eq!(Route::parse("/chat/12/").unwrap(), Route::Chat(12));
        assert_eq!(Route::parse("/roles/new").unwrap(), Route::PersonaEditor);
        assert_eq!(Route::parse("/share/5").unwrap(), Route::Share(5));
    }

    #[test]
    fn test_parse_ignores_query_and_fragment() {
        assert_eq!(Route::parse("/chat/2?from=share").unwrap(), Route::Chat(2));
        assert_eq!(Route::parse("/#top").unwrap(), Route::PersonaList);
    }

    #[test]
    fn test_parse_full_url() {
        assert_eq!(
            Route::parse("https://example.com/chat/9").unwrap(),
            Route::Chat(9)
        );
    }

    #[test]
    fn test_parse_unknown_routes() {
        for path in ["/chat", "/chat/abc", "/chat/0", "/roles", "/settings", "/share/-1"] {
            let err = Route::parse(path).unwrap_err();
            assert!(
                err.to_string().contains("Unknown route"),
                "{} gave {}",
                path,
                err
            );
        }
    }

    #[test]
    fn test_path_round_trips() {
        for route in [
            Route::PersonaList,
            Route::Chat(3),
            Route::PersonaEditor,
            Route::Share(8),
        ] {
            assert_eq!(Route::parse(&route.path()).unwrap(), route);
        }
    }

    #[test]
    fn test_share_url() {
        assert_eq!(
            share_url("http://localhost:5173", 4).unwrap().as_str(),
            "http://localhost:5173/chat/4"
        );
        assert_eq!(
            share_url("https://example.com/app", 4).unwrap().as_str(),
            "https://example.com/app/chat/4"
        );
    }

    #[test]
    fn test_share_url_rejects_invalid_base() {
        assert!(share_url("not a url", 1).is_err());
    }
}
