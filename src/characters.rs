//! Characters summoned from a story.
//!
//! The backend only returns names. Everything else on a character card is
//! synthesized here.

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::backend::Backend;
use crate::consts::{CHARACTERS_ERROR, PLACEHOLDER_AVATAR_URL, PLACEHOLDER_DESCRIPTION};
use crate::events::{Event, EventBus};

/// Separator between names in the backend's response. Names containing it
/// are split; there is no escaping.
const NAME_SEPARATOR: &str = ", ";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Character {
    pub name: String,
    pub avatar_url: String,
    pub author_handle: String,
    pub description: String,
}

impl Character {
    /// Build a card for `name` with placeholder avatar and description.
    pub fn from_name(name: &str) -> Self {
        Self {
            name: name.to_string(),
            avatar_url: PLACEHOLDER_AVATAR_URL.to_string(),
            author_handle: author_handle(name),
            description: PLACEHOLDER_DESCRIPTION.to_string(),
        }
    }
}

/// `@` + lowercased name with only its first space removed.
fn author_handle(name: &str) -> String {
    format!("@{}", name.to_lowercase().replacen(' ', "", 1))
}

/// Split the backend's name list. Blank entries are dropped.
pub fn parse_names(response: &str) -> Vec<String> {
    response
        .split(NAME_SEPARATOR)
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect()
}

/// Ask the backend for the characters of `story`.
///
/// An empty story yields an empty roster without a request. On failure the
/// returned error displays the user-facing message.
pub async fn summon(backend: &dyn Backend, story: &str, events: &EventBus) -> Result<Vec<Character>> {
    if story.is_empty() {
        return Ok(Vec::new());
    }

    let response = match backend.character_names(story).await {
        Ok(response) => response,
        Err(e) => {
            tracing::error!("error generating characters: {e:#}");
            return Err(e.context(CHARACTERS_ERROR));
        }
    };

    let roster: Vec<Character> = parse_names(&response)
        .iter()
        .map(|name| Character::from_name(name))
        .collect();

    tracing::info!(count = roster.len(), "characters summoned");
    events.emit(Event::CharactersSummoned {
        count: roster.len(),
    });
    Ok(roster)
}
