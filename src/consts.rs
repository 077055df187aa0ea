//! Project-wide constants.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};

pub const AUTHOR: &str = env!("CARGO_PKG_AUTHORS");
pub const HOMEPAGE: &str = env!("CARGO_PKG_HOMEPAGE");
pub const REPO: &str = env!("CARGO_PKG_REPOSITORY");

/// Backend hosting story submission, summaries, and chat.
pub const DEFAULT_STORY_URL: &str = "http://18.206.119.113:8080";

/// Backend hosting character extraction.
pub const DEFAULT_CHARACTER_URL: &str = "https://characterai-backend.onrender.com";

/// How often a pending story job is polled.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Cap on the story submission request. No other request has one.
pub const DEFAULT_SUBMIT_TIMEOUT: Duration = Duration::from_secs(30);

/// Avatar shown for every synthesized character.
pub const PLACEHOLDER_AVATAR_URL: &str = "https://characterai.io/i/200/static/avatars/uploaded/2023/5/3/qOYVOyDz0eWY8Wgys_Y343SBCjC_X2kz5ML-yUk9p1o.webp?webp=true&anim=0";

/// Description shown for every synthesized character.
pub const PLACEHOLDER_DESCRIPTION: &str = "Character from the story";

/// Sender label for messages typed by the user.
pub const USER_SENDER: &str = "User";

pub const SUBMIT_ERROR: &str = "Error submitting story. Please try again.";
pub const CHARACTERS_ERROR: &str = "Failed to generate characters. Please try again.";
pub const CHAT_FALLBACK: &str =
    "By the ancient powers! Our mystical connection wavers. Let us attempt to reconnect, brave one!";

/// Opening line of every chat session.
pub fn greeting(name: &str) -> String {
    format!(
        "Hail, brave adventurer! I am {name}, guardian of these realms. What quest brings you to my domain?"
    )
}

/// Default database path: `~/.taleforge/taleforge.db`.
pub fn default_db_path() -> Result<PathBuf> {
    let home = dirs::home_dir().context("cannot determine home directory")?;
    Ok(home.join(".taleforge").join("taleforge.db"))
}

/// Format a number with comma separators (e.g. 1,234,567).
pub fn format_number(n: u64) -> String {
    let s = n.to_string();
    let mut result = String::with_capacity(s.len() + s.len() / 3);
    for (i, c) in s.chars().enumerate() {
        if i > 0 && (s.len() - i).is_multiple_of(3) {
            result.push(',');
        }
        result.push(c);
    }
    result
}
