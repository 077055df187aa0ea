use async_trait::async_trait;

use super::{Command, CommandResult, SessionInfo};

pub struct QuitCommand;

#[async_trait]
impl Command for QuitCommand {
    fn name(&self) -> &str {
        "/quit"
    }

    fn aliases(&self) -> &[&str] {
        &["quit", "exit", "/exit"]
    }

    fn description(&self) -> &str {
        "leave the realm, abandoning any tale still being woven"
    }

    async fn execute(&self, _args: &str, info: &SessionInfo<'_>) -> CommandResult {
        for line in parting_words(info) {
            println!("  {line}");
        }
        CommandResult::Quit
    }
}

/// What the realm says as the hero leaves it.
fn parting_words(info: &SessionInfo<'_>) -> Vec<String> {
    let mut lines = Vec::new();
    if let Some(chat) = info.chat {
        lines.push(format!(
            "{} lowers their gaze. \"Until our paths cross again.\"",
            chat.name()
        ));
    }
    if info.fetching
        && let Some(story) = info.story
    {
        lines.push(format!("\"{}\" is left unwoven.", story.prompt));
    }
    lines
}
