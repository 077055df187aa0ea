use async_trait::async_trait;

use super::{Command, CommandResult, SessionInfo};
use crate::route::Route;

pub struct CharactersCommand;

#[async_trait]
impl Command for CharactersCommand {
    fn name(&self) -> &str {
        "/characters"
    }

    fn aliases(&self) -> &[&str] {
        &["/summon"]
    }

    fn description(&self) -> &str {
        "summon the characters of the current story"
    }

    async fn execute(&self, _args: &str, info: &SessionInfo<'_>) -> CommandResult {
        match info.story.and_then(|s| s.summary.as_deref()) {
            Some(summary) => CommandResult::Navigate(Route::Characters {
                story: summary.to_string(),
            }),
            None => {
                println!("  the tale is not woven yet");
                CommandResult::Handled
            }
        }
    }
}
