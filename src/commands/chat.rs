use async_trait::async_trait;

use super::{Command, CommandResult, SessionInfo};
use crate::route::Route;

pub struct ChatCommand;

#[async_trait]
impl Command for ChatCommand {
    fn name(&self) -> &str {
        "/chat"
    }

    fn usage(&self) -> &str {
        "<n>"
    }

    fn description(&self) -> &str {
        "talk to the n-th summoned character"
    }

    async fn execute(&self, args: &str, info: &SessionInfo<'_>) -> CommandResult {
        let Route::Characters { story } = info.route else {
            println!("  summon characters first (/characters)");
            return CommandResult::Handled;
        };

        let choice = match args.parse::<usize>() {
            Ok(n) if n >= 1 && n <= info.roster.len() => n,
            _ => {
                eprintln!("  ✗ pick a character between 1 and {}", info.roster.len());
                return CommandResult::Handled;
            }
        };

        let character = &info.roster[choice - 1];
        CommandResult::Navigate(Route::Chat {
            name: character.name.clone(),
            image_src: character.avatar_url.clone(),
            story: story.clone(),
        })
    }
}
