use async_trait::async_trait;

use super::{Command, CommandResult, SessionInfo};
use crate::route::Route;

pub struct OpenCommand;

#[async_trait]
impl Command for OpenCommand {
    fn name(&self) -> &str {
        "/open"
    }

    fn usage(&self) -> &str {
        "<route>"
    }

    fn description(&self) -> &str {
        "jump to a route, e.g. /characters?story=..."
    }

    async fn execute(&self, args: &str, _info: &SessionInfo<'_>) -> CommandResult {
        if args.is_empty() {
            println!("  usage: /open <route>");
            return CommandResult::Handled;
        }
        match Route::parse(args) {
            Ok(route) => CommandResult::Navigate(route),
            Err(e) => {
                eprintln!("  ✗ {e:#}");
                CommandResult::Handled
            }
        }
    }
}
