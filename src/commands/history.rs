use async_trait::async_trait;

use super::{Command, CommandResult, SessionInfo};

pub struct HistoryCommand;

#[async_trait]
impl Command for HistoryCommand {
    fn name(&self) -> &str {
        "/history"
    }

    fn description(&self) -> &str {
        "replay this conversation"
    }

    async fn execute(&self, _args: &str, info: &SessionInfo<'_>) -> CommandResult {
        let Some(chat) = info.chat else {
            println!("  not in a conversation");
            return CommandResult::Handled;
        };
        for message in chat.messages() {
            let badge = if message.is_user() { "Hero" } else { "NPC" };
            println!("  [{badge}] {}: {}", message.sender, message.content);
        }
        CommandResult::Handled
    }
}
