use async_trait::async_trait;

use super::{Command, CommandResult, SessionInfo};

pub struct StatusCommand;

#[async_trait]
impl Command for StatusCommand {
    fn name(&self) -> &str {
        "/status"
    }

    fn description(&self) -> &str {
        "show screen, backends, and hero level"
    }

    async fn execute(&self, _args: &str, info: &SessionInfo<'_>) -> CommandResult {
        println!("  screen      {}", info.route.screen());
        println!("  stories     {}", info.settings.story_url);
        println!("  characters  {}", info.settings.character_url);
        println!("  config      {}", info.config);
        if info.fetching {
            println!("  polling     every {}s", info.settings.poll_interval.as_secs());
        }
        if let Some(chat) = info.chat {
            println!(
                "  hero        level {} • xp {} ({} messages to {})",
                chat.level(),
                chat.xp(),
                chat.user_messages(),
                chat.name()
            );
        }
        CommandResult::Handled
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::tests::test_info;

    #[tokio::test]
    async fn returns_handled() {
        assert!(matches!(
            StatusCommand.execute("", &test_info()).await,
            CommandResult::Handled
        ));
    }

    #[test]
    fn metadata() {
        assert_eq!(StatusCommand.name(), "/status");
        assert!(StatusCommand.aliases().is_empty());
    }
}
