use async_trait::async_trait;

use super::{Command, CommandResult, SessionInfo};

pub struct BackCommand;

#[async_trait]
impl Command for BackCommand {
    fn name(&self) -> &str {
        "/back"
    }

    fn description(&self) -> &str {
        "return to the previous screen"
    }

    async fn execute(&self, _args: &str, _info: &SessionInfo<'_>) -> CommandResult {
        CommandResult::Back
    }
}
