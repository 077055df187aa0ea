use async_trait::async_trait;

use super::{Command, CommandResult, SessionInfo};

pub struct StoryCommand;

#[async_trait]
impl Command for StoryCommand {
    fn name(&self) -> &str {
        "/story"
    }

    fn description(&self) -> &str {
        "show the current story and its summary"
    }

    async fn execute(&self, _args: &str, info: &SessionInfo<'_>) -> CommandResult {
        let Some(story) = info.story else {
            println!("  no story yet. Type a title on the home screen to forge one.");
            return CommandResult::Handled;
        };

        println!("  prompt   {}", story.prompt);
        if let Some(job_id) = &story.job_id {
            println!("  job      {job_id}");
        }
        match &story.summary {
            Some(summary) => println!("\n  {summary}"),
            None if info.fetching => println!("  status   weaving your tale..."),
            None => println!("  status   no summary"),
        }
        CommandResult::Handled
    }
}
