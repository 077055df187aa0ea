pub mod http;
pub mod mock;

use anyhow::Result;
use async_trait::async_trait;
use serde::Serialize;

use crate::story::JobId;

/// Result of a single summary status query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SummaryStatus {
    /// The job finished and the backend returned its summary.
    Ready(String),
    /// Not done yet. Carries the HTTP status the backend answered with.
    Pending(u16),
}

/// One chat turn as sent to the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AskRequest {
    pub query: String,
    pub character_name: String,
    pub summarized_story: String,
}

/// The remote service that does the actual storytelling.
/// Could be the HTTP backend or a scripted one in tests.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Start a story generation job.
    async fn submit_story(&self, story: &str) -> Result<JobId>;

    /// Query a job once.
    async fn fetch_summary(&self, job_id: &JobId) -> Result<SummaryStatus>;

    /// Comma-separated character names for a story, as returned.
    async fn character_names(&self, story: &str) -> Result<String>;

    /// A character's reply to one message.
    async fn ask(&self, request: &AskRequest) -> Result<String>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ask_request_uses_camel_case_wire_names() {
        let req = AskRequest {
            query: "who are you?".to_string(),
            character_name: "Alice".to_string(),
            summarized_story: "a tale".to_string(),
        };
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["query"], "who are you?");
        assert_eq!(json["characterName"], "Alice");
        assert_eq!(json["summarizedStory"], "a tale");
    }
}
