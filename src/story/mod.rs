pub mod poll;

use std::fmt;
use std::sync::Arc;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::backend::Backend;
use crate::consts::SUBMIT_ERROR;
use crate::events::EventBus;
use poll::{PollConfig, PollOutcome, SummaryPoll};

/// Opaque identifier of a story generation job.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JobId(String);

impl JobId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for JobId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for JobId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A submitted prompt and what the backend has made of it so far.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Story {
    pub prompt: String,
    pub job_id: Option<JobId>,
    pub summary: Option<String>,
}

impl Story {
    pub fn new(prompt: &str) -> Self {
        Self {
            prompt: prompt.to_string(),
            job_id: None,
            summary: None,
        }
    }
}

/// Submit a prompt, then poll for its summary.
///
/// Holds at most one poll. Submitting again, calling [`StoryFlow::cancel`],
/// or dropping the flow stops it.
pub struct StoryFlow {
    backend: Arc<dyn Backend>,
    events: Arc<EventBus>,
    config: PollConfig,
    story: Option<Story>,
    poll: Option<SummaryPoll>,
    error: Option<String>,
}

impl StoryFlow {
    pub fn new(backend: Arc<dyn Backend>, events: Arc<EventBus>, config: PollConfig) -> Self {
        Self {
            backend,
            events,
            config,
            story: None,
            poll: None,
            error: None,
        }
    }

    /// Submit `prompt` and start polling for its summary.
    ///
    /// Any previous story and poll are discarded first. On failure the
    /// returned error displays the user-facing message; the cause is in the
    /// chain and in the log.
    pub async fn submit(&mut self, prompt: &str) -> Result<JobId> {
        self.cancel();
        self.story = Some(Story::new(prompt));
        self.error = None;

        match self.backend.submit_story(prompt).await {
            Ok(job_id) => {
                tracing::info!(job = %job_id, "story submitted");
                if let Some(story) = &mut self.story {
                    story.job_id = Some(job_id.clone());
                }
                self.poll = Some(SummaryPoll::spawn(
                    Arc::clone(&self.backend),
                    job_id.clone(),
                    self.config,
                    Arc::clone(&self.events),
                ));
                Ok(job_id)
            }
            Err(e) => {
                tracing::error!("error submitting story: {e:#}");
                self.error = Some(SUBMIT_ERROR.to_string());
                Err(e.context(SUBMIT_ERROR))
            }
        }
    }

    /// Wait for the running poll to end and record its summary. The poll is
    /// released afterwards. Returns `None` when nothing is being polled.
    pub async fn wait_for_summary(&mut self) -> Option<PollOutcome> {
        let outcome = self.poll.as_mut()?.wait().await;
        self.poll = None;
        if let PollOutcome::Ready(summary) = &outcome
            && let Some(story) = &mut self.story
        {
            story.summary = Some(summary.clone());
        }
        Some(outcome)
    }

    /// Like [`StoryFlow::wait_for_summary`], but only once the poll has
    /// already ended, so it never blocks.
    pub async fn collect_finished(&mut self) -> Option<PollOutcome> {
        if !self.poll.as_ref()?.is_finished() {
            return None;
        }
        self.wait_for_summary().await
    }

    /// Stop polling. Safe to call repeatedly.
    pub fn cancel(&mut self) {
        if let Some(poll) = self.poll.take() {
            poll.cancel();
        }
    }

    /// True while a poll is running.
    pub fn is_fetching(&self) -> bool {
        self.poll.as_ref().is_some_and(|p| !p.is_finished())
    }

    pub fn story(&self) -> Option<&Story> {
        self.story.as_ref()
    }

    pub fn summary(&self) -> Option<&str> {
        self.story.as_ref()?.summary.as_deref()
    }

    /// User-facing message from the last failed submission.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn job_id_display() {
        assert_eq!(JobId::from("abc").to_string(), "abc");
        assert_eq!(JobId::from(String::from("7")).as_str(), "7");
    }

    #[test]
    fn new_story_is_empty() {
        let story = Story::new("a knight");
        assert_eq!(story.prompt, "a knight");
        assert!(story.job_id.is_none());
        assert!(story.summary.is_none());
    }
}
