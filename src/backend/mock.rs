use anyhow::{Result, anyhow};
use async_trait::async_trait;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use super::{AskRequest, Backend, SummaryStatus};
use crate::story::JobId;

/// A scripted backend for tests. Summary statuses are returned in order;
/// once the script runs out every poll is pending. With a delay, every call
/// but submit sleeps before answering, so tests can act while it is in
/// flight.
pub struct MockBackend {
    delay: Duration,
    job: Result<String, String>,
    summaries: Vec<Result<SummaryStatus, String>>,
    names: Result<String, String>,
    reply: Result<String, String>,
    submit_calls: AtomicUsize,
    summary_calls: AtomicUsize,
    names_calls: AtomicUsize,
    ask_calls: AtomicUsize,
    last_story: Mutex<Option<String>>,
    last_ask: Mutex<Option<AskRequest>>,
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MockBackend {
    pub fn new() -> Self {
        Self {
            delay: Duration::ZERO,
            job: Ok("job-1".to_string()),
            summaries: Vec::new(),
            names: Ok(String::new()),
            reply: Ok(String::new()),
            submit_calls: AtomicUsize::new(0),
            summary_calls: AtomicUsize::new(0),
            names_calls: AtomicUsize::new(0),
            ask_calls: AtomicUsize::new(0),
            last_story: Mutex::new(None),
            last_ask: Mutex::new(None),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn with_job(mut self, job: &str) -> Self {
        self.job = Ok(job.to_string());
        self
    }

    pub fn failing_submit(mut self, error: &str) -> Self {
        self.job = Err(error.to_string());
        self
    }

    pub fn with_summaries(mut self, script: Vec<Result<SummaryStatus, String>>) -> Self {
        self.summaries = script;
        self
    }

    pub fn with_names(mut self, names: &str) -> Self {
        self.names = Ok(names.to_string());
        self
    }

    pub fn failing_names(mut self, error: &str) -> Self {
        self.names = Err(error.to_string());
        self
    }

    pub fn with_reply(mut self, reply: &str) -> Self {
        self.reply = Ok(reply.to_string());
        self
    }

    pub fn failing_ask(mut self, error: &str) -> Self {
        self.reply = Err(error.to_string());
        self
    }

    pub fn submit_calls(&self) -> usize {
        self.submit_calls.load(Ordering::SeqCst)
    }

    pub fn summary_calls(&self) -> usize {
        self.summary_calls.load(Ordering::SeqCst)
    }

    pub fn names_calls(&self) -> usize {
        self.names_calls.load(Ordering::SeqCst)
    }

    pub fn ask_calls(&self) -> usize {
        self.ask_calls.load(Ordering::SeqCst)
    }

    /// Story text of the most recent submit or character request.
    pub fn last_story(&self) -> Option<String> {
        self.last_story.lock().unwrap().clone()
    }

    pub fn last_ask(&self) -> Option<AskRequest> {
        self.last_ask.lock().unwrap().clone()
    }

    async fn respond_later(&self) {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
    }
}

#[async_trait]
impl Backend for MockBackend {
    async fn submit_story(&self, story: &str) -> Result<JobId> {
        self.submit_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_story.lock().unwrap() = Some(story.to_string());
        match &self.job {
            Ok(job) => Ok(JobId::from(job.as_str())),
            Err(e) => Err(anyhow!("{e}")),
        }
    }

    async fn fetch_summary(&self, _job_id: &JobId) -> Result<SummaryStatus> {
        let i = self.summary_calls.fetch_add(1, Ordering::SeqCst);
        self.respond_later().await;
        match self.summaries.get(i) {
            Some(Ok(status)) => Ok(status.clone()),
            Some(Err(e)) => Err(anyhow!("{e}")),
            None => Ok(SummaryStatus::Pending(202)),
        }
    }

    async fn character_names(&self, story: &str) -> Result<String> {
        self.names_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_story.lock().unwrap() = Some(story.to_string());
        self.respond_later().await;
        self.names.clone().map_err(|e| anyhow!("{e}"))
    }

    async fn ask(&self, request: &AskRequest) -> Result<String> {
        self.ask_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_ask.lock().unwrap() = Some(request.clone());
        self.respond_later().await;
        self.reply.clone().map_err(|e| anyhow!("{e}"))
    }
}
