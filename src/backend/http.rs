use std::time::Duration;

use anyhow::{Context, Result, anyhow, bail};
use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::{Deserialize, Serialize};
use url::Url;

use super::{AskRequest, Backend, SummaryStatus};
use crate::story::JobId;

/// Base URLs of the two services the client talks to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    /// Story submission, summaries, and chat.
    pub story: Url,
    /// Character extraction.
    pub characters: Url,
}

/// The real backend, reached over HTTP with JSON bodies.
pub struct HttpBackend {
    client: Client,
    endpoints: Endpoints,
    submit_timeout: Duration,
}

impl HttpBackend {
    pub fn new(endpoints: Endpoints, submit_timeout: Duration) -> Self {
        Self {
            client: Client::new(),
            endpoints,
            submit_timeout,
        }
    }

    /// Append path segments to a base URL, percent-encoding each one.
    fn endpoint(base: &Url, segments: &[&str]) -> Result<Url> {
        let mut url = base.clone();
        url.path_segments_mut()
            .map_err(|_| anyhow!("not a valid base URL: {base}"))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn post_for_text<B: Serialize + ?Sized>(&self, url: Url, body: &B) -> Result<String> {
        let resp = self
            .client
            .post(url.clone())
            .json(body)
            .send()
            .await
            .with_context(|| format!("failed to reach {url}"))?;
        let resp = ensure_success(resp).await?;
        let parsed: TextResponse = resp.json().await.context("failed to parse response")?;
        Ok(parsed.response)
    }
}

#[async_trait]
impl Backend for HttpBackend {
    async fn submit_story(&self, story: &str) -> Result<JobId> {
        let url = Self::endpoint(&self.endpoints.story, &["submitStory"])?;
        tracing::debug!(%url, "submitting story");

        let resp = self
            .client
            .post(url.clone())
            .timeout(self.submit_timeout)
            .json(&StoryRequest { story })
            .send()
            .await
            .with_context(|| format!("failed to reach {url}"))?;
        let resp = ensure_success(resp).await?;
        let body: SubmitResponse = resp.json().await.context("failed to parse response")?;
        parse_job_id(&body.story_id)
    }

    async fn fetch_summary(&self, job_id: &JobId) -> Result<SummaryStatus> {
        let url = Self::endpoint(&self.endpoints.story, &["getSummary", job_id.as_str()])?;
        tracing::debug!(%url, "polling summary");

        let resp = self
            .client
            .get(url.clone())
            .send()
            .await
            .with_context(|| format!("failed to reach {url}"))?;
        let status = resp.status();
        if status != StatusCode::OK {
            return Ok(SummaryStatus::Pending(status.as_u16()));
        }
        let body = resp.text().await.context("failed to read summary body")?;
        summary_status(&body)
    }

    async fn character_names(&self, story: &str) -> Result<String> {
        let url = Self::endpoint(&self.endpoints.characters, &["charactername"])?;
        tracing::debug!(%url, "requesting character names");
        self.post_for_text(url, &StoryRequest { story }).await
    }

    async fn ask(&self, request: &AskRequest) -> Result<String> {
        let url = Self::endpoint(&self.endpoints.story, &["ask"])?;
        tracing::debug!(%url, character = %request.character_name, "asking character");
        self.post_for_text(url, request).await
    }
}

async fn ensure_success(resp: Response) -> Result<Response> {
    if !resp.status().is_success() {
        let status = resp.status();
        let body = resp.text().await.unwrap_or_default();
        bail!("API error ({}): {}", status, body);
    }
    Ok(resp)
}

/// Interpret the body of a `200` summary response.
/// A missing or blank summary means the job is still running.
fn summary_status(body: &str) -> Result<SummaryStatus> {
    let parsed: SummaryResponse =
        serde_json::from_str(body).context("failed to parse summary response")?;
    match parsed.summary {
        Some(summary) if !summary.trim().is_empty() => Ok(SummaryStatus::Ready(summary)),
        _ => Ok(SummaryStatus::Pending(StatusCode::OK.as_u16())),
    }
}

/// The backend hands out job ids as strings or bare numbers.
fn parse_job_id(value: &serde_json::Value) -> Result<JobId> {
    match value {
        serde_json::Value::String(s) if !s.is_empty() => Ok(JobId::from(s.as_str())),
        serde_json::Value::Number(n) => Ok(JobId::from(n.to_string())),
        other => bail!("unexpected storyId in response: {other}"),
    }
}

// --- Wire types ---

#[derive(Serialize)]
struct StoryRequest<'a> {
    story: &'a str,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SubmitResponse {
    story_id: serde_json::Value,
}

#[derive(Deserialize)]
struct SummaryResponse {
    summary: Option<String>,
}

#[derive(Deserialize)]
struct TextResponse {
    response: String,
}
