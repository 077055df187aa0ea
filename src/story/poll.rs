//! Background polling of a story job until its summary is ready.
//!
//! [`SummaryPoll::spawn`] starts a task that queries the backend every
//! interval. The task ends on the first summary, when the attempt bound is
//! reached, or when cancelled. A failed query is logged and reported with
//! [`Event::SummaryFailed`] so the loader can stop, but the next tick still
//! goes out. Cancelling is idempotent and dropping the handle cancels too.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use super::JobId;
use crate::backend::{Backend, SummaryStatus};
use crate::consts::DEFAULT_POLL_INTERVAL;
use crate::events::{Event, EventBus};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollConfig {
    pub interval: Duration,
    /// `None` polls until the summary arrives. Failed queries count.
    pub max_attempts: Option<usize>,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            max_attempts: None,
        }
    }
}

/// How a poll ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    Ready(String),
    /// The attempt bound was reached.
    Exhausted,
    Cancelled,
}

/// Handle to a running summary poll.
pub struct SummaryPoll {
    cancel: watch::Sender<bool>,
    handle: JoinHandle<PollOutcome>,
    outcome: Option<PollOutcome>,
}

impl SummaryPoll {
    /// Start polling `job_id`. The first query goes out one interval from now.
    pub fn spawn(
        backend: Arc<dyn Backend>,
        job_id: JobId,
        config: PollConfig,
        events: Arc<EventBus>,
    ) -> Self {
        let (cancel_tx, cancel_rx) = watch::channel(false);
        let handle = tokio::spawn(run(backend, job_id, config, events, cancel_rx));
        Self {
            cancel: cancel_tx,
            handle,
            outcome: None,
        }
    }

    /// Stop polling. No backend call or event follows once this returns.
    pub fn cancel(&self) {
        self.cancel.send_replace(true);
    }

    pub fn is_finished(&self) -> bool {
        self.outcome.is_some() || self.handle.is_finished()
    }

    /// Wait for the poll to end. Safe to call again; dropping the returned
    /// future early leaves the poll running.
    pub async fn wait(&mut self) -> PollOutcome {
        if let Some(outcome) = &self.outcome {
            return outcome.clone();
        }
        let outcome = (&mut self.handle).await.unwrap_or(PollOutcome::Cancelled);
        self.outcome = Some(outcome.clone());
        outcome
    }
}

impl Drop for SummaryPoll {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// Resolves once cancellation is requested or the handle is gone.
async fn cancelled(rx: &mut watch::Receiver<bool>) {
    let _ = rx.wait_for(|cancelled| *cancelled).await;
}

async fn run(
    backend: Arc<dyn Backend>,
    job_id: JobId,
    config: PollConfig,
    events: Arc<EventBus>,
    mut cancel: watch::Receiver<bool>,
) -> PollOutcome {
    let mut ticker = tokio::time::interval_at(Instant::now() + config.interval, config.interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut attempt = 0;

    loop {
        tokio::select! {
            biased;
            _ = cancelled(&mut cancel) => return PollOutcome::Cancelled,
            _ = ticker.tick() => {}
        }

        attempt += 1;
        let result = tokio::select! {
            biased;
            _ = cancelled(&mut cancel) => return PollOutcome::Cancelled,
            result = backend.fetch_summary(&job_id) => result,
        };

        if *cancel.borrow() {
            return PollOutcome::Cancelled;
        }

        match result {
            Ok(SummaryStatus::Ready(summary)) => {
                tracing::info!(job = %job_id, attempt, "summary ready");
                events.emit(Event::SummaryReady {
                    job_id: job_id.clone(),
                    summary: summary.clone(),
                });
                return PollOutcome::Ready(summary);
            }
            Ok(SummaryStatus::Pending(status)) => {
                tracing::debug!(job = %job_id, attempt, status, "summary pending");
                events.emit(Event::SummaryPending {
                    job_id: job_id.clone(),
                    attempt,
                });
            }
            Err(e) => {
                tracing::error!(job = %job_id, attempt, "error fetching summary: {e:#}");
                events.emit(Event::SummaryFailed {
                    job_id: job_id.clone(),
                    attempt,
                });
            }
        }

        if let Some(max) = config.max_attempts
            && attempt >= max
        {
            tracing::warn!(job = %job_id, attempt, "giving up on summary");
            events.emit(Event::PollExhausted {
                job_id,
                attempts: attempt,
            });
            return PollOutcome::Exhausted;
        }
    }
}
