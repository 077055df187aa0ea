//! Decoupled event bus for cross-component communication.
//!
//! The summary poll, the roster loader, and chat sessions emit events via
//! [`EventBus::emit`]; the REPL and tests subscribe via
//! [`EventBus::subscribe`]. Built on [`tokio::sync::broadcast`] so multiple
//! listeners can react independently.

use tokio::sync::broadcast;

use crate::story::JobId;

/// Events that flow through the system.
#[derive(Debug, Clone)]
pub enum Event {
    /// A status query came back without a summary.
    SummaryPending { job_id: JobId, attempt: usize },
    /// The backend produced the summary; polling has stopped.
    SummaryReady { job_id: JobId, summary: String },
    /// A status query failed. The loader stops; polling goes on.
    SummaryFailed { job_id: JobId, attempt: usize },
    /// The attempt bound was reached without a summary.
    PollExhausted { job_id: JobId, attempts: usize },
    /// A character roster was built from the backend's name list.
    CharactersSummoned { count: usize },
    /// A message was appended to a chat log.
    MessageAppended { sender: String },
}

/// A broadcast channel that any component can emit to or subscribe from.
#[derive(Debug)]
pub struct EventBus {
    tx: broadcast::Sender<Event>,
}

impl EventBus {
    /// Create a new event bus with the given channel capacity.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Emit an event to all current subscribers.
    /// Returns the number of receivers that will see it.
    pub fn emit(&self, event: Event) -> usize {
        self.tx.send(event).unwrap_or(0)
    }

    /// Subscribe to events. Returns a receiver that yields all
    /// future events (does not replay past ones).
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.tx.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(64)
    }
}
