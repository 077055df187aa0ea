//! A conversation with one character.
//!
//! The log is append-only. Each send adds the user's message right away and
//! exactly one reply once the backend answers: the character's words, or a
//! canned fallback when the call fails. Only the latest message goes to the
//! backend.

use std::sync::Arc;

use anyhow::{Result, anyhow, bail};
use rand::RngExt;
use serde::{Deserialize, Serialize};

use crate::backend::{AskRequest, Backend};
use crate::consts::{CHAT_FALLBACK, USER_SENDER, greeting};
use crate::events::{Event, EventBus};

/// Experience granted per answered message, inclusive bounds.
const XP_GAIN_MIN: u32 = 5;
const XP_GAIN_MAX: u32 = 19;

/// Experience needed per level.
const XP_PER_LEVEL: u32 = 100;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub sender: String,
    pub content: String,
}

impl ChatMessage {
    pub fn new(sender: &str, content: &str) -> Self {
        Self {
            sender: sender.to_string(),
            content: content.to_string(),
        }
    }

    pub fn is_user(&self) -> bool {
        self.sender == USER_SENDER
    }
}

/// A user message already in the log, waiting for its reply.
#[must_use = "a pending turn must be resolved to append the reply"]
#[derive(Debug)]
pub struct PendingTurn {
    request: AskRequest,
}

impl PendingTurn {
    pub fn request(&self) -> &AskRequest {
        &self.request
    }
}

pub struct ChatSession {
    name: String,
    avatar_url: String,
    story: String,
    messages: Vec<ChatMessage>,
    xp: u32,
    events: Arc<EventBus>,
}

impl ChatSession {
    /// Open a session seeded with the character's greeting.
    /// Name, avatar, and story context are all required.
    pub fn open(name: &str, avatar_url: &str, story: &str, events: Arc<EventBus>) -> Result<Self> {
        if name.is_empty() || avatar_url.is_empty() || story.is_empty() {
            bail!("a chat needs a character name, an avatar, and a story");
        }
        let mut session = Self {
            name: name.to_string(),
            avatar_url: avatar_url.to_string(),
            story: story.to_string(),
            messages: Vec::new(),
            xp: 0,
            events,
        };
        session.append(ChatMessage::new(name, &greeting(name)));
        Ok(session)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn avatar_url(&self) -> &str {
        &self.avatar_url
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn xp(&self) -> u32 {
        self.xp
    }

    pub fn level(&self) -> u32 {
        self.xp / XP_PER_LEVEL + 1
    }

    /// Messages the user has sent so far.
    pub fn user_messages(&self) -> usize {
        self.messages.iter().filter(|m| m.is_user()).count()
    }

    /// Append the user's message and prepare the backend request.
    /// Blank input is ignored.
    pub fn push_user(&mut self, input: &str) -> Option<PendingTurn> {
        if input.trim().is_empty() {
            return None;
        }
        self.append(ChatMessage::new(USER_SENDER, input));
        Some(PendingTurn {
            request: AskRequest {
                query: input.to_string(),
                character_name: self.name.clone(),
                summarized_story: self.story.clone(),
            },
        })
    }

    /// Append the reply for `turn`, or the fallback if the call failed.
    pub fn resolve(&mut self, turn: PendingTurn, reply: Result<String>) -> &ChatMessage {
        let content = match reply {
            Ok(text) => {
                let gained = rand::rng().random_range(XP_GAIN_MIN..=XP_GAIN_MAX);
                self.xp += gained;
                tracing::debug!(character = %self.name, gained, xp = self.xp, "reply received");
                text
            }
            Err(e) => {
                tracing::error!(
                    character = %turn.request.character_name,
                    "error getting character response: {e:#}"
                );
                CHAT_FALLBACK.to_string()
            }
        };
        let reply = ChatMessage {
            sender: self.name.clone(),
            content,
        };
        self.append(reply)
    }

    /// One full turn: append, ask, append the reply. If `interrupt`
    /// resolves before the backend answers, the call is dropped and the
    /// fallback is the reply. Returns the reply, or `None` for blank input.
    pub async fn send(
        &mut self,
        backend: &dyn Backend,
        input: &str,
        interrupt: impl Future<Output = ()>,
    ) -> Option<&ChatMessage> {
        let turn = self.push_user(input)?;
        let reply = tokio::select! {
            reply = backend.ask(turn.request()) => reply,
            _ = interrupt => Err(anyhow!("interrupted while waiting for {}", self.name)),
        };
        Some(self.resolve(turn, reply))
    }

    fn append(&mut self, message: ChatMessage) -> &ChatMessage {
        self.events.emit(Event::MessageAppended {
            sender: message.sender.clone(),
        });
        self.messages.push(message);
        &self.messages[self.messages.len() - 1]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::mock::MockBackend;
    use std::time::Duration;

    fn session() -> ChatSession {
        ChatSession::open(
            "Alice",
            "https://example.com/a.png",
            "a tale of two sisters",
            Arc::new(EventBus::default()),
        )
        .unwrap()
    }

    #[test]
    fn open_seeds_greeting() {
        let s = session();
        assert_eq!(s.messages().len(), 1);
        assert_eq!(s.messages()[0].sender, "Alice");
        assert!(s.messages()[0].content.contains("I am Alice"));
        assert_eq!(s.level(), 1);
    }

    #[test]
    fn open_requires_all_fields() {
        let events = Arc::new(EventBus::default());
        assert!(ChatSession::open("", "a", "s", events.clone()).is_err());
        assert!(ChatSession::open("n", "", "s", events.clone()).is_err());
        assert!(ChatSession::open("n", "a", "", events).is_err());
    }

    #[test]
    fn push_user_appends_immediately() {
        let mut s = session();
        let turn = s.push_user("who goes there?").unwrap();
        assert_eq!(s.messages().len(), 2);
        assert!(s.messages()[1].is_user());
        assert_eq!(turn.request().query, "who goes there?");
        assert_eq!(turn.request().character_name, "Alice");
        assert_eq!(turn.request().summarized_story, "a tale of two sisters");
        let _ = s.resolve(turn, Ok("A friend.".to_string()));
    }

    #[test]
    fn blank_input_ignored() {
        let mut s = session();
        assert!(s.push_user("   ").is_none());
        assert_eq!(s.messages().len(), 1);
    }

    #[test]
    fn failed_reply_appends_fallback() {
        let mut s = session();
        let turn = s.push_user("hello").unwrap();
        let reply = s.resolve(turn, Err(anyhow::anyhow!("connection reset")));
        assert_eq!(reply.content, CHAT_FALLBACK);
        assert_eq!(reply.sender, "Alice");
        assert_eq!(s.messages().len(), 3);
        assert_eq!(s.xp(), 0);
    }

    #[test]
    fn answered_reply_grants_xp() {
        let mut s = session();
        let turn = s.push_user("hello").unwrap();
        let _ = s.resolve(turn, Ok("well met".to_string()));
        assert!((XP_GAIN_MIN..=XP_GAIN_MAX).contains(&s.xp()));
    }

    #[test]
    fn level_from_xp() {
        let mut s = session();
        s.xp = 99;
        assert_eq!(s.level(), 1);
        s.xp = 100;
        assert_eq!(s.level(), 2);
        s.xp = 250;
        assert_eq!(s.level(), 3);
    }

    #[tokio::test]
    async fn send_appends_exactly_one_reply() {
        let backend = MockBackend::new().with_reply("Greetings, traveller.");
        let mut s = session();
        let reply = s.send(&backend, "hi", std::future::pending()).await.unwrap().clone();
        assert_eq!(reply.content, "Greetings, traveller.");
        assert_eq!(s.messages().len(), 3);
        assert_eq!(s.user_messages(), 1);
        assert_eq!(backend.ask_calls(), 1);
    }

    #[tokio::test]
    async fn send_blank_makes_no_call() {
        let backend = MockBackend::new().with_reply("unused");
        let mut s = session();
        assert!(s.send(&backend, "", std::future::pending()).await.is_none());
        assert_eq!(backend.ask_calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn interrupted_send_appends_fallback() {
        let backend = MockBackend::new()
            .with_delay(Duration::from_secs(60))
            .with_reply("never heard");
        let mut s = session();

        let reply = s
            .send(&backend, "hello?", tokio::time::sleep(Duration::from_secs(1)))
            .await
            .unwrap();
        assert_eq!(reply.content, CHAT_FALLBACK);
        assert_eq!(s.messages().len(), 3);
        assert_eq!(s.xp(), 0);
        assert_eq!(backend.ask_calls(), 1);
    }
}
