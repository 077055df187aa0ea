//! The client as a whole: one story, a stack of routes, and the screen the
//! current route renders.
//!
//! Leaving the home screen cancels any running summary poll. Entering the
//! characters screen fetches the roster, entering the chat screen opens a
//! fresh session. Going back re-enters the previous route.

use std::sync::Arc;

use anyhow::{Result, bail};

use crate::backend::Backend;
use crate::characters::{self, Character};
use crate::chat::{ChatMessage, ChatSession};
use crate::events::EventBus;
use crate::route::Route;
use crate::story::poll::{PollConfig, PollOutcome};
use crate::story::{JobId, StoryFlow};

/// What the current route shows.
pub enum Screen {
    Home,
    Characters {
        story: String,
        roster: Vec<Character>,
        /// User-facing message if the roster could not be fetched.
        error: Option<String>,
    },
    Chat(ChatSession),
}

pub struct App {
    backend: Arc<dyn Backend>,
    events: Arc<EventBus>,
    story: StoryFlow,
    route: Route,
    history: Vec<Route>,
    screen: Screen,
}

impl App {
    pub fn new(backend: Arc<dyn Backend>, events: Arc<EventBus>, poll: PollConfig) -> Self {
        let story = StoryFlow::new(Arc::clone(&backend), Arc::clone(&events), poll);
        Self {
            backend,
            events,
            story,
            route: Route::Home,
            history: Vec::new(),
            screen: Screen::Home,
        }
    }

    pub fn events(&self) -> &Arc<EventBus> {
        &self.events
    }

    pub fn route(&self) -> &Route {
        &self.route
    }

    pub fn screen(&self) -> &Screen {
        &self.screen
    }

    pub fn story(&self) -> &StoryFlow {
        &self.story
    }

    /// Characters on screen, empty elsewhere.
    pub fn roster(&self) -> &[Character] {
        match &self.screen {
            Screen::Characters { roster, .. } => roster,
            _ => &[],
        }
    }

    pub fn chat(&self) -> Option<&ChatSession> {
        match &self.screen {
            Screen::Chat(session) => Some(session),
            _ => None,
        }
    }

    /// Submit a prompt from the home screen and start polling.
    pub async fn submit_story(&mut self, prompt: &str) -> Result<JobId> {
        if self.route != Route::Home {
            bail!("stories are submitted from the home screen");
        }
        self.story.submit(prompt).await
    }

    pub async fn wait_for_summary(&mut self) -> Option<PollOutcome> {
        self.story.wait_for_summary().await
    }

    /// Record a summary that arrived while nobody was waiting for it.
    /// Returns the outcome once, when the poll has just finished.
    pub async fn collect_summary(&mut self) -> Option<PollOutcome> {
        self.story.collect_finished().await
    }

    pub fn cancel_poll(&mut self) {
        self.story.cancel();
    }

    /// Route to the characters of the current story, once it has a summary.
    pub fn characters_route(&self) -> Option<Route> {
        self.story.summary().map(|summary| Route::Characters {
            story: summary.to_string(),
        })
    }

    /// Route to chat with the `index`-th character on screen (0-based).
    pub fn chat_route(&self, index: usize) -> Option<Route> {
        let Screen::Characters { story, roster, .. } = &self.screen else {
            return None;
        };
        let character = roster.get(index)?;
        Some(Route::Chat {
            name: character.name.clone(),
            image_src: character.avatar_url.clone(),
            story: story.clone(),
        })
    }

    /// Go to `route`, remembering the current one for [`App::back`].
    pub async fn navigate(&mut self, route: Route) -> Result<()> {
        let screen = self.enter(&route).await?;
        let previous = std::mem::replace(&mut self.route, route);
        self.leave(&previous);
        self.history.push(previous);
        self.screen = screen;
        tracing::debug!(route = %self.route, "navigated");
        Ok(())
    }

    /// Return to the previous route. At the bottom of the stack, stay home.
    pub async fn back(&mut self) -> Result<()> {
        let target = self.history.pop().unwrap_or(Route::Home);
        let screen = self.enter(&target).await?;
        let previous = std::mem::replace(&mut self.route, target);
        self.leave(&previous);
        self.screen = screen;
        tracing::debug!(route = %self.route, "went back");
        Ok(())
    }

    /// Send a chat message, giving up on the reply once `interrupt`
    /// resolves; an abandoned reply is replaced by the fallback. `None` off
    /// the chat screen or for blank input.
    pub async fn send_message(
        &mut self,
        input: &str,
        interrupt: impl Future<Output = ()>,
    ) -> Option<ChatMessage> {
        let Screen::Chat(session) = &mut self.screen else {
            return None;
        };
        session
            .send(self.backend.as_ref(), input, interrupt)
            .await
            .cloned()
    }

    async fn enter(&self, route: &Route) -> Result<Screen> {
        match route {
            Route::Home => Ok(Screen::Home),
            Route::Characters { story } => {
                let (roster, error) =
                    match characters::summon(self.backend.as_ref(), story, &self.events).await {
                        Ok(roster) => (roster, None),
                        Err(e) => (Vec::new(), Some(e.to_string())),
                    };
                Ok(Screen::Characters {
                    story: story.clone(),
                    roster,
                    error,
                })
            }
            Route::Chat {
                name,
                image_src,
                story,
            } => {
                let session = ChatSession::open(name, image_src, story, Arc::clone(&self.events))?;
                Ok(Screen::Chat(session))
            }
        }
    }

    fn leave(&mut self, previous: &Route) {
        if *previous == Route::Home && self.route != Route::Home {
            self.story.cancel();
        }
    }
}
