//! Built-in REPL commands prefixed with `/`.
//!
//! Commands implement the [`Command`] trait and are registered in a
//! [`CommandRegistry`]. The registry handles dispatch, alias resolution,
//! argument splitting, and dynamic help generation. Commands never touch the
//! backend themselves; they hand a [`CommandResult`] back to the REPL.

mod back;
mod characters;
mod chat;
mod help;
mod history;
mod open;
mod quit;
mod status;
mod story;

use async_trait::async_trait;
use std::sync::Arc;

use crate::characters::Character;
use crate::chat::ChatSession;
use crate::config::Settings;
use crate::route::Route;
use crate::story::Story;

/// Read-only view of the session available to commands.
pub struct SessionInfo<'a> {
    pub route: &'a Route,
    pub story: Option<&'a Story>,
    /// A summary poll is running.
    pub fetching: bool,
    pub roster: &'a [Character],
    pub chat: Option<&'a ChatSession>,
    pub settings: &'a Settings,
    pub config: &'a str,
}

/// What the REPL should do after a command runs.
#[derive(Debug)]
pub enum CommandResult {
    /// Not a command. Treat the input as a prompt, selection, or message.
    NotACommand,
    /// Command handled, continue the REPL loop.
    Handled,
    /// Switch to another screen.
    Navigate(Route),
    /// Return to the previous screen.
    Back,
    /// Exit the REPL.
    Quit,
}

/// A REPL command. Implement this trait to add new commands.
#[async_trait]
pub trait Command: Send + Sync {
    /// Primary name, e.g. `"/story"`.
    fn name(&self) -> &str;

    /// Alternative names, e.g. `&["/h", "/?"]`.
    fn aliases(&self) -> &[&str] {
        &[]
    }

    /// Argument synopsis for `/help`, e.g. `"<n>"`.
    fn usage(&self) -> &str {
        ""
    }

    /// One-line description for `/help`.
    fn description(&self) -> &str;

    /// Run the command. `args` is everything after the name, trimmed.
    async fn execute(&self, args: &str, info: &SessionInfo<'_>) -> CommandResult;
}

/// Holds registered commands.
pub struct CommandRegistry {
    commands: Vec<Arc<dyn Command>>,
}

impl CommandRegistry {
    /// Create a registry with all built-in commands.
    pub fn new() -> Self {
        let commands: Vec<Arc<dyn Command>> = vec![
            Arc::new(help::HelpCommand),
            Arc::new(story::StoryCommand),
            Arc::new(characters::CharactersCommand),
            Arc::new(chat::ChatCommand),
            Arc::new(history::HistoryCommand),
            Arc::new(open::OpenCommand),
            Arc::new(back::BackCommand),
            Arc::new(status::StatusCommand),
            Arc::new(quit::QuitCommand),
        ];
        Self { commands }
    }

    /// Dispatch input to a matching command, or return `NotACommand`.
    pub async fn dispatch(&self, input: &str, info: &SessionInfo<'_>) -> CommandResult {
        let input = input.trim();
        let (cmd, args) = input
            .split_once(char::is_whitespace)
            .map(|(cmd, args)| (cmd, args.trim()))
            .unwrap_or((input, ""));

        for command in &self.commands {
            if cmd == command.name() || command.aliases().contains(&cmd) {
                // /help needs the registry to list all commands
                if command.name() == "/help" {
                    print!("{}", self.help_text());
                    return CommandResult::Handled;
                }
                return command.execute(args, info).await;
            }
        }

        if cmd.starts_with('/') {
            println!("unknown command: {cmd}");
            println!("type /help for available commands");
            return CommandResult::Handled;
        }

        CommandResult::NotACommand
    }

    /// Generate help text from all registered commands.
    pub fn help_text(&self) -> String {
        let entries: Vec<(String, &str)> = self
            .commands
            .iter()
            .map(|c| (format_label(c.name(), c.usage(), c.aliases()), c.description()))
            .collect();

        let max_width = entries
            .iter()
            .map(|(label, _)| label.len())
            .max()
            .unwrap_or(10);

        let mut out = String::new();
        for (label, desc) in &entries {
            out.push_str(&format!("  {label:<max_width$}  {desc}\n"));
        }
        out
    }
}

impl Default for CommandRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn format_label(name: &str, usage: &str, aliases: &[&str]) -> String {
    let mut label = name.to_string();
    if !usage.is_empty() {
        label.push(' ');
        label.push_str(usage);
    }
    if !aliases.is_empty() {
        label.push_str(&format!(" ({})", aliases.join(", ")));
    }
    label
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::LazyLock;

    static SETTINGS: LazyLock<Settings> = LazyLock::new(Settings::default);
    static HOME: Route = Route::Home;

    fn names(reg: &CommandRegistry) -> Vec<&str> {
        reg.commands.iter().map(|c| c.name()).collect()
    }

    pub(crate) fn test_info() -> SessionInfo<'static> {
        SessionInfo {
            route: &HOME,
            story: None,
            fetching: false,
            roster: &[],
            chat: None,
            settings: &SETTINGS,
            config: ":memory:",
        }
    }

    #[test]
    fn all_builtins_registered() {
        let reg = CommandRegistry::new();
        let registered = names(&reg);
        for name in [
            "/help",
            "/story",
            "/characters",
            "/chat",
            "/history",
            "/open",
            "/back",
            "/status",
            "/quit",
        ] {
            assert!(registered.contains(&name), "missing {name}");
        }
    }

    #[test]
    fn no_duplicate_triggers() {
        let reg = CommandRegistry::new();
        let mut seen = Vec::new();
        let triggers = reg
            .commands
            .iter()
            .flat_map(|c| std::iter::once(c.name()).chain(c.aliases().iter().copied()));
        for t in triggers {
            assert!(!seen.contains(&t), "duplicate trigger: {t}");
            seen.push(t);
        }
    }

    #[test]
    fn help_text_includes_all_commands() {
        let reg = CommandRegistry::new();
        let text = reg.help_text();
        for name in names(&reg) {
            assert!(text.contains(name), "help missing: {name}");
        }
        assert!(text.contains("/h"));
        assert!(text.contains("/chat <n>"));
    }

    #[tokio::test]
    async fn unknown_slash_command_is_handled() {
        let reg = CommandRegistry::new();
        assert!(matches!(
            reg.dispatch("/foobar", &test_info()).await,
            CommandResult::Handled
        ));
    }

    #[tokio::test]
    async fn non_command_passes_through() {
        let reg = CommandRegistry::new();
        assert!(matches!(
            reg.dispatch("the last dragon", &test_info()).await,
            CommandResult::NotACommand
        ));
        assert!(matches!(
            reg.dispatch("2", &test_info()).await,
            CommandResult::NotACommand
        ));
    }

    #[tokio::test]
    async fn args_are_passed_through() {
        let reg = CommandRegistry::new();
        let result = reg
            .dispatch("/open   /characters?story=x  ", &test_info())
            .await;
        match result {
            CommandResult::Navigate(route) => assert_eq!(route.screen(), "characters"),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[tokio::test]
    async fn aliases_dispatch() {
        let reg = CommandRegistry::new();
        assert!(matches!(
            reg.dispatch("exit", &test_info()).await,
            CommandResult::Quit
        ));
        assert!(matches!(
            reg.dispatch("/?", &test_info()).await,
            CommandResult::Handled
        ));
    }

    #[test]
    fn format_label_variants() {
        assert_eq!(format_label("/back", "", &[]), "/back");
        assert_eq!(format_label("/help", "", &["/h", "/?"]), "/help (/h, /?)");
        assert_eq!(format_label("/chat", "<n>", &[]), "/chat <n>");
    }
}
