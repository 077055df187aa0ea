use std::io::{self, Write};
use std::sync::Arc;

use anyhow::bail;
use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::{self, error::TryRecvError};

use taleforge::app::{App, Screen};
use taleforge::backend::Backend;
use taleforge::backend::http::HttpBackend;
use taleforge::banner::{BannerInfo, SessionStats, print_banner, print_session_summary};
use taleforge::commands::{CommandRegistry, CommandResult, SessionInfo};
use taleforge::config::settings::{KEYS, is_known_key};
use taleforge::config::{Config, Overrides, Settings};
use taleforge::consts::{PLACEHOLDER_AVATAR_URL, default_db_path};
use taleforge::events::Event;
use taleforge::logging;
use taleforge::route::Route;
use taleforge::spinner::Spinner;
use taleforge::story::poll::PollOutcome;

#[derive(Parser)]
#[command(
    name = "taleforge",
    version,
    about = "Forge a tale, summon its characters, and talk to them."
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    /// SQLite database for stored settings (use :memory: for ephemeral)
    #[arg(short, long)]
    db: Option<String>,

    /// Base URL for stories, summaries, and chat
    #[arg(long)]
    story_url: Option<String>,

    /// Base URL for character extraction
    #[arg(long)]
    character_url: Option<String>,

    /// Seconds between summary polls
    #[arg(long)]
    poll_interval: Option<u64>,

    /// Summary polls before giving up (0 = unbounded)
    #[arg(long)]
    max_poll_attempts: Option<usize>,

    /// Start the REPL at a route, e.g. "/characters?story=..."
    #[arg(short, long)]
    open: Option<String>,

    /// Debug logging for taleforge (RUST_LOG takes precedence)
    #[arg(short, long, default_value_t = false)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Submit a story title and wait for its summary
    Story {
        #[arg(required = true, num_args = 1..)]
        prompt: Vec<String>,
    },
    /// List the characters of a story
    Characters {
        /// Story text
        story: String,
    },
    /// Send one message to a character
    Ask {
        /// Character name
        #[arg(long)]
        name: String,
        /// Story the character comes from
        #[arg(long)]
        story: String,
        #[arg(required = true, num_args = 1..)]
        query: Vec<String>,
    },
    /// Manage stored settings
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print a stored value
    Get { key: String },
    /// Store a value
    Set { key: String, value: String },
    /// Remove a stored value
    Unset { key: String },
    /// List every key with its stored value
    List,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    let db = match &cli.db {
        Some(path) => path.clone(),
        None => default_db_path()?.to_string_lossy().into_owned(),
    };
    let store = Config::open(&db)?;

    if let Some(Command::Config { action }) = &cli.command {
        return handle_config(&store, action);
    }

    let overrides = Overrides {
        story_url: cli.story_url.clone(),
        character_url: cli.character_url.clone(),
        poll_interval_secs: cli.poll_interval,
        max_poll_attempts: cli.max_poll_attempts,
    };
    let settings = Settings::resolve(Some(&store), &overrides, |k| std::env::var(k).ok())?;

    let backend: Arc<dyn Backend> = Arc::new(HttpBackend::new(
        settings.endpoints(),
        settings.submit_timeout,
    ));
    let mut app = App::new(backend, Arc::default(), settings.poll_config());

    match cli.command {
        Some(Command::Story { prompt }) => return run_story(&mut app, &prompt.join(" ")).await,
        Some(Command::Characters { story }) => return run_characters(&mut app, story).await,
        Some(Command::Ask { name, story, query }) => {
            return run_ask(&mut app, name, story, &query.join(" ")).await;
        }
        Some(Command::Config { .. }) | None => {}
    }

    let db_label = if db == ":memory:" { "ephemeral" } else { &db };
    print_banner(&BannerInfo {
        settings: &settings,
        config: db_label,
    });

    if let Some(route) = &cli.open {
        go(&mut app, Route::parse(route)?).await;
    }

    let stats = repl(&mut app, &settings, db_label).await?;
    print_session_summary(stats);
    Ok(())
}

async fn repl(app: &mut App, settings: &Settings, db_label: &str) -> anyhow::Result<SessionStats> {
    let registry = CommandRegistry::new();
    let mut stats = SessionStats::default();

    // Async stdin so Ctrl+C is caught at the prompt too
    let stdin = BufReader::new(tokio::io::stdin());
    let mut lines = stdin.lines();

    let events = Arc::clone(app.events());
    let mut rx = events.subscribe();

    loop {
        // A summary may have landed after its loader was dropped.
        let mut ready = false;
        loop {
            match rx.try_recv() {
                Ok(Event::SummaryReady { .. }) => ready = true,
                Ok(_) | Err(TryRecvError::Lagged(_)) => {}
                Err(_) => break,
            }
        }
        let outcome = if ready {
            app.wait_for_summary().await
        } else {
            app.collect_summary().await
        };
        if let Some(outcome) = outcome {
            announce(&outcome);
        }

        print!("\n{}> ", prompt_label(app));
        io::stdout().flush()?;

        let line = tokio::select! {
            result = lines.next_line() => {
                match result {
                    Ok(Some(line)) => line,
                    Ok(None) => {
                        // Ctrl+D (EOF)
                        println!();
                        break;
                    }
                    Err(e) => {
                        eprintln!("input error: {}", e);
                        break;
                    }
                }
            }
            _ = tokio::signal::ctrl_c() => {
                println!();
                break;
            }
            _ = summary_ready(&mut rx) => {
                println!();
                if let Some(outcome) = app.wait_for_summary().await {
                    announce(&outcome);
                }
                continue;
            }
        };

        let input = line.trim();
        if input.is_empty() {
            continue;
        }

        let result = {
            let info = SessionInfo {
                route: app.route(),
                story: app.story().story(),
                fetching: app.story().is_fetching(),
                roster: app.roster(),
                chat: app.chat(),
                settings,
                config: db_label,
            };
            registry.dispatch(input, &info).await
        };

        match result {
            CommandResult::Quit => break,
            CommandResult::Handled => {}
            CommandResult::Navigate(route) => go(app, route).await,
            CommandResult::Back => {
                match app.back().await {
                    Ok(()) => render(app),
                    Err(e) => eprintln!("  ✗ {e:#}"),
                }
            }
            CommandResult::NotACommand => handle_input(app, input, &mut stats).await,
        }
    }

    Ok(stats)
}

/// Plain input: a story title at home, a pick on the roster, a message in chat.
async fn handle_input(app: &mut App, input: &str, stats: &mut SessionStats) {
    match app.route() {
        Route::Home => {
            let spinner = Spinner::start("Conjuring");
            let submitted = app.submit_story(input).await;
            spinner.stop().await;
            match submitted {
                Ok(_) => {
                    stats.stories += 1;
                    await_summary(app).await;
                }
                Err(e) => eprintln!("  ✗ {e}"),
            }
        }
        Route::Characters { .. } => {
            let route = input
                .parse::<usize>()
                .ok()
                .and_then(|n| n.checked_sub(1))
                .and_then(|i| app.chat_route(i));
            match route {
                Some(route) => go(app, route).await,
                None => println!("  pick a character by number, or /back"),
            }
        }
        Route::Chat { name, .. } => {
            let spinner = Spinner::start(&format!("{name} ponders"));
            let xp_before = app.chat().map(|c| c.xp()).unwrap_or(0);
            let reply = app.send_message(input, interrupted()).await;
            spinner.stop().await;

            if let Some(reply) = reply {
                stats.messages += 1;
                let xp_after = app.chat().map(|c| c.xp()).unwrap_or(0);
                stats.xp += u64::from(xp_after.saturating_sub(xp_before));
                println!("\n  {}: {}", reply.sender, reply.content);
                if let Some(chat) = app.chat() {
                    println!("  level {} • xp {}", chat.level(), chat.xp());
                }
            }
        }
    }
}

/// Wait for the running poll with a loader. Ctrl+C cancels the poll. A
/// failed query only stops the loader; polling goes on in the background.
async fn await_summary(app: &mut App) {
    enum Waited {
        Done(Option<PollOutcome>),
        LoaderStopped,
        Interrupted,
    }

    let events = Arc::clone(app.events());
    let mut rx = events.subscribe();
    let spinner = Spinner::start("Weaving your tale...");

    let waited = loop {
        tokio::select! {
            outcome = app.wait_for_summary() => break Waited::Done(outcome),
            Ok(event) = rx.recv() => match event {
                Event::SummaryPending { attempt, .. } => {
                    spinner.set_message(&format!("Weaving your tale... (attempt {attempt})"));
                }
                Event::SummaryFailed { .. } => break Waited::LoaderStopped,
                _ => {}
            },
            _ = interrupted() => break Waited::Interrupted,
        }
    };
    spinner.stop().await;

    match waited {
        Waited::Done(Some(outcome)) => announce(&outcome),
        Waited::Interrupted => {
            app.cancel_poll();
            println!("\n  interrupted");
        }
        // The cause is in the log.
        Waited::LoaderStopped | Waited::Done(None) => {}
    }
}

fn announce(outcome: &PollOutcome) {
    match outcome {
        PollOutcome::Ready(summary) => {
            println!("\n  Your Epic Tale\n\n  {summary}\n");
            println!("  /characters to summon its characters");
        }
        PollOutcome::Exhausted => println!("  no summary arrived. Submit the title again to retry."),
        PollOutcome::Cancelled => {}
    }
}

/// Resolves on the next `SummaryReady`, skipping other events.
async fn summary_ready(rx: &mut broadcast::Receiver<Event>) {
    loop {
        match rx.recv().await {
            Ok(Event::SummaryReady { .. }) => return,
            Ok(_) | Err(broadcast::error::RecvError::Lagged(_)) => {}
            Err(broadcast::error::RecvError::Closed) => std::future::pending().await,
        }
    }
}

/// Resolves on Ctrl+C. Never resolves if the handler cannot be installed.
async fn interrupted() {
    if tokio::signal::ctrl_c().await.is_err() {
        std::future::pending::<()>().await;
    }
}

/// Navigate with a loader where the target screen has to fetch. Ctrl+C
/// abandons the fetch and leaves the current screen as it was.
async fn go(app: &mut App, route: Route) {
    let spinner = matches!(route, Route::Characters { .. })
        .then(|| Spinner::start("Loading characters..."));
    let result = tokio::select! {
        result = app.navigate(route) => Some(result),
        _ = interrupted() => None,
    };
    if let Some(spinner) = spinner {
        spinner.stop().await;
    }
    match result {
        Some(Ok(())) => render(app),
        Some(Err(e)) => eprintln!("  ✗ {e:#}"),
        None => println!("\n  interrupted"),
    }
}

fn render(app: &App) {
    match app.screen() {
        Screen::Home => {
            if let Some(summary) = app.story().summary() {
                println!("\n  {summary}");
            }
        }
        Screen::Characters { roster, error, .. } => {
            if let Some(error) = error {
                eprintln!("  ✗ {error}");
                return;
            }
            if roster.is_empty() {
                println!("  no characters answered the summons");
                return;
            }
            println!("\n  Generated Characters\n");
            for (i, c) in roster.iter().enumerate() {
                println!("  {}. {}  by {}", i + 1, c.name, c.author_handle);
                println!("     {}", c.description);
            }
            println!("\n  pick a number to talk to a character");
        }
        Screen::Chat(chat) => {
            println!("\n  {}  level {} • xp {}", chat.name(), chat.level(), chat.xp());
            println!("  portrait  {}\n", chat.avatar_url());
            for message in chat.messages() {
                println!("  {}: {}", message.sender, message.content);
            }
        }
    }
}

fn prompt_label(app: &App) -> String {
    match app.route() {
        Route::Home => "forge".to_string(),
        Route::Characters { .. } => "summon".to_string(),
        Route::Chat { name, .. } => name.to_lowercase(),
    }
}

async fn run_story(app: &mut App, prompt: &str) -> anyhow::Result<()> {
    app.submit_story(prompt).await?;
    let spinner = Spinner::start("Weaving your tale...");
    let outcome = tokio::select! {
        outcome = app.wait_for_summary() => outcome,
        _ = interrupted() => None,
    };
    spinner.stop().await;

    match outcome {
        Some(PollOutcome::Ready(summary)) => {
            println!("{summary}");
            Ok(())
        }
        _ => {
            app.cancel_poll();
            bail!("no summary was produced")
        }
    }
}

async fn run_characters(app: &mut App, story: String) -> anyhow::Result<()> {
    app.navigate(Route::Characters { story }).await?;
    if let Screen::Characters {
        error: Some(error), ..
    } = app.screen()
    {
        bail!("{error}");
    }
    for c in app.roster() {
        println!("{}\t{}\t{}", c.name, c.author_handle, c.avatar_url);
    }
    Ok(())
}

async fn run_ask(app: &mut App, name: String, story: String, query: &str) -> anyhow::Result<()> {
    app.navigate(Route::Chat {
        name,
        image_src: PLACEHOLDER_AVATAR_URL.to_string(),
        story,
    })
    .await?;
    match app.send_message(query, interrupted()).await {
        Some(reply) => {
            println!("{}", reply.content);
            Ok(())
        }
        None => bail!("nothing to send"),
    }
}

fn handle_config(store: &Config, action: &ConfigAction) -> anyhow::Result<()> {
    match action {
        ConfigAction::Get { key } => {
            if !is_known_key(key) {
                bail!("unknown config key: {key}");
            }
            match store.get(key)? {
                Some(value) => println!("{value}"),
                None => println!("(unset)"),
            }
        }
        ConfigAction::Set { key, value } => {
            store.set(key, value)?;
            println!("✓ {key} = {value}");
        }
        ConfigAction::Unset { key } => {
            if !is_known_key(key) {
                bail!("unknown config key: {key}");
            }
            store.remove(key)?;
            println!("✓ {key} unset");
        }
        ConfigAction::List => {
            let stored = store.entries()?;
            for (key, description) in KEYS {
                let value = stored
                    .iter()
                    .find(|(k, _)| k == key)
                    .map(|(_, v)| v.as_str())
                    .unwrap_or("-");
                println!("{key:<20} {value:<40} {description}");
            }
        }
    }
    Ok(())
}
