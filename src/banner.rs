//! Startup banner and farewell summary.

use crate::config::Settings;
use crate::consts::{AUTHOR, HOMEPAGE, REPO, format_number};

/// Session configuration for display in the startup banner.
pub struct BannerInfo<'a> {
    pub settings: &'a Settings,
    pub config: &'a str,
}

/// Print the startup banner with session info.
pub fn print_banner(info: &BannerInfo) {
    let attempts = match info.settings.max_poll_attempts {
        Some(n) => format!("{n} attempts"),
        None => "unbounded".to_string(),
    };
    println!(
        r#"
   ╔═══════════════════════════════════════╗
   ║          T A L E F O R G E            ║
   ║      enter the realm of stories       ║
   ╚═══════════════════════════════════════╝

   version     {}
   by          {}
   home        {}
   repo        {}
   stories     {}
   characters  {}
   polling     every {}s, {}
   config      {}

   Type a story title to begin. /help for commands.
"#,
        env!("CARGO_PKG_VERSION"),
        AUTHOR,
        HOMEPAGE,
        REPO,
        info.settings.story_url,
        info.settings.character_url,
        info.settings.poll_interval.as_secs(),
        attempts,
        info.config,
    );
}

/// Tallies shown when the session ends.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionStats {
    pub stories: u64,
    pub messages: u64,
    pub xp: u64,
}

/// Print the session summary and farewell.
pub fn print_session_summary(stats: SessionStats) {
    if stats.stories > 0 || stats.messages > 0 {
        println!(
            "session: {} stories forged, {} messages sent, {} xp earned",
            format_number(stats.stories),
            format_number(stats.messages),
            format_number(stats.xp),
        );
    }
    println!("farewell, hero.");
}
