//! Runtime settings resolved from flags, environment, store, and defaults.
//!
//! Precedence, highest first: command-line flag, environment variable,
//! stored config value, built-in default.

use std::time::Duration;

use anyhow::{Context, Result, bail};
use url::Url;

use super::Config;
use crate::backend::http::Endpoints;
use crate::consts::{
    DEFAULT_CHARACTER_URL, DEFAULT_POLL_INTERVAL, DEFAULT_STORY_URL, DEFAULT_SUBMIT_TIMEOUT,
};
use crate::story::poll::PollConfig;

pub const STORY_URL: &str = "story_url";
pub const CHARACTER_URL: &str = "character_url";
pub const POLL_INTERVAL_SECS: &str = "poll_interval_secs";
pub const SUBMIT_TIMEOUT_SECS: &str = "submit_timeout_secs";
pub const MAX_POLL_ATTEMPTS: &str = "max_poll_attempts";

pub const STORY_URL_ENV: &str = "TALEFORGE_STORY_URL";
pub const CHARACTER_URL_ENV: &str = "TALEFORGE_CHARACTER_URL";

/// Every stored key with a one-line description.
pub const KEYS: &[(&str, &str)] = &[
    (STORY_URL, "base URL for stories, summaries, and chat"),
    (CHARACTER_URL, "base URL for character extraction"),
    (POLL_INTERVAL_SECS, "seconds between summary polls"),
    (SUBMIT_TIMEOUT_SECS, "seconds before story submission gives up"),
    (MAX_POLL_ATTEMPTS, "summary polls before giving up (0 = unbounded)"),
];

pub fn is_known_key(key: &str) -> bool {
    KEYS.iter().any(|(k, _)| *k == key)
}

/// Values given on the command line.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub story_url: Option<String>,
    pub character_url: Option<String>,
    pub poll_interval_secs: Option<u64>,
    pub max_poll_attempts: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub story_url: Url,
    pub character_url: Url,
    pub poll_interval: Duration,
    pub submit_timeout: Duration,
    pub max_poll_attempts: Option<usize>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            story_url: Url::parse(DEFAULT_STORY_URL).expect("default story URL is valid"),
            character_url: Url::parse(DEFAULT_CHARACTER_URL)
                .expect("default character URL is valid"),
            poll_interval: DEFAULT_POLL_INTERVAL,
            submit_timeout: DEFAULT_SUBMIT_TIMEOUT,
            max_poll_attempts: None,
        }
    }
}

impl Settings {
    /// Resolve settings. `env` looks up environment variables; pass
    /// `|k| std::env::var(k).ok()` outside of tests.
    pub fn resolve(
        store: Option<&Config>,
        overrides: &Overrides,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self> {
        let stored = |key: &str| -> Result<Option<String>> {
            match store {
                Some(config) => config.get(key),
                None => Ok(None),
            }
        };
        let from_env = |var: &str| env(var).filter(|v| !v.trim().is_empty());

        let defaults = Self::default();

        let layered = |flag: &Option<String>, var: &str, key: &str| -> Result<Option<String>> {
            match flag.clone().or_else(|| from_env(var)) {
                Some(value) => Ok(Some(value)),
                None => stored(key),
            }
        };

        let story_url = match layered(&overrides.story_url, STORY_URL_ENV, STORY_URL)? {
            Some(raw) => parse_url(STORY_URL, &raw)?,
            None => defaults.story_url,
        };

        let character_url =
            match layered(&overrides.character_url, CHARACTER_URL_ENV, CHARACTER_URL)? {
                Some(raw) => parse_url(CHARACTER_URL, &raw)?,
                None => defaults.character_url,
            };

        let poll_interval = match overrides.poll_interval_secs {
            Some(secs) => positive_secs(POLL_INTERVAL_SECS, secs)?,
            None => match stored(POLL_INTERVAL_SECS)? {
                Some(raw) => positive_secs(POLL_INTERVAL_SECS, parse_u64(POLL_INTERVAL_SECS, &raw)?)?,
                None => defaults.poll_interval,
            },
        };

        let submit_timeout = match stored(SUBMIT_TIMEOUT_SECS)? {
            Some(raw) => positive_secs(SUBMIT_TIMEOUT_SECS, parse_u64(SUBMIT_TIMEOUT_SECS, &raw)?)?,
            None => defaults.submit_timeout,
        };

        let max_poll_attempts = match overrides.max_poll_attempts {
            Some(n) => n,
            None => match stored(MAX_POLL_ATTEMPTS)? {
                Some(raw) => parse_u64(MAX_POLL_ATTEMPTS, &raw)? as usize,
                None => 0,
            },
        };

        Ok(Self {
            story_url,
            character_url,
            poll_interval,
            submit_timeout,
            max_poll_attempts: (max_poll_attempts > 0).then_some(max_poll_attempts),
        })
    }

    pub fn endpoints(&self) -> Endpoints {
        Endpoints {
            story: self.story_url.clone(),
            characters: self.character_url.clone(),
        }
    }

    pub fn poll_config(&self) -> PollConfig {
        PollConfig {
            interval: self.poll_interval,
            max_attempts: self.max_poll_attempts,
        }
    }
}

/// Check a value before it is stored.
pub fn validate(key: &str, value: &str) -> Result<()> {
    match key {
        STORY_URL | CHARACTER_URL => parse_url(key, value).map(|_| ()),
        POLL_INTERVAL_SECS | SUBMIT_TIMEOUT_SECS => {
            positive_secs(key, parse_u64(key, value)?).map(|_| ())
        }
        MAX_POLL_ATTEMPTS => parse_u64(key, value).map(|_| ()),
        _ => bail!("unknown config key: {key}"),
    }
}

fn parse_url(key: &str, raw: &str) -> Result<Url> {
    let url = Url::parse(raw.trim()).with_context(|| format!("invalid {key}: {raw}"))?;
    if url.cannot_be_a_base() {
        bail!("invalid {key}: {raw} cannot be used as a base URL");
    }
    Ok(url)
}

fn parse_u64(key: &str, raw: &str) -> Result<u64> {
    raw.trim()
        .parse()
        .with_context(|| format!("invalid {key}: {raw}"))
}

fn positive_secs(key: &str, secs: u64) -> Result<Duration> {
    if secs == 0 {
        bail!("invalid {key}: must be at least 1");
    }
    Ok(Duration::from_secs(secs))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn defaults_without_anything() {
        let settings = Settings::resolve(None, &Overrides::default(), no_env).unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.poll_interval, Duration::from_secs(5));
        assert_eq!(settings.submit_timeout, Duration::from_secs(30));
    }

    #[test]
    fn store_beats_default() {
        let store = Config::open(":memory:").unwrap();
        store.set(STORY_URL, "http://stored:1").unwrap();
        store.set(POLL_INTERVAL_SECS, "2").unwrap();
        store.set(SUBMIT_TIMEOUT_SECS, "9").unwrap();
        store.set(MAX_POLL_ATTEMPTS, "12").unwrap();

        let s = Settings::resolve(Some(&store), &Overrides::default(), no_env).unwrap();
        assert_eq!(s.story_url.as_str(), "http://stored:1/");
        assert_eq!(s.poll_interval, Duration::from_secs(2));
        assert_eq!(s.submit_timeout, Duration::from_secs(9));
        assert_eq!(s.max_poll_attempts, Some(12));
    }

    #[test]
    fn env_beats_store() {
        let store = Config::open(":memory:").unwrap();
        store.set(CHARACTER_URL, "http://stored").unwrap();
        let env = HashMap::from([(CHARACTER_URL_ENV, "http://env")]);

        let s = Settings::resolve(Some(&store), &Overrides::default(), |k| {
            env.get(k).map(|v| v.to_string())
        })
        .unwrap();
        assert_eq!(s.character_url.as_str(), "http://env/");
    }

    #[test]
    fn flag_beats_env() {
        let env = HashMap::from([(STORY_URL_ENV, "http://env")]);
        let overrides = Overrides {
            story_url: Some("http://flag".to_string()),
            ..Overrides::default()
        };
        let s = Settings::resolve(None, &overrides, |k| env.get(k).map(|v| v.to_string())).unwrap();
        assert_eq!(s.story_url.as_str(), "http://flag/");
    }

    #[test]
    fn blank_env_is_ignored() {
        let s = Settings::resolve(None, &Overrides::default(), |_| Some("  ".to_string())).unwrap();
        assert_eq!(s.story_url, Settings::default().story_url);
    }

    #[test]
    fn zero_attempts_means_unbounded() {
        let overrides = Overrides {
            max_poll_attempts: Some(0),
            ..Overrides::default()
        };
        let s = Settings::resolve(None, &overrides, no_env).unwrap();
        assert!(s.max_poll_attempts.is_none());
    }

    #[test]
    fn zero_interval_rejected() {
        let overrides = Overrides {
            poll_interval_secs: Some(0),
            ..Overrides::default()
        };
        assert!(Settings::resolve(None, &overrides, no_env).is_err());
    }

    #[test]
    fn invalid_flag_url_rejected() {
        let overrides = Overrides {
            story_url: Some("::nope".to_string()),
            ..Overrides::default()
        };
        assert!(Settings::resolve(None, &overrides, no_env).is_err());
    }

    #[test]
    fn poll_config_carries_interval_and_bound() {
        let s = Settings {
            poll_interval: Duration::from_secs(3),
            max_poll_attempts: Some(4),
            ..Settings::default()
        };
        let pc = s.poll_config();
        assert_eq!(pc.interval, Duration::from_secs(3));
        assert_eq!(pc.max_attempts, Some(4));
    }

    #[test]
    fn validate_known_keys() {
        assert!(validate(STORY_URL, "https://example.com").is_ok());
        assert!(validate(SUBMIT_TIMEOUT_SECS, "abc").is_err());
        assert!(validate(MAX_POLL_ATTEMPTS, "0").is_ok());
        assert!(validate("nope", "1").is_err());
    }

    #[test]
    fn keys_are_known() {
        for (key, desc) in KEYS {
            assert!(is_known_key(key));
            assert!(!desc.is_empty());
        }
        assert!(!is_known_key("theme"));
    }
}
