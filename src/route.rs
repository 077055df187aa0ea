//! Screens addressed by path and query string.
//!
//! State travels between screens in query parameters: the characters screen
//! gets the story, the chat screen gets the character's name, avatar, and
//! the story. Routes render to a path and parse back, so they can also be
//! passed on the command line as deep links.

use std::fmt;
use std::str::FromStr;

use anyhow::{Context, Result, bail};
use url::Url;
use url::form_urlencoded;

/// Base for resolving relative routes. Absolute URLs replace it.
const ROUTE_BASE: &str = "taleforge://app/";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Home,
    Characters {
        story: String,
    },
    Chat {
        name: String,
        image_src: String,
        story: String,
    },
}

impl Route {
    /// Render as `/path?key=value`, percent-encoding every value.
    pub fn to_path(&self) -> String {
        match self {
            Route::Home => "/".to_string(),
            Route::Characters { story } => {
                format!("/characters?{}", encode(&[("story", story)]))
            }
            Route::Chat {
                name,
                image_src,
                story,
            } => format!(
                "/chat?{}",
                encode(&[("name", name), ("imageSrc", image_src), ("story", story)])
            ),
        }
    }

    /// Parse a route from a path like `/chat?name=...` or a full URL.
    pub fn parse(input: &str) -> Result<Self> {
        let base = Url::parse(ROUTE_BASE).context("invalid route base")?;
        let url = base
            .join(input.trim())
            .with_context(|| format!("invalid route: {input}"))?;

        let param = |key: &str| {
            url.query_pairs()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.into_owned())
        };

        match url.path().trim_end_matches('/') {
            "" => Ok(Route::Home),
            "/characters" => {
                let story = param("story").context("characters route needs a story")?;
                Ok(Route::Characters { story })
            }
            "/chat" => {
                let required = |key: &str| -> Result<String> {
                    match param(key) {
                        Some(value) if !value.is_empty() => Ok(value),
                        _ => bail!("chat route needs a non-empty {key}"),
                    }
                };
                Ok(Route::Chat {
                    name: required("name")?,
                    image_src: required("imageSrc")?,
                    story: required("story")?,
                })
            }
            other => bail!("unknown route: {other}"),
        }
    }

    /// Short label for prompts and status lines.
    pub fn screen(&self) -> &'static str {
        match self {
            Route::Home => "home",
            Route::Characters { .. } => "characters",
            Route::Chat { .. } => "chat",
        }
    }
}

fn encode(pairs: &[(&str, &String)]) -> String {
    let mut serializer = form_urlencoded::Serializer::new(String::new());
    for (key, value) in pairs {
        serializer.append_pair(key, value);
    }
    serializer.finish()
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_path())
    }
}

impl FromStr for Route {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chat() -> Route {
        Route::Chat {
            name: "Sir Lancelot".to_string(),
            image_src: "https://characterai.io/a.webp?webp=true&anim=0".to_string(),
            story: "A knight & his quest, 100% true".to_string(),
        }
    }

    #[test]
    fn home_path() {
        assert_eq!(Route::Home.to_path(), "/");
        assert_eq!(Route::parse("/").unwrap(), Route::Home);
        assert_eq!(Route::parse("").unwrap(), Route::Home);
    }

    #[test]
    fn chat_values_are_encoded() {
        let path = chat().to_path();
        assert!(path.starts_with("/chat?name=Sir+Lancelot&imageSrc="));
        assert!(!path.contains("webp=true&anim"));
        assert_eq!(Route::parse(&path).unwrap(), chat());
    }

    #[test]
    fn characters_parses_percent_twenty() {
        let route = Route::parse("/characters?story=dragon%20tale").unwrap();
        assert_eq!(
            route,
            Route::Characters {
                story: "dragon tale".to_string()
            }
        );
    }

    #[test]
    fn characters_with_empty_story() {
        assert_eq!(
            Route::parse("/characters?story=").unwrap(),
            Route::Characters {
                story: String::new()
            }
        );
    }

    #[test]
    fn characters_without_story_fails() {
        assert!(Route::parse("/characters").is_err());
    }

    #[test]
    fn chat_missing_param_fails() {
        assert!(Route::parse("/chat?name=Alice&story=s").is_err());
        assert!(Route::parse("/chat?name=&imageSrc=x&story=s").is_err());
    }

    #[test]
    fn full_url_accepted() {
        let route = Route::parse("http://localhost:3000/chat?name=Bob&imageSrc=x&story=s").unwrap();
        assert_eq!(route.screen(), "chat");
    }

    #[test]
    fn trailing_slash_ignored() {
        assert_eq!(
            Route::parse("/characters/?story=x").unwrap().screen(),
            "characters"
        );
    }

    #[test]
    fn unknown_route_fails() {
        assert!(Route::parse("/settings").is_err());
    }

    #[test]
    fn from_str_and_display() {
        let route: Route = "/characters?story=x".parse().unwrap();
        assert_eq!(route.to_string(), "/characters?story=x");
    }
}
