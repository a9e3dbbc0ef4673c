// src/ingest/config.rs
//! Feed list + quick links. Loaded once at startup.
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::ingest::types::FeedSource;

const ENV_PATH: &str = "FEEDS_CONFIG_PATH";

/// Button shown at the top of the page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuickLink {
    pub label: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedsConfig {
    pub feeds: Vec<FeedSource>,
    pub links: Vec<QuickLink>,
}

// File shape: every field optional so one bad entry doesn't sink the file.
#[derive(Debug, Default, Deserialize)]
struct FeedsFile {
    #[serde(default)]
    feeds: Vec<FeedEntry>,
    #[serde(default)]
    links: Option<Vec<LinkEntry>>,
}

#[derive(Debug, Deserialize)]
struct FeedEntry {
    name: Option<String>,
    url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct LinkEntry {
    label: Option<String>,
    url: Option<String>,
}

/// Load from an explicit path. Supports TOML or JSON formats.
pub fn load_feeds_from(path: &Path) -> Result<FeedsConfig> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("reading feeds from {}", path.display()))?;
    let ext = path
        .extension()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase();
    parse_feeds(&content, ext.as_str())
}

/// Load using env var + fallbacks:
/// 1) $FEEDS_CONFIG_PATH
/// 2) config/feeds.toml
/// 3) config/feeds.json
/// 4) built-in seed
pub fn load_feeds_default() -> Result<FeedsConfig> {
    if let Ok(p) = std::env::var(ENV_PATH) {
        let pb = PathBuf::from(p);
        if pb.exists() {
            return load_feeds_from(&pb);
        } else {
            return Err(anyhow!("FEEDS_CONFIG_PATH points to non-existent path"));
        }
    }
    let toml_p = PathBuf::from("config/feeds.toml");
    if toml_p.exists() {
        return load_feeds_from(&toml_p);
    }
    let json_p = PathBuf::from("config/feeds.json");
    if json_p.exists() {
        return load_feeds_from(&json_p);
    }
    Ok(FeedsConfig::default_seed())
}

fn parse_feeds(s: &str, hint_ext: &str) -> Result<FeedsConfig> {
    let file: FeedsFile = if hint_ext == "json" {
        serde_json::from_str(s).context("parsing feeds json")?
    } else {
        toml::from_str(s).context("parsing feeds toml")?
    };
    Ok(clean(file))
}

fn clean(file: FeedsFile) -> FeedsConfig {
    let feeds = file
        .feeds
        .into_iter()
        .filter_map(|f| {
            let url = f.url.map(|u| u.trim().to_string()).unwrap_or_default();
            if url.is_empty() {
                return None;
            }
            let name = f
                .name
                .map(|n| n.trim().to_string())
                .filter(|n| !n.is_empty())
                .unwrap_or_else(|| "Unknown".to_string());
            Some(FeedSource { name, url })
        })
        .collect();

    // Omitting `links` keeps the stock buttons; an explicit empty list removes them.
    let links = match file.links {
        None => FeedsConfig::default_seed().links,
        Some(v) => v
            .into_iter()
            .filter_map(|l| {
                let label = l.label?.trim().to_string();
                let url = l.url?.trim().to_string();
                (!label.is_empty() && !url.is_empty()).then_some(QuickLink { label, url })
            })
            .collect(),
    };

    FeedsConfig { feeds, links }
}

impl FeedsConfig {
    /// Built-in sources: Google News queries, the SB Nation blog, the local paper,
    /// and ESPN's national feed (filtered by the relevance gate).
    pub fn default_seed() -> Self {
        let feeds = [
            (
                "Google News — Gamecocks Football",
                "https://news.google.com/rss/search?q=%22South+Carolina%22+Gamecocks+football&hl=en-US&gl=US&ceid=US:en",
            ),
            (
                "Google News — South Carolina Football",
                "https://news.google.com/rss/search?q=%22South+Carolina%22+football&hl=en-US&gl=US&ceid=US:en",
            ),
            (
                "Google News — Gamecocks",
                "https://news.google.com/rss/search?q=Gamecocks+football&hl=en-US&gl=US&ceid=US:en",
            ),
            (
                "Google News — Shane Beamer",
                "https://news.google.com/rss/search?q=%22Shane+Beamer%22&hl=en-US&gl=US&ceid=US:en",
            ),
            (
                "Garnet & Black Attack",
                "https://www.garnetandblackattack.com/rss/index.xml",
            ),
            (
                "The State — USC Football",
                "https://www.thestate.com/sports/college/university-of-south-carolina/usc-football/?outputType=amp&type=rss",
            ),
            ("ESPN — CFB News", "https://www.espn.com/espn/rss/ncf/news"),
        ]
        .into_iter()
        .map(|(n, u)| FeedSource::new(n, u))
        .collect();

        let links = [
            ("Fight Song", "/fight-song"),
            ("Betting", "https://www.espn.com/chalk/"),
            ("South Carolina — Official", "https://gamecocksonline.com/sports/football/"),
            ("Schedule", "https://gamecocksonline.com/sports/football/schedule/"),
            ("Roster", "https://gamecocksonline.com/sports/football/roster/"),
            (
                "ESPN",
                "https://www.espn.com/college-football/team/_/id/2579/south-carolina-gamecocks",
            ),
            (
                "CBS Sports",
                "https://www.cbssports.com/college-football/teams/SC/south-carolina-gamecocks/",
            ),
            ("Yahoo Sports", "https://sports.yahoo.com/ncaaf/teams/south-carolina/"),
            ("247Sports", "https://247sports.com/college/south-carolina/"),
            ("GamecockCentral", "https://www.on3.com/teams/south-carolina-gamecocks/"),
            ("Garnet & Black Attack", "https://www.garnetandblackattack.com/"),
            (
                "The State (Columbia)",
                "https://www.thestate.com/sports/college/university-of-south-carolina/usc-football/",
            ),
            ("Reddit — r/Gamecocks", "https://www.reddit.com/r/Gamecocks/"),
            ("YouTube — GamecockCentral", "https://www.youtube.com/@GamecockCentral"),
            ("YouTube — 247Sports", "https://www.youtube.com/@247Sports"),
            ("YouTube — ESPN CFB", "https://www.youtube.com/@ESPNCFB"),
        ]
        .into_iter()
        .map(|(label, url)| QuickLink {
            label: label.to_string(),
            url: url.to_string(),
        })
        .collect();

        Self { feeds, links }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{env, fs};

    #[test]
    fn seed_has_feeds_and_links() {
        let c = FeedsConfig::default_seed();
        assert_eq!(c.feeds.len(), 7);
        assert_eq!(c.links.len(), 16);
        assert_eq!(c.links[0].url, "/fight-song");
    }

    #[test]
    fn clean_drops_empty_urls_and_defaults_names() {
        let toml = r#"
links = []

[[feeds]]
url = " https://a.example/rss "

[[feeds]]
name = "No URL"

[[feeds]]
name = "  "
url = "https://b.example/rss"
"#;
        let c = parse_feeds(toml, "toml").unwrap();
        assert_eq!(
            c.feeds,
            vec![
                FeedSource::new("Unknown", "https://a.example/rss"),
                FeedSource::new("Unknown", "https://b.example/rss"),
            ]
        );
        assert!(c.links.is_empty());
    }

    #[test]
    fn json_format_and_default_links() {
        let json = r#"{"feeds":[{"name":"GABA","url":"https://gaba.example/rss"}]}"#;
        let c = parse_feeds(json, "json").unwrap();
        assert_eq!(c.feeds.len(), 1);
        assert_eq!(c.links.len(), 16);
    }

    #[serial_test::serial]
    #[test]
    fn default_uses_env_then_fallbacks() {
        let old = env::current_dir().unwrap();
        let tmp = tempfile::tempdir().unwrap();
        env::set_current_dir(tmp.path()).unwrap();

        env::remove_var(ENV_PATH);

        // Nothing on disk -> seed
        let v = load_feeds_default().unwrap();
        assert_eq!(v, FeedsConfig::default_seed());

        // Env wins
        let p_json = tmp.path().join("feeds.json");
        fs::write(&p_json, r#"{"feeds":[{"name":"X","url":"https://x.example"}]}"#).unwrap();
        env::set_var(ENV_PATH, p_json.display().to_string());
        let v2 = load_feeds_default().unwrap();
        assert_eq!(v2.feeds, vec![FeedSource::new("X", "https://x.example")]);
        env::remove_var(ENV_PATH);

        env::set_current_dir(&old).unwrap();
    }
}
