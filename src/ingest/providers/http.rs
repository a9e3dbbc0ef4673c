// src/ingest/providers/http.rs
use anyhow::{Context, Result};
use async_trait::async_trait;
use metrics::histogram;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT};
use reqwest::Client;
use std::time::Duration;

use crate::ingest::parse::parse_feed;
use crate::ingest::types::{FeedProvider, FeedSource, RawEntry};

/// Some feeds reject default library user agents.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/124.0 Safari/537.36";
pub const DEFAULT_ACCEPT: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8";
pub const DEFAULT_TIMEOUT_SECS: u64 = 20;

/// Fetches each source over HTTP(S) and parses the body as RSS/Atom.
pub struct HttpFeedProvider {
    client: Client,
}

impl HttpFeedProvider {
    pub fn new(timeout: Duration, user_agent: &str) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static(DEFAULT_ACCEPT));
        let client = Client::builder()
            .user_agent(user_agent)
            .default_headers(headers)
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()
            .context("building feed http client")?;
        Ok(Self { client })
    }

    pub fn with_defaults() -> Result<Self> {
        Self::new(
            Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            DEFAULT_USER_AGENT,
        )
    }
}

#[async_trait]
impl FeedProvider for HttpFeedProvider {
    async fn fetch(&self, source: &FeedSource) -> Result<Vec<RawEntry>> {
        let t0 = std::time::Instant::now();
        let body = self
            .client
            .get(&source.url)
            .send()
            .await
            .with_context(|| format!("GET {}", source.url))?
            .error_for_status()
            .with_context(|| format!("status from {}", source.url))?
            .text()
            .await
            .with_context(|| format!("reading body of {}", source.url))?;

        let ms = t0.elapsed().as_secs_f64() * 1_000.0;
        histogram!("collect_fetch_ms").record(ms);

        parse_feed(&body).with_context(|| format!("parsing feed {}", source.name))
    }

    fn name(&self) -> &'static str {
        "http"
    }
}
