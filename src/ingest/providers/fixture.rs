// src/ingest/providers/fixture.rs
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use std::collections::HashMap;

use crate::ingest::parse::parse_feed;
use crate::ingest::types::{FeedProvider, FeedSource, RawEntry};

/// Serves feed bodies from memory, keyed by source URL. A URL with no body
/// behaves like an unreachable source.
#[derive(Debug, Clone, Default)]
pub struct FixtureProvider {
    bodies: HashMap<String, String>,
}

impl FixtureProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, url: impl Into<String>, xml: impl Into<String>) -> Self {
        self.bodies.insert(url.into(), xml.into());
        self
    }
}

#[async_trait]
impl FeedProvider for FixtureProvider {
    async fn fetch(&self, source: &FeedSource) -> Result<Vec<RawEntry>> {
        let body = self
            .bodies
            .get(&source.url)
            .ok_or_else(|| anyhow!("no fixture for {}", source.url))?;
        parse_feed(body).with_context(|| format!("parsing fixture {}", source.name))
    }

    fn name(&self) -> &'static str {
        "fixture"
    }
}
