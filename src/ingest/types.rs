// src/ingest/types.rs
use anyhow::Result;
use serde::{Deserialize, Serialize};

/// A configured feed: display name + URL.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FeedSource {
    pub name: String,
    pub url: String,
}

impl FeedSource {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
        }
    }
}

/// One syndication entry as parsed; any field may be missing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawEntry {
    pub title: Option<String>,
    pub link: Option<String>,
    pub id: Option<String>,
    pub summary: Option<String>,
    pub description: Option<String>,
    pub published: Option<String>,
    pub updated: Option<String>,
}

/// The record every pipeline stage works on. Text fields are never null.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CanonicalItem {
    pub source: String,
    pub source_url: String,
    pub title: String,
    pub link: String,
    pub summary: String,
    pub published: String,
    /// Unix seconds derived from `published` when it parses; ranking key only.
    #[serde(skip)]
    pub published_ts: Option<i64>,
}

/// A source that could not be fetched or parsed during a cycle.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SourceFailure {
    pub source: String,
    pub url: String,
    pub error: String,
}

#[async_trait::async_trait]
pub trait FeedProvider: Send + Sync {
    async fn fetch(&self, source: &FeedSource) -> Result<Vec<RawEntry>>;
    fn name(&self) -> &'static str;
}
