// src/ingest/mod.rs
//! Pipeline stages that need no network: normalize, dedupe, rank.
pub mod config;
pub mod parse;
pub mod providers;
pub mod scheduler;
pub mod types;

use crate::ingest::types::{CanonicalItem, FeedSource, RawEntry};
use once_cell::sync::OnceCell;
use regex::Regex;
use std::collections::HashSet;
use time::format_description::well_known::{Rfc2822, Rfc3339};
use time::OffsetDateTime;

/// Summary length cap, in characters, applied after markup is stripped.
pub const SUMMARY_MAX_CHARS: usize = 400;
/// Upper bound on items in a published snapshot.
pub const MAX_ITEMS: usize = 250;

/// Remove `<...>` tags (non-greedy, single line) without interpreting them.
pub fn strip_markup(s: &str) -> String {
    static RE_TAGS: OnceCell<Regex> = OnceCell::new();
    let re_tags = RE_TAGS.get_or_init(|| Regex::new(r"<.*?>").expect("tag regex"));
    re_tags.replace_all(s, "").into_owned()
}

/// First `max` characters of `s` (chars, not bytes).
pub fn truncate_chars(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((idx, _)) => s[..idx].to_string(),
        None => s.to_string(),
    }
}

/// Unix seconds for RFC 2822 (`Mon, 01 Sep 2025 14:00:00 GMT`) or RFC 3339 stamps.
pub fn parse_timestamp(s: &str) -> Option<i64> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    OffsetDateTime::parse(s, &Rfc2822)
        .or_else(|_| OffsetDateTime::parse(s, &Rfc3339))
        .map(|dt| dt.unix_timestamp())
        .ok()
        // chrono is more lenient with obsolete zone names ("EST", "PDT").
        .or_else(|| {
            chrono::DateTime::parse_from_rfc2822(s)
                .ok()
                .map(|dt| dt.timestamp())
        })
}

fn first_present(a: Option<String>, b: Option<String>) -> Option<String> {
    a.filter(|s| !s.is_empty()).or(b.filter(|s| !s.is_empty()))
}

/// Map a raw entry of `source` to a canonical item. Never fails; missing fields become "".
pub fn normalize_entry(source: &FeedSource, entry: RawEntry) -> CanonicalItem {
    let title = entry.title.unwrap_or_default().trim().to_string();
    let link = first_present(entry.link, entry.id)
        .unwrap_or_default()
        .trim()
        .to_string();
    let summary_raw = first_present(entry.summary, entry.description).unwrap_or_default();
    let summary = truncate_chars(&strip_markup(summary_raw.trim()), SUMMARY_MAX_CHARS);
    let published = first_present(entry.published, entry.updated)
        .unwrap_or_default()
        .trim()
        .to_string();
    let published_ts = parse_timestamp(&published);

    CanonicalItem {
        source: source.name.clone(),
        source_url: source.url.clone(),
        title,
        link,
        summary,
        published,
        published_ts,
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum IdentityKey {
    Link(String),
    TitleSource(String, String),
}

fn identity(item: &CanonicalItem) -> IdentityKey {
    if item.link.is_empty() {
        IdentityKey::TitleSource(item.title.clone(), item.source.clone())
    } else {
        IdentityKey::Link(item.link.clone())
    }
}

/// Drop later duplicates (same link, or same title+source when link is empty).
pub fn dedupe(items: Vec<CanonicalItem>) -> Vec<CanonicalItem> {
    let mut seen: HashSet<IdentityKey> = HashSet::with_capacity(items.len());
    let mut keep = Vec::with_capacity(items.len());
    for it in items {
        if seen.insert(identity(&it)) {
            keep.push(it);
        }
    }
    keep
}

/// Newest first by parsed timestamp; unparsed dates count as the epoch. Equal
/// timestamps keep input order. Truncates to `MAX_ITEMS`.
pub fn rank(mut items: Vec<CanonicalItem>) -> Vec<CanonicalItem> {
    // `sort_by_key` is stable.
    items.sort_by_key(|it| std::cmp::Reverse(it.published_ts.unwrap_or(0)));
    items.truncate(MAX_ITEMS);
    items
}
