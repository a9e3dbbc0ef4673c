// src/ingest/parse.rs
//! RSS 2.0 / RSS 1.0 (RDF) / Atom documents into `RawEntry` lists.

use anyhow::{anyhow, Context, Result};
use once_cell::sync::OnceCell;
use quick_xml::de::from_str;
use quick_xml::events::Event;
use quick_xml::Reader;
use regex::{Captures, Regex};
use serde::Deserialize;

use crate::ingest::types::RawEntry;

/// Element text that may carry attributes (`<guid isPermaLink="false">`, `<title type="html">`).
#[derive(Debug, Default, Deserialize)]
struct TextNode {
    #[serde(rename = "$text", default)]
    text: Option<String>,
}

impl TextNode {
    fn into_text(self) -> Option<String> {
        self.text
    }
}

fn text_of(node: Option<TextNode>) -> Option<String> {
    node.and_then(TextNode::into_text)
}

/* ---- RSS 2.0 ---- */

#[derive(Debug, Deserialize)]
struct Rss {
    channel: Channel,
}

#[derive(Debug, Deserialize)]
struct Channel {
    #[serde(rename = "item", default)]
    item: Vec<RssItem>,
}

#[derive(Debug, Deserialize)]
struct RssItem {
    title: Option<TextNode>,
    link: Option<TextNode>,
    guid: Option<TextNode>,
    description: Option<TextNode>,
    #[serde(rename = "pubDate")]
    pub_date: Option<TextNode>,
}

impl From<RssItem> for RawEntry {
    fn from(it: RssItem) -> Self {
        RawEntry {
            title: text_of(it.title),
            link: text_of(it.link),
            id: text_of(it.guid),
            summary: None,
            description: text_of(it.description),
            published: text_of(it.pub_date),
            updated: None,
        }
    }
}

/* ---- RSS 1.0 (RDF): items are siblings of the channel ---- */

#[derive(Debug, Deserialize)]
struct Rdf {
    #[serde(rename = "item", default)]
    item: Vec<RssItem>,
}

/* ---- Atom ---- */

#[derive(Debug, Deserialize)]
struct AtomFeed {
    #[serde(rename = "entry", default)]
    entry: Vec<AtomEntry>,
}

#[derive(Debug, Deserialize)]
struct AtomLink {
    #[serde(rename = "@href")]
    href: Option<String>,
    #[serde(rename = "@rel")]
    rel: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AtomEntry {
    title: Option<TextNode>,
    #[serde(rename = "link", default)]
    link: Vec<AtomLink>,
    id: Option<TextNode>,
    summary: Option<TextNode>,
    content: Option<TextNode>,
    published: Option<TextNode>,
    updated: Option<TextNode>,
}

impl From<AtomEntry> for RawEntry {
    fn from(it: AtomEntry) -> Self {
        // rel="alternate" (or no rel) is the article; prefer it over self/edit/enclosure.
        let link = it
            .link
            .iter()
            .find(|l| matches!(l.rel.as_deref(), None | Some("alternate")))
            .or_else(|| it.link.first())
            .and_then(|l| l.href.clone());
        RawEntry {
            title: text_of(it.title),
            link,
            id: text_of(it.id),
            summary: text_of(it.summary),
            description: text_of(it.content),
            published: text_of(it.published),
            updated: text_of(it.updated),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Dialect {
    Rss,
    Rdf,
    Atom,
}

/// Local name of the document element decides the dialect.
fn sniff_dialect(xml: &str) -> Result<Dialect> {
    let mut reader = Reader::from_str(xml);
    loop {
        match reader.read_event().context("reading feed root")? {
            Event::Start(e) | Event::Empty(e) => {
                let name = e.local_name();
                return match name.as_ref() {
                    b"rss" => Ok(Dialect::Rss),
                    b"RDF" => Ok(Dialect::Rdf),
                    b"feed" => Ok(Dialect::Atom),
                    other => Err(anyhow!(
                        "unsupported feed root <{}>",
                        String::from_utf8_lossy(other)
                    )),
                };
            }
            Event::Eof => return Err(anyhow!("empty feed document")),
            _ => {}
        }
    }
}

const XML_ENTITIES: [&str; 5] = ["amp", "lt", "gt", "quot", "apos"];

/// HTML entities feeds like to use that XML does not define. Punctuation folds
/// to ASCII; any other named entity is decoded, and one nobody knows stays as text.
fn scrub_html_entities_for_xml(s: &str) -> String {
    static RE_NAMED: OnceCell<Regex> = OnceCell::new();
    let re_named = RE_NAMED
        .get_or_init(|| Regex::new(r"&([A-Za-z][A-Za-z0-9]*);").expect("entity regex"));

    let s = s
        .replace("&nbsp;", " ")
        .replace("&ndash;", "-")
        .replace("&mdash;", "-")
        .replace("&ldquo;", "\"")
        .replace("&rdquo;", "\"")
        .replace("&lsquo;", "'")
        .replace("&rsquo;", "'")
        .replace("&hellip;", "...");

    re_named
        .replace_all(&s, |caps: &Captures| {
            let whole = &caps[0];
            if XML_ENTITIES.contains(&&caps[1]) {
                return whole.to_string();
            }
            // Unknown names come back unchanged and get their `&` escaped here.
            let decoded = html_escape::decode_html_entities(whole);
            html_escape::encode_text(&decoded).into_owned()
        })
        .into_owned()
}

/// Parse a feed body into entries, in document order.
pub fn parse_feed(xml: &str) -> Result<Vec<RawEntry>> {
    let xml = scrub_html_entities_for_xml(xml);
    let entries = match sniff_dialect(&xml)? {
        Dialect::Rss => {
            let rss: Rss = from_str(&xml).context("parsing rss xml")?;
            rss.channel.item.into_iter().map(RawEntry::from).collect()
        }
        Dialect::Rdf => {
            let rdf: Rdf = from_str(&xml).context("parsing rdf xml")?;
            rdf.item.into_iter().map(RawEntry::from).collect()
        }
        Dialect::Atom => {
            let feed: AtomFeed = from_str(&xml).context("parsing atom xml")?;
            feed.entry.into_iter().map(RawEntry::from).collect()
        }
    };
    Ok(entries)
}
