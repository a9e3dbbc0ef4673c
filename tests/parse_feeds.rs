// tests/parse_feeds.rs
use gamecock_feed::ingest::normalize_entry;
use gamecock_feed::ingest::parse::parse_feed;
use gamecock_feed::ingest::types::FeedSource;

const GABA_ATOM: &str = include_str!("fixtures/gaba_atom.xml");
const NATIONAL_RSS: &str = include_str!("fixtures/national_rss.xml");
const RDF: &str = include_str!("fixtures/rdf.xml");

#[test]
fn atom_fixture() {
    let v = parse_feed(GABA_ATOM).expect("atom parses");
    assert_eq!(v.len(), 3);
    assert_eq!(
        v[0].link.as_deref(),
        Some("https://www.garnetandblackattack.com/football/2025/9/3/depth-chart")
    );
    assert_eq!(v[0].published.as_deref(), Some("2025-09-03T14:00:00Z"));
    assert!(v[0]
        .description
        .as_deref()
        .unwrap_or_default()
        .contains("Shane Beamer"));
    // rel="self" listed first, alternate still wins.
    assert_eq!(
        v[2].link.as_deref(),
        Some("https://www.garnetandblackattack.com/2025/9/1/open-thread")
    );
    assert_eq!(v[2].published, None);
}

#[test]
fn rss_fixture_with_html_entities() {
    let v = parse_feed(NATIONAL_RSS).expect("rss parses");
    assert_eq!(v.len(), 4);
    assert_eq!(v[0].link.as_deref(), Some("https://cfb.example.com/sellers-potw"));
    assert_eq!(v[3].link, None);
    assert_eq!(v[3].id.as_deref(), Some("urn:cfb:bowls-week3"));
    let title = v[3].title.as_deref().unwrap_or_default();
    assert!(title.contains("South Carolina climbs"), "{title}");
}

#[test]
fn html_named_entities_do_not_sink_the_feed() {
    let xml = r#"<rss version="2.0"><channel><title>t</title>
<item><title>Gamecocks caf&eacute; &copy; 2025 &trade;</title><link>https://n.example/1</link></item>
<item><title>Gamecocks win</title><link>https://n.example/2</link></item>
</channel></rss>"#;
    let v = parse_feed(xml).expect("entities tolerated");
    assert_eq!(v.len(), 2);
    assert_eq!(v[0].title.as_deref(), Some("Gamecocks café © 2025 ™"));
    assert_eq!(v[1].title.as_deref(), Some("Gamecocks win"));
}

#[test]
fn rdf_fixture() {
    let v = parse_feed(RDF).expect("rdf parses");
    assert_eq!(v.len(), 1);
    assert_eq!(v[0].title.as_deref(), Some("Williams-Brice renovation update"));
    assert_eq!(v[0].link.as_deref(), Some("https://old.example.com/1"));
}

#[test]
fn normalized_fixture_items() {
    let src = FeedSource::new("National", "https://cfb.example.com/rss");
    let items: Vec<_> = parse_feed(NATIONAL_RSS)
        .unwrap()
        .into_iter()
        .map(|e| normalize_entry(&src, e))
        .collect();

    assert_eq!(items[0].summary, "The sophomore accounted for four touchdowns.");
    assert!(items[0].published_ts.is_some());
    // Link falls back to the guid.
    assert_eq!(items[3].link, "urn:cfb:bowls-week3");
    assert_eq!(items[3].published, "not a date");
    assert_eq!(items[3].published_ts, None);
}

#[test]
fn garbage_is_an_error() {
    assert!(parse_feed("").is_err());
    assert!(parse_feed("<html><head><title>Access denied</title></head></html>").is_err());
    assert!(parse_feed("<rss><channel><item><title>unterminated").is_err());
}
