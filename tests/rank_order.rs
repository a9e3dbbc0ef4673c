// tests/rank_order.rs
// Ordering and truncation of the ranker over seeded random input.

use gamecock_feed::ingest::types::CanonicalItem;
use gamecock_feed::ingest::{rank, MAX_ITEMS};
use rand::{rngs::StdRng, seq::SliceRandom, Rng, SeedableRng};

fn it(n: usize, ts: Option<i64>, published: &str) -> CanonicalItem {
    CanonicalItem {
        source: "S".into(),
        source_url: String::new(),
        title: format!("item {n}"),
        link: format!("https://x.example/{n}"),
        summary: String::new(),
        published: published.into(),
        published_ts: ts,
    }
}

#[test]
fn distinct_timestamps_sort_descending() {
    let mut rng = StdRng::seed_from_u64(7);
    let mut stamps: Vec<i64> = (0..120).map(|i| 1_750_000_000 + i * 3_600).collect();
    stamps.shuffle(&mut rng);
    let input: Vec<_> = stamps
        .iter()
        .enumerate()
        .map(|(n, &ts)| it(n, Some(ts), ""))
        .collect();

    let out = rank(input);
    assert_eq!(out.len(), 120);
    for w in out.windows(2) {
        assert!(w[0].published_ts > w[1].published_ts);
    }
}

#[test]
fn ties_and_missing_keep_input_order() {
    let input = vec![
        it(0, None, ""),
        it(1, Some(100), ""),
        it(2, None, ""),
        it(3, Some(100), ""),
        it(4, Some(200), ""),
    ];
    let out = rank(input);
    let titles: Vec<_> = out.iter().map(|i| i.title.as_str()).collect();
    assert_eq!(
        titles,
        vec!["item 4", "item 1", "item 3", "item 0", "item 2"]
    );
}

#[test]
fn unparsed_dates_are_not_compared_as_text() {
    // Both sit at the epoch, so input order stands even though "Tue" > "Mon".
    let out = rank(vec![it(0, None, "Mon"), it(1, None, "Tue"), it(2, Some(1), "x")]);
    let published: Vec<_> = out.iter().map(|i| i.published.as_str()).collect();
    assert_eq!(published, vec!["x", "Mon", "Tue"]);
}

#[test]
fn output_never_exceeds_cap() {
    let mut rng = StdRng::seed_from_u64(42);
    for size in [0usize, 1, MAX_ITEMS - 1, MAX_ITEMS, MAX_ITEMS + 1, 1_000] {
        let input: Vec<_> = (0..size)
            .map(|n| {
                let ts = rng.random_bool(0.8).then(|| rng.random_range(0..2_000_000_000i64));
                it(n, ts, "")
            })
            .collect();
        let out = rank(input);
        assert_eq!(out.len(), size.min(MAX_ITEMS), "size {size}");
    }
}

#[test]
fn truncation_keeps_the_newest() {
    let input: Vec<_> = (0..MAX_ITEMS + 10)
        .map(|n| it(n, Some(n as i64), ""))
        .collect();
    let out = rank(input);
    assert_eq!(out.len(), MAX_ITEMS);
    assert_eq!(out[0].published_ts, Some((MAX_ITEMS + 9) as i64));
    assert_eq!(out.last().unwrap().published_ts, Some(10));
}
