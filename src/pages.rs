// src/pages.rs
//! Server-rendered HTML. Everything from feeds goes through `html_escape`.

use html_escape::{encode_double_quoted_attribute, encode_text};
use std::fmt::Write as _;

use crate::ingest::config::QuickLink;
use crate::ingest::types::CanonicalItem;
use crate::snapshot::Snapshot;

/// How often the page re-pulls `/items.json`.
pub const AUTO_REFRESH_MS: u64 = 5 * 60 * 1000;

/// Only http(s) and site-relative links become hrefs; anything else is neutered.
pub fn safe_href(url: &str) -> &str {
    let u = url.trim();
    let lower = u.to_ascii_lowercase();
    if lower.starts_with("https://") || lower.starts_with("http://") || u.starts_with('/') {
        u
    } else {
        "#"
    }
}

const STYLE: &str = r#"
body{font-family:system-ui,-apple-system,Segoe UI,Roboto,sans-serif;margin:0;background:#111;color:#eee}
header{background:#73000a;padding:1rem 1.25rem}
header h1{margin:0 0 .5rem;font-size:1.4rem}
.links{display:flex;flex-wrap:wrap;gap:.4rem}
.links a{background:#fff;color:#73000a;text-decoration:none;padding:.3rem .6rem;border-radius:4px;font-size:.85rem}
main{max-width:900px;margin:0 auto;padding:1rem}
#q{width:100%;padding:.5rem;font-size:1rem;margin-bottom:.75rem;box-sizing:border-box}
.meta{color:#aaa;font-size:.8rem}
.item{border-bottom:1px solid #333;padding:.75rem 0}
.item a{color:#fff;font-weight:600;text-decoration:none}
.item p{margin:.35rem 0 0;color:#ccc}
.empty{color:#aaa}
"#;

fn write_item(out: &mut String, it: &CanonicalItem) {
    let _ = write!(
        out,
        r#"<article class="item"><a href="{href}" target="_blank" rel="noopener">{title}</a><div class="meta">{source} · {published}</div><p>{summary}</p></article>"#,
        href = encode_double_quoted_attribute(safe_href(&it.link)),
        title = encode_text(if it.title.is_empty() { &it.link } else { &it.title }),
        source = encode_text(&it.source),
        published = encode_text(&it.published),
        summary = encode_text(&it.summary),
    );
}

/// Client side: search box filtering + periodic refresh from `/items.json`.
fn script() -> String {
    format!(
        r#"<script>
(function(){{
  var list=document.getElementById('items'),q=document.getElementById('q'),upd=document.getElementById('updated');
  function esc(s){{return String(s==null?'':s).replace(/[&<>"']/g,function(c){{return {{'&':'&amp;','<':'&lt;','>':'&gt;','"':'&quot;',"'":'&#39;'}}[c];}});}}
  function href(u){{u=String(u||'').trim();var l=u.toLowerCase();return (l.indexOf('https://')===0||l.indexOf('http://')===0||u.charAt(0)==='/')?u:'#';}}
  function filter(){{
    var needle=q.value.trim().toLowerCase();
    Array.prototype.forEach.call(list.children,function(el){{
      el.style.display=(!needle||el.textContent.toLowerCase().indexOf(needle)!==-1)?'':'none';
    }});
  }}
  function render(data){{
    var items=(data&&data.items)||[];
    upd.textContent=data&&data.updated?data.updated:'never';
    if(!items.length){{list.innerHTML='<p class="empty">No stories yet.</p>';return;}}
    list.innerHTML=items.map(function(it){{
      return '<article class="item"><a href="'+esc(href(it.link))+'" target="_blank" rel="noopener">'+esc(it.title||it.link)+'</a>'+
        '<div class="meta">'+esc(it.source)+' · '+esc(it.published)+'</div><p>'+esc(it.summary)+'</p></article>';
    }}).join('');
    filter();
  }}
  q.addEventListener('input',filter);
  setInterval(function(){{
    fetch('/items.json',{{cache:'no-store'}}).then(function(r){{return r.json();}}).then(render).catch(function(){{}});
  }},{AUTO_REFRESH_MS});
}})();
</script>"#
    )
}

pub fn render_index(title: &str, links: &[QuickLink], snapshot: &Snapshot) -> String {
    let mut out = String::with_capacity(16 * 1024);
    let _ = write!(
        out,
        r#"<!doctype html><html lang="en"><head><meta charset="utf-8"><meta name="viewport" content="width=device-width,initial-scale=1"><title>{t}</title><style>{STYLE}</style></head><body><header><h1>{t}</h1><nav class="links">"#,
        t = encode_text(title),
    );
    for l in links {
        let _ = write!(
            out,
            r#"<a href="{}">{}</a>"#,
            encode_double_quoted_attribute(safe_href(&l.url)),
            encode_text(&l.label)
        );
    }
    let _ = write!(
        out,
        r#"</nav></header><main><div class="meta">Updated: <span id="updated">{}</span></div><input id="q" type="search" placeholder="Search stories…" autocomplete="off"><section id="items">"#,
        encode_text(snapshot.updated.as_deref().unwrap_or("never"))
    );
    if snapshot.items.is_empty() {
        out.push_str(r#"<p class="empty">No stories yet.</p>"#);
    }
    for it in &snapshot.items {
        write_item(&mut out, it);
    }
    out.push_str("</section></main>");
    out.push_str(&script());
    out.push_str("</body></html>");
    out
}

pub fn render_fight_song(title: &str) -> String {
    format!(
        r#"<!doctype html><html lang="en"><head><meta charset="utf-8"><meta name="viewport" content="width=device-width,initial-scale=1"><title>{t}</title><style>{STYLE}</style></head><body><header><h1>{t}</h1><nav class="links"><a href="/">Back to feed</a></nav></header><main><audio id="song" controls preload="auto" src="/static/fight-song.mp3">Your browser does not support audio playback.</audio><p><button type="button" onclick="document.getElementById('song').play()">Play</button></p></main></body></html>"#,
        t = encode_text(title),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(title: &str, link: &str) -> CanonicalItem {
        CanonicalItem {
            source: "GABA".into(),
            source_url: String::new(),
            title: title.into(),
            link: link.into(),
            summary: "<script>alert(1)</script>".into(),
            published: "Mon, 01 Sep 2025 12:00:00 GMT".into(),
            published_ts: None,
        }
    }

    #[test]
    fn safe_href_filters_schemes() {
        assert_eq!(safe_href("https://a.example/x"), "https://a.example/x");
        assert_eq!(safe_href("/fight-song"), "/fight-song");
        assert_eq!(safe_href("javascript:alert(1)"), "#");
        assert_eq!(safe_href(""), "#");
    }

    #[test]
    fn index_escapes_feed_text() {
        let snap = Snapshot {
            updated: Some("2025-09-01 12:00:00 UTC".into()),
            items: vec![item("Gamecocks & <Tigers>", "javascript:void(0)")],
        };
        let html = render_index("Feed", &[], &snap);
        assert!(html.contains("Gamecocks &amp; &lt;Tigers&gt;"));
        assert!(!html.contains("<script>alert(1)</script>"));
        assert!(html.contains(r##"href="#""##));
        assert!(html.contains("2025-09-01 12:00:00 UTC"));
    }

    #[test]
    fn empty_snapshot_says_so() {
        let html = render_index("Feed", &[], &Snapshot::default());
        assert!(html.contains("No stories yet."));
        assert!(html.contains(">never<"));
    }

    #[test]
    fn fight_song_points_at_static_audio() {
        let html = render_fight_song("Fight Song");
        assert!(html.contains(r#"src="/static/fight-song.mp3""#));
    }
}
