// src/api.rs
use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use serde_json::json;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tracing::{info, warn};

use crate::collect::Collector;
use crate::config::AppConfig;
use crate::ingest::config::QuickLink;
use crate::ingest::types::SourceFailure;
use crate::pages;
use crate::relevance::{Relevance, Tier, Verdict};
use crate::snapshot::PublishOutcome;

pub const COLLECT_TOKEN_HEADER: &str = "x-collect-token";

#[derive(Clone)]
pub struct AppState {
    pub collector: Arc<Collector>,
    pub config: Arc<AppConfig>,
    pub links: Arc<Vec<QuickLink>>,
}

impl AppState {
    pub fn new(collector: Arc<Collector>, config: AppConfig, links: Vec<QuickLink>) -> Self {
        Self {
            collector,
            config: Arc::new(config),
            links: Arc::new(links),
        }
    }
}

/// Full site router. `/metrics` is merged in by the binary once a recorder exists.
pub fn router(state: AppState) -> Router {
    let static_dir = ServeDir::new(&state.config.static_dir);
    Router::new()
        .route("/", get(index))
        .route("/items.json", get(items_json))
        .route("/health", get(health))
        .route("/collect", post(collect))
        .route("/fight-song", get(fight_song))
        .route("/debug/sources", get(debug_sources))
        .route("/debug/classify", get(debug_classify))
        .nest_service("/static", static_dir)
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

async fn index(State(state): State<AppState>) -> Html<String> {
    let cur = state.collector.store().current();
    Html(pages::render_index(
        &state.config.team_title,
        &state.links,
        &cur.snapshot,
    ))
}

async fn items_json(State(state): State<AppState>) -> Response {
    let cur = state.collector.store().current();
    Json(cur.snapshot.clone()).into_response()
}

#[derive(Serialize)]
struct HealthOut {
    ok: bool,
    updated: Option<String>,
    version: u64,
    count: usize,
}

async fn health(State(state): State<AppState>) -> Json<HealthOut> {
    let cur = state.collector.store().current();
    Json(HealthOut {
        ok: true,
        updated: cur.snapshot.updated.clone(),
        version: cur.version,
        count: cur.snapshot.items.len(),
    })
}

#[derive(Serialize)]
struct CollectOut {
    ok: bool,
    published: bool,
    count: usize,
    version: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    retained_reason: Option<&'static str>,
    failures: Vec<SourceFailure>,
}

/// Byte comparison whose time depends only on the lengths.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

fn token_ok(expected: Option<&str>, headers: &HeaderMap) -> bool {
    let Some(expected) = expected else {
        return true;
    };
    headers
        .get(COLLECT_TOKEN_HEADER)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|got| constant_time_eq(got.as_bytes(), expected.as_bytes()))
}

async fn collect(State(state): State<AppState>, headers: HeaderMap) -> Response {
    if !token_ok(state.config.collect_token.as_deref(), &headers) {
        warn!(target: "collect", "POST /collect rejected: bad or missing token");
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "ok": false, "error": "unauthorized" })),
        )
            .into_response();
    }

    match state.collector.refresh().await {
        Ok(summary) => {
            let count = state.collector.store().current().snapshot.items.len();
            let retained_reason = match summary.outcome {
                PublishOutcome::Retained { reason, .. } => Some(reason),
                PublishOutcome::Published { .. } => None,
            };
            info!(
                target: "collect",
                published = summary.outcome.is_published(),
                version = summary.outcome.version(),
                count,
                "manual refresh"
            );
            Json(CollectOut {
                ok: true,
                published: summary.outcome.is_published(),
                count,
                version: summary.outcome.version(),
                retained_reason,
                failures: summary.failures,
            })
            .into_response()
        }
        Err(e) => {
            warn!(target: "collect", "manual refresh failed: {e:#}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "ok": false, "error": format!("{e:#}") })),
            )
                .into_response()
        }
    }
}

async fn fight_song(State(state): State<AppState>) -> Html<String> {
    Html(pages::render_fight_song(&format!(
        "{} — Fight Song",
        state.config.team_title
    )))
}

#[derive(Serialize)]
struct SourcesOut {
    version: u64,
    configured: usize,
    failures: Vec<SourceFailure>,
}

async fn debug_sources(State(state): State<AppState>) -> Json<SourcesOut> {
    let cur = state.collector.store().current();
    Json(SourcesOut {
        version: cur.version,
        configured: state.collector.sources().len(),
        failures: cur.failures.clone(),
    })
}

#[derive(Serialize)]
struct ClassifyOut {
    verdict: Verdict,
    strict: Relevance,
    fallback: Relevance,
}

async fn debug_classify(
    State(state): State<AppState>,
    Query(q): Query<HashMap<String, String>>,
) -> Json<ClassifyOut> {
    let text = q.get("text").cloned().unwrap_or_default().to_lowercase();
    let engine = state.collector.relevance().current();
    Json(ClassifyOut {
        verdict: engine.classify(&text),
        strict: engine.explain(Tier::Strict, &text),
        fallback: engine.explain(Tier::Fallback, &text),
    })
}
