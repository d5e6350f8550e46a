//! JSON-over-HTTP surface for the engine.
//!
//! Two obligations anchor this layer: the admission gate runs before any
//! note is accepted, and the suppression filter runs over note query
//! results. Everything else is plumbing between the store, the aggregator,
//! and the background sweep task.

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use serde::Deserialize;
use serde_json::json;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use nk_core::{Item, ItemKind, RetentionConfig, Scorer, difficulty_of, is_admissible};
use nk_store::{Store, cascade_dependents, sweep};

use crate::config::EngineConfig;

#[derive(Clone)]
pub struct AppState {
    store: Arc<Mutex<Store>>,
    scorer: Arc<Scorer>,
    config: Arc<EngineConfig>,
}

impl AppState {
    pub fn new(store: Store, config: EngineConfig) -> Self {
        let scorer = Arc::new(Scorer::new(config.score_config()));
        Self {
            store: Arc::new(Mutex::new(store)),
            scorer,
            config: Arc::new(config),
        }
    }

    pub fn store(&self) -> Arc<Mutex<Store>> {
        Arc::clone(&self.store)
    }

    /// Replay persisted items into the aggregator so scores survive a
    /// restart. Crossing edges are ignored during replay — anything they
    /// would have cascaded was cascaded when the edge originally fired.
    pub async fn rehydrate(&self) -> nk_store::Result<()> {
        let store = self.store.lock().await;
        let mut replayed = 0usize;
        for note in store.query_all(ItemKind::Note)? {
            self.scorer.ingest_root(&note);
            replayed += 1;
        }
        for reaction in store.query_all(ItemKind::Reaction)? {
            self.scorer.ingest_reaction(&reaction);
            replayed += 1;
        }
        for report in store.query_all(ItemKind::Report)? {
            self.scorer.ingest_report(&report);
            replayed += 1;
        }
        info!(replayed, "rehydrated aggregator from store");
        Ok(())
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/items", post(post_item).get(list_items))
        .route("/items/{id}", get(get_item))
        .route("/score/{id}", get(get_score))
        .route("/stats", get(get_stats))
        .route("/info", get(get_info))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serve HTTP and run the background sweep loop until ctrl-c.
pub async fn run(state: AppState, port: u16) -> anyhow::Result<()> {
    let sweeper = spawn_sweeper(
        state.store(),
        state.config.retention_config(),
        state.config.sweep_interval,
    );

    let app = router(state);
    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port)).await?;
    info!(port, "listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    sweeper.abort();
    Ok(())
}

/// One sweep immediately, then one per interval.
fn spawn_sweeper(
    store: Arc<Mutex<Store>>,
    config: RetentionConfig,
    interval_secs: u64,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_secs(interval_secs.max(1)));
        loop {
            ticker.tick().await;
            let store = store.lock().await;
            match sweep(&store, &config) {
                Ok(report) => info!(
                    tracked = report.tracked,
                    evicted = report.evicted,
                    capacity = report.capacity,
                    "retention sweep complete"
                ),
                Err(e) => error!(error = %e, "retention sweep failed"),
            }
        }
    })
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_err() {
        warn!("failed to install ctrl-c handler");
        return;
    }
    info!("shutting down");
}

async fn post_item(State(state): State<AppState>, Json(item): Json<Item>) -> Response {
    if item.kind == ItemKind::Note && !is_admissible(&item, state.config.min_difficulty) {
        let got = difficulty_of(&item.id);
        let required = state.config.min_difficulty;
        return error_response(
            StatusCode::BAD_REQUEST,
            &format!("insufficient proof of work: got {got}, required {required}"),
        );
    }

    let store = state.store.lock().await;
    let stored = match store.persist(&item) {
        Ok(stored) => stored,
        Err(e) => {
            error!(id = %item.id, error = %e, "persist failed");
            return error_response(StatusCode::INTERNAL_SERVER_ERROR, "storage failure");
        }
    };

    let crossed = match item.kind {
        ItemKind::Note => {
            state.scorer.ingest_root(&item);
            false
        }
        ItemKind::Reaction => state.scorer.ingest_reaction(&item),
        ItemKind::Report => state.scorer.ingest_report(&item),
        ItemKind::Other(_) => false,
    };

    // A crossed-down edge removes the suppressed root's dependents; the
    // root itself stays resident for the pruner to judge.
    if crossed && let Some(parent) = item.parent() {
        let removed = cascade_dependents(&store, parent);
        info!(id = %parent, removed, "suppression threshold crossed");
    }

    (StatusCode::OK, Json(json!({ "id": item.id, "stored": stored }))).into_response()
}

#[derive(Debug, Deserialize)]
struct ListQuery {
    kind: Option<u16>,
    #[serde(rename = "ref")]
    reference: Option<String>,
}

async fn list_items(State(state): State<AppState>, Query(q): Query<ListQuery>) -> Response {
    let kind = ItemKind::from(q.kind.unwrap_or(u16::from(ItemKind::Note)));

    let store = state.store.lock().await;
    let result = match &q.reference {
        Some(reference) => store.query_by_kind_and_reference(kind, reference),
        None => store.query_all(kind),
    };
    let mut items = match result {
        Ok(items) => items,
        Err(e) => {
            error!(error = %e, "query failed");
            return error_response(StatusCode::INTERNAL_SERVER_ERROR, "storage failure");
        }
    };

    if kind == ItemKind::Note {
        items.retain(|item| !state.scorer.should_suppress(&item.id));
    }

    (StatusCode::OK, Json(items)).into_response()
}

async fn get_item(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    let store = state.store.lock().await;
    match store.get(&id) {
        Ok(Some(item)) => (StatusCode::OK, Json(item)).into_response(),
        Ok(None) => error_response(StatusCode::NOT_FOUND, "unknown item"),
        Err(e) => {
            error!(id = %id, error = %e, "get failed");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "storage failure")
        }
    }
}

async fn get_score(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    let body = match state.scorer.aggregate(&id) {
        Some(agg) => json!({
            "id": agg.id,
            "base": agg.base,
            "positive": agg.positive,
            "negative": agg.negative,
            "report_mass": agg.report_mass,
            "total": agg.total,
            "suppressed": state.scorer.should_suppress(&id),
        }),
        None => json!({
            "id": id,
            "total": 0.0,
            "suppressed": false,
        }),
    };
    (StatusCode::OK, Json(body)).into_response()
}

async fn get_stats(State(state): State<AppState>) -> Response {
    let stats = state.scorer.stats();
    let store = state.store.lock().await;
    let counts = (
        store.count(ItemKind::Note),
        store.count(ItemKind::Reaction),
        store.count(ItemKind::Report),
        store.count_all(),
    );
    let (notes, reactions, reports, total) = match counts {
        (Ok(n), Ok(rx), Ok(rp), Ok(t)) => (n, rx, rp, t),
        _ => {
            return error_response(StatusCode::INTERNAL_SERVER_ERROR, "storage failure");
        }
    };

    let body = json!({
        "tracked": stats.tracked,
        "below_threshold": stats.below_threshold,
        "notes": notes,
        "reactions": reactions,
        "reports": reports,
        "total": total,
        "capacity": state.config.capacity,
    });
    (StatusCode::OK, Json(body)).into_response()
}

async fn get_info(State(state): State<AppState>) -> Response {
    let body = json!({
        "name": "notekeep",
        "version": env!("CARGO_PKG_VERSION"),
        "min_difficulty": state.config.min_difficulty,
        "capacity": state.config.capacity,
        "decay_lambda": state.config.decay_lambda,
        "sweep_interval": state.config.sweep_interval,
    });
    (StatusCode::OK, Json(body)).into_response()
}

fn error_response(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "error": message }))).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pow_id(zero_bits: u32, suffix: &str) -> String {
        let zeros = "0".repeat(zero_bits as usize / 4);
        let mut id = format!("{zeros}f{suffix}");
        while id.len() < 64 {
            id.push('e');
        }
        id
    }

    fn committed_note(id: &str) -> Item {
        Item {
            id: id.to_string(),
            kind: ItemKind::Note,
            created_at: nk_core::now_unix_secs(),
            content: "hello".to_string(),
            tags: vec![vec!["nonce".to_string(), "1".to_string(), "16".to_string()]],
        }
    }

    fn child(kind: ItemKind, id: &str, parent: &str, content: &str) -> Item {
        Item {
            id: id.to_string(),
            kind,
            created_at: nk_core::now_unix_secs(),
            content: content.to_string(),
            tags: vec![vec!["e".to_string(), parent.to_string()]],
        }
    }

    fn make_state(min_difficulty: u32) -> AppState {
        let store = Store::open_in_memory().unwrap();
        let config = EngineConfig {
            min_difficulty,
            ..Default::default()
        };
        AppState::new(store, config)
    }

    async fn body_json(resp: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_post_note_rejects_weak_pow() {
        let state = make_state(16);
        let weak = committed_note(&pow_id(8, "a"));

        let resp = post_item(State(state.clone()), Json(weak.clone())).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body = body_json(resp).await;
        assert_eq!(
            body["error"],
            "insufficient proof of work: got 8, required 16"
        );

        // Nothing was persisted or scored
        let resp = get_item(State(state), Path(weak.id)).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_post_note_requires_commitment() {
        let state = make_state(16);
        let mut note = committed_note(&pow_id(20, "a"));
        note.tags.clear();

        let resp = post_item(State(state), Json(note)).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_post_note_accepted_and_served() {
        let state = make_state(16);
        let note = committed_note(&pow_id(20, "a"));

        let resp = post_item(State(state.clone()), Json(note.clone())).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body = body_json(resp).await;
        assert_eq!(body["stored"], true);

        let resp = get_item(State(state.clone()), Path(note.id.clone())).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let resp = get_score(State(state), Path(note.id)).await;
        let body = body_json(resp).await;
        assert_eq!(body["total"], 20.0);
        assert_eq!(body["suppressed"], false);
    }

    #[tokio::test]
    async fn test_post_is_idempotent() {
        let state = make_state(16);
        let note = committed_note(&pow_id(20, "a"));

        let first = body_json(post_item(State(state.clone()), Json(note.clone())).await).await;
        assert_eq!(first["stored"], true);
        let second = body_json(post_item(State(state), Json(note)).await).await;
        assert_eq!(second["stored"], false);
    }

    #[tokio::test]
    async fn test_crossing_cascades_dependents_but_keeps_root() {
        let state = make_state(16);
        let root = committed_note(&pow_id(16, "a"));
        let root_id = root.id.clone();

        post_item(State(state.clone()), Json(root)).await;
        let mut reply = child(ItemKind::Note, &pow_id(16, "b"), &root_id, "re");
        reply
            .tags
            .push(vec!["nonce".to_string(), "1".to_string(), "16".to_string()]);
        let reply_id = reply.id.clone();
        post_item(State(state.clone()), Json(reply)).await;

        // Downvote of difficulty 8: 16 → 8, below the threshold
        let downvote = child(ItemKind::Reaction, &pow_id(8, "c"), &root_id, "-");
        post_item(State(state.clone()), Json(downvote)).await;

        // Dependents are gone, the suppressed root remains stored
        let resp = get_item(State(state.clone()), Path(reply_id)).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        let resp = get_item(State(state.clone()), Path(root_id.clone())).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let score = body_json(get_score(State(state), Path(root_id)).await).await;
        assert_eq!(score["suppressed"], true);
    }

    #[tokio::test]
    async fn test_list_omits_suppressed_notes() {
        let state = make_state(16);
        let good = committed_note(&pow_id(24, "a"));
        let doomed = committed_note(&pow_id(16, "b"));
        let doomed_id = doomed.id.clone();

        post_item(State(state.clone()), Json(good.clone())).await;
        post_item(State(state.clone()), Json(doomed)).await;
        post_item(
            State(state.clone()),
            Json(child(ItemKind::Reaction, &pow_id(8, "c"), &doomed_id, "-")),
        )
        .await;

        let resp = list_items(
            State(state.clone()),
            Query(ListQuery {
                kind: None,
                reference: None,
            }),
        )
        .await;
        let body = body_json(resp).await;
        let ids: Vec<&str> = body
            .as_array()
            .unwrap()
            .iter()
            .map(|i| i["id"].as_str().unwrap())
            .collect();
        assert_eq!(ids, [good.id.as_str()], "suppressed note must be omitted");

        // Suppression is a serving filter only — the item is still stored
        let resp = get_item(State(state), Path(doomed_id)).await;
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_list_by_kind_and_reference() {
        let state = make_state(16);
        let root = committed_note(&pow_id(20, "a"));
        let root_id = root.id.clone();
        post_item(State(state.clone()), Json(root)).await;
        post_item(
            State(state.clone()),
            Json(child(ItemKind::Reaction, &pow_id(4, "b"), &root_id, "+")),
        )
        .await;

        let resp = list_items(
            State(state),
            Query(ListQuery {
                kind: Some(7),
                reference: Some(root_id),
            }),
        )
        .await;
        let body = body_json(resp).await;
        assert_eq!(body.as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_stats_and_info() {
        let state = make_state(16);
        post_item(State(state.clone()), Json(committed_note(&pow_id(20, "a")))).await;

        let stats = body_json(get_stats(State(state.clone())).await).await;
        assert_eq!(stats["notes"], 1);
        assert_eq!(stats["tracked"], 1);
        assert_eq!(stats["below_threshold"], 0);

        let info = body_json(get_info(State(state)).await).await;
        assert_eq!(info["name"], "notekeep");
        assert_eq!(info["min_difficulty"], 16);
    }

    #[tokio::test]
    async fn test_rehydrate_restores_scores() {
        // Persist history straight into the store, as a previous process
        // lifetime would have left it, then replay into a fresh aggregator.
        let store = Store::open_in_memory().unwrap();
        let root = committed_note(&pow_id(16, "a"));
        let root_id = root.id.clone();
        store.persist(&root).unwrap();
        store
            .persist(&child(ItemKind::Reaction, &pow_id(8, "b"), &root_id, "-"))
            .unwrap();

        let state = AppState::new(
            store,
            EngineConfig {
                min_difficulty: 16,
                ..Default::default()
            },
        );
        assert!(!state.scorer.should_suppress(&root_id));
        state.rehydrate().await.unwrap();
        assert!(state.scorer.should_suppress(&root_id));
        assert_eq!(state.scorer.score(&root_id), 8.0);
    }
}
