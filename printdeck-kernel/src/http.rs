/**
 * HTTP API - Ingest endpoint and dashboard query surface
 *
 * ROLE: The kernel's only external interface. Printers (or the poller
 * agent) POST raw status reports; the dashboard renderer polls the derived
 * card views. The endpoint is open by design: the fleet lives on a trusted
 * LAN and the renderer handles its own presentation concerns.
 *
 * ROUTES:
 * - POST /status    raw report body -> "OK" | 400 | 500
 * - GET  /printers  derived card views, name ascending
 * - GET  /health    liveness probe
 */

use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use tracing::{error, info};

use crate::ingest::{self, IngestError};
use crate::models::CardView;
use crate::projector::{self, DisplaySettings};
use crate::store::StatusStore;

#[derive(Clone)]
pub struct AppState {
    pub store: StatusStore,
    pub display: DisplaySettings,
}

pub fn build_router(app_state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/status", post(post_status))
        .route("/printers", get(get_printers))
        .with_state(app_state)
}

// POST /status (one raw report from a printer or the poller agent)
async fn post_status(State(app): State<AppState>, body: Bytes) -> (StatusCode, String) {
    match ingest::ingest(&app.store, &body) {
        Ok(()) => (StatusCode::OK, "OK".to_string()),
        Err(e @ IngestError::MalformedPayload(_)) => {
            info!("rejected report: {e}");
            (StatusCode::BAD_REQUEST, e.to_string())
        }
        Err(e @ IngestError::StoreFailure(_)) => {
            error!("report not stored: {e}");
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
    }
}

// GET /printers (derived views for the dashboard, one store read per poll)
async fn get_printers(
    State(app): State<AppState>,
) -> Result<Json<Vec<CardView>>, (StatusCode, String)> {
    let rows = app.store.list_all().map_err(|e| {
        error!("listing printers failed: {e}");
        (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
    })?;
    Ok(Json(projector::project(&rows, Utc::now(), &app.display)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DisplayConf;

    fn state() -> AppState {
        AppState {
            store: StatusStore::open_in_memory().unwrap(),
            display: DisplaySettings::from_conf(&DisplayConf::default()),
        }
    }

    #[tokio::test]
    async fn test_post_then_list_roundtrip() {
        let app = state();
        let body = Bytes::from_static(
            br#"{"printer":{"ip":"10.0.0.7","name":"mk4-lab"},
                 "status":{"printer":{"state":"printing"},
                           "job":{"time_printing":600,"time_remaining":300}}}"#,
        );
        let (code, msg) = post_status(State(app.clone()), body).await;
        assert_eq!(code, StatusCode::OK);
        assert_eq!(msg, "OK");

        let Json(cards) = get_printers(State(app)).await.unwrap();
        assert_eq!(cards.len(), 1);
        assert_eq!(cards[0].name, "mk4-lab");
        assert_eq!(cards[0].state, "PRINTING");
        assert_eq!(cards[0].percent, 66.7);
        assert!(!cards[0].stale);
    }

    #[tokio::test]
    async fn test_malformed_body_is_a_client_error() {
        let app = state();
        let (code, _) = post_status(State(app.clone()), Bytes::from_static(b"[]")).await;
        assert_eq!(code, StatusCode::BAD_REQUEST);

        let Json(cards) = get_printers(State(app)).await.unwrap();
        assert!(cards.is_empty());
    }
}
