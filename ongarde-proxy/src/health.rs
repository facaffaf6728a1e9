//! `GET /health` and `GET /health/scanner`. Gated on
//! `ongarde_core::Ready` so a client sees 503 until regex compilation, NLP
//! warm-up (full mode) and calibration have all dropped their readiness
//! tokens.

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use crate::state::AppState;

pub async fn health(State(state): State<AppState>) -> Response {
    if !state.ready.is_ready() {
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "status": "starting", "pending": state.ready.pending() })),
        )
            .into_response();
    }

    let snapshot = state.counters.snapshot();
    let scanner_mode = if state.scanner.is_lite_mode() { "lite" } else { "full" };

    (
        StatusCode::OK,
        Json(json!({
            "status": "ok",
            "proxy": "ongarde",
            "scanner": "ready",
            "scanner_mode": scanner_mode,
            "connection_pool_size": state.config.upstream_connection_pool,
            "avg_scan_ms": snapshot.avg_scan_ms,
            "queue_depth": snapshot.queue_depth,
            "deployment_mode": "self-hosted",
        })),
    )
        .into_response()
}

/// Schema docs, mounted only when `DEBUG` is set: never exposes a
/// filesystem path, just the route/shape summary.
pub async fn docs() -> Response {
    (
        StatusCode::OK,
        Json(json!({
            "routes": [
                "POST /v1/chat/completions",
                "POST /v1/messages",
                "GET /health",
                "GET /health/scanner",
                "GET /dashboard/api/counters",
                "GET /dashboard/api/events",
                "POST /dashboard/api/keys",
                "GET /dashboard/api/keys",
                "DELETE /dashboard/api/keys/{id}",
            ],
        })),
    )
        .into_response()
}

pub async fn health_scanner(State(state): State<AppState>) -> Response {
    if !state.ready.is_ready() {
        return (StatusCode::SERVICE_UNAVAILABLE, Json(json!({ "status": "starting" }))).into_response();
    }

    let calibration = state.scanner.calibration();
    (
        StatusCode::OK,
        Json(json!({
            "scanner_mode": if state.scanner.is_lite_mode() { "lite" } else { "full" },
            "rule_count": state.scanner.rule_count(),
            "entities": ["credit_card", "us_ssn", "email", "phone", "crypto_wallet"],
            "sync_threshold_chars": calibration.sync_threshold,
            "calibration_p50_ms": calibration.p50.as_secs_f64() * 1000.0,
            "calibration_p99_ms": calibration.p99.as_secs_f64() * 1000.0,
        })),
    )
        .into_response()
}
