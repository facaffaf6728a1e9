//! The loopback-only dashboard surface: counters, recent audit events, and
//! key management, plus the embedded single-page UI. Every handler here sits
//! behind [`crate::loopback::require_loopback`] and the key-management
//! endpoints additionally sit behind a per-IP rate limiter (20 req/min).

use std::net::SocketAddr;

use axum::Json;
use axum::extract::{ConnectInfo, Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use include_dir::{Dir, include_dir};
use ongarde_core::OngardeError;
use serde::Deserialize;
use serde_json::json;

use crate::admission::presented_key;
use crate::error_response::ErrorResponse;
use crate::state::AppState;

static DASHBOARD_ASSETS: Dir<'_> = include_dir!("$CARGO_MANIFEST_DIR/assets/dashboard");

#[derive(Deserialize)]
pub struct EventsQuery {
    limit: Option<i64>,
}

#[derive(Deserialize)]
pub struct CreateKeyRequest {
    name: String,
}

pub async fn counters(State(state): State<AppState>) -> Response {
    Json(state.counters.snapshot()).into_response()
}

pub async fn events(State(state): State<AppState>, Query(query): Query<EventsQuery>) -> Response {
    let limit = query.limit.unwrap_or(50).clamp(1, 500);
    match ongarde_store::recent_audit_events(&state.audit_pool, limit).await {
        Ok(events) => Json(events).into_response(),
        Err(err) => {
            tracing::error!(error = %err, "failed to read audit events");
            ErrorResponse(OngardeError::InternalError).into_response()
        }
    }
}

fn rate_limited(state: &AppState, peer: SocketAddr) -> Option<Response> {
    if !state.dashboard_rate_limiter.check(peer.ip()) {
        return Some(ErrorResponse(OngardeError::RateLimited).into_response());
    }
    None
}

/// Key creation is unauthenticated only for the very first key: once the
/// store holds any key at all, a caller must present a valid one, same as
/// `admission::admit` requires for the data-plane routes.
pub async fn create_key(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Json(payload): Json<CreateKeyRequest>,
) -> Response {
    if let Some(resp) = rate_limited(&state, peer) {
        return resp;
    }
    match state.keystore.is_empty().await {
        Ok(true) => {}
        Ok(false) => {
            let key = presented_key(&headers);
            let valid = match key {
                Some(k) => state.keystore.verify(&k).await.unwrap_or(false),
                None => false,
            };
            if !valid {
                return ErrorResponse(OngardeError::AuthFailure).into_response();
            }
        }
        Err(err) => {
            tracing::error!(error = %err, "key store unavailable during bootstrap check");
            return ErrorResponse(OngardeError::InternalError).into_response();
        }
    }
    match state.keystore.create(&payload.name).await {
        Ok((entry, plaintext)) => (StatusCode::CREATED, Json(json!({ "key": entry, "plaintext": plaintext }))).into_response(),
        Err(err) => {
            tracing::error!(error = %err, "failed to create api key");
            ErrorResponse(OngardeError::InternalError).into_response()
        }
    }
}

pub async fn list_keys(State(state): State<AppState>, ConnectInfo(peer): ConnectInfo<SocketAddr>) -> Response {
    if let Some(resp) = rate_limited(&state, peer) {
        return resp;
    }
    match state.keystore.list().await {
        Ok(keys) => Json(keys).into_response(),
        Err(err) => {
            tracing::error!(error = %err, "failed to list api keys");
            ErrorResponse(OngardeError::InternalError).into_response()
        }
    }
}

pub async fn revoke_key(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    Path(id): Path<String>,
) -> Response {
    if let Some(resp) = rate_limited(&state, peer) {
        return resp;
    }
    match state.keystore.revoke(&id).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => {
            tracing::error!(error = %err, "failed to revoke api key");
            ErrorResponse(OngardeError::InternalError).into_response()
        }
    }
}

/// Serves the embedded single-page UI at `/dashboard/` and below; anything
/// not found in the bundle falls back to `index.html` for client-side
/// routing.
pub async fn static_asset(uri: axum::http::Uri) -> Response {
    let requested = uri.path().trim_start_matches("/dashboard/").trim_start_matches('/');
    let path = if requested.is_empty() { "index.html" } else { requested };

    let file = DASHBOARD_ASSETS.get_file(path).or_else(|| DASHBOARD_ASSETS.get_file("index.html"));
    match file {
        Some(f) => {
            let mime = mime_guess_from_path(path);
            ([(axum::http::header::CONTENT_TYPE, mime)], f.contents().to_vec()).into_response()
        }
        None => (StatusCode::NOT_FOUND, "dashboard assets not bundled").into_response(),
    }
}

fn mime_guess_from_path(path: &str) -> &'static str {
    if path.ends_with(".html") {
        "text/html; charset=utf-8"
    } else if path.ends_with(".css") {
        "text/css; charset=utf-8"
    } else if path.ends_with(".js") {
        "application/javascript; charset=utf-8"
    } else {
        "application/octet-stream"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mime_guess_handles_known_extensions() {
        assert_eq!(mime_guess_from_path("index.html"), "text/html; charset=utf-8");
        assert_eq!(mime_guess_from_path("app.js"), "application/javascript; charset=utf-8");
    }
}
