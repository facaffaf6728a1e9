//! The proxy engine: admission has already run by the time a request reaches
//! here. This module owns upstream selection, request scanning, dispatch,
//! and response-mode selection.

use axum::body::{Body, Bytes};
use axum::extract::State;
use axum::http::{HeaderMap, HeaderValue, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use http_body_util::BodyExt;
use ongarde_core::OngardeError;
use tracing::Instrument;

use crate::admission::presented_key_id;
use crate::error_response::ErrorResponse;
use crate::response;
use crate::scanning;
use crate::state::AppState;

const HOP_BY_HOP: &[&str] = &[
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailers",
    "transfer-encoding",
    "upgrade",
    "host",
];

/// Entry point routed by `build_router`; wraps the real handler in a
/// `request_id`-carrying span so every log line, scan, and audit event tied
/// to this request can be correlated.
pub async fn proxy(
    State(state): State<AppState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Body,
) -> Response {
    let request_id = ongarde_core::Sid::new().to_string();
    let span = tracing::info_span!("request", %request_id, path = %uri.path());
    handle(state, method, uri, headers, body).instrument(span).await
}

async fn handle(state: AppState, method: Method, uri: Uri, headers: HeaderMap, body: Body) -> Response {
    state.counters.record_request();
    let path = uri.path().to_string();

    let Some(base) = state.config.upstream_for(&path).map(str::to_string) else {
        return ErrorResponse(OngardeError::UpstreamUnreachable).into_response();
    };
    let provider = state.config.provider_for(&path);

    let body_bytes = match body.collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(_) => return ErrorResponse(OngardeError::BodyTooLarge).into_response(),
    };

    let key_id = presented_key_id(&headers, &state).await;

    let text = ongarde_scanner::extract::extract_request_text(&body_bytes);
    let fast_result = state.scanner.scan_request(&text);
    let effective = scanning::resolve(&state, fast_result, provider, false, key_id.as_deref());

    if effective.is_blocking() {
        return block_response(effective);
    }

    if state.scanner.needs_advisory_scan(&text) {
        let state_for_task = state.clone();
        let provider = provider.to_string();
        let advisory_text = text;
        let advisory_span = tracing::Span::current();
        tokio::spawn(
            async move {
                let result = state_for_task.scanner.scan_advisory(&advisory_text);
                scanning::record_advisory(&state_for_task, result, &provider);
            }
            .instrument(advisory_span),
        );
    }

    dispatch(&state, &method, &base, &path, &uri, &headers, body_bytes).await
}

pub(crate) fn block_response(result: ongarde_scanner::ScanResult) -> Response {
    let err = OngardeError::ScannerBlock {
        rule_id: result.rule_id.unwrap_or_else(|| "SCANNER_ERROR".to_string()),
        risk_level: result.risk_level.map(|r| r.to_string()).unwrap_or_else(|| "CRITICAL".to_string()),
        scan_id: result.scan_id.to_string(),
        redacted_excerpt: result.excerpt.as_deref().map(ongarde_scanner::redact).unwrap_or_default(),
        test: result.test,
    };
    ErrorResponse(err).into_response()
}

async fn dispatch(
    state: &AppState,
    method: &Method,
    base: &str,
    path: &str,
    uri: &Uri,
    headers: &HeaderMap,
    body_bytes: Bytes,
) -> Response {
    let mut url = format!("{}{}", base.trim_end_matches('/'), path);
    if let Some(query) = uri.query() {
        url.push('?');
        url.push_str(query);
    }

    let mut upstream_headers = reqwest::header::HeaderMap::new();
    for (name, value) in headers.iter() {
        let lower = name.as_str().to_ascii_lowercase();
        if HOP_BY_HOP.contains(&lower.as_str()) || lower == "x-ongarde-key" || lower == "authorization" {
            continue;
        }
        if let (Ok(n), Ok(v)) = (
            reqwest::header::HeaderName::from_bytes(name.as_str().as_bytes()),
            reqwest::header::HeaderValue::from_bytes(value.as_bytes()),
        ) {
            upstream_headers.insert(n, v);
        }
    }
    if let Some(cred) = state.config.upstream_credential(state.config.provider_for(path)) {
        if let Ok(v) = reqwest::header::HeaderValue::from_str(&format!("Bearer {cred}")) {
            upstream_headers.insert(reqwest::header::AUTHORIZATION, v);
        }
    }

    let reqwest_method = reqwest::Method::from_bytes(method.as_str().as_bytes()).unwrap_or(reqwest::Method::POST);

    let upstream_response = state
        .upstream_client
        .request(reqwest_method, &url)
        .headers(upstream_headers)
        .body(body_bytes)
        .send()
        .await;

    let upstream_response = match upstream_response {
        Ok(r) => r,
        Err(err) if err.is_timeout() => return ErrorResponse(OngardeError::UpstreamTimeout).into_response(),
        Err(_) => return ErrorResponse(OngardeError::UpstreamUnreachable).into_response(),
    };

    response::handle_upstream_response(state, upstream_response, path).await
}

pub fn status_to_axum(status: reqwest::StatusCode) -> StatusCode {
    StatusCode::from_u16(status.as_u16()).unwrap_or(StatusCode::BAD_GATEWAY)
}

pub fn header_name_is_sensitive(name: &str) -> bool {
    matches!(name, "set-cookie" | "authorization")
}

pub fn copy_header_value(value: &reqwest::header::HeaderValue) -> Option<HeaderValue> {
    HeaderValue::from_bytes(value.as_bytes()).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hop_by_hop_list_excludes_content_type() {
        assert!(!HOP_BY_HOP.contains(&"content-type"));
    }
}
