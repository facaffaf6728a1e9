//! Response-mode selection and the buffered path. The streaming path lives
//! in [`crate::sse`]; this module only decides which one a given upstream
//! response takes.

use axum::body::Body;
use axum::http::{HeaderMap, HeaderName, StatusCode, header};
use axum::response::{IntoResponse, Response};
use ongarde_core::OngardeError;

use crate::error_response::ErrorResponse;
use crate::gateway;
use crate::scanning;
use crate::sse;
use crate::state::AppState;

const STREAMING_THRESHOLD_BYTES: u64 = 512 * 1024;

const DROPPED_ON_RESPONSE: &[&str] = &["connection", "keep-alive", "transfer-encoding", "content-length"];

pub fn copy_response_headers(src: &reqwest::header::HeaderMap) -> HeaderMap {
    let mut out = HeaderMap::new();
    for (name, value) in src.iter() {
        if DROPPED_ON_RESPONSE.contains(&name.as_str()) {
            continue;
        }
        if let (Ok(n), Some(v)) = (HeaderName::from_bytes(name.as_str().as_bytes()), gateway::copy_header_value(value)) {
            out.append(n, v);
        }
    }
    out
}

pub async fn handle_upstream_response(state: &AppState, upstream: reqwest::Response, path: &str) -> Response {
    let status = gateway::status_to_axum(upstream.status());
    let is_event_stream = upstream
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.starts_with("text/event-stream"))
        .unwrap_or(false);
    let content_length = upstream
        .headers()
        .get(reqwest::header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<u64>().ok());
    let is_chunked = upstream
        .headers()
        .get(reqwest::header::TRANSFER_ENCODING)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.eq_ignore_ascii_case("chunked"))
        .unwrap_or(false);

    let use_streaming =
        is_event_stream || content_length.is_some_and(|n| n > STREAMING_THRESHOLD_BYTES) || (is_chunked && content_length.is_none());

    if use_streaming {
        sse::stream_response(state.clone(), upstream, status, path.to_string()).await
    } else {
        buffered(state, upstream, status, path).await
    }
}

async fn buffered(state: &AppState, upstream: reqwest::Response, status: StatusCode, path: &str) -> Response {
    let headers = copy_response_headers(upstream.headers());
    let bytes = match upstream.bytes().await {
        Ok(b) => b,
        Err(_) => return ErrorResponse(OngardeError::UpstreamUnreachable).into_response(),
    };

    let provider = state.config.provider_for(path);
    let text = ongarde_scanner::extract::extract_response_text(&bytes);
    let result = state.scanner.scan_buffered_response(&text);
    let effective = scanning::resolve(state, result, provider, false, None);

    if effective.is_blocking() {
        return gateway::block_response(effective);
    }

    let mut response = (status, headers, Body::from(bytes)).into_response();
    response.headers_mut().remove(header::CONTENT_LENGTH);
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dropped_headers_exclude_content_type() {
        assert!(!DROPPED_ON_RESPONSE.contains(&"content-type"));
    }
}
