//! The streaming response path, grounded on the pack's own SSE relay:
//! `resp.bytes_stream().eventsource()` read by a spawned task that forwards
//! reconstructed frames over an mpsc channel, exactly the shape
//! `a2a::relay::proxy_request` uses for its own streaming case.

use axum::body::{Body, Bytes};
use axum::http::{HeaderName, HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use eventsource_stream::Eventsource;
use futures_util::StreamExt;
use serde_json::json;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

use ongarde_scanner::StreamOutcome;

use crate::scanning;
use crate::state::AppState;

const CHANNEL_CAPACITY: usize = 64;

pub async fn stream_response(state: AppState, upstream: reqwest::Response, status: StatusCode, path: String) -> Response {
    let content_type = upstream
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| HeaderValue::from_bytes(v.as_bytes()).ok());

    let (tx, rx) = mpsc::channel::<Bytes>(CHANNEL_CAPACITY);

    tokio::spawn(async move {
        let provider = state.config.provider_for(&path).to_string();
        let mut scanner = state.scanner.new_streaming_scanner();
        let mut events = upstream.bytes_stream().eventsource();

        while let Some(item) = events.next().await {
            let Ok(event) = item else {
                break;
            };

            if tx.send(reframe(&event.event, &event.data)).await.is_err() {
                return;
            }

            let Some(text) = ongarde_scanner::extract::extract_sse_delta_text(&event.data) else {
                continue;
            };

            match scanner.add_content(&text) {
                StreamOutcome::Continue => {}
                StreamOutcome::Blocked(mut result) => {
                    result.tokens_delivered = Some(scanner.tokens_delivered());
                    let effective = scanning::resolve(&state, result, &provider, true, None);
                    if effective.is_blocking() {
                        let _ = tx.send(abort_frames(&effective)).await;
                        return;
                    }
                }
            }
        }

        if let StreamOutcome::Blocked(mut result) = scanner.flush() {
            result.tokens_delivered = Some(scanner.tokens_delivered());
            let effective = scanning::resolve(&state, result, &provider, true, None);
            if effective.is_blocking() {
                let _ = tx.send(abort_frames(&effective)).await;
            }
        }
    });

    let body = Body::from_stream(ReceiverStream::new(rx).map(Ok::<_, std::io::Error>));
    let mut response = (status, body).into_response();
    if let Some(ct) = content_type {
        response.headers_mut().insert(header::CONTENT_TYPE, ct);
    } else {
        response
            .headers_mut()
            .insert(header::CONTENT_TYPE, HeaderValue::from_static("text/event-stream"));
    }
    response.headers_mut().insert(HeaderName::from_static("x-accel-buffering"), HeaderValue::from_static("no"));
    response
}

fn reframe(event_type: &str, data: &str) -> Bytes {
    let mut out = String::new();
    if !event_type.is_empty() && event_type != "message" {
        out.push_str("event: ");
        out.push_str(event_type);
        out.push('\n');
    }
    out.push_str("data: ");
    out.push_str(data);
    out.push_str("\n\n");
    Bytes::from(out)
}

/// The two-frame abort sequence: a `[DONE]` frame standard clients already
/// know how to close on, then the OnGarde-specific frame carrying the block
/// details for clients that understand it.
fn abort_frames(result: &ongarde_scanner::ScanResult) -> Bytes {
    let payload = json!({
        "scan_id": result.scan_id.to_string(),
        "rule_id": result.rule_id,
        "risk_level": result.risk_level.map(|r| r.to_string()),
        "tokens_delivered": result.tokens_delivered,
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "redacted_excerpt": result.excerpt.as_deref().map(ongarde_scanner::redact),
    });
    Bytes::from(format!("data: [DONE]\n\nevent: ongarde_block\ndata: {payload}\n\n"))
}
