//! Auth and body-cap enforcement for proxied LLM requests, grounded on the
//! pack's `require_auth` middleware: check a session-equivalent credential
//! before anything else runs, short-circuit to a rejection response rather
//! than calling through.

use axum::body::Body;
use axum::extract::State;
use axum::http::{Request, header};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use http_body_util::Limited;
use ongarde_core::OngardeError;

use crate::error_response::ErrorResponse;
use crate::state::AppState;

const KEY_HEADER: &str = "x-ongarde-key";

pub fn presented_key(headers: &header::HeaderMap) -> Option<String> {
    if let Some(value) = headers.get(KEY_HEADER).and_then(|v| v.to_str().ok()) {
        return Some(value.to_string());
    }
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::to_string)
}

/// Runs before every proxied request. Rejects on missing/invalid
/// credentials, then caps the body: an oversized `Content-Length` rejects
/// immediately, otherwise the body is wrapped so a chunked transfer that
/// exceeds the cap errors instead of being buffered in full.
///
/// The bootstrap exception that lets an operator mint the first key without
/// a credential applies only to `POST /dashboard/api/keys` (see
/// `dashboard::create_key`), never to these data-plane routes: an empty key
/// store must not let unauthenticated traffic reach the upstream provider.
pub async fn admit(
    State(state): State<AppState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    if state.config.auth_required {
        let key = presented_key(request.headers());
        let valid = match key {
            Some(k) => state.keystore.verify(&k).await.unwrap_or(false),
            None => false,
        };
        if !valid {
            return ErrorResponse(OngardeError::AuthFailure).into_response();
        }
    }

    let cap = state.config.body_cap_bytes;
    if let Some(declared) = request
        .headers()
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<u64>().ok())
        && declared > cap
    {
        return ErrorResponse(OngardeError::BodyTooLarge).into_response();
    }

    let (parts, body) = request.into_parts();
    let limited = Body::new(Limited::new(body, cap as usize));
    let request = Request::from_parts(parts, limited);

    next.run(request).await
}

/// The key `id` for the presented credential, for audit logging only — never
/// the secret itself. `None` when no credential was presented (auth disabled
/// in config, or a request that never reaches `admit`).
pub async fn presented_key_id(headers: &header::HeaderMap, _state: &AppState) -> Option<String> {
    presented_key(headers).and_then(|k| ongarde_store::key_id(&k).map(str::to_string))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderMap;

    #[test]
    fn prefers_ongarde_key_header_over_bearer() {
        let mut headers = HeaderMap::new();
        headers.insert(KEY_HEADER, "ong-a_secret".parse().unwrap());
        headers.insert(header::AUTHORIZATION, "Bearer ong-b_other".parse().unwrap());
        assert_eq!(presented_key(&headers).as_deref(), Some("ong-a_secret"));
    }

    #[test]
    fn falls_back_to_bearer_token() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, "Bearer ong-b_other".parse().unwrap());
        assert_eq!(presented_key(&headers).as_deref(), Some("ong-b_other"));
    }

    #[test]
    fn no_credential_present_yields_none() {
        let headers = HeaderMap::new();
        assert_eq!(presented_key(&headers), None);
    }
}
