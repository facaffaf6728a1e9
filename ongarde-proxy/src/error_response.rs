//! Maps `OngardeError` to the wire error body. Kept separate from
//! `ongarde-core::OngardeError` itself so the error taxonomy stays
//! framework-agnostic and this module owns the one place that builds an
//! `axum::response::Response`.

use axum::response::{IntoResponse, Response};
use axum::Json;
use http::{HeaderValue, StatusCode};
use ongarde_core::OngardeError;
use serde_json::json;

pub struct ErrorResponse(pub OngardeError);

impl IntoResponse for ErrorResponse {
    fn into_response(self) -> Response {
        let err = self.0;
        let status = StatusCode::from_u16(err.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        let body = match &err {
            OngardeError::ScannerBlock { rule_id, risk_level, scan_id, redacted_excerpt, test } => json!({
                "error": {
                    "message": "request blocked by ongarde security scan",
                    "code": "ongarde_block",
                    "ongarde": {
                        "rule_id": rule_id,
                        "risk_level": risk_level,
                        "scan_id": scan_id,
                        "test": test,
                        "redacted_excerpt": redacted_excerpt,
                    }
                }
            }),
            other => json!({
                "error": {
                    "message": other.to_string(),
                    "code": error_code(other),
                }
            }),
        };

        let mut response = (status, Json(body)).into_response();
        if let OngardeError::ScannerBlock { scan_id, .. } = &err {
            if let Ok(value) = HeaderValue::from_str(scan_id) {
                response.headers_mut().insert("X-OnGarde-Scan-Id", value);
            }
        }
        response
    }
}

fn error_code(err: &OngardeError) -> &'static str {
    match err {
        OngardeError::AuthFailure => "ongarde_auth_failure",
        OngardeError::BodyTooLarge => "ongarde_body_too_large",
        OngardeError::UpstreamUnreachable => "ongarde_upstream_unreachable",
        OngardeError::UpstreamTimeout => "ongarde_upstream_timeout",
        OngardeError::ScannerError => "ongarde_scanner_error",
        OngardeError::ScannerBlock { .. } => "ongarde_block",
        OngardeError::MalformedRequest => "ongarde_malformed_request",
        OngardeError::RateLimited => "ongarde_rate_limited",
        OngardeError::ConfigInvalid(_) => "ongarde_config_invalid",
        OngardeError::UpstreamURLForbidden => "ongarde_upstream_forbidden",
        OngardeError::InternalError => "ongarde_internal_error",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scanner_block_carries_scan_id_header() {
        let err = OngardeError::ScannerBlock {
            rule_id: "CRED_OPENAI_KEY".to_string(),
            risk_level: "CRITICAL".to_string(),
            scan_id: "01ABCXYZ".to_string(),
            redacted_excerpt: "sk-******xyz".to_string(),
            test: false,
        };
        let response = ErrorResponse(err).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(response.headers().get("X-OnGarde-Scan-Id").unwrap(), "01ABCXYZ");
    }

    #[test]
    fn auth_failure_maps_to_401() {
        let response = ErrorResponse(OngardeError::AuthFailure).into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
