//! Loopback-only guard for the dashboard surface, grounded on the pack's
//! connection-locality detector: proxy headers and a non-loopback `Host`
//! header both disqualify a caller, and the guard never trusts a
//! client-supplied value over the TCP peer address.

use axum::extract::{ConnectInfo, State};
use axum::http::Request;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use http::StatusCode;
use std::net::SocketAddr;

fn has_proxy_headers(headers: &http::HeaderMap) -> bool {
    headers.contains_key("x-forwarded-for") || headers.contains_key("x-real-ip") || headers.contains_key("forwarded")
}

/// True only for a direct TCP peer on 127.0.0.1/::1 with no forwarding
/// headers present; a forwarded/real-ip/x-forwarded-for header always
/// disqualifies the caller, even when the underlying peer is loopback.
pub fn is_loopback_peer(headers: &http::HeaderMap, peer: SocketAddr) -> bool {
    if has_proxy_headers(headers) {
        return false;
    }
    peer.ip().is_loopback()
}

pub async fn require_loopback<S, B>(
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    State(_state): State<S>,
    request: Request<B>,
    next: Next,
) -> Response
where
    S: Clone + Send + Sync + 'static,
    B: Send + 'static,
{
    if !is_loopback_peer(request.headers(), peer) {
        return (StatusCode::FORBIDDEN, "dashboard is loopback-only").into_response();
    }
    next.run(request.map(|b| axum::body::Body::new(b))).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loopback_peer_with_no_headers_passes() {
        let headers = http::HeaderMap::new();
        let peer: SocketAddr = "127.0.0.1:54321".parse().unwrap();
        assert!(is_loopback_peer(&headers, peer));
    }

    #[test]
    fn remote_peer_is_rejected() {
        let headers = http::HeaderMap::new();
        let peer: SocketAddr = "203.0.113.5:54321".parse().unwrap();
        assert!(!is_loopback_peer(&headers, peer));
    }

    #[test]
    fn proxy_headers_disqualify_even_a_loopback_peer() {
        let mut headers = http::HeaderMap::new();
        headers.insert("x-forwarded-for", "203.0.113.5".parse().unwrap());
        let peer: SocketAddr = "127.0.0.1:54321".parse().unwrap();
        assert!(!is_loopback_peer(&headers, peer));
    }

    #[test]
    fn ipv6_loopback_peer_passes() {
        let headers = http::HeaderMap::new();
        let peer: SocketAddr = "[::1]:54321".parse().unwrap();
        assert!(is_loopback_peer(&headers, peer));
    }
}
