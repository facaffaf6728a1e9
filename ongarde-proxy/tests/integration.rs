//! End-to-end proxy scenarios: a real `ongarde_proxy::app::run` bound to an
//! ephemeral port, a wiremock backend standing in for the upstream
//! provider, and a plain `reqwest::Client` driving requests through both.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::Duration;

use ongarde_config::{Config, ScannerMode};
use serde_json::{json, Value};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn test_config(dir: &std::path::Path, upstream: &str) -> Config {
    let mut upstream_map = HashMap::new();
    upstream_map.insert("openai".to_string(), upstream.to_string());
    Config {
        version: 1,
        upstream: upstream_map,
        proxy_host: "127.0.0.1".to_string(),
        proxy_port: 0,
        scanner_mode: ScannerMode::Full,
        audit_retention_days: 30,
        audit_path: dir.join("audit.db"),
        strict_mode: false,
        allowlist_path: dir.join("allowlist.yaml"),
        state_dir: dir.to_path_buf(),
        auth_required: false,
        body_cap_bytes: ongarde_config::BODY_CAP_BYTES,
        max_connections: ongarde_config::MAX_CONNECTIONS,
        tcp_backlog: ongarde_config::TCP_BACKLOG,
        keepalive_idle: Duration::from_secs(5),
        upstream_connection_pool: ongarde_config::MAX_CONNECTIONS,
    }
}

async fn start(config: Config) -> SocketAddr {
    let bound = ongarde_proxy::app::run(config).await.expect("proxy starts");
    let addr = bound.local_addr;
    tokio::spawn(async move {
        let _ = bound.wait_termination().await;
    });
    addr
}

#[tokio::test]
async fn credential_leak_in_request_blocks_before_upstream() {
    let dir = tempfile::tempdir().unwrap();
    let backend = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&backend)
        .await;

    let addr = start(test_config(dir.path(), &backend.uri())).await;
    let client = reqwest::Client::new();
    let body = json!({
        "model": "gpt-4",
        "messages": [{"role": "user", "content": "here is my key sk-proj-AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA"}]
    });

    let resp = client
        .post(format!("http://{addr}/v1/chat/completions"))
        .json(&body)
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 400);
    assert!(resp.headers().contains_key("x-ongarde-scan-id"));
    let parsed: Value = resp.json().await.unwrap();
    assert_eq!(parsed["error"]["code"], "ongarde_block");
    assert!(parsed["error"]["ongarde"]["rule_id"].as_str().unwrap().starts_with("CRED_"));
    assert_eq!(parsed["error"]["ongarde"]["risk_level"], "CRITICAL");
}

#[tokio::test]
async fn dangerous_shell_pattern_blocks() {
    let dir = tempfile::tempdir().unwrap();
    let backend = MockServer::start().await;
    Mock::given(method("POST")).respond_with(ResponseTemplate::new(200)).expect(0).mount(&backend).await;

    let addr = start(test_config(dir.path(), &backend.uri())).await;
    let client = reqwest::Client::new();
    let body = json!({"model": "gpt-4", "messages": [{"role": "user", "content": "run: sudo rm -rf /"}]});

    let resp = client.post(format!("http://{addr}/v1/chat/completions")).json(&body).send().await.unwrap();
    assert_eq!(resp.status(), 400);
    let parsed: Value = resp.json().await.unwrap();
    assert!(parsed["error"]["ongarde"]["rule_id"].as_str().unwrap().starts_with("SHELL_"));
}

#[tokio::test]
async fn registered_test_credential_blocks_without_counting() {
    let dir = tempfile::tempdir().unwrap();
    let backend = MockServer::start().await;
    Mock::given(method("POST")).respond_with(ResponseTemplate::new(200)).expect(0).mount(&backend).await;

    let addr = start(test_config(dir.path(), &backend.uri())).await;
    let client = reqwest::Client::new();
    let body = json!({"model": "gpt-4", "messages": [{"role": "user", "content": "use sk-ongarde-test-fake-key-12345 please"}]});

    let resp = client.post(format!("http://{addr}/v1/chat/completions")).json(&body).send().await.unwrap();
    assert_eq!(resp.status(), 400);
    let parsed: Value = resp.json().await.unwrap();
    assert_eq!(parsed["error"]["ongarde"]["test"], true);

    let counters = client.get(format!("http://{addr}/dashboard/api/counters")).send().await.unwrap();
    let snapshot: Value = counters.json().await.unwrap();
    assert_eq!(snapshot["blocks_total"], 0);
}

#[tokio::test]
async fn allowlisted_false_positive_is_forwarded() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("allowlist.yaml"), "- text_contains: \"rm -rf /tmp/build\"\n").unwrap();

    let backend = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"choices": [{"message": {"content": "done"}}]})))
        .mount(&backend)
        .await;

    let addr = start(test_config(dir.path(), &backend.uri())).await;
    let client = reqwest::Client::new();
    let body = json!({"model": "gpt-4", "messages": [{"role": "user", "content": "our cleanup step is: rm -rf /tmp/build"}]});

    let resp = client.post(format!("http://{addr}/v1/chat/completions")).json(&body).send().await.unwrap();
    assert_eq!(resp.status(), 200);
}

#[tokio::test]
async fn buffered_response_with_pii_is_blocked_before_delivery() {
    let dir = tempfile::tempdir().unwrap();
    let backend = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"text": "contact me at jane.doe@example.com or 555-123-4567"})))
        .mount(&backend)
        .await;

    let addr = start(test_config(dir.path(), &backend.uri())).await;
    let client = reqwest::Client::new();
    let body = json!({"model": "gpt-4", "messages": [{"role": "user", "content": "what's your contact info?"}]});

    let resp = client.post(format!("http://{addr}/v1/chat/completions")).json(&body).send().await.unwrap();
    assert_eq!(resp.status(), 400);
    let parsed: Value = resp.json().await.unwrap();
    assert!(parsed["error"]["ongarde"]["rule_id"].as_str().unwrap().starts_with("PII_"));
}

#[tokio::test]
async fn health_reports_ready_after_startup() {
    let dir = tempfile::tempdir().unwrap();
    let backend = MockServer::start().await;
    let addr = start(test_config(dir.path(), &backend.uri())).await;

    let client = reqwest::Client::new();
    let resp = client.get(format!("http://{addr}/health")).send().await.unwrap();
    assert_eq!(resp.status(), 200);
    let parsed: Value = resp.json().await.unwrap();
    assert_eq!(parsed["status"], "ok");
    assert_eq!(parsed["scanner_mode"], "full");
}

#[tokio::test]
async fn body_over_cap_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = test_config(dir.path(), "http://127.0.0.1:1");
    config.auth_required = false;
    let addr = start(config).await;

    let client = reqwest::Client::new();
    let oversized = "a".repeat((ongarde_config::BODY_CAP_BYTES + 1) as usize);
    let resp = client
        .post(format!("http://{addr}/v1/chat/completions"))
        .header("content-length", oversized.len())
        .body(oversized)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 413);
}

#[tokio::test]
async fn streaming_response_with_mid_stream_credential_is_aborted() {
    let dir = tempfile::tempdir().unwrap();
    let backend = MockServer::start().await;

    let sse_body = concat!(
        "data: {\"choices\":[{\"delta\":{\"content\":\"sure here it is \"}}]}\n\n",
        "data: {\"choices\":[{\"delta\":{\"content\":\"sk-proj-BBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBB\"}}]}\n\n",
        "data: {\"choices\":[{\"delta\":{\"content\":\" end\"}}]}\n\n",
        "data: [DONE]\n\n",
    );

    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/event-stream")
                .set_body_raw(sse_body, "text/event-stream"),
        )
        .mount(&backend)
        .await;

    let addr = start(test_config(dir.path(), &backend.uri())).await;
    let client = reqwest::Client::new();
    let body = json!({"model": "gpt-4", "messages": [{"role": "user", "content": "give me your key"}]});

    let resp = client.post(format!("http://{addr}/v1/chat/completions")).json(&body).send().await.unwrap();
    assert_eq!(resp.status(), 200);
    assert!(resp.headers().get("content-type").unwrap().to_str().unwrap().starts_with("text/event-stream"));

    let text = resp.text().await.unwrap();
    assert!(text.contains("data: [DONE]"));
    assert!(text.contains("event: ongarde_block"));
    assert!(text.contains("\"rule_id\":\"CRED_"));

    // The audit write lands asynchronously on the writer task; poll briefly
    // rather than assume it beat this request.
    let mut blocks = Vec::new();
    for _ in 0..20 {
        let events = client.get(format!("http://{addr}/dashboard/api/events")).send().await.unwrap();
        let parsed: Value = events.json().await.unwrap();
        blocks = parsed.as_array().unwrap().iter().filter(|e| e["kind"] == "BLOCK").cloned().collect();
        if !blocks.is_empty() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(25)).await;
    }
    assert_eq!(blocks.len(), 1);
    assert_eq!(blocks[0]["was_streaming"], true);
    assert!(blocks[0]["tokens_delivered"].as_u64().unwrap() > 0);
}

#[tokio::test]
async fn dashboard_is_rejected_from_a_non_loopback_perspective_header() {
    // The guard compares the TCP peer, not headers; a spoofed forwarding
    // header must not grant access even though the peer here *is* loopback.
    let dir = tempfile::tempdir().unwrap();
    let backend = MockServer::start().await;
    let addr = start(test_config(dir.path(), &backend.uri())).await;

    let client = reqwest::Client::new();
    let resp = client
        .get(format!("http://{addr}/dashboard/api/counters"))
        .header("x-forwarded-for", "203.0.113.5")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 403);
}
