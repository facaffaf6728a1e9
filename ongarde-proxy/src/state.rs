//! Shared proxy state, handed to every handler via axum's `State` extractor.
//! One instance is built in `main` and cloned (cheaply, it's all `Arc`s)
//! into the router.

use std::sync::Arc;
use std::sync::atomic::AtomicUsize;
use std::time::Duration;

use ongarde_config::Config;
use ongarde_core::readiness::Ready;
use ongarde_scanner::Scanner;
use ongarde_store::{Allowlist, AuditHandle, Counters, KeyStore, RateLimiter};
use sqlx::SqlitePool;

#[derive(Clone)]
pub struct AppState(pub Arc<Inner>);

pub struct Inner {
    pub config: Config,
    pub scanner: Scanner,
    pub keystore: KeyStore,
    pub allowlist: Allowlist,
    pub audit: AuditHandle,
    pub counters: Counters,
    pub dashboard_rate_limiter: RateLimiter,
    pub ready: Ready,
    pub upstream_client: reqwest::Client,
    pub audit_pool: SqlitePool,
    /// Live connection count against `config.max_connections`; excess
    /// connections receive a 503 rather than being queued.
    pub active_connections: AtomicUsize,
}

impl AppState {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: Config,
        scanner: Scanner,
        keystore: KeyStore,
        allowlist: Allowlist,
        audit: AuditHandle,
        audit_pool: SqlitePool,
        ready: Ready,
    ) -> Self {
        let upstream_client = reqwest::Client::builder()
            .pool_max_idle_per_host(config.upstream_connection_pool)
            .timeout(Duration::from_secs(120))
            .build()
            .expect("building the upstream http client");

        AppState(Arc::new(Inner {
            dashboard_rate_limiter: RateLimiter::new(ongarde_config::KEY_MGMT_RATE_LIMIT_PER_MIN),
            config,
            scanner,
            keystore,
            allowlist,
            audit,
            counters: Counters::new(),
            ready,
            upstream_client,
            audit_pool,
            active_connections: AtomicUsize::new(0),
        }))
    }
}

impl std::ops::Deref for AppState {
    type Target = Inner;

    fn deref(&self) -> &Inner {
        &self.0
    }
}
