//! Top-level wiring: turns a loaded [`ongarde_config::Config`] into a bound
//! listener. Grounded on the pack's own `app::run`/`Bound` shape — readiness
//! tasks registered up front and dropped as each dependency finishes
//! initializing, a drain channel handed to long-lived tasks, and a
//! `Bound::wait_termination` that blocks on the shutdown signal before
//! draining.

use std::net::SocketAddr;
use std::sync::atomic::Ordering;
use std::time::Duration;

use axum::body::Body;
use axum::extract::{Request, State};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post};
use axum::Router;
use http::StatusCode;
use ongarde_core::{drain, signal};
use ongarde_scanner::Scanner;
use ongarde_store::{Allowlist, KeyStore};
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::sensitive_headers::SetSensitiveRequestHeadersLayer;
use tower_http::trace::TraceLayer;

use crate::state::AppState;
use crate::{admission, dashboard, gateway, health, loopback};

/// The running process, returned once every startup dependency has bound
/// its listener. Await [`Bound::wait_termination`] from `main`.
pub struct Bound {
    shutdown: signal::Shutdown,
    drain_tx: drain::DrainTrigger,
    pub local_addr: SocketAddr,
    state_dir: std::path::PathBuf,
}

impl Bound {
    /// Blocks until SIGINT/SIGTERM (or an explicit trigger), then drains
    /// outstanding connections with a bounded grace period and removes the
    /// pid file written at startup.
    pub async fn wait_termination(self) -> anyhow::Result<()> {
        self.shutdown.wait().await;
        self.drain_tx.start_drain_and_wait(Duration::from_secs(5)).await;
        ongarde_core::statedir::remove_pid_file(&self.state_dir);
        Ok(())
    }
}

/// Builds every startup dependency (scanner calibration, key store, audit
/// sink, allowlist watcher) and binds the listener. Returns once the socket
/// is bound, not once the server has stopped — that happens in
/// `wait_termination`.
pub async fn run(config: ongarde_config::Config) -> anyhow::Result<Bound> {
    ongarde_core::statedir::ensure_dir(&config.state_dir)?;
    ongarde_core::statedir::write_pid_file(&config.state_dir)?;
    ongarde_core::statedir::harden_file(&config.allowlist_path);

    let ready = ongarde_core::readiness::Ready::new();
    let scanner_task = ready.register_task("scanner");
    let keystore_task = ready.register_task("keystore");

    let audit_pool = ongarde_store::db::open(&config.audit_path).await?;
    ongarde_core::statedir::harden_file(&config.audit_path);
    let keystore = KeyStore::new(audit_pool.clone());
    drop(keystore_task);

    let allowlist = Allowlist::load(&config.allowlist_path)?;
    let audit = ongarde_store::audit::spawn(audit_pool.clone(), None);

    let lite_mode = matches!(config.scanner_mode, ongarde_config::ScannerMode::Lite);
    let scanner = tokio::task::spawn_blocking(move || Scanner::new(lite_mode)).await?;
    drop(scanner_task);

    let state = AppState::new(config.clone(), scanner, keystore, allowlist, audit, audit_pool, ready);

    let router = build_router(state.clone());

    let addr: SocketAddr = format!("{}:{}", config.proxy_host, config.proxy_port).parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    let local_addr = listener.local_addr()?;
    tracing::info!(%local_addr, backlog = config.tcp_backlog, "ongarde proxy listening");

    let shutdown = signal::Shutdown::new();
    let (drain_tx, mut drain_rx) = drain::new();

    tokio::spawn(async move {
        let server = axum::serve(listener, router.into_make_service_with_connect_info::<SocketAddr>())
            .with_graceful_shutdown(async move { drain_rx.signaled().await });
        if let Err(err) = server.await {
            tracing::error!(error = %err, "proxy listener terminated unexpectedly");
        }
    });

    Ok(Bound { shutdown, drain_tx, local_addr, state_dir: config.state_dir.clone() })
}

fn build_router(state: AppState) -> Router {
    let proxy_routes = Router::new()
        .route("/v1/chat/completions", post(gateway::proxy))
        .route("/v1/messages", post(gateway::proxy))
        .layer(middleware::from_fn_with_state(state.clone(), admission::admit));

    let dashboard_api = Router::new()
        .route("/dashboard/api/counters", get(dashboard::counters))
        .route("/dashboard/api/events", get(dashboard::events))
        .route("/dashboard/api/keys", post(dashboard::create_key).get(dashboard::list_keys))
        .route("/dashboard/api/keys/{id}", delete(dashboard::revoke_key));

    let dashboard_ui = Router::new()
        .route("/dashboard", get(dashboard::static_asset))
        .route("/dashboard/{*path}", get(dashboard::static_asset));

    let dashboard_routes = dashboard_api
        .merge(dashboard_ui)
        .layer(middleware::from_fn_with_state(state.clone(), loopback::require_loopback));

    let health_routes = Router::new().route("/health", get(health::health)).route("/health/scanner", get(health::health_scanner));

    let mut router = Router::new()
        .merge(proxy_routes)
        .merge(dashboard_routes)
        .merge(health_routes);

    if std::env::var("DEBUG").is_ok() {
        router = router.route("/docs", get(health::docs));
    }

    router
        .layer(middleware::from_fn_with_state(state.clone(), connection_cap))
        .layer(SetSensitiveRequestHeadersLayer::new([
            http::header::AUTHORIZATION,
            http::HeaderName::from_static("x-ongarde-key"),
        ]))
        .layer(CatchPanicLayer::new())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Enforces the concurrent-connection cap: excess connections are rejected
/// with 503 rather than queued.
async fn connection_cap(State(state): State<AppState>, request: Request<Body>, next: Next) -> Response {
    struct Guard(AppState);
    impl Drop for Guard {
        fn drop(&mut self) {
            self.0.active_connections.fetch_sub(1, Ordering::SeqCst);
        }
    }

    let previous = state.active_connections.fetch_add(1, Ordering::SeqCst);
    let _guard = Guard(state.clone());
    if previous >= state.config.max_connections {
        return (StatusCode::SERVICE_UNAVAILABLE, "concurrency cap reached").into_response();
    }
    next.run(request).await
}
