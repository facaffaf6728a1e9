//! Structured logging setup: a single global subscriber, `RUST_LOG`-driven
//! filtering, and a plain/JSON toggle, plus a latency-aware warning helper
//! used on every scan stage.

use std::env;
use std::sync::OnceLock;
use std::time::{Duration, Instant};

use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

static APPLICATION_START_TIME: OnceLock<Instant> = OnceLock::new();

pub fn uptime() -> Duration {
    APPLICATION_START_TIME.get_or_init(Instant::now).elapsed()
}

/// Installs the global tracing subscriber. Call exactly once from `main`.
/// `ONGARDE_LOG` (falling back to `RUST_LOG`, defaulting to `info`) selects
/// the filter; `LOG_FORMAT=json` switches to structured JSON lines.
pub fn setup_logging() {
    let _ = APPLICATION_START_TIME.get_or_init(Instant::now);
    let directive = env::var("ONGARDE_LOG")
        .or_else(|_| env::var("RUST_LOG"))
        .unwrap_or_else(|_| "info".to_string());
    let filter = EnvFilter::try_new(directive).unwrap_or_else(|_| EnvFilter::new("info"));

    let use_json = env::var("LOG_FORMAT").map(|v| v == "json").unwrap_or(false);
    let registry = tracing_subscriber::registry().with(filter);
    if use_json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_target(true))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_target(true))
            .init();
    }
}

/// Emits a `tracing::warn!` when `elapsed` exceeds `budget`, naming the stage.
/// Operations never fail because they were slow, but a slow scan or upstream
/// call is always logged.
pub fn warn_if_slow(stage: &'static str, elapsed: Duration, budget: Duration) {
    if elapsed > budget {
        tracing::warn!(
            stage,
            elapsed_ms = elapsed.as_secs_f64() * 1000.0,
            budget_ms = budget.as_secs_f64() * 1000.0,
            "operation exceeded latency budget"
        );
    }
}
