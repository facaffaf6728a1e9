//! The audit sink: a bounded channel feeding a single SQLite writer that
//! batches inserts in one transaction per drain, a long-lived task owning
//! the database handle for its whole lifetime rather than reopening it per
//! event. A pluggable `AuditSink` lets a future remote backend observe the
//! same stream without touching the channel or the primary writer.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::SqlitePool;
use tokio::sync::mpsc;

use ongarde_core::Sid;

const CHANNEL_CAPACITY: usize = 1024;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditKind {
    Block,
    PassAdvisory,
    AllowSuppressed,
    ScannerError,
}

impl AuditKind {
    fn as_str(&self) -> &'static str {
        match self {
            AuditKind::Block => "BLOCK",
            AuditKind::PassAdvisory => "PASS_ADVISORY",
            AuditKind::AllowSuppressed => "ALLOW_SUPPRESSED",
            AuditKind::ScannerError => "SCANNER_ERROR",
        }
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct AuditEvent {
    pub scan_id: String,
    pub ts: DateTime<Utc>,
    pub kind: AuditKind,
    pub decision: String,
    pub rule_id: Option<String>,
    pub risk_level: Option<String>,
    pub excerpt: Option<String>,
    pub source_key_id: Option<String>,
    pub upstream_target: String,
    pub was_streaming: bool,
    pub tokens_delivered: Option<u64>,
    pub test: bool,
    pub suppressed_by_allowlist: bool,
}

impl AuditEvent {
    pub fn new(kind: AuditKind, decision: &str, upstream_target: impl Into<String>) -> Self {
        AuditEvent {
            scan_id: Sid::new().to_string(),
            ts: Utc::now(),
            kind,
            decision: decision.to_string(),
            rule_id: None,
            risk_level: None,
            excerpt: None,
            source_key_id: None,
            upstream_target: upstream_target.into(),
            was_streaming: false,
            tokens_delivered: None,
            test: false,
            suppressed_by_allowlist: false,
        }
    }
}

/// A pluggable observer of the audit stream. Failures here never block the
/// primary SQLite write and are logged, not propagated.
pub trait AuditSink: Send + Sync {
    fn observe(&self, event: &AuditEvent);
}

pub struct NullSink;
impl AuditSink for NullSink {
    fn observe(&self, _event: &AuditEvent) {}
}

/// The sending half, cloned into every request task. Sends are
/// non-blocking: a full channel drops the event and bumps a metric rather
/// than stalling the request path.
#[derive(Clone)]
pub struct AuditHandle {
    tx: mpsc::Sender<AuditEvent>,
    dropped: std::sync::Arc<std::sync::atomic::AtomicU64>,
}

impl AuditHandle {
    pub fn record(&self, event: AuditEvent) {
        if let Err(mpsc::error::TrySendError::Full(_)) = self.tx.try_send(event) {
            self.dropped.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
            tracing::warn!("audit channel full, dropping event");
        }
    }

    pub fn dropped_count(&self) -> u64 {
        self.dropped.load(std::sync::atomic::Ordering::Relaxed)
    }
}

/// Spawns the single writer task and returns the handle used by request
/// tasks to enqueue events. The task runs until every `AuditHandle` clone is
/// dropped, mirroring `ongarde-core::drain`'s drop-driven shutdown.
pub fn spawn(pool: SqlitePool, remote: Option<Box<dyn AuditSink>>) -> AuditHandle {
    let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
    let dropped = std::sync::Arc::new(std::sync::atomic::AtomicU64::new(0));
    tokio::spawn(writer_loop(pool, rx, remote));
    AuditHandle { tx, dropped }
}

async fn writer_loop(pool: SqlitePool, mut rx: mpsc::Receiver<AuditEvent>, remote: Option<Box<dyn AuditSink>>) {
    let mut batch = Vec::with_capacity(64);
    loop {
        let received = rx.recv_many(&mut batch, 64).await;
        if received == 0 {
            break;
        }
        if let Err(err) = write_batch(&pool, &batch).await {
            tracing::error!(error = %err, "failed to write audit batch");
        }
        if let Some(sink) = &remote {
            for event in &batch {
                sink.observe(event);
            }
        }
        batch.clear();
    }
}

/// The most recent `limit` events, newest first, for the dashboard's
/// `GET /dashboard/api/events?limit=N` endpoint.
pub async fn recent(pool: &SqlitePool, limit: i64) -> anyhow::Result<Vec<AuditEvent>> {
    let rows: Vec<(
        String,
        String,
        String,
        String,
        Option<String>,
        Option<String>,
        Option<String>,
        Option<String>,
        String,
        bool,
        Option<i64>,
        bool,
        bool,
    )> = sqlx::query_as(
        "SELECT scan_id, ts, kind, decision, rule_id, risk_level, excerpt, source_key_id,
                upstream_target, was_streaming, tokens_delivered, test, suppressed_by_allowlist
         FROM audit_events ORDER BY ts DESC LIMIT ?",
    )
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(
            |(scan_id, ts, kind, decision, rule_id, risk_level, excerpt, source_key_id, upstream_target, was_streaming, tokens_delivered, test, suppressed_by_allowlist)| {
                AuditEvent {
                    scan_id,
                    ts: DateTime::parse_from_rfc3339(&ts).map(|d| d.with_timezone(&Utc)).unwrap_or_else(|_| Utc::now()),
                    kind: kind_from_str(&kind),
                    decision,
                    rule_id,
                    risk_level,
                    excerpt,
                    source_key_id,
                    upstream_target,
                    was_streaming,
                    tokens_delivered: tokens_delivered.map(|t| t as u64),
                    test,
                    suppressed_by_allowlist,
                }
            },
        )
        .collect())
}

fn kind_from_str(s: &str) -> AuditKind {
    match s {
        "PASS_ADVISORY" => AuditKind::PassAdvisory,
        "ALLOW_SUPPRESSED" => AuditKind::AllowSuppressed,
        "SCANNER_ERROR" => AuditKind::ScannerError,
        _ => AuditKind::Block,
    }
}

async fn write_batch(pool: &SqlitePool, events: &[AuditEvent]) -> anyhow::Result<()> {
    let mut tx = pool.begin().await?;
    for e in events {
        sqlx::query(
            "INSERT OR REPLACE INTO audit_events
             (scan_id, ts, kind, decision, rule_id, risk_level, excerpt, source_key_id,
              upstream_target, was_streaming, tokens_delivered, test, suppressed_by_allowlist)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&e.scan_id)
        .bind(e.ts.to_rfc3339())
        .bind(e.kind.as_str())
        .bind(&e.decision)
        .bind(&e.rule_id)
        .bind(&e.risk_level)
        .bind(&e.excerpt)
        .bind(&e.source_key_id)
        .bind(&e.upstream_target)
        .bind(e.was_streaming)
        .bind(e.tokens_delivered.map(|t| t as i64))
        .bind(e.test)
        .bind(e.suppressed_by_allowlist)
        .execute(&mut *tx)
        .await?;
    }
    tx.commit().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;

    #[tokio::test]
    async fn recorded_event_lands_in_the_database() {
        let dir = tempfile::tempdir().unwrap();
        let pool = db::open(&dir.path().join("audit.db")).await.unwrap();
        let handle = spawn(pool.clone(), None);

        let event = AuditEvent::new(AuditKind::Block, "BLOCK", "openai");
        let scan_id = event.scan_id.clone();
        handle.record(event);
        drop(handle);

        // Give the writer task a moment to drain the channel.
        for _ in 0..20 {
            let row: Option<(String,)> = sqlx::query_as("SELECT scan_id FROM audit_events WHERE scan_id = ?")
                .bind(&scan_id)
                .fetch_optional(&pool)
                .await
                .unwrap();
            if row.is_some() {
                return;
            }
            tokio::time::sleep(std::time::Duration::from_millis(25)).await;
        }
        panic!("audit event was not written within the timeout");
    }

    #[test]
    fn audit_kind_round_trips_to_screaming_snake_case() {
        assert_eq!(AuditKind::AllowSuppressed.as_str(), "ALLOW_SUPPRESSED");
    }

    #[tokio::test]
    async fn recent_returns_newest_first() {
        let dir = tempfile::tempdir().unwrap();
        let pool = db::open(&dir.path().join("audit.db")).await.unwrap();
        let handle = spawn(pool.clone(), None);

        let first = AuditEvent::new(AuditKind::Block, "BLOCK", "openai");
        let second_id = Sid::new().to_string();
        let mut second = AuditEvent::new(AuditKind::Block, "BLOCK", "openai");
        second.scan_id = second_id.clone();
        handle.record(first);
        handle.record(second);
        drop(handle);

        for _ in 0..20 {
            let events = recent(&pool, 10).await.unwrap();
            if events.len() == 2 {
                assert_eq!(events[0].scan_id, second_id);
                return;
            }
            tokio::time::sleep(std::time::Duration::from_millis(25)).await;
        }
        panic!("audit events were not written within the timeout");
    }
}
