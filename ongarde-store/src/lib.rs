//! The mutable singletons owned by the running process: the key store and
//! allowlist, plus the audit sink, counters and key-management rate limiter
//! that sit alongside them. Everything here is either a read-write-locked
//! snapshot or a lock-free atomic/sharded map; nothing holds a lock across
//! an `.await`.

pub mod allowlist;
pub mod audit;
pub mod counters;
pub mod db;
pub mod keystore;
pub mod ratelimit;

pub use allowlist::{Allowlist, AllowlistEntry};
pub use audit::{AuditEvent, AuditHandle, AuditKind, AuditSink, NullSink, recent as recent_audit_events};
pub use counters::{Counters, CountersSnapshot, RiskLevel};
pub use keystore::{ApiKeyEntry, KeyStore, key_id};
pub use ratelimit::RateLimiter;
