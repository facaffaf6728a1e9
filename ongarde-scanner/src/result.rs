//! `ScanResult` and the enums it is built from.

use ongarde_core::Sid;
use serde::Serialize;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Decision {
    Pass,
    Block,
    Error,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            RiskLevel::Low => "LOW",
            RiskLevel::Medium => "MEDIUM",
            RiskLevel::High => "HIGH",
            RiskLevel::Critical => "CRITICAL",
        };
        f.write_str(s)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanOrigin {
    FastPath,
    Nlp,
    Streaming,
    Error,
}

/// The outcome of running one or more rules against a piece of text.
/// Invariant: `Decision::Error` is always treated as `Decision::Block` by
/// every consumer (fail-safe: a scanning failure never fails open).
#[derive(Clone, Debug, Serialize)]
pub struct ScanResult {
    pub decision: Decision,
    pub rule_id: Option<String>,
    pub risk_level: Option<RiskLevel>,
    /// The raw matched text, unredacted. The allowlist matches against this
    /// directly; every consumer that surfaces an excerpt externally (audit
    /// events, client error bodies, stream-abort frames) redacts it first
    /// via [`redact`].
    pub excerpt: Option<String>,
    pub scan_id: Sid,
    pub origin: ScanOrigin,
    pub tokens_delivered: Option<u64>,
    pub test: bool,
}

impl ScanResult {
    pub fn pass(origin: ScanOrigin) -> Self {
        ScanResult {
            decision: Decision::Pass,
            rule_id: None,
            risk_level: None,
            excerpt: None,
            scan_id: Sid::new(),
            origin,
            tokens_delivered: None,
            test: false,
        }
    }

    /// `excerpt` is kept as the raw matched text, not yet redacted: the
    /// allowlist needs to compare against what actually matched
    /// (`text_contains`/`regex` entries are written against real excerpts).
    /// Callers redact via [`redact`] at the point the excerpt crosses into an
    /// audit event or a client-visible response.
    pub fn block(rule_id: impl Into<String>, risk_level: RiskLevel, excerpt: impl Into<String>, origin: ScanOrigin, test: bool) -> Self {
        ScanResult {
            decision: Decision::Block,
            rule_id: Some(rule_id.into()),
            risk_level: Some(risk_level),
            excerpt: Some(excerpt.into()),
            scan_id: Sid::new(),
            origin,
            tokens_delivered: None,
            test,
        }
    }

    pub fn error(origin: ScanOrigin) -> Self {
        ScanResult {
            decision: Decision::Error,
            rule_id: Some("SCANNER_ERROR".to_string()),
            risk_level: Some(RiskLevel::Critical),
            excerpt: None,
            scan_id: Sid::new(),
            origin,
            tokens_delivered: None,
            test: false,
        }
    }

    pub fn is_pass(&self) -> bool {
        matches!(self.decision, Decision::Pass)
    }

    /// ERROR is BLOCK to every consumer.
    pub fn is_blocking(&self) -> bool {
        matches!(self.decision, Decision::Block | Decision::Error)
    }
}

/// Redacts a matched excerpt down to a bounded, non-reversible preview:
/// keeps the first and last few characters and masks the middle. Audit
/// events and client error bodies only ever see the redacted form.
pub fn redact(excerpt: &str) -> String {
    const KEEP: usize = 3;
    let chars: Vec<char> = excerpt.chars().collect();
    if chars.len() <= KEEP * 2 {
        return "*".repeat(chars.len().max(1));
    }
    let head: String = chars[..KEEP].iter().collect();
    let tail: String = chars[chars.len() - KEEP..].iter().collect();
    format!("{head}{}{tail}", "*".repeat(6))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn redact_keeps_head_and_tail_only() {
        let r = redact("sk-proj-AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA");
        assert!(r.starts_with("sk-"));
        assert!(!r.contains("AAAAAAAAAAAA"));
    }

    #[test]
    fn error_is_treated_as_block() {
        let e = ScanResult::error(ScanOrigin::Error);
        assert!(e.is_blocking());
        assert!(!e.is_pass());
    }
}
