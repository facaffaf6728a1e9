//! Glues a raw `ScanResult` to the allowlist and the audit sink: every
//! blocking result passes through here before a caller acts on it, so the
//! downgrade-and-audit behavior lives in exactly one place.

use ongarde_scanner::{Decision, RiskLevel as ScanRiskLevel, ScanResult};
use ongarde_store::{AuditEvent, AuditKind, RiskLevel as StoreRiskLevel};

use crate::state::AppState;

fn map_risk(level: ScanRiskLevel) -> StoreRiskLevel {
    match level {
        ScanRiskLevel::Low => StoreRiskLevel::Low,
        ScanRiskLevel::Medium => StoreRiskLevel::Medium,
        ScanRiskLevel::High => StoreRiskLevel::High,
        ScanRiskLevel::Critical => StoreRiskLevel::Critical,
    }
}

fn decision_str(result: &ScanResult) -> &'static str {
    match result.decision {
        Decision::Pass => "PASS",
        Decision::Block => "BLOCK",
        Decision::Error => "ERROR",
    }
}

/// Checks a blocking `ScanResult` against the allowlist, recording whichever
/// audit event applies, and returns the *effective* result the caller should
/// act on (a PASS if the allowlist downgraded it).
pub fn resolve(
    state: &AppState,
    result: ScanResult,
    upstream_target: &str,
    was_streaming: bool,
    source_key_id: Option<&str>,
) -> ScanResult {
    if !result.is_blocking() {
        return result;
    }

    let rule_id = result.rule_id.clone().unwrap_or_default();
    // The allowlist must compare against the raw matched text -- `excerpt`
    // on `result` is not yet redacted (see `ScanResult::block`). Only the
    // copy placed on the audit event is redacted.
    let excerpt = result.excerpt.clone().unwrap_or_default();

    if state.allowlist.check(&rule_id, &excerpt).is_some() {
        let mut event = AuditEvent::new(AuditKind::AllowSuppressed, "PASS", upstream_target);
        event.scan_id = result.scan_id.to_string();
        event.rule_id = Some(rule_id);
        event.risk_level = result.risk_level.map(|r| r.to_string());
        event.excerpt = Some(ongarde_scanner::redact(&excerpt));
        event.source_key_id = source_key_id.map(str::to_string);
        event.was_streaming = was_streaming;
        event.test = result.test;
        event.suppressed_by_allowlist = true;
        state.audit.record(event);
        return ScanResult::pass(result.origin);
    }

    let mut event = AuditEvent::new(AuditKind::Block, decision_str(&result), upstream_target);
    event.scan_id = result.scan_id.to_string();
    event.rule_id = result.rule_id.clone();
    event.risk_level = result.risk_level.map(|r| r.to_string());
    event.excerpt = result.excerpt.as_deref().map(ongarde_scanner::redact);
    event.source_key_id = source_key_id.map(str::to_string);
    event.was_streaming = was_streaming;
    event.tokens_delivered = result.tokens_delivered;
    event.test = result.test;
    state.audit.record(event);

    if let Some(risk) = result.risk_level {
        state.counters.record_block(map_risk(risk), result.test);
    }

    result
}

/// Records a non-blocking advisory NLP result: logging/metrics only, never
/// escalated to a block on a later request.
pub fn record_advisory(state: &AppState, result: ScanResult, upstream_target: &str) {
    if result.is_pass() {
        return;
    }
    let mut event = AuditEvent::new(AuditKind::PassAdvisory, decision_str(&result), upstream_target);
    event.scan_id = result.scan_id.to_string();
    event.rule_id = result.rule_id.clone();
    event.risk_level = result.risk_level.map(|r| r.to_string());
    event.excerpt = result.excerpt.as_deref().map(ongarde_scanner::redact);
    event.test = result.test;
    state.audit.record(event);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn map_risk_preserves_critical() {
        assert_eq!(map_risk(ScanRiskLevel::Critical), StoreRiskLevel::Critical);
    }
}
