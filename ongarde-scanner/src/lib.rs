//! The two-tier scanner: a regex fast path, an NLP/PII
//! slow path gated by a calibrated length threshold, and a stateful
//! streaming variant for SSE responses. Consumers (`ongarde-proxy`) talk to
//! this crate only through [`Scanner`]; the rule catalog and per-path
//! internals are module-private implementation detail.

pub mod calibrator;
pub mod extract;
pub mod fast_path;
pub mod pii;
pub mod result;
pub mod rules;
pub mod streaming;

pub use calibrator::Calibration;
pub use result::{Decision, RiskLevel, ScanOrigin, ScanResult, redact};
pub use rules::RuleDef;
pub use streaming::{StreamOutcome, StreamingScanner};

use std::time::Duration;

/// Per-request latency budget the calibrator measures against: NLP stays
/// synchronous only while it keeps total added latency under this budget.
pub const SCAN_LATENCY_BUDGET: Duration = Duration::from_millis(50);

/// Facade combining the fast path, the calibrated NLP gate, and rule lookup.
/// One instance is built at startup and shared read-only across requests —
/// the compiled regex table and the calibration are both immutable after
/// [`Scanner::new`] returns.
pub struct Scanner {
    calibration: Calibration,
    lite_mode: bool,
}

impl Scanner {
    /// Warms the fast path and runs calibration. `lite_mode` disables the
    /// NLP path entirely regardless of the calibrated threshold.
    pub fn new(lite_mode: bool) -> Self {
        fast_path::warm_up();
        let calibration = calibrator::calibrate(SCAN_LATENCY_BUDGET);
        Scanner { calibration, lite_mode }
    }

    pub fn calibration(&self) -> Calibration {
        self.calibration
    }

    pub fn is_lite_mode(&self) -> bool {
        self.lite_mode
    }

    /// Runs the regex fast path unconditionally, then, if the text is short
    /// enough (or lite mode is off) and under the calibrated threshold, runs
    /// the NLP path synchronously. Returns the first blocking result, or a
    /// PASS if both passed; the caller decides whether to also spawn an
    /// advisory background NLP scan when the sync gate was skipped.
    pub fn scan_request(&self, text: &str) -> ScanResult {
        let fast = fast_path::scan(text);
        if fast.is_blocking() {
            return fast;
        }
        if self.lite_mode || !self.calibration.should_scan_sync(text.chars().count()) {
            return fast;
        }
        let nlp = pii::scan(text, ScanOrigin::Nlp);
        if nlp.is_blocking() { nlp } else { fast }
    }

    /// True when `text` exceeded the sync threshold and should instead be
    /// handed to an advisory background task by the caller.
    pub fn needs_advisory_scan(&self, text: &str) -> bool {
        !self.lite_mode && !self.calibration.should_scan_sync(text.chars().count())
    }

    /// Runs an advisory NLP pass. The result can only ever produce an audit
    /// event — never escalated to a blocking decision later.
    pub fn scan_advisory(&self, text: &str) -> ScanResult {
        pii::scan(text, ScanOrigin::Nlp)
    }

    /// Buffered response scan: always runs both paths regardless of size,
    /// since the response is fully in memory already.
    pub fn scan_buffered_response(&self, text: &str) -> ScanResult {
        let fast = fast_path::scan(text);
        if fast.is_blocking() {
            return fast;
        }
        if self.lite_mode {
            return fast;
        }
        let nlp = pii::scan(text, ScanOrigin::Nlp);
        if nlp.is_blocking() { nlp } else { fast }
    }

    pub fn new_streaming_scanner(&self) -> StreamingScanner {
        StreamingScanner::new()
    }

    pub fn rule_count(&self) -> usize {
        fast_path::rule_count()
    }

    pub fn lookup_rule(&self, rule_id: &str) -> Option<&'static RuleDef> {
        rules::find(rule_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scan_request_blocks_on_fast_path_hit() {
        let scanner = Scanner::new(false);
        let result = scanner.scan_request("run: sudo rm -rf /");
        assert!(result.is_blocking());
    }

    #[test]
    fn scan_request_blocks_on_nlp_hit_when_under_threshold() {
        let scanner = Scanner::new(false);
        let result = scanner.scan_request("my card is 4532-0151-1283-0366 please charge it");
        assert!(result.is_blocking());
    }

    #[test]
    fn lite_mode_skips_nlp_entirely() {
        let scanner = Scanner::new(true);
        let result = scanner.scan_request("my card is 4532-0151-1283-0366 please charge it");
        assert!(result.is_pass());
    }

    #[test]
    fn buffered_response_scan_runs_nlp_regardless_of_length() {
        let scanner = Scanner::new(false);
        let long_text = format!("{} contact me at jane.doe@example.com", "filler ".repeat(200));
        let result = scanner.scan_buffered_response(&long_text);
        assert!(result.is_blocking());
    }
}
