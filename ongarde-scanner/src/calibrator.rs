//! Startup self-calibration for the NLP/PII path. The fast-path regex table
//! runs unconditionally on every request; the NLP pass is only worth
//! running synchronously on request
//! bodies short enough that it stays inside the proxy's latency budget. This
//! module measures that budget once at startup against a fixed synthetic
//! corpus (no network, no disk) and derives a length cutoff.

use std::time::{Duration, Instant};

use crate::pii;
use crate::result::ScanOrigin;

/// Synthetic bodies scanned during calibration, deliberately built from the
/// same entity shapes the PII recognizers look for so the timing reflects
/// real match-path cost, not just a miss-everywhere scan.
const SAMPLE_SHORT: &str = "Contact support at jane.doe@example.com or 555-123-4567 for help.";
const SAMPLE_MEDIUM: &str = "Please reach out to jane.doe@example.com, call 555-123-4567, or mail a check. My card is 4532-0151-1283-0366 and my SSN is 123-45-6788. Let me know if you need my wallet address bc1qar0srrr7xfkvy5l643lydnw9re59gtzzwf5mdq for the refund, thanks so much for your patience while we sort out the billing discrepancy from last month's invoice.";
const SAMPLE_LONG: &str = "This is a long customer support transcript with no sensitive content repeated several times to pad it out to roughly a thousand characters so the calibrator can measure NLP scan cost at the largest size class it cares about. This is a long customer support transcript with no sensitive content repeated several times to pad it out to roughly a thousand characters so the calibrator can measure NLP scan cost at the largest size class it cares about. This is a long customer support transcript with no sensitive content repeated several times to pad it out to roughly a thousand characters so the calibrator can measure NLP scan cost at the largest size class it cares about.";

const RUNS_PER_SAMPLE: usize = 20;

/// The result of one calibration pass: a length (in chars) above which the
/// NLP scan runs advisory-only (spawned, not awaited) instead of inline.
#[derive(Clone, Copy, Debug)]
pub struct Calibration {
    pub sync_threshold: usize,
    pub p50: Duration,
    pub p99: Duration,
}

impl Calibration {
    /// `text.len()` at or below this runs the NLP scan synchronously on the
    /// request path; above it, the scan is advisory-only (an advisory
    /// result never escalates back to blocking after the fact).
    pub fn should_scan_sync(&self, len: usize) -> bool {
        len <= self.sync_threshold
    }
}

fn measure(sample: &str) -> Vec<Duration> {
    (0..RUNS_PER_SAMPLE)
        .map(|_| {
            let start = Instant::now();
            let _ = pii::scan(sample, ScanOrigin::Nlp);
            start.elapsed()
        })
        .collect()
}

fn percentile(mut samples: Vec<Duration>, pct: f64) -> Duration {
    samples.sort();
    let idx = ((samples.len() as f64 - 1.0) * pct).round() as usize;
    samples[idx]
}

/// Runs the calibration corpus and derives a threshold via a step-down
/// function: start from the largest size class measured and back off while
/// p99 still exceeds the per-request scan budget, down to `0` (never
/// synchronous) if even the shortest sample blows the budget.
pub fn calibrate(budget: Duration) -> Calibration {
    let short = measure(SAMPLE_SHORT);
    let medium = measure(SAMPLE_MEDIUM);
    let long = measure(SAMPLE_LONG);

    let long_p99 = percentile(long.clone(), 0.99);
    let medium_p99 = percentile(medium.clone(), 0.99);
    let short_p99 = percentile(short.clone(), 0.99);

    let (sync_threshold, p50, p99) = if long_p99 <= budget {
        (512, percentile(long, 0.50), long_p99)
    } else if medium_p99 <= budget {
        (256, percentile(medium, 0.50), medium_p99)
    } else if short_p99 <= budget {
        (128, percentile(short.clone(), 0.50), short_p99)
    } else if short_p99 <= budget.saturating_mul(2) {
        (64, percentile(short, 0.50), short_p99)
    } else {
        (0, percentile(short, 0.50), short_p99)
    };

    tracing::info!(
        sync_threshold,
        p50_us = p50.as_micros() as u64,
        p99_us = p99.as_micros() as u64,
        "nlp scanner calibrated"
    );

    Calibration { sync_threshold, p50, p99 }
}
