//! Rolling request/block counters, surfaced in the health and dashboard
//! payloads. Atomics only; no lock sits on the hot path.

use std::sync::atomic::{AtomicU64, Ordering};

/// Mirrors `ongarde_scanner::RiskLevel`'s four levels without depending on
/// the scanner crate from the store; the proxy crate maps between the two
/// at the call site.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

/// EWMA smoothing factor for `avg_scan_ms`; weights the newest sample at
/// 1/8th, a short half-life so a burst of slow scans is visible quickly.
const EWMA_ALPHA: f64 = 0.125;

pub struct Counters {
    requests_today: AtomicU64,
    requests_total: AtomicU64,
    blocks_today: AtomicU64,
    blocks_total: AtomicU64,
    blocks_low: AtomicU64,
    blocks_medium: AtomicU64,
    blocks_high: AtomicU64,
    blocks_critical: AtomicU64,
    avg_scan_ms_bits: AtomicU64,
    queue_depth: AtomicU64,
}

impl Default for Counters {
    fn default() -> Self {
        Self::new()
    }
}

impl Counters {
    pub fn new() -> Self {
        Counters {
            requests_today: AtomicU64::new(0),
            requests_total: AtomicU64::new(0),
            blocks_today: AtomicU64::new(0),
            blocks_total: AtomicU64::new(0),
            blocks_low: AtomicU64::new(0),
            blocks_medium: AtomicU64::new(0),
            blocks_high: AtomicU64::new(0),
            blocks_critical: AtomicU64::new(0),
            avg_scan_ms_bits: AtomicU64::new(0),
            queue_depth: AtomicU64::new(0),
        }
    }

    pub fn record_request(&self) {
        self.requests_today.fetch_add(1, Ordering::Relaxed);
        self.requests_total.fetch_add(1, Ordering::Relaxed);
    }

    /// Test-credential blocks still count for audit purposes but are
    /// excluded from this user-visible counter.
    pub fn record_block(&self, risk_level: RiskLevel, is_test: bool) {
        if is_test {
            return;
        }
        self.blocks_today.fetch_add(1, Ordering::Relaxed);
        self.blocks_total.fetch_add(1, Ordering::Relaxed);
        let bucket = match risk_level {
            RiskLevel::Low => &self.blocks_low,
            RiskLevel::Medium => &self.blocks_medium,
            RiskLevel::High => &self.blocks_high,
            RiskLevel::Critical => &self.blocks_critical,
        };
        bucket.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_scan_ms(&self, sample_ms: f64) {
        let prev = f64::from_bits(self.avg_scan_ms_bits.load(Ordering::Relaxed));
        let next = if prev == 0.0 { sample_ms } else { prev + EWMA_ALPHA * (sample_ms - prev) };
        self.avg_scan_ms_bits.store(next.to_bits(), Ordering::Relaxed);
    }

    pub fn set_queue_depth(&self, depth: u64) {
        self.queue_depth.store(depth, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> CountersSnapshot {
        CountersSnapshot {
            requests_today: self.requests_today.load(Ordering::Relaxed),
            requests_total: self.requests_total.load(Ordering::Relaxed),
            blocks_today: self.blocks_today.load(Ordering::Relaxed),
            blocks_total: self.blocks_total.load(Ordering::Relaxed),
            blocks_low: self.blocks_low.load(Ordering::Relaxed),
            blocks_medium: self.blocks_medium.load(Ordering::Relaxed),
            blocks_high: self.blocks_high.load(Ordering::Relaxed),
            blocks_critical: self.blocks_critical.load(Ordering::Relaxed),
            avg_scan_ms: f64::from_bits(self.avg_scan_ms_bits.load(Ordering::Relaxed)),
            queue_depth: self.queue_depth.load(Ordering::Relaxed),
        }
    }

    /// Resets the "today" counters; called by a daily rollover task. Leaves
    /// all-time counters untouched.
    pub fn roll_over_day(&self) {
        self.requests_today.store(0, Ordering::Relaxed);
        self.blocks_today.store(0, Ordering::Relaxed);
    }
}

#[derive(Clone, Copy, Debug, serde::Serialize)]
pub struct CountersSnapshot {
    pub requests_today: u64,
    pub requests_total: u64,
    pub blocks_today: u64,
    pub blocks_total: u64,
    pub blocks_low: u64,
    pub blocks_medium: u64,
    pub blocks_high: u64,
    pub blocks_critical: u64,
    pub avg_scan_ms: f64,
    pub queue_depth: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credential_blocks_do_not_count() {
        let c = Counters::new();
        c.record_block(RiskLevel::Critical, true);
        assert_eq!(c.snapshot().blocks_total, 0);
    }

    #[test]
    fn real_blocks_increment_risk_bucket() {
        let c = Counters::new();
        c.record_block(RiskLevel::High, false);
        let snap = c.snapshot();
        assert_eq!(snap.blocks_total, 1);
        assert_eq!(snap.blocks_high, 1);
    }

    #[test]
    fn ewma_converges_toward_repeated_samples() {
        let c = Counters::new();
        for _ in 0..50 {
            c.record_scan_ms(10.0);
        }
        assert!((c.snapshot().avg_scan_ms - 10.0).abs() < 0.5);
    }

    #[test]
    fn day_rollover_preserves_all_time_totals() {
        let c = Counters::new();
        c.record_request();
        c.record_block(RiskLevel::Low, false);
        c.roll_over_day();
        let snap = c.snapshot();
        assert_eq!(snap.requests_today, 0);
        assert_eq!(snap.requests_total, 1);
        assert_eq!(snap.blocks_today, 0);
        assert_eq!(snap.blocks_total, 1);
    }
}
