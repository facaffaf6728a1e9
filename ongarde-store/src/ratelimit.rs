//! Fixed-window rate limiter for key-management endpoints (20
//! requests/minute/source IP). A `DashMap` keyed by IP stands in for the
//! mutex-plus-copy-on-write-snapshot pattern used for the other mutable
//! singletons — contention here is low enough that a sharded map is
//! simpler than a full RwLock snapshot and still lock-free on the hot path.

use std::net::IpAddr;
use std::time::{Duration, Instant};

use dashmap::DashMap;

pub const KEY_MGMT_LIMIT_PER_MIN: u32 = 20;
const WINDOW: Duration = Duration::from_secs(60);

struct Window {
    started_at: Instant,
    count: u32,
}

pub struct RateLimiter {
    limit: u32,
    windows: DashMap<IpAddr, Window>,
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(KEY_MGMT_LIMIT_PER_MIN)
    }
}

impl RateLimiter {
    pub fn new(limit: u32) -> Self {
        RateLimiter { limit, windows: DashMap::new() }
    }

    /// Returns `true` if `ip` is still under the limit for the current
    /// window, incrementing its count as a side effect.
    pub fn check(&self, ip: IpAddr) -> bool {
        let mut entry = self.windows.entry(ip).or_insert_with(|| Window { started_at: Instant::now(), count: 0 });
        if entry.started_at.elapsed() >= WINDOW {
            entry.started_at = Instant::now();
            entry.count = 0;
        }
        if entry.count >= self.limit {
            return false;
        }
        entry.count += 1;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allows_up_to_the_limit_then_rejects() {
        let limiter = RateLimiter::new(3);
        let ip: IpAddr = "127.0.0.1".parse().unwrap();
        assert!(limiter.check(ip));
        assert!(limiter.check(ip));
        assert!(limiter.check(ip));
        assert!(!limiter.check(ip));
    }

    #[test]
    fn separate_ips_have_independent_windows() {
        let limiter = RateLimiter::new(1);
        let a: IpAddr = "127.0.0.1".parse().unwrap();
        let b: IpAddr = "127.0.0.2".parse().unwrap();
        assert!(limiter.check(a));
        assert!(limiter.check(b));
        assert!(!limiter.check(a));
    }
}
