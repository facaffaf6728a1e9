//! Sortable identifiers used for `scan_id`, `request_id` and `ApiKey::id`.
//!
//! A real ULID crate would be the obvious choice, but nothing in the
//! dependency stack brings one in, so we roll the same shape ourselves:
//! a millisecond timestamp followed by a monotonic counter and a random
//! tail, base32-encoded so the result sorts lexically the same way it
//! sorts chronologically.

use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use rand::Rng;

const ENCODING: &[u8; 32] = b"0123456789ABCDEFGHJKMNPQRSTVWXYZ";

static COUNTER: AtomicU32 = AtomicU32::new(0);

/// A lexically-sortable opaque identifier, e.g. `01HZY3K8N4QJX7VZRNDG2Q6F3T`.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize)]
pub struct Sid([u8; 26]);

impl Sid {
    pub fn new() -> Self {
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("system clock before unix epoch")
            .as_millis() as u64;
        let seq = COUNTER.fetch_add(1, Ordering::Relaxed) as u64 & 0x3ff;
        let tail: u64 = rand::rng().random::<u32>() as u64;

        // 48 bits of time, 10 bits of sequence, 32 bits of randomness: 90 bits,
        // comfortably more than the 80 a ULID spends on randomness alone.
        let hi = (millis << 16) | (seq << 6) | (tail >> 26);
        let lo = tail & 0x3ff_ffff;

        let mut buf = [0u8; 26];
        let mut hi = hi;
        let mut lo = lo;
        for slot in buf.iter_mut().rev().take(13) {
            *slot = ENCODING[(lo % 32) as usize];
            lo /= 32;
        }
        for slot in buf.iter_mut().rev().skip(13) {
            *slot = ENCODING[(hi % 32) as usize];
            hi /= 32;
        }
        Sid(buf)
    }

    pub fn as_str(&self) -> &str {
        // Safe: every byte comes from the ASCII ENCODING table.
        std::str::from_utf8(&self.0).expect("sid is ascii by construction")
    }
}

impl Default for Sid {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for Sid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Debug for Sid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Sid({})", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sids_are_roughly_monotonic() {
        let a = Sid::new();
        std::thread::sleep(std::time::Duration::from_millis(2));
        let b = Sid::new();
        assert!(a.as_str() < b.as_str(), "{a} should sort before {b}");
    }

    #[test]
    fn sid_is_fixed_width_ascii() {
        let s = Sid::new();
        assert_eq!(s.as_str().len(), 26);
        assert!(s.as_str().bytes().all(|b| ENCODING.contains(&b)));
    }
}
