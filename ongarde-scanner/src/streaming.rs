//! The streaming scanner: a stateful transducer over SSE chunks,
//! not a one-shot function. One instance is owned by the request task for
//! the lifetime of a single outbound stream; no state is shared across
//! streams.

use crate::fast_path;
use crate::result::{ScanOrigin, ScanResult};

const WINDOW_LIMIT: usize = 512;
const OVERLAP_LEN: usize = 128;

/// What the caller should do after feeding a chunk through
/// [`StreamingScanner::add_content`].
pub enum StreamOutcome {
    /// Keep forwarding bytes to the client.
    Continue,
    /// A window scan (or the end-of-stream flush) came back BLOCK. The
    /// caller must stop forwarding assistant bytes and emit the abort
    /// sequence, using the enclosed result.
    Blocked(ScanResult),
}

pub struct StreamingScanner {
    window: String,
    overlap_carry: String,
    aborted: bool,
    cached: Option<ScanResult>,
    chars_forwarded: u64,
}

impl Default for StreamingScanner {
    fn default() -> Self {
        Self::new()
    }
}

impl StreamingScanner {
    pub fn new() -> Self {
        StreamingScanner {
            window: String::new(),
            overlap_carry: String::new(),
            aborted: false,
            cached: None,
            chars_forwarded: 0,
        }
    }

    pub fn is_aborted(&self) -> bool {
        self.aborted
    }

    /// Approximate tokens already delivered to the client before an abort:
    /// `ceil(chars / 4)`, treating one UTF-8 char as one scanned byte for
    /// this heuristic.
    pub fn tokens_delivered(&self) -> u64 {
        self.chars_forwarded.div_ceil(4)
    }

    /// Feeds one chunk's worth of extracted assistant text through the
    /// window/overlap algorithm. Once aborted, this is a constant-time
    /// short-circuit that always replays the cached BLOCK.
    pub fn add_content(&mut self, text: &str) -> StreamOutcome {
        if self.aborted {
            return StreamOutcome::Blocked(self.cached.clone().expect("aborted implies cached result"));
        }
        self.window.push_str(text);
        if self.window.chars().count() < WINDOW_LIMIT {
            self.chars_forwarded += text.chars().count() as u64;
            return StreamOutcome::Continue;
        }
        self.scan_window()
    }

    /// Called once on upstream end-of-stream: scans whatever's left in the
    /// window if it's non-empty.
    pub fn flush(&mut self) -> StreamOutcome {
        if self.aborted {
            return StreamOutcome::Blocked(self.cached.clone().expect("aborted implies cached result"));
        }
        if self.window.is_empty() {
            return StreamOutcome::Continue;
        }
        self.scan_window()
    }

    fn scan_window(&mut self) -> StreamOutcome {
        let combined = format!("{}{}", self.overlap_carry, self.window);
        let result = fast_path::scan_with_origin(&combined, ScanOrigin::Streaming);
        self.overlap_carry = tail_chars(&self.window, OVERLAP_LEN);
        let scanned_len = self.window.chars().count() as u64;
        self.window.clear();

        if result.is_blocking() {
            self.aborted = true;
            self.cached = Some(result.clone());
            StreamOutcome::Blocked(result)
        } else {
            self.chars_forwarded += scanned_len;
            StreamOutcome::Continue
        }
    }
}

fn tail_chars(s: &str, n: usize) -> String {
    let chars: Vec<char> = s.chars().collect();
    if chars.len() <= n {
        chars.into_iter().collect()
    } else {
        chars[chars.len() - n..].iter().collect()
    }
}
