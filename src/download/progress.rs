//! Download progress accounting and rate limiting of progress callbacks

use std::time::{Duration, Instant};

use crate::types::DownloadProgress;

/// Rate-limiter for progress updates
///
/// The first check always passes, later ones only once `min_interval` has elapsed since the
/// last accepted one.
#[derive(Debug)]
pub struct ProgressThrottle {
    last_emit: Option<Instant>,
    min_interval: Duration,
}

impl ProgressThrottle {
    /// Create a throttle with the given minimum interval
    pub const fn new(min_interval: Duration) -> Self {
        Self {
            last_emit: None,
            min_interval,
        }
    }

    /// Whether enough time has passed to emit another update
    pub fn should_emit(&mut self) -> bool {
        let now = Instant::now();
        match self.last_emit {
            Some(last) if now.duration_since(last) < self.min_interval => false,
            _ => {
                self.last_emit = Some(now);
                true
            }
        }
    }
}

/// Byte accounting for one transfer
///
/// Produces [`DownloadProgress`] snapshots whose `ratio` never decreases and is exactly `1.0`
/// in the snapshot returned by [`finish`](Self::finish).
#[derive(Debug)]
pub struct ProgressTracker {
    total: Option<u64>,
    received: u64,
    started: Instant,
    last_ratio: f64,
    throttle: ProgressThrottle,
}

impl ProgressTracker {
    /// Start tracking a transfer of `total` bytes (if known)
    pub fn new(total: Option<u64>, interval: Duration) -> Self {
        Self {
            total: total.filter(|t| *t > 0),
            received: 0,
            started: Instant::now(),
            last_ratio: 0.0,
            throttle: ProgressThrottle::new(interval),
        }
    }

    /// Bytes received so far
    pub fn received(&self) -> u64 {
        self.received
    }

    /// Expected size, when known
    pub fn total(&self) -> Option<u64> {
        self.total
    }

    /// Record `bytes` more and return a snapshot if the throttle allows one
    pub fn advance(&mut self, bytes: u64) -> Option<DownloadProgress> {
        self.received = self.received.saturating_add(bytes);
        if self.throttle.should_emit() {
            Some(self.snapshot())
        } else {
            None
        }
    }

    /// Final snapshot: everything received, ratio pinned to 1.0
    ///
    /// `total` becomes the received byte count, replacing an estimate that was off.
    pub fn finish(&mut self) -> DownloadProgress {
        self.last_ratio = 1.0;
        let mut progress = self.snapshot();
        progress.total = self.received;
        progress.eta = 0;
        progress
    }

    fn snapshot(&mut self) -> DownloadProgress {
        let ratio = match self.total {
            Some(total) => (self.received as f64 / total as f64).min(1.0),
            None => 0.0,
        };
        self.last_ratio = self.last_ratio.max(ratio);

        let elapsed = self.started.elapsed().as_secs_f64();
        let rate = if elapsed > 0.0 {
            self.received as f64 / elapsed
        } else {
            0.0
        };
        let eta = match self.total {
            Some(total) if rate > 0.0 => (total.saturating_sub(self.received) as f64 / rate) as u64,
            _ => 0,
        };

        DownloadProgress {
            total: self.total.unwrap_or(0),
            received: self.received,
            ratio: self.last_ratio,
            rate,
            eta,
        }
    }
}
