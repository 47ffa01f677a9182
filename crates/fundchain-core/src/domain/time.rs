// SPDX-License-Identifier: Apache-2.0

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

pub type UnixSeconds = u64;

pub const SECONDS_PER_DAY: u64 = 24 * 60 * 60;

/// Wall-clock source. Derivations take `now` as an argument; only the edges read a clock.
pub trait ClockPort: Send + Sync {
    fn now_unix(&self) -> UnixSeconds;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl ClockPort for SystemClock {
    fn now_unix(&self) -> UnixSeconds {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0)
    }
}

/// Settable clock for tests and replays.
#[derive(Debug, Default)]
pub struct FixedClock {
    now: AtomicU64,
}

impl FixedClock {
    #[must_use]
    pub fn new(now: UnixSeconds) -> Self {
        Self {
            now: AtomicU64::new(now),
        }
    }

    pub fn set(&self, now: UnixSeconds) {
        self.now.store(now, Ordering::SeqCst);
    }

    pub fn advance(&self, seconds: u64) {
        self.now.fetch_add(seconds, Ordering::SeqCst);
    }
}

impl ClockPort for FixedClock {
    fn now_unix(&self) -> UnixSeconds {
        self.now.load(Ordering::SeqCst)
    }
}
