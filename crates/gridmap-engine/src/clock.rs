//! Cache-version source.

use std::sync::atomic::{AtomicI64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use gridmap_types::CacheVersion;

/// Wall-clock nanoseconds, forced strictly increasing across threads.
#[derive(Debug, Default)]
pub struct CacheClock {
    last: AtomicI64,
}

impl CacheClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mint a version greater than every version minted or observed so far.
    ///
    /// Saturates at `i64::MAX`; callers storing versions reject repeats.
    pub fn next(&self) -> CacheVersion {
        let now = wall_nanos();
        let prev = self
            .last
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| {
                Some(now.max(last.saturating_add(1)))
            })
            .unwrap_or_else(|last| last);
        now.max(prev.saturating_add(1))
    }

    /// Account for a version minted elsewhere.
    pub fn observe(&self, version: CacheVersion) {
        self.last.fetch_max(version, Ordering::SeqCst);
    }
}

fn wall_nanos() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| i64::try_from(d.as_nanos()).unwrap_or(i64::MAX))
        .unwrap_or(0)
}
