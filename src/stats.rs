use serde::Serialize;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Dispatch counters of one operator.
///
/// Every backend call is recorded exactly once, as a success or as an
/// exception, before its outcome reaches the caller.
#[derive(Debug, Default)]
pub struct StatsCounter {
    dispatch_success: AtomicU64,
    dispatch_exception: AtomicU64,
    rows_dispatched: AtomicU64,
    dispatch_nanos: AtomicU64,
}

impl StatsCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_success(&self, rows: usize, elapsed: Duration) {
        self.dispatch_success.fetch_add(1, Ordering::SeqCst);
        self.rows_dispatched.fetch_add(rows as u64, Ordering::SeqCst);
        self.add_elapsed(elapsed);
    }

    pub fn record_exception(&self, elapsed: Duration) {
        self.dispatch_exception.fetch_add(1, Ordering::SeqCst);
        self.add_elapsed(elapsed);
    }

    fn add_elapsed(&self, elapsed: Duration) {
        let nanos = u64::try_from(elapsed.as_nanos()).unwrap_or(u64::MAX);
        self.dispatch_nanos.fetch_add(nanos, Ordering::SeqCst);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            dispatch_success_count: self.dispatch_success.load(Ordering::SeqCst),
            dispatch_exception_count: self.dispatch_exception.load(Ordering::SeqCst),
            rows_dispatched: self.rows_dispatched.load(Ordering::SeqCst),
            total_dispatch_nanos: self.dispatch_nanos.load(Ordering::SeqCst),
        }
    }
}

/// Point-in-time copy of a [`StatsCounter`]. Counters never decrease.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    pub dispatch_success_count: u64,
    pub dispatch_exception_count: u64,
    pub rows_dispatched: u64,
    pub total_dispatch_nanos: u64,
}

impl StatsSnapshot {
    pub fn dispatch_count(&self) -> u64 {
        self.dispatch_success_count + self.dispatch_exception_count
    }

    pub fn average_dispatch_time(&self) -> Option<Duration> {
        let count = self.dispatch_count();
        (count > 0).then(|| Duration::from_nanos(self.total_dispatch_nanos / count))
    }
}

impl fmt::Display for StatsSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Dispatch Stats: {} succeeded, {} failed, {} rows, {:?} total",
            self.dispatch_success_count,
            self.dispatch_exception_count,
            self.rows_dispatched,
            Duration::from_nanos(self.total_dispatch_nanos)
        )
    }
}
