//! Scan profile — counters and timers reported by scanners.
//!
//! One profile is usually shared (via `Arc`) by every scanner of a scan
//! operator, so all counters are atomics.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// 스캔 프로파일 카운터
#[derive(Debug, Default)]
pub struct ScanProfile {
    rows_read: AtomicU64,
    blocks_read: AtomicU64,
    scanners_opened: AtomicU64,
    scanners_closed: AtomicU64,
    open_nanos: AtomicU64,
    read_nanos: AtomicU64,
    close_nanos: AtomicU64,
}

/// Timed phase of a scanner lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanPhase {
    Open,
    Read,
    Close,
}

impl ScanProfile {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_block(&self, rows: usize) {
        self.rows_read.fetch_add(rows as u64, Ordering::Relaxed);
        self.blocks_read.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_opened(&self) {
        self.scanners_opened.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_closed(&self) {
        self.scanners_closed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add_time(&self, phase: ScanPhase, elapsed: Duration) {
        let nanos = u64::try_from(elapsed.as_nanos()).unwrap_or(u64::MAX);
        let counter = match phase {
            ScanPhase::Open => &self.open_nanos,
            ScanPhase::Read => &self.read_nanos,
            ScanPhase::Close => &self.close_nanos,
        };
        counter.fetch_add(nanos, Ordering::Relaxed);
    }

    /// Run `f`, charging its wall time to `phase`.
    pub fn timed<T>(&self, phase: ScanPhase, f: impl FnOnce() -> T) -> T {
        let start = Instant::now();
        let result = f();
        self.add_time(phase, start.elapsed());
        result
    }

    pub fn snapshot(&self) -> ProfileSnapshot {
        ProfileSnapshot {
            rows_read: self.rows_read.load(Ordering::Relaxed),
            blocks_read: self.blocks_read.load(Ordering::Relaxed),
            scanners_opened: self.scanners_opened.load(Ordering::Relaxed),
            scanners_closed: self.scanners_closed.load(Ordering::Relaxed),
            open_time: Duration::from_nanos(self.open_nanos.load(Ordering::Relaxed)),
            read_time: Duration::from_nanos(self.read_nanos.load(Ordering::Relaxed)),
            close_time: Duration::from_nanos(self.close_nanos.load(Ordering::Relaxed)),
        }
    }
}

/// Point-in-time copy of a [`ScanProfile`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ProfileSnapshot {
    pub rows_read: u64,
    pub blocks_read: u64,
    pub scanners_opened: u64,
    pub scanners_closed: u64,
    pub open_time: Duration,
    pub read_time: Duration,
    pub close_time: Duration,
}

impl ProfileSnapshot {
    /// Scanners opened but not yet closed.
    pub fn live_scanners(&self) -> u64 {
        self.scanners_opened.saturating_sub(self.scanners_closed)
    }
}
