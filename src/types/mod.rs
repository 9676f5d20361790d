use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::time::Instant;

pub mod error;
pub mod token;

/// A minute-level directory whose timestamp precedes its tenant's cutoff.
///
/// Produced by the candidate evaluator and moved through the candidate queue
/// to exactly one deletion worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub path: PathBuf,
    pub tenant: String,
    pub timestamp: DateTime<Utc>,
}

/// Statistics sent through the stats channel during pipeline execution.
///
/// Consumed by the CLI progress indicator. Counters that must be exact
/// live in [`RunCounters`]; this channel is for display only.
#[derive(Debug, PartialEq)]
pub enum RetentionStatistics {
    DirectoryScanned,
    CandidateFound { path: PathBuf },
    DeleteComplete { path: PathBuf },
    DeleteFailed { path: PathBuf },
    WalkWarning { path: PathBuf },
}

/// Plain snapshot of the run counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RunStats {
    pub scanned: u64,
    pub candidates: u64,
    /// Removed directories, or would-remove directories in dry-run mode.
    pub deleted: u64,
    pub failed: u64,
    pub duration: Duration,
}

/// Counters shared by the walker and every deletion worker.
///
/// `scanned` is always incremented before `candidates` for the same
/// directory, and a candidate is counted before it is enqueued, so any
/// snapshot satisfies `scanned >= candidates >= deleted + failed`.
#[derive(Debug)]
pub struct RunCounters {
    scanned: AtomicU64,
    candidates: AtomicU64,
    deleted: AtomicU64,
    failed: AtomicU64,
    start_time: Instant,
}

impl RunCounters {
    pub fn new() -> Self {
        Self {
            scanned: AtomicU64::new(0),
            candidates: AtomicU64::new(0),
            deleted: AtomicU64::new(0),
            failed: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }

    /// Returns the new scanned total.
    pub fn increment_scanned(&self) -> u64 {
        self.scanned.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn increment_candidates(&self) -> u64 {
        self.candidates.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn increment_deleted(&self) -> u64 {
        self.deleted.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn increment_failed(&self) -> u64 {
        self.failed.fetch_add(1, Ordering::SeqCst) + 1
    }

    // Loaded in reverse pipeline order so a concurrent snapshot never shows
    // more finished work than discovered work.
    pub fn snapshot(&self) -> RunStats {
        let failed = self.failed.load(Ordering::SeqCst);
        let deleted = self.deleted.load(Ordering::SeqCst);
        let candidates = self.candidates.load(Ordering::SeqCst);
        let scanned = self.scanned.load(Ordering::SeqCst);

        RunStats {
            scanned,
            candidates,
            deleted,
            failed,
            duration: self.start_time.elapsed(),
        }
    }
}

impl Default for RunCounters {
    fn default() -> Self {
        Self::new()
    }
}
