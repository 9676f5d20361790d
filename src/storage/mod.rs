use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::time::Duration;

use anyhow::Result;
use async_channel::Sender;
use async_trait::async_trait;
use dyn_clone::DynClone;
use leaky_bucket::RateLimiter;

use crate::config::Config;
use crate::types::RetentionStatistics;

pub mod local;

/// Type alias for a boxed Storage trait object.
pub type Storage = Box<dyn StorageTrait + Send + Sync>;

/// Filesystem operations needed by the walker and the deletion workers.
///
/// Kept deliberately small so that the walker can be exercised against an
/// in-memory tree in tests.
#[async_trait]
pub trait StorageTrait: DynClone {
    /// Fail unless `path` exists and is a directory.
    async fn check_directory(&self, path: &Path) -> Result<()>;

    /// List the immediate child directories of `path`, sorted by name.
    ///
    /// Non-directory entries are dropped using the file type reported by the
    /// directory listing itself; entries are never stat'd individually.
    async fn list_subdirectories(&self, path: &Path) -> Result<Vec<PathBuf>>;

    /// Recursively remove `path` and everything under it.
    async fn remove_dir_all(&self, path: &Path) -> Result<()>;

    /// Get the statistics sender channel.
    fn get_stats_sender(&self) -> Sender<RetentionStatistics>;

    /// Send a statistics event through the channel.
    async fn send_stats(&self, stats: RetentionStatistics);

    /// Set the warning flag to indicate a warning occurred.
    fn set_warning(&self);
}

dyn_clone::clone_trait_object!(StorageTrait);

// Above this rate a single token per interval would need sub-millisecond
// intervals, so tokens are refilled in bulk instead.
const MAX_SINGLE_TOKEN_RATE: u32 = 1000;

/// Create the storage used by every stage of a run.
pub fn create_storage(
    _config: &Config,
    stats_sender: Sender<RetentionStatistics>,
    has_warning: Arc<AtomicBool>,
) -> Storage {
    Box::new(local::LocalStorage::new(stats_sender, has_warning))
}

/// Build the deletion rate limiter shared by all workers.
///
/// Admits one deletion every `1 / rate` seconds with no initial burst, so
/// `n` deletions take at least `(n - 1) / rate` seconds. `None` (unlimited)
/// yields no limiter.
pub fn create_rate_limiter(rate_limit_deletions: Option<u32>) -> Option<Arc<RateLimiter>> {
    let rate = rate_limit_deletions.filter(|rate| *rate > 0)?;

    // `refill` tokens every `interval` keeps the exact rate while holding
    // the interval at or above one millisecond.
    let refill = rate.div_ceil(MAX_SINGLE_TOKEN_RATE);
    let interval = Duration::from_nanos(1_000_000_000 * u64::from(refill) / u64::from(rate));
    let refill = refill as usize;

    Some(Arc::new(
        RateLimiter::builder()
            .max(refill)
            .initial(0)
            .refill(refill)
            .interval(interval)
            .fair(true)
            .build(),
    ))
}
