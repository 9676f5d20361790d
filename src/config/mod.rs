pub mod args;

use std::path::PathBuf;

use chrono::{DateTime, Utc};

use crate::retention::RetentionPolicy;

pub const DEFAULT_ROOT: &str = "/data";
pub const DEFAULT_RATE_LIMIT_DELETIONS: u32 = 20;
pub const DEFAULT_LOG_EVERY: u64 = 1000;
pub const DEFAULT_CANDIDATE_QUEUE_SIZE: u32 = 1024;
const MAX_DEFAULT_WORKER_SIZE: u16 = 4;

/// Main configuration for a retention-cleaner run.
///
/// Holds everything a [`RetentionPipeline`](crate::RetentionPipeline) needs:
/// the data root, the retention policy, the dry-run flag, the worker pool
/// size, the deletion rate limit and the reference instant used for every
/// cutoff computation. A `Config` is built once and cloned into each stage;
/// nothing in it changes during a run.
///
/// # Quick Start
///
/// ```
/// use retention_cleaner::Config;
/// use retention_cleaner::retention::RetentionPolicy;
///
/// let config = Config::for_root("/data", RetentionPolicy::with_default(30));
/// assert!(config.dry_run);
/// assert_eq!(config.rate_limit_deletions, Some(20));
/// ```
///
/// Then customize fields as needed:
///
/// ```
/// use retention_cleaner::Config;
/// use retention_cleaner::retention::RetentionPolicy;
///
/// let mut config = Config::for_root("/data", RetentionPolicy::with_default(30));
/// config.dry_run = false;
/// config.worker_size = 8;
/// config.rate_limit_deletions = None;
/// config.tenant = Some("1001".to_string());
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    pub root: PathBuf,
    pub retention_policy: RetentionPolicy,
    pub dry_run: bool,
    pub worker_size: u16,
    /// Deletions per second shared by all workers. `None` means unlimited.
    pub rate_limit_deletions: Option<u32>,
    /// Emit a progress line every N scanned minute directories. 0 disables.
    pub log_every: u64,
    /// Restrict the walk to a single tenant directory.
    pub tenant: Option<String>,
    /// Reference instant for all cutoffs in the run.
    pub now: DateTime<Utc>,
    pub candidate_queue_size: u32,
    pub show_no_progress: bool,
    pub warn_as_error: bool,
    pub tracing_config: Option<TracingConfig>,
    pub auto_complete_shell: Option<clap_complete::shells::Shell>,
}

impl Config {
    /// Create a `Config` for `root` with defaults matching the CLI.
    ///
    /// The run starts in dry-run mode and captures the current time as its
    /// reference instant.
    pub fn for_root(root: impl Into<PathBuf>, retention_policy: RetentionPolicy) -> Self {
        Config {
            root: root.into(),
            retention_policy,
            dry_run: true,
            worker_size: default_worker_size(),
            rate_limit_deletions: Some(DEFAULT_RATE_LIMIT_DELETIONS),
            log_every: DEFAULT_LOG_EVERY,
            tenant: None,
            now: Utc::now(),
            candidate_queue_size: DEFAULT_CANDIDATE_QUEUE_SIZE,
            show_no_progress: false,
            warn_as_error: false,
            tracing_config: None,
            auto_complete_shell: None,
        }
    }
}

/// min(4, available parallelism), and at least 1.
pub fn default_worker_size() -> u16 {
    let parallelism = std::thread::available_parallelism()
        .map(|n| u16::try_from(n.get()).unwrap_or(u16::MAX))
        .unwrap_or(1);
    parallelism.clamp(1, MAX_DEFAULT_WORKER_SIZE)
}

/// Tracing (logging) configuration.
#[derive(Debug, Clone, Copy)]
pub struct TracingConfig {
    pub tracing_level: log::Level,
    pub json_tracing: bool,
    pub span_events_tracing: bool,
    pub disable_color_tracing: bool,
}
