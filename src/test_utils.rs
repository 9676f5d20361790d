//! Shared test utilities for the retention-cleaner library crate.
//!
//! Provides the canonical config, fixture-tree helpers and an in-memory
//! [`StorageTrait`] implementation used by the walker, evaluator, deleter and
//! pipeline tests.

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::{Result, anyhow};
use async_channel::Sender;
use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};

use crate::config::Config;
use crate::retention::RetentionPolicy;
use crate::storage::StorageTrait;
use crate::types::RetentionStatistics;

/// Initialise a dummy tracing subscriber for tests.
///
/// Uses `try_init` so that only the first call in a process actually
/// installs the subscriber; subsequent calls are silently ignored.
pub(crate) fn init_dummy_tracing_subscriber() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("dummy=trace")
        .try_init();
}

/// Log output captured by a thread-scoped subscriber.
#[derive(Clone, Default)]
pub(crate) struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

impl CapturedLogs {
    /// Number of captured lines containing `message`.
    pub(crate) fn count(&self, message: &str) -> usize {
        let buffer = self.0.lock().unwrap();
        String::from_utf8_lossy(&buffer)
            .lines()
            .filter(|line| line.contains(message))
            .count()
    }
}

impl std::io::Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

/// Capture events accepted by `event_filter` on the current thread until
/// the returned guard is dropped.
pub(crate) fn capture_logs(
    event_filter: &str,
) -> (CapturedLogs, tracing::subscriber::DefaultGuard) {
    let logs = CapturedLogs::default();
    let writer = logs.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(event_filter)
        .with_ansi(false)
        .with_writer(move || writer.clone())
        .finish();

    (logs, tracing::subscriber::set_default(subscriber))
}

/// Reference instant shared by the unit tests: 2024-06-01T00:00:00Z.
pub(crate) fn fixed_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap()
}

/// Create a [`Config`] suitable for most unit tests.
///
/// Key defaults: dry-run, `worker_size=1`, no rate limit, policy
/// `{"default": 30, "1001": 60}`, `now` = [`fixed_now`].
pub(crate) fn make_test_config(root: &Path) -> Config {
    let policy = RetentionPolicy::from_json(r#"{"retention":{"default":30,"1001":60}}"#).unwrap();

    let mut config = Config::for_root(root, policy);
    config.worker_size = 1;
    config.rate_limit_deletions = None;
    config.now = fixed_now();
    config
}

/// Path components `[tenant, device, y, m, d, h, min]` for `timestamp`.
pub(crate) fn minute_components(
    tenant: &str,
    device: &str,
    timestamp: DateTime<Utc>,
) -> Vec<String> {
    let mut components = vec![tenant.to_string(), device.to_string()];
    components.extend(
        timestamp
            .format("%Y/%m/%d/%H/%M")
            .to_string()
            .split('/')
            .map(|s| s.to_string()),
    );
    components
}

pub(crate) fn days_before_now(days: i64) -> DateTime<Utc> {
    fixed_now() - Duration::days(days)
}

/// In-memory directory tree implementing [`StorageTrait`].
#[derive(Clone)]
pub(crate) struct MockStorage {
    root: PathBuf,
    tree: Arc<Mutex<BTreeMap<PathBuf, BTreeSet<PathBuf>>>>,
    unreadable: Arc<Mutex<HashSet<PathBuf>>>,
    undeletable: Arc<Mutex<HashSet<PathBuf>>>,
    removed: Arc<Mutex<Vec<PathBuf>>>,
    list_calls: Arc<AtomicU64>,
    stats_sender: Sender<RetentionStatistics>,
    has_warning: Arc<AtomicBool>,
}

impl MockStorage {
    pub(crate) fn new(
        root: &Path,
        stats_sender: Sender<RetentionStatistics>,
        has_warning: Arc<AtomicBool>,
    ) -> Self {
        let mut tree = BTreeMap::new();
        tree.insert(root.to_path_buf(), BTreeSet::new());

        Self {
            root: root.to_path_buf(),
            tree: Arc::new(Mutex::new(tree)),
            unreadable: Arc::new(Mutex::new(HashSet::new())),
            undeletable: Arc::new(Mutex::new(HashSet::new())),
            removed: Arc::new(Mutex::new(Vec::new())),
            list_calls: Arc::new(AtomicU64::new(0)),
            stats_sender,
            has_warning,
        }
    }

    /// Add `path` (relative to the root) and every missing ancestor.
    pub(crate) fn add_dir(&self, relative: &str) -> PathBuf {
        let mut tree = self.tree.lock().unwrap();
        let mut parent = self.root.clone();
        for component in relative.split('/').filter(|c| !c.is_empty()) {
            let child = parent.join(component);
            tree.entry(parent.clone()).or_default().insert(child.clone());
            tree.entry(child.clone()).or_default();
            parent = child;
        }
        parent
    }

    pub(crate) fn add_minute(
        &self,
        tenant: &str,
        device: &str,
        timestamp: DateTime<Utc>,
    ) -> PathBuf {
        self.add_dir(&minute_components(tenant, device, timestamp).join("/"))
    }

    pub(crate) fn make_unreadable(&self, path: &Path) {
        self.unreadable.lock().unwrap().insert(path.to_path_buf());
    }

    pub(crate) fn make_undeletable(&self, path: &Path) {
        self.undeletable.lock().unwrap().insert(path.to_path_buf());
    }

    pub(crate) fn removed(&self) -> Vec<PathBuf> {
        let mut removed = self.removed.lock().unwrap().clone();
        removed.sort();
        removed
    }

    pub(crate) fn list_calls(&self) -> u64 {
        self.list_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn exists(&self, path: &Path) -> bool {
        self.tree.lock().unwrap().contains_key(path)
    }
}

#[async_trait]
impl StorageTrait for MockStorage {
    async fn check_directory(&self, path: &Path) -> Result<()> {
        if self.exists(path) && !self.unreadable.lock().unwrap().contains(path) {
            Ok(())
        } else {
            Err(anyhow!(crate::types::error::RetentionError::RootUnavailable(
                path.display().to_string()
            )))
        }
    }

    async fn list_subdirectories(&self, path: &Path) -> Result<Vec<PathBuf>> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);

        if self.unreadable.lock().unwrap().contains(path) {
            return Err(anyhow!("permission denied: {}", path.display()));
        }

        self.tree
            .lock()
            .unwrap()
            .get(path)
            .map(|children| children.iter().cloned().collect())
            .ok_or_else(|| anyhow!("no such directory: {}", path.display()))
    }

    async fn remove_dir_all(&self, path: &Path) -> Result<()> {
        if self.undeletable.lock().unwrap().contains(path) {
            return Err(anyhow!("permission denied: {}", path.display()));
        }

        let mut tree = self.tree.lock().unwrap();
        if !tree.contains_key(path) {
            return Err(anyhow!("no such directory: {}", path.display()));
        }

        tree.retain(|p, _| !p.starts_with(path));
        for children in tree.values_mut() {
            children.retain(|p| !p.starts_with(path));
        }
        self.removed.lock().unwrap().push(path.to_path_buf());
        Ok(())
    }

    fn get_stats_sender(&self) -> Sender<RetentionStatistics> {
        self.stats_sender.clone()
    }

    async fn send_stats(&self, stats: RetentionStatistics) {
        let _ = self.stats_sender.send(stats).await;
    }

    fn set_warning(&self) {
        self.has_warning.store(true, Ordering::SeqCst);
    }
}
