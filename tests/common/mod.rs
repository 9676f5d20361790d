//! Shared E2E test infrastructure for retention-cleaner.
//!
//! Provides `TestTree` for building fixture trees in a temporary directory
//! and running the pipeline against them.

#![allow(dead_code)]

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, TimeZone, Utc};
use retention_cleaner::config::args::build_config_from_args;
use retention_cleaner::{Config, RetentionPipeline, RunStats, create_pipeline_cancellation_token};
use tempfile::TempDir;

/// Reference instant used by every E2E run.
pub const REFERENCE_TIME: &str = "2024-06-01T00:00:00Z";

pub fn reference_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap()
}

pub fn days_ago(days: i64) -> DateTime<Utc> {
    reference_time() - Duration::days(days)
}

/// Result of running a retention pipeline.
#[derive(Debug)]
pub struct PipelineResult {
    pub stats: RunStats,
    pub has_error: bool,
    pub has_panic: bool,
    pub has_warning: bool,
    pub errors: Vec<String>,
}

/// A data root plus a retention policy file, both removed on drop.
pub struct TestTree {
    root: TempDir,
    policy: TempDir,
}

impl TestTree {
    pub fn new(policy_json: &str) -> Self {
        let root = tempfile::tempdir().unwrap();
        let policy = tempfile::tempdir().unwrap();
        std::fs::write(policy.path().join("config.json"), policy_json).unwrap();
        Self { root, policy }
    }

    pub fn root(&self) -> &Path {
        self.root.path()
    }

    pub fn policy_path(&self) -> PathBuf {
        self.policy.path().join("config.json")
    }

    /// Create `<root>/<tenant>/<device>/YYYY/MM/DD/HH/MM` with two files.
    pub fn add_minute(&self, tenant: &str, device: &str, timestamp: DateTime<Utc>) -> PathBuf {
        let path = self
            .root()
            .join(tenant)
            .join(device)
            .join(timestamp.format("%Y/%m/%d/%H/%M").to_string());
        std::fs::create_dir_all(&path).unwrap();
        std::fs::write(path.join("frame-000.jpg"), b"jpeg").unwrap();
        std::fs::write(path.join("frame-001.jpg"), b"jpeg").unwrap();
        path
    }

    /// Create an arbitrary directory below the root.
    pub fn add_dir(&self, relative: &str) -> PathBuf {
        let path = self.root().join(relative);
        std::fs::create_dir_all(&path).unwrap();
        path
    }

    pub fn add_file(&self, relative: &str) -> PathBuf {
        let path = self.root().join(relative);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(&path, b"data").unwrap();
        path
    }

    /// Every path (files and directories) below the root.
    pub fn snapshot(&self) -> BTreeSet<PathBuf> {
        fn collect(dir: &Path, paths: &mut BTreeSet<PathBuf>) {
            for entry in std::fs::read_dir(dir).unwrap() {
                let entry = entry.unwrap();
                let path = entry.path();
                paths.insert(path.clone());
                if entry.file_type().unwrap().is_dir() {
                    collect(&path, paths);
                }
            }
        }

        let mut paths = BTreeSet::new();
        collect(self.root(), &mut paths);
        paths
    }

    /// Build a config from CLI-style arguments, always pinning the root,
    /// the policy file and the reference time.
    pub fn config(&self, extra_args: &[&str]) -> Config {
        let mut args = vec![
            "retention-cleaner".to_string(),
            "--show-no-progress".to_string(),
            "--root".to_string(),
            self.root().to_string_lossy().to_string(),
            "--config".to_string(),
            self.policy_path().to_string_lossy().to_string(),
            "--reference-time".to_string(),
            REFERENCE_TIME.to_string(),
        ];
        args.extend(extra_args.iter().map(|arg| arg.to_string()));

        build_config_from_args(args).unwrap()
    }

    pub async fn run(&self, extra_args: &[&str]) -> PipelineResult {
        run_pipeline(self.config(extra_args)).await
    }
}

pub async fn run_pipeline(config: Config) -> PipelineResult {
    let mut pipeline = RetentionPipeline::new(config, create_pipeline_cancellation_token());
    pipeline.close_stats_sender();
    pipeline.run().await;

    PipelineResult {
        stats: pipeline.get_run_stats(),
        has_error: pipeline.has_error(),
        has_panic: pipeline.has_panic(),
        has_warning: pipeline.has_warning(),
        errors: pipeline.get_error_messages().unwrap_or_default(),
    }
}
