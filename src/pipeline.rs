//! Retention pipeline orchestrator.
//!
//! Creates and connects the pipeline stages: one [`TreeWalker`] feeding a
//! bounded candidate queue that is drained by `worker_size`
//! [`DirectoryDeleter`] workers (MPMC). All stages share the run counters,
//! the warning flag and a single cancellation token.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::{Result, anyhow};
use async_channel::{Receiver, Sender};
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::config::Config;
use crate::deleter::DirectoryDeleter;
use crate::stage::Stage;
use crate::storage::{self, Storage};
use crate::types::error::RetentionError;
use crate::types::token::PipelineCancellationToken;
use crate::types::{Candidate, RetentionStatistics, RunCounters, RunStats};
use crate::walker::TreeWalker;

/// Tracing target of the end-of-run summary. Subscribers keep it at `info`
/// regardless of verbosity so every run reports its totals.
pub const SUMMARY_TARGET: &str = "retention_cleaner::summary";

/// The retention pipeline orchestrator.
///
/// ## Pipeline stages
///
/// ```text
/// TreeWalker → candidate queue (bounded) → DirectoryDeleter workers (MPMC)
/// ```
///
/// ## Usage
///
/// ```no_run
/// # async fn example() {
/// use retention_cleaner::retention::RetentionPolicy;
/// use retention_cleaner::{Config, RetentionPipeline, create_pipeline_cancellation_token};
///
/// let config = Config::for_root("/data", RetentionPolicy::with_default(30));
/// let cancellation_token = create_pipeline_cancellation_token();
/// let mut pipeline = RetentionPipeline::new(config, cancellation_token);
/// pipeline.close_stats_sender();
/// pipeline.run().await;
/// if pipeline.has_error() {
///     eprintln!("{:?}", pipeline.get_errors_and_consume().unwrap()[0]);
/// }
/// println!("{:?}", pipeline.get_run_stats());
/// # }
/// ```
pub struct RetentionPipeline {
    config: Config,
    target: Storage,
    cancellation_token: PipelineCancellationToken,
    stats_receiver: Receiver<RetentionStatistics>,
    has_error: Arc<AtomicBool>,
    has_panic: Arc<AtomicBool>,
    has_warning: Arc<AtomicBool>,
    errors: Arc<Mutex<VecDeque<anyhow::Error>>>,
    ready: bool,
    prerequisites_checked: bool,
    run_counters: Arc<RunCounters>,
}

impl RetentionPipeline {
    /// Create a new RetentionPipeline over the local filesystem.
    pub fn new(config: Config, cancellation_token: PipelineCancellationToken) -> Self {
        let has_warning = Arc::new(AtomicBool::new(false));
        let (stats_sender, stats_receiver) = async_channel::unbounded();
        let target = storage::create_storage(&config, stats_sender, has_warning.clone());

        Self {
            config,
            target,
            cancellation_token,
            stats_receiver,
            has_error: Arc::new(AtomicBool::new(false)),
            has_panic: Arc::new(AtomicBool::new(false)),
            has_warning,
            errors: Arc::new(Mutex::new(VecDeque::new())),
            ready: true,
            prerequisites_checked: false,
            run_counters: Arc::new(RunCounters::new()),
        }
    }

    /// Run the retention pipeline.
    ///
    /// 1. Check prerequisites (usable data root)
    /// 2. Spawn the deletion workers, then the walker
    /// 3. Wait for the walker and every worker to finish
    /// 4. Log the final summary and close the stats channel
    pub async fn run(&mut self) {
        assert!(self.ready, "RetentionPipeline::run() called more than once");
        self.ready = false;

        if !self.prerequisites_checked {
            if let Err(e) = self.check_prerequisites().await {
                self.record_error(e);
                self.shutdown();
                return;
            }
        }

        self.execute_pipeline().await;

        self.shutdown();
    }

    /// Check if any error occurred during the pipeline execution.
    pub fn has_error(&self) -> bool {
        self.has_error.load(Ordering::SeqCst)
    }

    /// Check if any spawned task panicked during the pipeline execution.
    pub fn has_panic(&self) -> bool {
        self.has_panic.load(Ordering::SeqCst)
    }

    /// Check if any warning occurred during the pipeline execution.
    pub fn has_warning(&self) -> bool {
        self.has_warning.load(Ordering::SeqCst)
    }

    /// Consume and return all accumulated errors.
    ///
    /// Returns `None` if no errors occurred.
    pub fn get_errors_and_consume(&self) -> Option<Vec<anyhow::Error>> {
        if !self.has_error() {
            return None;
        }
        let mut error_list = self.errors.lock().unwrap();
        let mut errors = Vec::with_capacity(error_list.len());
        while let Some(e) = error_list.pop_front() {
            errors.push(e);
        }
        Some(errors)
    }

    /// Get error messages without consuming them.
    pub fn get_error_messages(&self) -> Option<Vec<String>> {
        if !self.has_error() {
            return None;
        }
        let error_list = self.errors.lock().unwrap();
        Some(error_list.iter().map(|e| e.to_string()).collect())
    }

    /// Get the stats receiver for progress reporting.
    pub fn get_stats_receiver(&self) -> Receiver<RetentionStatistics> {
        self.stats_receiver.clone()
    }

    /// Get a snapshot of the run counters.
    pub fn get_run_stats(&self) -> RunStats {
        self.run_counters.snapshot()
    }

    /// Close the stats sender to signal the progress reporter to finish.
    ///
    /// Call this before `run()` if you don't need progress reporting.
    pub fn close_stats_sender(&self) {
        self.target.get_stats_sender().close();
    }

    /// Verify the data root before anything is spawned.
    ///
    /// Call this before `run()` to fail fast (e.g. before starting a
    /// progress indicator). If not called explicitly, `run()` calls it.
    pub async fn check_prerequisites(&mut self) -> Result<()> {
        self.target.check_directory(&self.config.root).await?;

        info!(
            root = %self.config.root.display(),
            dry_run = self.config.dry_run,
            worker_size = self.config.worker_size,
            deletes_per_sec = self.config.rate_limit_deletions.unwrap_or(0),
            tenant = self.config.tenant.as_deref().unwrap_or("*"),
            now = %self.config.now.to_rfc3339(),
            "retention run has started."
        );

        self.prerequisites_checked = true;
        Ok(())
    }

    fn record_error(&self, error: anyhow::Error) {
        self.has_error.store(true, Ordering::SeqCst);
        self.errors.lock().unwrap().push_back(error);
    }

    fn shutdown(&self) {
        self.close_stats_sender();
    }

    async fn execute_pipeline(&self) {
        let (sender, receiver) =
            async_channel::bounded::<Candidate>(self.config.candidate_queue_size as usize);

        let mut handles = self.delete_candidates(receiver);
        handles.push(self.walk_tree(sender));

        for handle in handles {
            if let Err(e) = handle.await {
                self.has_panic.store(true, Ordering::SeqCst);
                error!("pipeline task panicked: {}", e);
                self.record_error(anyhow!("pipeline task panicked: {}", e));
            }
        }

        let stats = self.get_run_stats();
        info!(
            target: SUMMARY_TARGET,
            scanned = stats.scanned,
            candidates = stats.candidates,
            deleted = stats.deleted,
            failed = stats.failed,
            dry_run = self.config.dry_run,
            duration_sec = stats.duration.as_secs_f64(),
            "retention run has been completed."
        );

        // Checked once after every stage has finished.
        if self.config.warn_as_error && self.has_warning() {
            self.record_error(anyhow!(RetentionError::PartialFailure {
                deleted: stats.deleted,
                failed: stats.failed,
            }));
        }
    }

    /// Create the walker stage: owns the only sender of the candidate queue.
    fn create_spsc_stage(&self, sender: Sender<Candidate>) -> Stage {
        Stage::new(
            self.config.clone(),
            dyn_clone::clone_box(&*self.target),
            None,
            Some(sender),
            self.cancellation_token.clone(),
            self.has_warning.clone(),
        )
    }

    /// Create a worker stage sharing the candidate queue receiver.
    fn create_mpmc_stage(&self, receiver: Receiver<Candidate>) -> Stage {
        Stage::new(
            self.config.clone(),
            dyn_clone::clone_box(&*self.target),
            Some(receiver),
            None,
            self.cancellation_token.clone(),
            self.has_warning.clone(),
        )
    }

    /// Spawn the TreeWalker. The queue closes when the walker finishes.
    fn walk_tree(&self, sender: Sender<Candidate>) -> JoinHandle<()> {
        let stage = self.create_spsc_stage(sender);
        let walker = TreeWalker::new(stage, self.run_counters.clone());

        let has_error = self.has_error.clone();
        let has_panic = self.has_panic.clone();
        let error_list = self.errors.clone();
        let cancellation_token = self.cancellation_token.clone();

        tokio::spawn(async move {
            let join_result = tokio::spawn(async move { walker.walk().await }).await;

            match join_result {
                Ok(Ok(())) => {
                    debug!("tree walker completed successfully.");
                }
                Ok(Err(e)) => {
                    cancellation_token.cancel();
                    has_error.store(true, Ordering::SeqCst);
                    error!("tree walker failed: {e:#}");
                    error_list.lock().unwrap().push_back(e);
                }
                Err(e) => {
                    cancellation_token.cancel();
                    has_error.store(true, Ordering::SeqCst);
                    has_panic.store(true, Ordering::SeqCst);
                    error!("tree walker task panicked: {}", e);
                    error_list
                        .lock()
                        .unwrap()
                        .push_back(anyhow!("tree walker task panicked: {}", e));
                }
            }
        })
    }

    /// Spawn `worker_size` DirectoryDeleter workers on the shared queue.
    fn delete_candidates(&self, candidates: Receiver<Candidate>) -> Vec<JoinHandle<()>> {
        let rate_limiter = storage::create_rate_limiter(self.config.rate_limit_deletions);
        let mut handles = Vec::with_capacity(self.config.worker_size as usize + 1);

        for worker_index in 0..self.config.worker_size {
            let stage = self.create_mpmc_stage(candidates.clone());
            let directory_deleter = DirectoryDeleter::new(
                stage,
                worker_index,
                self.run_counters.clone(),
                rate_limiter.clone(),
            );

            let has_error = self.has_error.clone();
            let has_panic = self.has_panic.clone();
            let error_list = self.errors.clone();
            let cancellation_token = self.cancellation_token.clone();

            handles.push(tokio::spawn(async move {
                let join_result =
                    tokio::spawn(async move { directory_deleter.delete().await }).await;

                match join_result {
                    Ok(Ok(())) => {
                        debug!(worker_index, "delete worker completed successfully.");
                    }
                    Ok(Err(e)) => {
                        cancellation_token.cancel();
                        has_error.store(true, Ordering::SeqCst);
                        error!(worker_index, "delete worker failed: {e:#}");
                        error_list.lock().unwrap().push_back(e);
                    }
                    Err(e) => {
                        cancellation_token.cancel();
                        has_error.store(true, Ordering::SeqCst);
                        has_panic.store(true, Ordering::SeqCst);
                        error!(worker_index, "delete worker task panicked: {}", e);
                        error_list
                            .lock()
                            .unwrap()
                            .push_back(anyhow!("delete worker panicked: {}", e));
                    }
                }
            }));
        }

        handles
    }
}
