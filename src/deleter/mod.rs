//! Deletion workers for the retention pipeline.
//!
//! Each [`DirectoryDeleter`] drains the shared candidate queue, waits on the
//! shared rate limiter before every deletion and records the outcome in the
//! run counters. A failed deletion is counted and logged; the worker always
//! moves on to its next candidate.

use std::sync::Arc;

use anyhow::{Result, anyhow};
use async_channel::Receiver;
use leaky_bucket::RateLimiter;
use tracing::{debug, error, info, warn};

use crate::stage::Stage;
use crate::types::{Candidate, RetentionStatistics, RunCounters};

/// Pipeline worker that removes expired minute directories.
pub struct DirectoryDeleter {
    worker_index: u16,
    base: Stage,
    run_counters: Arc<RunCounters>,
    rate_limiter: Option<Arc<RateLimiter>>,
}

impl DirectoryDeleter {
    pub fn new(
        base: Stage,
        worker_index: u16,
        run_counters: Arc<RunCounters>,
        rate_limiter: Option<Arc<RateLimiter>>,
    ) -> Self {
        Self {
            worker_index,
            base,
            run_counters,
            rate_limiter,
        }
    }

    /// Main entry point: receive candidates until the queue is closed and
    /// drained, or the run is cancelled.
    pub async fn delete(&self) -> Result<()> {
        debug!(worker_index = self.worker_index, "delete worker started.");

        let receiver = self
            .base
            .receiver
            .as_ref()
            .ok_or_else(|| anyhow!("delete worker has no receiver."))?;
        self.receive_and_delete(receiver).await
    }

    async fn receive_and_delete(&self, receiver: &Receiver<Candidate>) -> Result<()> {
        loop {
            tokio::select! {
                recv_result = receiver.recv() => {
                    match recv_result {
                        Ok(candidate) => {
                            if !self.process_candidate(candidate).await {
                                info!(worker_index = self.worker_index, "delete worker has been cancelled.");
                                return Ok(());
                            }
                        },
                        Err(_) if receiver.is_closed() => {
                            debug!(worker_index = self.worker_index, "delete worker has been completed.");
                            break;
                        }
                        Err(e) => {
                            error!(worker_index = self.worker_index, error = %e, "unexpected channel error.");
                            break;
                        }
                    }
                },
                _ = self.base.cancellation_token.cancelled() => {
                    info!(worker_index = self.worker_index, "delete worker has been cancelled.");
                    return Ok(());
                }
            }
        }

        Ok(())
    }

    /// Returns `false` if the run was cancelled while waiting for the rate
    /// limiter; the candidate is then left untouched.
    async fn process_candidate(&self, candidate: Candidate) -> bool {
        if let Some(rate_limiter) = &self.rate_limiter {
            tokio::select! {
                _ = rate_limiter.acquire_one() => {},
                _ = self.base.cancellation_token.cancelled() => {
                    return false;
                }
            }
        }

        if self.base.config.dry_run {
            self.run_counters.increment_deleted();
            info!(
                worker_index = self.worker_index,
                path = %candidate.path.display(),
                tenant = candidate.tenant.as_str(),
                timestamp = %candidate.timestamp.to_rfc3339(),
                "[dry-run] would delete."
            );
            self.base
                .send_stats(RetentionStatistics::DeleteComplete {
                    path: candidate.path,
                })
                .await;
            return true;
        }

        match self.base.target.remove_dir_all(&candidate.path).await {
            Ok(()) => {
                self.run_counters.increment_deleted();
                debug!(
                    worker_index = self.worker_index,
                    path = %candidate.path.display(),
                    "deleted."
                );
                self.base
                    .send_stats(RetentionStatistics::DeleteComplete {
                        path: candidate.path,
                    })
                    .await;
            }
            Err(e) => {
                self.run_counters.increment_failed();
                self.base.set_warning();
                warn!(
                    worker_index = self.worker_index,
                    path = %candidate.path.display(),
                    "failed to delete: {e:#}"
                );
                self.base
                    .send_stats(RetentionStatistics::DeleteFailed {
                        path: candidate.path,
                    })
                    .await;
            }
        }

        true
    }
}
