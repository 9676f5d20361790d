use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::evaluator::CandidateEvaluator;
use crate::stage::Stage;
use crate::timestamp::TIMESTAMP_COMPONENTS;
use crate::types::error::RetentionError;
use crate::types::{RetentionStatistics, RunCounters};

/// What the walker does with a directory after visiting it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VisitDecision {
    Descend,
    Prune,
}

/// Per-directory callback driven by [`TreeWalker::walk_directories`].
///
/// `components` holds the path components from the tenant directory down to
/// `path`, so `components.len()` is the depth below the data root.
#[async_trait]
pub trait DirectoryVisitor: Send + Sync {
    async fn visit(&self, path: &Path, components: &[String]) -> Result<VisitDecision>;
}

/// Classification of a directory by its depth below the data root.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirectoryLevel {
    Root,
    Tenant,
    Device,
    /// Year, month, day or hour.
    TimeBucket,
    Minute,
    Unexpected,
}

/// Depth of a minute directory: tenant and device plus the timestamp levels.
pub const MINUTE_DEPTH: usize = 2 + TIMESTAMP_COMPONENTS;

impl DirectoryLevel {
    pub fn from_depth(depth: usize) -> Self {
        match depth {
            0 => DirectoryLevel::Root,
            1 => DirectoryLevel::Tenant,
            2 => DirectoryLevel::Device,
            d if d < MINUTE_DEPTH => DirectoryLevel::TimeBucket,
            MINUTE_DEPTH => DirectoryLevel::Minute,
            _ => DirectoryLevel::Unexpected,
        }
    }
}

/// Walks the data root tenant by tenant and feeds the candidate queue.
///
/// The walker is the first stage of the retention pipeline:
///
/// ```text
/// TreeWalker → candidate queue → DirectoryDeleter (x N)
/// ```
///
/// It has no `receiver` channel. Dropping the walker when `walk()` returns
/// drops its sender, which closes the queue so that the workers drain it and
/// exit.
pub struct TreeWalker {
    base: Stage,
    run_counters: Arc<RunCounters>,
}

impl TreeWalker {
    pub fn new(base: Stage, run_counters: Arc<RunCounters>) -> Self {
        Self { base, run_counters }
    }

    /// Walk every tenant (or only the configured one) in lexical order.
    ///
    /// Tenants are processed sequentially. An unreadable root is fatal; an
    /// unreadable tenant or inner directory only prunes that subtree.
    pub async fn walk(&self) -> Result<()> {
        debug!(root = %self.base.config.root.display(), "walk has started.");

        let root = self.base.config.root.clone();
        let tenants = match &self.base.config.tenant {
            Some(tenant) => vec![root.join(tenant)],
            None => self.base.target.list_subdirectories(&root).await.map_err(|e| {
                anyhow!(RetentionError::RootUnavailable(format!(
                    "{}: {e:#}",
                    root.display()
                )))
            })?,
        };

        for tenant_path in tenants {
            if self.base.cancellation_token.is_cancelled() {
                debug!("walk has been cancelled.");
                return Ok(());
            }

            let Some(tenant) = tenant_path
                .file_name()
                .map(|name| name.to_string_lossy().to_string())
            else {
                continue;
            };

            let retention_days = self.base.config.retention_policy.retention_days_for(&tenant);
            let cutoff = self
                .base
                .config
                .retention_policy
                .cutoff_for(&tenant, self.base.config.now);
            info!(
                tenant = tenant.as_str(),
                retention_days,
                tenant_override = self.base.config.retention_policy.has_override(&tenant),
                cutoff = %cutoff.to_rfc3339(),
                "scanning tenant."
            );

            let evaluator = CandidateEvaluator::new(
                &self.base,
                tenant.clone(),
                cutoff,
                self.run_counters.clone(),
            );
            self.walk_directories(tenant_path, vec![tenant], &evaluator)
                .await?;
        }

        debug!("walk has been completed.");
        Ok(())
    }

    /// Depth-first walk from `start`, asking `visitor` whether to descend
    /// into each directory.
    ///
    /// Only directories are listed; plain files are never stat'd. Children are
    /// visited in lexical order. A listing failure logs a warning and prunes
    /// that directory.
    pub async fn walk_directories(
        &self,
        start: PathBuf,
        components: Vec<String>,
        visitor: &dyn DirectoryVisitor,
    ) -> Result<()> {
        let mut stack = vec![(start, components)];

        while let Some((path, components)) = stack.pop() {
            if self.base.cancellation_token.is_cancelled() {
                debug!("walk has been cancelled.");
                return Ok(());
            }
            if self.base.is_channel_closed() {
                debug!("candidate queue has been closed.");
                return Ok(());
            }

            if visitor.visit(&path, &components).await? == VisitDecision::Prune {
                continue;
            }

            let children = match self.base.target.list_subdirectories(&path).await {
                Ok(children) => children,
                Err(e) => {
                    warn!(
                        path = %path.display(),
                        "failed to read directory, skipping subtree: {e:#}"
                    );
                    self.base.set_warning();
                    self.base
                        .send_stats(RetentionStatistics::WalkWarning { path })
                        .await;
                    continue;
                }
            };

            for child in children.into_iter().rev() {
                let Some(name) = child.file_name() else {
                    continue;
                };
                let mut child_components = components.clone();
                child_components.push(name.to_string_lossy().to_string());
                stack.push((child, child_components));
            }
        }

        Ok(())
    }
}
