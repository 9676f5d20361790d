use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::{debug, info, trace};

use crate::stage::{SendResult, Stage};
use crate::timestamp::decode_from_components;
use crate::types::{Candidate, RetentionStatistics, RunCounters};
use crate::walker::{DirectoryLevel, DirectoryVisitor, VisitDecision};

/// Decides, per directory of one tenant subtree, whether to descend and
/// whether a minute directory is a deletion candidate.
///
/// The cutoff is resolved once per tenant by the walker. A minute directory
/// is a candidate iff its decoded instant is strictly before the cutoff.
pub struct CandidateEvaluator<'a> {
    stage: &'a Stage,
    tenant: String,
    cutoff: DateTime<Utc>,
    run_counters: Arc<RunCounters>,
}

impl<'a> CandidateEvaluator<'a> {
    pub fn new(
        stage: &'a Stage,
        tenant: String,
        cutoff: DateTime<Utc>,
        run_counters: Arc<RunCounters>,
    ) -> Self {
        Self {
            stage,
            tenant,
            cutoff,
            run_counters,
        }
    }

    async fn evaluate_minute(&self, path: &Path, components: &[String]) -> Result<()> {
        let scanned = self.run_counters.increment_scanned();
        self.stage
            .send_stats(RetentionStatistics::DirectoryScanned)
            .await;

        match decode_from_components(components) {
            None => {
                trace!(path = %path.display(), "malformed timestamp. skipping.");
            }
            Some(timestamp) if timestamp < self.cutoff => {
                self.run_counters.increment_candidates();
                self.stage
                    .send_stats(RetentionStatistics::CandidateFound {
                        path: path.to_path_buf(),
                    })
                    .await;

                let candidate = Candidate {
                    path: path.to_path_buf(),
                    tenant: self.tenant.clone(),
                    timestamp,
                };
                if self.stage.send(candidate).await? == SendResult::Closed {
                    debug!(path = %path.display(), "candidate queue has been closed.");
                }
            }
            Some(_) => {
                trace!(path = %path.display(), "within retention. keeping.");
            }
        }

        self.report_progress(scanned);
        Ok(())
    }

    fn report_progress(&self, scanned: u64) {
        let log_every = self.stage.config.log_every;
        if log_every == 0 || scanned % log_every != 0 {
            return;
        }

        let stats = self.run_counters.snapshot();
        info!(
            scanned = stats.scanned,
            candidates = stats.candidates,
            deleted = stats.deleted,
            failed = stats.failed,
            "progress."
        );
    }
}

#[async_trait]
impl DirectoryVisitor for CandidateEvaluator<'_> {
    async fn visit(&self, path: &Path, components: &[String]) -> Result<VisitDecision> {
        match DirectoryLevel::from_depth(components.len()) {
            DirectoryLevel::Root
            | DirectoryLevel::Tenant
            | DirectoryLevel::Device
            | DirectoryLevel::TimeBucket => Ok(VisitDecision::Descend),
            DirectoryLevel::Minute => {
                self.evaluate_minute(path, components).await?;
                Ok(VisitDecision::Prune)
            }
            DirectoryLevel::Unexpected => {
                debug!(
                    path = %path.display(),
                    depth = components.len(),
                    "directory deeper than minute level. pruning."
                );
                Ok(VisitDecision::Prune)
            }
        }
    }
}
