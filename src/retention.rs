//! Per-tenant retention policy.
//!
//! The policy is loaded once from a JSON document of the form
//!
//! ```json
//! { "retention": { "default": 30, "1001": 60 } }
//! ```
//!
//! and is then shared read-only by every stage of the run.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result, anyhow};
use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;

use crate::types::error::RetentionError;

/// Key of the mandatory fallback entry.
pub const DEFAULT_RETENTION_KEY: &str = "default";

#[derive(Debug, Deserialize)]
struct RetentionDocument {
    retention: Option<HashMap<String, u32>>,
}

/// Mapping from tenant identifier to retention window in days.
///
/// Always contains a [`DEFAULT_RETENTION_KEY`] entry; construction fails
/// otherwise. Cloning is cheap.
#[derive(Debug, Clone, PartialEq)]
pub struct RetentionPolicy {
    days: Arc<HashMap<String, u32>>,
}

impl RetentionPolicy {
    /// Build a policy from an already parsed table.
    pub fn new(days: HashMap<String, u32>) -> Result<Self> {
        if !days.contains_key(DEFAULT_RETENTION_KEY) {
            return Err(anyhow!(RetentionError::InvalidConfig(format!(
                "retention.{DEFAULT_RETENTION_KEY} is missing."
            ))));
        }

        Ok(Self {
            days: Arc::new(days),
        })
    }

    /// A policy with only a default entry.
    pub fn with_default(days: u32) -> Self {
        Self {
            days: Arc::new(HashMap::from([(DEFAULT_RETENTION_KEY.to_string(), days)])),
        }
    }

    /// Parse a policy from its JSON representation.
    pub fn from_json(json: &str) -> Result<Self> {
        let document: RetentionDocument = serde_json::from_str(json)
            .map_err(|e| anyhow!(RetentionError::InvalidConfig(e.to_string())))?;

        let days = document.retention.ok_or_else(|| {
            anyhow!(RetentionError::InvalidConfig(
                "retention map is missing.".to_string()
            ))
        })?;

        Self::new(days)
    }

    /// Read and parse a policy file.
    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)
            .map_err(|e| anyhow!(RetentionError::InvalidConfig(e.to_string())))
            .with_context(|| format!("failed to read retention config: {}", path.display()))?;

        Self::from_json(&json)
            .with_context(|| format!("failed to parse retention config: {}", path.display()))
    }

    /// Retention window for `tenant`, falling back to the default entry.
    pub fn retention_days_for(&self, tenant: &str) -> u32 {
        self.days
            .get(tenant)
            .or_else(|| self.days.get(DEFAULT_RETENTION_KEY))
            .copied()
            .unwrap_or_default()
    }

    /// Instant before which `tenant`'s minute directories are expired.
    ///
    /// Saturates at the earliest representable instant for absurdly large
    /// windows.
    pub fn cutoff_for(&self, tenant: &str, now: DateTime<Utc>) -> DateTime<Utc> {
        let days = self.retention_days_for(tenant);
        now.checked_sub_signed(Duration::days(i64::from(days)))
            .unwrap_or(DateTime::<Utc>::MIN_UTC)
    }

    /// Whether `tenant` has its own entry.
    pub fn has_override(&self, tenant: &str) -> bool {
        tenant != DEFAULT_RETENTION_KEY && self.days.contains_key(tenant)
    }
}
