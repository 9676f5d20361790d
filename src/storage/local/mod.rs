use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::{Context, Result, anyhow};
use async_channel::Sender;
use async_trait::async_trait;

use crate::storage::StorageTrait;
use crate::types::RetentionStatistics;
use crate::types::error::RetentionError;

/// Local filesystem storage backed by `tokio::fs`.
#[derive(Clone)]
pub struct LocalStorage {
    stats_sender: Sender<RetentionStatistics>,
    has_warning: Arc<AtomicBool>,
}

impl LocalStorage {
    pub fn new(stats_sender: Sender<RetentionStatistics>, has_warning: Arc<AtomicBool>) -> Self {
        Self {
            stats_sender,
            has_warning,
        }
    }
}

#[async_trait]
impl StorageTrait for LocalStorage {
    async fn check_directory(&self, path: &Path) -> Result<()> {
        let metadata = tokio::fs::metadata(path).await.map_err(|e| {
            anyhow!(RetentionError::RootUnavailable(format!(
                "{}: {e}",
                path.display()
            )))
        })?;

        if !metadata.is_dir() {
            return Err(anyhow!(RetentionError::RootUnavailable(format!(
                "{}: not a directory",
                path.display()
            ))));
        }

        // Listing permission is what the walk actually needs.
        tokio::fs::read_dir(path).await.map_err(|e| {
            anyhow!(RetentionError::RootUnavailable(format!(
                "{}: {e}",
                path.display()
            )))
        })?;

        Ok(())
    }

    async fn list_subdirectories(&self, path: &Path) -> Result<Vec<PathBuf>> {
        let mut read_dir = tokio::fs::read_dir(path)
            .await
            .with_context(|| format!("tokio::fs::read_dir() failed: {}", path.display()))?;

        let mut directories = Vec::new();
        while let Some(entry) = read_dir
            .next_entry()
            .await
            .with_context(|| format!("DirEntry iteration failed: {}", path.display()))?
        {
            // Symlinks report their own type here and are not followed.
            let file_type = entry
                .file_type()
                .await
                .with_context(|| format!("DirEntry::file_type() failed: {}", path.display()))?;
            if file_type.is_dir() {
                directories.push(entry.path());
            }
        }

        directories.sort();
        Ok(directories)
    }

    async fn remove_dir_all(&self, path: &Path) -> Result<()> {
        tokio::fs::remove_dir_all(path)
            .await
            .with_context(|| format!("tokio::fs::remove_dir_all() failed: {}", path.display()))
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
