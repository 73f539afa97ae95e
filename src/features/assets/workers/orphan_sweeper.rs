use std::sync::Arc;

use chrono::Utc;
use tokio::time::interval;

use crate::core::config::SweeperConfig;
use crate::core::error::{AppError, Result};
use crate::features::assets::repositories::AssetRepository;
use crate::modules::storage::ObjectStorageGateway;

/// Outcome of one sweep pass
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SweepStats {
    pub confirmed: usize,
    pub removed: usize,
    pub skipped: usize,
}

/// Background worker reconciling metadata rows with object storage.
///
/// A row is unconfirmed until its object has been seen in storage. Rows still
/// unconfirmed after the grace period either get confirmed (object present) or
/// deleted (upload never landed).
pub struct OrphanSweeper {
    repo: Arc<dyn AssetRepository>,
    gateway: Arc<dyn ObjectStorageGateway>,
    config: SweeperConfig,
}

impl OrphanSweeper {
    pub fn new(
        repo: Arc<dyn AssetRepository>,
        gateway: Arc<dyn ObjectStorageGateway>,
        config: SweeperConfig,
    ) -> Self {
        Self {
            repo,
            gateway,
            config,
        }
    }

    /// Run the sweeper in a background loop
    pub async fn run(&self) {
        tracing::info!(
            "Starting orphan sweeper (interval={:?}, grace={:?})",
            self.config.interval,
            self.config.grace
        );

        let mut interval = interval(self.config.interval);

        loop {
            interval.tick().await;

            match self.sweep_once().await {
                Ok(stats) if stats != SweepStats::default() => {
                    tracing::info!(
                        "Orphan sweep: confirmed={}, removed={}, skipped={}",
                        stats.confirmed,
                        stats.removed,
                        stats.skipped
                    );
                }
                Ok(_) => {}
                Err(e) => tracing::error!("Error during orphan sweep: {:?}", e),
            }
        }
    }

    /// Check every unconfirmed row past the grace period, one page at a time.
    ///
    /// Pages are keyed on `(created_at, id)` so rows whose check keeps failing
    /// are stepped over instead of filling every page.
    pub async fn sweep_once(&self) -> Result<SweepStats> {
        let grace = chrono::Duration::from_std(self.config.grace)
            .map_err(|e| AppError::Internal(format!("Invalid sweep grace period: {}", e)))?;
        let cutoff = Utc::now() - grace;

        let mut stats = SweepStats::default();
        let mut cursor = None;
        loop {
            let page = self
                .repo
                .list_unconfirmed(cutoff, cursor, self.config.batch_size)
                .await?;
            let page_len = page.len();
            cursor = page.last().map(|f| (f.created_at, f.id));

            for file in page {
                match self.gateway.object_exists(&file.key).await {
                    Ok(true) => {
                        self.repo.mark_confirmed(file.id).await?;
                        stats.confirmed += 1;
                    }
                    Ok(false) => {
                        if self.repo.delete_unconfirmed(file.id).await? {
                            tracing::warn!(
                                "Removed orphaned metadata key={} owner={}",
                                file.key,
                                file.owner_id
                            );
                            stats.removed += 1;
                        }
                    }
                    Err(e) => {
                        tracing::warn!("Could not check object key={}: {}", file.key, e);
                        stats.skipped += 1;
                    }
                }
            }

            if cursor.is_none() || (page_len as i64) < self.config.batch_size {
                break;
            }
        }

        Ok(stats)
    }
}
