// SPDX-FileCopyrightText: 2026 Daydream Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Maintenance sweeper: reclaims abandoned processing flags and purges old
//! processed entries on independent intervals.

use std::time::Duration;

use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use daydream_config::model::MaintenanceConfig;
use daydream_core::{DaydreamError, SweepReport};

use crate::clock::cutoff_before;
use crate::service::QueueService;

pub struct Sweeper {
    service: QueueService,
    stuck_timeout: Duration,
    retention: Duration,
    reclaim_interval: Duration,
    retention_interval: Duration,
}

impl Sweeper {
    pub fn new(service: QueueService, config: &MaintenanceConfig) -> Self {
        Self {
            service,
            stuck_timeout: config.stuck_timeout(),
            retention: config.retention(),
            reclaim_interval: config.reclaim_interval(),
            retention_interval: config.retention_interval(),
        }
    }

    /// Clears flags held longer than the stuck timeout. Wakes the advancer
    /// when anything was reclaimed.
    pub async fn reclaim(&self) -> Result<u64, DaydreamError> {
        let now = self.service.clock().now();
        let cutoff = cutoff_before(now, self.stuck_timeout, "stuck timeout")?;
        let reclaimed = self
            .service
            .display_store()
            .reclaim_stuck(cutoff, now)
            .await?;
        if reclaimed > 0 {
            info!(reclaimed, "stuck processing flags reclaimed");
            self.service.wake();
        }
        Ok(reclaimed)
    }

    /// Deletes processed entries older than the retention window.
    pub async fn purge(&self) -> Result<u64, DaydreamError> {
        let cutoff = cutoff_before(self.service.clock().now(), self.retention, "retention")?;
        let purged = self
            .service
            .queue_store()
            .purge_processed_before(cutoff)
            .await?;
        if purged > 0 {
            info!(purged, "processed entries purged");
        }
        Ok(purged)
    }

    /// Runs both tasks once. Failures are logged and counted as zero.
    pub async fn sweep_once(&self) -> SweepReport {
        let reclaimed_flags = self.reclaim().await.unwrap_or_else(|e| {
            warn!(error = %e, "reclaim failed");
            0
        });
        let purged_entries = self.purge().await.unwrap_or_else(|e| {
            warn!(error = %e, "retention purge failed");
            0
        });
        SweepReport {
            reclaimed_flags,
            purged_entries,
        }
    }

    /// Drives both tasks until `cancel` fires.
    pub async fn run(&self, cancel: CancellationToken) {
        let mut reclaim_tick = tokio::time::interval(self.reclaim_interval);
        let mut retention_tick = tokio::time::interval(self.retention_interval);
        reclaim_tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
        retention_tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(
            reclaim_secs = self.reclaim_interval.as_secs(),
            retention_secs = self.retention_interval.as_secs(),
            "maintenance sweeper started"
        );

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    debug!("maintenance sweeper stopping");
                    break;
                }
                _ = reclaim_tick.tick() => {
                    if let Err(e) = self.reclaim().await {
                        warn!(error = %e, "reclaim failed; retrying next interval");
                    }
                }
                _ = retention_tick.tick() => {
                    if let Err(e) = self.purge().await {
                        warn!(error = %e, "retention purge failed; retrying next interval");
                    }
                }
            }
        }
    }
}
