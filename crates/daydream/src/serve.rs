// SPDX-FileCopyrightText: 2026 Daydream Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `daydream serve` and the one-shot maintenance commands.
//!
//! `serve` opens SQLite storage, seeds the display state, and runs the HTTP
//! surface, the advancement scheduler and the maintenance sweeper until a
//! shutdown signal arrives.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use daydream_config::model::DaydreamConfig;
use daydream_core::{DaydreamError, HealthStatus, PluginAdapter, StorageAdapter};
use daydream_fanout::GatewayFanout;
use daydream_gateway::GatewayState;
use daydream_queue::{QueueService, Sweeper};
use daydream_storage::SqliteStorage;

use crate::shutdown;

/// Storage plus the service wired over it.
pub struct Runtime {
    pub storage: Arc<SqliteStorage>,
    pub service: QueueService,
}

impl Runtime {
    /// Opens storage and wires the queue service to the gateway fanout.
    pub async fn open(
        config: &DaydreamConfig,
        cancel: CancellationToken,
    ) -> Result<Self, DaydreamError> {
        let storage = SqliteStorage::new(config.storage.clone());
        storage.initialize().await?;
        let storage = Arc::new(storage);

        let fanout = Arc::new(GatewayFanout::new(&config.fanout)?);
        match fanout.health_check().await? {
            HealthStatus::Healthy => {}
            status => warn!(?status, "fanout is not fully configured"),
        }

        let service = QueueService::new(
            storage.clone(),
            storage.clone(),
            fanout,
            &config.queue,
            cancel,
        );
        Ok(Self { storage, service })
    }

    /// Stops the scheduler and closes storage.
    pub async fn close(self) -> Result<(), DaydreamError> {
        self.service.shutdown().await;
        self.storage.close().await
    }
}

/// Runs the `daydream serve` command.
pub async fn run_serve(config: DaydreamConfig) -> Result<(), DaydreamError> {
    info!(name = %config.service.name, "starting daydream serve");

    let cancel = shutdown::install_signal_handler();
    let runtime = Runtime::open(&config, cancel.clone()).await?;

    runtime.service.bootstrap().await?;
    // Drain any backlog left from a previous run.
    runtime.service.wake();

    let sweeper = Sweeper::new(runtime.service.clone(), &config.maintenance);
    let sweeper_task = {
        let cancel = cancel.clone();
        tokio::spawn(async move { sweeper.run(cancel).await })
    };

    let state = GatewayState::new(runtime.service.clone());
    let served = daydream_gateway::start_server(&config.server, state, cancel.clone()).await;
    if let Err(e) = &served {
        error!(error = %e, "HTTP server failed");
    }

    // Reaching here means either a signal or a server failure.
    cancel.cancel();
    if let Err(e) = sweeper_task.await {
        warn!(error = %e, "sweeper task ended abnormally");
    }
    runtime.close().await?;
    info!("daydream stopped");
    served
}
