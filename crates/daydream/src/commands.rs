// SPDX-FileCopyrightText: 2026 Daydream Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! One-shot commands: `tick`, `sweep` and `status`.

use tokio_util::sync::CancellationToken;

use daydream_config::model::DaydreamConfig;
use daydream_core::DaydreamError;
use daydream_queue::Sweeper;

use crate::serve::Runtime;

/// One advancer invocation; publishes the new highlight if one was promoted.
pub async fn run_tick(config: &DaydreamConfig) -> Result<(), DaydreamError> {
    let runtime = Runtime::open(config, CancellationToken::new()).await?;
    runtime.service.bootstrap().await?;
    let outcome = runtime.service.advance().await;

    match (&outcome.highlighted, outcome.next_eligible_in) {
        (Some(prompt), _) => println!("promoted: {}", prompt.text),
        (None, Some(wait)) => {
            println!("highlight still showing; next eligible in {}ms", wait.as_millis())
        }
        (None, None) if !outcome.success => println!("tick failed; see logs"),
        (None, None) => println!("nothing to promote"),
    }
    println!("backlog: {}", outcome.remaining_backlog);

    runtime.close().await
}

/// One stuck-flag reclaim and one retention purge.
pub async fn run_sweep(config: &DaydreamConfig) -> Result<(), DaydreamError> {
    let runtime = Runtime::open(config, CancellationToken::new()).await?;
    let report = Sweeper::new(runtime.service.clone(), &config.maintenance)
        .sweep_once()
        .await;
    println!(
        "reclaimed {} stuck flag(s), purged {} entr{}",
        report.reclaimed_flags,
        report.purged_entries,
        if report.purged_entries == 1 { "y" } else { "ies" }
    );
    runtime.close().await
}

/// Prints the current snapshot as JSON.
pub async fn run_status(
    config: &DaydreamConfig,
    window_size: Option<usize>,
) -> Result<(), DaydreamError> {
    let runtime = Runtime::open(config, CancellationToken::new()).await?;
    let snapshot = runtime.service.snapshot(window_size).await?;
    let json = serde_json::to_string_pretty(&snapshot)
        .map_err(|e| DaydreamError::Internal(format!("failed to render snapshot: {e}")))?;
    println!("{json}");
    runtime.close().await
}
