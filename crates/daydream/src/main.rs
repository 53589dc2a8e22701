// SPDX-FileCopyrightText: 2026 Daydream Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Daydream - a live prompt queue for AI video streams.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

mod commands;
mod serve;
mod shutdown;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Daydream - a live prompt queue for AI video streams.
#[derive(Parser, Debug)]
#[command(name = "daydream", version, about, long_about = None)]
struct Cli {
    /// Read configuration from this file instead of the standard locations.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the HTTP API, the advancement scheduler and the sweeper.
    Serve,
    /// Run one advancer invocation and publish if a prompt was promoted.
    Tick,
    /// Reclaim stuck flags and purge old entries once.
    Sweep,
    /// Print the display window and pending entries as JSON.
    Status {
        /// Number of pending entries to include.
        #[arg(long)]
        window_size: Option<usize>,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let loaded = match &cli.config {
        Some(path) => daydream_config::load_and_validate_path(path),
        None => daydream_config::load_and_validate(),
    };
    let config = match loaded {
        Ok(config) => config,
        Err(errors) => {
            daydream_config::render_errors(&errors);
            std::process::exit(1);
        }
    };

    init_tracing(&config.service.log_level);

    let result = match cli.command {
        Some(Commands::Serve) => serve::run_serve(config).await,
        Some(Commands::Tick) => commands::run_tick(&config).await,
        Some(Commands::Sweep) => commands::run_sweep(&config).await,
        Some(Commands::Status { window_size }) => commands::run_status(&config, window_size).await,
        None => {
            println!("daydream: use --help for available commands");
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

/// `RUST_LOG` wins over `service.log_level`.
fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("daydream={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .init();
}
