// SPDX-FileCopyrightText: 2026 Daydream Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Daydream prompt queue.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Top-level Daydream configuration.
///
/// All sections are optional and default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct DaydreamConfig {
    /// Process identity and logging.
    #[serde(default)]
    pub service: ServiceConfig,

    /// SQLite store settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Admission and advancement settings.
    #[serde(default)]
    pub queue: QueueConfig,

    /// Outbound gateway delivery settings.
    #[serde(default)]
    pub fanout: FanoutConfig,

    /// Stuck-flag reclaim and retention settings.
    #[serde(default)]
    pub maintenance: MaintenanceConfig,

    /// HTTP listener settings.
    #[serde(default)]
    pub server: ServerConfig,
}

/// Process identity and logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ServiceConfig {
    #[serde(default = "default_service_name")]
    pub name: String,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: default_service_name(),
            log_level: default_log_level(),
        }
    }
}

fn default_service_name() -> String {
    "daydream".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Storage configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Enable WAL (Write-Ahead Logging) mode for SQLite.
    #[serde(default = "default_wal_mode")]
    pub wal_mode: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            wal_mode: default_wal_mode(),
        }
    }
}

fn default_database_path() -> String {
    "daydream.db".to_string()
}

fn default_wal_mode() -> bool {
    true
}

/// Admission gate and advancer configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct QueueConfig {
    /// Display state id; also the stream key every entry is filed under.
    #[serde(default = "default_state_id")]
    pub state_id: String,

    /// Maximum number of unprocessed entries before submissions are rejected.
    #[serde(default = "default_max_queue_size")]
    pub max_queue_size: u64,

    /// Minimum time a promoted prompt stays highlighted.
    #[serde(default = "default_highlight_duration_ms")]
    pub highlight_duration_ms: u64,

    /// Extra delay added to every scheduler re-arm.
    #[serde(default = "default_schedule_slack_ms")]
    pub schedule_slack_ms: u64,

    /// Number of prompts kept in the displayed window. 0 keeps all of them.
    #[serde(default = "default_display_capacity")]
    pub display_capacity: usize,

    /// Pending entries returned with a snapshot when the caller gives none.
    #[serde(default = "default_window_size")]
    pub default_window_size: usize,

    /// Longest accepted prompt, in characters.
    #[serde(default = "default_max_prompt_chars")]
    pub max_prompt_chars: usize,

    /// Window contents at bootstrap. Empty uses the built-in list.
    #[serde(default)]
    pub initial_prompts: Vec<String>,

    /// Look-back window for the trending list.
    #[serde(default = "default_trending_window_hours")]
    pub trending_window_hours: u64,

    #[serde(default = "default_trending_limit")]
    pub trending_limit: usize,
}

impl QueueConfig {
    pub fn highlight_duration(&self) -> Duration {
        Duration::from_millis(self.highlight_duration_ms)
    }

    pub fn schedule_slack(&self) -> Duration {
        Duration::from_millis(self.schedule_slack_ms)
    }

    pub fn trending_window(&self) -> Duration {
        Duration::from_secs(self.trending_window_hours.saturating_mul(3600))
    }
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            state_id: default_state_id(),
            max_queue_size: default_max_queue_size(),
            highlight_duration_ms: default_highlight_duration_ms(),
            schedule_slack_ms: default_schedule_slack_ms(),
            display_capacity: default_display_capacity(),
            default_window_size: default_window_size(),
            max_prompt_chars: default_max_prompt_chars(),
            initial_prompts: Vec::new(),
            trending_window_hours: default_trending_window_hours(),
            trending_limit: default_trending_limit(),
        }
    }
}

fn default_state_id() -> String {
    "main".to_string()
}

fn default_max_queue_size() -> u64 {
    100
}

fn default_highlight_duration_ms() -> u64 {
    10_000
}

fn default_schedule_slack_ms() -> u64 {
    100
}

fn default_display_capacity() -> usize {
    20
}

fn default_window_size() -> usize {
    5
}

fn default_max_prompt_chars() -> usize {
    1000
}

fn default_trending_window_hours() -> u64 {
    3
}

fn default_trending_limit() -> usize {
    5
}

/// Gateway fanout configuration.
///
/// ```toml
/// [fanout]
/// targets = ["stream-a", "stream-b"]
/// api_user = "daydream"
///
/// [fanout.gateways]
/// stream-a = "gw-1.example.com"
/// stream-b = "gw-2.example.com"
/// ```
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct FanoutConfig {
    /// Stream keys every promoted prompt is delivered to.
    #[serde(default)]
    pub targets: Vec<String>,

    /// Stream key to gateway host. A host may carry an explicit scheme.
    #[serde(default)]
    pub gateways: BTreeMap<String, String>,

    /// Basic auth user for the gateway API.
    #[serde(default)]
    pub api_user: Option<String>,

    /// Basic auth password for the gateway API.
    #[serde(default)]
    pub api_password: Option<String>,

    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,

    /// Total attempts per batch, including the first.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    #[serde(default = "default_backoff_base_ms")]
    pub backoff_base_ms: u64,

    /// Upper bound of the uniform jitter added to each backoff delay.
    #[serde(default = "default_jitter_max_ms")]
    pub jitter_max_ms: u64,
}

impl FanoutConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

impl Default for FanoutConfig {
    fn default() -> Self {
        Self {
            targets: Vec::new(),
            gateways: BTreeMap::new(),
            api_user: None,
            api_password: None,
            request_timeout_ms: default_request_timeout_ms(),
            max_attempts: default_max_attempts(),
            backoff_base_ms: default_backoff_base_ms(),
            jitter_max_ms: default_jitter_max_ms(),
        }
    }
}

fn default_request_timeout_ms() -> u64 {
    5_000
}

fn default_max_attempts() -> u32 {
    3
}

fn default_backoff_base_ms() -> u64 {
    500
}

fn default_jitter_max_ms() -> u64 {
    250
}

/// Maintenance sweeper configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct MaintenanceConfig {
    /// A processing flag older than this is considered abandoned.
    #[serde(default = "default_stuck_timeout_secs")]
    pub stuck_timeout_secs: u64,

    /// Processed entries older than this are deleted.
    #[serde(default = "default_retention_hours")]
    pub retention_hours: u64,

    #[serde(default = "default_reclaim_interval_secs")]
    pub reclaim_interval_secs: u64,

    #[serde(default = "default_retention_interval_secs")]
    pub retention_interval_secs: u64,
}

impl MaintenanceConfig {
    pub fn stuck_timeout(&self) -> Duration {
        Duration::from_secs(self.stuck_timeout_secs)
    }

    pub fn retention(&self) -> Duration {
        Duration::from_secs(self.retention_hours.saturating_mul(3600))
    }

    pub fn reclaim_interval(&self) -> Duration {
        Duration::from_secs(self.reclaim_interval_secs)
    }

    pub fn retention_interval(&self) -> Duration {
        Duration::from_secs(self.retention_interval_secs)
    }
}

impl Default for MaintenanceConfig {
    fn default() -> Self {
        Self {
            stuck_timeout_secs: default_stuck_timeout_secs(),
            retention_hours: default_retention_hours(),
            reclaim_interval_secs: default_reclaim_interval_secs(),
            retention_interval_secs: default_retention_interval_secs(),
        }
    }
}

fn default_stuck_timeout_secs() -> u64 {
    300
}

fn default_retention_hours() -> u64 {
    24
}

fn default_reclaim_interval_secs() -> u64 {
    60
}

fn default_retention_interval_secs() -> u64 {
    3600
}

/// HTTP server configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}
