// SPDX-FileCopyrightText: 2026 Daydream Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./daydream.toml` > `~/.config/daydream/daydream.toml`
//! > `/etc/daydream/daydream.toml` with environment variable overrides via the
//! `DAYDREAM_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::{Path, PathBuf};

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

use crate::model::DaydreamConfig;

pub(crate) const SYSTEM_CONFIG: &str = "/etc/daydream/daydream.toml";
pub(crate) const LOCAL_CONFIG: &str = "daydream.toml";

pub(crate) fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("daydream/daydream.toml"))
}

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/daydream/daydream.toml` (system-wide)
/// 3. `~/.config/daydream/daydream.toml` (user XDG config)
/// 4. `./daydream.toml` (local directory)
/// 5. `DAYDREAM_*` environment variables
pub fn load_config() -> Result<DaydreamConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a TOML string only (no XDG lookup, no env).
pub fn load_config_from_str(toml_content: &str) -> Result<DaydreamConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(DaydreamConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<DaydreamConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(DaydreamConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Build the Figment used for config loading, before extraction.
pub fn build_figment() -> Figment {
    Figment::new()
        .merge(Serialized::defaults(DaydreamConfig::default()))
        .merge(Toml::file(SYSTEM_CONFIG))
        .merge(Toml::file(user_config_path().unwrap_or_default()))
        .merge(Toml::file(LOCAL_CONFIG))
        .merge(env_provider())
}

/// Environment provider with explicit section-to-dot mapping.
///
/// Uses `Env::map()` rather than `Env::split("_")` because key names contain
/// underscores: `DAYDREAM_FANOUT_API_USER` must map to `fanout.api_user`, not
/// `fanout.api.user`.
fn env_provider() -> Env {
    Env::prefixed("DAYDREAM_").map(|key| map_env_key(key.as_str()).into())
}

/// Maps a prefix-stripped env var name to a dotted, lowercase config path.
///
/// Figment hands the key over in its original case.
pub(crate) fn map_env_key(key: &str) -> String {
    const SECTIONS: [&str; 6] = ["service", "storage", "queue", "fanout", "maintenance", "server"];

    let key = key.to_ascii_lowercase();
    for section in SECTIONS {
        if let Some(rest) = key.strip_prefix(section).and_then(|r| r.strip_prefix('_')) {
            return format!("{section}.{rest}");
        }
    }
    key
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_keys_split_on_section_only() {
        assert_eq!(map_env_key("fanout_api_user"), "fanout.api_user");
        assert_eq!(map_env_key("queue_max_queue_size"), "queue.max_queue_size");
        assert_eq!(
            map_env_key("maintenance_stuck_timeout_secs"),
            "maintenance.stuck_timeout_secs"
        );
        assert_eq!(map_env_key("server_port"), "server.port");
    }

    #[test]
    fn uppercase_env_keys_are_lowercased() {
        assert_eq!(map_env_key("FANOUT_API_USER"), "fanout.api_user");
        assert_eq!(map_env_key("QUEUE_MAX_QUEUE_SIZE"), "queue.max_queue_size");
        assert_eq!(map_env_key("Server_Port"), "server.port");
    }

    #[test]
    fn unknown_section_is_left_alone() {
        assert_eq!(map_env_key("something_else"), "something_else");
    }
}
