// SPDX-FileCopyrightText: 2026 Daydream Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints that cannot be expressed via serde
//! attributes, such as valid bind addresses, non-zero limits, and
//! credentials being present when delivery targets are configured.

use std::collections::HashSet;

use crate::diagnostic::ConfigError;
use crate::model::DaydreamConfig;

/// Ten years. Retention and trending windows are subtracted from the wall
/// clock, so they must stay well inside the representable date range.
const MAX_WINDOW_HOURS: u64 = 24 * 365 * 10;

/// One week.
const MAX_STUCK_TIMEOUT_SECS: u64 = 7 * 24 * 3600;

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns all collected validation errors (does not fail fast).
pub fn validate_config(config: &DaydreamConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();
    let mut fail = |message: String| errors.push(ConfigError::Validation { message });

    let host = config.server.host.trim();
    if host.is_empty() {
        fail("server.host must not be empty".to_string());
    } else {
        let is_valid_ip = host.parse::<std::net::IpAddr>().is_ok();
        let is_valid_hostname = host
            .chars()
            .all(|c| c.is_alphanumeric() || c == '.' || c == '-' || c == ':');
        if !is_valid_ip && !is_valid_hostname {
            fail(format!(
                "server.host `{host}` is not a valid IP address or hostname"
            ));
        }
    }

    if config.storage.database_path.trim().is_empty() {
        fail("storage.database_path must not be empty".to_string());
    }

    let queue = &config.queue;
    if queue.state_id.trim().is_empty() {
        fail("queue.state_id must not be empty".to_string());
    }
    if queue.max_queue_size == 0 {
        fail("queue.max_queue_size must be at least 1".to_string());
    }
    if queue.max_prompt_chars == 0 {
        fail("queue.max_prompt_chars must be at least 1".to_string());
    }
    if queue.trending_limit == 0 {
        fail("queue.trending_limit must be at least 1".to_string());
    }
    if queue.trending_window_hours > MAX_WINDOW_HOURS {
        fail(format!(
            "queue.trending_window_hours must be at most {MAX_WINDOW_HOURS}"
        ));
    }
    for (i, prompt) in queue.initial_prompts.iter().enumerate() {
        if prompt.trim().is_empty() {
            fail(format!("queue.initial_prompts[{i}] must not be empty"));
        }
    }

    let fanout = &config.fanout;
    if fanout.max_attempts == 0 {
        fail("fanout.max_attempts must be at least 1".to_string());
    }
    if fanout.request_timeout_ms == 0 {
        fail("fanout.request_timeout_ms must be greater than 0".to_string());
    }
    let mut seen = HashSet::new();
    for target in &fanout.targets {
        if target.trim().is_empty() {
            fail("fanout.targets must not contain empty stream keys".to_string());
        } else if !seen.insert(target) {
            fail(format!("duplicate target `{target}` in fanout.targets"));
        }
    }
    for (target, host) in &fanout.gateways {
        if host.trim().is_empty() {
            fail(format!("fanout.gateways.{target} must not be empty"));
        }
    }
    if !fanout.targets.is_empty() {
        if fanout.api_user.as_deref().is_none_or(|u| u.trim().is_empty()) {
            fail("fanout.api_user is required when fanout.targets is set".to_string());
        }
        if fanout.api_password.as_deref().is_none_or(str::is_empty) {
            fail("fanout.api_password is required when fanout.targets is set".to_string());
        }
    }

    let maintenance = &config.maintenance;
    if maintenance.reclaim_interval_secs == 0 {
        fail("maintenance.reclaim_interval_secs must be greater than 0".to_string());
    }
    if maintenance.retention_interval_secs == 0 {
        fail("maintenance.retention_interval_secs must be greater than 0".to_string());
    }
    if maintenance.stuck_timeout_secs == 0 {
        fail("maintenance.stuck_timeout_secs must be greater than 0".to_string());
    } else if maintenance.stuck_timeout_secs > MAX_STUCK_TIMEOUT_SECS {
        fail(format!(
            "maintenance.stuck_timeout_secs must be at most {MAX_STUCK_TIMEOUT_SECS}"
        ));
    }
    if maintenance.retention_hours > MAX_WINDOW_HOURS {
        fail(format!(
            "maintenance.retention_hours must be at most {MAX_WINDOW_HOURS}"
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn has_message(errors: &[ConfigError], needle: &str) -> bool {
        errors
            .iter()
            .any(|e| matches!(e, ConfigError::Validation { message } if message.contains(needle)))
    }

    #[test]
    fn default_config_validates() {
        assert!(validate_config(&DaydreamConfig::default()).is_ok());
    }

    #[test]
    fn empty_database_path_fails_validation() {
        let mut config = DaydreamConfig::default();
        config.storage.database_path = "".to_string();
        let errors = validate_config(&config).unwrap_err();
        assert!(has_message(&errors, "database_path"));
    }

    #[test]
    fn targets_without_credentials_fail() {
        let mut config = DaydreamConfig::default();
        config.fanout.targets = vec!["stream-a".to_string()];
        let errors = validate_config(&config).unwrap_err();
        assert!(has_message(&errors, "api_user"));
        assert!(has_message(&errors, "api_password"));
    }

    #[test]
    fn targets_with_credentials_pass() {
        let mut config = DaydreamConfig::default();
        config.fanout.targets = vec!["stream-a".to_string()];
        config
            .fanout
            .gateways
            .insert("stream-a".to_string(), "gw.example.com".to_string());
        config.fanout.api_user = Some("user".to_string());
        config.fanout.api_password = Some("secret".to_string());
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn errors_are_collected_not_fail_fast() {
        let mut config = DaydreamConfig::default();
        config.queue.max_queue_size = 0;
        config.fanout.max_attempts = 0;
        config.server.host = "not a host!".to_string();
        config.fanout.targets = vec!["a".to_string(), "a".to_string()];
        let errors = validate_config(&config).unwrap_err();
        assert!(has_message(&errors, "max_queue_size"));
        assert!(has_message(&errors, "max_attempts"));
        assert!(has_message(&errors, "server.host"));
        assert!(has_message(&errors, "duplicate target"));
    }

    #[test]
    fn oversized_time_windows_fail() {
        let mut config = DaydreamConfig::default();
        config.maintenance.retention_hours = 3_000_000_000;
        config.maintenance.stuck_timeout_secs = u64::MAX;
        config.queue.trending_window_hours = MAX_WINDOW_HOURS + 1;
        let errors = validate_config(&config).unwrap_err();
        assert!(has_message(&errors, "retention_hours"));
        assert!(has_message(&errors, "stuck_timeout_secs"));
        assert!(has_message(&errors, "trending_window_hours"));
    }

    #[test]
    fn blank_initial_prompt_fails() {
        let mut config = DaydreamConfig::default();
        config.queue.initial_prompts = vec!["a forest".to_string(), "  ".to_string()];
        let errors = validate_config(&config).unwrap_err();
        assert!(has_message(&errors, "initial_prompts[1]"));
    }
}
