// SPDX-FileCopyrightText: 2026 Daydream Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Integration tests for the Daydream configuration system.

use daydream_config::diagnostic::ConfigError;
use daydream_config::model::DaydreamConfig;
use daydream_config::{load_and_validate_path, load_and_validate_str, load_config_from_str};

#[test]
fn valid_toml_deserializes_into_daydream_config() {
    let toml = r#"
[service]
name = "daydream-test"
log_level = "debug"

[storage]
database_path = "/tmp/queue.db"
wal_mode = false

[queue]
max_queue_size = 50
highlight_duration_ms = 8000
display_capacity = 10
initial_prompts = ["a neon city", "a calm lake"]

[fanout]
targets = ["stream-a", "stream-b"]
api_user = "daydream"
api_password = "hunter2"
max_attempts = 5

[fanout.gateways]
stream-a = "gw-1.example.com"
stream-b = "http://localhost:9000"

[maintenance]
stuck_timeout_secs = 120

[server]
host = "0.0.0.0"
port = 8080
"#;

    let config = load_and_validate_str(toml).expect("valid TOML should load");
    assert_eq!(config.service.name, "daydream-test");
    assert_eq!(config.storage.database_path, "/tmp/queue.db");
    assert!(!config.storage.wal_mode);
    assert_eq!(config.queue.max_queue_size, 50);
    assert_eq!(config.queue.highlight_duration().as_secs(), 8);
    assert_eq!(config.queue.display_capacity, 10);
    assert_eq!(config.queue.initial_prompts.len(), 2);
    assert_eq!(config.fanout.targets, vec!["stream-a", "stream-b"]);
    assert_eq!(
        config.fanout.gateways.get("stream-b").map(String::as_str),
        Some("http://localhost:9000")
    );
    assert_eq!(config.fanout.max_attempts, 5);
    assert_eq!(config.maintenance.stuck_timeout().as_secs(), 120);
    assert_eq!(config.server.port, 8080);
}

#[test]
fn empty_toml_uses_defaults() {
    let config = load_config_from_str("").expect("empty TOML should use defaults");

    assert_eq!(config.service.log_level, "info");
    assert_eq!(config.storage.database_path, "daydream.db");
    assert!(config.storage.wal_mode);
    assert_eq!(config.queue.state_id, "main");
    assert_eq!(config.queue.max_queue_size, 100);
    assert_eq!(config.queue.highlight_duration_ms, 10_000);
    assert_eq!(config.queue.display_capacity, 20);
    assert_eq!(config.queue.default_window_size, 5);
    assert!(config.fanout.targets.is_empty());
    assert_eq!(config.fanout.request_timeout().as_secs(), 5);
    assert_eq!(config.fanout.max_attempts, 3);
    assert_eq!(config.maintenance.stuck_timeout().as_secs(), 300);
    assert_eq!(config.maintenance.retention().as_secs(), 24 * 3600);
    assert_eq!(config.server.host, "127.0.0.1");
}

#[test]
fn unknown_key_is_rejected_with_suggestion() {
    let toml = r#"
[queue]
max_queu_size = 10
"#;

    let errors = load_and_validate_str(toml).expect_err("unknown key should fail");
    let unknown = errors
        .iter()
        .find_map(|e| match e {
            ConfigError::UnknownKey {
                key, suggestion, ..
            } => Some((key.clone(), suggestion.clone())),
            _ => None,
        })
        .expect("should produce an UnknownKey diagnostic");
    assert_eq!(unknown.0, "max_queu_size");
    assert_eq!(unknown.1.as_deref(), Some("max_queue_size"));
}

#[test]
fn wrong_type_is_reported() {
    let toml = r#"
[server]
port = "eighty"
"#;

    let errors = load_and_validate_str(toml).expect_err("bad type should fail");
    assert!(
        errors
            .iter()
            .any(|e| matches!(e, ConfigError::InvalidType { key, .. } if key.contains("port")))
    );
}

#[test]
fn dotted_override_maps_to_section_field() {
    use figment::{Figment, providers::Serialized};

    // Same shape the env provider produces for DAYDREAM_FANOUT_API_USER.
    let config: DaydreamConfig = Figment::new()
        .merge(Serialized::defaults(DaydreamConfig::default()))
        .merge(("fanout.api_user", "from-env"))
        .extract()
        .expect("dotted key should merge");

    assert_eq!(config.fanout.api_user.as_deref(), Some("from-env"));
}

#[test]
fn config_file_path_is_loaded_and_validated() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("daydream.toml");
    std::fs::write(&path, "[queue]\nmax_queue_size = 0\n").unwrap();

    let errors = load_and_validate_path(&path).expect_err("zero cap should fail validation");
    assert!(errors.iter().any(
        |e| matches!(e, ConfigError::Validation { message } if message.contains("max_queue_size"))
    ));
}

#[test]
fn missing_config_file_falls_back_to_defaults() {
    let config = load_and_validate_path(std::path::Path::new("/nonexistent/daydream.toml"))
        .expect("missing file is skipped");
    assert_eq!(config.queue.state_id, "main");
}

#[test]
fn env_vars_override_file_values() {
    figment::Jail::expect_with(|jail| {
        jail.create_file(
            "daydream.toml",
            r#"
[queue]
max_queue_size = 10

[fanout]
api_user = "from-file"
"#,
        )?;
        jail.set_env("DAYDREAM_QUEUE_MAX_QUEUE_SIZE", "25");
        jail.set_env("DAYDREAM_FANOUT_API_USER", "from-env");
        jail.set_env("DAYDREAM_SERVER_PORT", "8088");

        let config = daydream_config::load_config_from_path(std::path::Path::new("daydream.toml"))
            .map_err(|e| e.to_string())?;
        assert_eq!(config.queue.max_queue_size, 25);
        assert_eq!(config.fanout.api_user.as_deref(), Some("from-env"));
        assert_eq!(config.server.port, 8088);
        Ok(())
    });
}
