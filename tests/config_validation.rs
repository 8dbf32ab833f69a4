#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
//! Configuration loading and validation behavior.

use std::time::Duration;

use game_protocol::config::{NetworkConfig, WireConfig};
use game_protocol::error::WireError;

#[test]
fn defaults_are_valid() {
    let config = NetworkConfig::default();
    let errors = config.validate();
    assert!(errors.is_empty(), "default config invalid: {errors:?}");
    config.validate_strict().unwrap();
}

#[test]
fn example_config_parses_back() {
    let example = NetworkConfig::example_config();
    let parsed = NetworkConfig::from_toml(&example).unwrap();
    assert!(parsed.validate().is_empty());
}

#[test]
fn toml_overrides_are_applied() {
    let config = NetworkConfig::from_toml(
        r#"
        [wire]
        max_frame_len = 8192
        outbound_queue_limit = 64
        quiet_period = 500

        [server]
        address = "0.0.0.0:4000"
        max_connections = 10
        shutdown_timeout = 5000

        [logging]
        app_name = "login-gateway"
        log_level = "debug"
        json_format = true
        "#,
    )
    .unwrap();

    assert_eq!(config.wire.max_frame_len, 8192);
    assert_eq!(config.wire.outbound_queue_limit, 64);
    assert_eq!(config.wire.quiet_period, Duration::from_millis(500));
    assert_eq!(config.server.address, "0.0.0.0:4000");
    assert_eq!(config.server.max_connections, 10);
    assert_eq!(config.logging.app_name, "login-gateway");
    assert!(config.logging.json_format);

    // Unspecified sections fall back to defaults.
    assert_eq!(config.client.address, "127.0.0.1:7777");
}

#[test]
fn malformed_toml_is_a_misconfiguration() {
    let err = NetworkConfig::from_toml("wire = not-a-table").unwrap_err();
    assert!(matches!(err, WireError::Misconfiguration(_)));
    assert!(err.is_fatal());
}

#[test]
fn frame_ceiling_above_length_field_is_rejected() {
    let wire = WireConfig {
        max_frame_len: 70_000,
        ..WireConfig::default()
    };
    let errors = wire.validate();
    assert_eq!(errors.len(), 1);
    assert!(errors[0].contains("length field"));
    assert!(wire.validate_strict().is_err());
}

#[test]
fn frame_ceiling_below_an_opcode_is_rejected() {
    let wire = WireConfig {
        max_frame_len: 1,
        ..WireConfig::default()
    };
    assert!(!wire.validate().is_empty());
}

#[test]
fn zero_queue_capacity_is_rejected() {
    let wire = WireConfig {
        outbound_queue_limit: 0,
        ..WireConfig::default()
    };
    let errors = wire.validate();
    assert!(errors.iter().any(|e| e.contains("outbound_queue_limit")));
}

#[test]
fn validation_collects_every_problem_at_once() {
    let config = NetworkConfig::from_toml(
        r#"
        [wire]
        max_frame_len = 0
        outbound_queue_limit = 0
        quiet_period = 1

        [server]
        address = "not-an-address"
        "#,
    )
    .unwrap();

    let errors = config.validate();
    assert!(errors.len() >= 4, "expected all problems reported: {errors:?}");

    match config.validate_strict().unwrap_err() {
        WireError::Misconfiguration(msg) => {
            assert!(msg.contains("max_frame_len"));
            assert!(msg.contains("outbound_queue_limit"));
            assert!(msg.contains("not-an-address"));
        }
        other => panic!("expected Misconfiguration, got {other:?}"),
    }
}

#[test]
fn invalid_log_level_fails_parsing() {
    let err = NetworkConfig::from_toml(
        r#"
        [logging]
        app_name = "x"
        log_level = "noisy"
        json_format = false
        "#,
    )
    .unwrap_err();
    assert!(matches!(err, WireError::Misconfiguration(_)));
}

#[test]
fn save_and_reload_roundtrip() {
    let mut path = std::env::temp_dir();
    path.push(format!("game-protocol-config-{}.toml", std::process::id()));

    let config = NetworkConfig::default_with_overrides(|c| {
        c.wire.max_frame_len = 2048;
        c.server.max_connections = 7;
    });
    config.save_to_file(&path).unwrap();

    let reloaded = NetworkConfig::from_file(&path).unwrap();
    assert_eq!(reloaded.wire.max_frame_len, 2048);
    assert_eq!(reloaded.server.max_connections, 7);

    let _ = std::fs::remove_file(&path);
}

#[test]
fn env_overrides_apply() {
    std::env::set_var("GAME_PROTOCOL_MAX_FRAME_LEN", "1234");
    std::env::set_var("GAME_PROTOCOL_QUIET_PERIOD_MS", "750");

    let config = NetworkConfig::from_env().unwrap();
    assert_eq!(config.wire.max_frame_len, 1234);
    assert_eq!(config.wire.quiet_period, Duration::from_millis(750));

    std::env::remove_var("GAME_PROTOCOL_MAX_FRAME_LEN");
    std::env::remove_var("GAME_PROTOCOL_QUIET_PERIOD_MS");
}
