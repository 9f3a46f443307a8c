//! Integration tests for configuration loading
//!
//! Tests verify that the shipped Config.toml loads and that files on disk are
//! validated before any job is built.

use contract_metrics_exporter::settings::Settings;
use std::io::Write;
use std::time::Duration;

fn write_config(contents: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new()
        .suffix(".toml")
        .tempfile()
        .expect("Failed to create temp config");
    file.write_all(contents.as_bytes())
        .expect("Failed to write temp config");
    file
}

/// Test that the shipped configuration loads with its chainlink targets in order
#[test]
fn test_shipped_config_loads() {
    let raw = std::fs::read_to_string("Config.toml").expect("Failed to read Config.toml");
    let settings = Settings::from_toml_str(&raw).expect("Failed to load settings");

    let feeds = &settings.jobs.chainlink_data_feed;
    assert_eq!(feeds.len(), 2, "Config.toml ships two chainlink feeds");
    assert_eq!(feeds[0].name, "eth_usd");
    assert_eq!(feeds[1].name, "btc_usd");
    assert_eq!(settings.poll_interval(), Duration::from_secs(15));
    assert_eq!(settings.metrics.namespace, "eth");
    assert_eq!(settings.rpc.url, "http://127.0.0.1:8545");
}

/// Test that a config file on disk is read field by field
#[test]
fn test_config_from_path() {
    let file = write_config(
        r#"
        [rpc]
        url = "http://10.0.0.1:8545"
        qps_limit = 5
        timeout_ms = 2500

        [metrics]
        namespace = "arb"

        [polling]
        interval_seconds = 30
        call_padding_bytes = 12

        [[jobs.chainlink_data_feed]]
        name = "feed1"
        contract = "0xABC"
        from = "0x0"
        to = "0x0"
        "#,
    );

    let settings = Settings::from_path(file.path()).expect("Failed to load temp config");
    assert_eq!(settings.rpc.qps_limit, Some(5));
    assert_eq!(settings.poll_interval(), Duration::from_secs(30));
    assert_eq!(settings.poll_options().rpc_timeout, Duration::from_millis(2500));
    assert_eq!(settings.poll_options().padding_bytes, 12);
    assert_eq!(settings.metrics.namespace, "arb");

    let feed = &settings.jobs.chainlink_data_feed[0];
    assert_eq!(
        (feed.name.as_str(), feed.contract.as_str(), feed.from.as_str(), feed.to.as_str()),
        ("feed1", "0xABC", "0x0", "0x0")
    );
}

/// Test that a missing rpc section is a startup error
#[test]
fn test_missing_rpc_is_rejected() {
    let file = write_config(
        r#"
        [polling]
        interval_seconds = 15
        "#,
    );
    assert!(Settings::from_path(file.path()).is_err());
}

/// Test that a missing file is a startup error
#[test]
fn test_missing_file_is_rejected() {
    assert!(Settings::from_path("/nonexistent/exporter.toml").is_err());
}

/// Test that an unparseable listen address is a startup error
#[test]
fn test_bad_listen_address_is_rejected() {
    let file = write_config(
        r#"
        [rpc]
        url = "http://127.0.0.1:8545"

        [metrics]
        listen_address = "not-an-address"
        "#,
    );
    assert!(Settings::from_path(file.path()).is_err());
}
