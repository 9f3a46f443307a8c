use crate::gauge_sink::is_valid_metric_name;
use crate::jobs::PollOptions;
use crate::targets::AddressTarget;
use config::{Config, ConfigError, File, FileFormat};
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::env;
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Deserialize, Clone)]
pub struct Rpc {
    pub url: String,
    /// Process-wide cap on eth_call rate; shared by every job.
    #[serde(default)]
    pub qps_limit: Option<u32>,
    #[serde(default = "default_rpc_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_rpc_timeout_ms() -> u64 {
    10_000
}

#[derive(Debug, Deserialize, Clone)]
pub struct Metrics {
    #[serde(default = "default_namespace")]
    pub namespace: String,
    #[serde(default)]
    pub const_labels: HashMap<String, String>,
    #[serde(default = "default_listen_address")]
    pub listen_address: String,
}

fn default_namespace() -> String {
    "eth".to_string()
}
fn default_listen_address() -> String {
    "0.0.0.0:9090".to_string()
}

impl Default for Metrics {
    fn default() -> Self {
        Self {
            namespace: default_namespace(),
            const_labels: HashMap::new(),
            listen_address: default_listen_address(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct Polling {
    #[serde(default = "default_interval_seconds")]
    pub interval_seconds: u64,
    /// Zero bytes appended after the 4-byte selector.
    #[serde(default)]
    pub call_padding_bytes: usize,
}

fn default_interval_seconds() -> u64 {
    15
}

impl Default for Polling {
    fn default() -> Self {
        Self {
            interval_seconds: default_interval_seconds(),
            call_padding_bytes: 0,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Jobs {
    #[serde(default)]
    pub chainlink_data_feed: Vec<AddressTarget>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    pub rpc: Rpc,
    #[serde(default)]
    pub metrics: Metrics,
    #[serde(default)]
    pub polling: Polling,
    #[serde(default)]
    pub jobs: Jobs,
}

impl Settings {
    /// Loads a TOML file, then applies `EXPORTER_*` overrides and validates.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let s = Config::builder()
            .add_source(File::from(path.as_ref()))
            .build()?;
        Self::finish(s, |key| env::var(key).ok())
    }

    /// Parses inline TOML. `EXPORTER_*` variables are not consulted.
    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        let s = Config::builder()
            .add_source(File::from_str(raw, FileFormat::Toml))
            .build()?;
        Self::finish(s, |_| None)
    }

    fn finish<F>(s: Config, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut settings: Self = s.try_deserialize()?;
        settings.apply_env_overrides(lookup);
        settings.validate()?;
        Ok(settings)
    }

    /// Overrides from `EXPORTER_*` variables. Empty values are ignored.
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        if let Some(url) = non_empty("EXPORTER_RPC_URL") {
            self.rpc.url = url;
        }
        if let Some(namespace) = non_empty("EXPORTER_NAMESPACE") {
            self.metrics.namespace = namespace;
        }
        if let Some(address) = non_empty("EXPORTER_METRICS_ADDRESS") {
            self.metrics.listen_address = address;
        }

        // Optional: constant labels via ENV (JSON: { label: value })
        if let Some(raw_labels) = non_empty("EXPORTER_CONST_LABELS") {
            match serde_json::from_str::<HashMap<String, String>>(&raw_labels) {
                Ok(map) => {
                    for (key, value) in map {
                        if !key.trim().is_empty() {
                            self.metrics.const_labels.insert(key, value);
                        }
                    }
                }
                Err(e) => {
                    eprintln!("Failed to parse EXPORTER_CONST_LABELS as JSON: {}", e);
                }
            }
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.rpc.url.trim().is_empty() {
            return Err(ConfigError::Message("rpc.url must not be empty".into()));
        }
        if self.polling.interval_seconds == 0 {
            return Err(ConfigError::Message(
                "polling.interval_seconds must be greater than zero".into(),
            ));
        }
        if self.rpc.timeout_ms == 0 {
            return Err(ConfigError::Message(
                "rpc.timeout_ms must be greater than zero".into(),
            ));
        }
        if !self.metrics.namespace.is_empty() && !is_valid_metric_name(&self.metrics.namespace) {
            return Err(ConfigError::Message(format!(
                "metrics.namespace {:?} is not a valid metric name prefix",
                self.metrics.namespace
            )));
        }
        self.metrics_address()?;
        for (i, target) in self.jobs.chainlink_data_feed.iter().enumerate() {
            if target.name.trim().is_empty() || target.contract.trim().is_empty() {
                return Err(ConfigError::Message(format!(
                    "jobs.chainlink_data_feed[{}] needs a name and a contract",
                    i
                )));
            }
        }
        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.polling.interval_seconds)
    }

    pub fn poll_options(&self) -> PollOptions {
        PollOptions {
            rpc_timeout: Duration::from_millis(self.rpc.timeout_ms),
            padding_bytes: self.polling.call_padding_bytes,
        }
    }

    pub fn const_labels(&self) -> BTreeMap<String, String> {
        self.metrics
            .const_labels
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    pub fn metrics_address(&self) -> Result<SocketAddr, ConfigError> {
        self.metrics.listen_address.parse().map_err(|e| {
            ConfigError::Message(format!(
                "metrics.listen_address {:?}: {}",
                self.metrics.listen_address, e
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
        [rpc]
        url = "http://127.0.0.1:8545"
    "#;

    #[test]
    fn defaults_apply() {
        let settings = Settings::from_toml_str(MINIMAL).unwrap();
        assert_eq!(settings.poll_interval(), Duration::from_secs(15));
        assert_eq!(settings.poll_options().rpc_timeout, Duration::from_secs(10));
        assert_eq!(settings.poll_options().padding_bytes, 0);
        assert_eq!(settings.metrics.namespace, "eth");
        assert!(settings.jobs.chainlink_data_feed.is_empty());
        assert_eq!(settings.metrics_address().unwrap().port(), 9090);
    }

    #[test]
    fn env_overrides_win() {
        let mut settings = Settings::from_toml_str(MINIMAL).unwrap();
        settings.apply_env_overrides(|key| match key {
            "EXPORTER_RPC_URL" => Some("http://node:8545".to_string()),
            "EXPORTER_NAMESPACE" => Some("   ".to_string()),
            "EXPORTER_CONST_LABELS" => Some(r#"{"network":"mainnet"}"#.to_string()),
            _ => None,
        });
        assert_eq!(settings.rpc.url, "http://node:8545");
        assert_eq!(settings.metrics.namespace, "eth");
        assert_eq!(settings.const_labels().get("network").map(String::as_str), Some("mainnet"));
    }

    #[test]
    fn inline_toml_ignores_environment() {
        std::env::set_var("EXPORTER_NAMESPACE", "from_env");
        let settings = Settings::from_toml_str(MINIMAL).unwrap();
        std::env::remove_var("EXPORTER_NAMESPACE");
        assert_eq!(settings.metrics.namespace, "eth");
    }

    #[test]
    fn bad_const_labels_json_is_ignored() {
        let mut settings = Settings::from_toml_str(MINIMAL).unwrap();
        settings.apply_env_overrides(|key| {
            (key == "EXPORTER_CONST_LABELS").then(|| "not json".to_string())
        });
        assert!(settings.metrics.const_labels.is_empty());
    }

    #[test]
    fn zero_interval_is_rejected() {
        let raw = format!("{}\n[polling]\ninterval_seconds = 0\n", MINIMAL);
        assert!(Settings::from_toml_str(&raw).is_err());
    }

    #[test]
    fn bad_namespace_is_rejected() {
        let raw = format!("{}\n[metrics]\nnamespace = \"eth-mainnet\"\n", MINIMAL);
        assert!(Settings::from_toml_str(&raw).is_err());
    }

    #[test]
    fn target_without_contract_is_rejected() {
        let raw = format!(
            "{}\n[[jobs.chainlink_data_feed]]\nname = \"eth_usd\"\ncontract = \"\"\n",
            MINIMAL
        );
        assert!(Settings::from_toml_str(&raw).is_err());
    }
}
