//! # Balance Gauge Families
//!
//! Every job publishes one gauge family named `<namespace>_<metric_type>_balance`,
//! labeled by `(name, contract, from, to)` plus the process-wide constant labels.
//!
//! The [`BalanceSink`] trait is the seam between a job and the metrics pipeline. The
//! production implementation, [`BalanceGauge`], writes through the `metrics` facade
//! (exported by `metrics-exporter-prometheus`) and keeps the last value per label
//! set so the current state can be inspected without scraping.
//!
//! A family name can be registered only once per process; a second registration is
//! rejected with [`MetricsError::AlreadyRegistered`].

use crate::targets::AddressTarget;
use dashmap::{DashMap, DashSet};
use once_cell::sync::Lazy;
use std::collections::BTreeMap;

static REGISTERED_FAMILIES: Lazy<DashSet<String>> = Lazy::new(DashSet::new);

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MetricsError {
    #[error("metric family {0} is already registered")]
    AlreadyRegistered(String),
    #[error("invalid metric name {0:?}")]
    InvalidName(String),
    #[error("invalid constant label {0:?}")]
    InvalidLabel(String),
}

/// Per-target label values, in exposition order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TargetLabels {
    pub name: String,
    pub contract: String,
    pub from: String,
    pub to: String,
}

impl TargetLabels {
    pub const KEYS: [&'static str; 4] = ["name", "contract", "from", "to"];

    pub fn values(&self) -> [&str; 4] {
        [
            self.name.as_str(),
            self.contract.as_str(),
            self.from.as_str(),
            self.to.as_str(),
        ]
    }
}

impl From<&AddressTarget> for TargetLabels {
    fn from(target: &AddressTarget) -> Self {
        Self {
            name: target.name.clone(),
            contract: target.contract.clone(),
            from: target.from.clone(),
            to: target.to.clone(),
        }
    }
}

/// A labeled gauge family. Setting a value is last-write-wins.
pub trait BalanceSink: Send + Sync {
    fn set(&self, labels: &TargetLabels, value: f64);
}

/// Builds `<namespace>_<metric_type>_balance`.
pub fn family_name(namespace: &str, metric_type: &str) -> String {
    if namespace.is_empty() {
        format!("{}_balance", metric_type)
    } else {
        format!("{}_{}_balance", namespace, metric_type)
    }
}

/// Prometheus metric and label names: `[a-zA-Z_][a-zA-Z0-9_]*`.
pub fn is_valid_metric_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Gauge family published through the `metrics` facade.
pub struct BalanceGauge {
    name: String,
    const_labels: BTreeMap<String, String>,
    values: DashMap<TargetLabels, f64>,
}

impl std::fmt::Debug for BalanceGauge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BalanceGauge")
            .field("name", &self.name)
            .field("const_labels", &self.const_labels)
            .field("series", &self.values.len())
            .finish()
    }
}

impl BalanceGauge {
    /// Registers the family once per process.
    pub fn register(
        namespace: &str,
        metric_type: &str,
        help: &'static str,
        const_labels: BTreeMap<String, String>,
    ) -> Result<Self, MetricsError> {
        let name = family_name(namespace, metric_type);
        if !is_valid_metric_name(&name) {
            return Err(MetricsError::InvalidName(name));
        }
        for key in const_labels.keys() {
            if !is_valid_metric_name(key) || TargetLabels::KEYS.contains(&key.as_str()) {
                return Err(MetricsError::InvalidLabel(key.clone()));
            }
        }
        if !REGISTERED_FAMILIES.insert(name.clone()) {
            return Err(MetricsError::AlreadyRegistered(name));
        }

        crate::metrics::describe_balance_gauge(&name, help);

        Ok(Self {
            name,
            const_labels,
            values: DashMap::new(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Last value published for `labels`, if any.
    pub fn value(&self, labels: &TargetLabels) -> Option<f64> {
        self.values.get(labels).map(|v| *v)
    }

    pub fn series_count(&self) -> usize {
        self.values.len()
    }

    #[cfg(feature = "observability")]
    fn publish(&self, labels: &TargetLabels, value: f64) {
        let mut all = Vec::with_capacity(TargetLabels::KEYS.len() + self.const_labels.len());
        for (key, val) in TargetLabels::KEYS.iter().zip(labels.values()) {
            all.push(::metrics::Label::new(*key, val.to_string()));
        }
        for (key, val) in &self.const_labels {
            all.push(::metrics::Label::new(key.clone(), val.clone()));
        }
        let key = ::metrics::Key::from_parts(self.name.clone(), all);
        ::metrics::recorder().register_gauge(&key).set(value);
    }

    #[cfg(not(feature = "observability"))]
    fn publish(&self, _labels: &TargetLabels, _value: f64) {}
}

impl BalanceSink for BalanceGauge {
    fn set(&self, labels: &TargetLabels, value: f64) {
        self.publish(labels, value);
        self.values.insert(labels.clone(), value);
    }
}
