//! # Contract Balance Job
//!
//! Polls a fixed read-only accessor on every configured contract and publishes the
//! decoded answer into one gauge family per metric type.
//!
//! Targets are polled one after another in configured order. A failing target is
//! logged with its identity, counted in `exporter_poll_errors_total`, and skipped;
//! its previous gauge value stays in place until a later tick succeeds. There is no
//! retry inside a tick: the next scheduled tick is the retry.

use crate::contract_call::{CallRequest, CallShape, LATEST_ANSWER_SELECTOR};
use crate::decoder::{hex_to_f64, DecodeError};
use crate::gauge_sink::{BalanceGauge, BalanceSink, MetricsError, TargetLabels};
use crate::metrics;
use crate::periodic_task::Job;
use crate::rpc_client::{ContractCaller, RpcError};
use crate::targets::AddressTarget;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info};

/// Upper bound for a single `eth_call`, so one hung endpoint cannot hold a tick
/// (and therefore shutdown) indefinitely.
pub const DEFAULT_RPC_TIMEOUT: Duration = Duration::from_secs(10);

/// Static description of one metric type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JobKind {
    pub name: &'static str,
    pub help: &'static str,
    pub shape: CallShape,
}

/// Chainlink aggregator `latestAnswer()`.
pub const CHAINLINK_DATA_FEED: JobKind = JobKind {
    name: "chainlink_data_feed",
    help: "The balance of a ethereum chainlink data feed contract.",
    shape: CallShape::new(LATEST_ANSWER_SELECTOR),
};

#[derive(Debug, Clone, Copy)]
pub struct PollOptions {
    pub rpc_timeout: Duration,
    pub padding_bytes: usize,
}

impl Default for PollOptions {
    fn default() -> Self {
        Self {
            rpc_timeout: DEFAULT_RPC_TIMEOUT,
            padding_bytes: CHAINLINK_DATA_FEED.shape.padding_bytes,
        }
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PollError {
    #[error(transparent)]
    Rpc(#[from] RpcError),
    #[error("eth_call timed out after {0:?}")]
    Timeout(Duration),
    #[error("failed to decode answer {raw:?}: {source}")]
    Decode {
        raw: String,
        #[source]
        source: DecodeError,
    },
}

impl PollError {
    /// Short reason label for `exporter_poll_errors_total`.
    pub fn reason(&self) -> &'static str {
        match self {
            PollError::Rpc(RpcError::InvalidAddress(_)) => "invalid_address",
            PollError::Rpc(_) => "rpc",
            PollError::Timeout(_) => "timeout",
            PollError::Decode { .. } => "decode",
        }
    }
}

/// Outcome of one tick.
#[derive(Debug, Default)]
pub struct TickReport {
    pub updated: usize,
    pub failures: Vec<(AddressTarget, PollError)>,
    pub duration: Duration,
}

impl std::fmt::Display for TickReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Targets: {}/{} updated in {:?}",
            self.updated,
            self.updated + self.failures.len(),
            self.duration
        )
    }
}

pub struct ContractBalanceJob {
    kind: JobKind,
    caller: Arc<dyn ContractCaller>,
    sink: Arc<dyn BalanceSink>,
    targets: Vec<AddressTarget>,
    shape: CallShape,
    rpc_timeout: Duration,
}

impl ContractBalanceJob {
    /// Registers `<namespace>_<kind>_balance`; fails if that family already exists.
    pub fn new(
        kind: JobKind,
        caller: Arc<dyn ContractCaller>,
        namespace: &str,
        const_labels: BTreeMap<String, String>,
        targets: Vec<AddressTarget>,
        options: PollOptions,
    ) -> Result<Self, MetricsError> {
        let gauge = BalanceGauge::register(namespace, kind.name, kind.help, const_labels)?;
        info!(
            job = kind.name,
            family = gauge.name(),
            targets = targets.len(),
            "Registered balance gauge"
        );
        Ok(Self::with_sink(kind, caller, Arc::new(gauge), targets, options))
    }

    /// Builds the job around an already-registered sink.
    pub fn with_sink(
        kind: JobKind,
        caller: Arc<dyn ContractCaller>,
        sink: Arc<dyn BalanceSink>,
        targets: Vec<AddressTarget>,
        options: PollOptions,
    ) -> Self {
        Self {
            kind,
            caller,
            sink,
            targets,
            shape: kind.shape.with_padding(options.padding_bytes),
            rpc_timeout: options.rpc_timeout,
        }
    }

    /// Polls every target once, in order, isolating failures per target.
    pub async fn poll_all(&self) -> TickReport {
        let start = Instant::now();
        let mut report = TickReport::default();

        for target in &self.targets {
            match self.poll_target(target).await {
                Ok(value) => {
                    debug!(job = self.kind.name, target = %target.name, value, "Updated balance");
                    report.updated += 1;
                }
                Err(e) => {
                    error!(
                        job = self.kind.name,
                        target = %target.name,
                        contract = %target.contract,
                        from = %target.from,
                        to = %target.to,
                        error = %e,
                        "Failed to get {} balance",
                        self.kind.name
                    );
                    metrics::increment_poll_error(self.kind.name, e.reason());
                    report.failures.push((target.clone(), e));
                }
            }
        }

        report.duration = start.elapsed();
        metrics::record_tick(self.kind.name, report.duration);
        report
    }

    /// Calls, decodes and publishes one target. Returns the published value.
    pub async fn poll_target(&self, target: &AddressTarget) -> Result<f64, PollError> {
        let request = CallRequest::read_only(&target.contract, &self.shape);

        self.caller.ready().await;
        let start = Instant::now();
        let outcome = tokio::time::timeout(self.rpc_timeout, self.caller.call(&request)).await;
        metrics::record_rpc_call(
            self.kind.name,
            matches!(outcome, Ok(Ok(_))),
            start.elapsed(),
        );

        let raw = match outcome {
            Ok(result) => result?,
            Err(_) => return Err(PollError::Timeout(self.rpc_timeout)),
        };
        let value = hex_to_f64(&raw).map_err(|source| PollError::Decode { raw, source })?;

        self.sink.set(&TargetLabels::from(target), value);
        Ok(value)
    }
}

#[async_trait]
impl Job for ContractBalanceJob {
    fn name(&self) -> &'static str {
        self.kind.name
    }

    async fn tick(&self) {
        let report = self.poll_all().await;
        metrics::record_heartbeat();
        info!(job = self.kind.name, "{}", report);
    }
}
