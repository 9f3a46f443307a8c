//! Integration tests for the scheduling loop driving a real poller
//!
//! Uses tokio's paused clock so intervals are deterministic.

use async_trait::async_trait;
use contract_metrics_exporter::contract_call::CallRequest;
use contract_metrics_exporter::gauge_sink::{BalanceGauge, TargetLabels};
use contract_metrics_exporter::jobs::{ContractBalanceJob, PollOptions, CHAINLINK_DATA_FEED};
use contract_metrics_exporter::rpc_client::{ContractCaller, RpcError};
use contract_metrics_exporter::{AddressTarget, PeriodicTask};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Returns how many calls it has served, so each tick publishes a new value.
#[derive(Default)]
struct CountingCaller {
    calls: AtomicU64,
}

#[async_trait]
impl ContractCaller for CountingCaller {
    async fn call(&self, _request: &CallRequest) -> Result<String, RpcError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(format!("0x{:x}", n))
    }
}

fn setup(namespace: &str) -> (Arc<CountingCaller>, Arc<BalanceGauge>, Arc<ContractBalanceJob>, TargetLabels) {
    let caller = Arc::new(CountingCaller::default());
    let gauge = Arc::new(
        BalanceGauge::register(namespace, CHAINLINK_DATA_FEED.name, CHAINLINK_DATA_FEED.help, BTreeMap::new())
            .expect("Failed to register gauge"),
    );
    let target = AddressTarget::new("feed1", "0xABC", "0x0", "0x0");
    let labels = TargetLabels::from(&target);
    let job = Arc::new(ContractBalanceJob::with_sink(
        CHAINLINK_DATA_FEED,
        caller.clone(),
        gauge.clone(),
        vec![target],
        PollOptions::default(),
    ));
    (caller, gauge, job, labels)
}

/// Test that the first observation is available without waiting an interval
#[tokio::test(start_paused = true)]
async fn test_first_poll_is_immediate() {
    let (caller, gauge, job, labels) = setup("sched_immediate");
    let cancel = CancellationToken::new();
    let handle = tokio::spawn(PeriodicTask::new(Duration::from_secs(15)).run(cancel.clone(), job));

    tokio::time::sleep(Duration::from_millis(10)).await;
    assert_eq!(caller.calls.load(Ordering::SeqCst), 1);
    assert_eq!(gauge.value(&labels), Some(1.0));

    cancel.cancel();
    assert_eq!(handle.await.unwrap(), 1);
}

/// Test that later polls follow the interval and stop once cancelled
#[tokio::test(start_paused = true)]
async fn test_polls_follow_interval_until_cancelled() {
    let (caller, gauge, job, labels) = setup("sched_interval");
    let cancel = CancellationToken::new();
    let handle = tokio::spawn(PeriodicTask::new(Duration::from_secs(15)).run(cancel.clone(), job));

    tokio::time::sleep(Duration::from_secs(14)).await;
    assert_eq!(caller.calls.load(Ordering::SeqCst), 1);

    tokio::time::sleep(Duration::from_secs(2)).await;
    assert_eq!(caller.calls.load(Ordering::SeqCst), 2);
    assert_eq!(gauge.value(&labels), Some(2.0));

    cancel.cancel();
    assert_eq!(handle.await.unwrap(), 2);

    // No tick after cancellation is observed.
    tokio::time::sleep(Duration::from_secs(60)).await;
    assert_eq!(caller.calls.load(Ordering::SeqCst), 2);
    assert_eq!(gauge.value(&labels), Some(2.0));
}
