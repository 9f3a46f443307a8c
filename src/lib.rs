//! # Contract Metrics Exporter
//!
//! Periodically queries read-only accessors on a configured set of smart contracts
//! over JSON-RPC and publishes the answers as labeled Prometheus gauges.
//!
//! ## Overview
//!
//! Each metric type is one job. A job owns an ordered list of targets, a handle to
//! the shared RPC caller, and exactly one gauge family registered when it is built.
//! On every tick it walks its targets in order:
//!
//! - **Call**: `eth_call` against the latest block, zero-address caller, fixed selector
//! - **Decode**: the returned hex word becomes an `f64`
//! - **Publish**: the value is set on `<namespace>_<metric_type>_balance{name,contract,from,to}`
//!
//! A failing target is logged and skipped. Its last good value stays published.
//!
//! ## Architecture
//!
//! ### Scheduling
//! [`periodic_task::PeriodicTask`] runs any [`periodic_task::Job`] immediately and then
//! once per interval until a cancellation token fires.
//!
//! ### Jobs
//! [`jobs::ContractBalanceJob`] is the poller; [`jobs::CHAINLINK_DATA_FEED`] is the
//! Chainlink `latestAnswer()` metric type.
//!
//! ### Supervision
//! [`exporter::Exporter`] spawns one task per job and waits for all of them on shutdown.

// Core Types
/// Poll targets loaded from configuration
pub mod targets;
/// Read-only call shape (selector, padding, caller, block)
pub mod contract_call;
/// Hex word to `f64` decoding
pub mod decoder;

// Infrastructure
/// JSON-RPC contract caller
pub mod rpc_client;
/// Balance gauge families
pub mod gauge_sink;
/// Metrics and observability
pub mod metrics;

// Jobs & Scheduling
/// Immediate-then-interval scheduling loop
pub mod periodic_task;
/// Per-metric-type pollers
pub mod jobs;
/// Job supervisor
pub mod exporter;

// Settings & Configuration
/// Configuration management
pub mod settings;

// Re-exports for convenience
pub use exporter::Exporter;
pub use jobs::ContractBalanceJob;
pub use periodic_task::{Job, PeriodicTask};
pub use rpc_client::{ContractCaller, EthersCaller};
pub use settings::Settings;
pub use targets::AddressTarget;
