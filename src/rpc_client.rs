// src/rpc_client.rs
//
// Read-only contract calls over JSON-RPC. Jobs only see the `ContractCaller` trait;
// the ethers-backed implementation is shared (`Arc`) across every job in the process.

use crate::contract_call::{parse_address, CallRequest};
use async_trait::async_trait;
use ethers::prelude::{Http, Provider};
use ethers::providers::Middleware;
use ethers::types::transaction::eip2718::TypedTransaction;
use ethers::types::{BlockId, TransactionRequest};
use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;

type DefaultDirectRateLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RpcError {
    #[error("invalid contract address {0}")]
    InvalidAddress(String),
    #[error("invalid rpc url {url}: {reason}")]
    InvalidUrl { url: String, reason: String },
    #[error("eth_call failed: {0}")]
    Call(String),
}

/// Executes a read-only `eth_call` and returns the raw hex result.
#[async_trait]
pub trait ContractCaller: Send + Sync {
    /// Waits until another call may be issued. Callers bound only `call` by their
    /// timeout, so throttling never turns into a timed-out poll.
    async fn ready(&self) {}

    async fn call(&self, request: &CallRequest) -> Result<String, RpcError>;
}

/// `ContractCaller` over any ethers middleware, with an optional process-wide QPS cap.
pub struct EthersCaller<M> {
    provider: Arc<M>,
    endpoint: String,
    limiter: Option<Arc<DefaultDirectRateLimiter>>,
}

impl EthersCaller<Provider<Http>> {
    pub fn connect(url: &str) -> Result<Self, RpcError> {
        let provider = Provider::<Http>::try_from(url).map_err(|e| RpcError::InvalidUrl {
            url: url.to_string(),
            reason: e.to_string(),
        })?;
        Ok(Self::new(Arc::new(provider), url))
    }
}

impl<M: Middleware> EthersCaller<M> {
    pub fn new(provider: Arc<M>, endpoint: impl Into<String>) -> Self {
        Self {
            provider,
            endpoint: endpoint.into(),
            limiter: None,
        }
    }

    /// Caps outgoing calls at `qps` per second across all jobs sharing this caller,
    /// enforced in [`ContractCaller::ready`]. `None` or zero disables the cap.
    pub fn with_qps_limit(mut self, qps: Option<u32>) -> Self {
        self.limiter = qps
            .and_then(NonZeroU32::new)
            .map(|qps| Arc::new(RateLimiter::direct(Quota::per_second(qps))));
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl<M> ContractCaller for EthersCaller<M>
where
    M: Middleware + 'static,
{
    async fn ready(&self) {
        if let Some(limiter) = &self.limiter {
            limiter.until_ready().await;
        }
    }

    async fn call(&self, request: &CallRequest) -> Result<String, RpcError> {
        let to = parse_address(&request.to).map_err(RpcError::InvalidAddress)?;

        let tx: TypedTransaction = TransactionRequest::new()
            .to(to)
            .from(request.from)
            .data(request.data.clone())
            .into();

        let start = Instant::now();
        let result = self
            .provider
            .call(&tx, Some(BlockId::Number(request.block)))
            .await;
        debug!(
            endpoint = %self.endpoint,
            to = %request.to,
            success = result.is_ok(),
            duration = ?start.elapsed(),
            "[RPC_TRACE] eth_call"
        );

        result
            .map(|bytes| format!("0x{}", hex::encode(&bytes)))
            .map_err(|e| RpcError::Call(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract_call::{CallShape, LATEST_ANSWER_SELECTOR};
    use ethers::types::Bytes;

    const FEED: &str = "0x5f4eC3Df9cbd43714FE2740f5E3616155c5b8419";

    fn request(to: &str) -> CallRequest {
        CallRequest::read_only(to, &CallShape::new(LATEST_ANSWER_SELECTOR))
    }

    #[tokio::test]
    async fn returns_hex_encoded_result() {
        let (provider, mock) = Provider::mocked();
        let word = hex::decode("000000000000000000000000000000000000000000000000000000003b9aca00").unwrap();
        mock.push::<Bytes, _>(Bytes::from(word)).unwrap();

        let caller = EthersCaller::new(Arc::new(provider), "mock");
        let out = caller.call(&request(FEED)).await.unwrap();
        assert_eq!(
            out,
            "0x000000000000000000000000000000000000000000000000000000003b9aca00"
        );
    }

    #[tokio::test]
    async fn transport_error_is_surfaced() {
        // No queued response: the mock transport fails the request.
        let (provider, _mock) = Provider::mocked();
        let caller = EthersCaller::new(Arc::new(provider), "mock");
        let err = caller.call(&request(FEED)).await.unwrap_err();
        assert!(matches!(err, RpcError::Call(_)), "err={:?}", err);
    }

    #[tokio::test]
    async fn invalid_address_fails_before_the_call() {
        let (provider, _mock) = Provider::mocked();
        let caller = EthersCaller::new(Arc::new(provider), "mock");
        let err = caller.call(&request("0xABC")).await.unwrap_err();
        assert!(matches!(err, RpcError::InvalidAddress(_)), "err={:?}", err);
    }

    #[test]
    fn connect_rejects_bad_url() {
        assert!(matches!(
            EthersCaller::connect("not a url"),
            Err(RpcError::InvalidUrl { .. })
        ));
    }

    #[tokio::test]
    async fn qps_limit_zero_is_disabled() {
        let (provider, _mock) = Provider::mocked();
        let caller = EthersCaller::new(Arc::new(provider), "mock").with_qps_limit(Some(0));
        assert!(caller.limiter.is_none());
        assert_eq!(caller.endpoint(), "mock");
    }

    #[tokio::test]
    async fn qps_limit_admits_first_call() {
        let (provider, _mock) = Provider::mocked();
        let caller = EthersCaller::new(Arc::new(provider), "mock").with_qps_limit(Some(1));
        assert!(caller.limiter.is_some());
        tokio::time::timeout(std::time::Duration::from_secs(1), caller.ready())
            .await
            .expect("first call is within quota");
    }
}
