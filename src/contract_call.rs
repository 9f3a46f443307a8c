// src/contract_call.rs
//
// Shape of the read-only `eth_call` issued for every target.

use ethers::types::{Address, BlockNumber, Bytes};
use std::str::FromStr;

/// `latestAnswer()` on a Chainlink aggregator, `keccak256("latestAnswer()")[..4]`.
pub const LATEST_ANSWER_SELECTOR: [u8; 4] = [0x50, 0xd2, 0x5b, 0xcd];

/// Trailing zero bytes appended after the selector. A no-argument accessor takes no
/// argument words, so the ABI payload is the bare selector.
pub const DEFAULT_CALL_PADDING_BYTES: usize = 0;

/// Fixed selector plus zero padding. One per metric type; never varies per target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallShape {
    pub selector: [u8; 4],
    pub padding_bytes: usize,
}

impl CallShape {
    pub const fn new(selector: [u8; 4]) -> Self {
        Self {
            selector,
            padding_bytes: DEFAULT_CALL_PADDING_BYTES,
        }
    }

    /// Builds a shape from a Solidity signature such as `"latestAnswer()"`.
    pub fn for_signature(signature: &str) -> Self {
        Self::new(ethers::utils::id(signature))
    }

    pub fn with_padding(mut self, padding_bytes: usize) -> Self {
        self.padding_bytes = padding_bytes;
        self
    }

    pub fn calldata(&self) -> Bytes {
        let mut data = Vec::with_capacity(4 + self.padding_bytes);
        data.extend_from_slice(&self.selector);
        data.resize(4 + self.padding_bytes, 0);
        Bytes::from(data)
    }
}

/// A single read-only contract call against the latest block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallRequest {
    /// Contract address exactly as configured; the transport parses it.
    pub to: String,
    pub from: Address,
    pub data: Bytes,
    pub block: BlockNumber,
}

impl CallRequest {
    /// Zero-address caller, latest state.
    pub fn read_only(to: &str, shape: &CallShape) -> Self {
        Self {
            to: to.to_string(),
            from: Address::zero(),
            data: shape.calldata(),
            block: BlockNumber::Latest,
        }
    }
}

/// Parses a configured contract string into an address.
pub fn parse_address(raw: &str) -> Result<Address, String> {
    Address::from_str(raw.trim()).map_err(|e| format!("{}: {}", raw, e))
}
