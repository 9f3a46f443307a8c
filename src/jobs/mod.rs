// Jobs Module - one poller per metric type

pub mod contract_balance;

pub use contract_balance::{
    ContractBalanceJob, JobKind, PollError, PollOptions, TickReport, CHAINLINK_DATA_FEED,
};
