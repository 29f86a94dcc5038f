pub mod client;
pub mod types;

#[cfg(test)]
pub(crate) mod fake;

pub use client::{ChainSource, JsonRpcClient};
pub use types::{BlockSummary, TransactionSummary};
