use crate::rpc::BlockSummary;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Result of one sampling cycle. Recomputed from scratch every poll.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChainSnapshot {
    pub block_height: u64,
    pub window_transaction_count: u64,
    pub window_contract_creation_count: u64,
    /// Transactions per second over the sampled window, `None` when the
    /// window does not span a measurable amount of time.
    pub approximate_throughput: Option<f64>,
    pub blocks_requested: u64,
    pub blocks_sampled: u64,
    /// Blocks inside the window whose fetch failed this cycle.
    #[serde(default)]
    pub missing_blocks: Vec<u64>,
    pub sampled_at: DateTime<Utc>,
}

impl ChainSnapshot {
    pub fn aggregate(
        block_height: u64,
        blocks_requested: u64,
        blocks: &[BlockSummary],
        mut missing_blocks: Vec<u64>,
    ) -> Self {
        let window_transaction_count = blocks.iter().map(BlockSummary::transaction_count).sum();
        let window_contract_creation_count =
            blocks.iter().map(BlockSummary::contract_creation_count).sum();
        missing_blocks.sort_unstable_by(|a, b| b.cmp(a));

        Self {
            block_height,
            window_transaction_count,
            window_contract_creation_count,
            approximate_throughput: approximate_throughput(blocks, window_transaction_count),
            blocks_requested,
            blocks_sampled: blocks.len() as u64,
            missing_blocks,
            sampled_at: Utc::now(),
        }
    }

    /// True when at least one block in the window could not be fetched, so the
    /// counts undercount the requested window.
    pub fn is_degraded(&self) -> bool {
        !self.missing_blocks.is_empty()
    }

    pub fn throughput_display(&self) -> String {
        match self.approximate_throughput {
            Some(tps) => format!("{:.2}", tps),
            None => "N/A".to_string(),
        }
    }
}

/// Block numbers covered by a window of `window_size` ending at `height`,
/// newest first and clamped at genesis.
pub fn window_numbers(height: u64, window_size: u64) -> Vec<u64> {
    if window_size == 0 {
        return Vec::new();
    }
    let lowest = height.saturating_sub(window_size - 1);
    (lowest..=height).rev().collect()
}

/// Blocks reporting a zero timestamp (genesis on most chains) carry no usable
/// time and are left out of the span.
fn approximate_throughput(blocks: &[BlockSummary], transactions: u64) -> Option<f64> {
    let timed: Vec<&BlockSummary> = blocks.iter().filter(|b| b.timestamp_seconds > 0).collect();
    if timed.len() < 2 {
        return None;
    }
    let newest = timed.iter().max_by_key(|b| b.number)?;
    let oldest = timed.iter().min_by_key(|b| b.number)?;

    let span = newest.timestamp_seconds.checked_sub(oldest.timestamp_seconds)?;
    if span == 0 {
        return None;
    }
    Some(transactions as f64 / span as f64)
}
