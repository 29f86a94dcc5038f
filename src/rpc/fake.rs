use crate::error::{Error, Result};
use crate::rpc::{BlockSummary, ChainSource, TransactionSummary};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

/// In-memory chain for sampler and poller tests.
#[derive(Default)]
pub struct FakeChain {
    height: Mutex<Option<u64>>,
    blocks: Mutex<HashMap<u64, BlockSummary>>,
    requested: Mutex<Vec<u64>>,
    gate: Option<Arc<Notify>>,
}

impl FakeChain {
    pub fn with_height(height: u64) -> Self {
        Self {
            height: Mutex::new(Some(height)),
            ..Self::default()
        }
    }

    /// Height calls wait until the returned `Notify` is signalled.
    pub fn gated(mut self) -> (Self, Arc<Notify>) {
        let gate = Arc::new(Notify::new());
        self.gate = Some(gate.clone());
        (self, gate)
    }

    pub fn set_height(&self, height: Option<u64>) {
        *self.height.lock().unwrap() = height;
    }

    pub fn insert_block(&self, number: u64, timestamp: u64, txs: usize, creations: usize) {
        let transactions = (0..txs)
            .map(|i| TransactionSummary {
                to: (i >= creations).then(|| format!("0x{:040x}", i + 1)),
            })
            .collect();
        self.blocks.lock().unwrap().insert(
            number,
            BlockSummary {
                number,
                timestamp_seconds: timestamp,
                transactions,
            },
        );
    }

    pub fn requested(&self) -> Vec<u64> {
        self.requested.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChainSource for FakeChain {
    async fn block_number(&self) -> Result<u64> {
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        let height = *self.height.lock().unwrap();
        height.ok_or_else(|| Error::Rpc {
            code: -32000,
            message: "height unavailable".to_string(),
        })
    }

    async fn block_by_number(&self, number: u64) -> Result<BlockSummary> {
        self.requested.lock().unwrap().push(number);
        let block = self.blocks.lock().unwrap().get(&number).cloned();
        block.ok_or(Error::BlockNotFound(number))
    }
}
