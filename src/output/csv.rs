use super::{CycleCursor, OutputHandler};
use crate::error::{Error, Result};
use crate::poller::DashboardState;
use crate::snapshot::ChainSnapshot;
use async_trait::async_trait;
use std::path::PathBuf;

const HEADERS: [&str; 8] = [
    "sampled_at",
    "block_height",
    "window_transaction_count",
    "window_contract_creation_count",
    "approximate_throughput",
    "blocks_requested",
    "blocks_sampled",
    "missing_blocks",
];

pub struct CsvOutput {
    writer: csv::Writer<std::fs::File>,
    headers_written: bool,
    cursor: CycleCursor,
}

impl CsvOutput {
    pub fn new(path: PathBuf) -> Result<Self> {
        let writer = csv::Writer::from_path(path)
            .map_err(|e| Error::Internal(e.to_string()))?;

        Ok(Self {
            writer,
            headers_written: false,
            cursor: CycleCursor::default(),
        })
    }
}

fn record(snapshot: &ChainSnapshot) -> Vec<String> {
    vec![
        snapshot.sampled_at.to_rfc3339(),
        snapshot.block_height.to_string(),
        snapshot.window_transaction_count.to_string(),
        snapshot.window_contract_creation_count.to_string(),
        snapshot
            .approximate_throughput
            .map(|tps| format!("{:.4}", tps))
            .unwrap_or_default(),
        snapshot.blocks_requested.to_string(),
        snapshot.blocks_sampled.to_string(),
        snapshot
            .missing_blocks
            .iter()
            .map(u64::to_string)
            .collect::<Vec<_>>()
            .join(";"),
    ]
}

#[async_trait]
impl OutputHandler for CsvOutput {
    async fn write(&mut self, state: &DashboardState) -> Result<()> {
        let Some(snapshot) = self.cursor.next(state) else {
            return Ok(());
        };

        if !self.headers_written {
            self.writer.write_record(HEADERS)
                .map_err(|e| Error::Internal(e.to_string()))?;
            self.headers_written = true;
        }

        self.writer.write_record(record(snapshot))
            .map_err(|e| Error::Internal(e.to_string()))?;
        self.writer.flush()?;
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}
