use crate::error::Result;
use crate::metrics::MetricsCollector;
use crate::rpc::{BlockSummary, ChainSource};
use crate::snapshot::{window_numbers, ChainSnapshot};
use futures::stream::{self, StreamExt};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::sleep;

#[derive(Debug, Clone)]
pub struct SamplerOptions {
    pub window_size: u64,
    /// Block requests in flight at once; 1 fetches strictly in order.
    pub concurrency: usize,
    pub request_delay: Duration,
}

impl Default for SamplerOptions {
    fn default() -> Self {
        Self {
            window_size: 10,
            concurrency: 1,
            request_delay: Duration::ZERO,
        }
    }
}

/// Derives a `ChainSnapshot` from the latest block and a trailing window of
/// blocks before it.
pub struct ChainSampler {
    source: Arc<dyn ChainSource>,
    options: SamplerOptions,
    metrics: Arc<MetricsCollector>,
}

impl ChainSampler {
    pub fn new(
        source: Arc<dyn ChainSource>,
        options: SamplerOptions,
        metrics: Option<Arc<MetricsCollector>>,
    ) -> Self {
        Self {
            source,
            options,
            metrics: metrics.unwrap_or_else(|| Arc::new(MetricsCollector::new())),
        }
    }

    pub fn options(&self) -> &SamplerOptions {
        &self.options
    }

    pub fn metrics(&self) -> Arc<MetricsCollector> {
        self.metrics.clone()
    }

    /// Runs one sampling cycle.
    ///
    /// Fails only if the height cannot be read. Blocks that fail to fetch are
    /// left out of the aggregate and listed in `missing_blocks`.
    pub async fn sample(&self) -> Result<ChainSnapshot> {
        let start = Instant::now();
        let height = match self.source.block_number().await {
            Ok(height) => {
                self.metrics.record_success(start.elapsed());
                height
            }
            Err(e) => {
                self.metrics.record_failure(start.elapsed());
                return Err(e);
            }
        };

        let numbers = window_numbers(height, self.options.window_size);
        log::debug!(
            "Sampling {} blocks from #{} (concurrency {})",
            numbers.len(),
            height,
            self.options.concurrency
        );

        let outcomes: Vec<(u64, Result<BlockSummary>)> = stream::iter(numbers.iter().copied())
            .map(|number| self.fetch_block(number))
            .buffered(self.options.concurrency.max(1))
            .collect()
            .await;

        let mut blocks = Vec::with_capacity(outcomes.len());
        let mut missing = Vec::new();
        for (number, outcome) in outcomes {
            match outcome {
                Ok(block) => blocks.push(block),
                Err(e) => {
                    log::warn!("Skipping block #{}: {}", number, e);
                    missing.push(number);
                }
            }
        }
        self.metrics.add_blocks_missing(missing.len() as u64);

        Ok(ChainSnapshot::aggregate(
            height,
            numbers.len() as u64,
            &blocks,
            missing,
        ))
    }

    async fn fetch_block(&self, number: u64) -> (u64, Result<BlockSummary>) {
        let start = Instant::now();
        let result = self.source.block_by_number(number).await;
        let duration = start.elapsed();

        match &result {
            Ok(_) => self.metrics.record_success(duration),
            Err(_) => self.metrics.record_failure(duration),
        }

        if !self.options.request_delay.is_zero() {
            sleep(self.options.request_delay).await;
        }
        (number, result)
    }
}
