use crate::metrics::{MetricsCollector, MetricsSnapshot};
use crate::sampler::ChainSampler;
use crate::snapshot::ChainSnapshot;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::MissedTickBehavior;
use tokio_stream::wrappers::IntervalStream;
use tokio_stream::StreamExt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollerState {
    Idle,
    Running,
    Stopped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    Completed,
    Failed,
    /// Another cycle was still in flight.
    Skipped,
}

/// What the dashboard shows. A failed cycle sets `last_error` and keeps the
/// previous snapshot.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DashboardState {
    pub latest: Option<ChainSnapshot>,
    pub last_error: Option<String>,
    pub cycles_completed: u64,
}

impl DashboardState {
    pub fn is_loading(&self) -> bool {
        self.latest.is_none() && self.last_error.is_none()
    }
}

struct InFlightGuard(Arc<AtomicBool>);

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

pub struct Poller {
    sampler: ChainSampler,
    interval: Duration,
    metrics: Arc<MetricsCollector>,
    in_flight: Arc<AtomicBool>,
    dashboard: watch::Sender<DashboardState>,
    state_watcher: watch::Sender<PollerState>,
}

impl Poller {
    pub fn new(sampler: ChainSampler, interval: Duration) -> Self {
        let (dashboard, _) = watch::channel(DashboardState::default());
        let (state_tx, _) = watch::channel(PollerState::Idle);

        Self {
            metrics: sampler.metrics(),
            sampler,
            interval,
            in_flight: Arc::new(AtomicBool::new(false)),
            dashboard,
            state_watcher: state_tx,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn subscribe(&self) -> watch::Receiver<DashboardState> {
        self.dashboard.subscribe()
    }

    pub fn dashboard(&self) -> DashboardState {
        self.dashboard.borrow().clone()
    }

    pub fn watch_state(&self) -> watch::Receiver<PollerState> {
        self.state_watcher.subscribe()
    }

    pub fn state(&self) -> PollerState {
        *self.state_watcher.borrow()
    }

    pub fn get_metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Runs a single cycle unless one is already outstanding.
    pub async fn poll_once(&self) -> CycleOutcome {
        match self.try_begin_cycle() {
            Some(_guard) => self.execute_cycle().await,
            None => {
                self.metrics.increment_ticks_skipped();
                CycleOutcome::Skipped
            }
        }
    }

    /// Starts the timer loop. The first cycle runs immediately; dropping or
    /// stopping the handle releases the timer and aborts any cycle in flight.
    pub fn spawn(self: Arc<Self>) -> PollerHandle {
        let poller = self.clone();
        let task = tokio::spawn(async move { poller.drive().await });
        PollerHandle { poller: self, task }
    }

    async fn drive(self: Arc<Self>) {
        self.set_state(PollerState::Running);
        log::info!("Polling every {}ms", self.interval.as_millis());

        let mut interval = tokio::time::interval(self.interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut ticks = IntervalStream::new(interval);
        let mut cycles = JoinSet::new();

        loop {
            tokio::select! {
                Some(_) = ticks.next() => {
                    match self.try_begin_cycle() {
                        Some(guard) => {
                            let poller = self.clone();
                            cycles.spawn(async move {
                                let _guard = guard;
                                poller.execute_cycle().await
                            });
                        }
                        None => {
                            self.metrics.increment_ticks_skipped();
                            log::debug!("Previous cycle still in flight, skipping tick");
                        }
                    }
                }
                Some(joined) = cycles.join_next(), if !cycles.is_empty() => {
                    if let Err(e) = joined {
                        log::error!("Sampling cycle aborted: {}", e);
                    }
                }
            }
        }
    }

    fn try_begin_cycle(&self) -> Option<InFlightGuard> {
        self.in_flight
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .ok()
            .map(|_| InFlightGuard(self.in_flight.clone()))
    }

    async fn execute_cycle(&self) -> CycleOutcome {
        self.metrics.increment_cycles_started();

        match self.sampler.sample().await {
            Ok(snapshot) => {
                self.metrics.increment_cycles_completed();
                log::info!(
                    "Block #{}: {} txs, {} contracts, {} tps over {}/{} blocks",
                    snapshot.block_height,
                    snapshot.window_transaction_count,
                    snapshot.window_contract_creation_count,
                    snapshot.throughput_display(),
                    snapshot.blocks_sampled,
                    snapshot.blocks_requested
                );
                self.dashboard.send_modify(|state| {
                    state.latest = Some(snapshot);
                    state.last_error = None;
                    state.cycles_completed += 1;
                });
                CycleOutcome::Completed
            }
            Err(e) => {
                self.metrics.increment_cycles_failed();
                if e.is_remote() {
                    log::warn!("Sampling cycle failed: {}", e);
                } else {
                    log::error!("Sampling cycle failed: {}", e);
                }
                self.dashboard.send_modify(|state| {
                    state.last_error = Some(e.to_string());
                });
                CycleOutcome::Failed
            }
        }
    }

    fn set_state(&self, state: PollerState) {
        self.state_watcher.send_replace(state);
    }
}

pub struct PollerHandle {
    poller: Arc<Poller>,
    task: JoinHandle<()>,
}

impl PollerHandle {
    pub fn poller(&self) -> &Arc<Poller> {
        &self.poller
    }

    pub fn stop(self) {
        drop(self);
    }
}

impl Drop for PollerHandle {
    fn drop(&mut self) {
        self.task.abort();
        self.poller.set_state(PollerState::Stopped);
        log::debug!("Poller stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rpc::fake::FakeChain;
    use crate::sampler::SamplerOptions;

    fn poller(chain: Arc<FakeChain>, interval_ms: u64) -> Arc<Poller> {
        let sampler = ChainSampler::new(
            chain,
            SamplerOptions {
                window_size: 3,
                ..SamplerOptions::default()
            },
            None,
        );
        Arc::new(Poller::new(sampler, Duration::from_millis(interval_ms)))
    }

    fn example_chain() -> FakeChain {
        let chain = FakeChain::with_height(100);
        chain.insert_block(100, 1000, 5, 1);
        chain.insert_block(99, 995, 3, 0);
        chain.insert_block(98, 990, 4, 2);
        chain
    }

    async fn wait_for(mut condition: impl FnMut() -> bool) {
        for _ in 0..200 {
            if condition() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("condition not reached in time");
    }

    #[tokio::test]
    async fn poll_once_publishes_snapshot() {
        let p = poller(Arc::new(example_chain()), 1000);
        let mut rx = p.subscribe();
        assert!(p.dashboard().is_loading());

        assert_eq!(p.poll_once().await, CycleOutcome::Completed);
        assert!(rx.has_changed().unwrap());

        let state = rx.borrow_and_update().clone();
        let snap = state.latest.unwrap();
        assert_eq!(snap.window_transaction_count, 12);
        assert_eq!(state.cycles_completed, 1);
        assert!(state.last_error.is_none());
    }

    #[tokio::test]
    async fn failed_height_keeps_previous_snapshot() {
        let chain = Arc::new(example_chain());
        let p = poller(chain.clone(), 1000);
        assert_eq!(p.poll_once().await, CycleOutcome::Completed);
        let before = p.dashboard().latest.unwrap();

        chain.set_height(None);
        assert_eq!(p.poll_once().await, CycleOutcome::Failed);
        let state = p.dashboard();
        assert_eq!(state.latest, Some(before));
        assert!(state.last_error.unwrap().contains("height unavailable"));

        chain.set_height(Some(100));
        assert_eq!(p.poll_once().await, CycleOutcome::Completed);
        let state = p.dashboard();
        assert!(state.last_error.is_none());
        assert_eq!(state.cycles_completed, 2);

        let stats = p.get_metrics();
        assert_eq!(stats.cycles_started, 3);
        assert_eq!(stats.cycles_failed, 1);
    }

    #[tokio::test]
    async fn overlapping_poll_is_skipped() {
        let (chain, gate) = example_chain().gated();
        let p = poller(Arc::new(chain), 1000);

        let first = {
            let p = p.clone();
            tokio::spawn(async move { p.poll_once().await })
        };
        wait_for(|| p.is_in_flight()).await;

        assert_eq!(p.poll_once().await, CycleOutcome::Skipped);
        gate.notify_one();
        assert_eq!(first.await.unwrap(), CycleOutcome::Completed);
        assert!(!p.is_in_flight());

        let stats = p.get_metrics();
        assert_eq!(stats.cycles_started, 1);
        assert_eq!(stats.ticks_skipped, 1);
    }

    #[tokio::test]
    async fn timer_loop_samples_until_stopped() {
        let p = poller(Arc::new(example_chain()), 20);
        let mut rx = p.subscribe();
        let handle = p.clone().spawn();

        tokio::time::timeout(Duration::from_secs(2), rx.changed())
            .await
            .unwrap()
            .unwrap();
        assert!(rx.borrow().latest.is_some());
        assert_eq!(p.state(), PollerState::Running);

        handle.stop();
        assert_eq!(p.state(), PollerState::Stopped);
    }

    #[tokio::test]
    async fn ticks_are_skipped_while_cycle_in_flight() {
        let (chain, gate) = example_chain().gated();
        let p = poller(Arc::new(chain), 10);
        let handle = p.clone().spawn();

        wait_for(|| p.get_metrics().ticks_skipped >= 2).await;
        assert_eq!(p.get_metrics().cycles_started, 1);

        gate.notify_one();
        wait_for(|| p.dashboard().latest.is_some()).await;
        drop(handle);
    }

    #[tokio::test]
    async fn stopping_releases_in_flight_cycle() {
        let (chain, _gate) = example_chain().gated();
        let p = poller(Arc::new(chain), 1000);
        let handle = p.clone().spawn();

        wait_for(|| p.is_in_flight()).await;
        drop(handle);
        wait_for(|| !p.is_in_flight()).await;
        assert!(p.dashboard().latest.is_none());
    }
}
