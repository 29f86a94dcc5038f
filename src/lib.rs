pub mod config;
pub mod dashboard;
pub mod error;
pub mod metrics;
pub mod output;
pub mod poller;
pub mod rpc;
pub mod sampler;
pub mod snapshot;

pub use error::{Error, Result};
pub use metrics::collector::MetricsCollector;
pub use metrics::snapshot::MetricsSnapshot;
pub use poller::{CycleOutcome, DashboardState, Poller, PollerHandle, PollerState};
pub use rpc::{ChainSource, JsonRpcClient};
pub use sampler::{ChainSampler, SamplerOptions};
pub use snapshot::ChainSnapshot;
