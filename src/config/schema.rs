use crate::sampler::SamplerOptions;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use validator::Validate;

pub const DEFAULT_RPC_URL: &str = "https://testnet-rpc.monad.xyz";

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct DashboardConfig {
    #[serde(default = "default_name")]
    #[validate(length(min = 1))]
    pub name: String,

    #[serde(default = "default_rpc_url")]
    #[validate(url)]
    pub rpc_url: String,

    #[serde(default = "default_poll_interval")]
    #[validate(range(min = 100))]
    pub poll_interval_ms: u64,

    /// Number of trailing blocks, including the latest, sampled every cycle.
    #[serde(default = "default_window_size")]
    #[validate(range(min = 1, max = 1000))]
    pub window_size: u64,

    #[serde(default = "default_concurrency")]
    #[validate(range(min = 1, max = 64))]
    pub concurrency: usize,

    #[serde(default)]
    pub request_delay_ms: u64,

    #[serde(default = "default_request_timeout")]
    #[validate(range(min = 1))]
    pub request_timeout_ms: u64,

    /// Launch date of the network, shown as a day counter on the dashboard.
    #[serde(default)]
    pub network_launch: Option<NaiveDate>,

    #[serde(default)]
    pub output: Option<OutputConfig>,

    /// Optional path to a parent configuration file to inherit from
    #[serde(default)]
    pub extends: Option<String>,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            rpc_url: default_rpc_url(),
            poll_interval_ms: default_poll_interval(),
            window_size: default_window_size(),
            concurrency: default_concurrency(),
            request_delay_ms: 0,
            request_timeout_ms: default_request_timeout(),
            network_launch: None,
            output: None,
            extends: None,
        }
    }
}

impl DashboardConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn sampler_options(&self) -> SamplerOptions {
        SamplerOptions {
            window_size: self.window_size,
            concurrency: self.concurrency,
            request_delay: Duration::from_millis(self.request_delay_ms),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum OutputConfig {
    Console,
    Json {
        path: String,
    },
    Csv {
        path: String,
    },
    Sqlite {
        path: String,
        #[serde(default = "default_table_name")]
        table: String,
    },
}

pub(crate) fn default_name() -> String {
    "monad-testnet".to_string()
}

pub(crate) fn default_rpc_url() -> String {
    DEFAULT_RPC_URL.to_string()
}

pub(crate) fn default_poll_interval() -> u64 {
    2000
}

pub(crate) fn default_window_size() -> u64 {
    10
}

pub(crate) fn default_concurrency() -> usize {
    1
}

pub(crate) fn default_request_timeout() -> u64 {
    10_000
}

fn default_table_name() -> String {
    "chain_snapshots".to_string()
}
