use crate::error::{Error, Result};
use crate::rpc::types::{format_quantity, parse_quantity, BlockSummary, JsonRpcRequest, JsonRpcResponse};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use std::time::Duration;
use url::Url;

/// Read access to the chain, as far as the sampler needs it.
#[async_trait]
pub trait ChainSource: Send + Sync {
    async fn block_number(&self) -> Result<u64>;
    async fn block_by_number(&self, number: u64) -> Result<BlockSummary>;
}

pub struct JsonRpcClient {
    client: Client,
    endpoint: Url,
}

impl JsonRpcClient {
    pub fn new(endpoint: &str, timeout: Duration) -> Result<Self> {
        let endpoint = Url::parse(endpoint)
            .map_err(|e| Error::Config(format!("invalid rpc_url {}: {}", endpoint, e)))?;

        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("monascope/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self { client, endpoint })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Issues one JSON-RPC call and returns the raw `result` value.
    pub async fn call(&self, method: &str, params: Value) -> Result<Value> {
        log::debug!("RPC {} {}", method, params);

        let res = self
            .client
            .post(self.endpoint.clone())
            .json(&JsonRpcRequest::new(method, params))
            .send()
            .await?;

        let status = res.status();
        if !status.is_success() {
            return Err(Error::Status(status));
        }

        let envelope: JsonRpcResponse = res.json().await?;
        envelope.into_result()
    }
}

#[async_trait]
impl ChainSource for JsonRpcClient {
    async fn block_number(&self) -> Result<u64> {
        let result = self.call("eth_blockNumber", json!([])).await?;
        let raw = result
            .as_str()
            .ok_or_else(|| Error::Decode(format!("eth_blockNumber returned {}", result)))?;
        parse_quantity(raw)
    }

    async fn block_by_number(&self, number: u64) -> Result<BlockSummary> {
        let result = self
            .call("eth_getBlockByNumber", json!([format_quantity(number), true]))
            .await?;
        if result.is_null() {
            return Err(Error::BlockNotFound(number));
        }
        serde_json::from_value(result)
            .map_err(|e| Error::Decode(format!("block {}: {}", number, e)))
    }
}
