use crate::error::{Error, Result};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

pub const JSONRPC_VERSION: &str = "2.0";
pub const REQUEST_ID: u64 = 1;

#[derive(Debug, Clone, Serialize)]
pub struct JsonRpcRequest<'a> {
    pub jsonrpc: &'static str,
    pub id: u64,
    pub method: &'a str,
    pub params: Value,
}

impl<'a> JsonRpcRequest<'a> {
    pub fn new(method: &'a str, params: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION,
            id: REQUEST_ID,
            method,
            params,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct JsonRpcErrorObject {
    #[serde(default)]
    pub code: i64,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct JsonRpcResponse {
    #[serde(default)]
    pub result: Value,
    #[serde(default)]
    pub error: Option<JsonRpcErrorObject>,
}

impl JsonRpcResponse {
    /// Turns an error-shaped envelope into `Error::Rpc`.
    pub fn into_result(self) -> Result<Value> {
        match self.error {
            Some(err) => Err(Error::Rpc {
                code: err.code,
                message: err
                    .message
                    .filter(|m| !m.is_empty())
                    .unwrap_or_else(|| "RPC Error".to_string()),
            }),
            None => Ok(self.result),
        }
    }
}

/// A block as returned by `eth_getBlockByNumber(.., true)`, reduced to the
/// fields the sampler aggregates.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct BlockSummary {
    #[serde(deserialize_with = "deserialize_quantity")]
    pub number: u64,
    #[serde(rename = "timestamp", deserialize_with = "deserialize_quantity")]
    pub timestamp_seconds: u64,
    pub transactions: Vec<TransactionSummary>,
}

impl BlockSummary {
    pub fn transaction_count(&self) -> u64 {
        self.transactions.len() as u64
    }

    pub fn contract_creation_count(&self) -> u64 {
        self.transactions
            .iter()
            .filter(|tx| tx.is_contract_creation())
            .count() as u64
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TransactionSummary {
    #[serde(default)]
    pub to: Option<String>,
}

impl TransactionSummary {
    pub fn is_contract_creation(&self) -> bool {
        self.to.is_none()
    }
}

/// Parses a `0x`-prefixed hexadecimal quantity.
pub fn parse_quantity(raw: &str) -> Result<u64> {
    let digits = raw
        .strip_prefix("0x")
        .or_else(|| raw.strip_prefix("0X"))
        .ok_or_else(|| Error::Decode(format!("quantity without 0x prefix: {:?}", raw)))?;
    if digits.is_empty() {
        return Err(Error::Decode(format!("empty quantity: {:?}", raw)));
    }
    if !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(Error::Decode(format!("non-hex quantity: {:?}", raw)));
    }
    u64::from_str_radix(digits, 16)
        .map_err(|e| Error::Decode(format!("invalid quantity {:?}: {}", raw, e)))
}

pub fn format_quantity(value: u64) -> String {
    format!("0x{:x}", value)
}

fn deserialize_quantity<'de, D>(deserializer: D) -> std::result::Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_quantity(&raw).map_err(serde::de::Error::custom)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_hex_quantities() {
        assert_eq!(parse_quantity("0x0").unwrap(), 0);
        assert_eq!(parse_quantity("0x64").unwrap(), 100);
        assert_eq!(parse_quantity("0X1bc").unwrap(), 444);
        assert!(parse_quantity("100").is_err());
        assert!(parse_quantity("0x").is_err());
        assert!(parse_quantity("0xzz").is_err());
    }

    #[test]
    fn signed_quantities_are_rejected() {
        assert!(parse_quantity("0x+5").is_err());
        assert!(parse_quantity("0x-5").is_err());
        assert!(parse_quantity("0x 5").is_err());
    }

    #[test]
    fn formats_block_numbers_for_params() {
        assert_eq!(format_quantity(0), "0x0");
        assert_eq!(format_quantity(255), "0xff");
    }

    #[test]
    fn null_and_absent_destinations_are_contract_creations() {
        let block: BlockSummary = serde_json::from_value(json!({
            "number": "0x62",
            "timestamp": "0x3de",
            "hash": "0xabc",
            "transactions": [
                { "to": null, "hash": "0x1" },
                { "hash": "0x2" },
                { "to": "0x00000000000000000000000000000000000000aa" }
            ]
        }))
        .unwrap();

        assert_eq!(block.number, 98);
        assert_eq!(block.timestamp_seconds, 990);
        assert_eq!(block.transaction_count(), 3);
        assert_eq!(block.contract_creation_count(), 2);
    }

    #[test]
    fn block_without_transactions_field_is_rejected() {
        let res: std::result::Result<BlockSummary, _> =
            serde_json::from_value(json!({ "number": "0x1", "timestamp": "0x2" }));
        assert!(res.is_err());
    }

    #[test]
    fn error_envelope_becomes_rpc_error() {
        let envelope: JsonRpcResponse = serde_json::from_value(json!({
            "jsonrpc": "2.0",
            "id": 1,
            "error": { "code": -32000, "message": "header not found" }
        }))
        .unwrap();

        match envelope.into_result() {
            Err(Error::Rpc { code, message }) => {
                assert_eq!(code, -32000);
                assert_eq!(message, "header not found");
            }
            other => panic!("expected rpc error, got {:?}", other),
        }
    }

    #[test]
    fn error_without_message_gets_generic_text() {
        let envelope: JsonRpcResponse =
            serde_json::from_value(json!({ "error": {} })).unwrap();
        let err = envelope.into_result().unwrap_err();
        assert_eq!(err.to_string(), "RPC error 0: RPC Error");
    }
}
