//! Ethereum JSON-RPC access.
//!
//! Handlers depend on the [`ChainProvider`] trait; [`JsonRpcProvider`] is the
//! HTTP implementation used in production.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

const REQUEST_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Error)]
pub enum ChainError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("RPC error {code}: {message}")]
    Rpc { code: i64, message: String },

    #[error("Malformed RPC response: {0}")]
    Parse(String),
}

/// A mined or pending value transfer.
#[derive(Debug, Clone, PartialEq)]
pub struct ChainTransaction {
    pub hash: String,
    /// Lowercase sender.
    pub from: String,
    /// Lowercase recipient; `None` for contract creations.
    pub to: Option<String>,
    pub value_wei: u128,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChainReceipt {
    /// `true` when the transaction executed successfully (status 0x1).
    pub status: bool,
    pub block_number: u64,
    pub gas_used: u128,
}

#[async_trait]
pub trait ChainProvider: Send + Sync {
    /// `eth_getTransactionByHash`. `Ok(None)` when the node does not know the hash.
    async fn transaction(&self, hash: &str) -> Result<Option<ChainTransaction>, ChainError>;

    /// `eth_getTransactionReceipt`. `Ok(None)` while the transaction is unmined.
    async fn receipt(&self, hash: &str) -> Result<Option<ChainReceipt>, ChainError>;
}

#[derive(Debug, Serialize)]
struct RpcRequest<'a> {
    jsonrpc: &'static str,
    id: u64,
    method: &'a str,
    params: [&'a str; 1],
}

#[derive(Debug, Deserialize)]
struct RpcResponse {
    result: Option<Value>,
    error: Option<RpcErrorBody>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorBody {
    code: i64,
    message: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawTransaction {
    hash: String,
    from: String,
    to: Option<String>,
    value: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawReceipt {
    status: Option<String>,
    block_number: String,
    gas_used: String,
}

/// JSON-RPC over HTTP POST.
#[derive(Clone)]
pub struct JsonRpcProvider {
    client: Client,
    url: String,
}

impl JsonRpcProvider {
    pub fn new(url: impl Into<String>) -> Result<Self, ChainError> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }

    async fn call(&self, method: &str, hash: &str) -> Result<Option<Value>, ChainError> {
        debug!("RPC {method} {hash}");
        let response: RpcResponse = self
            .client
            .post(&self.url)
            .json(&RpcRequest {
                jsonrpc: "2.0",
                id: 1,
                method,
                params: [hash],
            })
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        if let Some(err) = response.error {
            return Err(ChainError::Rpc {
                code: err.code,
                message: err.message,
            });
        }
        Ok(response.result.filter(|v| !v.is_null()))
    }
}

#[async_trait]
impl ChainProvider for JsonRpcProvider {
    async fn transaction(&self, hash: &str) -> Result<Option<ChainTransaction>, ChainError> {
        self.call("eth_getTransactionByHash", hash)
            .await?
            .map(parse_transaction)
            .transpose()
    }

    async fn receipt(&self, hash: &str) -> Result<Option<ChainReceipt>, ChainError> {
        self.call("eth_getTransactionReceipt", hash)
            .await?
            .map(parse_receipt)
            .transpose()
    }
}

fn parse_transaction(value: Value) -> Result<ChainTransaction, ChainError> {
    let raw: RawTransaction =
        serde_json::from_value(value).map_err(|e| ChainError::Parse(e.to_string()))?;
    Ok(ChainTransaction {
        hash: raw.hash.to_lowercase(),
        from: raw.from.to_lowercase(),
        to: raw.to.map(|to| to.to_lowercase()),
        value_wei: parse_quantity(&raw.value)?,
    })
}

fn parse_receipt(value: Value) -> Result<ChainReceipt, ChainError> {
    let raw: RawReceipt =
        serde_json::from_value(value).map_err(|e| ChainError::Parse(e.to_string()))?;
    Ok(ChainReceipt {
        status: raw.status.as_deref().map(parse_quantity).transpose()? == Some(1),
        block_number: parse_quantity(&raw.block_number)? as u64,
        gas_used: parse_quantity(&raw.gas_used)?,
    })
}

/// Decodes a `0x`-prefixed hex quantity.
pub fn parse_quantity(raw: &str) -> Result<u128, ChainError> {
    let digits = raw
        .strip_prefix("0x")
        .ok_or_else(|| ChainError::Parse(format!("quantity without 0x prefix: {raw}")))?;
    if digits.is_empty() {
        return Ok(0);
    }
    u128::from_str_radix(digits, 16)
        .map_err(|_| ChainError::Parse(format!("invalid hex quantity: {raw}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_quantity() {
        assert_eq!(parse_quantity("0x0").unwrap(), 0);
        assert_eq!(parse_quantity("0x").unwrap(), 0);
        assert_eq!(parse_quantity("0x38d7ea4c68000").unwrap(), 1_000_000_000_000_000);
        assert!(parse_quantity("38d7").is_err());
        assert!(parse_quantity("0xzz").is_err());
    }

    #[test]
    fn test_parse_transaction_lowercases_addresses() {
        let tx = parse_transaction(json!({
            "hash": "0xABCDEF",
            "to": "0x1234567890ABCDEF1234567890ABCDEF12345678",
            "value": "0xde0b6b3a7640000",
            "blockNumber": "0x10",
            "from": "0xAAAA567890123456789012345678901234567890"
        }))
        .unwrap();
        assert_eq!(tx.hash, "0xabcdef");
        assert_eq!(tx.from, "0xaaaa567890123456789012345678901234567890");
        assert_eq!(tx.to.as_deref(), Some("0x1234567890abcdef1234567890abcdef12345678"));
        assert_eq!(tx.value_wei, 1_000_000_000_000_000_000);
    }

    #[test]
    fn test_contract_creation_has_no_recipient() {
        let tx = parse_transaction(json!({
            "hash": "0x01",
            "from": "0x0000000000000000000000000000000000000002",
            "to": null,
            "value": "0x0",
            "blockNumber": null
        }))
        .unwrap();
        assert_eq!(tx.to, None);
        assert_eq!(tx.value_wei, 0);
    }

    #[test]
    fn test_parse_receipt_status() {
        let ok = parse_receipt(json!({
            "status": "0x1",
            "blockNumber": "0x2a",
            "gasUsed": "0x5208"
        }))
        .unwrap();
        assert!(ok.status);
        assert_eq!(ok.block_number, 42);
        assert_eq!(ok.gas_used, 21000);

        let reverted = parse_receipt(json!({
            "status": "0x0",
            "blockNumber": "0x2a",
            "gasUsed": "0x5208"
        }))
        .unwrap();
        assert!(!reverted.status);
    }
}
