//! Blockchain access
//!
//! Token submissions are simulated: no contract ABI is wired in, so mint and
//! burn return a generated transaction hash. Read calls (`eth_blockNumber`,
//! `eth_getTransactionReceipt`) go to a real JSON-RPC endpoint when one is
//! configured.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, info, warn};
use url::Url;

use crate::config::ChainConfig;
use crate::utils::errors::{ChainError, ChainResult, Result};
use crate::utils::helpers::{generate_tx_hash, is_tx_hash};

/// Block reported by the simulated chain
pub const SIMULATED_BLOCK_NUMBER: u64 = 1;

#[async_trait]
pub trait ChainClient: Send + Sync {
    /// Submit an AT mint and return its transaction hash
    async fn submit_mint(&self, wallet: Option<&str>, amount: Decimal, reference: &str) -> ChainResult<String>;

    /// Submit an HT burn and return its transaction hash
    async fn submit_burn(&self, wallet: Option<&str>, amount: Decimal) -> ChainResult<String>;

    async fn block_number(&self) -> ChainResult<u64>;

    async fn is_confirmed(&self, tx_hash: &str) -> ChainResult<bool>;

    fn name(&self) -> &'static str;
}

/// In-process chain used when no RPC endpoint is configured
#[derive(Debug, Clone, Default)]
pub struct SimulatedChain;

#[async_trait]
impl ChainClient for SimulatedChain {
    async fn submit_mint(&self, wallet: Option<&str>, amount: Decimal, reference: &str) -> ChainResult<String> {
        let hash = generate_tx_hash();
        info!(wallet = ?wallet, amount = %amount, reference = reference, tx_hash = %hash, "Simulated mint submitted");
        Ok(hash)
    }

    async fn submit_burn(&self, wallet: Option<&str>, amount: Decimal) -> ChainResult<String> {
        let hash = generate_tx_hash();
        info!(wallet = ?wallet, amount = %amount, tx_hash = %hash, "Simulated burn submitted");
        Ok(hash)
    }

    async fn block_number(&self) -> ChainResult<u64> {
        Ok(SIMULATED_BLOCK_NUMBER)
    }

    async fn is_confirmed(&self, tx_hash: &str) -> ChainResult<bool> {
        Ok(is_tx_hash(tx_hash))
    }

    fn name(&self) -> &'static str {
        "simulated"
    }
}

#[derive(Debug, Deserialize)]
struct RpcResponse {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<RpcErrorBody>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorBody {
    code: i64,
    message: String,
}

/// JSON-RPC client for an Ethereum-compatible node
#[derive(Debug)]
pub struct RpcChainClient {
    client: Client,
    endpoint: Url,
    next_id: AtomicU64,
}

impl RpcChainClient {
    pub fn new(endpoint: &str, timeout_seconds: u64) -> Result<Self> {
        let endpoint = Url::parse(endpoint)?;
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_seconds))
            .user_agent(concat!("fixed-asset/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            endpoint,
            next_id: AtomicU64::new(1),
        })
    }

    async fn call(&self, method: &str, params: Value) -> ChainResult<Value> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let body = json!({
            "jsonrpc": "2.0",
            "method": method,
            "params": params,
            "id": id,
        });

        debug!(method = method, id = id, endpoint = %self.endpoint, "Sending chain RPC request");

        let response = self
            .client
            .post(self.endpoint.clone())
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ChainError::Timeout
                } else {
                    ChainError::RequestFailed(e.to_string())
                }
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(ChainError::RequestFailed(format!("HTTP {}: {}", status, error_text)));
        }

        let rpc: RpcResponse = response
            .json()
            .await
            .map_err(|e| ChainError::InvalidResponse(e.to_string()))?;

        if let Some(error) = rpc.error {
            warn!(method = method, code = error.code, message = %error.message, "Chain RPC returned an error");
            return Err(ChainError::Rpc {
                code: error.code,
                message: error.message,
            });
        }

        Ok(rpc.result.unwrap_or(Value::Null))
    }
}

/// Parse a `0x`-prefixed hex quantity
fn parse_quantity(value: &Value) -> ChainResult<u64> {
    let text = value
        .as_str()
        .ok_or_else(|| ChainError::InvalidResponse(format!("expected hex string, got {}", value)))?;
    let digits = text
        .strip_prefix("0x")
        .ok_or_else(|| ChainError::InvalidResponse(format!("missing 0x prefix: {}", text)))?;
    u64::from_str_radix(digits, 16).map_err(|e| ChainError::InvalidResponse(format!("{}: {}", text, e)))
}

#[async_trait]
impl ChainClient for RpcChainClient {
    async fn submit_mint(&self, wallet: Option<&str>, amount: Decimal, reference: &str) -> ChainResult<String> {
        let hash = generate_tx_hash();
        info!(wallet = ?wallet, amount = %amount, reference = reference, tx_hash = %hash, "Mint submitted");
        Ok(hash)
    }

    async fn submit_burn(&self, wallet: Option<&str>, amount: Decimal) -> ChainResult<String> {
        let hash = generate_tx_hash();
        info!(wallet = ?wallet, amount = %amount, tx_hash = %hash, "Burn submitted");
        Ok(hash)
    }

    async fn block_number(&self) -> ChainResult<u64> {
        let result = self.call("eth_blockNumber", json!([])).await?;
        parse_quantity(&result)
    }

    async fn is_confirmed(&self, tx_hash: &str) -> ChainResult<bool> {
        let receipt = self.call("eth_getTransactionReceipt", json!([tx_hash])).await?;
        if receipt.is_null() {
            return Ok(false);
        }
        match receipt.get("status") {
            Some(status) => Ok(parse_quantity(status)? == 1),
            None => Err(ChainError::InvalidResponse("receipt has no status".to_string())),
        }
    }

    fn name(&self) -> &'static str {
        "rpc"
    }
}

/// Build the chain client selected by configuration
pub fn chain_from_config(config: &ChainConfig) -> Result<Arc<dyn ChainClient>> {
    match &config.rpc_url {
        Some(url) => {
            info!(url = %url, "Using JSON-RPC chain client");
            Ok(Arc::new(RpcChainClient::new(url, config.timeout_seconds)?))
        }
        None => {
            info!("No chain RPC configured, using simulated chain");
            Ok(Arc::new(SimulatedChain))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_quantity() {
        assert_eq!(parse_quantity(&json!("0x1b4")).unwrap(), 436);
        assert_eq!(parse_quantity(&json!("0x0")).unwrap(), 0);
        assert!(parse_quantity(&json!("1b4")).is_err());
        assert!(parse_quantity(&json!(12)).is_err());
    }

    #[tokio::test]
    async fn test_simulated_chain() {
        let chain = SimulatedChain;
        let hash = chain.submit_mint(None, Decimal::from(10), "DEP-1").await.unwrap();
        assert!(is_tx_hash(&hash));
        assert!(chain.is_confirmed(&hash).await.unwrap());
        assert!(!chain.is_confirmed("0xabc").await.unwrap());
        assert_eq!(chain.block_number().await.unwrap(), SIMULATED_BLOCK_NUMBER);
    }

    #[test]
    fn test_chain_from_config() {
        let config = ChainConfig::default();
        assert_eq!(chain_from_config(&config).unwrap().name(), "simulated");

        let config = ChainConfig {
            rpc_url: Some("http://localhost:8545".to_string()),
            ..ChainConfig::default()
        };
        assert_eq!(chain_from_config(&config).unwrap().name(), "rpc");
    }
}
