//! JSON-RPC chain client against a mock node

use std::time::Duration;

use assert_matches::assert_matches;
use serde_json::json;
use wiremock::matchers::{body_partial_json, method};
use wiremock::{Mock, MockServer, ResponseTemplate};

use fixed_asset::services::{ChainClient, RpcChainClient};
use fixed_asset::utils::errors::ChainError;

fn rpc_result(result: serde_json::Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({ "jsonrpc": "2.0", "id": 1, "result": result }))
}

async fn client(server: &MockServer) -> RpcChainClient {
    RpcChainClient::new(&server.uri(), 1).unwrap()
}

#[tokio::test]
async fn test_block_number() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(body_partial_json(json!({ "jsonrpc": "2.0", "method": "eth_blockNumber" })))
        .respond_with(rpc_result(json!("0x10d4f")))
        .expect(1)
        .mount(&server)
        .await;

    let chain = client(&server).await;
    assert_eq!(chain.block_number().await.unwrap(), 68943);
}

#[tokio::test]
async fn test_receipt_status() {
    let server = MockServer::start().await;
    let confirmed = format!("0x{}", "a".repeat(64));
    let failed = format!("0x{}", "b".repeat(64));
    let pending = format!("0x{}", "c".repeat(64));

    Mock::given(method("POST"))
        .and(body_partial_json(json!({ "method": "eth_getTransactionReceipt", "params": [confirmed] })))
        .respond_with(rpc_result(json!({ "status": "0x1", "blockNumber": "0x5" })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(body_partial_json(json!({ "method": "eth_getTransactionReceipt", "params": [failed] })))
        .respond_with(rpc_result(json!({ "status": "0x0" })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(body_partial_json(json!({ "method": "eth_getTransactionReceipt", "params": [pending] })))
        .respond_with(rpc_result(serde_json::Value::Null))
        .mount(&server)
        .await;

    let chain = client(&server).await;
    assert!(chain.is_confirmed(&confirmed).await.unwrap());
    assert!(!chain.is_confirmed(&failed).await.unwrap());
    assert!(!chain.is_confirmed(&pending).await.unwrap());
}

#[tokio::test]
async fn test_rpc_error_is_surfaced() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "jsonrpc": "2.0",
            "id": 1,
            "error": { "code": -32601, "message": "Method not found" }
        })))
        .mount(&server)
        .await;

    let chain = client(&server).await;
    assert_matches!(
        chain.block_number().await,
        Err(ChainError::Rpc { code: -32601, ref message }) if message == "Method not found"
    );
}

#[tokio::test]
async fn test_http_failure_and_bad_payload() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(502).set_body_string("bad gateway"))
        .mount(&server)
        .await;
    let chain = client(&server).await;
    assert_matches!(chain.block_number().await, Err(ChainError::RequestFailed(msg)) if msg.contains("502"));

    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;
    let chain = client(&server).await;
    assert_matches!(chain.block_number().await, Err(ChainError::InvalidResponse(_)));
}

#[tokio::test]
async fn test_timeout() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(rpc_result(json!("0x1")).set_delay(Duration::from_secs(3)))
        .mount(&server)
        .await;

    let chain = client(&server).await;
    assert_matches!(chain.block_number().await, Err(ChainError::Timeout));
}

#[tokio::test]
async fn test_submissions_do_not_hit_the_node() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(rpc_result(json!("0x1")))
        .expect(0)
        .mount(&server)
        .await;

    let chain = client(&server).await;
    let hash = chain
        .submit_mint(Some("0x52908400098527886E0F7030069857D2E4169EE7"), rust_decimal::Decimal::from(5), "DEP-1")
        .await
        .unwrap();
    assert_eq!(hash.len(), 66);
    assert_eq!(chain.name(), "rpc");
}
