// Responsible for all communication with chain A (the EVM network).
//
// Read-only JSON-RPC over HTTP; the service never submits EVM transactions,
// it only inspects top-up transfers sent to the custodial address.

use async_trait::async_trait;
use primitive_types::U256;
use serde_json::{json, Value as JsonValue};

use crate::domain::identity::{EvmAddress, TxHash};
use crate::domain::verify::{EvmChainReader, EvmReceipt, EvmTransaction};
use crate::error::{Error, Result};

pub struct EvmRpcClient {
    http: reqwest::Client,
    url: String,
}

impl EvmRpcClient {
    pub fn new(url: String, timeout: std::time::Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Rpc(format!("failed to build http client: {e}")))?;
        Ok(Self { http, url })
    }

    async fn call(&self, method: &str, params: JsonValue) -> Result<JsonValue> {
        let payload = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": method,
            "params": params,
        });
        let resp = self
            .http
            .post(&self.url)
            .json(&payload)
            .send()
            .await
            .map_err(map_reqwest)?;
        let body: JsonValue = resp.json().await.map_err(map_reqwest)?;
        if let Some(err) = body.get("error") {
            if !err.is_null() {
                return Err(Error::Rpc(format!("{method}: {err}")));
            }
        }
        Ok(body.get("result").cloned().unwrap_or(JsonValue::Null))
    }
}

fn map_reqwest(e: reqwest::Error) -> Error {
    if e.is_timeout() {
        Error::RpcTimeout
    } else {
        Error::Rpc(e.to_string())
    }
}

fn hex_u64(v: &JsonValue) -> Option<u64> {
    let s = v.as_str()?;
    u64::from_str_radix(s.trim_start_matches("0x"), 16).ok()
}

fn hex_u256(v: &JsonValue) -> Option<U256> {
    let s = v.as_str()?;
    U256::from_str_radix(s.trim_start_matches("0x"), 16).ok()
}

fn node_address(v: &JsonValue) -> Result<Option<EvmAddress>> {
    match v.as_str() {
        None => Ok(None),
        Some(s) => EvmAddress::parse(s)
            .map(Some)
            .map_err(|e| Error::Rpc(format!("node returned invalid address: {e}"))),
    }
}

#[async_trait]
impl EvmChainReader for EvmRpcClient {
    async fn transaction_by_hash(&self, hash: &TxHash) -> Result<Option<EvmTransaction>> {
        let result = self
            .call("eth_getTransactionByHash", json!([hash.as_str()]))
            .await?;
        if result.is_null() {
            return Ok(None);
        }
        Ok(Some(EvmTransaction {
            from: node_address(&result["from"])?,
            to: node_address(&result["to"])?,
            value: hex_u256(&result["value"]).unwrap_or_default(),
        }))
    }

    async fn transaction_receipt(&self, hash: &TxHash) -> Result<Option<EvmReceipt>> {
        let result = self
            .call("eth_getTransactionReceipt", json!([hash.as_str()]))
            .await?;
        if result.is_null() {
            return Ok(None);
        }
        Ok(Some(EvmReceipt {
            status: hex_u64(&result["status"]),
            block_number: hex_u64(&result["blockNumber"]),
        }))
    }

    async fn block_number(&self) -> Result<u64> {
        let result = self.call("eth_blockNumber", json!([])).await?;
        hex_u64(&result).ok_or_else(|| Error::Rpc(format!("bad eth_blockNumber result: {result}")))
    }

    async fn chain_id(&self) -> Result<u64> {
        let result = self.call("eth_chainId", json!([])).await?;
        hex_u64(&result).ok_or_else(|| Error::Rpc(format!("bad eth_chainId result: {result}")))
    }
}
