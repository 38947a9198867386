// Responsible for all communication with chain B (the Sui ledger).
//
// Holds the publisher keypair, signs the transactions produced by the
// storage write flow and submits them over JSON-RPC, waiting for local
// execution so the returned digest refers to a finalized transaction.

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use blake2::digest::consts::U32;
use blake2::{Blake2b, Digest};
use ed25519_dalek::{Signer, SigningKey};
use serde_json::{json, Value as JsonValue};
use tracing::debug;

use crate::app::clients::{LedgerClient, LedgerTransaction, TxDigest};
use crate::error::{Error, Result};

type Blake2b256 = Blake2b<U32>;

const ED25519_FLAG: u8 = 0x00;

pub struct SuiClient {
    http: reqwest::Client,
    url: String,
    signing_key: SigningKey,
    owner: String,
}

impl SuiClient {
    /// `hex_seed` is the hex-encoded 32-byte ed25519 seed of the publisher
    /// keypair that owns registered blobs and pays chain-B gas.
    pub fn new(url: String, hex_seed: &str, timeout: std::time::Duration) -> Result<Self> {
        let raw = hex::decode(hex_seed.trim().trim_start_matches("0x"))
            .map_err(|e| Error::MalformedInput(format!("invalid Sui private key hex: {e}")))?;
        let seed: [u8; 32] = raw
            .try_into()
            .map_err(|_| Error::MalformedInput("Sui private key must be 32 bytes".to_string()))?;
        let signing_key = SigningKey::from_bytes(&seed);
        let owner = derive_address(&signing_key);

        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Rpc(format!("failed to build http client: {e}")))?;
        Ok(Self {
            http,
            url,
            signing_key,
            owner,
        })
    }

    /// Chain-B address of the publisher keypair.
    pub fn owner_address(&self) -> &str {
        &self.owner
    }
}

/// Sui address: Blake2b-256 over the scheme flag and the public key.
fn derive_address(key: &SigningKey) -> String {
    let mut hasher = Blake2b256::new();
    hasher.update([ED25519_FLAG]);
    hasher.update(key.verifying_key().to_bytes());
    format!("0x{}", hex::encode(hasher.finalize()))
}

#[async_trait]
impl LedgerClient for SuiClient {
    async fn sign_and_execute(&self, tx: &LedgerTransaction) -> Result<TxDigest> {
        let signature = self.signing_key.sign(&tx.bytes);
        // Serialized signature: flag || signature || public key.
        let mut serialized = Vec::with_capacity(1 + 64 + 32);
        serialized.push(ED25519_FLAG);
        serialized.extend_from_slice(&signature.to_bytes());
        serialized.extend_from_slice(&self.signing_key.verifying_key().to_bytes());

        let payload = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": "sui_executeTransactionBlock",
            "params": [
                BASE64.encode(&tx.bytes),
                [BASE64.encode(&serialized)],
                { "showEffects": true },
                "WaitForLocalExecution",
            ],
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
                return Err(Error::Rpc(format!("{} transaction rejected: {err}", tx.kind)));
            }
        }
        let digest = body["result"]["digest"]
            .as_str()
            .ok_or_else(|| Error::Rpc(format!("{} execution returned no digest", tx.kind)))?
            .to_string();
        debug!(kind = tx.kind, digest = %digest, "chain-B transaction executed");
        Ok(digest)
    }
}

fn map_reqwest(e: reqwest::Error) -> Error {
    if e.is_timeout() {
        Error::RpcTimeout
    } else {
        Error::Rpc(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn owner_address_is_stable_for_a_key() {
        let seed = format!("0x{}", "11".repeat(32));
        let a = SuiClient::new("http://localhost:9000".into(), &seed, rpc_timeout()).unwrap();
        let b = SuiClient::new("http://localhost:9000".into(), &seed, rpc_timeout()).unwrap();
        assert_eq!(a.owner_address(), b.owner_address());
        assert!(a.owner_address().starts_with("0x"));
        assert_eq!(a.owner_address().len(), 66);
    }

    #[test]
    fn rejects_wrong_length_seeds() {
        assert!(SuiClient::new("http://x".into(), "0x1234", rpc_timeout()).is_err());
        assert!(SuiClient::new("http://x".into(), "zz", rpc_timeout()).is_err());
    }

    fn rpc_timeout() -> std::time::Duration {
        std::time::Duration::from_secs(5)
    }
}
