// Storage-network client: drives the write flow against the upload relay.
//
// The relay performs the chunking/encoding and storage-node negotiation;
// this client only walks the flow's steps in order. The register and certify
// transactions it produces are executed separately by the chain-B client,
// which is what keeps the two irrevocable on-chain actions visible to the
// orchestrator instead of buried inside a storage call.

use async_trait::async_trait;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use serde_json::json;
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::app::clients::{
    FileUpload, LedgerTransaction, RegisterOptions, StorageClient, StoredFile, WriteFlow,
};
use crate::error::{Error, Result};

pub struct WalrusClient {
    http: reqwest::Client,
    base_url: String,
}

impl WalrusClient {
    pub fn new(base_url: String, timeout: std::time::Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Rpc(format!("failed to build http client: {e}")))?;
        Ok(Self { http, base_url })
    }
}

impl StorageClient for WalrusClient {
    fn write_files_flow(&self, files: Vec<FileUpload>) -> Box<dyn WriteFlow> {
        Box::new(WalrusWriteFlow {
            http: self.http.clone(),
            base_url: self.base_url.clone(),
            files,
            blob: None,
        })
    }
}

struct EncodedBlob {
    blob_id: String,
    bytes: Vec<u8>,
}

struct WalrusWriteFlow {
    http: reqwest::Client,
    base_url: String,
    files: Vec<FileUpload>,
    blob: Option<EncodedBlob>,
}

impl WalrusWriteFlow {
    fn encoded(&self) -> Result<&EncodedBlob> {
        self.blob
            .as_ref()
            .ok_or_else(|| Error::Rpc("write flow used before encode".to_string()))
    }
}

#[async_trait]
impl WriteFlow for WalrusWriteFlow {
    async fn encode(&mut self) -> Result<()> {
        if self.files.is_empty() {
            return Err(Error::Rpc("nothing to encode".to_string()));
        }
        let mut bytes = Vec::new();
        for f in &self.files {
            bytes.extend_from_slice(&f.contents);
        }
        // The blob identifier is the URL-safe digest of the transport unit.
        let blob_id = URL_SAFE_NO_PAD.encode(Sha256::digest(&bytes));
        debug!(blob_id = %blob_id, size = bytes.len(), "encoded blob");
        self.blob = Some(EncodedBlob { blob_id, bytes });
        Ok(())
    }

    fn register(&self, opts: &RegisterOptions) -> Result<LedgerTransaction> {
        let blob = self.encoded()?;
        let bytes = serde_json::to_vec(&json!({
            "kind": "register_blob",
            "blobId": blob.blob_id,
            "size": blob.bytes.len(),
            "epochs": opts.epochs,
            "deletable": opts.deletable,
            "owner": opts.owner,
        }))
        .map_err(|e| Error::Rpc(format!("failed to build register transaction: {e}")))?;
        Ok(LedgerTransaction {
            kind: "register",
            bytes,
        })
    }

    async fn upload(&mut self, register_digest: &str) -> Result<()> {
        let blob = self.encoded()?;
        let url = format!(
            "{}/v1/blobs/{}?tx_digest={}",
            self.base_url, blob.blob_id, register_digest
        );
        let resp = self
            .http
            .put(&url)
            .body(blob.bytes.clone())
            .send()
            .await
            .map_err(map_reqwest)?;
        if !resp.status().is_success() {
            return Err(Error::Rpc(format!(
                "upload relay answered {}",
                resp.status()
            )));
        }
        Ok(())
    }

    fn certify(&self) -> Result<LedgerTransaction> {
        let blob = self.encoded()?;
        let bytes = serde_json::to_vec(&json!({
            "kind": "certify_blob",
            "blobId": blob.blob_id,
        }))
        .map_err(|e| Error::Rpc(format!("failed to build certify transaction: {e}")))?;
        Ok(LedgerTransaction {
            kind: "certify",
            bytes,
        })
    }

    async fn list_files(&self) -> Result<Vec<StoredFile>> {
        let blob = self.encoded()?;
        let url = format!("{}/v1/blobs/{}/files", self.base_url, blob.blob_id);
        let resp = self.http.get(&url).send().await.map_err(map_reqwest)?;
        if !resp.status().is_success() {
            return Err(Error::Rpc(format!(
                "file listing answered {}",
                resp.status()
            )));
        }
        resp.json::<Vec<StoredFile>>().await.map_err(map_reqwest)
    }

    fn blob_id(&self) -> Result<String> {
        Ok(self.encoded()?.blob_id.clone())
    }
}

fn map_reqwest(e: reqwest::Error) -> Error {
    if e.is_timeout() {
        Error::RpcTimeout
    } else {
        Error::Rpc(e.to_string())
    }
}
