//! Collaborator interfaces driven by the publish orchestrator.
//!
//! The storage network and the chain-B ledger are external systems; this
//! module is their interface boundary. `StorageClient`/`WriteFlow` mirror the
//! storage network's multi-step write protocol (encode, register, upload,
//! certify, list), `LedgerClient` signs and submits the chain-B transactions
//! the flow produces. Production implementations live under `infra`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::Result;

/// One file to be written to the storage network.
#[derive(Debug, Clone)]
pub struct FileUpload {
    pub identifier: String,
    pub content_type: String,
    pub contents: Vec<u8>,
}

/// Options for the chain-B register transaction.
#[derive(Debug, Clone)]
pub struct RegisterOptions {
    /// Storage duration in storage-network epochs.
    pub epochs: u64,
    /// Chain-B address that will own the registered blob object.
    pub owner: String,
    pub deletable: bool,
}

/// Descriptor of a stored file as reported by the storage network.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StoredFile {
    pub identifier: String,
    pub blob_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    pub size: u64,
}

/// An unsigned chain-B transaction built by the write flow. The bytes are
/// opaque to the orchestrator; only the ledger client interprets them.
#[derive(Debug, Clone)]
pub struct LedgerTransaction {
    /// Short label for logs ("register" / "certify").
    pub kind: &'static str,
    pub bytes: Vec<u8>,
}

/// Execution digest of a finalized chain-B transaction.
pub type TxDigest = String;

/// Chain-B transaction submission. `sign_and_execute` returns only once the
/// transaction has finalized (or errors / times out).
#[async_trait]
pub trait LedgerClient: Send + Sync {
    async fn sign_and_execute(&self, tx: &LedgerTransaction) -> Result<TxDigest>;
}

/// Storage-network entry point: opens a write flow for a set of files.
pub trait StorageClient: Send + Sync {
    fn write_files_flow(&self, files: Vec<FileUpload>) -> Box<dyn WriteFlow>;
}

/// One in-flight write to the storage network. A flow is owned by a single
/// publish request and its steps must be driven in order.
#[async_trait]
pub trait WriteFlow: Send {
    /// Encodes the files into the network's transport unit and fixes the
    /// blob identifier.
    async fn encode(&mut self) -> Result<()>;

    /// Builds the chain-B transaction that registers the encoded blob.
    fn register(&self, opts: &RegisterOptions) -> Result<LedgerTransaction>;

    /// Uploads the encoded bytes, addressed by the digest of the finalized
    /// register transaction.
    async fn upload(&mut self, register_digest: &str) -> Result<()>;

    /// Builds the chain-B transaction attesting the upload is available.
    fn certify(&self) -> Result<LedgerTransaction>;

    /// Queries the storage network for the final stored-file descriptors.
    async fn list_files(&self) -> Result<Vec<StoredFile>>;

    /// Blob identifier fixed by `encode`.
    fn blob_id(&self) -> Result<String>;
}
