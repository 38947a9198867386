//! Publish orchestration: fee check, debit, and the multi-step write
//! sequence against the storage network and chain B.
//!
//! The debit is the fee commitment point. Everything after it is one-way:
//! register and certify are irrevocable on-chain actions, so a failure past
//! the debit is surfaced with the originating step named and the fee stays
//! charged (it covers the cost of the attempt, not only completion).

use std::sync::Arc;

use primitive_types::U256;
use serde::Serialize;
use tracing::{error, info};

use crate::app::clients::{FileUpload, LedgerClient, RegisterOptions, StorageClient, StoredFile};
use crate::domain::identity::EvmAddress;
use crate::domain::ledger::CreditLedger;
use crate::error::{Error, Result};

/// The steps of the publish workflow that can fail after the fee debit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PublishStep {
    Encode,
    Register,
    Upload,
    Certify,
    List,
}

impl std::fmt::Display for PublishStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            PublishStep::Encode => "encode",
            PublishStep::Register => "register",
            PublishStep::Upload => "upload",
            PublishStep::Certify => "certify",
            PublishStep::List => "list",
        };
        f.write_str(name)
    }
}

/// Per-call publish input. Constructed by the transport layer, consumed
/// here, holds no state across calls.
#[derive(Debug, Clone)]
pub struct PublishRequest {
    pub identity: EvmAddress,
    pub filename: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
    /// Declared storage duration in storage-network epochs.
    pub epochs: u64,
    pub immutable: bool,
}

/// Returned to the caller on success; the core retains nothing.
#[derive(Debug, Clone)]
pub struct StorageReceipt {
    pub blob_id: String,
    pub files: Vec<StoredFile>,
    pub fee_charged: U256,
    pub remaining_balance: U256,
}

pub struct PublishService {
    ledger: Arc<CreditLedger>,
    storage: Arc<dyn StorageClient>,
    chain: Arc<dyn LedgerClient>,
    /// Chain-B address that owns registered blobs.
    storage_owner: String,
    store_fee: U256,
}

impl PublishService {
    pub fn new(
        ledger: Arc<CreditLedger>,
        storage: Arc<dyn StorageClient>,
        chain: Arc<dyn LedgerClient>,
        storage_owner: String,
        store_fee: U256,
    ) -> Self {
        Self {
            ledger,
            storage,
            chain,
            storage_owner,
            store_fee,
        }
    }

    pub fn store_fee(&self) -> U256 {
        self.store_fee
    }

    /// Runs the publish workflow for one request.
    ///
    /// Ordering is strict: the balance check and debit complete before any
    /// network call begins, and the ledger lock is never held across I/O.
    pub async fn publish(&self, request: PublishRequest) -> Result<StorageReceipt> {
        // Fast-fail before any external I/O; no state is mutated here.
        let balance = self.ledger.balance_of(&request.identity).await?;
        if balance < self.store_fee {
            return Err(Error::InsufficientFunds {
                balance,
                required: self.store_fee,
            });
        }

        // Fee commitment point. Two racing publishes for the same identity
        // are serialized by the ledger; the loser of an overdraw race gets
        // InsufficientBalance here, reported as InsufficientFunds.
        let account = match self.ledger.debit(&request.identity, self.store_fee).await {
            Ok(account) => account,
            Err(Error::InsufficientBalance { balance, required }) => {
                return Err(Error::InsufficientFunds { balance, required })
            }
            Err(e) => return Err(e),
        };
        let remaining_balance = account.balance;
        info!(identity = %request.identity, fee = %self.store_fee,
            "fee debited, starting publish");

        let file = FileUpload {
            identifier: request.filename.clone(),
            content_type: request.content_type.clone(),
            contents: request.bytes,
        };
        let mut flow = self.storage.write_files_flow(vec![file]);

        if let Err(e) = flow.encode().await {
            return Err(self.after_debit(&request.identity, PublishStep::Encode, e));
        }

        let register_tx = flow
            .register(&RegisterOptions {
                epochs: request.epochs,
                owner: self.storage_owner.clone(),
                deletable: !request.immutable,
            })
            .map_err(|e| self.after_debit(&request.identity, PublishStep::Register, e))?;
        let register_digest = self
            .chain
            .sign_and_execute(&register_tx)
            .await
            .map_err(|e| self.finalizing(&request.identity, PublishStep::Register, e))?;

        if let Err(e) = flow.upload(&register_digest).await {
            return Err(self.after_debit(&request.identity, PublishStep::Upload, e));
        }

        let certify_tx = flow
            .certify()
            .map_err(|e| self.after_debit(&request.identity, PublishStep::Certify, e))?;
        self.chain
            .sign_and_execute(&certify_tx)
            .await
            .map_err(|e| self.finalizing(&request.identity, PublishStep::Certify, e))?;

        let files = flow
            .list_files()
            .await
            .map_err(|e| self.after_debit(&request.identity, PublishStep::List, e))?;
        let blob_id = flow
            .blob_id()
            .map_err(|e| self.after_debit(&request.identity, PublishStep::List, e))?;

        info!(identity = %request.identity, blob_id = %blob_id, "publish complete");
        Ok(StorageReceipt {
            blob_id,
            files,
            fee_charged: self.store_fee,
            remaining_balance,
        })
    }

    /// A failure past the fee commitment point. The fee is not refunded;
    /// the operator must reconcile from this record.
    fn after_debit(&self, identity: &EvmAddress, step: PublishStep, err: Error) -> Error {
        error!(identity = %identity, step = %step, error = %err,
            "publish failed after fee debit; fee not refunded, manual reconciliation required");
        Error::PublishFailed {
            step,
            reason: err.to_string(),
        }
    }

    /// Register and certify finalize on chain B. A timeout here is ambiguous:
    /// the transaction may have landed, so it must not be retried blindly.
    fn finalizing(&self, identity: &EvmAddress, step: PublishStep, err: Error) -> Error {
        if matches!(err, Error::RpcTimeout) {
            error!(identity = %identity, step = %step,
                "chain-B finalization timed out; outcome ambiguous, manual reconciliation required");
            return Error::AmbiguousOutcome { step };
        }
        self.after_debit(identity, step, err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::clients::{LedgerTransaction, TxDigest, WriteFlow};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU64, Ordering};

    use crate::domain::identity::TxHash;

    #[derive(Default)]
    struct StorageFlags {
        fail_upload: bool,
        uploads: AtomicU64,
    }

    struct MockStorage {
        flags: Arc<StorageFlags>,
    }

    impl StorageClient for MockStorage {
        fn write_files_flow(&self, files: Vec<FileUpload>) -> Box<dyn WriteFlow> {
            Box::new(MockFlow {
                flags: self.flags.clone(),
                files,
                encoded: false,
            })
        }
    }

    struct MockFlow {
        flags: Arc<StorageFlags>,
        files: Vec<FileUpload>,
        encoded: bool,
    }

    #[async_trait]
    impl WriteFlow for MockFlow {
        async fn encode(&mut self) -> crate::error::Result<()> {
            self.encoded = true;
            Ok(())
        }

        fn register(&self, _opts: &RegisterOptions) -> crate::error::Result<LedgerTransaction> {
            Ok(LedgerTransaction {
                kind: "register",
                bytes: vec![1],
            })
        }

        async fn upload(&mut self, _register_digest: &str) -> crate::error::Result<()> {
            if self.flags.fail_upload {
                return Err(Error::Rpc("relay unavailable".into()));
            }
            self.flags.uploads.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        fn certify(&self) -> crate::error::Result<LedgerTransaction> {
            Ok(LedgerTransaction {
                kind: "certify",
                bytes: vec![2],
            })
        }

        async fn list_files(&self) -> crate::error::Result<Vec<StoredFile>> {
            Ok(self
                .files
                .iter()
                .map(|f| StoredFile {
                    identifier: f.identifier.clone(),
                    blob_id: "blob-1".into(),
                    content_type: Some(f.content_type.clone()),
                    size: f.contents.len() as u64,
                })
                .collect())
        }

        fn blob_id(&self) -> crate::error::Result<String> {
            Ok("blob-1".into())
        }
    }

    enum ChainMode {
        Ok,
        TimeoutOn(&'static str),
    }

    struct MockChain {
        mode: ChainMode,
        executed: AtomicU64,
    }

    #[async_trait]
    impl LedgerClient for MockChain {
        async fn sign_and_execute(&self, tx: &LedgerTransaction) -> crate::error::Result<TxDigest> {
            if let ChainMode::TimeoutOn(kind) = &self.mode {
                if tx.kind == *kind {
                    return Err(Error::RpcTimeout);
                }
            }
            self.executed.fetch_add(1, Ordering::SeqCst);
            Ok(format!("digest-{}", tx.kind))
        }
    }

    fn addr(n: u8) -> EvmAddress {
        EvmAddress::parse(&format!("0x{:040x}", n)).unwrap()
    }

    fn tx(n: u8) -> TxHash {
        TxHash::parse(&format!("0x{:064x}", n)).unwrap()
    }

    fn request(identity: EvmAddress) -> PublishRequest {
        PublishRequest {
            identity,
            filename: "file.txt".into(),
            content_type: "text/plain".into(),
            bytes: b"hello".to_vec(),
            epochs: 3,
            immutable: true,
        }
    }

    async fn service(
        fee: u64,
        flags: StorageFlags,
        mode: ChainMode,
    ) -> (PublishService, Arc<CreditLedger>, Arc<StorageFlags>) {
        let ledger = Arc::new(CreditLedger::new());
        let flags = Arc::new(flags);
        let svc = PublishService::new(
            ledger.clone(),
            Arc::new(MockStorage {
                flags: flags.clone(),
            }),
            Arc::new(MockChain {
                mode,
                executed: AtomicU64::new(0),
            }),
            "0xowner".into(),
            U256::from(fee),
        );
        (svc, ledger, flags)
    }

    #[tokio::test]
    async fn publish_succeeds_and_charges_fee_once() {
        let (svc, ledger, flags) = service(10, StorageFlags::default(), ChainMode::Ok).await;
        ledger.register(&addr(1)).await;
        ledger.credit(&addr(1), &tx(1), U256::from(25)).await.unwrap();

        let receipt = svc.publish(request(addr(1))).await.unwrap();
        assert_eq!(receipt.blob_id, "blob-1");
        assert_eq!(receipt.fee_charged, U256::from(10));
        assert_eq!(receipt.remaining_balance, U256::from(15));
        assert_eq!(receipt.files.len(), 1);
        assert_eq!(flags.uploads.load(Ordering::SeqCst), 1);
        assert_eq!(ledger.balance_of(&addr(1)).await.unwrap(), U256::from(15));
    }

    #[tokio::test]
    async fn insufficient_funds_leaves_ledger_untouched_and_skips_upload() {
        let (svc, ledger, flags) = service(10, StorageFlags::default(), ChainMode::Ok).await;
        ledger.register(&addr(1)).await;
        ledger.credit(&addr(1), &tx(1), U256::from(5)).await.unwrap();

        let err = svc.publish(request(addr(1))).await.unwrap_err();
        match err {
            Error::InsufficientFunds { balance, required } => {
                assert_eq!(balance, U256::from(5));
                assert_eq!(required, U256::from(10));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(ledger.balance_of(&addr(1)).await.unwrap(), U256::from(5));
        assert_eq!(flags.uploads.load(Ordering::SeqCst), 0);
    }

    /// Fee commitment: a failure after the debit leaves the fee charged
    /// exactly once, with the failing step named.
    #[tokio::test]
    async fn upload_failure_does_not_refund_the_fee() {
        let flags = StorageFlags {
            fail_upload: true,
            ..Default::default()
        };
        let (svc, ledger, _) = service(10, flags, ChainMode::Ok).await;
        ledger.register(&addr(1)).await;
        ledger.credit(&addr(1), &tx(1), U256::from(10)).await.unwrap();

        let err = svc.publish(request(addr(1))).await.unwrap_err();
        match err {
            Error::PublishFailed { step, .. } => assert_eq!(step, PublishStep::Upload),
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(ledger.balance_of(&addr(1)).await.unwrap(), U256::zero());
    }

    #[tokio::test]
    async fn finalization_timeout_is_ambiguous_not_failed() {
        for kind in ["register", "certify"] {
            let (svc, ledger, _) =
                service(10, StorageFlags::default(), ChainMode::TimeoutOn(kind)).await;
            ledger.register(&addr(1)).await;
            ledger.credit(&addr(1), &tx(1), U256::from(10)).await.unwrap();

            let err = svc.publish(request(addr(1))).await.unwrap_err();
            assert_eq!(err.kind(), "AmbiguousOutcome");
            // Fee stays charged: the attempt may have landed on chain.
            assert_eq!(ledger.balance_of(&addr(1)).await.unwrap(), U256::zero());
        }
    }

    #[tokio::test]
    async fn unknown_account_cannot_publish() {
        let (svc, _, _) = service(10, StorageFlags::default(), ChainMode::Ok).await;
        let err = svc.publish(request(addr(7))).await.unwrap_err();
        assert_eq!(err.kind(), "UnknownAccount");
    }
}
