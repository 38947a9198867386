//! Chain-A receipt verification.
//!
//! `ReceiptVerifier` validates a claimed top-up transaction against the
//! chain-A view exposed by an [`EvmChainReader`]. It is a pure, retryable
//! read: it never touches the Credit Ledger, so a caller can re-run it
//! freely until the transaction has enough confirmations.

use std::sync::Arc;

use async_trait::async_trait;
use primitive_types::U256;

use crate::domain::identity::{EvmAddress, TxHash};
use crate::error::{Error, Result};

/// A chain-A transaction as returned by the RPC node.
#[derive(Debug, Clone)]
pub struct EvmTransaction {
    pub from: Option<EvmAddress>,
    pub to: Option<EvmAddress>,
    pub value: U256,
}

/// A chain-A transaction receipt. `status` is `None` when the node omits the
/// field (pre-Byzantium nodes and some sidechain clients do).
#[derive(Debug, Clone)]
pub struct EvmReceipt {
    pub status: Option<u64>,
    pub block_number: Option<u64>,
}

/// Read-only view of chain A needed for verification.
#[async_trait]
pub trait EvmChainReader: Send + Sync {
    async fn transaction_by_hash(&self, hash: &TxHash) -> Result<Option<EvmTransaction>>;
    async fn transaction_receipt(&self, hash: &TxHash) -> Result<Option<EvmReceipt>>;
    async fn block_number(&self) -> Result<u64>;
    async fn chain_id(&self) -> Result<u64>;
}

/// Result of a successful verification: the value to credit and the
/// confirmation depth observed at call time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VerifiedTopUp {
    pub value: U256,
    pub confirmations: u64,
}

pub struct ReceiptVerifier {
    chain: Arc<dyn EvmChainReader>,
}

impl ReceiptVerifier {
    pub fn new(chain: Arc<dyn EvmChainReader>) -> Self {
        Self { chain }
    }

    /// Validates `tx_hash` as a top-up from `expected_from` to `expected_to`.
    ///
    /// Each step is a hard precondition; the first failure is returned and no
    /// partial credit is possible. Well-formedness of the hash itself is
    /// enforced by [`TxHash::parse`] before this call.
    pub async fn verify(
        &self,
        tx_hash: &TxHash,
        expected_from: &EvmAddress,
        expected_to: &EvmAddress,
        min_confirmations: u64,
    ) -> Result<VerifiedTopUp> {
        let tx = self
            .chain
            .transaction_by_hash(tx_hash)
            .await?
            .ok_or_else(|| Error::TxNotFound(tx_hash.to_string()))?;

        let from = tx.from.as_ref().ok_or_else(|| Error::AddressMismatch {
            field: "from",
            expected: expected_from.to_string(),
            actual: "(missing)".to_string(),
        })?;
        if from != expected_from {
            return Err(Error::AddressMismatch {
                field: "from",
                expected: expected_from.to_string(),
                actual: from.to_string(),
            });
        }
        // Contract-creation transactions have no `to`; they can never be a
        // transfer to the custodial address.
        let to = tx.to.as_ref().ok_or_else(|| Error::AddressMismatch {
            field: "to",
            expected: expected_to.to_string(),
            actual: "(missing)".to_string(),
        })?;
        if to != expected_to {
            return Err(Error::AddressMismatch {
                field: "to",
                expected: expected_to.to_string(),
                actual: to.to_string(),
            });
        }

        let receipt = self
            .chain
            .transaction_receipt(tx_hash)
            .await?
            .ok_or_else(|| Error::NotMined(tx_hash.to_string()))?;

        // Fail closed on an absent status field: an unknown outcome is not a
        // success outcome.
        match receipt.status {
            Some(1) => {}
            _ => return Err(Error::TransactionFailed(tx_hash.to_string())),
        }

        let inclusion_block = receipt
            .block_number
            .ok_or_else(|| Error::NotMined(tx_hash.to_string()))?;
        let head = self.chain.block_number().await?;
        let confirmations = head.saturating_sub(inclusion_block) + 1;
        if confirmations < min_confirmations {
            return Err(Error::InsufficientConfirmations {
                observed: confirmations,
                required: min_confirmations,
            });
        }

        if tx.value.is_zero() {
            return Err(Error::ZeroValue(tx_hash.to_string()));
        }

        Ok(VerifiedTopUp {
            value: tx.value,
            confirmations,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tokio::sync::Mutex;

    struct MockChain {
        txs: HashMap<TxHash, EvmTransaction>,
        receipts: HashMap<TxHash, EvmReceipt>,
        head: u64,
        calls: Mutex<u64>,
    }

    impl MockChain {
        fn new(head: u64) -> Self {
            Self {
                txs: HashMap::new(),
                receipts: HashMap::new(),
                head,
                calls: Mutex::new(0),
            }
        }
    }

    #[async_trait]
    impl EvmChainReader for MockChain {
        async fn transaction_by_hash(&self, hash: &TxHash) -> Result<Option<EvmTransaction>> {
            *self.calls.lock().await += 1;
            Ok(self.txs.get(hash).cloned())
        }

        async fn transaction_receipt(&self, hash: &TxHash) -> Result<Option<EvmReceipt>> {
            Ok(self.receipts.get(hash).cloned())
        }

        async fn block_number(&self) -> Result<u64> {
            Ok(self.head)
        }

        async fn chain_id(&self) -> Result<u64> {
            Ok(1)
        }
    }

    fn addr(n: u8) -> EvmAddress {
        EvmAddress::parse(&format!("0x{:040x}", n)).unwrap()
    }

    fn tx_hash(n: u8) -> TxHash {
        TxHash::parse(&format!("0x{:064x}", n)).unwrap()
    }

    fn transfer(from: u8, to: u8, value: u64) -> EvmTransaction {
        EvmTransaction {
            from: Some(addr(from)),
            to: Some(addr(to)),
            value: U256::from(value),
        }
    }

    fn mined(status: Option<u64>, block: u64) -> EvmReceipt {
        EvmReceipt {
            status,
            block_number: Some(block),
        }
    }

    fn verifier_with(chain: MockChain) -> ReceiptVerifier {
        ReceiptVerifier::new(Arc::new(chain))
    }

    #[tokio::test]
    async fn verifies_a_confirmed_transfer() {
        let mut chain = MockChain::new(12);
        chain.txs.insert(tx_hash(1), transfer(1, 2, 100));
        chain.receipts.insert(tx_hash(1), mined(Some(1), 10));
        let v = verifier_with(chain);

        let out = v.verify(&tx_hash(1), &addr(1), &addr(2), 1).await.unwrap();
        assert_eq!(out.value, U256::from(100));
        assert_eq!(out.confirmations, 3);
    }

    #[tokio::test]
    async fn unknown_transaction_is_not_found() {
        let v = verifier_with(MockChain::new(5));
        let err = v.verify(&tx_hash(1), &addr(1), &addr(2), 1).await.unwrap_err();
        assert_eq!(err.kind(), "NotFound");
    }

    #[tokio::test]
    async fn mismatched_sender_and_recipient_are_rejected() {
        let mut chain = MockChain::new(5);
        chain.txs.insert(tx_hash(1), transfer(9, 2, 100));
        chain.txs.insert(tx_hash(2), transfer(1, 9, 100));
        chain.txs.insert(
            tx_hash(3),
            EvmTransaction {
                from: Some(addr(1)),
                to: None,
                value: U256::from(100),
            },
        );
        let v = verifier_with(chain);

        for h in [tx_hash(1), tx_hash(2), tx_hash(3)] {
            let err = v.verify(&h, &addr(1), &addr(2), 1).await.unwrap_err();
            assert_eq!(err.kind(), "AddressMismatch");
        }
    }

    #[tokio::test]
    async fn missing_receipt_means_not_mined() {
        let mut chain = MockChain::new(5);
        chain.txs.insert(tx_hash(1), transfer(1, 2, 100));
        let v = verifier_with(chain);

        let err = v.verify(&tx_hash(1), &addr(1), &addr(2), 1).await.unwrap_err();
        assert_eq!(err.kind(), "NotMined");
    }

    #[tokio::test]
    async fn failed_status_and_absent_status_are_both_rejected() {
        let mut chain = MockChain::new(5);
        chain.txs.insert(tx_hash(1), transfer(1, 2, 100));
        chain.receipts.insert(tx_hash(1), mined(Some(0), 3));
        chain.txs.insert(tx_hash(2), transfer(1, 2, 100));
        chain.receipts.insert(tx_hash(2), mined(None, 3));
        let v = verifier_with(chain);

        for h in [tx_hash(1), tx_hash(2)] {
            let err = v.verify(&h, &addr(1), &addr(2), 1).await.unwrap_err();
            assert_eq!(err.kind(), "TransactionFailed");
        }
    }

    /// Confirmation gating: fails below N, succeeds at exactly N.
    #[tokio::test]
    async fn confirmation_boundary_is_exact() {
        let mut chain = MockChain::new(12);
        chain.txs.insert(tx_hash(1), transfer(1, 2, 100));
        chain.receipts.insert(tx_hash(1), mined(Some(1), 10));
        let v = verifier_with(chain);

        // head 12, inclusion 10 -> 3 confirmations observed.
        let err = v.verify(&tx_hash(1), &addr(1), &addr(2), 4).await.unwrap_err();
        match err {
            Error::InsufficientConfirmations { observed, required } => {
                assert_eq!(observed, 3);
                assert_eq!(required, 4);
            }
            other => panic!("unexpected error: {other:?}"),
        }

        let out = v.verify(&tx_hash(1), &addr(1), &addr(2), 3).await.unwrap();
        assert_eq!(out.confirmations, 3);
    }

    #[tokio::test]
    async fn zero_value_transfer_is_rejected() {
        let mut chain = MockChain::new(5);
        chain.txs.insert(tx_hash(1), transfer(1, 2, 0));
        chain.receipts.insert(tx_hash(1), mined(Some(1), 3));
        let v = verifier_with(chain);

        let err = v.verify(&tx_hash(1), &addr(1), &addr(2), 1).await.unwrap_err();
        assert_eq!(err.kind(), "ZeroValue");
    }

    /// Verification is a pure function of chain state at call time.
    #[tokio::test]
    async fn repeated_verification_is_deterministic() {
        let mut chain = MockChain::new(12);
        chain.txs.insert(tx_hash(1), transfer(1, 2, 100));
        chain.receipts.insert(tx_hash(1), mined(Some(1), 10));
        let v = verifier_with(chain);

        let first = v.verify(&tx_hash(1), &addr(1), &addr(2), 1).await.unwrap();
        let second = v.verify(&tx_hash(1), &addr(1), &addr(2), 1).await.unwrap();
        assert_eq!(first, second);
    }
}
