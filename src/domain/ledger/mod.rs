//! Credit Ledger: prepaid per-payer balances sourced from verified chain-A
//! transfers.
//!
//! The ledger is the single writer of account state. One mutex guards the
//! account map and is held only across the read-modify-write of each
//! operation, never across network I/O, so operations on the same identity
//! are linearizable and a slow publish cannot block other users' credits.

use std::collections::{HashMap, HashSet};

use primitive_types::U256;
use tokio::sync::Mutex;
use tracing::info;

use crate::domain::identity::{EvmAddress, TxHash};
use crate::error::{Error, Result};

/// A payer account. `credited_txs` membership is permanent: a transaction
/// hash is never removed once credited, which is what makes `credit`
/// idempotent across confirmation retries.
#[derive(Debug, Clone)]
pub struct UserAccount {
    pub identity: EvmAddress,
    pub balance: U256,
    pub credited_txs: HashSet<TxHash>,
}

impl UserAccount {
    fn new(identity: EvmAddress) -> Self {
        Self {
            identity,
            balance: U256::zero(),
            credited_txs: HashSet::new(),
        }
    }
}

/// Outcome of a credit call. `already_credited` distinguishes a replayed
/// confirmation (success-shaped, no balance change) from a fresh credit.
#[derive(Debug, Clone)]
pub struct CreditOutcome {
    pub account: UserAccount,
    pub already_credited: bool,
}

#[derive(Default)]
pub struct CreditLedger {
    accounts: Mutex<HashMap<EvmAddress, UserAccount>>,
}

impl CreditLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates the account if absent and returns its current state either way.
    pub async fn register(&self, identity: &EvmAddress) -> UserAccount {
        let mut accounts = self.accounts.lock().await;
        accounts
            .entry(identity.clone())
            .or_insert_with(|| {
                info!(identity = %identity, "registered payer account");
                UserAccount::new(identity.clone())
            })
            .clone()
    }

    /// Adds `amount` to the balance, recording `tx_hash` as applied.
    ///
    /// Re-crediting an already-applied `tx_hash` returns the unchanged
    /// account with `already_credited = true`; it is not an error so callers
    /// can safely retry delivery of the same confirmation.
    pub async fn credit(
        &self,
        identity: &EvmAddress,
        tx_hash: &TxHash,
        amount: U256,
    ) -> Result<CreditOutcome> {
        if amount.is_zero() {
            return Err(Error::InvalidAmount);
        }

        let mut accounts = self.accounts.lock().await;
        let account = accounts
            .get_mut(identity)
            .ok_or_else(|| Error::UnknownAccount(identity.to_string()))?;

        if account.credited_txs.contains(tx_hash) {
            return Ok(CreditOutcome {
                account: account.clone(),
                already_credited: true,
            });
        }

        let new_balance = account
            .balance
            .checked_add(amount)
            .ok_or(Error::BalanceOverflow)?;
        account.balance = new_balance;
        account.credited_txs.insert(tx_hash.clone());
        info!(identity = %identity, tx = %tx_hash, amount = %amount, balance = %new_balance,
            "credited top-up");

        Ok(CreditOutcome {
            account: account.clone(),
            already_credited: false,
        })
    }

    /// Subtracts `amount` from the balance. An overdraft is rejected with
    /// `InsufficientBalance`, never clamped; the balance cannot go negative.
    pub async fn debit(&self, identity: &EvmAddress, amount: U256) -> Result<UserAccount> {
        let mut accounts = self.accounts.lock().await;
        let account = accounts
            .get_mut(identity)
            .ok_or_else(|| Error::UnknownAccount(identity.to_string()))?;

        if account.balance < amount {
            return Err(Error::InsufficientBalance {
                balance: account.balance,
                required: amount,
            });
        }
        account.balance -= amount;
        info!(identity = %identity, amount = %amount, balance = %account.balance, "debited fee");
        Ok(account.clone())
    }

    pub async fn balance_of(&self, identity: &EvmAddress) -> Result<U256> {
        let accounts = self.accounts.lock().await;
        accounts
            .get(identity)
            .map(|a| a.balance)
            .ok_or_else(|| Error::UnknownAccount(identity.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn addr(n: u8) -> EvmAddress {
        EvmAddress::parse(&format!("0x{:040x}", n)).unwrap()
    }

    fn tx(n: u8) -> TxHash {
        TxHash::parse(&format!("0x{:064x}", n)).unwrap()
    }

    #[tokio::test]
    async fn register_is_idempotent() {
        let ledger = CreditLedger::new();
        let a = ledger.register(&addr(1)).await;
        assert_eq!(a.balance, U256::zero());

        ledger.credit(&addr(1), &tx(1), U256::from(50)).await.unwrap();
        let again = ledger.register(&addr(1)).await;
        assert_eq!(again.balance, U256::from(50));
    }

    #[tokio::test]
    async fn credit_same_tx_twice_applies_once() {
        let ledger = CreditLedger::new();
        ledger.register(&addr(1)).await;

        let first = ledger.credit(&addr(1), &tx(1), U256::from(100)).await.unwrap();
        assert!(!first.already_credited);
        assert_eq!(first.account.balance, U256::from(100));

        let second = ledger.credit(&addr(1), &tx(1), U256::from(100)).await.unwrap();
        assert!(second.already_credited);
        assert_eq!(second.account.balance, U256::from(100));
    }

    #[tokio::test]
    async fn credit_rejects_zero_amount_and_unknown_account() {
        let ledger = CreditLedger::new();
        ledger.register(&addr(1)).await;

        let err = ledger.credit(&addr(1), &tx(1), U256::zero()).await.unwrap_err();
        assert_eq!(err.kind(), "InvalidAmount");

        let err = ledger.credit(&addr(2), &tx(1), U256::from(1)).await.unwrap_err();
        assert_eq!(err.kind(), "UnknownAccount");
    }

    #[tokio::test]
    async fn credit_overflow_is_fatal_not_wrapping() {
        let ledger = CreditLedger::new();
        ledger.register(&addr(1)).await;
        ledger.credit(&addr(1), &tx(1), U256::MAX).await.unwrap();

        let err = ledger.credit(&addr(1), &tx(2), U256::from(1)).await.unwrap_err();
        assert_eq!(err.kind(), "BalanceOverflow");
        // Balance and credited set are untouched by the failed credit.
        assert_eq!(ledger.balance_of(&addr(1)).await.unwrap(), U256::MAX);
        let ok = ledger.credit(&addr(1), &tx(2), U256::from(1)).await;
        assert!(ok.is_err(), "tx must not have been recorded as credited");
    }

    #[tokio::test]
    async fn debit_rejects_overdraft() {
        let ledger = CreditLedger::new();
        ledger.register(&addr(1)).await;
        ledger.credit(&addr(1), &tx(1), U256::from(5)).await.unwrap();

        let err = ledger.debit(&addr(1), U256::from(10)).await.unwrap_err();
        match err {
            Error::InsufficientBalance { balance, required } => {
                assert_eq!(balance, U256::from(5));
                assert_eq!(required, U256::from(10));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(ledger.balance_of(&addr(1)).await.unwrap(), U256::from(5));
    }

    #[tokio::test]
    async fn balance_of_unknown_account_fails() {
        let ledger = CreditLedger::new();
        assert_eq!(
            ledger.balance_of(&addr(9)).await.unwrap_err().kind(),
            "UnknownAccount"
        );
    }

    /// Two concurrent debits that would jointly overdraw the balance: exactly
    /// one succeeds, the other observes InsufficientBalance deterministically.
    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_debits_never_overdraw() {
        let ledger = Arc::new(CreditLedger::new());
        ledger.register(&addr(1)).await;
        ledger.credit(&addr(1), &tx(1), U256::from(10)).await.unwrap();

        let a = {
            let ledger = ledger.clone();
            tokio::spawn(async move { ledger.debit(&addr(1), U256::from(10)).await })
        };
        let b = {
            let ledger = ledger.clone();
            tokio::spawn(async move { ledger.debit(&addr(1), U256::from(10)).await })
        };
        let (ra, rb) = (a.await.unwrap(), b.await.unwrap());

        assert!(ra.is_ok() != rb.is_ok(), "exactly one debit must win");
        assert_eq!(ledger.balance_of(&addr(1)).await.unwrap(), U256::zero());
    }
}
