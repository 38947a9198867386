pub mod verifier;

pub use verifier::{EvmChainReader, EvmReceipt, EvmTransaction, ReceiptVerifier, VerifiedTopUp};
