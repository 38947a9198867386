pub mod app;
pub mod domain;
pub mod error;
pub mod infra;
pub mod transport;

// Convenience re-exports (keeps call-sites clean)
pub use app::publisher::PublishService;
pub use domain::identity::{EvmAddress, TxHash};
pub use domain::ledger::CreditLedger;
pub use domain::verify::ReceiptVerifier;
pub use error::{Error, Result};
