pub mod client;
pub mod wallet;

pub use client::EvmRpcClient;
pub use wallet::address_from_private_key;
