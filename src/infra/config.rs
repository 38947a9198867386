//! Centralized configuration (environment variables + defaults).

use primitive_types::U256;

/// Chain-A (EVM) JSON-RPC URL (required).
pub fn evm_rpc_url() -> String {
    std::env::var("EVM_RPC_URL").expect("EVM_RPC_URL must be set")
}

/// Chain-A signing key as hex (required). Only used to derive the custodial
/// address users top up; the service never submits EVM transactions.
pub fn evm_private_key() -> String {
    std::env::var("EVM_PRIVATE_KEY").expect("EVM_PRIVATE_KEY must be set")
}

/// Chain-B network selector ("testnet" or "mainnet", defaults to "testnet").
pub fn sui_network() -> String {
    std::env::var("SUI_NETWORK").unwrap_or_else(|_| "testnet".to_string())
}

/// Chain-B fullnode URL. `SUI_FULLNODE` overrides the per-network default.
pub fn sui_rpc_url() -> String {
    std::env::var("SUI_FULLNODE")
        .unwrap_or_else(|_| format!("https://fullnode.{}.sui.io:443", sui_network()))
}

/// Chain-B signing key: hex-encoded 32-byte ed25519 seed (required).
pub fn sui_private_key() -> String {
    std::env::var("SUI_PRIVATE_KEY").expect("SUI_PRIVATE_KEY must be set")
}

/// Storage-network upload relay. `WALRUS_UPLOAD_URL` overrides the
/// per-network default.
pub fn walrus_upload_url() -> String {
    std::env::var("WALRUS_UPLOAD_URL")
        .unwrap_or_else(|_| format!("https://upload-relay.{}.walrus.space", sui_network()))
}

/// Fixed publish fee in wei, the smallest chain-A unit (required).
pub fn store_fee_wei() -> U256 {
    let v = std::env::var("STORE_FEE_WEI").expect("STORE_FEE_WEI must be set");
    U256::from_dec_str(&v).expect("STORE_FEE_WEI must be a decimal wei amount")
}

/// HTTP listen port (defaults to 3000).
pub fn listen_port() -> u16 {
    std::env::var("PORT")
        .ok()
        .and_then(|v| v.parse::<u16>().ok())
        .unwrap_or(3000)
}

/// Timeout applied to every external network call (defaults to 30 seconds).
pub fn rpc_timeout() -> std::time::Duration {
    let secs = std::env::var("RPC_TIMEOUT_SECS")
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(30);
    std::time::Duration::from_secs(secs)
}
