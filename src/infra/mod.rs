pub mod config;
pub mod evm;
pub mod sui;
pub mod walrus;
