pub mod client;

pub use client::SuiClient;
