//! Canonical chain-A identifiers: payer addresses and transaction hashes.
//!
//! Both types normalize to lower case on construction so they can be used
//! directly as ledger keys. A mixed-case address input is additionally
//! required to carry a valid EIP-55 checksum; all-lower or all-upper inputs
//! skip the check (they carry no checksum information).

use serde::Serialize;
use sha3::{Digest, Keccak256};

use crate::error::{Error, Result};

/// A checksum-validated, lower-cased EVM address (`0x` + 40 hex digits).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct EvmAddress(String);

impl EvmAddress {
    pub fn parse(input: &str) -> Result<Self> {
        let s = input.trim();
        let hex_part = s
            .strip_prefix("0x")
            .ok_or_else(|| Error::MalformedInput(format!("address must start with 0x: {s}")))?;
        if hex_part.len() != 40 || !hex_part.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(Error::MalformedInput(format!(
                "address must be 0x followed by 40 hex digits: {s}"
            )));
        }

        let has_lower = hex_part.chars().any(|c| c.is_ascii_lowercase());
        let has_upper = hex_part.chars().any(|c| c.is_ascii_uppercase());
        if has_lower && has_upper && hex_part != eip55_checksum(&hex_part.to_lowercase()) {
            return Err(Error::MalformedInput(format!(
                "address checksum is invalid: {s}"
            )));
        }

        Ok(Self(format!("0x{}", hex_part.to_lowercase())))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for EvmAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A chain-A transaction hash (`0x` + 64 hex digits), lower-cased.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct TxHash(String);

impl TxHash {
    pub fn parse(input: &str) -> Result<Self> {
        let s = input.trim();
        let hex_part = s
            .strip_prefix("0x")
            .ok_or_else(|| Error::MalformedInput(format!("tx hash must start with 0x: {s}")))?;
        if hex_part.len() != 64 || !hex_part.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(Error::MalformedInput(format!(
                "tx hash must be 0x followed by 64 hex digits: {s}"
            )));
        }
        Ok(Self(format!("0x{}", hex_part.to_lowercase())))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for TxHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// EIP-55 checksum form of a lower-case 40-digit hex address (no 0x prefix).
fn eip55_checksum(lower_hex: &str) -> String {
    let hash = Keccak256::digest(lower_hex.as_bytes());
    lower_hex
        .chars()
        .enumerate()
        .map(|(i, c)| {
            let nibble = (hash[i / 2] >> (if i % 2 == 0 { 4 } else { 0 })) & 0x0f;
            if nibble >= 8 {
                c.to_ascii_uppercase()
            } else {
                c
            }
        })
        .collect()
}
