//! Custodial address derivation from the chain-A signing key.

use k256::ecdsa::SigningKey;
use k256::elliptic_curve::sec1::ToEncodedPoint;
use sha3::{Digest, Keccak256};

use crate::domain::identity::EvmAddress;
use crate::error::{Error, Result};

/// Derives the EVM address for a hex-encoded secp256k1 private key:
/// the low 20 bytes of Keccak-256 over the uncompressed public key.
pub fn address_from_private_key(hex_key: &str) -> Result<EvmAddress> {
    let raw = hex::decode(hex_key.trim().trim_start_matches("0x"))
        .map_err(|e| Error::MalformedInput(format!("invalid EVM private key hex: {e}")))?;
    let key = SigningKey::from_slice(&raw)
        .map_err(|e| Error::MalformedInput(format!("invalid EVM private key: {e}")))?;

    let point = key.verifying_key().to_encoded_point(false);
    let hash = Keccak256::digest(&point.as_bytes()[1..]);
    EvmAddress::parse(&format!("0x{}", hex::encode(&hash[12..])))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derives_known_address() {
        // Well-known test vector: key 0x...01 owns this address.
        let addr = address_from_private_key(
            "0x0000000000000000000000000000000000000000000000000000000000000001",
        )
        .unwrap();
        assert_eq!(addr.as_str(), "0x7e5f4552091a69125d5dfcb7b8c2659029395bdf");
    }

    #[test]
    fn rejects_garbage_keys() {
        assert!(address_from_private_key("not-hex").is_err());
        assert!(address_from_private_key("0x1234").is_err());
    }
}
