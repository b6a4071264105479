// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Signing identity helpers.
//!
//! The acting identity (employee or HR operator) is a local secp256k1 key.
//! It signs both ledger transactions and the EIP-712 decryption
//! authorizations handed to the coprocessor.

use alloy::signers::local::PrivateKeySigner;

use super::ledger::LedgerError;

/// Create a signer from a hex-encoded private key.
///
/// # Arguments
/// * `private_key_hex` - 64 hex characters, with or without a `0x` prefix
///
/// # Returns
/// A `PrivateKeySigner` usable for transactions and typed-data hashes.
pub fn create_signer(private_key_hex: &str) -> Result<PrivateKeySigner, LedgerError> {
    let trimmed = private_key_hex.trim();
    let trimmed = trimmed.strip_prefix("0x").unwrap_or(trimmed);

    // Use alloy's hex decoding (from alloy-primitives)
    let key_bytes = alloy::hex::decode(trimmed)
        .map_err(|e| LedgerError::InvalidPrivateKey(e.to_string()))?;

    if key_bytes.len() != 32 {
        return Err(LedgerError::InvalidPrivateKey(format!(
            "expected 32 bytes, got {}",
            key_bytes.len()
        )));
    }

    PrivateKeySigner::from_slice(&key_bytes)
        .map_err(|e| LedgerError::InvalidPrivateKey(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::address;

    // Well-known development key (first Hardhat/Anvil account).
    const DEV_KEY: &str = "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

    #[test]
    fn test_create_signer() {
        let signer = create_signer(DEV_KEY).unwrap();
        assert_eq!(
            signer.address(),
            address!("f39Fd6e51aad88F6F4ce6aB8827279cffFb92266")
        );
    }

    #[test]
    fn test_create_signer_accepts_prefix() {
        let signer = create_signer(&format!("0x{DEV_KEY}")).unwrap();
        assert_eq!(
            signer.address(),
            address!("f39Fd6e51aad88F6F4ce6aB8827279cffFb92266")
        );
    }

    #[test]
    fn test_create_signer_rejects_garbage() {
        assert!(matches!(
            create_signer("not-hex"),
            Err(LedgerError::InvalidPrivateKey(_))
        ));
        assert!(matches!(
            create_signer("abcd"),
            Err(LedgerError::InvalidPrivateKey(_))
        ));
    }
}
