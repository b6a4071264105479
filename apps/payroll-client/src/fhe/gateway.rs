// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Coprocessor deployment configuration.

use alloy::primitives::{address, Address};

/// Default relayer endpoint for the Sepolia coprocessor deployment.
pub const SEPOLIA_RELAYER_URL: &str = "https://relayer.testnet.zama.org/";

/// Chain identity and contract addresses a coprocessor session is bound to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayConfig {
    /// Chain hosting the encrypted contracts
    pub chain_id: u64,
    /// Chain of the decryption gateway (EIP-712 domain chain)
    pub gateway_chain_id: u64,
    /// Relayer base URL
    pub relayer_url: String,
    /// Access-control list contract
    pub acl_address: Address,
    /// Coprocessor coordinator contract
    pub coprocessor_address: Address,
    /// KMS verifier contract
    pub kms_verifier_address: Address,
    /// Input verifier contract
    pub input_verifier_address: Address,
    /// Verifying contract of the user-decryption EIP-712 domain
    pub decryption_verifier_address: Address,
    /// Verifying contract of input proofs
    pub input_verification_address: Address,
}

impl GatewayConfig {
    /// Official Sepolia deployment.
    pub fn sepolia() -> Self {
        Self {
            chain_id: 11_155_111,
            gateway_chain_id: 11_155_111,
            relayer_url: SEPOLIA_RELAYER_URL.to_string(),
            acl_address: address!("f0Ffdc93b7E186bC2f8CB3dAA75D86d1930A433D"),
            coprocessor_address: address!("92C920834Ec8941d2C77D188936E1f7A6f49c127"),
            kms_verifier_address: address!("bE0E383937d564D7FF0BC3b46c51f0bF8d5C311A"),
            input_verifier_address: address!("BBC1fFCdc7C316aAAd72E807D9b0272BE8F84DA0"),
            decryption_verifier_address: address!("5D8BD78e2ea6bbE41f26dFe9fdaEAa349e077478"),
            input_verification_address: address!("483b9dE06E4E4C7D35CCf5837A1668487406D955"),
        }
    }

    /// Relayer endpoint `path` joined onto the base URL.
    pub fn relayer_endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.relayer_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relayer_endpoint_joins_single_slash() {
        let config = GatewayConfig::sepolia();
        assert_eq!(
            config.relayer_endpoint("/v1/keyurl"),
            "https://relayer.testnet.zama.org/v1/keyurl"
        );
        assert_eq!(
            config.relayer_endpoint("v1/user-decrypt"),
            "https://relayer.testnet.zama.org/v1/user-decrypt"
        );
    }
}
