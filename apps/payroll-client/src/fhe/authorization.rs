// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Structured authorization for user decryption.
//!
//! Every decryption attempt generates a fresh ephemeral keypair and asks the
//! user to sign an EIP-712 `UserDecryptRequestVerification` message binding
//! the public key, the contract set and a validity window. The coprocessor
//! seals results to the public key; only the ephemeral secret can open them.

use alloy::{
    primitives::{keccak256, Address, Bytes, Signature, B256, U256},
    signers::{local::PrivateKeySigner, Signer},
    sol,
    sol_types::{eip712_domain, Eip712Domain, SolStruct},
};
use async_trait::async_trait;
use k256::{ecdh::diffie_hellman, elliptic_curve::sec1::ToEncodedPoint, PublicKey, SecretKey};
use rand::rngs::OsRng;

use super::gateway::GatewayConfig;

/// Validity of a decryption authorization.
pub const DECRYPTION_VALIDITY_DAYS: u64 = 10;

const SECONDS_PER_DAY: u64 = 24 * 60 * 60;

sol! {
    #[derive(Debug, PartialEq, Eq)]
    struct UserDecryptRequestVerification {
        bytes publicKey;
        address[] contractAddresses;
        uint256 startTimestamp;
        uint256 durationDays;
        bytes extraData;
    }
}

/// Single-use secp256k1 keypair for one decryption attempt.
pub struct DecryptionKeypair {
    secret: SecretKey,
    public: PublicKey,
}

impl DecryptionKeypair {
    pub fn generate() -> Self {
        let secret = SecretKey::random(&mut OsRng);
        let public = secret.public_key();
        Self { secret, public }
    }

    /// Compressed SEC1 encoding of the public key.
    pub fn public_key_bytes(&self) -> Bytes {
        Bytes::copy_from_slice(self.public.to_encoded_point(true).as_bytes())
    }

    /// Open a value sealed to this keypair by the holder of `sender`.
    ///
    /// The seal is the big-endian plaintext XORed with the first 16 bytes of
    /// `keccak256(ecdh(secret, sender) || handle)`.
    pub fn unseal_u128(&self, sender: &PublicKey, handle: B256, sealed: &[u8]) -> Option<u128> {
        let sealed: [u8; 16] = sealed.try_into().ok()?;
        let pad = seal_pad(&self.secret, sender, handle);
        Some(u128::from_be_bytes(sealed) ^ pad)
    }
}

impl std::fmt::Debug for DecryptionKeypair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DecryptionKeypair")
            .field("public", &self.public_key_bytes())
            .finish_non_exhaustive()
    }
}

/// Keystream word shared by both ends of a sealed value.
pub(crate) fn seal_pad(secret: &SecretKey, peer: &PublicKey, handle: B256) -> u128 {
    let shared = diffie_hellman(secret.to_nonzero_scalar(), peer.as_affine());
    let mut material = Vec::with_capacity(64);
    material.extend_from_slice(shared.raw_secret_bytes().as_slice());
    material.extend_from_slice(handle.as_slice());
    let digest = keccak256(&material);

    let mut word = [0u8; 16];
    word.copy_from_slice(&digest[..16]);
    u128::from_be_bytes(word)
}

/// Unsigned authorization: the typed message and its domain.
#[derive(Debug, Clone)]
pub struct DecryptAuthorization {
    pub message: UserDecryptRequestVerification,
    pub domain: Eip712Domain,
}

impl DecryptAuthorization {
    pub fn new(
        keypair: &DecryptionKeypair,
        contract_addresses: Vec<Address>,
        issued_at: u64,
        duration_days: u64,
        gateway: &GatewayConfig,
    ) -> Self {
        let domain = eip712_domain! {
            name: "Decryption",
            version: "1",
            chain_id: gateway.gateway_chain_id,
            verifying_contract: gateway.decryption_verifier_address,
        };

        Self {
            message: UserDecryptRequestVerification {
                publicKey: keypair.public_key_bytes(),
                contractAddresses: contract_addresses,
                startTimestamp: U256::from(issued_at),
                durationDays: U256::from(duration_days),
                extraData: Bytes::new(),
            },
            domain,
        }
    }

    /// EIP-712 digest the user signs.
    pub fn signing_hash(&self) -> B256 {
        self.message.eip712_signing_hash(&self.domain)
    }

    /// Unix time after which the coprocessor refuses the authorization.
    pub fn expires_at(&self) -> u64 {
        let start: u64 = self.message.startTimestamp.saturating_to();
        let days: u64 = self.message.durationDays.saturating_to();
        start.saturating_add(days.saturating_mul(SECONDS_PER_DAY))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SignerError {
    #[error("Signature request was rejected")]
    Rejected,

    #[error("Signing failed: {0}")]
    Failed(String),
}

/// Wallet-level signer for structured authorizations.
#[async_trait]
pub trait AuthorizationSigner: Send + Sync {
    fn address(&self) -> Address;

    async fn sign_authorization(
        &self,
        authorization: &DecryptAuthorization,
    ) -> Result<Signature, SignerError>;
}

/// Signs authorizations with a local key, never prompting.
pub struct LocalAuthorizationSigner {
    signer: PrivateKeySigner,
}

impl LocalAuthorizationSigner {
    pub fn new(signer: PrivateKeySigner) -> Self {
        Self { signer }
    }
}

#[async_trait]
impl AuthorizationSigner for LocalAuthorizationSigner {
    fn address(&self) -> Address {
        self.signer.address()
    }

    async fn sign_authorization(
        &self,
        authorization: &DecryptAuthorization,
    ) -> Result<Signature, SignerError> {
        self.signer
            .sign_hash(&authorization.signing_hash())
            .await
            .map_err(|e| SignerError::Failed(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dev_signer() -> PrivateKeySigner {
        crate::blockchain::signing::create_signer(
            "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80",
        )
        .unwrap()
    }

    #[test]
    fn keypairs_are_fresh() {
        let a = DecryptionKeypair::generate();
        let b = DecryptionKeypair::generate();
        assert_ne!(a.public_key_bytes(), b.public_key_bytes());
        assert_eq!(a.public_key_bytes().len(), 33);
    }

    #[test]
    fn sealed_value_opens_with_matching_secret() {
        let gateway_secret = SecretKey::random(&mut OsRng);
        let keypair = DecryptionKeypair::generate();
        let handle = B256::repeat_byte(7);
        let value: u128 = 150_000_000_000_000;

        let sealed = (value ^ seal_pad(&gateway_secret, &keypair.public, handle)).to_be_bytes();

        let opened = keypair
            .unseal_u128(&gateway_secret.public_key(), handle, &sealed)
            .unwrap();
        assert_eq!(opened, value);

        let other = DecryptionKeypair::generate();
        assert_ne!(
            other.unseal_u128(&gateway_secret.public_key(), handle, &sealed),
            Some(value)
        );
        assert_eq!(keypair.unseal_u128(&gateway_secret.public_key(), handle, &[0u8; 3]), None);
    }

    #[test]
    fn authorization_window_spans_validity_days() {
        let keypair = DecryptionKeypair::generate();
        let auth = DecryptAuthorization::new(
            &keypair,
            vec![Address::repeat_byte(9)],
            1_700_000_000,
            DECRYPTION_VALIDITY_DAYS,
            &GatewayConfig::sepolia(),
        );

        assert_eq!(auth.expires_at(), 1_700_000_000 + 10 * 86_400);
        assert_eq!(auth.domain.chain_id, Some(U256::from(11_155_111u64)));
        assert_eq!(auth.message.publicKey, keypair.public_key_bytes());
    }

    #[tokio::test]
    async fn local_signer_signature_recovers_to_address() {
        let signer = LocalAuthorizationSigner::new(dev_signer());
        let keypair = DecryptionKeypair::generate();
        let auth = DecryptAuthorization::new(
            &keypair,
            vec![Address::repeat_byte(9)],
            1_700_000_000,
            DECRYPTION_VALIDITY_DAYS,
            &GatewayConfig::sepolia(),
        );

        let signature = signer.sign_authorization(&auth).await.unwrap();
        let recovered = signature
            .recover_address_from_prehash(&auth.signing_hash())
            .unwrap();
        assert_eq!(recovered, signer.address());
    }
}
