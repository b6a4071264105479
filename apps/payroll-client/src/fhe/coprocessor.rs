// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Ports to the confidential-compute coprocessor.
//!
//! [`CoprocessorRuntime`] performs the three initialization steps (load,
//! bootstrap, connect) and yields a [`Coprocessor`] session used for
//! encrypted inputs and user decryption. Transport failures are reported as
//! a typed [`CoprocessorError`]; only the transport that produced a failure
//! looks at its wording.

use std::collections::HashMap;
use std::sync::Arc;

use alloy::primitives::{Address, Bytes, Signature, B256};
use async_trait::async_trait;

use super::authorization::DecryptionKeypair;
use super::gateway::GatewayConfig;

/// A plaintext queued in an encrypted input buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputValue {
    Uint128(u128),
}

impl InputValue {
    /// Encrypted type name understood by the coprocessor.
    pub fn type_name(&self) -> &'static str {
        match self {
            InputValue::Uint128(_) => "euint128",
        }
    }
}

/// Plaintexts to be encrypted for one (contract, user) pair.
#[derive(Debug, Clone)]
pub struct EncryptedInputBuffer {
    contract: Address,
    user: Address,
    values: Vec<InputValue>,
}

impl EncryptedInputBuffer {
    pub fn new(contract: Address, user: Address) -> Self {
        Self {
            contract,
            user,
            values: Vec::new(),
        }
    }

    /// Append a 128-bit unsigned value.
    pub fn add128(&mut self, value: u128) -> &mut Self {
        self.values.push(InputValue::Uint128(value));
        self
    }

    pub fn contract(&self) -> Address {
        self.contract
    }

    pub fn user(&self) -> Address {
        self.user
    }

    pub fn values(&self) -> &[InputValue] {
        &self.values
    }
}

/// Output of a finalized input buffer: one handle per value and a single
/// proof covering all of them.
#[derive(Debug, Clone)]
pub struct EncryptedInput {
    pub handles: Vec<B256>,
    pub input_proof: Bytes,
}

/// A ciphertext handle and the contract holding it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HandleContractPair {
    pub handle: B256,
    pub contract: Address,
}

/// A signed user-decryption call.
#[derive(Debug)]
pub struct UserDecryptRequest<'a> {
    pub pairs: Vec<HandleContractPair>,
    pub keypair: &'a DecryptionKeypair,
    pub signature: Signature,
    pub contract_addresses: Vec<Address>,
    pub user: Address,
    pub start_timestamp: u64,
    pub duration_days: u64,
}

/// Plaintexts keyed by handle.
pub type DecryptedValues = HashMap<B256, u128>;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CoprocessorError {
    /// The ACL grant for the handle is not visible to the coprocessor yet.
    #[error("Not authorized to decrypt: {0}")]
    NotAuthorized(String),

    #[error("Invalid signature: {0}")]
    InvalidSignature(String),

    #[error("Relayer rejected request ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("Relayer transport error: {0}")]
    Transport(String),

    #[error("Malformed relayer response: {0}")]
    MalformedResponse(String),

    #[error("Coprocessor runtime error: {0}")]
    Runtime(String),
}

impl CoprocessorError {
    /// Whether retrying the same request later may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, CoprocessorError::NotAuthorized(_))
    }
}

/// An initialized coprocessor session.
#[async_trait]
pub trait Coprocessor: Send + Sync {
    /// Deployment this session is bound to.
    fn config(&self) -> &GatewayConfig;

    /// Encrypt the buffered values and prove them well-formed for the
    /// buffer's (contract, user) pair.
    async fn encrypt_input(
        &self,
        buffer: &EncryptedInputBuffer,
    ) -> Result<EncryptedInput, CoprocessorError>;

    /// Decrypt handles on behalf of the signing user.
    async fn user_decrypt(
        &self,
        request: &UserDecryptRequest<'_>,
    ) -> Result<DecryptedValues, CoprocessorError>;
}

/// Factory performing session initialization, step by step.
#[async_trait]
pub trait CoprocessorRuntime: Send + Sync {
    /// Load/activate the runtime.
    async fn load(&self) -> Result<(), CoprocessorError>;

    /// One-time bootstrap after loading.
    async fn bootstrap(&self) -> Result<(), CoprocessorError>;

    /// Construct a session bound to `config`.
    async fn connect(&self, config: &GatewayConfig)
        -> Result<Arc<dyn Coprocessor>, CoprocessorError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn buffer_collects_values_in_order() {
        let mut buffer =
            EncryptedInputBuffer::new(Address::repeat_byte(1), Address::repeat_byte(2));
        buffer.add128(5).add128(u128::MAX);

        assert_eq!(
            buffer.values(),
            &[InputValue::Uint128(5), InputValue::Uint128(u128::MAX)]
        );
        assert_eq!(buffer.values()[0].type_name(), "euint128");
    }

    #[test]
    fn only_authorization_lag_is_transient() {
        assert!(CoprocessorError::NotAuthorized("acl".into()).is_transient());
        assert!(!CoprocessorError::InvalidSignature("bad".into()).is_transient());
        assert!(!CoprocessorError::Transport("timeout".into()).is_transient());
        assert!(!CoprocessorError::Rejected {
            status: 500,
            message: "boom".into()
        }
        .is_transient());
    }
}
