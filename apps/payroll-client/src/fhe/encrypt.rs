// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Plaintext to authenticated ciphertext.

use std::sync::Arc;

use alloy::primitives::{Address, Bytes, B256};
use tracing::{debug, error};

use super::coprocessor::{CoprocessorError, EncryptedInputBuffer};
use super::session::{GatewaySession, SessionError};

/// Ciphertext handle plus the proof that it was well-formed for the declared
/// (contract, user) pair. Consumed by exactly one ledger write.
#[derive(Debug)]
pub struct CiphertextPayload {
    pub handle: B256,
    pub proof: Bytes,
}

#[derive(Debug, thiserror::Error)]
pub enum EncryptionError {
    #[error("Encryption session unavailable: {0}")]
    Session(#[from] SessionError),

    #[error("Encryption failed: {0}")]
    Coprocessor(#[from] CoprocessorError),

    #[error("Encryption returned {0} handles, expected 1")]
    HandleCount(usize),
}

/// Encrypts salary amounts for the payroll contract.
#[derive(Clone)]
pub struct CiphertextEncryptor {
    session: Arc<GatewaySession>,
}

impl CiphertextEncryptor {
    pub fn new(session: Arc<GatewaySession>) -> Self {
        Self { session }
    }

    /// Encrypt `value` as a 128-bit unsigned input usable by `user` when
    /// calling `contract`.
    pub async fn encrypt(
        &self,
        value: u128,
        contract: Address,
        user: Address,
    ) -> Result<CiphertextPayload, EncryptionError> {
        let session = self.session.get_session().await?;

        let mut buffer = EncryptedInputBuffer::new(contract, user);
        buffer.add128(value);

        let encrypted = session.encrypt_input(&buffer).await.map_err(|e| {
            error!(contract = %contract, user = %user, error = %e, "Encryption failed");
            e
        })?;

        let [handle] = encrypted.handles.as_slice() else {
            return Err(EncryptionError::HandleCount(encrypted.handles.len()));
        };

        debug!(
            contract = %contract,
            handle = %handle,
            proof_len = encrypted.input_proof.len(),
            "Encrypted input ready"
        );

        Ok(CiphertextPayload {
            handle: *handle,
            proof: encrypted.input_proof,
        })
    }
}
