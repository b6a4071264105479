// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Authenticated Decryption Client
//!
//! Turns a ciphertext handle back into a plaintext through a signed user
//! decryption request.
//!
//! ## Attempt
//!
//! 1. Generate a fresh ephemeral keypair.
//! 2. Build the EIP-712 authorization (public key, contract set, issuance
//!    time, validity window).
//! 3. Ask the user to sign it.
//! 4. Send the request to the coprocessor and pick the entry for the handle.
//!
//! ## Retries
//!
//! Right after a ledger write grants access to a new handle, the coprocessor
//! may not have indexed the ACL entry yet and answers `NotAuthorized`. Only
//! that error is retried, with a fixed backoff, up to
//! [`RetryPolicy::max_attempts`]. Each retry repeats the whole attempt with a
//! new keypair and signature.

use std::sync::Arc;
use std::time::Duration;

use alloy::primitives::{Address, B256};
use async_trait::async_trait;
use tracing::{debug, info, warn};

use super::authorization::{
    AuthorizationSigner, DecryptAuthorization, DecryptionKeypair, SignerError,
    DECRYPTION_VALIDITY_DAYS,
};
use super::coprocessor::{CoprocessorError, HandleContractPair, UserDecryptRequest};
use super::session::{GatewaySession, Session, SessionError};

/// Default number of attempts for the ACL propagation race.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

/// Default fixed delay between attempts.
pub const DEFAULT_BACKOFF: Duration = Duration::from_secs(3);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            backoff: DEFAULT_BACKOFF,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum DecryptError {
    #[error("Decryption session unavailable: {0}")]
    Session(#[from] SessionError),

    #[error("User declined to sign the decryption request")]
    SignatureRejected,

    #[error("Decryption signature was invalid: {0}")]
    InvalidSignature(String),

    #[error("Decryption returned no value for handle {handle}")]
    NoValueReturned { handle: B256 },

    #[error("Decryption still unauthorized after {attempts} attempts: {last}")]
    DecryptionExhausted {
        attempts: u32,
        last: CoprocessorError,
    },

    #[error("Decryption failed: {0}")]
    DecryptionFailed(String),
}

/// User-facing category of a decryption failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecryptFailureKind {
    SignatureRejected,
    PermissionPending,
    InvalidSignature,
    Failed,
}

impl DecryptError {
    pub fn kind(&self) -> DecryptFailureKind {
        match self {
            DecryptError::SignatureRejected => DecryptFailureKind::SignatureRejected,
            DecryptError::InvalidSignature(_) => DecryptFailureKind::InvalidSignature,
            DecryptError::DecryptionExhausted { last, .. } if last.is_transient() => {
                DecryptFailureKind::PermissionPending
            }
            _ => DecryptFailureKind::Failed,
        }
    }

    /// Message suitable for showing to the user.
    pub fn user_message(&self) -> String {
        match self.kind() {
            DecryptFailureKind::SignatureRejected => {
                "You declined the decryption signature. Sign the request to continue.".to_string()
            }
            DecryptFailureKind::PermissionPending => {
                "Decryption permission has not propagated yet. Wait a moment and try again."
                    .to_string()
            }
            DecryptFailureKind::InvalidSignature => {
                "The decryption signature was rejected as invalid. Check the connected account."
                    .to_string()
            }
            DecryptFailureKind::Failed => format!("Decryption failed: {self}"),
        }
    }
}

/// Anything that can turn a handle into a plaintext.
#[async_trait]
pub trait ValueDecryptor: Send + Sync {
    async fn decrypt(
        &self,
        handle: B256,
        contract: Address,
        user: Address,
    ) -> Result<u128, DecryptError>;
}

enum AttemptError {
    Transient(CoprocessorError),
    Fatal(DecryptError),
}

/// Decryption client backed by the gateway session and a wallet signer.
pub struct DecryptionClient {
    session: Arc<GatewaySession>,
    signer: Arc<dyn AuthorizationSigner>,
    policy: RetryPolicy,
}

impl DecryptionClient {
    pub fn new(session: Arc<GatewaySession>, signer: Arc<dyn AuthorizationSigner>) -> Self {
        Self {
            session,
            signer,
            policy: RetryPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    async fn attempt(
        &self,
        session: &Session,
        handle: B256,
        contract: Address,
        user: Address,
    ) -> Result<u128, AttemptError> {
        let keypair = DecryptionKeypair::generate();
        let issued_at = u64::try_from(chrono::Utc::now().timestamp()).unwrap_or_default();
        let contracts = vec![contract];

        let authorization = DecryptAuthorization::new(
            &keypair,
            contracts.clone(),
            issued_at,
            DECRYPTION_VALIDITY_DAYS,
            session.config(),
        );

        let signature = self
            .signer
            .sign_authorization(&authorization)
            .await
            .map_err(|e| match e {
                SignerError::Rejected => AttemptError::Fatal(DecryptError::SignatureRejected),
                SignerError::Failed(msg) => AttemptError::Fatal(DecryptError::DecryptionFailed(
                    format!("signing failed: {msg}"),
                )),
            })?;

        let request = UserDecryptRequest {
            pairs: vec![HandleContractPair { handle, contract }],
            keypair: &keypair,
            signature,
            contract_addresses: contracts,
            user,
            start_timestamp: issued_at,
            duration_days: DECRYPTION_VALIDITY_DAYS,
        };

        let values = session.user_decrypt(&request).await.map_err(|e| match e {
            e if e.is_transient() => AttemptError::Transient(e),
            CoprocessorError::InvalidSignature(msg) => {
                AttemptError::Fatal(DecryptError::InvalidSignature(msg))
            }
            other => AttemptError::Fatal(DecryptError::DecryptionFailed(other.to_string())),
        })?;

        values
            .get(&handle)
            .copied()
            .ok_or(AttemptError::Fatal(DecryptError::NoValueReturned { handle }))
    }
}

#[async_trait]
impl ValueDecryptor for DecryptionClient {
    async fn decrypt(
        &self,
        handle: B256,
        contract: Address,
        user: Address,
    ) -> Result<u128, DecryptError> {
        let session = self.session.get_session().await?;
        let max_attempts = self.policy.max_attempts.max(1);

        let mut attempt = 1;
        loop {
            debug!(handle = %handle, attempt, max_attempts, "Requesting user decryption");

            match self.attempt(&session, handle, contract, user).await {
                Ok(value) => {
                    info!(handle = %handle, attempt, "Handle decrypted");
                    return Ok(value);
                }
                Err(AttemptError::Fatal(e)) => {
                    warn!(handle = %handle, attempt, error = %e, "Decryption failed");
                    return Err(e);
                }
                Err(AttemptError::Transient(e)) if attempt >= max_attempts => {
                    warn!(
                        handle = %handle,
                        attempts = attempt,
                        error = %e,
                        "Decryption retries exhausted"
                    );
                    return Err(DecryptError::DecryptionExhausted {
                        attempts: attempt,
                        last: e,
                    });
                }
                Err(AttemptError::Transient(e)) => {
                    warn!(
                        handle = %handle,
                        attempt,
                        backoff_ms = self.policy.backoff.as_millis() as u64,
                        error = %e,
                        "Decryption permission not visible yet, retrying"
                    );
                    tokio::time::sleep(self.policy.backoff).await;
                    attempt += 1;
                }
            }
        }
    }
}
