// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Confidential-value round trip through the FHE coprocessor.
//!
//! This module provides:
//! - `GatewaySession`: the lazily initialized, shared coprocessor session
//! - `CiphertextEncryptor`: plaintext to ciphertext handle plus proof
//! - `DecryptionClient`: signed user decryption with bounded retries
//! - The relayer HTTP implementation of the coprocessor ports

pub mod authorization;
pub mod coprocessor;
pub mod decrypt;
pub mod encrypt;
pub mod gateway;
pub mod relayer;
pub mod session;

pub use authorization::{
    AuthorizationSigner, DecryptAuthorization, DecryptionKeypair, LocalAuthorizationSigner,
    SignerError, DECRYPTION_VALIDITY_DAYS,
};
pub use coprocessor::{Coprocessor, CoprocessorError, CoprocessorRuntime};
pub use decrypt::{
    DecryptError, DecryptFailureKind, DecryptionClient, RetryPolicy, ValueDecryptor,
};
pub use encrypt::{CiphertextEncryptor, CiphertextPayload, EncryptionError};
pub use gateway::GatewayConfig;
pub use relayer::RelayerRuntime;
pub use session::{ExecutionContext, GatewaySession, InitStep, SessionError, SessionStatus};
