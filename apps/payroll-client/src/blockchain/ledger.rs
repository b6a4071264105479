// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Entry points of the payroll contract consumed by the client.
//!
//! The contract itself is an external collaborator. Everything above this
//! trait (withdrawals, stream administration, bulk provisioning) talks to the
//! ledger only through [`PayrollLedger`], so tests can substitute an
//! in-memory ledger.

use alloy::primitives::{Address, B256};
use async_trait::async_trait;

use super::types::{ClaimRequestReceipt, StreamState, TxRef, WithdrawalRecord};
use crate::fhe::CiphertextPayload;

#[async_trait]
pub trait PayrollLedger: Send + Sync {
    /// Address of the payroll contract (the encryption/decryption scope).
    fn contract_address(&self) -> Address;

    /// Read the stream held for `employee`.
    async fn read_stream(&self, employee: Address) -> Result<StreamState, LedgerError>;

    /// Whether `employee` already has an active stream.
    async fn stream_exists(&self, employee: Address) -> Result<bool, LedgerError> {
        Ok(self.read_stream(employee).await?.exists)
    }

    /// Snapshot the claimable amount for `employee` and return the receipt
    /// carrying the emitted ciphertext handle.
    async fn request_claimable_amount(
        &self,
        employee: Address,
    ) -> Result<ClaimRequestReceipt, LedgerError>;

    /// Submit the decrypted claimable amount.
    async fn submit_withdrawal(&self, employee: Address, amount: u128)
        -> Result<TxRef, LedgerError>;

    /// Create a stream whose rate is the given encrypted input.
    async fn create_stream(
        &self,
        employee: Address,
        rate: CiphertextPayload,
        start_block: u64,
        cliff_block: u64,
    ) -> Result<TxRef, LedgerError>;

    async fn pause_stream(&self, employee: Address) -> Result<TxRef, LedgerError>;

    async fn resume_stream(&self, employee: Address) -> Result<TxRef, LedgerError>;

    async fn cancel_stream(&self, employee: Address) -> Result<TxRef, LedgerError>;

    async fn current_block_number(&self) -> Result<u64, LedgerError>;

    /// Every employee the contract has registered a stream for.
    async fn list_employees(&self) -> Result<Vec<Address>, LedgerError>;

    async fn has_role(&self, role: B256, account: Address) -> Result<bool, LedgerError>;

    async fn grant_role(&self, role: B256, account: Address) -> Result<TxRef, LedgerError>;

    async fn revoke_role(&self, role: B256, account: Address) -> Result<TxRef, LedgerError>;

    /// Ask the income oracle to attest `employee`'s encrypted salary. The
    /// oracle acts on `msg.sender`, so `employee` must be the signer.
    async fn request_attestation(&self, employee: Address) -> Result<TxRef, LedgerError>;

    /// Confirmed withdrawals for `employee`, most recent first.
    async fn withdrawal_history(
        &self,
        employee: Address,
    ) -> Result<Vec<WithdrawalRecord>, LedgerError>;
}

/// Errors that can occur during ledger operations.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("Invalid RPC URL: {0}")]
    InvalidRpcUrl(String),

    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("Invalid private key: {0}")]
    InvalidPrivateKey(String),

    #[error("No signing identity configured for ledger writes")]
    MissingSigner,

    #[error("Income oracle address is not configured")]
    OracleNotConfigured,

    #[error("RPC error: {0}")]
    RpcError(String),

    #[error("Contract error: {0}")]
    ContractError(String),

    #[error("Transaction failed: {0}")]
    TransactionFailed(String),
}
