// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Withdrawal Orchestrator
//!
//! Three strictly sequential phases:
//!
//! 1. **Requesting**: check the stream is withdrawable, then ask the ledger
//!    to snapshot the claimable amount. The receipt carries the ciphertext
//!    handle of that amount in its `WithdrawalReady` log.
//! 2. **Decrypting**: decrypt the handle through the user-decryption flow.
//! 3. **Submitting**: send the plaintext amount back to the ledger.
//!
//! A failure stops the attempt and is tagged with its phase. Nothing is
//! rolled back: a snapshot taken in phase 1 stays on the ledger, and a new
//! attempt takes a fresh one.

use std::fmt;
use std::sync::Arc;

use alloy::primitives::Address;
use tracing::{debug, error, info, info_span, Instrument};
use uuid::Uuid;

use super::accrual::{check_withdrawable, LifecycleError};
use crate::blockchain::{LedgerError, PayrollLedger, TxRef};
use crate::fhe::{DecryptError, ValueDecryptor};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WithdrawalPhase {
    Requesting,
    Decrypting,
    Submitting,
}

impl fmt::Display for WithdrawalPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WithdrawalPhase::Requesting => write!(f, "requesting"),
            WithdrawalPhase::Decrypting => write!(f, "decrypting"),
            WithdrawalPhase::Submitting => write!(f, "submitting"),
        }
    }
}

/// Progress events reported to the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WithdrawalStatus {
    Requesting,
    Decrypting,
    Submitting,
    Succeeded { amount: u128 },
    Failed { phase: WithdrawalPhase, reason: String },
}

#[derive(Debug)]
pub struct WithdrawalOutcome {
    /// Decrypted amount that was submitted (wei)
    pub amount: u128,
    /// Claimable-amount request transaction
    pub request_tx: TxRef,
    /// Final withdrawal transaction
    pub tx: TxRef,
}

#[derive(Debug, thiserror::Error)]
pub enum WithdrawalFailure {
    #[error("Stream is not withdrawable: {0}")]
    NotWithdrawable(#[from] LifecycleError),

    #[error("Claimable amount handle not found in transaction logs")]
    HandleNotFound,

    #[error("Ledger call failed: {0}")]
    LedgerCallFailed(#[from] LedgerError),

    #[error(transparent)]
    Decrypt(#[from] DecryptError),
}

#[derive(Debug, thiserror::Error)]
#[error("Withdrawal failed while {phase}: {failure}")]
pub struct WithdrawalError {
    pub phase: WithdrawalPhase,
    #[source]
    pub failure: WithdrawalFailure,
}

impl WithdrawalError {
    fn new(phase: WithdrawalPhase, failure: impl Into<WithdrawalFailure>) -> Self {
        Self {
            phase,
            failure: failure.into(),
        }
    }
}

/// Drives one withdrawal for an employee.
pub struct WithdrawalOrchestrator {
    ledger: Arc<dyn PayrollLedger>,
    decryptor: Arc<dyn ValueDecryptor>,
}

impl WithdrawalOrchestrator {
    pub fn new(ledger: Arc<dyn PayrollLedger>, decryptor: Arc<dyn ValueDecryptor>) -> Self {
        Self { ledger, decryptor }
    }

    pub async fn withdraw(&self, employee: Address) -> Result<WithdrawalOutcome, WithdrawalError> {
        self.withdraw_with_progress(employee, |_| {}).await
    }

    /// Run the withdrawal, reporting every status change to `on_status`.
    pub async fn withdraw_with_progress<F>(
        &self,
        employee: Address,
        mut on_status: F,
    ) -> Result<WithdrawalOutcome, WithdrawalError>
    where
        F: FnMut(WithdrawalStatus) + Send,
    {
        let attempt_id = Uuid::new_v4();
        let span = info_span!("withdrawal", attempt_id = %attempt_id, employee = %employee);

        async move {
            let result = self.run(employee, &mut on_status).await;
            match &result {
                Ok(outcome) => {
                    info!(tx_hash = %outcome.tx.tx_hash, "Withdrawal succeeded");
                    on_status(WithdrawalStatus::Succeeded {
                        amount: outcome.amount,
                    });
                }
                Err(e) => {
                    error!(phase = %e.phase, error = %e.failure, "Withdrawal failed");
                    on_status(WithdrawalStatus::Failed {
                        phase: e.phase,
                        reason: e.failure.to_string(),
                    });
                }
            }
            result
        }
        .instrument(span)
        .await
    }

    async fn run<F>(
        &self,
        employee: Address,
        on_status: &mut F,
    ) -> Result<WithdrawalOutcome, WithdrawalError>
    where
        F: FnMut(WithdrawalStatus) + Send,
    {
        use WithdrawalPhase::{Decrypting, Requesting, Submitting};

        on_status(WithdrawalStatus::Requesting);
        let stream = self
            .ledger
            .read_stream(employee)
            .await
            .map_err(|e| WithdrawalError::new(Requesting, e))?;
        let current_block = self
            .ledger
            .current_block_number()
            .await
            .map_err(|e| WithdrawalError::new(Requesting, e))?;
        check_withdrawable(&stream, current_block)
            .map_err(|e| WithdrawalError::new(Requesting, e))?;

        let receipt = self
            .ledger
            .request_claimable_amount(employee)
            .await
            .map_err(|e| WithdrawalError::new(Requesting, e))?;
        let handle = receipt
            .emitted_handle
            .ok_or_else(|| WithdrawalError::new(Requesting, WithdrawalFailure::HandleNotFound))?;
        debug!(handle = %handle, tx_hash = %receipt.tx.tx_hash, "Claimable amount snapshot taken");

        on_status(WithdrawalStatus::Decrypting);
        let amount = self
            .decryptor
            .decrypt(handle, self.ledger.contract_address(), employee)
            .await
            .map_err(|e| WithdrawalError::new(Decrypting, e))?;
        debug!(amount, "Claimable amount decrypted");

        on_status(WithdrawalStatus::Submitting);
        let tx = self
            .ledger
            .submit_withdrawal(employee, amount)
            .await
            .map_err(|e| WithdrawalError::new(Submitting, e))?;

        Ok(WithdrawalOutcome {
            amount,
            request_tx: receipt.tx,
            tx,
        })
    }
}
