// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! HR-side stream administration.
//!
//! Creation encrypts the per-block rate for the (payroll contract, HR
//! signer) pair and submits it with its proof. Pause, resume and cancel are
//! checked against the current stream state before the ledger write.

use std::sync::Arc;

use alloy::primitives::Address;
use tracing::{debug, info, warn};

use super::accrual::{
    check_transition, countdown_to_cliff, estimated_claimable, is_withdrawable, validate_schedule,
    ClaimableEstimate, Countdown, LifecycleError, StreamAction,
};
use crate::blockchain::contract::hr_role;
use crate::blockchain::{LedgerError, PayrollLedger, StreamState, TxRef};
use crate::fhe::{CiphertextEncryptor, EncryptionError};

/// Parameters of a stream to create.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewStream {
    pub employee: Address,
    pub rate_per_block_wei: u128,
    pub start_block: u64,
    pub cliff_block: u64,
}

#[derive(Debug, thiserror::Error)]
pub enum StreamError {
    #[error("Stream already exists for {0}")]
    DuplicateStream(Address),

    #[error("Salary per block must be greater than zero")]
    ZeroRate,

    #[error("Block {block} + {offset} overflows the block range")]
    ScheduleOverflow { block: u64, offset: u64 },

    #[error("{0} does not hold the HR role")]
    MissingRole(Address),

    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),

    #[error(transparent)]
    Encryption(#[from] EncryptionError),

    #[error("Ledger call failed: {0}")]
    LedgerCallFailed(#[from] LedgerError),
}

/// Employee-facing view of a stream at the current block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamSummary {
    pub employee: Address,
    pub stream: StreamState,
    pub current_block: u64,
    pub withdrawable: bool,
    pub claimable: ClaimableEstimate,
    pub countdown: Countdown,
}

/// Read `employee`'s stream and evaluate it at the current block.
pub async fn stream_summary(
    ledger: &dyn PayrollLedger,
    employee: Address,
    block_time_secs: u64,
) -> Result<StreamSummary, LedgerError> {
    let stream = ledger.read_stream(employee).await?;
    let current_block = ledger.current_block_number().await?;

    Ok(StreamSummary {
        employee,
        withdrawable: is_withdrawable(&stream, current_block),
        claimable: estimated_claimable(&stream, current_block),
        countdown: countdown_to_cliff(current_block, stream.cliff_block, block_time_secs),
        stream,
        current_block,
    })
}

/// Ask the income oracle to attest `employee`'s salary tier.
///
/// The oracle compares the encrypted rate against its tiers, so the employee
/// needs an existing stream.
pub async fn request_attestation(
    ledger: &dyn PayrollLedger,
    employee: Address,
) -> Result<TxRef, StreamError> {
    if !ledger.stream_exists(employee).await? {
        return Err(LifecycleError::NoStream.into());
    }

    let tx = ledger.request_attestation(employee).await?;
    info!(employee = %employee, tx_hash = %tx.tx_hash, "Income attestation requested");
    Ok(tx)
}

/// Stream management on behalf of an HR account.
pub struct StreamAdmin {
    ledger: Arc<dyn PayrollLedger>,
    encryptor: CiphertextEncryptor,
    hr: Address,
}

impl StreamAdmin {
    pub fn new(
        ledger: Arc<dyn PayrollLedger>,
        encryptor: CiphertextEncryptor,
        hr: Address,
    ) -> Self {
        Self {
            ledger,
            encryptor,
            hr,
        }
    }

    pub fn ledger(&self) -> &Arc<dyn PayrollLedger> {
        &self.ledger
    }

    /// Fail unless the acting account holds the HR role.
    pub async fn ensure_hr_role(&self) -> Result<(), StreamError> {
        if self.ledger.has_role(hr_role(), self.hr).await? {
            Ok(())
        } else {
            Err(StreamError::MissingRole(self.hr))
        }
    }

    /// Encrypt the rate and create the stream.
    ///
    /// The duplicate check reads ledger state and is not atomic with the
    /// write; a concurrent creator can still race it.
    pub async fn create_stream(&self, stream: &NewStream) -> Result<TxRef, StreamError> {
        if stream.rate_per_block_wei == 0 {
            return Err(StreamError::ZeroRate);
        }
        validate_schedule(stream.start_block, stream.cliff_block)?;

        if self.ledger.stream_exists(stream.employee).await? {
            warn!(employee = %stream.employee, "Stream already exists, skipping creation");
            return Err(StreamError::DuplicateStream(stream.employee));
        }

        let contract = self.ledger.contract_address();
        debug!(
            employee = %stream.employee,
            rate_per_block_wei = stream.rate_per_block_wei,
            "Encrypting salary rate"
        );
        let payload = self
            .encryptor
            .encrypt(stream.rate_per_block_wei, contract, self.hr)
            .await?;

        let tx = self
            .ledger
            .create_stream(
                stream.employee,
                payload,
                stream.start_block,
                stream.cliff_block,
            )
            .await?;

        info!(
            employee = %stream.employee,
            start_block = stream.start_block,
            cliff_block = stream.cliff_block,
            tx_hash = %tx.tx_hash,
            "Stream created"
        );
        Ok(tx)
    }

    pub async fn pause(&self, employee: Address) -> Result<TxRef, StreamError> {
        self.transition(employee, StreamAction::Pause).await
    }

    pub async fn resume(&self, employee: Address) -> Result<TxRef, StreamError> {
        self.transition(employee, StreamAction::Resume).await
    }

    pub async fn cancel(&self, employee: Address) -> Result<TxRef, StreamError> {
        self.transition(employee, StreamAction::Cancel).await
    }

    async fn transition(
        &self,
        employee: Address,
        action: StreamAction,
    ) -> Result<TxRef, StreamError> {
        let stream = self.ledger.read_stream(employee).await?;
        check_transition(&stream, action)?;

        let tx = match action {
            StreamAction::Pause => self.ledger.pause_stream(employee).await?,
            StreamAction::Resume => self.ledger.resume_stream(employee).await?,
            StreamAction::Cancel => self.ledger.cancel_stream(employee).await?,
        };

        info!(
            employee = %employee,
            action = %action,
            tx_hash = %tx.tx_hash,
            "Stream updated"
        );
        Ok(tx)
    }

    /// Every existing stream, in registration order. Entries that cannot be
    /// read are logged and skipped.
    pub async fn list_streams(&self) -> Result<Vec<(Address, StreamState)>, StreamError> {
        let employees = self.ledger.list_employees().await?;
        let mut streams = Vec::with_capacity(employees.len());

        for employee in employees {
            match self.ledger.read_stream(employee).await {
                Ok(stream) if stream.exists => streams.push((employee, stream)),
                Ok(_) => debug!(employee = %employee, "Stream no longer exists"),
                Err(e) => warn!(employee = %employee, error = %e, "Failed to read stream"),
            }
        }

        Ok(streams)
    }
}
