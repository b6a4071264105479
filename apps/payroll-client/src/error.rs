// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Top-level error for the `payroll` binary.

use crate::blockchain::{AmountError, LedgerError};
use crate::config::ConfigError;
use crate::fhe::CoprocessorError;
use crate::payroll::{RoleError, StreamError, WithdrawalError, WithdrawalFailure};

#[derive(Debug, thiserror::Error)]
pub enum PayrollError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Ledger call failed: {0}")]
    Ledger(#[from] LedgerError),

    #[error(transparent)]
    Stream(#[from] StreamError),

    #[error(transparent)]
    Role(#[from] RoleError),

    #[error(transparent)]
    Withdrawal(#[from] WithdrawalError),

    #[error("Coprocessor setup failed: {0}")]
    Coprocessor(#[from] CoprocessorError),

    #[error("Invalid amount: {0}")]
    Amount(#[from] AmountError),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("CSV rejected: {}", .0.join("; "))]
    InvalidCsv(Vec<String>),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl PayrollError {
    /// Message for the terminal. Decryption failures use their user-facing
    /// wording; everything else uses the error text.
    pub fn user_message(&self) -> String {
        match self {
            PayrollError::Withdrawal(WithdrawalError {
                failure: WithdrawalFailure::Decrypt(e),
                ..
            }) => e.user_message(),
            other => other.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fhe::DecryptError;
    use crate::payroll::WithdrawalPhase;

    #[test]
    fn decrypt_failures_use_user_wording() {
        let err = PayrollError::from(WithdrawalError {
            phase: WithdrawalPhase::Decrypting,
            failure: WithdrawalFailure::Decrypt(DecryptError::SignatureRejected),
        });
        assert!(err.user_message().contains("declined"));
    }

    #[test]
    fn csv_errors_are_joined() {
        let err = PayrollError::InvalidCsv(vec!["a".into(), "b".into()]);
        assert_eq!(err.to_string(), "CSV rejected: a; b");
    }
}
