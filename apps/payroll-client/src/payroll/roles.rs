// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! HR role administration.
//!
//! Holders of the contract's default admin role grant and revoke the HR role
//! that gates stream creation and lifecycle changes.

use std::sync::Arc;

use alloy::primitives::Address;
use tracing::{info, warn};

use crate::blockchain::contract::{hr_role, DEFAULT_ADMIN_ROLE};
use crate::blockchain::{LedgerError, PayrollLedger, TxRef};

#[derive(Debug, thiserror::Error)]
pub enum RoleError {
    #[error("{0} does not hold the admin role")]
    MissingAdminRole(Address),

    #[error("{0} already holds the HR role")]
    AlreadyHr(Address),

    #[error("{0} does not hold the HR role")]
    NotHr(Address),

    #[error("Ledger call failed: {0}")]
    LedgerCallFailed(#[from] LedgerError),
}

/// HR role management on behalf of an admin account.
pub struct RoleAdmin {
    ledger: Arc<dyn PayrollLedger>,
    admin: Address,
}

impl RoleAdmin {
    pub fn new(ledger: Arc<dyn PayrollLedger>, admin: Address) -> Self {
        Self { ledger, admin }
    }

    /// Fail unless the acting account holds the default admin role.
    pub async fn ensure_admin_role(&self) -> Result<(), RoleError> {
        if self.ledger.has_role(DEFAULT_ADMIN_ROLE, self.admin).await? {
            Ok(())
        } else {
            Err(RoleError::MissingAdminRole(self.admin))
        }
    }

    pub async fn is_hr(&self, account: Address) -> Result<bool, RoleError> {
        Ok(self.ledger.has_role(hr_role(), account).await?)
    }

    pub async fn grant_hr(&self, account: Address) -> Result<TxRef, RoleError> {
        self.ensure_admin_role().await?;
        if self.is_hr(account).await? {
            warn!(account = %account, "HR role already granted");
            return Err(RoleError::AlreadyHr(account));
        }

        let tx = self.ledger.grant_role(hr_role(), account).await?;
        info!(account = %account, tx_hash = %tx.tx_hash, "HR role granted");
        Ok(tx)
    }

    pub async fn revoke_hr(&self, account: Address) -> Result<TxRef, RoleError> {
        self.ensure_admin_role().await?;
        if !self.is_hr(account).await? {
            return Err(RoleError::NotHr(account));
        }

        let tx = self.ledger.revoke_role(hr_role(), account).await?;
        info!(account = %account, tx_hash = %tx.tx_hash, "HR role revoked");
        Ok(tx)
    }
}
