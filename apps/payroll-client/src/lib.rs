// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Confidential Payroll - Encrypted Salary Streaming Client
//!
//! Client for per-block salary streams whose rates are held on chain as FHE
//! ciphertext. Employees read their stream and withdraw through a signed
//! user decryption; HR operators create and manage streams, one at a time
//! or from a CSV.
//!
//! ## Modules
//!
//! - `blockchain` - Payroll contract bindings and the ledger port
//! - `fhe` - Coprocessor session, encryption and authenticated decryption
//! - `payroll` - Accrual math, withdrawals, stream administration, bulk provisioning
//! - `cli` / `commands` - The `payroll` binary's commands

pub mod blockchain;
pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod fhe;
pub mod logging;
pub mod payroll;
pub mod state;

#[cfg(test)]
pub(crate) mod test_support;
