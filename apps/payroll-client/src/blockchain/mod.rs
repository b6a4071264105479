// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Ledger integration for the encrypted payroll contract.
//!
//! This module provides:
//! - The `PayrollLedger` port and its alloy-backed implementation
//! - Contract bindings and role constants
//! - Signer construction and wei amount helpers

pub mod amount;
pub mod client;
pub mod contract;
pub mod ledger;
pub mod signing;
pub mod types;

pub use amount::{format_amount, parse_amount, AmountError, ETH_DECIMALS};
pub use client::PayrollContract;
pub use ledger::{LedgerError, PayrollLedger};
pub use types::*;
