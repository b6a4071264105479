// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Blockchain types and constants.

use std::fmt;

use alloy::primitives::{Address, B256};

/// EVM network configuration.
#[derive(Debug, Clone)]
pub struct NetworkConfig {
    /// Network name for display
    pub name: &'static str,
    /// Chain ID
    pub chain_id: u64,
    /// Default RPC endpoint URL
    pub rpc_url: &'static str,
    /// Block explorer URL
    pub explorer_url: &'static str,
    /// Average block time in seconds
    pub block_time_secs: u64,
}

/// Ethereum Sepolia testnet configuration.
pub const SEPOLIA: NetworkConfig = NetworkConfig {
    name: "Ethereum Sepolia",
    chain_id: 11_155_111,
    rpc_url: "https://ethereum-sepolia-rpc.publicnode.com",
    explorer_url: "https://sepolia.etherscan.io",
    block_time_secs: 12,
};

/// Opaque on-chain reference to an FHE ciphertext.
pub type CiphertextHandle = B256;

/// A value that is either known in the clear or only held as ciphertext.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Confidential {
    Plain(u128),
    Encrypted(CiphertextHandle),
}

impl Confidential {
    /// Interpret a handle read from the ledger.
    ///
    /// An all-zero handle is an uninitialized encrypted integer, which the
    /// coprocessor treats as zero.
    pub fn from_handle(handle: CiphertextHandle) -> Self {
        if handle.is_zero() {
            Confidential::Plain(0)
        } else {
            Confidential::Encrypted(handle)
        }
    }

    /// The plaintext, if known.
    pub fn plain(&self) -> Option<u128> {
        match self {
            Confidential::Plain(value) => Some(*value),
            Confidential::Encrypted(_) => None,
        }
    }
}

impl fmt::Display for Confidential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Confidential::Plain(value) => write!(f, "{value}"),
            Confidential::Encrypted(handle) => write!(f, "encrypted({handle})"),
        }
    }
}

/// Per-employee stream as mirrored from the payroll contract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamState {
    pub rate_per_block: Confidential,
    pub start_block: u64,
    pub cliff_block: u64,
    pub claimed_amount: Confidential,
    pub is_paused: bool,
    /// The contract drops canceled streams, so this is only set by callers
    /// that track cancellation themselves.
    pub is_canceled: bool,
    pub exists: bool,
}

impl StreamState {
    /// State returned for an employee without a stream.
    pub fn missing() -> Self {
        Self {
            rate_per_block: Confidential::Plain(0),
            start_block: 0,
            cliff_block: 0,
            claimed_amount: Confidential::Plain(0),
            is_paused: false,
            is_canceled: false,
            exists: false,
        }
    }
}

/// Reference to a submitted transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxRef {
    /// Transaction hash
    pub tx_hash: B256,
    /// Explorer URL for the transaction
    pub explorer_url: String,
}

impl TxRef {
    pub fn new(tx_hash: B256, explorer_base: &str) -> Self {
        Self {
            tx_hash,
            explorer_url: format!("{}/tx/{}", explorer_base.trim_end_matches('/'), tx_hash),
        }
    }
}

impl fmt::Display for TxRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.tx_hash)
    }
}

/// Receipt of the claimable-amount request.
#[derive(Debug, Clone)]
pub struct ClaimRequestReceipt {
    pub tx: TxRef,
    /// Handle emitted by `WithdrawalReady`, if the log was present.
    pub emitted_handle: Option<CiphertextHandle>,
}

/// A confirmed `SalaryWithdrawn` event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WithdrawalRecord {
    pub employee: Address,
    pub amount: u128,
    pub block_number: u64,
    pub tx_hash: B256,
    /// Block timestamp (unix seconds)
    pub timestamp: u64,
}
