// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # CLI Interface
//!
//! Command-line structure of the `payroll` binary, defined with `clap`
//! derive. Connection settings come from the environment (see
//! [`crate::config`]); flags only carry per-command arguments.

use std::path::PathBuf;

use alloy::primitives::Address;
use clap::{Parser, Subcommand};

use crate::blockchain::{parse_amount, ETH_DECIMALS};
use crate::payroll::StartBlock;

/// Confidential payroll client.
///
/// Streams salaries per block with rates that stay encrypted on chain.
/// Employees check and withdraw their balance; HR operators create and
/// manage streams; admins grant the HR role.
#[derive(Parser, Debug)]
#[command(name = "payroll", version, propagate_version = true)]
pub struct Cli {
    /// Log output format: `pretty` or `json`.
    #[arg(long, global = true, env = "LOG_FORMAT", default_value = "pretty")]
    pub log_format: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Show a stream, its cliff countdown and the estimated claimable amount.
    Status {
        /// Employee to inspect. Defaults to the configured account.
        #[arg(long, value_parser = parse_address)]
        employee: Option<Address>,
    },
    /// Withdraw the claimable salary of the configured account.
    Withdraw,
    /// Withdrawals confirmed on chain, most recent first.
    History {
        /// Employee to inspect. Defaults to the configured account.
        #[arg(long, value_parser = parse_address)]
        employee: Option<Address>,
    },
    /// Create a salary stream (HR).
    CreateStream(CreateStreamArgs),
    /// Create streams for every valid row of an employee CSV (HR).
    Provision(ProvisionArgs),
    /// Pause an active stream (HR).
    Pause {
        #[arg(long, value_parser = parse_address)]
        employee: Address,
    },
    /// Resume a paused stream (HR).
    Resume {
        #[arg(long, value_parser = parse_address)]
        employee: Address,
    },
    /// Cancel a stream (HR).
    Cancel {
        #[arg(long, value_parser = parse_address)]
        employee: Address,
    },
    /// List every existing stream.
    Streams,
    /// Grant the HR role to an account (admin).
    GrantHr {
        #[arg(long, value_parser = parse_address)]
        account: Address,
    },
    /// Revoke the HR role from an account (admin).
    RevokeHr {
        #[arg(long, value_parser = parse_address)]
        account: Address,
    },
    /// Ask the income oracle to attest the configured account's salary tier.
    Attest,
    /// Write a sample employee CSV.
    Template {
        /// Destination file. Prints to stdout when omitted.
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,
    },
}

/// Arguments for `create-stream`.
#[derive(Parser, Debug)]
pub struct CreateStreamArgs {
    #[arg(long, value_parser = parse_address)]
    pub employee: Address,

    /// Salary per block in ETH, e.g. `0.000001`.
    #[arg(long = "salary-per-block", value_parser = parse_eth)]
    pub rate_per_block_wei: u128,

    /// First accruing block, or `auto` for ten blocks after the current one.
    #[arg(long, default_value = "auto", value_parser = parse_start_block)]
    pub start_block: StartBlock,

    /// Blocks between the start and the first withdrawable block.
    #[arg(long, default_value_t = 0)]
    pub cliff_blocks: u64,
}

/// Arguments for `provision`.
#[derive(Parser, Debug)]
pub struct ProvisionArgs {
    /// CSV file with `address,salaryPerBlock,startBlock,cliffBlocks` columns.
    pub file: PathBuf,

    /// Validate the file without submitting anything.
    #[arg(long)]
    pub dry_run: bool,
}

fn parse_address(raw: &str) -> Result<Address, String> {
    raw.trim()
        .parse::<Address>()
        .map_err(|_| format!("invalid address: {raw}"))
}

fn parse_eth(raw: &str) -> Result<u128, String> {
    parse_amount(raw, ETH_DECIMALS).map_err(|e| e.to_string())
}

fn parse_start_block(raw: &str) -> Result<StartBlock, String> {
    let raw = raw.trim();
    if raw.is_empty() || raw.eq_ignore_ascii_case("auto") {
        return Ok(StartBlock::Auto);
    }
    raw.parse::<u64>()
        .map(StartBlock::At)
        .map_err(|_| format!("expected a block number or `auto`, got {raw}"))
}
