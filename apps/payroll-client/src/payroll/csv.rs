// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Employee CSV parsing for bulk stream provisioning.
//!
//! Columns: `address,salaryPerBlock,startBlock,cliffBlocks`.
//! - `salaryPerBlock` is a decimal ETH amount, stored as wei
//! - `startBlock` is a block number, or empty / `auto` for "current + offset"
//! - `cliffBlocks` is the cliff length in blocks after the start
//!
//! Rows are numbered by file line; the header is line 1.

use std::fmt;

use alloy::primitives::Address;
use csv::{ReaderBuilder, Trim};

use crate::blockchain::{parse_amount, ETH_DECIMALS};

const REQUIRED_COLUMNS: [&str; 4] = ["address", "salaryPerBlock", "startBlock", "cliffBlocks"];

/// Start block of a row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartBlock {
    /// Resolved to the current block plus a fixed offset at submission time.
    Auto,
    At(u64),
}

/// One parsed data line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BulkRow {
    /// 1-based file line
    pub line: usize,
    /// Address as written in the file
    pub address: String,
    pub employee: Option<Address>,
    pub rate_per_block_wei: u128,
    pub start_block: StartBlock,
    pub cliff_blocks: u64,
    pub validation_errors: Vec<String>,
}

impl BulkRow {
    pub fn is_valid(&self) -> bool {
        self.validation_errors.is_empty() && self.employee.is_some()
    }
}

impl fmt::Display for BulkRow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {} ({})", self.line, self.address)
    }
}

/// Parse result: rows (valid or not) plus file-level errors.
#[derive(Debug, Default)]
pub struct ParsedCsv {
    pub rows: Vec<BulkRow>,
    pub errors: Vec<String>,
}

impl ParsedCsv {
    pub fn valid_rows(&self) -> impl Iterator<Item = &BulkRow> {
        self.rows.iter().filter(|row| row.is_valid())
    }
}

/// Parse CSV content with a header line.
///
/// A leading byte-order mark is ignored and quoted fields may contain
/// commas. Lines whose fields are all empty are skipped.
pub fn parse_employee_csv(content: &str) -> ParsedCsv {
    let mut parsed = ParsedCsv::default();
    let content = content.strip_prefix('\u{feff}').unwrap_or(content);

    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(content.as_bytes());

    let headers = match reader.headers() {
        Ok(headers) => headers.clone(),
        Err(e) => {
            parsed.errors.push(format!("Malformed CSV header: {e}"));
            return parsed;
        }
    };
    if headers.iter().all(str::is_empty) {
        parsed.errors.push("CSV file is empty".to_string());
        return parsed;
    }

    let missing: Vec<&str> = REQUIRED_COLUMNS
        .iter()
        .copied()
        .filter(|column| !headers.iter().any(|h| h == *column))
        .collect();
    if !missing.is_empty() {
        parsed
            .errors
            .push(format!("Missing required columns: {}", missing.join(", ")));
        return parsed;
    }

    let column = |name: &str| headers.iter().position(|h| h == name);
    let (Some(address_at), Some(salary_at), Some(start_at), Some(cliff_at)) = (
        column("address"),
        column("salaryPerBlock"),
        column("startBlock"),
        column("cliffBlocks"),
    ) else {
        return parsed;
    };

    for result in reader.records() {
        let record = match result {
            Ok(record) => record,
            Err(e) => {
                parsed.errors.push(format!("Malformed CSV: {e}"));
                continue;
            }
        };
        if record.iter().all(str::is_empty) {
            continue;
        }

        let line = record
            .position()
            .and_then(|p| usize::try_from(p.line()).ok())
            .unwrap_or_default();
        let field = |at: usize| record.get(at).unwrap_or("");
        parsed.rows.push(parse_row(
            line,
            field(address_at),
            field(salary_at),
            field(start_at),
            field(cliff_at),
        ));
    }

    parsed
}

fn parse_row(line: usize, address: &str, salary: &str, start: &str, cliff: &str) -> BulkRow {
    let mut errors = Vec::new();

    let employee = parse_address(address);
    if employee.is_none() {
        errors.push(format!("Row {line}: Invalid Ethereum address"));
    }

    let rate_per_block_wei = match parse_amount(salary, ETH_DECIMALS) {
        Ok(wei) if wei > 0 => wei,
        _ => {
            errors.push(format!("Row {line}: Invalid salary amount"));
            0
        }
    };

    let start_block = if start.is_empty() || start.eq_ignore_ascii_case("auto") {
        StartBlock::Auto
    } else {
        match start.parse::<u64>() {
            Ok(block) => StartBlock::At(block),
            Err(_) => {
                errors.push(format!("Row {line}: Invalid start block"));
                StartBlock::Auto
            }
        }
    };

    let cliff_blocks = match cliff.parse::<u64>() {
        Ok(blocks) => blocks,
        Err(_) => {
            errors.push(format!("Row {line}: Invalid cliff period"));
            0
        }
    };

    BulkRow {
        line,
        address: address.to_string(),
        employee,
        rate_per_block_wei,
        start_block,
        cliff_blocks,
        validation_errors: errors,
    }
}

/// `0x` followed by 40 hex digits, any case.
fn parse_address(raw: &str) -> Option<Address> {
    let hex = raw.strip_prefix("0x")?;
    if hex.len() != 40 || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }
    raw.parse().ok()
}

/// Template offered to HR for bulk uploads.
pub fn sample_csv() -> &'static str {
    "address,salaryPerBlock,startBlock,cliffBlocks
0x742d35Cc6634C0532925a3b844Bc9e7595f0bEb0,0.001,auto,100
0x5aeda56215b167893e80b4fe645ba6d5bab767de,0.002,1000,200
0x1234567890123456789012345678901234567890,0.0015,auto,150
"
}
