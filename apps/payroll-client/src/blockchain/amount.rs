// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Decimal amount parsing and formatting.
//!
//! Salary amounts are entered in ETH and handled as wei in `u128`, the width
//! of the encrypted salary field. All arithmetic stays in `u128`.

/// Decimals of the native token.
pub const ETH_DECIMALS: u8 = 18;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AmountError {
    #[error("Invalid amount format")]
    InvalidFormat,

    #[error("Too many decimal places (max {0})")]
    TooManyDecimals(u8),

    #[error("Amount overflow")]
    Overflow,
}

/// Parse a human-readable amount to its smallest unit.
///
/// # Arguments
/// * `amount` - Amount as a string (e.g., "0.001")
/// * `decimals` - Number of decimals (18 for ETH)
pub fn parse_amount(amount: &str, decimals: u8) -> Result<u128, AmountError> {
    let amount = amount.trim();
    let parts: Vec<&str> = amount.split('.').collect();

    if parts.len() > 2 || amount.is_empty() || amount.starts_with(['+', '-']) {
        return Err(AmountError::InvalidFormat);
    }

    let whole = if parts[0].is_empty() {
        0
    } else {
        parts[0]
            .parse::<u128>()
            .map_err(|_| AmountError::InvalidFormat)?
    };

    let decimal_part = if parts.len() == 2 {
        let dec_str = parts[1];
        if dec_str.is_empty() && parts[0].is_empty() {
            return Err(AmountError::InvalidFormat);
        }
        if dec_str.len() > decimals as usize {
            return Err(AmountError::TooManyDecimals(decimals));
        }
        if !dec_str.chars().all(|c| c.is_ascii_digit()) {
            return Err(AmountError::InvalidFormat);
        }
        // Pad with zeros to match decimals
        let padded = format!("{:0<width$}", dec_str, width = decimals as usize);
        if padded.is_empty() {
            0
        } else {
            padded
                .parse::<u128>()
                .map_err(|_| AmountError::InvalidFormat)?
        }
    } else {
        0u128
    };

    let multiplier = 10u128
        .checked_pow(decimals as u32)
        .ok_or(AmountError::Overflow)?;
    whole
        .checked_mul(multiplier)
        .and_then(|w| w.checked_add(decimal_part))
        .ok_or(AmountError::Overflow)
}

/// Format an amount in its smallest unit as a decimal string.
pub fn format_amount(amount: u128, decimals: u8) -> String {
    if amount == 0 {
        return "0".to_string();
    }

    let divisor = 10u128.pow(decimals as u32);
    let whole = amount / divisor;
    let remainder = amount % divisor;

    if remainder == 0 {
        whole.to_string()
    } else {
        let decimal_str = format!("{:0>width$}", remainder, width = decimals as usize);
        let trimmed = decimal_str.trim_end_matches('0');
        format!("{}.{}", whole, trimmed)
    }
}
