// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Stream accrual and lifecycle rules.
//!
//! Pure functions over [`StreamState`]. Block numbers, block times and
//! durations are `u64` throughout; amounts are `u128` wei. Values only held
//! as ciphertext are never treated as zero: the estimate reports
//! [`ClaimableEstimate::Confidential`] instead.

use std::fmt;

use chrono::{DateTime, Duration as ChronoDuration, Utc};

use crate::blockchain::StreamState;

const SECONDS_PER_MINUTE: u64 = 60;
const SECONDS_PER_HOUR: u64 = 60 * SECONDS_PER_MINUTE;
const SECONDS_PER_DAY: u64 = 24 * SECONDS_PER_HOUR;

/// Whether the employee may start a withdrawal at `current_block`.
pub fn is_withdrawable(stream: &StreamState, current_block: u64) -> bool {
    stream.exists && !stream.is_paused && !stream.is_canceled && current_block >= stream.cliff_block
}

/// Client-side estimate of the claimable amount.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClaimableEstimate {
    /// Computed from plaintext inputs (wei).
    Known(u128),
    /// Depends on ciphertext; only the ledger can compute it.
    Confidential,
}

impl fmt::Display for ClaimableEstimate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClaimableEstimate::Known(wei) => write!(f, "{wei} wei"),
            ClaimableEstimate::Confidential => write!(f, "encrypted"),
        }
    }
}

/// `rate * (current - start) - claimed`, floored at zero, or zero before the
/// cliff.
pub fn estimated_claimable(stream: &StreamState, current_block: u64) -> ClaimableEstimate {
    if current_block < stream.cliff_block {
        return ClaimableEstimate::Known(0);
    }

    let (Some(rate), Some(claimed)) = (
        stream.rate_per_block.plain(),
        stream.claimed_amount.plain(),
    ) else {
        return ClaimableEstimate::Confidential;
    };

    let elapsed = u128::from(current_block.saturating_sub(stream.start_block));
    let accrued = rate.saturating_mul(elapsed);
    ClaimableEstimate::Known(accrued.saturating_sub(claimed))
}

/// Time left until the cliff.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Countdown {
    pub days: u64,
    pub hours: u64,
    pub minutes: u64,
    pub seconds: u64,
    pub total_seconds: u64,
    pub reached: bool,
}

impl Countdown {
    fn from_seconds(total_seconds: u64) -> Self {
        Self {
            days: total_seconds / SECONDS_PER_DAY,
            hours: (total_seconds % SECONDS_PER_DAY) / SECONDS_PER_HOUR,
            minutes: (total_seconds % SECONDS_PER_HOUR) / SECONDS_PER_MINUTE,
            seconds: total_seconds % SECONDS_PER_MINUTE,
            total_seconds,
            reached: total_seconds == 0,
        }
    }

    /// Wall-clock estimate of when the cliff is reached, counted from `now`.
    pub fn estimated_at(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        let secs = i64::try_from(self.total_seconds).unwrap_or(i64::MAX);
        ChronoDuration::try_seconds(secs)
            .and_then(|d| now.checked_add_signed(d))
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }
}

impl fmt::Display for Countdown {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.reached {
            return write!(f, "Ready to withdraw!");
        }

        let mut parts = Vec::with_capacity(4);
        if self.days > 0 {
            parts.push(format!("{}d", self.days));
        }
        if self.days > 0 || self.hours > 0 {
            parts.push(format!("{}h", self.hours));
        }
        if self.days > 0 || self.hours > 0 || self.minutes > 0 {
            parts.push(format!("{}m", self.minutes));
        }
        // seconds only under one hour
        if self.days == 0 && self.hours == 0 {
            parts.push(format!("{}s", self.seconds));
        }

        write!(f, "{}", parts.join(" "))
    }
}

/// Remaining blocks to the cliff converted to a duration.
pub fn countdown_to_cliff(current_block: u64, cliff_block: u64, block_time_secs: u64) -> Countdown {
    let remaining_blocks = cliff_block.saturating_sub(current_block);
    Countdown::from_seconds(remaining_blocks.saturating_mul(block_time_secs))
}

/// Administrative transitions on an existing stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamAction {
    Pause,
    Resume,
    Cancel,
}

impl fmt::Display for StreamAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StreamAction::Pause => write!(f, "pause"),
            StreamAction::Resume => write!(f, "resume"),
            StreamAction::Cancel => write!(f, "cancel"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LifecycleError {
    #[error("No stream exists for this employee")]
    NoStream,

    #[error("Stream was canceled")]
    Canceled,

    #[error("Stream is already paused")]
    AlreadyPaused,

    #[error("Stream is not paused")]
    NotPaused,

    #[error("Stream is paused")]
    Paused,

    #[error("Cliff not reached: block {current_block} < cliff {cliff_block}")]
    BeforeCliff { current_block: u64, cliff_block: u64 },

    #[error("Cliff block {cliff_block} precedes start block {start_block}")]
    CliffBeforeStart { start_block: u64, cliff_block: u64 },
}

/// Check that `action` is allowed on `stream`.
pub fn check_transition(stream: &StreamState, action: StreamAction) -> Result<(), LifecycleError> {
    if !stream.exists {
        return Err(LifecycleError::NoStream);
    }
    if stream.is_canceled {
        return Err(LifecycleError::Canceled);
    }

    match action {
        StreamAction::Pause if stream.is_paused => Err(LifecycleError::AlreadyPaused),
        StreamAction::Resume if !stream.is_paused => Err(LifecycleError::NotPaused),
        _ => Ok(()),
    }
}

/// Check that a withdrawal may start; the reason if it may not.
pub fn check_withdrawable(stream: &StreamState, current_block: u64) -> Result<(), LifecycleError> {
    if !stream.exists {
        return Err(LifecycleError::NoStream);
    }
    if stream.is_canceled {
        return Err(LifecycleError::Canceled);
    }
    if stream.is_paused {
        return Err(LifecycleError::Paused);
    }
    if current_block < stream.cliff_block {
        return Err(LifecycleError::BeforeCliff {
            current_block,
            cliff_block: stream.cliff_block,
        });
    }
    Ok(())
}

/// A new stream's cliff may not precede its start.
pub fn validate_schedule(start_block: u64, cliff_block: u64) -> Result<(), LifecycleError> {
    if cliff_block < start_block {
        return Err(LifecycleError::CliffBeforeStart {
            start_block,
            cliff_block,
        });
    }
    Ok(())
}
