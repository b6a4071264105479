// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Salary streams on top of the ledger and the coprocessor.
//!
//! - `accrual`: pure vesting math and lifecycle checks
//! - `withdraw`: the request / decrypt / submit withdrawal protocol
//! - `streams`: HR stream creation and administration
//! - `csv` and `bulk`: batch provisioning from an employee CSV
//! - `roles`: HR role grants by admin accounts

pub mod accrual;
pub mod bulk;
pub mod csv;
pub mod roles;
pub mod streams;
pub mod withdraw;

pub use accrual::{
    check_transition, check_withdrawable, countdown_to_cliff, estimated_claimable,
    is_withdrawable, validate_schedule, ClaimableEstimate, Countdown, LifecycleError,
    StreamAction,
};
pub use bulk::{
    provision, resolve_schedule, BulkProgress, ProvisionReport, RowFailure, RowSuccess,
    AUTO_START_OFFSET_BLOCKS,
};
pub use self::csv::{parse_employee_csv, sample_csv, BulkRow, ParsedCsv, StartBlock};
pub use roles::{RoleAdmin, RoleError};
pub use streams::{
    request_attestation, stream_summary, NewStream, StreamAdmin, StreamError, StreamSummary,
};
pub use withdraw::{
    WithdrawalError, WithdrawalFailure, WithdrawalOrchestrator, WithdrawalOutcome,
    WithdrawalPhase, WithdrawalStatus,
};
