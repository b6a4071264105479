// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Bulk stream provisioning.
//!
//! Rows with validation errors are excluded up front. The remaining rows
//! are submitted one at a time, in file order, through
//! [`StreamAdmin::create_stream`]. A row failure is recorded and the batch
//! moves on. Sequential submission keeps the signer's nonces ordered and
//! lets each duplicate check observe the rows created before it.

use alloy::primitives::Address;
use tracing::{info, info_span, warn, Instrument};
use uuid::Uuid;

use super::csv::{BulkRow, StartBlock};
use super::streams::{NewStream, StreamAdmin, StreamError};
use crate::blockchain::TxRef;

/// Offset applied to `auto` start blocks.
pub const AUTO_START_OFFSET_BLOCKS: u64 = 10;

/// Resolve a row's start (`auto` is `current_block` plus the offset) and its
/// cliff block, `start + cliff_blocks`. Overflow rejects the schedule.
pub fn resolve_schedule(
    start: StartBlock,
    cliff_blocks: u64,
    current_block: u64,
) -> Result<(u64, u64), StreamError> {
    let add = |block: u64, offset: u64| {
        block
            .checked_add(offset)
            .ok_or(StreamError::ScheduleOverflow { block, offset })
    };

    let start_block = match start {
        StartBlock::Auto => add(current_block, AUTO_START_OFFSET_BLOCKS)?,
        StartBlock::At(block) => block,
    };
    Ok((start_block, add(start_block, cliff_blocks)?))
}

/// Reported after every submitted row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BulkProgress {
    pub current: usize,
    pub total: usize,
}

#[derive(Debug)]
pub struct RowSuccess {
    pub line: usize,
    pub employee: Address,
    pub tx: TxRef,
}

#[derive(Debug)]
pub struct RowFailure {
    pub line: usize,
    pub employee: Address,
    pub error: StreamError,
}

#[derive(Debug, Default)]
pub struct ProvisionReport {
    pub succeeded: Vec<RowSuccess>,
    pub failed: Vec<RowFailure>,
    /// Rows never submitted because they failed validation
    pub excluded: Vec<BulkRow>,
}

impl ProvisionReport {
    pub fn succeeded_employees(&self) -> Vec<Address> {
        self.succeeded.iter().map(|row| row.employee).collect()
    }
}

/// Create one stream per valid row.
///
/// Fails only if the starting block number cannot be read; per-row failures
/// land in the report.
pub async fn provision<F>(
    admin: &StreamAdmin,
    rows: Vec<BulkRow>,
    mut on_progress: F,
) -> Result<ProvisionReport, StreamError>
where
    F: FnMut(BulkProgress) + Send,
{
    let batch_id = Uuid::new_v4();
    let span = info_span!("provision", batch_id = %batch_id);

    async move {
        let mut report = ProvisionReport::default();
        let mut pending = Vec::with_capacity(rows.len());
        for row in rows {
            match row.employee {
                Some(employee) if row.validation_errors.is_empty() => pending.push((employee, row)),
                _ => {
                    warn!(line = row.line, errors = ?row.validation_errors, "Row excluded");
                    report.excluded.push(row);
                }
            }
        }

        let total = pending.len();
        if total == 0 {
            info!(excluded = report.excluded.len(), "Nothing to provision");
            return Ok(report);
        }

        let current_block = admin.ledger().current_block_number().await?;
        info!(rows = total, current_block, "Provisioning streams");

        for (index, (employee, row)) in pending.into_iter().enumerate() {
            let schedule = resolve_schedule(row.start_block, row.cliff_blocks, current_block);
            let created = match schedule {
                Ok((start_block, cliff_block)) => {
                    let stream = NewStream {
                        employee,
                        rate_per_block_wei: row.rate_per_block_wei,
                        start_block,
                        cliff_block,
                    };
                    admin.create_stream(&stream).await
                }
                Err(e) => Err(e),
            };

            match created {
                Ok(tx) => report.succeeded.push(RowSuccess {
                    line: row.line,
                    employee,
                    tx,
                }),
                Err(error) => {
                    warn!(line = row.line, employee = %employee, error = %error, "Row failed");
                    report.failed.push(RowFailure {
                        line: row.line,
                        employee,
                        error,
                    });
                }
            }

            on_progress(BulkProgress {
                current: index + 1,
                total,
            });
        }

        info!(
            succeeded = report.succeeded.len(),
            failed = report.failed.len(),
            excluded = report.excluded.len(),
            "Provisioning finished"
        );
        Ok(report)
    }
    .instrument(span)
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payroll::csv::parse_employee_csv;
    use crate::test_support::{encryptor, FakeRuntime, InMemoryLedger, HR};
    use std::sync::Arc;

    fn admin(ledger: Arc<InMemoryLedger>) -> StreamAdmin {
        StreamAdmin::new(ledger, encryptor(Arc::new(FakeRuntime::new())), HR)
    }

    fn addr(byte: u8) -> Address {
        Address::repeat_byte(byte)
    }

    #[tokio::test]
    async fn row_failures_are_isolated() {
        let csv = format!(
            "address,salaryPerBlock,startBlock,cliffBlocks
{},0.001,auto,100
{},0.002,2000,50
not-an-address,0.001,auto,100
{},0.003,auto,10
{},0.004,3000,0
",
            addr(1),
            addr(2),
            addr(4),
            addr(5)
        );
        let parsed = parse_employee_csv(&csv);

        let ledger = Arc::new(InMemoryLedger::new());
        ledger.set_block(1_000);
        ledger.fail_create_for(addr(4));
        let admin = admin(ledger.clone());

        let mut ticks = Vec::new();
        let report = provision(&admin, parsed.rows, |p| ticks.push(p))
            .await
            .unwrap();

        assert_eq!(report.succeeded_employees(), vec![addr(1), addr(2), addr(5)]);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].employee, addr(4));
        assert_eq!(report.failed[0].line, 5);
        assert!(matches!(report.failed[0].error, StreamError::LedgerCallFailed(_)));
        assert_eq!(report.excluded.len(), 1);
        assert_eq!(report.excluded[0].line, 4);

        let creates: Vec<String> = ledger
            .journal()
            .into_iter()
            .filter(|entry| entry.starts_with("create:"))
            .collect();
        assert_eq!(
            creates,
            [1u8, 2, 4, 5]
                .iter()
                .map(|b| format!("create:{}", addr(*b)))
                .collect::<Vec<_>>()
        );

        assert_eq!(
            ticks,
            (1..=4)
                .map(|current| BulkProgress { current, total: 4 })
                .collect::<Vec<_>>()
        );
    }

    #[tokio::test]
    async fn auto_start_uses_offset_from_current_block() {
        let csv = format!(
            "address,salaryPerBlock,startBlock,cliffBlocks\n{},0.001,auto,100\n",
            addr(1)
        );
        let ledger = Arc::new(InMemoryLedger::new());
        ledger.set_block(5_000);

        provision(&admin(ledger.clone()), parse_employee_csv(&csv).rows, |_| {})
            .await
            .unwrap();

        let stream = ledger.stream(addr(1)).unwrap();
        assert_eq!(stream.start_block, 5_010);
        assert_eq!(stream.cliff_block, 5_110);
    }

    #[tokio::test]
    async fn duplicate_within_batch_is_caught() {
        let csv = format!(
            "address,salaryPerBlock,startBlock,cliffBlocks\n{0},0.001,auto,1\n{0},0.002,auto,1\n",
            addr(7)
        );
        let ledger = Arc::new(InMemoryLedger::new());

        let report = provision(&admin(ledger.clone()), parse_employee_csv(&csv).rows, |_| {})
            .await
            .unwrap();

        assert_eq!(report.succeeded.len(), 1);
        assert_eq!(report.failed[0].line, 3);
        assert!(matches!(
            report.failed[0].error,
            StreamError::DuplicateStream(a) if a == addr(7)
        ));
    }

    #[test]
    fn schedule_overflow_is_rejected() {
        assert_eq!(resolve_schedule(StartBlock::At(500), 100, 1_000).unwrap(), (500, 600));
        assert!(matches!(
            resolve_schedule(StartBlock::At(u64::MAX - 1), 100, 1_000),
            Err(StreamError::ScheduleOverflow { offset: 100, .. })
        ));
        assert!(matches!(
            resolve_schedule(StartBlock::Auto, 0, u64::MAX - 5),
            Err(StreamError::ScheduleOverflow { offset: AUTO_START_OFFSET_BLOCKS, .. })
        ));
    }

    #[tokio::test]
    async fn overflowing_row_fails_without_ledger_write() {
        let csv = format!(
            "address,salaryPerBlock,startBlock,cliffBlocks\n{},0.001,{},100\n{},0.001,auto,1\n",
            addr(1),
            u64::MAX - 1,
            addr(2)
        );
        let ledger = Arc::new(InMemoryLedger::new());

        let report = provision(&admin(ledger.clone()), parse_employee_csv(&csv).rows, |_| {})
            .await
            .unwrap();

        assert_eq!(report.succeeded_employees(), vec![addr(2)]);
        assert_eq!(report.failed[0].line, 2);
        assert!(matches!(report.failed[0].error, StreamError::ScheduleOverflow { .. }));
        assert!(ledger.stream(addr(1)).is_none());
    }

    #[tokio::test]
    async fn all_invalid_rows_skip_the_ledger() {
        let csv = "address,salaryPerBlock,startBlock,cliffBlocks\nbad,1,auto,1\n";
        let ledger = Arc::new(InMemoryLedger::new());

        let report = provision(&admin(ledger.clone()), parse_employee_csv(csv).rows, |_| {})
            .await
            .unwrap();

        assert_eq!(report.excluded.len(), 1);
        assert!(ledger.journal().is_empty());
    }
}
