// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Command handlers for the `payroll` binary.
//!
//! Handlers return the text for stdout. Progress goes to stderr so results
//! can be piped.

use std::fmt::Write as _;
use std::path::Path;

use alloy::primitives::Address;
use chrono::{DateTime, Utc};
use tracing::info;

use crate::blockchain::{format_amount, Confidential, StreamState, ETH_DECIMALS};
use crate::cli::{Command, CreateStreamArgs, ProvisionArgs};
use crate::error::PayrollError;
use crate::payroll::{
    parse_employee_csv, provision, request_attestation, resolve_schedule, sample_csv,
    stream_summary, BulkProgress, NewStream, ParsedCsv, ProvisionReport, StartBlock,
    StreamSummary, WithdrawalStatus,
};
use crate::state::AppContext;

/// Run `command` against `ctx`.
///
/// `template` needs no connection and is handled by [`write_template`].
pub async fn execute(ctx: &AppContext, command: Command) -> Result<String, PayrollError> {
    match command {
        Command::Status { employee } => {
            let employee = employee_or_account(ctx, employee)?;
            let summary =
                stream_summary(ctx.ledger.as_ref(), employee, ctx.network.block_time_secs).await?;
            Ok(render_summary(&summary, Utc::now()))
        }
        Command::Withdraw => withdraw(ctx).await,
        Command::History { employee } => {
            let employee = employee_or_account(ctx, employee)?;
            history(ctx, employee).await
        }
        Command::CreateStream(args) => create_stream(ctx, args).await,
        Command::Provision(args) => provision_file(ctx, args).await,
        Command::Pause { employee } => {
            let admin = ctx.stream_admin()?;
            admin.ensure_hr_role().await?;
            let tx = admin.pause(employee).await?;
            Ok(format!("Paused stream for {employee}\n{}\n", tx.explorer_url))
        }
        Command::Resume { employee } => {
            let admin = ctx.stream_admin()?;
            admin.ensure_hr_role().await?;
            let tx = admin.resume(employee).await?;
            Ok(format!("Resumed stream for {employee}\n{}\n", tx.explorer_url))
        }
        Command::Cancel { employee } => {
            let admin = ctx.stream_admin()?;
            admin.ensure_hr_role().await?;
            let tx = admin.cancel(employee).await?;
            Ok(format!("Canceled stream for {employee}\n{}\n", tx.explorer_url))
        }
        Command::Streams => {
            let streams = ctx.stream_admin()?.list_streams().await?;
            Ok(render_streams(&streams))
        }
        Command::GrantHr { account } => {
            let tx = ctx.role_admin()?.grant_hr(account).await?;
            Ok(format!("Granted HR role to {account}\n{}\n", tx.explorer_url))
        }
        Command::RevokeHr { account } => {
            let tx = ctx.role_admin()?.revoke_hr(account).await?;
            Ok(format!("Revoked HR role from {account}\n{}\n", tx.explorer_url))
        }
        Command::Attest => {
            let employee = ctx.account()?;
            let tx = request_attestation(ctx.ledger.as_ref(), employee).await?;
            Ok(format!(
                "Requested income attestation for {employee}\n{}\n",
                tx.explorer_url
            ))
        }
        Command::Template { output } => write_template(output.as_deref()),
    }
}

/// Write the sample CSV to `output`, or return it when no path is given.
pub fn write_template(output: Option<&Path>) -> Result<String, PayrollError> {
    match output {
        Some(path) => {
            std::fs::write(path, sample_csv())?;
            Ok(format!("Template written to {}\n", path.display()))
        }
        None => Ok(sample_csv().to_string()),
    }
}

/// Read and parse an employee CSV. File-level problems reject the whole file.
pub fn read_employee_csv(path: &Path) -> Result<ParsedCsv, PayrollError> {
    let content = std::fs::read_to_string(path)?;
    let parsed = parse_employee_csv(&content);
    if !parsed.errors.is_empty() {
        return Err(PayrollError::InvalidCsv(parsed.errors));
    }
    Ok(parsed)
}

fn employee_or_account(
    ctx: &AppContext,
    employee: Option<Address>,
) -> Result<Address, PayrollError> {
    match employee {
        Some(employee) => Ok(employee),
        None => ctx.account(),
    }
}

async fn withdraw(ctx: &AppContext) -> Result<String, PayrollError> {
    let employee = ctx.account()?;
    let orchestrator = ctx.withdrawal_orchestrator()?;

    let outcome = orchestrator
        .withdraw_with_progress(employee, |status| match status {
            WithdrawalStatus::Requesting => eprintln!("Requesting claimable amount..."),
            WithdrawalStatus::Decrypting => eprintln!("Decrypting claimable amount..."),
            WithdrawalStatus::Submitting => eprintln!("Submitting withdrawal..."),
            WithdrawalStatus::Succeeded { .. } | WithdrawalStatus::Failed { .. } => {}
        })
        .await?;

    Ok(format!(
        "Withdrew {} ETH\n{}\n",
        format_amount(outcome.amount, ETH_DECIMALS),
        outcome.tx.explorer_url
    ))
}

async fn history(ctx: &AppContext, employee: Address) -> Result<String, PayrollError> {
    let records = ctx.ledger.withdrawal_history(employee).await?;
    if records.is_empty() {
        return Ok(format!("No withdrawals for {employee}\n"));
    }

    let mut out = String::new();
    for record in &records {
        let when = i64::try_from(record.timestamp)
            .ok()
            .and_then(|ts| DateTime::<Utc>::from_timestamp(ts, 0))
            .map(|t| t.format("%Y-%m-%d %H:%M UTC").to_string())
            .unwrap_or_else(|| "unknown time".to_string());
        let _ = writeln!(
            out,
            "{when}  block {:>10}  {} ETH  {}",
            record.block_number,
            format_amount(record.amount, ETH_DECIMALS),
            record.tx_hash
        );
    }
    Ok(out)
}

async fn create_stream(
    ctx: &AppContext,
    args: CreateStreamArgs,
) -> Result<String, PayrollError> {
    let admin = ctx.stream_admin()?;
    admin.ensure_hr_role().await?;

    let current_block = match args.start_block {
        StartBlock::Auto => ctx.ledger.current_block_number().await?,
        StartBlock::At(_) => 0,
    };
    let (start_block, cliff_block) =
        resolve_schedule(args.start_block, args.cliff_blocks, current_block)?;
    let stream = NewStream {
        employee: args.employee,
        rate_per_block_wei: args.rate_per_block_wei,
        start_block,
        cliff_block,
    };

    let tx = admin.create_stream(&stream).await?;
    Ok(format!(
        "Created stream for {} (start block {}, cliff block {})\n{}\n",
        stream.employee, stream.start_block, stream.cliff_block, tx.explorer_url
    ))
}

async fn provision_file(
    ctx: &AppContext,
    args: ProvisionArgs,
) -> Result<String, PayrollError> {
    let parsed = read_employee_csv(&args.file)?;
    let valid = parsed.valid_rows().count();
    info!(file = %args.file.display(), rows = parsed.rows.len(), valid, "Employee CSV parsed");

    let mut out = String::new();
    for row in parsed.rows.iter().filter(|row| !row.is_valid()) {
        for error in &row.validation_errors {
            let _ = writeln!(out, "Skipping {row}: {error}");
        }
    }

    if args.dry_run {
        let _ = writeln!(
            out,
            "{valid} of {} rows valid, nothing submitted",
            parsed.rows.len()
        );
        return Ok(out);
    }

    let admin = ctx.stream_admin()?;
    admin.ensure_hr_role().await?;

    let report = provision(&admin, parsed.rows, |BulkProgress { current, total }| {
        eprintln!("[{current}/{total}] stream submitted");
    })
    .await?;

    out.push_str(&render_report(&report));
    Ok(out)
}

fn render_report(report: &ProvisionReport) -> String {
    let mut out = String::new();
    for row in &report.succeeded {
        let _ = writeln!(out, "line {}: created {} ({})", row.line, row.employee, row.tx);
    }
    for row in &report.failed {
        let _ = writeln!(out, "line {}: {} failed: {}", row.line, row.employee, row.error);
    }
    let _ = writeln!(
        out,
        "{} created, {} failed, {} skipped",
        report.succeeded.len(),
        report.failed.len(),
        report.excluded.len()
    );
    out
}

fn render_summary(summary: &StreamSummary, now: DateTime<Utc>) -> String {
    let stream = &summary.stream;
    let mut out = String::new();
    let _ = writeln!(out, "Employee:       {}", summary.employee);
    let _ = writeln!(out, "Current block:  {}", summary.current_block);

    if !stream.exists {
        let _ = writeln!(out, "Stream:         none");
        return out;
    }

    let _ = writeln!(out, "Stream:         {}", stream_label(stream));
    let _ = writeln!(out, "Rate per block: {}", render_value(stream.rate_per_block));
    let _ = writeln!(out, "Start block:    {}", stream.start_block);
    let _ = writeln!(out, "Cliff block:    {}", stream.cliff_block);
    let _ = writeln!(out, "Claimed:        {}", render_value(stream.claimed_amount));

    if summary.countdown.reached {
        let _ = writeln!(out, "Cliff:          {}", summary.countdown);
    } else {
        let at = summary.countdown.estimated_at(now);
        let _ = writeln!(
            out,
            "Cliff in:       {} (around {})",
            summary.countdown,
            at.format("%Y-%m-%d %H:%M UTC")
        );
    }
    let _ = writeln!(out, "Claimable:      {}", summary.claimable);
    let _ = writeln!(
        out,
        "Withdrawable:   {}",
        if summary.withdrawable { "yes" } else { "no" }
    );
    out
}

fn render_streams(streams: &[(Address, StreamState)]) -> String {
    if streams.is_empty() {
        return "No streams\n".to_string();
    }
    let mut out = String::new();
    for (employee, stream) in streams {
        let _ = writeln!(
            out,
            "{employee}  {:<8}  start {:>10}  cliff {:>10}",
            stream_label(stream),
            stream.start_block,
            stream.cliff_block
        );
    }
    out
}

fn stream_label(stream: &StreamState) -> &'static str {
    if stream.is_canceled {
        "canceled"
    } else if stream.is_paused {
        "paused"
    } else {
        "active"
    }
}

fn render_value(value: Confidential) -> String {
    match value {
        Confidential::Plain(wei) => format!("{} ETH", format_amount(wei, ETH_DECIMALS)),
        Confidential::Encrypted(_) => "encrypted".to_string(),
    }
}
