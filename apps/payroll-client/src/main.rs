// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::process::ExitCode;

use clap::Parser;

use confidential_payroll::cli::{Cli, Command};
use confidential_payroll::commands::{execute, write_template};
use confidential_payroll::config::{PayrollConfig, DEFAULT_LOG_FILTER};
use confidential_payroll::error::PayrollError;
use confidential_payroll::logging::{init_logging, LogFormat};
use confidential_payroll::state::AppContext;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(DEFAULT_LOG_FILTER, LogFormat::from_str_lossy(&cli.log_format));

    match run(cli.command).await {
        Ok(output) => {
            print!("{output}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::debug!(error = ?e, "Command failed");
            eprintln!("Error: {}", e.user_message());
            ExitCode::FAILURE
        }
    }
}

async fn run(command: Command) -> Result<String, PayrollError> {
    // The template needs no connection settings.
    if let Command::Template { output } = &command {
        return write_template(output.as_deref());
    }

    let config = PayrollConfig::from_env()?;
    tracing::debug!(config = ?config, "Configuration loaded");

    let ctx = AppContext::new(config)?;
    execute(&ctx, command).await
}
