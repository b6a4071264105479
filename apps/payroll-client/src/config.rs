// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! Environment variable names, defaults and the [`PayrollConfig`] loaded from
//! them at startup.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `PAYROLL_RPC_URL` | Ledger JSON-RPC endpoint | Sepolia public RPC |
//! | `PAYROLL_CONTRACT_ADDRESS` | Encrypted payroll contract | Required |
//! | `PAYROLL_PRIVATE_KEY` | Hex key of the acting account | Required for writes and decryption |
//! | `PAYROLL_EXECUTION_CONTEXT` | `interactive` or `headless` | `interactive` |
//! | `PAYROLL_INCOME_ORACLE_ADDRESS` | Income attestation oracle | Unset (attestation disabled) |
//! | `PAYROLL_DEPLOYMENT_BLOCK` | First block scanned for withdrawal history | Last 100k blocks |
//! | `FHE_RELAYER_URL` | Coprocessor relayer | Sepolia relayer |
//! | `FHE_ACL_ADDRESS` | ACL contract | Sepolia deployment |
//! | `FHE_KMS_VERIFIER_ADDRESS` | KMS verifier contract | Sepolia deployment |
//! | `FHE_INPUT_VERIFIER_ADDRESS` | Input verifier contract | Sepolia deployment |
//! | `FHE_DECRYPTION_VERIFIER_ADDRESS` | EIP-712 decryption verifier | Sepolia deployment |
//! | `FHE_INPUT_VERIFICATION_ADDRESS` | Input-proof verifying contract | Sepolia deployment |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info,confidential_payroll=debug` |

use alloy::primitives::Address;

use crate::blockchain::SEPOLIA;
use crate::fhe::{ExecutionContext, GatewayConfig};

/// Ledger JSON-RPC endpoint.
///
/// # Default
/// The public Sepolia endpoint from [`SEPOLIA`].
pub const RPC_URL_ENV: &str = "PAYROLL_RPC_URL";

/// Address of the encrypted payroll contract. Required.
pub const CONTRACT_ADDRESS_ENV: &str = "PAYROLL_CONTRACT_ADDRESS";

/// Hex-encoded secp256k1 private key of the acting account.
///
/// Used to sign ledger transactions and decryption authorizations. Read-only
/// commands run without it.
pub const PRIVATE_KEY_ENV: &str = "PAYROLL_PRIVATE_KEY";

/// Whether a user is present to sign decryption requests.
pub const EXECUTION_CONTEXT_ENV: &str = "PAYROLL_EXECUTION_CONTEXT";

/// Address of the income attestation oracle. `attest` needs it.
pub const INCOME_ORACLE_ADDRESS_ENV: &str = "PAYROLL_INCOME_ORACLE_ADDRESS";

/// Block the payroll contract was deployed in.
///
/// # Default
/// Unset; history scans cover a trailing window of recent blocks.
pub const DEPLOYMENT_BLOCK_ENV: &str = "PAYROLL_DEPLOYMENT_BLOCK";

pub const RELAYER_URL_ENV: &str = "FHE_RELAYER_URL";
pub const ACL_ADDRESS_ENV: &str = "FHE_ACL_ADDRESS";
pub const KMS_VERIFIER_ADDRESS_ENV: &str = "FHE_KMS_VERIFIER_ADDRESS";
pub const INPUT_VERIFIER_ADDRESS_ENV: &str = "FHE_INPUT_VERIFIER_ADDRESS";
pub const DECRYPTION_VERIFIER_ADDRESS_ENV: &str = "FHE_DECRYPTION_VERIFIER_ADDRESS";
pub const INPUT_VERIFICATION_ADDRESS_ENV: &str = "FHE_INPUT_VERIFICATION_ADDRESS";

/// Logging format, `json` or `pretty`.
pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";

/// Filter used when `RUST_LOG` is unset.
pub const DEFAULT_LOG_FILTER: &str = "info,confidential_payroll=debug";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable {0}")]
    Missing(&'static str),

    #[error("Invalid address in {name}: {value}")]
    InvalidAddress { name: &'static str, value: String },

    #[error("Invalid number in {name}: {value}")]
    InvalidNumber { name: &'static str, value: String },

    #[error("Invalid execution context in PAYROLL_EXECUTION_CONTEXT: {0}")]
    InvalidContext(String),
}

/// Settings resolved from the environment.
#[derive(Clone)]
pub struct PayrollConfig {
    pub rpc_url: String,
    pub contract_address: Address,
    pub private_key: Option<String>,
    pub execution_context: ExecutionContext,
    pub gateway: GatewayConfig,
    pub income_oracle: Option<Address>,
    pub deployment_block: Option<u64>,
}

impl std::fmt::Debug for PayrollConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PayrollConfig")
            .field("rpc_url", &self.rpc_url)
            .field("contract_address", &self.contract_address)
            .field("private_key", &self.private_key.as_ref().map(|_| "<redacted>"))
            .field("execution_context", &self.execution_context)
            .field("gateway", &self.gateway)
            .field("income_oracle", &self.income_oracle)
            .field("deployment_block", &self.deployment_block)
            .finish()
    }
}

impl PayrollConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Resolve settings through `lookup`; blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let address = |name: &'static str, default: Address| match get(name) {
            Some(value) => value
                .parse::<Address>()
                .map_err(|_| ConfigError::InvalidAddress { name, value }),
            None => Ok(default),
        };

        let optional_address = |name: &'static str| {
            get(name)
                .map(|value| {
                    value
                        .parse::<Address>()
                        .map_err(|_| ConfigError::InvalidAddress { name, value })
                })
                .transpose()
        };

        let contract_address = optional_address(CONTRACT_ADDRESS_ENV)?
            .ok_or(ConfigError::Missing(CONTRACT_ADDRESS_ENV))?;
        let income_oracle = optional_address(INCOME_ORACLE_ADDRESS_ENV)?;
        let deployment_block = get(DEPLOYMENT_BLOCK_ENV)
            .map(|value| {
                value.parse::<u64>().map_err(|_| ConfigError::InvalidNumber {
                    name: DEPLOYMENT_BLOCK_ENV,
                    value,
                })
            })
            .transpose()?;

        let execution_context = match get(EXECUTION_CONTEXT_ENV) {
            Some(raw) => ExecutionContext::parse(&raw).ok_or(ConfigError::InvalidContext(raw))?,
            None => ExecutionContext::Interactive,
        };

        let defaults = GatewayConfig::sepolia();
        let gateway = GatewayConfig {
            relayer_url: get(RELAYER_URL_ENV).unwrap_or(defaults.relayer_url.clone()),
            acl_address: address(ACL_ADDRESS_ENV, defaults.acl_address)?,
            kms_verifier_address: address(
                KMS_VERIFIER_ADDRESS_ENV,
                defaults.kms_verifier_address,
            )?,
            input_verifier_address: address(
                INPUT_VERIFIER_ADDRESS_ENV,
                defaults.input_verifier_address,
            )?,
            decryption_verifier_address: address(
                DECRYPTION_VERIFIER_ADDRESS_ENV,
                defaults.decryption_verifier_address,
            )?,
            input_verification_address: address(
                INPUT_VERIFICATION_ADDRESS_ENV,
                defaults.input_verification_address,
            )?,
            ..defaults
        };

        Ok(Self {
            rpc_url: get(RPC_URL_ENV).unwrap_or_else(|| SEPOLIA.rpc_url.to_string()),
            contract_address,
            private_key: get(PRIVATE_KEY_ENV),
            execution_context,
            gateway,
            income_oracle,
            deployment_block,
        })
    }
}
