// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Payroll contract client over an alloy HTTP provider.

use alloy::{
    eips::BlockNumberOrTag,
    network::{Ethereum, EthereumWallet},
    primitives::{Address, B256, U256},
    providers::{DynProvider, PendingTransactionBuilder, Provider, ProviderBuilder},
    rpc::types::TransactionReceipt,
    signers::local::PrivateKeySigner,
};
use async_trait::async_trait;

use super::contract::{IEncryptedPayroll, IIncomeOracle};
use super::ledger::{LedgerError, PayrollLedger};
use super::types::*;
use crate::fhe::CiphertextPayload;

/// Payroll contract client.
pub struct PayrollContract {
    /// Network configuration
    network: NetworkConfig,
    /// Alloy provider (with wallet filler when a signer is configured)
    provider: DynProvider<Ethereum>,
    /// Contract binding
    contract: IEncryptedPayroll::IEncryptedPayrollInstance<DynProvider<Ethereum>>,
    /// Address of the configured signer, if any
    sender: Option<Address>,
    /// Income oracle binding, when configured
    income_oracle: Option<IIncomeOracle::IIncomeOracleInstance<DynProvider<Ethereum>>>,
    /// First block scanned for withdrawal events
    deployment_block: Option<u64>,
}

/// Blocks scanned when no deployment block is configured.
pub const DEFAULT_HISTORY_WINDOW_BLOCKS: u64 = 100_000;

/// Widest block range requested per `eth_getLogs` call.
pub const LOG_QUERY_CHUNK_BLOCKS: u64 = 10_000;

impl PayrollContract {
    /// Connect to the payroll contract at `contract_address`.
    ///
    /// Without a signer the client is read-only and every write returns
    /// [`LedgerError::MissingSigner`].
    pub fn connect(
        network: NetworkConfig,
        rpc_url: &str,
        contract_address: Address,
        signer: Option<PrivateKeySigner>,
    ) -> Result<Self, LedgerError> {
        let url: url::Url = rpc_url
            .parse()
            .map_err(|e: url::ParseError| LedgerError::InvalidRpcUrl(e.to_string()))?;

        let sender = signer.as_ref().map(|s| s.address());
        let provider = match signer {
            Some(signer) => ProviderBuilder::new()
                .wallet(EthereumWallet::from(signer))
                .connect_http(url)
                .erased(),
            None => ProviderBuilder::new().connect_http(url).erased(),
        };

        let contract = IEncryptedPayroll::new(contract_address, provider.clone());

        Ok(Self {
            network,
            provider,
            contract,
            sender,
            income_oracle: None,
            deployment_block: None,
        })
    }

    /// Bind the income oracle used by attestation requests.
    pub fn with_income_oracle(mut self, oracle: Address) -> Self {
        self.income_oracle = Some(IIncomeOracle::new(oracle, self.provider.clone()));
        self
    }

    /// Start withdrawal history scans at the contract's deployment block.
    pub fn with_deployment_block(mut self, block: u64) -> Self {
        self.deployment_block = Some(block);
        self
    }

    /// Get the network configuration.
    pub fn network(&self) -> &NetworkConfig {
        &self.network
    }

    /// Address of the configured signer.
    pub fn sender(&self) -> Result<Address, LedgerError> {
        self.sender.ok_or(LedgerError::MissingSigner)
    }

    /// Employee entry points act on `msg.sender`, so the employee must be the
    /// configured signer.
    fn ensure_sender(&self, employee: Address) -> Result<(), LedgerError> {
        let sender = self.sender()?;
        if sender != employee {
            return Err(LedgerError::InvalidAddress(format!(
                "{employee} is not the connected signer {sender}"
            )));
        }
        Ok(())
    }

    /// Wait for a sent transaction and reject reverted receipts.
    async fn confirm(
        &self,
        pending: PendingTransactionBuilder<Ethereum>,
        action: &str,
    ) -> Result<TransactionReceipt, LedgerError> {
        let tx_hash = *pending.tx_hash();
        tracing::debug!(action, tx_hash = %tx_hash, "Waiting for confirmation");

        let receipt = pending.get_receipt().await.map_err(|e| {
            LedgerError::TransactionFailed(format!("{action} {tx_hash} not confirmed: {e}"))
        })?;

        if !receipt.status() {
            return Err(LedgerError::TransactionFailed(format!(
                "{action} reverted in {tx_hash}"
            )));
        }

        Ok(receipt)
    }

    fn tx_ref(&self, tx_hash: B256) -> TxRef {
        TxRef::new(tx_hash, self.network.explorer_url)
    }

    async fn block_timestamp(&self, block_number: u64) -> Result<u64, LedgerError> {
        let block = self
            .provider
            .get_block_by_number(BlockNumberOrTag::Number(block_number))
            .await
            .map_err(|e| LedgerError::RpcError(format!("Failed to get block: {e}")))?
            .ok_or_else(|| LedgerError::RpcError(format!("Block {block_number} not found")))?;
        Ok(block.header.timestamp)
    }
}

#[async_trait]
impl PayrollLedger for PayrollContract {
    fn contract_address(&self) -> Address {
        *self.contract.address()
    }

    async fn read_stream(&self, employee: Address) -> Result<StreamState, LedgerError> {
        let stream = self
            .contract
            .streams(employee)
            .call()
            .await
            .map_err(|e| LedgerError::ContractError(e.to_string()))?;

        if !stream.exists {
            return Ok(StreamState::missing());
        }

        Ok(StreamState {
            rate_per_block: Confidential::from_handle(stream.salaryPerBlock),
            start_block: stream.startBlock,
            cliff_block: stream.cliffBlock,
            claimed_amount: Confidential::from_handle(stream.claimedAmount),
            is_paused: stream.isPaused,
            is_canceled: false,
            exists: true,
        })
    }

    async fn request_claimable_amount(
        &self,
        employee: Address,
    ) -> Result<ClaimRequestReceipt, LedgerError> {
        self.ensure_sender(employee)?;

        let pending = self
            .contract
            .requestWithdrawal()
            .send()
            .await
            .map_err(|e| LedgerError::TransactionFailed(format!("Failed to send: {e}")))?;
        let receipt = self.confirm(pending, "requestWithdrawal").await?;

        let emitted_handle = receipt.inner.logs().iter().find_map(|log| {
            log.log_decode::<IEncryptedPayroll::WithdrawalReady>()
                .ok()
                .filter(|decoded| decoded.inner.data.employee == employee)
                .map(|decoded| decoded.inner.data.claimableHandle)
        });

        Ok(ClaimRequestReceipt {
            tx: self.tx_ref(receipt.transaction_hash),
            emitted_handle,
        })
    }

    async fn submit_withdrawal(
        &self,
        employee: Address,
        amount: u128,
    ) -> Result<TxRef, LedgerError> {
        self.ensure_sender(employee)?;

        let pending = self
            .contract
            .submitWithdrawal(U256::from(amount))
            .send()
            .await
            .map_err(|e| LedgerError::TransactionFailed(format!("Failed to send: {e}")))?;
        let receipt = self.confirm(pending, "submitWithdrawal").await?;
        Ok(self.tx_ref(receipt.transaction_hash))
    }

    async fn create_stream(
        &self,
        employee: Address,
        rate: CiphertextPayload,
        start_block: u64,
        cliff_block: u64,
    ) -> Result<TxRef, LedgerError> {
        self.sender()?;

        let pending = self
            .contract
            .createStream(employee, rate.handle, rate.proof, start_block, cliff_block)
            .send()
            .await
            .map_err(|e| LedgerError::TransactionFailed(format!("Failed to send: {e}")))?;
        let receipt = self.confirm(pending, "createStream").await?;
        Ok(self.tx_ref(receipt.transaction_hash))
    }

    async fn pause_stream(&self, employee: Address) -> Result<TxRef, LedgerError> {
        self.sender()?;
        let pending = self
            .contract
            .pauseStream(employee)
            .send()
            .await
            .map_err(|e| LedgerError::TransactionFailed(format!("Failed to send: {e}")))?;
        let receipt = self.confirm(pending, "pauseStream").await?;
        Ok(self.tx_ref(receipt.transaction_hash))
    }

    async fn resume_stream(&self, employee: Address) -> Result<TxRef, LedgerError> {
        self.sender()?;
        let pending = self
            .contract
            .resumeStream(employee)
            .send()
            .await
            .map_err(|e| LedgerError::TransactionFailed(format!("Failed to send: {e}")))?;
        let receipt = self.confirm(pending, "resumeStream").await?;
        Ok(self.tx_ref(receipt.transaction_hash))
    }

    async fn cancel_stream(&self, employee: Address) -> Result<TxRef, LedgerError> {
        self.sender()?;
        let pending = self
            .contract
            .cancelStream(employee)
            .send()
            .await
            .map_err(|e| LedgerError::TransactionFailed(format!("Failed to send: {e}")))?;
        let receipt = self.confirm(pending, "cancelStream").await?;
        Ok(self.tx_ref(receipt.transaction_hash))
    }

    async fn current_block_number(&self) -> Result<u64, LedgerError> {
        self.provider
            .get_block_number()
            .await
            .map_err(|e| LedgerError::RpcError(e.to_string()))
    }

    async fn list_employees(&self) -> Result<Vec<Address>, LedgerError> {
        let count = self
            .contract
            .getStreamCount()
            .call()
            .await
            .map_err(|e| LedgerError::ContractError(e.to_string()))?;

        if count.is_zero() {
            return Ok(Vec::new());
        }

        self.contract
            .getEmployees(U256::ZERO, count)
            .call()
            .await
            .map_err(|e| LedgerError::ContractError(e.to_string()))
    }

    async fn has_role(&self, role: B256, account: Address) -> Result<bool, LedgerError> {
        self.contract
            .hasRole(role, account)
            .call()
            .await
            .map_err(|e| LedgerError::ContractError(e.to_string()))
    }

    async fn grant_role(&self, role: B256, account: Address) -> Result<TxRef, LedgerError> {
        self.sender()?;
        let pending = self
            .contract
            .grantRole(role, account)
            .send()
            .await
            .map_err(|e| LedgerError::TransactionFailed(format!("Failed to send: {e}")))?;
        let receipt = self.confirm(pending, "grantRole").await?;
        Ok(self.tx_ref(receipt.transaction_hash))
    }

    async fn revoke_role(&self, role: B256, account: Address) -> Result<TxRef, LedgerError> {
        self.sender()?;
        let pending = self
            .contract
            .revokeRole(role, account)
            .send()
            .await
            .map_err(|e| LedgerError::TransactionFailed(format!("Failed to send: {e}")))?;
        let receipt = self.confirm(pending, "revokeRole").await?;
        Ok(self.tx_ref(receipt.transaction_hash))
    }

    async fn request_attestation(&self, employee: Address) -> Result<TxRef, LedgerError> {
        self.ensure_sender(employee)?;
        let oracle = self
            .income_oracle
            .as_ref()
            .ok_or(LedgerError::OracleNotConfigured)?;

        let pending = oracle
            .requestAttestation()
            .send()
            .await
            .map_err(|e| LedgerError::TransactionFailed(format!("Failed to send: {e}")))?;
        let receipt = self.confirm(pending, "requestAttestation").await?;
        Ok(self.tx_ref(receipt.transaction_hash))
    }

    async fn withdrawal_history(
        &self,
        employee: Address,
    ) -> Result<Vec<WithdrawalRecord>, LedgerError> {
        let latest = self.current_block_number().await?;
        let (from, to) = history_range(self.deployment_block, latest);

        let mut events = Vec::new();
        let mut chunk_start = from;
        while chunk_start <= to {
            let chunk_end = chunk_start
                .saturating_add(LOG_QUERY_CHUNK_BLOCKS - 1)
                .min(to);
            let mut chunk = self
                .contract
                .SalaryWithdrawn_filter()
                .topic1(employee.into_word())
                .from_block(chunk_start)
                .to_block(chunk_end)
                .query()
                .await
                .map_err(|e| LedgerError::RpcError(e.to_string()))?;
            events.append(&mut chunk);

            match chunk_end.checked_add(1) {
                Some(next) => chunk_start = next,
                None => break,
            }
        }

        let mut records = Vec::with_capacity(events.len());
        for (event, log) in events {
            let (Some(block_number), Some(tx_hash)) = (log.block_number, log.transaction_hash)
            else {
                continue;
            };

            let amount = u128::try_from(event.amount).map_err(|_| {
                LedgerError::ContractError(format!(
                    "Withdrawal amount {} overflows u128",
                    event.amount
                ))
            })?;

            match self.block_timestamp(block_number).await {
                Ok(timestamp) => records.push(WithdrawalRecord {
                    employee: event.employee,
                    amount,
                    block_number,
                    tx_hash,
                    timestamp,
                }),
                Err(e) => {
                    tracing::warn!(
                        block_number,
                        error = %e,
                        "Skipping withdrawal with unknown block"
                    );
                }
            }
        }

        records.sort_by(|a, b| b.block_number.cmp(&a.block_number));
        Ok(records)
    }
}

/// Inclusive block range scanned for withdrawal events: from the deployment
/// block when known, otherwise a trailing window ending at `latest`.
fn history_range(deployment_block: Option<u64>, latest: u64) -> (u64, u64) {
    let from = deployment_block
        .unwrap_or_else(|| latest.saturating_sub(DEFAULT_HISTORY_WINDOW_BLOCKS))
        .min(latest);
    (from, latest)
}
