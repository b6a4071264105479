// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::sync::Arc;

use alloy::primitives::Address;
use alloy::signers::local::PrivateKeySigner;

use crate::blockchain::signing::create_signer;
use crate::blockchain::{LedgerError, NetworkConfig, PayrollContract, PayrollLedger, SEPOLIA};
use crate::config::PayrollConfig;
use crate::error::PayrollError;
use crate::fhe::{
    CiphertextEncryptor, DecryptionClient, GatewaySession, LocalAuthorizationSigner,
    RelayerRuntime,
};
use crate::payroll::{RoleAdmin, StreamAdmin, WithdrawalOrchestrator};

/// Shared handles for one CLI invocation.
#[derive(Clone)]
pub struct AppContext {
    pub config: PayrollConfig,
    pub network: NetworkConfig,
    pub ledger: Arc<dyn PayrollLedger>,
    pub session: Arc<GatewaySession>,
    signer: Option<PrivateKeySigner>,
}

impl AppContext {
    /// Wire the ledger client and the coprocessor session from `config`.
    pub fn new(config: PayrollConfig) -> Result<Self, PayrollError> {
        let signer = config.private_key.as_deref().map(create_signer).transpose()?;

        let mut ledger = PayrollContract::connect(
            SEPOLIA,
            &config.rpc_url,
            config.contract_address,
            signer.clone(),
        )?;
        if let Some(oracle) = config.income_oracle {
            ledger = ledger.with_income_oracle(oracle);
        }
        if let Some(block) = config.deployment_block {
            ledger = ledger.with_deployment_block(block);
        }
        let runtime = RelayerRuntime::new(config.gateway.relayer_url.clone())?;
        let session = GatewaySession::new(
            Arc::new(runtime),
            config.gateway.clone(),
            config.execution_context,
        );

        Ok(Self::with_components(
            config,
            SEPOLIA,
            Arc::new(ledger),
            Arc::new(session),
            signer,
        ))
    }

    pub fn with_components(
        config: PayrollConfig,
        network: NetworkConfig,
        ledger: Arc<dyn PayrollLedger>,
        session: Arc<GatewaySession>,
        signer: Option<PrivateKeySigner>,
    ) -> Self {
        Self {
            config,
            network,
            ledger,
            session,
            signer,
        }
    }

    /// Address of the acting account.
    pub fn account(&self) -> Result<Address, PayrollError> {
        self.signer
            .as_ref()
            .map(|s| s.address())
            .ok_or(PayrollError::Ledger(LedgerError::MissingSigner))
    }

    pub fn encryptor(&self) -> CiphertextEncryptor {
        CiphertextEncryptor::new(self.session.clone())
    }

    /// Stream administration acting as the configured account.
    pub fn stream_admin(&self) -> Result<StreamAdmin, PayrollError> {
        Ok(StreamAdmin::new(
            self.ledger.clone(),
            self.encryptor(),
            self.account()?,
        ))
    }

    /// HR role management acting as the configured account.
    pub fn role_admin(&self) -> Result<RoleAdmin, PayrollError> {
        Ok(RoleAdmin::new(self.ledger.clone(), self.account()?))
    }

    /// Withdrawals decrypting with authorizations signed by the configured
    /// account.
    pub fn withdrawal_orchestrator(&self) -> Result<WithdrawalOrchestrator, PayrollError> {
        let signer = self
            .signer
            .clone()
            .ok_or(PayrollError::Ledger(LedgerError::MissingSigner))?;
        let decryptor = DecryptionClient::new(
            self.session.clone(),
            Arc::new(LocalAuthorizationSigner::new(signer)),
        );
        Ok(WithdrawalOrchestrator::new(
            self.ledger.clone(),
            Arc::new(decryptor),
        ))
    }
}
