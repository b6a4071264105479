// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! In-memory fakes of the ledger, coprocessor, signer and decryptor ports.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use alloy::primitives::{keccak256, Address, Bytes, Signature, B256, U256};
use async_trait::async_trait;

use crate::blockchain::contract::{hr_role, DEFAULT_ADMIN_ROLE};
use crate::blockchain::{
    ClaimRequestReceipt, Confidential, LedgerError, PayrollLedger, StreamState, TxRef,
    WithdrawalRecord, SEPOLIA,
};
use crate::fhe::authorization::{AuthorizationSigner, DecryptAuthorization, SignerError};
use crate::fhe::coprocessor::{
    Coprocessor, CoprocessorError, CoprocessorRuntime, DecryptedValues, EncryptedInput,
    EncryptedInputBuffer, InputValue, UserDecryptRequest,
};
use crate::fhe::{
    CiphertextEncryptor, CiphertextPayload, DecryptError, ExecutionContext, GatewayConfig,
    GatewaySession, ValueDecryptor,
};

/// Acting HR account in tests.
pub const HR: Address = Address::repeat_byte(0x4b);

/// Handle emitted by the in-memory ledger's withdrawal request.
pub const CLAIMABLE_HANDLE: B256 = B256::repeat_byte(0xc1);

/// Ordered record of ledger writes and decryptions.
pub type Journal = Arc<Mutex<Vec<String>>>;

/// Encryptor over a fresh interactive session on `runtime`.
pub fn encryptor(runtime: Arc<FakeRuntime>) -> CiphertextEncryptor {
    CiphertextEncryptor::new(Arc::new(GatewaySession::new(
        runtime,
        GatewayConfig::sepolia(),
        ExecutionContext::Interactive,
    )))
}

// =============================================================================
// Coprocessor
// =============================================================================

pub struct FakeRuntime {
    loads: AtomicUsize,
    bootstraps: AtomicUsize,
    connects: AtomicUsize,
    bootstrap_yields: usize,
    failing_bootstraps: AtomicUsize,
    coprocessor: Arc<FakeCoprocessor>,
}

impl FakeRuntime {
    pub fn new() -> Self {
        Self {
            loads: AtomicUsize::new(0),
            bootstraps: AtomicUsize::new(0),
            connects: AtomicUsize::new(0),
            bootstrap_yields: 0,
            failing_bootstraps: AtomicUsize::new(0),
            coprocessor: Arc::new(FakeCoprocessor::new()),
        }
    }

    /// Yield to the scheduler `n` times during bootstrap so concurrent
    /// callers overlap with the in-flight initialization.
    pub fn with_bootstrap_yields(mut self, n: usize) -> Self {
        self.bootstrap_yields = n;
        self
    }

    /// Fail the next `n` bootstraps.
    pub fn failing_bootstraps(self, n: usize) -> Self {
        self.failing_bootstraps.store(n, Ordering::SeqCst);
        self
    }

    pub fn load_calls(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }

    pub fn bootstrap_calls(&self) -> usize {
        self.bootstraps.load(Ordering::SeqCst)
    }

    pub fn connect_calls(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }

    pub fn coprocessor(&self) -> Arc<FakeCoprocessor> {
        self.coprocessor.clone()
    }
}

#[async_trait]
impl CoprocessorRuntime for FakeRuntime {
    async fn load(&self) -> Result<(), CoprocessorError> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn bootstrap(&self) -> Result<(), CoprocessorError> {
        self.bootstraps.fetch_add(1, Ordering::SeqCst);
        for _ in 0..self.bootstrap_yields {
            tokio::task::yield_now().await;
        }

        let failing = self.failing_bootstraps.load(Ordering::SeqCst);
        if failing > 0 {
            self.failing_bootstraps.store(failing - 1, Ordering::SeqCst);
            return Err(CoprocessorError::Runtime("bootstrap failed".to_string()));
        }
        Ok(())
    }

    async fn connect(
        &self,
        _config: &GatewayConfig,
    ) -> Result<Arc<dyn Coprocessor>, CoprocessorError> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        let session: Arc<dyn Coprocessor> = self.coprocessor.clone();
        Ok(session)
    }
}

pub struct FakeCoprocessor {
    config: GatewayConfig,
    encrypt_calls: Mutex<Vec<(Address, Address, Vec<InputValue>)>>,
    encrypt_failure: Mutex<Option<CoprocessorError>>,
    decrypt_always: Mutex<Option<CoprocessorError>>,
    decrypt_script: Mutex<VecDeque<CoprocessorError>>,
    plaintexts: Mutex<HashMap<B256, u128>>,
    decrypt_calls: AtomicUsize,
    public_keys: Mutex<Vec<Vec<u8>>>,
}

impl FakeCoprocessor {
    fn new() -> Self {
        Self {
            config: GatewayConfig::sepolia(),
            encrypt_calls: Mutex::new(Vec::new()),
            encrypt_failure: Mutex::new(None),
            decrypt_always: Mutex::new(None),
            decrypt_script: Mutex::new(VecDeque::new()),
            plaintexts: Mutex::new(HashMap::new()),
            decrypt_calls: AtomicUsize::new(0),
            public_keys: Mutex::new(Vec::new()),
        }
    }

    pub fn encrypt_calls(&self) -> Vec<(Address, Address, Vec<InputValue>)> {
        self.encrypt_calls.lock().unwrap().clone()
    }

    pub fn fail_encryption(&self, error: CoprocessorError) {
        *self.encrypt_failure.lock().unwrap() = Some(error);
    }

    pub fn fail_decryption_always(&self, error: CoprocessorError) {
        *self.decrypt_always.lock().unwrap() = Some(error);
    }

    pub fn fail_decryption_times(&self, n: usize, error: CoprocessorError) {
        let mut script = self.decrypt_script.lock().unwrap();
        script.extend(std::iter::repeat(error).take(n));
    }

    pub fn set_plaintext(&self, handle: B256, value: u128) {
        self.plaintexts.lock().unwrap().insert(handle, value);
    }

    pub fn decrypt_calls(&self) -> usize {
        self.decrypt_calls.load(Ordering::SeqCst)
    }

    pub fn seen_public_keys(&self) -> Vec<Vec<u8>> {
        self.public_keys.lock().unwrap().clone()
    }
}

#[async_trait]
impl Coprocessor for FakeCoprocessor {
    fn config(&self) -> &GatewayConfig {
        &self.config
    }

    async fn encrypt_input(
        &self,
        buffer: &EncryptedInputBuffer,
    ) -> Result<EncryptedInput, CoprocessorError> {
        self.encrypt_calls.lock().unwrap().push((
            buffer.contract(),
            buffer.user(),
            buffer.values().to_vec(),
        ));
        if let Some(error) = self.encrypt_failure.lock().unwrap().clone() {
            return Err(error);
        }

        let handles = buffer
            .values()
            .iter()
            .enumerate()
            .map(|(index, value)| {
                let InputValue::Uint128(v) = value;
                let mut material = Vec::with_capacity(64);
                material.extend_from_slice(buffer.contract().as_slice());
                material.extend_from_slice(buffer.user().as_slice());
                material.extend_from_slice(&v.to_be_bytes());
                material.push(index as u8);
                keccak256(&material)
            })
            .collect();

        Ok(EncryptedInput {
            handles,
            input_proof: Bytes::from(vec![0x01; 32]),
        })
    }

    async fn user_decrypt(
        &self,
        request: &UserDecryptRequest<'_>,
    ) -> Result<DecryptedValues, CoprocessorError> {
        self.decrypt_calls.fetch_add(1, Ordering::SeqCst);
        self.public_keys
            .lock()
            .unwrap()
            .push(request.keypair.public_key_bytes().to_vec());

        if let Some(error) = self.decrypt_always.lock().unwrap().clone() {
            return Err(error);
        }
        if let Some(error) = self.decrypt_script.lock().unwrap().pop_front() {
            return Err(error);
        }

        let plaintexts = self.plaintexts.lock().unwrap();
        Ok(request
            .pairs
            .iter()
            .filter_map(|pair| plaintexts.get(&pair.handle).map(|v| (pair.handle, *v)))
            .collect())
    }
}

// =============================================================================
// Signer and decryptor
// =============================================================================

pub struct FakeSigner {
    reject: bool,
    calls: AtomicUsize,
}

impl FakeSigner {
    pub fn new() -> Self {
        Self {
            reject: false,
            calls: AtomicUsize::new(0),
        }
    }

    /// A signer whose user declines every prompt.
    pub fn rejecting() -> Self {
        Self {
            reject: true,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn sign_calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AuthorizationSigner for FakeSigner {
    fn address(&self) -> Address {
        Address::repeat_byte(0x01)
    }

    async fn sign_authorization(
        &self,
        _authorization: &DecryptAuthorization,
    ) -> Result<Signature, SignerError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.reject {
            return Err(SignerError::Rejected);
        }
        Ok(Signature::new(U256::from(1u8), U256::from(2u8), false))
    }
}

/// Decryptor returning scripted results and journaling each call.
pub struct ScriptedDecryptor {
    failures: Mutex<usize>,
    value: u128,
    journal: Journal,
}

impl ScriptedDecryptor {
    pub fn returning(value: u128) -> Self {
        Self {
            failures: Mutex::new(0),
            value,
            journal: Journal::default(),
        }
    }

    pub fn failing() -> Self {
        Self {
            failures: Mutex::new(usize::MAX),
            value: 0,
            journal: Journal::default(),
        }
    }

    pub fn failing_once_then(value: u128) -> Self {
        Self {
            failures: Mutex::new(1),
            value,
            journal: Journal::default(),
        }
    }

    pub fn with_journal(mut self, journal: Journal) -> Self {
        self.journal = journal;
        self
    }
}

#[async_trait]
impl ValueDecryptor for ScriptedDecryptor {
    async fn decrypt(
        &self,
        handle: B256,
        _contract: Address,
        _user: Address,
    ) -> Result<u128, DecryptError> {
        self.journal.lock().unwrap().push(format!("decrypt:{handle}"));

        let mut failures = self.failures.lock().unwrap();
        if *failures > 0 {
            *failures = failures.saturating_sub(1);
            return Err(DecryptError::DecryptionExhausted {
                attempts: 5,
                last: CoprocessorError::NotAuthorized("ACL".to_string()),
            });
        }
        Ok(self.value)
    }
}

// =============================================================================
// Ledger
// =============================================================================

#[derive(Default)]
struct LedgerState {
    block: u64,
    streams: HashMap<Address, StreamState>,
    employees: Vec<Address>,
    hr: HashSet<Address>,
    admins: HashSet<Address>,
    fail_create: HashSet<Address>,
    unreadable: HashSet<Address>,
    omit_event: bool,
    fail_submit: bool,
    history: Vec<WithdrawalRecord>,
    tx_counter: u8,
}

fn role_members(
    state: &mut LedgerState,
    role: B256,
) -> Result<&mut HashSet<Address>, LedgerError> {
    if role == hr_role() {
        Ok(&mut state.hr)
    } else if role == DEFAULT_ADMIN_ROLE {
        Ok(&mut state.admins)
    } else {
        Err(LedgerError::ContractError(format!("unknown role {role}")))
    }
}

impl LedgerState {
    fn next_tx(&mut self) -> TxRef {
        self.tx_counter = self.tx_counter.wrapping_add(1);
        TxRef::new(B256::repeat_byte(self.tx_counter), SEPOLIA.explorer_url)
    }
}

pub struct InMemoryLedger {
    contract: Address,
    state: Mutex<LedgerState>,
    journal: Journal,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self {
            contract: Address::repeat_byte(0xc0),
            state: Mutex::new(LedgerState {
                block: 1_000,
                ..LedgerState::default()
            }),
            journal: Journal::default(),
        }
    }

    pub fn journal(&self) -> Vec<String> {
        self.journal.lock().unwrap().clone()
    }

    pub fn journal_handle(&self) -> Journal {
        self.journal.clone()
    }

    pub fn set_block(&self, block: u64) {
        self.state.lock().unwrap().block = block;
    }

    pub fn insert_stream(&self, employee: Address, stream: StreamState) {
        let mut state = self.state.lock().unwrap();
        state.streams.insert(employee, stream);
        if !state.employees.contains(&employee) {
            state.employees.push(employee);
        }
    }

    pub fn stream(&self, employee: Address) -> Option<StreamState> {
        self.state.lock().unwrap().streams.get(&employee).cloned()
    }

    pub fn grant_hr(&self, account: Address) {
        self.state.lock().unwrap().hr.insert(account);
    }

    pub fn grant_admin(&self, account: Address) {
        self.state.lock().unwrap().admins.insert(account);
    }

    pub fn fail_create_for(&self, employee: Address) {
        self.state.lock().unwrap().fail_create.insert(employee);
    }

    pub fn make_unreadable(&self, employee: Address) {
        self.state.lock().unwrap().unreadable.insert(employee);
    }

    pub fn omit_withdrawal_event(&self) {
        self.state.lock().unwrap().omit_event = true;
    }

    pub fn fail_submissions(&self) {
        self.state.lock().unwrap().fail_submit = true;
    }

    fn record(&self, entry: String) {
        self.journal.lock().unwrap().push(entry);
    }

    fn update_stream(
        &self,
        employee: Address,
        update: impl FnOnce(&mut StreamState),
    ) -> Result<TxRef, LedgerError> {
        let mut state = self.state.lock().unwrap();
        let stream = state
            .streams
            .get_mut(&employee)
            .ok_or_else(|| LedgerError::ContractError("execution reverted: no stream".into()))?;
        update(stream);
        Ok(state.next_tx())
    }
}

#[async_trait]
impl PayrollLedger for InMemoryLedger {
    fn contract_address(&self) -> Address {
        self.contract
    }

    async fn read_stream(&self, employee: Address) -> Result<StreamState, LedgerError> {
        let state = self.state.lock().unwrap();
        if state.unreadable.contains(&employee) {
            return Err(LedgerError::RpcError("connection reset".into()));
        }
        Ok(state
            .streams
            .get(&employee)
            .cloned()
            .unwrap_or_else(StreamState::missing))
    }

    async fn request_claimable_amount(
        &self,
        employee: Address,
    ) -> Result<ClaimRequestReceipt, LedgerError> {
        self.record("request".to_string());
        let mut state = self.state.lock().unwrap();
        if !state.streams.contains_key(&employee) {
            return Err(LedgerError::ContractError("execution reverted: no stream".into()));
        }
        let emitted_handle = (!state.omit_event).then_some(CLAIMABLE_HANDLE);
        Ok(ClaimRequestReceipt {
            tx: state.next_tx(),
            emitted_handle,
        })
    }

    async fn submit_withdrawal(
        &self,
        employee: Address,
        amount: u128,
    ) -> Result<TxRef, LedgerError> {
        self.record(format!("submit:{amount}"));
        let mut state = self.state.lock().unwrap();
        if state.fail_submit {
            return Err(LedgerError::TransactionFailed("transaction reverted".into()));
        }

        if let Some(stream) = state.streams.get_mut(&employee) {
            if let Confidential::Plain(claimed) = stream.claimed_amount {
                stream.claimed_amount = Confidential::Plain(claimed.saturating_add(amount));
            }
        }
        let tx = state.next_tx();
        let record = WithdrawalRecord {
            employee,
            amount,
            block_number: state.block,
            tx_hash: tx.tx_hash,
            timestamp: 1_700_000_000 + state.block * 12,
        };
        state.history.insert(0, record);
        Ok(tx)
    }

    async fn create_stream(
        &self,
        employee: Address,
        rate: CiphertextPayload,
        start_block: u64,
        cliff_block: u64,
    ) -> Result<TxRef, LedgerError> {
        self.record(format!("create:{employee}"));
        let mut state = self.state.lock().unwrap();
        if state.fail_create.contains(&employee) {
            return Err(LedgerError::ContractError("execution reverted".into()));
        }
        if state.streams.get(&employee).is_some_and(|s| s.exists) {
            return Err(LedgerError::ContractError(
                "execution reverted: stream exists".into(),
            ));
        }

        state.streams.insert(
            employee,
            StreamState {
                rate_per_block: Confidential::from_handle(rate.handle),
                start_block,
                cliff_block,
                claimed_amount: Confidential::Plain(0),
                is_paused: false,
                is_canceled: false,
                exists: true,
            },
        );
        if !state.employees.contains(&employee) {
            state.employees.push(employee);
        }
        Ok(state.next_tx())
    }

    async fn pause_stream(&self, employee: Address) -> Result<TxRef, LedgerError> {
        self.record(format!("pause:{employee}"));
        self.update_stream(employee, |s| s.is_paused = true)
    }

    async fn resume_stream(&self, employee: Address) -> Result<TxRef, LedgerError> {
        self.record(format!("resume:{employee}"));
        self.update_stream(employee, |s| s.is_paused = false)
    }

    async fn cancel_stream(&self, employee: Address) -> Result<TxRef, LedgerError> {
        self.record(format!("cancel:{employee}"));
        let tx = self.update_stream(employee, |_| {})?;
        self.state.lock().unwrap().streams.remove(&employee);
        Ok(tx)
    }

    async fn current_block_number(&self) -> Result<u64, LedgerError> {
        Ok(self.state.lock().unwrap().block)
    }

    async fn list_employees(&self) -> Result<Vec<Address>, LedgerError> {
        Ok(self.state.lock().unwrap().employees.clone())
    }

    async fn has_role(&self, role: B256, account: Address) -> Result<bool, LedgerError> {
        let mut state = self.state.lock().unwrap();
        Ok(role_members(&mut state, role)?.contains(&account))
    }

    async fn grant_role(&self, role: B256, account: Address) -> Result<TxRef, LedgerError> {
        self.record(format!("grant:{account}"));
        let mut state = self.state.lock().unwrap();
        role_members(&mut state, role)?.insert(account);
        Ok(state.next_tx())
    }

    async fn revoke_role(&self, role: B256, account: Address) -> Result<TxRef, LedgerError> {
        self.record(format!("revoke:{account}"));
        let mut state = self.state.lock().unwrap();
        role_members(&mut state, role)?.remove(&account);
        Ok(state.next_tx())
    }

    async fn request_attestation(&self, employee: Address) -> Result<TxRef, LedgerError> {
        self.record(format!("attest:{employee}"));
        Ok(self.state.lock().unwrap().next_tx())
    }

    async fn withdrawal_history(
        &self,
        employee: Address,
    ) -> Result<Vec<WithdrawalRecord>, LedgerError> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .history
            .iter()
            .filter(|r| r.employee == employee)
            .cloned()
            .collect())
    }
}
