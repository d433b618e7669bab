#![allow(dead_code)]

use async_trait::async_trait;
use chrono::Utc;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use contract_registry::application::upgrade::{
    default_actions, MigrationAction, MigrationRunner, UpgradeOrchestrator,
};
use contract_registry::config::UpgradeConfig;
use contract_registry::domain::models::{
    CodeHash, ConfirmedUpgrade, ContractEvent, ContractRegistryEntry, IndexCheckpoint,
    MigrationStep, Network, NewContractEvent, NewUpgradeLog, SimulationResult, UpgradeLog,
    UpgradeStatus,
};
use contract_registry::infrastructure::ledger::{
    xdr, EventFilter, EventsPage, FeeStats, LedgerEntry, LedgerEvent, LedgerRpc, LedgerRpcError,
    SendStatus, SendTransactionResponse, SignerError, SigningSecret, SimulationResponse,
    TransactionEnvelope, TransactionStatus, UpgradeInvocation, UpgradeSigner,
};
use contract_registry::infrastructure::persistence::{
    DbError, EventStore, RegistryStore, UpgradeLogStore,
};

pub const CONTRACT_ADDRESS: &str = "CBULKPAYMENTCONTRACTADDRESS";
pub const FUNDED_SOURCE: &str = "GAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAWHF";

/// 64-character hash made of one repeated hex digit
pub fn hash(digit: char) -> String {
    std::iter::repeat(digit).take(64).collect()
}

pub fn code_hash(digit: char) -> CodeHash {
    CodeHash::parse(&hash(digit)).unwrap()
}

pub fn bulk_payment_contract() -> ContractRegistryEntry {
    ContractRegistryEntry {
        id: 1,
        name: "bulk-payment".to_string(),
        network: Network::Testnet,
        contract_address: CONTRACT_ADDRESS.to_string(),
        current_code_hash: code_hash('a'),
        version: "0.1.0".to_string(),
        last_upgraded_at: None,
        last_upgraded_by: None,
    }
}

#[derive(Default)]
struct StoreState {
    contracts: Vec<ContractRegistryEntry>,
    logs: BTreeMap<i32, UpgradeLog>,
    next_log_id: i32,
    events: Vec<ContractEvent>,
    checkpoints: HashMap<String, IndexCheckpoint>,
    fail_event_inserts: bool,
    fail_step_saves: bool,
    fail_confirmed_upgrades: bool,
}

/// In-memory stand-in for all three stores, sharing one lock so every
/// operation is atomic
#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<StoreState>>,
}

impl MemoryStore {
    pub fn with_contracts(contracts: Vec<ContractRegistryEntry>) -> Self {
        let store = Self::default();
        store.state.lock().unwrap().contracts = contracts;
        store
    }

    pub fn log_count(&self) -> usize {
        self.state.lock().unwrap().logs.len()
    }

    pub fn contract(&self, id: i32) -> ContractRegistryEntry {
        self.state
            .lock()
            .unwrap()
            .contracts
            .iter()
            .find(|c| c.id == id)
            .cloned()
            .unwrap()
    }

    pub fn log(&self, id: i32) -> UpgradeLog {
        self.state.lock().unwrap().logs.get(&id).cloned().unwrap()
    }

    pub fn stored_events(&self) -> Vec<ContractEvent> {
        self.state.lock().unwrap().events.clone()
    }

    pub fn fail_event_inserts(&self, fail: bool) {
        self.state.lock().unwrap().fail_event_inserts = fail;
    }

    pub fn fail_step_saves(&self, fail: bool) {
        self.state.lock().unwrap().fail_step_saves = fail;
    }

    pub fn fail_confirmed_upgrades(&self, fail: bool) {
        self.state.lock().unwrap().fail_confirmed_upgrades = fail;
    }

    /// Insert a log directly in the given status
    pub fn seed_log(&self, status: UpgradeStatus, steps: Vec<MigrationStep>) -> i32 {
        let mut state = self.state.lock().unwrap();
        state.next_log_id += 1;
        let id = state.next_log_id;
        state.logs.insert(
            id,
            UpgradeLog {
                id,
                registry_id: 1,
                previous_code_hash: code_hash('a'),
                new_code_hash: code_hash('b'),
                status,
                simulation_result: None,
                tx_hash: None,
                migration_steps: steps,
                initiated_by: "ops@example.com".to_string(),
                notes: None,
                error_message: None,
                created_at: Utc::now(),
                completed_at: None,
            },
        );
        id
    }
}

fn missing(what: &str, id: i32) -> DbError {
    DbError::QueryError(format!("{} {} not found", what, id))
}

#[async_trait]
impl RegistryStore for MemoryStore {
    async fn list_contracts(&self) -> Result<Vec<ContractRegistryEntry>, DbError> {
        Ok(self.state.lock().unwrap().contracts.clone())
    }

    async fn get_contract(&self, id: i32) -> Result<Option<ContractRegistryEntry>, DbError> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .contracts
            .iter()
            .find(|c| c.id == id)
            .cloned())
    }

    async fn contract_addresses(&self, network: Network) -> Result<Vec<String>, DbError> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .contracts
            .iter()
            .filter(|c| c.network == network)
            .map(|c| c.contract_address.clone())
            .collect())
    }
}

#[async_trait]
impl UpgradeLogStore for MemoryStore {
    async fn create_log(&self, log: NewUpgradeLog) -> Result<UpgradeLog, DbError> {
        let mut state = self.state.lock().unwrap();
        state.next_log_id += 1;
        let row = UpgradeLog {
            id: state.next_log_id,
            registry_id: log.registry_id,
            previous_code_hash: log.previous_code_hash,
            new_code_hash: log.new_code_hash,
            status: UpgradeStatus::Pending,
            simulation_result: None,
            tx_hash: None,
            migration_steps: log.migration_steps,
            initiated_by: log.initiated_by,
            notes: log.notes,
            error_message: None,
            created_at: Utc::now(),
            completed_at: None,
        };
        state.logs.insert(row.id, row.clone());
        Ok(row)
    }

    async fn get_log(&self, id: i32) -> Result<Option<UpgradeLog>, DbError> {
        Ok(self.state.lock().unwrap().logs.get(&id).cloned())
    }

    async fn list_logs(
        &self,
        registry_id: i32,
        page: u64,
        limit: u64,
    ) -> Result<(Vec<UpgradeLog>, u64), DbError> {
        let state = self.state.lock().unwrap();
        let mut logs: Vec<UpgradeLog> = state
            .logs
            .values()
            .filter(|log| log.registry_id == registry_id)
            .cloned()
            .collect();
        logs.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        let total = logs.len() as u64;
        let page_rows = logs
            .into_iter()
            .skip((page * limit) as usize)
            .take(limit as usize)
            .collect();
        Ok((page_rows, total))
    }

    async fn transition(
        &self,
        id: i32,
        from: &[UpgradeStatus],
        to: UpgradeStatus,
        error_message: Option<String>,
    ) -> Result<bool, DbError> {
        if from.iter().any(|status| !status.can_transition_to(to)) {
            return Err(DbError::QueryError(format!("illegal change to {}", to)));
        }
        let mut state = self.state.lock().unwrap();
        let log = state.logs.get_mut(&id).ok_or_else(|| missing("log", id))?;
        if !from.contains(&log.status) {
            return Ok(false);
        }
        log.status = to;
        if error_message.is_some() {
            log.error_message = error_message;
        }
        if to.is_terminal() {
            log.completed_at = Some(Utc::now());
        }
        Ok(true)
    }

    async fn record_simulation(
        &self,
        id: i32,
        result: &SimulationResult,
        status: UpgradeStatus,
        error_message: Option<String>,
    ) -> Result<bool, DbError> {
        let mut state = self.state.lock().unwrap();
        let log = state.logs.get_mut(&id).ok_or_else(|| missing("log", id))?;
        if log.status != UpgradeStatus::Pending {
            return Ok(false);
        }
        log.simulation_result = Some(result.clone());
        log.status = status;
        log.error_message = error_message;
        if status.is_terminal() {
            log.completed_at = Some(Utc::now());
        }
        Ok(true)
    }

    async fn set_tx_hash(&self, id: i32, tx_hash: &str) -> Result<(), DbError> {
        let mut state = self.state.lock().unwrap();
        let log = state.logs.get_mut(&id).ok_or_else(|| missing("log", id))?;
        log.tx_hash = Some(tx_hash.to_string());
        Ok(())
    }

    async fn save_migration_steps(&self, id: i32, steps: &[MigrationStep]) -> Result<(), DbError> {
        let mut state = self.state.lock().unwrap();
        if state.fail_step_saves {
            return Err(DbError::QueryError("step update rejected".to_string()));
        }
        let log = state.logs.get_mut(&id).ok_or_else(|| missing("log", id))?;
        log.migration_steps = steps.to_vec();
        Ok(())
    }

    async fn record_confirmed_upgrade(&self, upgrade: &ConfirmedUpgrade) -> Result<(), DbError> {
        let mut state = self.state.lock().unwrap();
        if state.fail_confirmed_upgrades {
            return Err(DbError::QueryError("registry update rejected".to_string()));
        }
        if !state.logs.contains_key(&upgrade.log_id) {
            return Err(missing("log", upgrade.log_id));
        }
        let contract = state
            .contracts
            .iter_mut()
            .find(|c| c.id == upgrade.registry_id)
            .ok_or_else(|| missing("contract", upgrade.registry_id))?;
        contract.current_code_hash = upgrade.new_code_hash.clone();
        contract.last_upgraded_at = Some(Utc::now());
        contract.last_upgraded_by = Some(upgrade.upgraded_by.clone());

        if let Some(log) = state.logs.get_mut(&upgrade.log_id) {
            log.tx_hash = Some(upgrade.tx_hash.clone());
        }
        Ok(())
    }
}

#[async_trait]
impl EventStore for MemoryStore {
    async fn initialize(&self, stream_key: &str) -> Result<(), DbError> {
        self.state
            .lock()
            .unwrap()
            .checkpoints
            .entry(stream_key.to_string())
            .or_insert_with(|| IndexCheckpoint {
                stream_key: stream_key.to_string(),
                last_ledger_sequence: 0,
                updated_at: Utc::now(),
            });
        Ok(())
    }

    async fn get_checkpoint(&self, stream_key: &str) -> Result<Option<IndexCheckpoint>, DbError> {
        Ok(self.state.lock().unwrap().checkpoints.get(stream_key).cloned())
    }

    async fn insert_events(&self, events: &[NewContractEvent]) -> Result<u64, DbError> {
        let mut state = self.state.lock().unwrap();
        if state.fail_event_inserts {
            return Err(DbError::QueryError("insert rejected".to_string()));
        }

        let mut seen: HashSet<(String, String)> = state
            .events
            .iter()
            .map(|e| (e.event_id.clone(), e.contract_id.clone()))
            .collect();
        let mut inserted = 0;
        for event in events {
            if seen.insert((event.event_id.clone(), event.contract_id.clone())) {
                state.events.push(ContractEvent {
                    event_id: event.event_id.clone(),
                    contract_id: event.contract_id.clone(),
                    event_type: event.event_type.clone(),
                    payload: event.payload.clone(),
                    ledger_sequence: event.ledger_sequence,
                    tx_hash: event.tx_hash.clone(),
                    created_at: Utc::now(),
                });
                inserted += 1;
            }
        }
        Ok(inserted)
    }

    async fn advance_checkpoint(&self, stream_key: &str, ledger_sequence: i64) -> Result<(), DbError> {
        let mut state = self.state.lock().unwrap();
        let checkpoint = state
            .checkpoints
            .entry(stream_key.to_string())
            .or_insert_with(|| IndexCheckpoint {
                stream_key: stream_key.to_string(),
                last_ledger_sequence: 0,
                updated_at: Utc::now(),
            });
        if ledger_sequence > checkpoint.last_ledger_sequence {
            checkpoint.last_ledger_sequence = ledger_sequence;
            checkpoint.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn list_events(
        &self,
        contract_id: &str,
        page: u64,
        limit: u64,
    ) -> Result<Vec<ContractEvent>, DbError> {
        let mut events: Vec<ContractEvent> = self
            .state
            .lock()
            .unwrap()
            .events
            .iter()
            .filter(|e| e.contract_id == contract_id)
            .cloned()
            .collect();
        events.sort_by(|a, b| b.ledger_sequence.cmp(&a.ledger_sequence));
        Ok(events
            .into_iter()
            .skip((page * limit) as usize)
            .take(limit as usize)
            .collect())
    }

    async fn count_events(&self) -> Result<u64, DbError> {
        Ok(self.state.lock().unwrap().events.len() as u64)
    }
}

struct LedgerState {
    entries: HashSet<String>,
    entries_error: Option<LedgerRpcError>,
    simulation: Result<SimulationResponse, LedgerRpcError>,
    simulation_delay: Duration,
    send: Result<SendTransactionResponse, LedgerRpcError>,
    /// Answers to successive status polls; the last one repeats
    statuses: Vec<TransactionStatus>,
    fee_stats: FeeStats,
    events: Vec<LedgerEvent>,
    events_error: Option<LedgerRpcError>,
    events_delay: Duration,
    event_filters: Vec<EventFilter>,
}

/// Scriptable ledger RPC
#[derive(Clone)]
pub struct FakeLedger {
    state: Arc<Mutex<LedgerState>>,
}

impl Default for FakeLedger {
    fn default() -> Self {
        Self {
            state: Arc::new(Mutex::new(LedgerState {
                entries: HashSet::new(),
                entries_error: None,
                simulation: Ok(SimulationResponse {
                    min_resource_fee: 999_900,
                    latest_ledger: 1_000,
                    transaction_data: Some("AAAAAQ==".to_string()),
                    ..Default::default()
                }),
                simulation_delay: Duration::ZERO,
                send: Ok(SendTransactionResponse {
                    hash: "feedbeef".to_string(),
                    status: SendStatus::Pending,
                    error: None,
                }),
                statuses: vec![TransactionStatus::Success { ledger: 1_001 }],
                fee_stats: FeeStats {
                    min: 100,
                    mode: 100,
                    p50: 150,
                    p90: 500,
                    max: 1_000,
                    latest_ledger: 1_000,
                },
                events: Vec::new(),
                events_error: None,
                events_delay: Duration::ZERO,
                event_filters: Vec::new(),
            })),
        }
    }
}

impl FakeLedger {
    /// Ledger that knows the code for `digit` and the funded source account
    pub fn with_code(digit: char) -> Self {
        let ledger = Self::default();
        ledger.add_code(digit);
        ledger.fund_source();
        ledger
    }

    pub fn add_code(&self, digit: char) {
        let key = xdr::contract_code_key(&code_hash(digit)).unwrap();
        self.state.lock().unwrap().entries.insert(key);
    }

    pub fn fund_source(&self) {
        let key = xdr::account_key(FUNDED_SOURCE).unwrap();
        self.state.lock().unwrap().entries.insert(key);
    }

    pub fn fail_entries(&self, error: LedgerRpcError) {
        self.state.lock().unwrap().entries_error = Some(error);
    }

    pub fn set_simulation(&self, simulation: Result<SimulationResponse, LedgerRpcError>) {
        self.state.lock().unwrap().simulation = simulation;
    }

    pub fn delay_simulation(&self, delay: Duration) {
        self.state.lock().unwrap().simulation_delay = delay;
    }

    pub fn set_send(&self, send: Result<SendTransactionResponse, LedgerRpcError>) {
        self.state.lock().unwrap().send = send;
    }

    pub fn set_statuses(&self, statuses: Vec<TransactionStatus>) {
        self.state.lock().unwrap().statuses = statuses;
    }

    pub fn push_events(&self, events: Vec<LedgerEvent>) {
        self.state.lock().unwrap().events.extend(events);
    }

    pub fn fail_events(&self, error: Option<LedgerRpcError>) {
        self.state.lock().unwrap().events_error = error;
    }

    pub fn delay_events(&self, delay: Duration) {
        self.state.lock().unwrap().events_delay = delay;
    }

    pub fn event_filters(&self) -> Vec<EventFilter> {
        self.state.lock().unwrap().event_filters.clone()
    }
}

#[async_trait]
impl LedgerRpc for FakeLedger {
    async fn simulate_transaction(
        &self,
        _transaction: &TransactionEnvelope,
    ) -> Result<SimulationResponse, LedgerRpcError> {
        let delay = self.state.lock().unwrap().simulation_delay;
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        self.state.lock().unwrap().simulation.clone()
    }

    async fn send_transaction(
        &self,
        _transaction: &TransactionEnvelope,
    ) -> Result<SendTransactionResponse, LedgerRpcError> {
        self.state.lock().unwrap().send.clone()
    }

    async fn get_transaction(&self, _hash: &str) -> Result<TransactionStatus, LedgerRpcError> {
        let mut state = self.state.lock().unwrap();
        if state.statuses.len() > 1 {
            Ok(state.statuses.remove(0))
        } else {
            Ok(state
                .statuses
                .first()
                .cloned()
                .unwrap_or(TransactionStatus::NotFound))
        }
    }

    async fn get_ledger_entries(&self, keys: &[String]) -> Result<Vec<LedgerEntry>, LedgerRpcError> {
        let state = self.state.lock().unwrap();
        if let Some(error) = &state.entries_error {
            return Err(error.clone());
        }
        Ok(keys
            .iter()
            .filter(|key| state.entries.contains(*key))
            .map(|key| LedgerEntry {
                key: key.clone(),
                xdr: "AAAA".to_string(),
                last_modified_ledger: 900,
            })
            .collect())
    }

    async fn get_fee_stats(&self) -> Result<FeeStats, LedgerRpcError> {
        Ok(self.state.lock().unwrap().fee_stats.clone())
    }

    /// Malformed events (non-positive ledger) are always delivered
    async fn get_events(&self, filter: &EventFilter) -> Result<EventsPage, LedgerRpcError> {
        let delay = {
            let mut state = self.state.lock().unwrap();
            state.event_filters.push(filter.clone());
            state.events_delay
        };
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let state = self.state.lock().unwrap();
        if let Some(error) = &state.events_error {
            return Err(error.clone());
        }
        let events = state
            .events
            .iter()
            .filter(|e| e.ledger <= 0 || e.ledger >= filter.start_ledger)
            .take(filter.limit as usize)
            .cloned()
            .collect();
        Ok(EventsPage {
            events,
            latest_ledger: 2_000,
        })
    }
}

pub fn ledger_event(id: Option<&str>, contract_id: Option<&str>, ledger: i64) -> LedgerEvent {
    LedgerEvent {
        id: id.map(str::to_string),
        event_type: "contract".to_string(),
        contract_id: contract_id.map(str::to_string),
        ledger,
        ledger_closed_at: Some("2026-01-01T00:00:00Z".to_string()),
        tx_hash: Some(format!("tx{}", ledger)),
        topic: vec!["AAAADwAAAAh0cmFuc2Zlcg==".to_string()],
        value: serde_json::Value::String("AAAAAQ==".to_string()),
    }
}

/// Key holder that wraps envelopes in readable markers
pub struct FakeSigner {
    pub source: Option<String>,
}

impl FakeSigner {
    pub fn funded() -> Self {
        Self {
            source: Some(FUNDED_SOURCE.to_string()),
        }
    }
}

#[async_trait]
impl UpgradeSigner for FakeSigner {
    fn simulation_source(&self) -> Option<String> {
        self.source.clone()
    }

    async fn public_key(&self, secret: &SigningSecret) -> Result<String, SignerError> {
        if secret.expose() == "wrong" {
            return Err(SignerError::InvalidSecret("unrecognised secret".to_string()));
        }
        Ok(FUNDED_SOURCE.to_string())
    }

    async fn build_upgrade(
        &self,
        source: &str,
        invocation: &UpgradeInvocation,
    ) -> Result<TransactionEnvelope, SignerError> {
        Ok(TransactionEnvelope(format!(
            "upgrade:{}:{}:{}",
            source, invocation.contract_address, invocation.new_code_hash
        )))
    }

    async fn assemble(
        &self,
        transaction: &TransactionEnvelope,
        _simulation: &SimulationResponse,
    ) -> Result<TransactionEnvelope, SignerError> {
        Ok(TransactionEnvelope(format!("assembled:{}", transaction.as_str())))
    }

    async fn sign(
        &self,
        transaction: &TransactionEnvelope,
        _secret: &SigningSecret,
        network: Network,
    ) -> Result<TransactionEnvelope, SignerError> {
        Ok(TransactionEnvelope(format!("signed:{}:{}", network, transaction.as_str())))
    }
}

pub fn fast_confirmations() -> UpgradeConfig {
    UpgradeConfig {
        confirm_attempts: 3,
        confirm_interval_ms: 5,
    }
}

pub fn orchestrator(store: &MemoryStore, ledger: &FakeLedger, signer: FakeSigner) -> UpgradeOrchestrator {
    let registry: Arc<dyn RegistryStore> = Arc::new(store.clone());
    let logs: Arc<dyn UpgradeLogStore> = Arc::new(store.clone());
    let rpc: Arc<dyn LedgerRpc> = Arc::new(ledger.clone());
    let runner = MigrationRunner::new(
        logs.clone(),
        registry.clone(),
        default_actions(rpc.clone(), registry.clone()),
    );
    UpgradeOrchestrator::new(
        registry,
        logs,
        rpc,
        Arc::new(signer),
        Arc::new(runner),
        fast_confirmations(),
    )
}

pub fn runner_with(store: &MemoryStore, actions: Vec<Arc<dyn MigrationAction>>) -> MigrationRunner {
    MigrationRunner::new(Arc::new(store.clone()), Arc::new(store.clone()), actions)
}

/// Poll until the log reaches `status` or the deadline passes
pub async fn wait_for_status(
    orchestrator: &UpgradeOrchestrator,
    log_id: i32,
    status: UpgradeStatus,
    timeout: Duration,
) -> UpgradeLog {
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        let log = orchestrator.get_upgrade_status(log_id).await.unwrap();
        if log.status == status || tokio::time::Instant::now() >= deadline {
            return log;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}
