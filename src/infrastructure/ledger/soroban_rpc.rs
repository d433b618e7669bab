//! Soroban JSON-RPC client

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use crate::config::LedgerConfig;
use crate::domain::models::ResourceCost;
use crate::infrastructure::ledger::client::{
    EventFilter, EventsPage, FeeStats, LedgerEntry, LedgerEvent, LedgerRpc, SendStatus,
    SendTransactionResponse, SimulationResponse, TransactionEnvelope, TransactionStatus,
};
use crate::infrastructure::ledger::error::LedgerRpcError;

/// getEvents accepts at most this many contract ids per filter
const CONTRACT_IDS_PER_FILTER: usize = 5;

/// JSON-RPC client for a Soroban RPC endpoint
#[derive(Debug)]
pub struct SorobanRpcClient {
    endpoint: String,
    client: Client,
    request_id: AtomicU64,
}

impl SorobanRpcClient {
    /// Create a new client for the configured endpoint
    pub fn new(config: &LedgerConfig) -> Result<Self, LedgerRpcError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .connect_timeout(Duration::from_secs(5))
            .build()
            .map_err(|e| {
                LedgerRpcError::NetworkError(format!("Failed to create HTTP client: {}", e))
            })?;

        Ok(Self {
            endpoint: config.rpc_url.clone(),
            client,
            request_id: AtomicU64::new(1),
        })
    }

    /// Make a JSON-RPC call
    async fn rpc_call(&self, method: &str, params: Value) -> Result<Value, LedgerRpcError> {
        let request_body = json!({
            "jsonrpc": "2.0",
            "id": self.request_id.fetch_add(1, Ordering::Relaxed),
            "method": method,
            "params": params
        });

        let response = self
            .client
            .post(&self.endpoint)
            .json(&request_body)
            .send()
            .await?;

        let status = response.status();
        if status.is_server_error() {
            return Err(LedgerRpcError::NetworkError(format!(
                "{} returned HTTP {}",
                method, status
            )));
        }

        let response_json: Value = response.json().await?;

        if let Some(error) = response_json.get("error") {
            return Err(LedgerRpcError::RpcError {
                code: error.get("code").and_then(Value::as_i64).unwrap_or(-1),
                message: error
                    .get("message")
                    .and_then(Value::as_str)
                    .unwrap_or("unknown error")
                    .to_string(),
            });
        }

        response_json
            .get("result")
            .cloned()
            .ok_or_else(|| LedgerRpcError::ParseError(format!("No result in {} response", method)))
    }
}

/// Stroop amounts arrive either as JSON strings or numbers
fn as_u64(value: Option<&Value>) -> Option<u64> {
    match value? {
        Value::String(s) => s.parse().ok(),
        Value::Number(n) => n.as_u64(),
        _ => None,
    }
}

/// Ledger sequence field; absent is `None`, anything outside `u32` is an error
fn ledger_number(value: Option<&Value>, field: &str) -> Result<Option<u32>, LedgerRpcError> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(raw) => as_u64(Some(raw))
            .and_then(|n| u32::try_from(n).ok())
            .map(Some)
            .ok_or_else(|| {
                LedgerRpcError::ParseError(format!("{} is not a ledger number: {}", field, raw))
            }),
    }
}

fn as_string(value: Option<&Value>) -> Option<String> {
    value
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn parse_simulation(result: &Value) -> Result<SimulationResponse, LedgerRpcError> {
    let cost = result.get("cost").map(|cost| ResourceCost {
        cpu_instructions: as_u64(cost.get("cpuInsns")).unwrap_or_default(),
        memory_bytes: as_u64(cost.get("memBytes")).unwrap_or_default(),
        read_bytes: 0,
        write_bytes: 0,
    });

    Ok(SimulationResponse {
        min_resource_fee: as_u64(result.get("minResourceFee")).unwrap_or_default(),
        cost,
        transaction_data: as_string(result.get("transactionData")),
        restore_required: result.get("restorePreamble").is_some_and(|v| !v.is_null()),
        error: as_string(result.get("error")),
        latest_ledger: ledger_number(result.get("latestLedger"), "latestLedger")?
            .unwrap_or_default(),
    })
}

fn parse_send(result: &Value) -> Result<SendTransactionResponse, LedgerRpcError> {
    let hash = as_string(result.get("hash"))
        .ok_or_else(|| LedgerRpcError::ParseError("sendTransaction without hash".to_string()))?;
    let status = match result.get("status").and_then(Value::as_str) {
        Some("PENDING") => SendStatus::Pending,
        Some("DUPLICATE") => SendStatus::Duplicate,
        Some("TRY_AGAIN_LATER") => SendStatus::TryAgainLater,
        Some("ERROR") => SendStatus::Error,
        other => {
            return Err(LedgerRpcError::ParseError(format!(
                "unknown sendTransaction status {:?}",
                other
            )))
        }
    };

    Ok(SendTransactionResponse {
        hash,
        status,
        error: as_string(result.get("errorResultXdr")),
    })
}

fn parse_transaction_status(result: &Value) -> Result<TransactionStatus, LedgerRpcError> {
    let ledger = ledger_number(result.get("ledger"), "ledger")?;
    match result.get("status").and_then(Value::as_str) {
        Some("NOT_FOUND") => Ok(TransactionStatus::NotFound),
        Some("PENDING") => Ok(TransactionStatus::Pending),
        Some("SUCCESS") => Ok(TransactionStatus::Success {
            ledger: ledger.unwrap_or_default(),
        }),
        Some("FAILED") => Ok(TransactionStatus::Failed {
            ledger,
            reason: as_string(result.get("resultXdr"))
                .unwrap_or_else(|| "transaction failed".to_string()),
        }),
        other => Err(LedgerRpcError::ParseError(format!(
            "unknown getTransaction status {:?}",
            other
        ))),
    }
}

fn parse_ledger_entry(entry: &Value) -> Result<LedgerEntry, LedgerRpcError> {
    Ok(LedgerEntry {
        key: as_string(entry.get("key")).unwrap_or_default(),
        xdr: as_string(entry.get("xdr")).unwrap_or_default(),
        last_modified_ledger: ledger_number(
            entry.get("lastModifiedLedgerSeq"),
            "lastModifiedLedgerSeq",
        )?
        .unwrap_or_default(),
    })
}

fn parse_event(raw: &Value) -> LedgerEvent {
    LedgerEvent {
        id: as_string(raw.get("id")),
        event_type: as_string(raw.get("type")).unwrap_or_else(|| "contract".to_string()),
        contract_id: as_string(raw.get("contractId")),
        ledger: raw.get("ledger").and_then(Value::as_i64).unwrap_or_default(),
        ledger_closed_at: as_string(raw.get("ledgerClosedAt")),
        tx_hash: as_string(raw.get("txHash")),
        topic: raw
            .get("topic")
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(|t| t.as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default(),
        value: raw.get("value").cloned().unwrap_or(Value::Null),
    }
}

#[async_trait]
impl LedgerRpc for SorobanRpcClient {
    async fn simulate_transaction(
        &self,
        transaction: &TransactionEnvelope,
    ) -> Result<SimulationResponse, LedgerRpcError> {
        let result = self
            .rpc_call(
                "simulateTransaction",
                json!({ "transaction": transaction.as_str() }),
            )
            .await?;
        parse_simulation(&result)
    }

    async fn send_transaction(
        &self,
        transaction: &TransactionEnvelope,
    ) -> Result<SendTransactionResponse, LedgerRpcError> {
        let result = self
            .rpc_call("sendTransaction", json!({ "transaction": transaction.as_str() }))
            .await?;
        parse_send(&result)
    }

    async fn get_transaction(&self, hash: &str) -> Result<TransactionStatus, LedgerRpcError> {
        let result = self.rpc_call("getTransaction", json!({ "hash": hash })).await?;
        parse_transaction_status(&result)
    }

    async fn get_ledger_entries(&self, keys: &[String]) -> Result<Vec<LedgerEntry>, LedgerRpcError> {
        let result = self
            .rpc_call("getLedgerEntries", json!({ "keys": keys }))
            .await?;

        result
            .get("entries")
            .and_then(Value::as_array)
            .map(|entries| entries.iter().map(parse_ledger_entry).collect())
            .unwrap_or_else(|| Ok(Vec::new()))
    }

    async fn get_fee_stats(&self) -> Result<FeeStats, LedgerRpcError> {
        let result = self.rpc_call("getFeeStats", json!({})).await?;
        let fees = result
            .get("sorobanInclusionFee")
            .or_else(|| result.get("inclusionFee"))
            .ok_or_else(|| LedgerRpcError::ParseError("getFeeStats without fees".to_string()))?;

        Ok(FeeStats {
            min: as_u64(fees.get("min")).unwrap_or_default(),
            mode: as_u64(fees.get("mode")).unwrap_or_default(),
            p50: as_u64(fees.get("p50")).unwrap_or_default(),
            p90: as_u64(fees.get("p90")).unwrap_or_default(),
            max: as_u64(fees.get("max")).unwrap_or_default(),
            latest_ledger: ledger_number(result.get("latestLedger"), "latestLedger")?
                .unwrap_or_default(),
        })
    }

    async fn get_events(&self, filter: &EventFilter) -> Result<EventsPage, LedgerRpcError> {
        if filter.contract_ids.is_empty() {
            return Ok(EventsPage::default());
        }

        let filters: Vec<Value> = filter
            .contract_ids
            .chunks(CONTRACT_IDS_PER_FILTER)
            .map(|ids| json!({ "type": "contract", "contractIds": ids }))
            .collect();

        let result = self
            .rpc_call(
                "getEvents",
                json!({
                    "startLedger": filter.start_ledger,
                    "filters": filters,
                    "pagination": { "limit": filter.limit }
                }),
            )
            .await?;

        let events = result
            .get("events")
            .and_then(Value::as_array)
            .map(|events| events.iter().map(parse_event).collect())
            .unwrap_or_default();

        Ok(EventsPage {
            events,
            latest_ledger: ledger_number(result.get("latestLedger"), "latestLedger")?
                .unwrap_or_default(),
        })
    }
}
