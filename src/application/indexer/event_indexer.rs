use serde_json::json;
use std::collections::HashSet;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};

use crate::config::IndexerConfig;
use crate::domain::errors::IndexerError;
use crate::domain::models::{ContractEvent, IndexCheckpoint, Network, NewContractEvent};
use crate::infrastructure::ledger::{EventFilter, LedgerEvent, LedgerRpc};
use crate::infrastructure::persistence::{EventStore, RegistryStore};
use crate::utils::logging;

/// What a single poll cycle did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    /// Another cycle was already in flight
    Skipped,
    /// Nothing new on the ledger
    Idle,
    Indexed {
        stored: u64,
        duplicates: u64,
        skipped: u64,
        checkpoint: i64,
    },
    /// The cycle hit an error and left the checkpoint untouched
    Failed(String),
}

/// Clears the in-flight flag when a cycle ends, however it ends
struct CycleGuard<'a>(&'a AtomicBool);

impl Drop for CycleGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Polls contract events from the ledger into the event store, resuming from
/// the stored checkpoint
pub struct EventIndexer {
    events: Arc<dyn EventStore>,
    registry: Arc<dyn RegistryStore>,
    ledger: Arc<dyn LedgerRpc>,
    config: IndexerConfig,
    network: Network,
    in_flight: AtomicBool,
    task: Mutex<Option<JoinHandle<()>>>,
    shutdown: watch::Sender<bool>,
}

impl fmt::Debug for EventIndexer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventIndexer")
            .field("config", &self.config)
            .field("network", &self.network)
            .finish_non_exhaustive()
    }
}

impl EventIndexer {
    pub fn new(
        events: Arc<dyn EventStore>,
        registry: Arc<dyn RegistryStore>,
        ledger: Arc<dyn LedgerRpc>,
        config: IndexerConfig,
        network: Network,
    ) -> Self {
        let (shutdown, _) = watch::channel(false);
        Self {
            events,
            registry,
            ledger,
            config,
            network,
            in_flight: AtomicBool::new(false),
            task: Mutex::new(None),
            shutdown,
        }
    }

    /// Create the event tables and checkpoint row if missing
    pub async fn initialize(&self) -> Result<(), IndexerError> {
        self.events.initialize(&self.config.stream_key).await?;
        logging::log_info(&format!(
            "[INDEXER] Stream '{}' ready",
            self.config.stream_key
        ));
        Ok(())
    }

    /// Start polling on a timer. Does nothing if already running.
    pub async fn start(self: &Arc<Self>) {
        let mut task = self.task.lock().await;
        if task.as_ref().map_or(false, |handle| !handle.is_finished()) {
            logging::log_debug("[INDEXER] Already running");
            return;
        }

        self.shutdown.send_replace(false);
        let mut shutdown = self.shutdown.subscribe();
        let indexer = Arc::clone(self);
        let period = self.config.poll_interval();

        *task = Some(tokio::spawn(async move {
            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                if *shutdown.borrow() {
                    break;
                }
                tokio::select! {
                    biased;
                    _ = shutdown.changed() => break,
                    _ = ticker.tick() => {
                        indexer.poll_once().await;
                    }
                }
            }
            logging::log_info("[INDEXER] Polling loop stopped");
        }));

        logging::log_info(&format!(
            "[INDEXER] 🚀 Polling every {}ms from ledger {}",
            self.config.poll_interval_ms, self.config.start_ledger
        ));
    }

    /// Stop scheduling cycles and wait for the one in flight
    pub async fn stop(&self) {
        self.shutdown.send_replace(true);
        let handle = self.task.lock().await.take();
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                logging::log_error(&format!("[INDEXER] Polling task ended abnormally: {}", e));
            }
        }
    }

    pub async fn is_running(&self) -> bool {
        self.task
            .lock()
            .await
            .as_ref()
            .map_or(false, |handle| !handle.is_finished())
    }

    /// Run one cycle unless another is in flight. Errors are logged and
    /// reported in the outcome, never returned.
    pub async fn poll_once(&self) -> PollOutcome {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            logging::log_debug("[INDEXER] Cycle already in flight, skipping");
            return PollOutcome::Skipped;
        }
        let _guard = CycleGuard(&self.in_flight);

        match self.run_cycle().await {
            Ok(outcome) => outcome,
            Err(e) => {
                logging::log_error(&format!("[INDEXER] ❌ Poll cycle failed: {}", e));
                PollOutcome::Failed(e.to_string())
            }
        }
    }

    pub async fn get_checkpoint(&self) -> Result<Option<IndexCheckpoint>, IndexerError> {
        Ok(self.events.get_checkpoint(&self.config.stream_key).await?)
    }

    /// Stored events for a contract, newest first. `page` starts at 1.
    pub async fn list_events(
        &self,
        contract_id: &str,
        page: u64,
        limit: u64,
    ) -> Result<Vec<ContractEvent>, IndexerError> {
        Ok(self
            .events
            .list_events(contract_id, page.saturating_sub(1), limit.clamp(1, 100))
            .await?)
    }

    /// Configured contract ids, or every registered address on the network
    async fn watched_contracts(&self) -> Result<Vec<String>, IndexerError> {
        if !self.config.contract_ids.is_empty() {
            return Ok(self.config.contract_ids.clone());
        }
        Ok(self.registry.contract_addresses(self.network).await?)
    }

    async fn run_cycle(&self) -> Result<PollOutcome, IndexerError> {
        let contracts = self.watched_contracts().await?;
        if contracts.is_empty() {
            logging::log_debug("[INDEXER] No contracts to watch");
            return Ok(PollOutcome::Idle);
        }

        let checkpoint = self
            .events
            .get_checkpoint(&self.config.stream_key)
            .await?
            .map(|c| c.last_ledger_sequence)
            .unwrap_or(0);
        let start_ledger = (checkpoint + 1).max(self.config.start_ledger);

        let page = self
            .ledger
            .get_events(&EventFilter {
                contract_ids: contracts.clone(),
                start_ledger,
                limit: self.config.page_size,
            })
            .await?;

        if page.events.is_empty() {
            logging::log_debug(&format!(
                "[INDEXER] No events from ledger {} (latest {})",
                start_ledger, page.latest_ledger
            ));
            return Ok(PollOutcome::Idle);
        }

        let watched: HashSet<&str> = contracts.iter().map(String::as_str).collect();
        let fetched = page.events.len() as u64;
        let records: Vec<NewContractEvent> = page
            .events
            .iter()
            .filter_map(|event| to_record(event, &watched))
            .collect();
        let skipped = fetched - records.len() as u64;

        let stored = self.events.insert_events(&records).await?;
        let duplicates = records.len() as u64 - stored;

        let max_ledger = records
            .iter()
            .map(|r| r.ledger_sequence)
            .max()
            .unwrap_or(checkpoint);
        let new_checkpoint = if max_ledger > checkpoint {
            self.events
                .advance_checkpoint(&self.config.stream_key, max_ledger)
                .await?;
            max_ledger
        } else {
            checkpoint
        };

        logging::log_info(&format!(
            "[INDEXER] 📥 {} new, {} duplicate, {} skipped; checkpoint at ledger {}",
            stored, duplicates, skipped, new_checkpoint
        ));

        Ok(PollOutcome::Indexed {
            stored,
            duplicates,
            skipped,
            checkpoint: new_checkpoint,
        })
    }
}

/// Storable form of a ledger event, or None when it cannot be attributed
fn to_record(event: &LedgerEvent, watched: &HashSet<&str>) -> Option<NewContractEvent> {
    let contract_id = event
        .contract_id
        .as_deref()
        .filter(|id| !id.is_empty() && watched.contains(id))?;
    if event.ledger <= 0 {
        return None;
    }

    let event_id = match event.id.as_deref() {
        Some(id) if !id.is_empty() => id.to_string(),
        _ => NewContractEvent::fallback_id(contract_id, event.ledger, event.tx_hash.as_deref()),
    };

    Some(NewContractEvent {
        event_id,
        contract_id: contract_id.to_string(),
        event_type: event.event_type.clone(),
        payload: json!({
            "topic": event.topic,
            "value": event.value,
            "ledgerClosedAt": event.ledger_closed_at,
        }),
        ledger_sequence: event.ledger,
        tx_hash: event.tx_hash.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    fn event(id: Option<&str>, contract: Option<&str>, ledger: i64) -> LedgerEvent {
        LedgerEvent {
            id: id.map(str::to_string),
            event_type: "contract".to_string(),
            contract_id: contract.map(str::to_string),
            ledger,
            ledger_closed_at: None,
            tx_hash: Some("ab12".to_string()),
            topic: vec!["AAAADwAAAAh0cmFuc2Zlcg==".to_string()],
            value: Value::String("AAAAAQ==".to_string()),
        }
    }

    #[test]
    fn unattributable_events_are_dropped() {
        let watched: HashSet<&str> = ["CWATCHED"].into_iter().collect();
        assert!(to_record(&event(Some("1"), None, 10), &watched).is_none());
        assert!(to_record(&event(Some("1"), Some(""), 10), &watched).is_none());
        assert!(to_record(&event(Some("1"), Some("COTHER"), 10), &watched).is_none());
        assert!(to_record(&event(Some("1"), Some("CWATCHED"), 0), &watched).is_none());
    }

    #[test]
    fn missing_id_falls_back_to_composite_key() {
        let watched: HashSet<&str> = ["CWATCHED"].into_iter().collect();
        let record = to_record(&event(None, Some("CWATCHED"), 77), &watched).unwrap();
        assert_eq!(record.event_id, "CWATCHED-77-ab12");
        assert_eq!(record.payload["topic"][0], "AAAADwAAAAh0cmFuc2Zlcg==");
    }
}
