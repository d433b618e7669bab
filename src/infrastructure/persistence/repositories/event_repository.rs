//! Repository for contract_events and index_checkpoints operations

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::sea_query::{Expr, Index, OnConflict};
use sea_orm::{
    ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Schema, Set, TransactionTrait,
};
use std::fmt;

use crate::domain::models::{ContractEvent, IndexCheckpoint, NewContractEvent};
use crate::infrastructure::persistence::entities::{contract_events, index_checkpoints};
use crate::infrastructure::persistence::error::DbError;
use crate::infrastructure::persistence::store::EventStore;

/// Repository for contract event and checkpoint operations
#[derive(Clone)]
pub struct EventRepository {
    conn: DatabaseConnection,
}

impl fmt::Debug for EventRepository {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventRepository").finish_non_exhaustive()
    }
}

impl EventRepository {
    /// Create a new EventRepository
    pub fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    fn to_domain_model(entity: contract_events::Model) -> ContractEvent {
        ContractEvent {
            event_id: entity.event_id,
            contract_id: entity.contract_id,
            event_type: entity.event_type,
            payload: entity.payload,
            ledger_sequence: entity.ledger_sequence,
            tx_hash: entity.tx_hash,
            created_at: entity.created_at.into(),
        }
    }
}

#[async_trait]
impl EventStore for EventRepository {
    async fn initialize(&self, stream_key: &str) -> Result<(), DbError> {
        let backend = self.conn.get_database_backend();
        let schema = Schema::new(backend);

        let mut events_table = schema.create_table_from_entity(contract_events::Entity);
        events_table.if_not_exists();
        self.conn.execute(backend.build(&events_table)).await?;

        let unique_index = Index::create()
            .name("contract_events_event_contract_unique")
            .table(contract_events::Entity)
            .col(contract_events::Column::EventId)
            .col(contract_events::Column::ContractId)
            .unique()
            .if_not_exists()
            .to_owned();
        self.conn.execute(backend.build(&unique_index)).await?;

        let mut checkpoint_table = schema.create_table_from_entity(index_checkpoints::Entity);
        checkpoint_table.if_not_exists();
        self.conn.execute(backend.build(&checkpoint_table)).await?;

        let row = index_checkpoints::ActiveModel {
            stream_key: Set(stream_key.to_string()),
            last_ledger_sequence: Set(0),
            updated_at: Set(Utc::now().into()),
        };
        index_checkpoints::Entity::insert(row)
            .on_conflict(
                OnConflict::column(index_checkpoints::Column::StreamKey)
                    .do_nothing()
                    .to_owned(),
            )
            .exec_without_returning(&self.conn)
            .await?;

        Ok(())
    }

    async fn get_checkpoint(&self, stream_key: &str) -> Result<Option<IndexCheckpoint>, DbError> {
        let result = index_checkpoints::Entity::find_by_id(stream_key.to_string())
            .one(&self.conn)
            .await?;

        Ok(result.map(|row| IndexCheckpoint {
            stream_key: row.stream_key,
            last_ledger_sequence: row.last_ledger_sequence,
            updated_at: row.updated_at.into(),
        }))
    }

    async fn insert_events(&self, events: &[NewContractEvent]) -> Result<u64, DbError> {
        if events.is_empty() {
            return Ok(0);
        }

        let now = Utc::now();
        let models: Vec<contract_events::ActiveModel> = events
            .iter()
            .map(|event| contract_events::ActiveModel {
                event_id: Set(event.event_id.clone()),
                contract_id: Set(event.contract_id.clone()),
                event_type: Set(event.event_type.clone()),
                payload: Set(event.payload.clone()),
                ledger_sequence: Set(event.ledger_sequence),
                tx_hash: Set(event.tx_hash.clone()),
                created_at: Set(now.into()),
                ..Default::default()
            })
            .collect();

        // One statement inside one transaction: either every new row lands or none do
        let txn = self.conn.begin().await?;
        let inserted = contract_events::Entity::insert_many(models)
            .on_conflict(
                OnConflict::columns([
                    contract_events::Column::EventId,
                    contract_events::Column::ContractId,
                ])
                .do_nothing()
                .to_owned(),
            )
            .exec_without_returning(&txn)
            .await?;
        txn.commit().await?;

        Ok(inserted)
    }

    async fn advance_checkpoint(
        &self,
        stream_key: &str,
        ledger_sequence: i64,
    ) -> Result<(), DbError> {
        let now: chrono::DateTime<chrono::FixedOffset> = Utc::now().into();

        let row = index_checkpoints::ActiveModel {
            stream_key: Set(stream_key.to_string()),
            last_ledger_sequence: Set(ledger_sequence),
            updated_at: Set(now),
        };

        // Forward-only: an older value never overwrites a newer one
        index_checkpoints::Entity::insert(row)
            .on_conflict(
                OnConflict::column(index_checkpoints::Column::StreamKey)
                    .update_columns([
                        index_checkpoints::Column::LastLedgerSequence,
                        index_checkpoints::Column::UpdatedAt,
                    ])
                    .action_and_where(
                        Expr::col((
                            index_checkpoints::Entity,
                            index_checkpoints::Column::LastLedgerSequence,
                        ))
                        .lt(ledger_sequence),
                    )
                    .to_owned(),
            )
            .exec_without_returning(&self.conn)
            .await?;

        Ok(())
    }

    async fn list_events(
        &self,
        contract_id: &str,
        page: u64,
        limit: u64,
    ) -> Result<Vec<ContractEvent>, DbError> {
        let rows = contract_events::Entity::find()
            .filter(contract_events::Column::ContractId.eq(contract_id))
            .order_by_desc(contract_events::Column::LedgerSequence)
            .order_by_desc(contract_events::Column::Id)
            .paginate(&self.conn, limit.max(1))
            .fetch_page(page)
            .await?;

        Ok(rows.into_iter().map(Self::to_domain_model).collect())
    }

    async fn count_events(&self) -> Result<u64, DbError> {
        let count = contract_events::Entity::find().count(&self.conn).await?;
        Ok(count)
    }
}
