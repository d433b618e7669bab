use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(ContractEvents::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ContractEvents::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(ContractEvents::EventId).string().not_null())
                    .col(ColumnDef::new(ContractEvents::ContractId).string().not_null())
                    .col(ColumnDef::new(ContractEvents::EventType).string().not_null())
                    .col(ColumnDef::new(ContractEvents::Payload).json_binary().not_null())
                    .col(
                        ColumnDef::new(ContractEvents::LedgerSequence)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(ContractEvents::TxHash).string().null())
                    .col(
                        ColumnDef::new(ContractEvents::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .index(
                        Index::create()
                            .name("contract_events_event_contract_unique")
                            .col(ContractEvents::EventId)
                            .col(ContractEvents::ContractId)
                            .unique(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("contract_events_contract_ledger")
                    .table(ContractEvents::Table)
                    .col(ContractEvents::ContractId)
                    .col(ContractEvents::LedgerSequence)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(IndexCheckpoints::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(IndexCheckpoints::StreamKey)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(IndexCheckpoints::LastLedgerSequence)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(IndexCheckpoints::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(IndexCheckpoints::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(ContractEvents::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum ContractEvents {
    Table,
    Id,
    EventId,
    ContractId,
    EventType,
    Payload,
    LedgerSequence,
    TxHash,
    CreatedAt,
}

#[derive(Iden)]
enum IndexCheckpoints {
    Table,
    StreamKey,
    LastLedgerSequence,
    UpdatedAt,
}
