use sea_orm_migration::prelude::*;

use crate::m20250601_000001_create_contract_registry::ContractRegistry;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(UpgradeLogs::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(UpgradeLogs::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(UpgradeLogs::RegistryId).integer().not_null())
                    .col(
                        ColumnDef::new(UpgradeLogs::PreviousCodeHash)
                            .string_len(64)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(UpgradeLogs::NewCodeHash)
                            .string_len(64)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(UpgradeLogs::Status)
                            .string_len(16)
                            .not_null()
                            .default("pending"),
                    )
                    .col(ColumnDef::new(UpgradeLogs::SimulationResult).json_binary().null())
                    .col(ColumnDef::new(UpgradeLogs::TxHash).string().null())
                    .col(
                        ColumnDef::new(UpgradeLogs::MigrationSteps)
                            .json_binary()
                            .not_null(),
                    )
                    .col(ColumnDef::new(UpgradeLogs::InitiatedBy).string().not_null())
                    .col(ColumnDef::new(UpgradeLogs::Notes).text().null())
                    .col(ColumnDef::new(UpgradeLogs::ErrorMessage).text().null())
                    .col(
                        ColumnDef::new(UpgradeLogs::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(UpgradeLogs::CompletedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_upgrade_logs_registry")
                            .from(UpgradeLogs::Table, UpgradeLogs::RegistryId)
                            .to(ContractRegistry::Table, ContractRegistry::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .check(
                        Expr::col(UpgradeLogs::PreviousCodeHash)
                            .ne(Expr::col(UpgradeLogs::NewCodeHash)),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("upgrade_logs_registry_created")
                    .table(UpgradeLogs::Table)
                    .col(UpgradeLogs::RegistryId)
                    .col(UpgradeLogs::CreatedAt)
                    .if_not_exists()
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(UpgradeLogs::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum UpgradeLogs {
    Table,
    Id,
    RegistryId,
    PreviousCodeHash,
    NewCodeHash,
    Status,
    SimulationResult,
    TxHash,
    MigrationSteps,
    InitiatedBy,
    Notes,
    ErrorMessage,
    CreatedAt,
    CompletedAt,
}
