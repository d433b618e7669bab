use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(ContractRegistry::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ContractRegistry::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(ContractRegistry::Name)
                            .string()
                            .not_null()
                            .unique_key(),
                    )
                    .col(
                        ColumnDef::new(ContractRegistry::Network)
                            .string_len(16)
                            .not_null()
                            .default("TESTNET"),
                    )
                    .col(
                        ColumnDef::new(ContractRegistry::ContractAddress)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ContractRegistry::CurrentCodeHash)
                            .string_len(64)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ContractRegistry::Version)
                            .string()
                            .not_null()
                            .default("0.1.0"),
                    )
                    .col(
                        ColumnDef::new(ContractRegistry::LastUpgradedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(ColumnDef::new(ContractRegistry::LastUpgradedBy).string().null())
                    .col(
                        ColumnDef::new(ContractRegistry::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("contract_registry_network_address")
                    .table(ContractRegistry::Table)
                    .col(ContractRegistry::Network)
                    .col(ContractRegistry::ContractAddress)
                    .if_not_exists()
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(ContractRegistry::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
pub enum ContractRegistry {
    Table,
    Id,
    Name,
    Network,
    ContractAddress,
    CurrentCodeHash,
    Version,
    LastUpgradedAt,
    LastUpgradedBy,
    CreatedAt,
}
