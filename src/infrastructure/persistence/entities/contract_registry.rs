//! SeaORM Entity for contract_registry table
//! One row per deployed contract, carrying the code hash live on-chain

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "contract_registry")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(unique)]
    pub name: String,
    pub network: String,
    pub contract_address: String,
    pub current_code_hash: String,
    pub version: String,
    #[sea_orm(column_type = "TimestampWithTimeZone", nullable)]
    pub last_upgraded_at: Option<DateTimeWithTimeZone>,
    #[sea_orm(nullable)]
    pub last_upgraded_by: Option<String>,
    #[sea_orm(column_type = "TimestampWithTimeZone")]
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::upgrade_logs::Entity")]
    UpgradeLogs,
}

impl Related<super::upgrade_logs::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::UpgradeLogs.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
