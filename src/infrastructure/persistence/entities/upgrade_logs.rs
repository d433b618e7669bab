//! SeaORM Entity for upgrade_logs table
//! Migration steps live in a single JSON column and are always rewritten as a unit

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "upgrade_logs")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub registry_id: i32,
    pub previous_code_hash: String,
    pub new_code_hash: String,
    pub status: String,
    #[sea_orm(column_type = "JsonBinary", nullable)]
    pub simulation_result: Option<Value>,
    #[sea_orm(nullable)]
    pub tx_hash: Option<String>,
    #[sea_orm(column_type = "JsonBinary")]
    pub migration_steps: Value,
    pub initiated_by: String,
    #[sea_orm(column_type = "Text", nullable)]
    pub notes: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub error_message: Option<String>,
    #[sea_orm(column_type = "TimestampWithTimeZone")]
    pub created_at: DateTimeWithTimeZone,
    #[sea_orm(column_type = "TimestampWithTimeZone", nullable)]
    pub completed_at: Option<DateTimeWithTimeZone>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::contract_registry::Entity",
        from = "Column::RegistryId",
        to = "super::contract_registry::Column::Id",
        on_delete = "Cascade"
    )]
    ContractRegistry,
}

impl Related<super::contract_registry::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ContractRegistry.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
