//! Repository for contract_registry operations

use async_trait::async_trait;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, QuerySelect};
use std::fmt;

use crate::domain::models::{CodeHash, ContractRegistryEntry, Network};
use crate::infrastructure::persistence::entities::contract_registry;
use crate::infrastructure::persistence::error::DbError;
use crate::infrastructure::persistence::store::RegistryStore;

/// Repository for contract_registry operations
#[derive(Clone)]
pub struct RegistryRepository {
    conn: DatabaseConnection,
}

impl fmt::Debug for RegistryRepository {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegistryRepository").finish_non_exhaustive()
    }
}

impl RegistryRepository {
    /// Create a new RegistryRepository
    pub fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    /// Convert a database entity to a domain model
    pub(crate) fn to_domain_model(
        entity: contract_registry::Model,
    ) -> Result<ContractRegistryEntry, DbError> {
        let network = entity
            .network
            .parse::<Network>()
            .map_err(DbError::DecodeError)?;
        let current_code_hash = CodeHash::parse(&entity.current_code_hash).map_err(|e| {
            DbError::DecodeError(format!("contract {} code hash: {}", entity.id, e))
        })?;

        Ok(ContractRegistryEntry {
            id: entity.id,
            name: entity.name,
            network,
            contract_address: entity.contract_address,
            current_code_hash,
            version: entity.version,
            last_upgraded_at: entity.last_upgraded_at.map(Into::into),
            last_upgraded_by: entity.last_upgraded_by,
        })
    }
}

#[async_trait]
impl RegistryStore for RegistryRepository {
    async fn list_contracts(&self) -> Result<Vec<ContractRegistryEntry>, DbError> {
        let results = contract_registry::Entity::find()
            .order_by_asc(contract_registry::Column::Name)
            .all(&self.conn)
            .await?;

        results.into_iter().map(Self::to_domain_model).collect()
    }

    async fn get_contract(&self, id: i32) -> Result<Option<ContractRegistryEntry>, DbError> {
        contract_registry::Entity::find_by_id(id)
            .one(&self.conn)
            .await?
            .map(Self::to_domain_model)
            .transpose()
    }

    async fn contract_addresses(&self, network: Network) -> Result<Vec<String>, DbError> {
        let addresses: Vec<String> = contract_registry::Entity::find()
            .select_only()
            .column(contract_registry::Column::ContractAddress)
            .filter(contract_registry::Column::Network.eq(network.as_str()))
            .order_by_asc(contract_registry::Column::Id)
            .into_tuple()
            .all(&self.conn)
            .await?;

        Ok(addresses)
    }
}
