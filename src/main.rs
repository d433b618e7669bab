use anyhow::Context;
use std::sync::Arc;

use contract_registry::application::indexer::EventIndexer;
use contract_registry::application::upgrade::{default_actions, MigrationRunner, UpgradeOrchestrator};
use contract_registry::config::AppConfig;
use contract_registry::infrastructure::ledger::{KeyHolderSigner, LedgerRpc, SorobanRpcClient};
use contract_registry::infrastructure::persistence::{
    DbPool, EventStore, RegistryStore, RepositoryFactory, UpgradeLogStore,
};
use contract_registry::utils::logging;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init_logger();

    let config = AppConfig::from_env();
    logging::log_info(&format!(
        "contract-registry v{} starting",
        env!("CARGO_PKG_VERSION")
    ));
    logging::log_ledger_connection_details(&config.ledger.rpc_url, config.ledger.network.as_str());

    let db_pool = DbPool::new(&config)
        .await
        .context("connecting to database")?;
    let repositories = RepositoryFactory::create_repositories(&db_pool);

    let registry: Arc<dyn RegistryStore> = Arc::new(repositories.registry);
    let upgrade_logs: Arc<dyn UpgradeLogStore> = Arc::new(repositories.upgrade_logs);
    let events: Arc<dyn EventStore> = Arc::new(repositories.events);

    let ledger: Arc<dyn LedgerRpc> =
        Arc::new(SorobanRpcClient::new(&config.ledger).context("creating ledger RPC client")?);
    let signer = Arc::new(KeyHolderSigner::new(&config.signer).context("creating key holder client")?);

    let migrations = Arc::new(MigrationRunner::new(
        upgrade_logs.clone(),
        registry.clone(),
        default_actions(ledger.clone(), registry.clone()),
    ));
    let orchestrator = UpgradeOrchestrator::new(
        registry.clone(),
        upgrade_logs,
        ledger.clone(),
        signer,
        migrations,
        config.upgrade.clone(),
    );

    match orchestrator.list_contracts().await {
        Ok(contracts) => logging::log_info(&format!(
            "📋 {} contracts registered",
            contracts.len()
        )),
        Err(e) => logging::log_warning(&format!("Could not read contract registry: {}", e)),
    }

    let indexer = Arc::new(EventIndexer::new(
        events,
        registry,
        ledger,
        config.indexer.clone(),
        config.ledger.network,
    ));
    indexer.initialize().await.context("initializing event indexer")?;
    indexer.start().await;

    tokio::signal::ctrl_c()
        .await
        .context("listening for Ctrl+C")?;

    logging::log_info("Shutting down...");
    indexer.stop().await;
    Ok(())
}
