//! Post-upgrade checks run after the ledger confirms an upgrade

use anyhow::{anyhow, bail, Context};
use async_trait::async_trait;
use std::sync::Arc;

use super::migration::{MigrationAction, MigrationContext};
use super::validation::check_code_on_chain;
use crate::infrastructure::ledger::{EventFilter, LedgerRpc, TransactionStatus};
use crate::infrastructure::persistence::RegistryStore;

pub const VERIFY_CODE_ON_CHAIN: &str = "verify_code_on_chain";
pub const VERIFY_TRANSACTION_RESULT: &str = "verify_transaction_result";
pub const VERIFY_REGISTRY_HASH: &str = "verify_registry_hash";
pub const REFRESH_EVENT_STREAM: &str = "refresh_event_stream";

/// Default step list, in execution order
pub fn default_actions(
    ledger: Arc<dyn LedgerRpc>,
    registry: Arc<dyn RegistryStore>,
) -> Vec<Arc<dyn MigrationAction>> {
    vec![
        Arc::new(VerifyCodeOnChain {
            ledger: ledger.clone(),
        }),
        Arc::new(VerifyTransactionResult {
            ledger: ledger.clone(),
        }),
        Arc::new(VerifyRegistryHash { registry }),
        Arc::new(RefreshEventStream { ledger }),
    ]
}

async fn confirmation_ledger(ledger: &dyn LedgerRpc, ctx: &MigrationContext) -> anyhow::Result<u32> {
    let tx_hash = ctx
        .log
        .tx_hash
        .as_deref()
        .ok_or_else(|| anyhow!("upgrade log {} has no transaction hash", ctx.log.id))?;

    match ledger
        .get_transaction(tx_hash)
        .await
        .with_context(|| format!("looking up transaction {}", tx_hash))?
    {
        TransactionStatus::Success { ledger } => Ok(ledger),
        TransactionStatus::Failed { reason, .. } => {
            bail!("transaction {} failed on-chain: {}", tx_hash, reason)
        }
        other => bail!("transaction {} is not final: {:?}", tx_hash, other),
    }
}

pub struct VerifyCodeOnChain {
    ledger: Arc<dyn LedgerRpc>,
}

#[async_trait]
impl MigrationAction for VerifyCodeOnChain {
    fn name(&self) -> &str {
        VERIFY_CODE_ON_CHAIN
    }

    async fn run(&self, ctx: &MigrationContext) -> anyhow::Result<String> {
        let hash = &ctx.log.new_code_hash;
        let present = check_code_on_chain(self.ledger.as_ref(), hash)
            .await
            .context("looking up contract code entry")?;
        if !present {
            bail!("code {} not found on-chain", hash);
        }
        Ok(format!("code {} present on-chain", hash))
    }
}

pub struct VerifyTransactionResult {
    ledger: Arc<dyn LedgerRpc>,
}

#[async_trait]
impl MigrationAction for VerifyTransactionResult {
    fn name(&self) -> &str {
        VERIFY_TRANSACTION_RESULT
    }

    async fn run(&self, ctx: &MigrationContext) -> anyhow::Result<String> {
        let ledger = confirmation_ledger(self.ledger.as_ref(), ctx).await?;
        Ok(format!("transaction confirmed in ledger {}", ledger))
    }
}

pub struct VerifyRegistryHash {
    registry: Arc<dyn RegistryStore>,
}

#[async_trait]
impl MigrationAction for VerifyRegistryHash {
    fn name(&self) -> &str {
        VERIFY_REGISTRY_HASH
    }

    async fn run(&self, ctx: &MigrationContext) -> anyhow::Result<String> {
        let contract = self
            .registry
            .get_contract(ctx.contract.id)
            .await?
            .ok_or_else(|| anyhow!("contract {} no longer registered", ctx.contract.id))?;

        if contract.current_code_hash != ctx.log.new_code_hash {
            bail!(
                "registry carries {} instead of {}",
                contract.current_code_hash,
                ctx.log.new_code_hash
            );
        }
        Ok(format!("registry at {}", contract.current_code_hash))
    }
}

pub struct RefreshEventStream {
    ledger: Arc<dyn LedgerRpc>,
}

#[async_trait]
impl MigrationAction for RefreshEventStream {
    fn name(&self) -> &str {
        REFRESH_EVENT_STREAM
    }

    async fn run(&self, ctx: &MigrationContext) -> anyhow::Result<String> {
        let from_ledger = confirmation_ledger(self.ledger.as_ref(), ctx).await?;
        let page = self
            .ledger
            .get_events(&EventFilter {
                contract_ids: vec![ctx.contract.contract_address.clone()],
                start_ledger: i64::from(from_ledger),
                limit: 1,
            })
            .await
            .context("querying contract events")?;

        Ok(format!(
            "event stream readable from ledger {} (latest {})",
            from_ledger, page.latest_ledger
        ))
    }
}
