//! Signing capability backed by an external key holder.
//!
//! The key holder owns account sequence numbers and envelope assembly, so the
//! orchestrator only ever handles opaque XDR strings.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

use crate::config::SignerConfig;
use crate::domain::models::{CodeHash, Network};
use crate::infrastructure::ledger::client::{SimulationResponse, TransactionEnvelope};
use crate::infrastructure::ledger::error::SignerError;

/// Secret handed over by the operator for one execution; never logged
#[derive(Clone)]
pub struct SigningSecret(String);

impl SigningSecret {
    pub fn new(secret: impl Into<String>) -> Result<Self, SignerError> {
        let secret = secret.into();
        if secret.trim().is_empty() {
            return Err(SignerError::InvalidSecret("empty secret".to_string()));
        }
        Ok(Self(secret))
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for SigningSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SigningSecret(***)")
    }
}

/// The `upgrade(new_wasm_hash)` invocation against a deployed contract
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpgradeInvocation {
    pub contract_address: String,
    pub new_code_hash: CodeHash,
    pub network: Network,
}

#[async_trait]
pub trait UpgradeSigner: Send + Sync {
    /// Account used as source for dry runs when no secret is available
    fn simulation_source(&self) -> Option<String>;

    /// Public account id controlled by `secret`
    async fn public_key(&self, secret: &SigningSecret) -> Result<String, SignerError>;

    /// Unsigned transaction invoking the upgrade, sourced from `source`
    async fn build_upgrade(
        &self,
        source: &str,
        invocation: &UpgradeInvocation,
    ) -> Result<TransactionEnvelope, SignerError>;

    /// Attach the footprint and resource fee from a dry run
    async fn assemble(
        &self,
        transaction: &TransactionEnvelope,
        simulation: &SimulationResponse,
    ) -> Result<TransactionEnvelope, SignerError>;

    async fn sign(
        &self,
        transaction: &TransactionEnvelope,
        secret: &SigningSecret,
        network: Network,
    ) -> Result<TransactionEnvelope, SignerError>;
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct BuildUpgradeRequest<'a> {
    source: &'a str,
    contract_id: &'a str,
    wasm_hash: &'a str,
    network: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AssembleRequest<'a> {
    transaction: &'a str,
    transaction_data: Option<&'a str>,
    min_resource_fee: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SignRequest<'a> {
    transaction: &'a str,
    secret: &'a str,
    network: &'a str,
}

#[derive(Serialize)]
struct PublicKeyRequest<'a> {
    secret: &'a str,
}

#[derive(Deserialize)]
struct TransactionReply {
    transaction: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PublicKeyReply {
    public_key: String,
}

/// HTTP client for the key holder service
#[derive(Debug)]
pub struct KeyHolderSigner {
    base_url: String,
    simulation_source: Option<String>,
    client: Client,
}

impl KeyHolderSigner {
    pub fn new(config: &SignerConfig) -> Result<Self, SignerError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(15))
            .build()
            .map_err(|e| SignerError::Unavailable(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            base_url: config.url.trim_end_matches('/').to_string(),
            simulation_source: config.simulation_source.clone(),
            client,
        })
    }

    async fn post<B: Serialize + ?Sized, R: for<'de> Deserialize<'de>>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<R, SignerError> {
        let url = format!("{}{}", self.base_url, path);
        let response = self.client.post(&url).json(body).send().await?;
        let status = response.status();

        if status.is_client_error() {
            let detail = response.text().await.unwrap_or_default();
            return Err(SignerError::Rejected(format!("{} {}: {}", path, status, detail)));
        }
        if !status.is_success() {
            return Err(SignerError::Unavailable(format!("{} returned {}", path, status)));
        }

        response
            .json::<R>()
            .await
            .map_err(|e| SignerError::Rejected(format!("unreadable reply from {}: {}", path, e)))
    }
}

#[async_trait]
impl UpgradeSigner for KeyHolderSigner {
    fn simulation_source(&self) -> Option<String> {
        self.simulation_source.clone()
    }

    async fn public_key(&self, secret: &SigningSecret) -> Result<String, SignerError> {
        let reply: PublicKeyReply = self
            .post("/v1/public-key", &PublicKeyRequest { secret: secret.expose() })
            .await?;
        Ok(reply.public_key)
    }

    async fn build_upgrade(
        &self,
        source: &str,
        invocation: &UpgradeInvocation,
    ) -> Result<TransactionEnvelope, SignerError> {
        let reply: TransactionReply = self
            .post(
                "/v1/transactions/upgrade",
                &BuildUpgradeRequest {
                    source,
                    contract_id: &invocation.contract_address,
                    wasm_hash: invocation.new_code_hash.as_str(),
                    network: invocation.network.as_str(),
                },
            )
            .await?;
        Ok(TransactionEnvelope(reply.transaction))
    }

    async fn assemble(
        &self,
        transaction: &TransactionEnvelope,
        simulation: &SimulationResponse,
    ) -> Result<TransactionEnvelope, SignerError> {
        let reply: TransactionReply = self
            .post(
                "/v1/transactions/assemble",
                &AssembleRequest {
                    transaction: transaction.as_str(),
                    transaction_data: simulation.transaction_data.as_deref(),
                    min_resource_fee: simulation.min_resource_fee.to_string(),
                },
            )
            .await?;
        Ok(TransactionEnvelope(reply.transaction))
    }

    async fn sign(
        &self,
        transaction: &TransactionEnvelope,
        secret: &SigningSecret,
        network: Network,
    ) -> Result<TransactionEnvelope, SignerError> {
        let reply: TransactionReply = self
            .post(
                "/v1/transactions/sign",
                &SignRequest {
                    transaction: transaction.as_str(),
                    secret: secret.expose(),
                    network: network.as_str(),
                },
            )
            .await?;
        Ok(TransactionEnvelope(reply.transaction))
    }
}
