use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::CodeHash;

/// Ledger network a contract is deployed on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Network {
    Testnet,
    Mainnet,
}

impl Network {
    pub fn as_str(&self) -> &'static str {
        match self {
            Network::Testnet => "TESTNET",
            Network::Mainnet => "MAINNET",
        }
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Network {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "TESTNET" => Ok(Network::Testnet),
            "MAINNET" | "PUBLIC" => Ok(Network::Mainnet),
            other => Err(format!("unknown network '{}'", other)),
        }
    }
}

/// A deployed contract and the code hash currently live on-chain
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContractRegistryEntry {
    pub id: i32,
    pub name: String,
    pub network: Network,
    pub contract_address: String,
    pub current_code_hash: CodeHash,
    pub version: String,
    pub last_upgraded_at: Option<DateTime<Utc>>,
    pub last_upgraded_by: Option<String>,
}
