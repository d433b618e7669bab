pub mod client;
mod error;
pub mod signer;
mod soroban_rpc;
pub mod xdr;

pub use client::{
    EventFilter, EventsPage, FeeStats, LedgerEntry, LedgerEvent, LedgerRpc, SendStatus,
    SendTransactionResponse, SimulationResponse, TransactionEnvelope, TransactionStatus,
};
pub use error::{LedgerRpcError, SignerError};
pub use signer::{KeyHolderSigner, SigningSecret, UpgradeInvocation, UpgradeSigner};
pub use soroban_rpc::SorobanRpcClient;
