//! Ledger keys for the entries this crate looks up.
//!
//! Only two `LedgerKey` arms are needed: `Account` (to check the simulation
//! source is funded) and `ContractCode` (to check a code hash is uploaded).

use stellar_strkey::ed25519::PublicKey as StrkeyPublicKey;
use stellar_xdr::curr::{
    AccountId, Hash, LedgerKey, LedgerKeyAccount, LedgerKeyContractCode, Limits, PublicKey,
    Uint256, WriteXdr,
};

use crate::domain::models::CodeHash;
use crate::infrastructure::ledger::error::LedgerRpcError;

/// `LedgerKey::ContractCode { hash }`, base64
pub fn contract_code_key(hash: &CodeHash) -> Result<String, LedgerRpcError> {
    let key = LedgerKey::ContractCode(LedgerKeyContractCode {
        hash: Hash(hash.to_bytes()),
    });
    encode(&key)
}

/// `LedgerKey::Account { account_id }` for a `G...` address, base64
pub fn account_key(account_id: &str) -> Result<String, LedgerRpcError> {
    let public_key = decode_account_id(account_id)?;
    let key = LedgerKey::Account(LedgerKeyAccount {
        account_id: AccountId(PublicKey::PublicKeyTypeEd25519(Uint256(public_key))),
    });
    encode(&key)
}

/// Decode a `G...` strkey into its ed25519 public key
pub fn decode_account_id(account_id: &str) -> Result<[u8; 32], LedgerRpcError> {
    StrkeyPublicKey::from_string(account_id)
        .map(|pk| pk.0)
        .map_err(|e| {
            LedgerRpcError::InvalidRequest(format!("invalid account id {}: {}", account_id, e))
        })
}

fn encode(key: &LedgerKey) -> Result<String, LedgerRpcError> {
    key.to_xdr_base64(Limits::none())
        .map_err(|e| LedgerRpcError::InvalidRequest(format!("ledger key encoding failed: {}", e)))
}
