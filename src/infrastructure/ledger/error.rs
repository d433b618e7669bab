use std::error::Error;
use std::fmt;

/// Represents errors that can occur in ledger RPC operations
#[derive(Debug, Clone)]
pub enum LedgerRpcError {
    /// The endpoint could not be reached or the request timed out
    NetworkError(String),
    /// The RPC answered with a JSON-RPC error object
    RpcError { code: i64, message: String },
    /// The response did not have the expected shape
    ParseError(String),
    /// Invalid input supplied by the caller
    InvalidRequest(String),
}

impl LedgerRpcError {
    /// True when the ledger could not be consulted at all, as opposed to
    /// answering with an error
    pub fn is_unreachable(&self) -> bool {
        matches!(self, LedgerRpcError::NetworkError(_))
    }
}

impl fmt::Display for LedgerRpcError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LedgerRpcError::NetworkError(msg) => write!(f, "Network error: {}", msg),
            LedgerRpcError::RpcError { code, message } => {
                write!(f, "RPC error {}: {}", code, message)
            }
            LedgerRpcError::ParseError(msg) => write!(f, "Parse error: {}", msg),
            LedgerRpcError::InvalidRequest(msg) => write!(f, "Invalid request: {}", msg),
        }
    }
}

impl Error for LedgerRpcError {}

impl From<reqwest::Error> for LedgerRpcError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_decode() {
            LedgerRpcError::ParseError(error.to_string())
        } else {
            LedgerRpcError::NetworkError(error.to_string())
        }
    }
}

impl From<serde_json::Error> for LedgerRpcError {
    fn from(error: serde_json::Error) -> Self {
        LedgerRpcError::ParseError(error.to_string())
    }
}

/// Errors returned by the external key holder
#[derive(Debug, Clone)]
pub enum SignerError {
    /// The key holder could not be reached
    Unavailable(String),
    /// The key holder refused the request
    Rejected(String),
    /// The signing secret is malformed
    InvalidSecret(String),
}

impl fmt::Display for SignerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SignerError::Unavailable(msg) => write!(f, "Key holder unavailable: {}", msg),
            SignerError::Rejected(msg) => write!(f, "Key holder rejected request: {}", msg),
            SignerError::InvalidSecret(msg) => write!(f, "Invalid signing secret: {}", msg),
        }
    }
}

impl Error for SignerError {}

impl From<reqwest::Error> for SignerError {
    fn from(error: reqwest::Error) -> Self {
        SignerError::Unavailable(error.to_string())
    }
}
