use std::error::Error;
use std::fmt;

/// Error type for database operations
#[derive(Debug)]
pub enum DbError {
    /// Error from SeaORM
    SeaOrmError(sea_orm::DbErr),
    /// Connection error
    ConnectionError(String),
    /// Query error
    QueryError(String),
    /// A stored value could not be mapped back into a domain type
    DecodeError(String),
    /// Other error
    Other(String),
}

impl fmt::Display for DbError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DbError::SeaOrmError(e) => write!(f, "Database error: {}", e),
            DbError::ConnectionError(msg) => write!(f, "Connection error: {}", msg),
            DbError::QueryError(msg) => write!(f, "Query error: {}", msg),
            DbError::DecodeError(msg) => write!(f, "Decode error: {}", msg),
            DbError::Other(msg) => write!(f, "Error: {}", msg),
        }
    }
}

impl Error for DbError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            DbError::SeaOrmError(e) => Some(e),
            _ => None,
        }
    }
}

impl From<sea_orm::DbErr> for DbError {
    fn from(err: sea_orm::DbErr) -> Self {
        DbError::SeaOrmError(err)
    }
}

impl From<sea_orm::TransactionError<DbError>> for DbError {
    fn from(err: sea_orm::TransactionError<DbError>) -> Self {
        match err {
            sea_orm::TransactionError::Connection(e) => DbError::SeaOrmError(e),
            sea_orm::TransactionError::Transaction(e) => e,
        }
    }
}

impl From<serde_json::Error> for DbError {
    fn from(err: serde_json::Error) -> Self {
        DbError::DecodeError(err.to_string())
    }
}
