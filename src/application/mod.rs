pub mod indexer;
pub mod upgrade;
