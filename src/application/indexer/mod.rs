pub mod event_indexer;

pub use event_indexer::{EventIndexer, PollOutcome};
