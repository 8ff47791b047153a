//! defgraph Store - Persistence and queries for definition graphs
//!
//! - [`Database`]: the SQLite connection and schema helpers
//! - [`KeyValueStore`]: build metadata
//! - [`GraphWriter`]: accumulates, resolves and saves a graph
//! - [`GraphReader`]: counts, snapshots and ego-networks
//! - [`DictionaryGraph`]: one dictionary's graph with version-gated rebuilds

pub mod database;
pub mod dictionary;
pub mod metadata;
pub mod reader;
pub mod writer;

pub use database::Database;
pub use dictionary::{needs_rebuild, DictionaryGraph};
pub use metadata::KeyValueStore;
pub use reader::GraphReader;
pub use writer::GraphWriter;
