pub mod connection;
pub mod keys;
pub mod memory;
pub mod migrations;
pub mod postgres;
pub mod store;

pub use connection::{get_db_pool, DatabaseConfig};
pub use memory::MemoryDocumentStore;
pub use postgres::PgDocumentStore;
pub use store::{CommitOutcome, DocumentStore, KeyVersion, Mutation, Precondition, Versioned, WriteBatch};
