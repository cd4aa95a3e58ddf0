//! Store adapters implementing the credential and board contracts.

pub mod in_memory;
pub mod postgres;
pub mod schema;

pub use in_memory::InMemoryStore;
pub use postgres::PostgresStore;
