//! Infrastructure layer: persistence adapters for users, boards and memberships.

pub mod store;


pub use store::{InMemoryStore, PostgresStore};
