//! `boardroom-core`: shared identifiers and error primitives.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns).

pub mod error;
pub mod id;

pub use error::{DomainError, StoreError};
pub use id::{BoardId, UserId};
