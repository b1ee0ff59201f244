//! Store abstraction layer
//!
//! The sync pipeline talks to persistence only through the [`Store`] trait,
//! so the PostgreSQL and in-memory backends are interchangeable.

pub mod factory;
pub mod traits;

pub use factory::create_store;
pub use traits::{Store, StoreCounts, WriteOutcome};
