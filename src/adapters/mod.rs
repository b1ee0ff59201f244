//! External system integrations for airsync.
//!
//! - [`openaq`] - paginated source API ([`openaq::DataSource`])
//! - [`database`] - store abstraction ([`database::Store`]) and factory
//! - [`postgresql`] - PostgreSQL store
//! - [`memory`] - process-local store
//!
//! Adapters isolate third-party clients so the sync core can be exercised
//! with scripted sources and the in-memory store.

pub mod database;
pub mod memory;
pub mod openaq;
pub mod postgresql;
