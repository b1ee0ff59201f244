//! PostgreSQL store
//!
//! Tables are created by `migrations/001_initial_schema.sql`, which is
//! embedded in the binary and applied by `ensure_schema`.

pub mod adapter;
pub mod client;
pub mod models;

pub use adapter::PostgreSQLAdapter;
pub use client::{redact_connection_string, PostgreSQLClient};
