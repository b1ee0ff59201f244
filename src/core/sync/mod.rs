//! Sync orchestration
//!
//! [`SyncCoordinator`] runs the reference and measurement stages in order,
//! retrying transient fetch failures and stopping cleanly at page boundaries
//! when shutdown is requested.

pub mod coordinator;
pub mod phase;
pub mod retry;
pub mod summary;
pub mod writer;

pub use coordinator::{SyncCoordinator, SyncOptions};
pub use phase::SyncPhase;
pub use retry::RetryPolicy;
pub use summary::{FailureKind, MeasurementCounts, ReferenceCounts, SyncFailure, SyncSummary};
pub use writer::{LocationWrite, MeasurementWrite, UpsertWriter};
