//! Sync run state machine

use std::fmt;

/// Phase of a sync run
///
/// A run moves forward through the phases and ends in exactly one of
/// `Done`, `Failed` or `Cancelled`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SyncPhase {
    #[default]
    Idle,
    FetchingReference,
    WritingReference,
    ComputingWatermark,
    FetchingMeasurements,
    WritingMeasurements,
    Done,
    Failed,
    Cancelled,
}

impl SyncPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncPhase::Idle => "idle",
            SyncPhase::FetchingReference => "fetching_reference",
            SyncPhase::WritingReference => "writing_reference",
            SyncPhase::ComputingWatermark => "computing_watermark",
            SyncPhase::FetchingMeasurements => "fetching_measurements",
            SyncPhase::WritingMeasurements => "writing_measurements",
            SyncPhase::Done => "done",
            SyncPhase::Failed => "failed",
            SyncPhase::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SyncPhase::Done | SyncPhase::Failed | SyncPhase::Cancelled
        )
    }

    /// Process exit code for a finished run
    pub fn exit_code(&self) -> i32 {
        match self {
            SyncPhase::Done => 0,
            SyncPhase::Cancelled => 130,
            _ => 1,
        }
    }

    /// Whether moving to `next` only alternates fetch and write of one stage
    pub(crate) fn is_page_step(&self, next: SyncPhase) -> bool {
        matches!(
            (self, next),
            (SyncPhase::FetchingReference, SyncPhase::WritingReference)
                | (SyncPhase::WritingReference, SyncPhase::FetchingReference)
                | (SyncPhase::FetchingMeasurements, SyncPhase::WritingMeasurements)
                | (SyncPhase::WritingMeasurements, SyncPhase::FetchingMeasurements)
        )
    }
}

impl fmt::Display for SyncPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes() {
        assert_eq!(SyncPhase::Done.exit_code(), 0);
        assert_eq!(SyncPhase::Failed.exit_code(), 1);
        assert_eq!(SyncPhase::Cancelled.exit_code(), 130);
    }

    #[test]
    fn test_terminal_phases() {
        assert!(SyncPhase::Done.is_terminal());
        assert!(SyncPhase::Cancelled.is_terminal());
        assert!(!SyncPhase::ComputingWatermark.is_terminal());
    }

    #[test]
    fn test_page_steps() {
        assert!(SyncPhase::FetchingReference.is_page_step(SyncPhase::WritingReference));
        assert!(!SyncPhase::WritingReference.is_page_step(SyncPhase::ComputingWatermark));
    }
}
