//! Watermark value type
//!
//! A watermark is the latest `observed_at` among stored measurements of a
//! stream. It is always derived from the data and never stored on its own,
//! so it cannot drift from what was actually written.

use crate::domain::StreamKey;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;

/// Resumption point of one stream
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Watermark {
    pub stream: StreamKey,
    /// `None` until the stream has stored measurements
    pub observed_at: Option<DateTime<Utc>>,
}

impl Watermark {
    pub fn new(stream: StreamKey, observed_at: Option<DateTime<Utc>>) -> Self {
        Self {
            stream,
            observed_at,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.observed_at.is_none()
    }
}

impl fmt::Display for Watermark {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.observed_at {
            Some(ts) => write!(f, "{} @ {}", self.stream, ts.to_rfc3339()),
            None => write!(f, "{} (empty)", self.stream),
        }
    }
}
