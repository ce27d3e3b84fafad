//! Shared type definitions for event data

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Who last wrote the match clock
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum ClockSource {
    /// Elapsed-time hint carried by a poll response
    PollHint,
    /// Posted by an external match-status fetcher
    External,
}

/// Displayed match clock; the most recent write wins regardless of source
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchClock {
    /// Clock text as supplied (e.g. "67'" or "45+2")
    pub value: String,
    pub source: ClockSource,
    pub updated_at: DateTime<Utc>,
}
