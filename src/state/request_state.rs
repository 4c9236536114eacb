//! Lifecycle of a queued request
//!
//! `Pending → InProgress → Handled | Failed`, with `InProgress → Pending` when a
//! request is reclaimed for retry or recovered after an interrupted run.

use std::fmt;

/// Current state of a request in the queue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestState {
    /// Waiting to be fetched
    Pending,

    /// Taken by a worker
    InProgress,

    /// Processed successfully
    Handled,

    /// Gave up after exhausting retries
    Failed,
}

impl RequestState {
    /// Converts the state to its database string representation
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::InProgress => "in_progress",
            Self::Handled => "handled",
            Self::Failed => "failed",
        }
    }

    /// Parses a state from its database string representation
    ///
    /// Returns None if the string doesn't match any known state.
    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "in_progress" => Some(Self::InProgress),
            "handled" => Some(Self::Handled),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}

impl fmt::Display for RequestState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_string())
    }
}
