//! Poll cycle state types
//!
//! The controller's view of a single poll ([`PollOutcome`]), the time window
//! it requests ([`TimeWindow`]), and the state it carries across polls
//! ([`SyncRunState`], [`ControllerState`]).

use std::fmt;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::errors::DomainError;
use super::event::Event;

/// Timestamp format used by the upstream API for filters and event times
pub const UPSTREAM_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

// ============================================================================
// TimeWindow
// ============================================================================

/// A `[from, to)` range on the events' last-seen time
///
/// Both bounds always travel together; a request either carries a complete
/// window or none at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    from: NaiveDateTime,
    to: NaiveDateTime,
}

impl TimeWindow {
    /// Creates a window, rejecting one whose lower bound is after its upper bound
    pub fn new(from: NaiveDateTime, to: NaiveDateTime) -> Result<Self, DomainError> {
        if from > to {
            return Err(DomainError::InvalidTimeWindow {
                from: from.format(UPSTREAM_TIME_FORMAT).to_string(),
                to: to.format(UPSTREAM_TIME_FORMAT).to_string(),
            });
        }
        Ok(Self { from, to })
    }

    pub fn from(&self) -> NaiveDateTime {
        self.from
    }

    pub fn to(&self) -> NaiveDateTime {
        self.to
    }

    /// Lower bound rendered for the `lastSeenFrom` query parameter
    pub fn from_param(&self) -> String {
        self.from.format(UPSTREAM_TIME_FORMAT).to_string()
    }

    /// Upper bound rendered for the `lastSeenTo` query parameter
    pub fn to_param(&self) -> String {
        self.to.format(UPSTREAM_TIME_FORMAT).to_string()
    }
}

// ============================================================================
// PollOutcome
// ============================================================================

/// Result of one request for the event batch
#[derive(Debug, Clone, PartialEq)]
pub enum PollOutcome {
    /// The source answered with at least one event
    Success(Vec<Event>),
    /// The source answered successfully with no events
    Empty,
    /// The request failed; carries the HTTP status when one was received
    TransientFailure(Option<u16>),
}

impl PollOutcome {
    /// Classifies a successfully retrieved batch
    pub fn from_batch(events: Vec<Event>) -> Self {
        if events.is_empty() {
            Self::Empty
        } else {
            Self::Success(events)
        }
    }

    /// Whether the source answered with a success status
    pub fn is_success(&self) -> bool {
        !matches!(self, Self::TransientFailure(_))
    }
}

// ============================================================================
// ControllerState
// ============================================================================

/// States of the poll/retry state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerState {
    /// About to request (or requesting) the next batch
    Polling,
    /// Waiting out the fixed delay after a failed request
    Backoff,
    /// Failure threshold reached; terminal
    Failed,
}

impl fmt::Display for ControllerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Polling => "polling",
            Self::Backoff => "backoff",
            Self::Failed => "failed",
        };
        f.write_str(s)
    }
}

// ============================================================================
// SyncRunState
// ============================================================================

/// State the controller carries from one poll to the next
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncRunState {
    failure_count: u32,
    first_run: bool,
    last_successful_poll: Option<NaiveDateTime>,
}

impl SyncRunState {
    /// Creates the initial state
    ///
    /// `first_run` should be true when no tracking history could be loaded.
    pub fn new(first_run: bool) -> Self {
        Self {
            failure_count: 0,
            first_run,
            last_successful_poll: None,
        }
    }

    pub fn failure_count(&self) -> u32 {
        self.failure_count
    }

    /// Counts a failed poll and returns the new total
    pub fn record_failure(&mut self) -> u32 {
        self.failure_count = self.failure_count.saturating_add(1);
        self.failure_count
    }

    /// Called on every successful poll
    pub fn reset_failures(&mut self) {
        self.failure_count = 0;
    }

    pub fn is_first_run(&self) -> bool {
        self.first_run
    }

    /// Marks that a tracking history now exists
    pub fn mark_established(&mut self) {
        self.first_run = false;
    }

    pub fn last_successful_poll(&self) -> Option<NaiveDateTime> {
        self.last_successful_poll
    }

    pub fn set_last_successful_poll(&mut self, at: NaiveDateTime) {
        self.last_successful_poll = Some(at);
    }

    /// Window to request at `now`, or `None` to request the full backlog
    ///
    /// Returns `None` when there has been no successful poll yet, or when the
    /// clock moved backwards past the last successful poll.
    pub fn window_until(&self, now: NaiveDateTime) -> Option<TimeWindow> {
        self.last_successful_poll
            .and_then(|from| TimeWindow::new(from, now).ok())
    }
}
