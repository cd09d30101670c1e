//! Event, SubRecord and Organization entities
//!
//! These mirror the upstream JSON closely. Only the fields the sync engine
//! reasons about are typed; everything else is carried through an opaque
//! payload map so artifacts contain exactly what the console returned.
//!
//! ## Field naming
//!
//! The upstream API names an event's identifier `eventId`, while a raw data
//! item refers back to its parent as `EventId` and carries its own id as
//! `RawEventId`. Those names are kept verbatim in both directions; consumers
//! of the written artifacts rely on them.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::newtypes::{EventId, SubRecordId};
use super::poll::UPSTREAM_TIME_FORMAT;

// ============================================================================
// Event
// ============================================================================

/// A single security event as returned by the event listing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Unique event identifier
    #[serde(rename = "eventId")]
    pub id: EventId,

    /// When the event was first seen, in upstream text form
    #[serde(rename = "firstSeen", default, skip_serializing_if = "Option::is_none")]
    pub first_seen: Option<String>,

    /// When the event was last seen, in upstream text form
    #[serde(rename = "lastSeen", default, skip_serializing_if = "Option::is_none")]
    pub last_seen: Option<String>,

    /// Owning organization, present when listing across organizations
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organization: Option<String>,

    /// Raw data items attached after enrichment (never set by the listing)
    #[serde(
        rename = "rawDataItems",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub sub_records: Option<Vec<SubRecord>>,

    /// All remaining upstream fields, untouched
    #[serde(flatten)]
    pub payload: Map<String, Value>,
}

impl Event {
    /// Creates an event with only an identifier (mostly useful in tests)
    pub fn new(id: EventId) -> Self {
        Self {
            id,
            first_seen: None,
            last_seen: None,
            organization: None,
            sub_records: None,
            payload: Map::new(),
        }
    }

    /// Parsed `firstSeen`, if present and well-formed
    pub fn first_seen_at(&self) -> Option<NaiveDateTime> {
        parse_upstream_time(self.first_seen.as_deref())
    }

    /// Parsed `lastSeen`, if present and well-formed
    pub fn last_seen_at(&self) -> Option<NaiveDateTime> {
        parse_upstream_time(self.last_seen.as_deref())
    }

    /// Returns a copy of this event carrying the given raw data items
    pub fn with_sub_records(mut self, sub_records: Vec<SubRecord>) -> Self {
        self.sub_records = Some(sub_records);
        self
    }
}

fn parse_upstream_time(value: Option<&str>) -> Option<NaiveDateTime> {
    value.and_then(|v| NaiveDateTime::parse_from_str(v.trim(), UPSTREAM_TIME_FORMAT).ok())
}

// ============================================================================
// SubRecord
// ============================================================================

/// A raw data item belonging to one event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubRecord {
    /// Reference to the parent event (note the upstream capitalisation)
    #[serde(rename = "EventId", default, skip_serializing_if = "Option::is_none")]
    pub event_id: Option<EventId>,

    /// The sub-record's own identifier
    #[serde(rename = "RawEventId")]
    pub id: SubRecordId,

    /// All remaining upstream fields, untouched
    #[serde(flatten)]
    pub payload: Map<String, Value>,
}

impl SubRecord {
    /// Creates a sub-record with only identifiers set
    pub fn new(id: SubRecordId, event_id: Option<EventId>) -> Self {
        Self {
            event_id,
            id,
            payload: Map::new(),
        }
    }
}

// ============================================================================
// Organization
// ============================================================================

/// An entry from the organization listing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Organization {
    /// Organization name, exactly as the console spells it
    pub name: String,

    /// Remaining upstream fields
    #[serde(flatten)]
    pub details: Map<String, Value>,
}
