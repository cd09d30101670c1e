//! Artifact store port (driven/secondary port)
//!
//! Persists retrieved events and their sub-records. Implementations must
//! make each write atomic: a reader never observes a partially written
//! artifact, and rewriting an existing artifact with the same content
//! succeeds.

use std::path::PathBuf;

use crate::domain::{Event, EventId, OrganizationName, SubRecord};

/// Port trait for artifact persistence
#[async_trait::async_trait]
pub trait IArtifactStore: Send + Sync {
    /// Writes the artifact for one event (including any attached sub-records)
    ///
    /// # Arguments
    /// * `organization` - Organization the artifact is filed under
    /// * `event` - The event to persist
    ///
    /// # Returns
    /// The path of the written artifact
    async fn write_event(
        &self,
        organization: &OrganizationName,
        event: &Event,
    ) -> anyhow::Result<PathBuf>;

    /// Writes the artifact for one sub-record of an event
    ///
    /// # Returns
    /// The path of the written artifact
    async fn write_sub_record(
        &self,
        organization: &OrganizationName,
        event_id: EventId,
        sub_record: &SubRecord,
    ) -> anyhow::Result<PathBuf>;
}
