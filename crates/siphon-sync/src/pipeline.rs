//! Fetch-and-persist pipeline
//!
//! Handles a single new event end to end: optional enrichment with its raw
//! data items, artifact writes, and finally the tracking record. The record
//! is the commit point; an event is only marked as persisted once every one
//! of its artifacts is on disk.

use std::sync::Arc;

use anyhow::Context;
use tracing::{debug, info, warn};

use siphon_core::domain::{Event, OrganizationName};
use siphon_core::ports::{IArtifactStore, IEventSource};

use crate::tracking::SyncStateStore;

/// Result of running the pipeline for one event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineOutcome {
    /// The event was already tracked; nothing was fetched or written
    Skipped,
    /// Artifacts were written and the event recorded
    Persisted {
        /// Number of raw data items written alongside the event
        sub_records: usize,
    },
    /// Something failed; the event was not recorded and will be retried
    Failed {
        /// Human-readable cause
        reason: String,
    },
}

/// Per-event fetch-and-persist logic
pub struct FetchPersistPipeline {
    /// Source of raw data items
    source: Arc<dyn IEventSource>,
    /// Destination of artifacts
    artifacts: Arc<dyn IArtifactStore>,
    /// Organization context of the run (`All` when retrieving every organization)
    organization: OrganizationName,
    /// Whether to fetch and persist raw data items
    retrieve_sub_records: bool,
}

impl FetchPersistPipeline {
    /// Creates a new pipeline
    ///
    /// # Arguments
    /// * `source` - Event source used for enrichment
    /// * `artifacts` - Artifact store
    /// * `organization` - Organization context of the run
    /// * `retrieve_sub_records` - Fetch and persist each event's raw data items
    pub fn new(
        source: Arc<dyn IEventSource>,
        artifacts: Arc<dyn IArtifactStore>,
        organization: OrganizationName,
        retrieve_sub_records: bool,
    ) -> Self {
        Self {
            source,
            artifacts,
            organization,
            retrieve_sub_records,
        }
    }

    pub fn organization(&self) -> &OrganizationName {
        &self.organization
    }

    /// Organization an event's artifacts are filed under
    ///
    /// When the run spans all organizations this is the event's own
    /// `organization` field, falling back to the run context if the event
    /// does not carry a usable one.
    pub fn artifact_organization(&self, event: &Event) -> OrganizationName {
        if self.organization.is_all() {
            if let Some(org) = event
                .organization
                .as_deref()
                .and_then(|name| OrganizationName::new(name).ok())
            {
                return org;
            }
        }
        self.organization.clone()
    }

    /// Runs the pipeline for `event`
    ///
    /// Never returns an error: failures are reported as
    /// [`PipelineOutcome::Failed`] and leave the store untouched.
    #[tracing::instrument(skip(self, event, store), fields(event_id = %event.id))]
    pub async fn process(&self, event: &Event, store: &mut SyncStateStore) -> PipelineOutcome {
        if store.contains(event.id) {
            debug!("Event already persisted, skipping");
            return PipelineOutcome::Skipped;
        }

        match self.persist(event, store).await {
            Ok(sub_records) => {
                info!(sub_records, "Event persisted");
                PipelineOutcome::Persisted { sub_records }
            }
            Err(e) => {
                let reason = format!("{e:#}");
                warn!(%reason, "Failed to persist event, will retry on a later poll");
                PipelineOutcome::Failed { reason }
            }
        }
    }

    async fn persist(&self, event: &Event, store: &mut SyncStateStore) -> anyhow::Result<usize> {
        let artifact_org = self.artifact_organization(event);

        let sub_records = if self.retrieve_sub_records {
            let records = self
                .source
                .list_sub_records(event.id, &self.organization)
                .await
                .with_context(|| format!("Failed to fetch raw data items for event {}", event.id))?;
            debug!(count = records.len(), "Fetched raw data items");
            Some(records)
        } else {
            None
        };

        let count = sub_records.as_ref().map_or(0, Vec::len);

        let path = match &sub_records {
            Some(records) => {
                let enriched = event.clone().with_sub_records(records.clone());
                self.artifacts.write_event(&artifact_org, &enriched).await?
            }
            None => self.artifacts.write_event(&artifact_org, event).await?,
        };
        debug!(path = %path.display(), "Wrote event artifact");

        for record in sub_records.iter().flatten() {
            let path = self
                .artifacts
                .write_sub_record(&artifact_org, event.id, record)
                .await?;
            debug!(path = %path.display(), sub_record = %record.id, "Wrote raw data item artifact");
        }

        store.record(event.id).await?;
        Ok(count)
    }
}
