//! ConsoleEventSource - IEventSource implementation for the console REST API
//!
//! Wraps the [`ConsoleClient`] to fulfil the [`IEventSource`] port contract,
//! adding the per-call tracing the sync engine relies on for diagnostics.

use tracing::{debug, warn};

use siphon_core::domain::{Event, EventId, Organization, OrganizationName, SubRecord, TimeWindow};
use siphon_core::ports::{IEventSource, SourceError};

use crate::client::ConsoleClient;

/// Event source backed by the management console
pub struct ConsoleEventSource {
    client: ConsoleClient,
}

impl ConsoleEventSource {
    /// Creates a new event source from a configured client
    pub fn new(client: ConsoleClient) -> Self {
        Self { client }
    }

    /// Returns a reference to the underlying client
    pub fn client(&self) -> &ConsoleClient {
        &self.client
    }
}

#[async_trait::async_trait]
impl IEventSource for ConsoleEventSource {
    #[tracing::instrument(skip(self, window), fields(org = %organization, windowed = window.is_some()))]
    async fn list_events(
        &self,
        window: Option<&TimeWindow>,
        organization: &OrganizationName,
    ) -> Result<Vec<Event>, SourceError> {
        match self.client.list_events(window, organization).await {
            Ok(events) => {
                debug!(count = events.len(), "Listed events");
                Ok(events)
            }
            Err(e) => {
                warn!(error = %e, status = ?e.status(), "Event listing failed");
                Err(e)
            }
        }
    }

    #[tracing::instrument(skip(self), fields(org = %organization))]
    async fn list_sub_records(
        &self,
        event_id: EventId,
        organization: &OrganizationName,
    ) -> Result<Vec<SubRecord>, SourceError> {
        let records = self.client.list_sub_records(event_id, organization).await?;
        debug!(count = records.len(), "Listed raw data items");
        Ok(records)
    }

    async fn list_organizations(&self) -> Result<Vec<Organization>, SourceError> {
        let organizations = self.client.list_organizations().await?;
        debug!(count = organizations.len(), "Listed organizations");
        Ok(organizations)
    }
}
