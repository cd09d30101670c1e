//! Poll/retry controller
//!
//! The [`PollController`] drives the long-running sync loop:
//!
//! 1. **Poll**: list events for the organization context, restricted to the
//!    window since the last successful poll (or the full backlog when there
//!    is none)
//! 2. **Delta**: compare the batch against the tracking store
//! 3. **Persist**: run the [`FetchPersistPipeline`] for every new event
//! 4. **Wait**: idle after a quiet poll, back off after a failed one
//!
//! ## Failure handling
//!
//! A failed poll increments the consecutive failure counter and waits a
//! fixed backoff interval. Any successful poll resets the counter. Reaching
//! the configured maximum stops the loop with
//! [`SyncError::FailureThresholdReached`]; no further request is issued.
//! Pipeline failures are not poll failures: the event stays untracked and
//! the window is not advanced, so the next poll reports it again.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use chrono::{Local, NaiveDateTime};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use siphon_core::config::{Config, PollingConfig};
use siphon_core::domain::{
    delta, ControllerState, DeltaResult, Event, EventId, OrganizationName, PollOutcome,
    SyncRunState,
};
use siphon_core::ports::{IArtifactStore, IEventSource};

use crate::pipeline::{FetchPersistPipeline, PipelineOutcome};
use crate::tracking::SyncStateStore;
use crate::SyncError;

// ============================================================================
// Settings
// ============================================================================

/// Loop timing and failure threshold
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollSettings {
    /// Wait after a poll that brought nothing new
    pub idle_interval: Duration,
    /// Wait after a failed poll
    pub backoff_interval: Duration,
    /// Consecutive failed polls after which the loop stops
    pub max_failures: u32,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self::from(&PollingConfig::default())
    }
}

impl From<&PollingConfig> for PollSettings {
    fn from(config: &PollingConfig) -> Self {
        Self {
            idle_interval: Duration::from_secs(config.idle_interval_secs),
            backoff_interval: Duration::from_secs(config.backoff_interval_secs),
            max_failures: config.max_failures,
        }
    }
}

// ============================================================================
// Cycle results
// ============================================================================

/// Per-cycle counters for a poll that reported new events
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleSummary {
    /// Events in the batch returned by the source
    pub fetched: usize,
    /// Ids in the batch not yet tracked
    pub new: usize,
    /// Events persisted and recorded this cycle
    pub persisted: usize,
    /// Events skipped because they were already tracked
    pub skipped: usize,
    /// Events whose pipeline failed
    pub failed: usize,
    /// Raw data items written this cycle
    pub sub_records: usize,
    /// Failure reasons, one per failed event
    pub errors: Vec<String>,
}

impl CycleSummary {
    /// Whether every new event in the cycle failed to persist
    pub fn all_failed(&self) -> bool {
        self.failed > 0 && self.persisted == 0
    }
}

/// What one poll cycle did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    /// The poll succeeded but reported nothing new
    Idle {
        /// Events in the batch (all already tracked)
        fetched: usize,
    },
    /// The poll reported new events and the pipeline ran over them
    Processed(CycleSummary),
    /// The poll itself failed
    SourceFailure {
        /// HTTP status, if a response was received
        status: Option<u16>,
        /// Consecutive failures including this one
        failures: u32,
    },
}

// ============================================================================
// PollController
// ============================================================================

type Clock = Box<dyn Fn() -> NaiveDateTime + Send + Sync>;

/// Drives the poll/delta/persist loop for one organization context
///
/// Owns the [`SyncRunState`] and the [`SyncStateStore`]; every network call,
/// write and sleep happens in sequence on the calling task.
pub struct PollController {
    /// Event source (the management console)
    source: Arc<dyn IEventSource>,
    /// Per-event fetch-and-persist logic
    pipeline: FetchPersistPipeline,
    /// Durable set of persisted ids
    store: SyncStateStore,
    /// Organization context of every listing
    organization: OrganizationName,
    /// Loop timing
    settings: PollSettings,
    /// Failure counter, first-run flag, last successful poll
    run_state: SyncRunState,
    /// Current state machine state
    state: ControllerState,
    /// Source of "now" for time windows
    clock: Clock,
}

impl PollController {
    /// Creates a new controller
    ///
    /// # Arguments
    /// * `source` - Event source to poll
    /// * `artifacts` - Artifact store used by the pipeline
    /// * `store` - Loaded tracking store
    /// * `organization` - Organization context (`All` for every organization)
    /// * `retrieve_sub_records` - Enrich events with their raw data items
    /// * `settings` - Loop timing and failure threshold
    pub fn new(
        source: Arc<dyn IEventSource>,
        artifacts: Arc<dyn IArtifactStore>,
        store: SyncStateStore,
        organization: OrganizationName,
        retrieve_sub_records: bool,
        settings: PollSettings,
    ) -> Self {
        let pipeline = FetchPersistPipeline::new(
            Arc::clone(&source),
            artifacts,
            organization.clone(),
            retrieve_sub_records,
        );
        let run_state = SyncRunState::new(store.is_first_run());

        Self {
            source,
            pipeline,
            store,
            organization,
            settings,
            run_state,
            state: ControllerState::Polling,
            clock: Box::new(|| Local::now().naive_local()),
        }
    }

    /// Creates a controller from the application configuration
    ///
    /// # Errors
    /// Returns [`SyncError::Config`] when no organization context is configured
    /// and [`SyncError::Domain`] when the configured organization name is blank.
    pub fn from_config(
        config: &Config,
        source: Arc<dyn IEventSource>,
        artifacts: Arc<dyn IArtifactStore>,
        store: SyncStateStore,
    ) -> Result<Self, SyncError> {
        let source_config = &config.source;
        if !source_config.retrieve_all_organizations && source_config.organization_name.is_none() {
            return Err(SyncError::Config(
                "source.organization_name must be set unless \
                 source.retrieve_all_organizations is true"
                    .to_string(),
            ));
        }
        let organization = source_config.organization()?;

        Ok(Self::new(
            source,
            artifacts,
            store,
            organization,
            source_config.retrieve_sub_records,
            PollSettings::from(&config.polling),
        ))
    }

    /// Replaces the wall clock used to build time windows
    pub fn with_clock<F>(mut self, clock: F) -> Self
    where
        F: Fn() -> NaiveDateTime + Send + Sync + 'static,
    {
        self.clock = Box::new(clock);
        self
    }

    pub fn state(&self) -> ControllerState {
        self.state
    }

    pub fn run_state(&self) -> &SyncRunState {
        &self.run_state
    }

    pub fn store(&self) -> &SyncStateStore {
        &self.store
    }

    pub fn settings(&self) -> &PollSettings {
        &self.settings
    }

    /// Runs the loop until shutdown or until the failure threshold is reached
    ///
    /// The token is checked before every poll and while waiting; an event
    /// that is being persisted is always finished first.
    ///
    /// # Errors
    /// Returns [`SyncError::FailureThresholdReached`] after `max_failures`
    /// consecutive failed polls.
    pub async fn run(&mut self, shutdown: CancellationToken) -> Result<(), SyncError> {
        info!(
            org = %self.organization,
            tracked = self.store.len(),
            first_run = self.run_state.is_first_run(),
            idle_secs = self.settings.idle_interval.as_secs(),
            backoff_secs = self.settings.backoff_interval.as_secs(),
            max_failures = self.settings.max_failures,
            "Sync loop started"
        );

        loop {
            if shutdown.is_cancelled() {
                info!("Shutdown requested, stopping sync loop");
                return Ok(());
            }

            let wait = match self.run_once().await {
                CycleOutcome::Idle { .. } => Some(self.settings.idle_interval),
                CycleOutcome::Processed(summary) if summary.all_failed() => {
                    warn!(
                        failed = summary.failed,
                        "No new event could be persisted this cycle"
                    );
                    Some(self.settings.idle_interval)
                }
                CycleOutcome::Processed(_) => None,
                CycleOutcome::SourceFailure { status, failures } => {
                    if self.state == ControllerState::Failed {
                        error!(
                            failures,
                            status = ?status,
                            "Failure threshold reached, giving up"
                        );
                        return Err(SyncError::FailureThresholdReached {
                            failures,
                            last_status: status,
                        });
                    }
                    Some(self.settings.backoff_interval)
                }
            };

            if let Some(wait) = wait {
                debug!(state = %self.state, wait_secs = wait.as_secs(), "Waiting before next poll");
                tokio::select! {
                    _ = shutdown.cancelled() => {
                        info!("Shutdown requested while waiting, stopping sync loop");
                        return Ok(());
                    }
                    _ = tokio::time::sleep(wait) => {}
                }
            }
            self.state = ControllerState::Polling;
        }
    }

    /// Executes exactly one poll cycle
    ///
    /// Does not sleep; the caller decides how long to wait based on the
    /// returned [`CycleOutcome`].
    #[tracing::instrument(skip(self), fields(org = %self.organization))]
    pub async fn run_once(&mut self) -> CycleOutcome {
        self.state = ControllerState::Polling;

        let now = (self.clock)();
        let window = self.run_state.window_until(now);
        if window.is_none() {
            info!(first_run = self.run_state.is_first_run(), "Requesting full event backlog");
        } else {
            debug!(?window, "Requesting events in window");
        }

        let outcome = match self
            .source
            .list_events(window.as_ref(), &self.organization)
            .await
        {
            Ok(events) => PollOutcome::from_batch(events),
            Err(e) => {
                warn!(error = %e, "Poll failed");
                PollOutcome::TransientFailure(e.status())
            }
        };

        let events = match outcome {
            PollOutcome::TransientFailure(status) => {
                let failures = self.run_state.record_failure();
                self.state = if failures >= self.settings.max_failures {
                    ControllerState::Failed
                } else {
                    ControllerState::Backoff
                };
                warn!(
                    failures,
                    max_failures = self.settings.max_failures,
                    status = ?status,
                    state = %self.state,
                    "Event listing failed"
                );
                return CycleOutcome::SourceFailure { status, failures };
            }
            PollOutcome::Empty => Vec::new(),
            PollOutcome::Success(events) => events,
        };

        self.run_state.reset_failures();
        let polled_until = window.map_or(now, |w| w.to());

        let delta = delta::compute(events.iter().map(|e| &e.id), self.store.ids());
        let new_ids = match delta {
            DeltaResult::Empty => {
                debug!(fetched = events.len(), "No new events");
                self.run_state.set_last_successful_poll(polled_until);
                return CycleOutcome::Idle {
                    fetched: events.len(),
                };
            }
            DeltaResult::NewIds(ids) => ids,
        };

        info!(fetched = events.len(), new = new_ids.len(), "New events found");
        let summary = self.process_new(&events, new_ids).await;

        if summary.failed == 0 {
            self.run_state.set_last_successful_poll(polled_until);
        } else {
            warn!(
                failed = summary.failed,
                "Keeping previous window so failed events are reported again"
            );
        }
        if !self.store.is_first_run() {
            self.run_state.mark_established();
        }

        info!(
            persisted = summary.persisted,
            skipped = summary.skipped,
            failed = summary.failed,
            sub_records = summary.sub_records,
            "Cycle complete"
        );
        CycleOutcome::Processed(summary)
    }

    /// Runs the pipeline over the events of `events` whose ids are in `new_ids`
    async fn process_new(
        &mut self,
        events: &[Event],
        mut new_ids: BTreeSet<EventId>,
    ) -> CycleSummary {
        let mut summary = CycleSummary {
            fetched: events.len(),
            new: new_ids.len(),
            ..CycleSummary::default()
        };

        // Upstream order; an id listed twice is only processed once.
        for event in events {
            if !new_ids.remove(&event.id) {
                continue;
            }
            match self.pipeline.process(event, &mut self.store).await {
                PipelineOutcome::Skipped => summary.skipped += 1,
                PipelineOutcome::Persisted { sub_records } => {
                    summary.persisted += 1;
                    summary.sub_records += sub_records;
                }
                PipelineOutcome::Failed { reason } => {
                    summary.failed += 1;
                    summary.errors.push(format!("event {}: {}", event.id, reason));
                }
            }
        }

        summary
    }
}
