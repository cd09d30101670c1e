//! Shared fakes and builders for controller tests

use std::collections::{HashSet, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{NaiveDate, NaiveDateTime};

use siphon_core::domain::{
    Event, EventId, Organization, OrganizationName, SubRecord, SubRecordId, TimeWindow,
};
use siphon_core::ports::{IArtifactStore, IEventSource, SourceError};
use siphon_sync::engine::{PollController, PollSettings};
use siphon_sync::filesystem::ArtifactWriter;
use siphon_sync::tracking::SyncStateStore;

/// Event source answering listings from a script
///
/// Each `list_events` call pops the next scripted response; an exhausted
/// script answers with an empty list.
#[derive(Default)]
pub struct ScriptedSource {
    responses: Mutex<VecDeque<Result<Vec<Event>, SourceError>>>,
    pub windows: Mutex<Vec<Option<TimeWindow>>>,
    pub organizations: Mutex<Vec<String>>,
    pub sub_record_calls: Mutex<Vec<EventId>>,
}

impl ScriptedSource {
    pub fn new(responses: Vec<Result<Vec<Event>, SourceError>>) -> Arc<Self> {
        Arc::new(Self {
            responses: Mutex::new(responses.into()),
            ..Self::default()
        })
    }

    pub fn list_calls(&self) -> usize {
        self.windows.lock().unwrap().len()
    }
}

#[async_trait::async_trait]
impl IEventSource for ScriptedSource {
    async fn list_events(
        &self,
        window: Option<&TimeWindow>,
        organization: &OrganizationName,
    ) -> Result<Vec<Event>, SourceError> {
        self.windows.lock().unwrap().push(window.cloned());
        self.organizations
            .lock()
            .unwrap()
            .push(organization.to_string());
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(Vec::new()))
    }

    async fn list_sub_records(
        &self,
        event_id: EventId,
        _organization: &OrganizationName,
    ) -> Result<Vec<SubRecord>, SourceError> {
        self.sub_record_calls.lock().unwrap().push(event_id);
        Ok(vec![SubRecord::new(
            SubRecordId::new(event_id.get() * 100),
            Some(event_id),
        )])
    }

    async fn list_organizations(&self) -> Result<Vec<Organization>, SourceError> {
        Ok(Vec::new())
    }
}

/// Artifact store that fails event writes for chosen ids until healed
pub struct FlakyArtifacts {
    inner: ArtifactWriter,
    failing: Mutex<HashSet<EventId>>,
}

impl FlakyArtifacts {
    pub fn new(root: &Path, failing: impl IntoIterator<Item = u64>) -> Arc<Self> {
        Arc::new(Self {
            inner: ArtifactWriter::new(root, false),
            failing: Mutex::new(failing.into_iter().map(EventId::new).collect()),
        })
    }

    pub fn heal(&self) {
        self.failing.lock().unwrap().clear();
    }
}

#[async_trait::async_trait]
impl IArtifactStore for FlakyArtifacts {
    async fn write_event(
        &self,
        organization: &OrganizationName,
        event: &Event,
    ) -> anyhow::Result<PathBuf> {
        if self.failing.lock().unwrap().contains(&event.id) {
            anyhow::bail!("disk full");
        }
        self.inner.write_event(organization, event).await
    }

    async fn write_sub_record(
        &self,
        organization: &OrganizationName,
        event_id: EventId,
        sub_record: &SubRecord,
    ) -> anyhow::Result<PathBuf> {
        self.inner
            .write_sub_record(organization, event_id, sub_record)
            .await
    }
}

pub fn acme() -> OrganizationName {
    OrganizationName::new("Acme").unwrap()
}

pub fn events(ids: &[u64]) -> Vec<Event> {
    ids.iter().copied().map(|v| Event::new(EventId::new(v))).collect()
}

pub fn unavailable() -> SourceError {
    SourceError::Http {
        status: 503,
        body: "Service Unavailable".to_string(),
    }
}

pub fn settings(max_failures: u32) -> PollSettings {
    PollSettings {
        idle_interval: Duration::from_secs(60),
        backoff_interval: Duration::from_secs(300),
        max_failures,
    }
}

pub fn noon() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 5, 1)
        .unwrap()
        .and_hms_opt(12, 0, 0)
        .unwrap()
}

/// Writes `ids` to a tracking file in `dir` and loads it
pub async fn tracking_with(dir: &Path, ids: &[u64]) -> SyncStateStore {
    let path = dir.join("tracking.txt");
    if !ids.is_empty() {
        let content: String = ids.iter().map(|v| format!("{v}\n")).collect();
        std::fs::write(&path, content).unwrap();
    }
    SyncStateStore::load(&path).await.unwrap()
}

/// Builds a controller writing real artifacts under `dir/events`
pub fn controller(
    source: Arc<ScriptedSource>,
    artifacts: Arc<dyn IArtifactStore>,
    store: SyncStateStore,
    retrieve_sub_records: bool,
    max_failures: u32,
) -> PollController {
    PollController::new(
        source,
        artifacts,
        store,
        acme(),
        retrieve_sub_records,
        settings(max_failures),
    )
    .with_clock(noon)
}

/// Artifact file names under `root`, sorted
pub fn artifact_names(root: &Path) -> Vec<String> {
    let mut names: Vec<String> = match std::fs::read_dir(root) {
        Ok(entries) => entries
            .filter_map(Result::ok)
            .map(|e| e.file_name().to_string_lossy().into_owned())
            .collect(),
        Err(_) => Vec::new(),
    };
    names.sort();
    names
}
