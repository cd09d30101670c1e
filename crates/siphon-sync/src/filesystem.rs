//! Artifact writer (secondary/driven adapter)
//!
//! Implements [`IArtifactStore`] using `tokio::fs`, writing one pretty-printed
//! JSON file per event and per raw data item:
//!
//! ```text
//! <event_root>/[<org>/]<org>-event_<id>.json
//! <event_root>/[<org>/]<org>-event_<id>-sub_<subId>.json
//! ```
//!
//! ## Design Decisions
//!
//! - **Atomic writes**: Uses write-to-temp + rename so a reader never sees a
//!   partial artifact, and rewriting an artifact after a retry simply
//!   replaces it.
//! - **Sanitized names**: Organization names pass through
//!   [`OrganizationName::sanitized`] before becoming path components.

use std::path::{Path, PathBuf};

use anyhow::Context;
use tracing::{debug, instrument};

use siphon_core::config::StorageConfig;
use siphon_core::domain::{Event, EventId, OrganizationName, SubRecord, SubRecordId};
use siphon_core::ports::IArtifactStore;

/// Adapter that bridges the [`IArtifactStore`] port to the local filesystem
#[derive(Debug, Clone)]
pub struct ArtifactWriter {
    /// Root directory for artifacts
    event_root: PathBuf,
    /// Nest artifacts under a directory per organization
    separate_per_organization: bool,
}

impl ArtifactWriter {
    /// Create a new `ArtifactWriter`
    ///
    /// # Arguments
    /// * `event_root` - Directory artifacts are written to
    /// * `separate_per_organization` - Use `<event_root>/<org>/` instead of `<event_root>/`
    #[must_use]
    pub fn new(event_root: impl Into<PathBuf>, separate_per_organization: bool) -> Self {
        Self {
            event_root: event_root.into(),
            separate_per_organization,
        }
    }

    /// Create a writer from the `storage` configuration section
    #[must_use]
    pub fn from_config(config: &StorageConfig) -> Self {
        Self::new(
            config.event_root.clone(),
            config.separate_artifacts_per_organization,
        )
    }

    pub fn event_root(&self) -> &Path {
        &self.event_root
    }

    /// Directory the artifacts of `organization` are written to
    pub fn artifact_dir(&self, organization: &OrganizationName) -> PathBuf {
        if self.separate_per_organization {
            self.event_root.join(organization.sanitized())
        } else {
            self.event_root.clone()
        }
    }

    /// Path of the artifact for event `id`
    pub fn event_path(&self, organization: &OrganizationName, id: EventId) -> PathBuf {
        self.artifact_dir(organization)
            .join(format!("{}-event_{}.json", organization.sanitized(), id))
    }

    /// Path of the artifact for raw data item `sub_id` of event `event_id`
    pub fn sub_record_path(
        &self,
        organization: &OrganizationName,
        event_id: EventId,
        sub_id: SubRecordId,
    ) -> PathBuf {
        self.artifact_dir(organization).join(format!(
            "{}-event_{}-sub_{}.json",
            organization.sanitized(),
            event_id,
            sub_id
        ))
    }
}

/// Writes `data` to `target` via a sibling `.tmp` file and a rename
#[instrument(skip(data), fields(path = %target.display(), bytes = data.len()))]
async fn write_atomic(target: &Path, data: &[u8]) -> anyhow::Result<()> {
    if let Some(parent) = target.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("Failed to create directory {}", parent.display()))?;
    }

    // Same directory as the target so the rename stays on one filesystem.
    let tmp_path = {
        let mut p = target.as_os_str().to_owned();
        p.push(".tmp");
        PathBuf::from(p)
    };

    debug!(?tmp_path, "writing to temporary file");
    if let Err(e) = tokio::fs::write(&tmp_path, data).await {
        let _ = tokio::fs::remove_file(&tmp_path).await;
        return Err(anyhow::Error::new(e)
            .context(format!("Failed to write {}", tmp_path.display())));
    }

    debug!("renaming temporary file to target");
    if let Err(e) = tokio::fs::rename(&tmp_path, target).await {
        let _ = tokio::fs::remove_file(&tmp_path).await;
        return Err(anyhow::Error::new(e)
            .context(format!("Failed to rename into {}", target.display())));
    }

    debug!("write complete");
    Ok(())
}

#[async_trait::async_trait]
impl IArtifactStore for ArtifactWriter {
    async fn write_event(
        &self,
        organization: &OrganizationName,
        event: &Event,
    ) -> anyhow::Result<PathBuf> {
        let path = self.event_path(organization, event.id);
        let data = serde_json::to_vec_pretty(event)
            .with_context(|| format!("Failed to serialize event {}", event.id))?;
        write_atomic(&path, &data).await?;
        Ok(path)
    }

    async fn write_sub_record(
        &self,
        organization: &OrganizationName,
        event_id: EventId,
        sub_record: &SubRecord,
    ) -> anyhow::Result<PathBuf> {
        let path = self.sub_record_path(organization, event_id, sub_record.id);
        let data = serde_json::to_vec_pretty(sub_record).with_context(|| {
            format!(
                "Failed to serialize raw data item {} of event {}",
                sub_record.id, event_id
            )
        })?;
        write_atomic(&path, &data).await?;
        Ok(path)
    }
}
