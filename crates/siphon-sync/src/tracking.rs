//! Sync state store
//!
//! Durable set of the event ids whose artifacts have been written. The
//! backing file holds one decimal id per line and is only ever appended to.
//!
//! A crash during an append, or a hand edit, can leave the last line
//! without its newline. On reload that line is parsed like any other, and
//! the next append terminates it first so a new id always starts a line of
//! its own. Lines that are not valid UTF-8 or not a non-negative integer
//! are skipped with a warning.
//!
//! The store is the single writer of the file and is borrowed mutably by
//! the pipeline; nothing else touches it while a sync run is active.

use std::collections::HashSet;
use std::io::{ErrorKind, SeekFrom};
use std::path::{Path, PathBuf};

use tokio::io::{AsyncReadExt, AsyncSeekExt, AsyncWriteExt};
use tracing::{debug, info, warn};

use siphon_core::domain::EventId;

use crate::SyncError;

/// Durable set of already persisted event ids
#[derive(Debug)]
pub struct SyncStateStore {
    /// Tracking file location
    path: PathBuf,
    /// In-memory copy of the ids in the file
    ids: HashSet<EventId>,
    /// No history existed when the store was loaded and nothing was recorded since
    first_run: bool,
}

impl SyncStateStore {
    /// Loads the tracking file at `path`
    ///
    /// A missing or empty file yields an empty, first-run store. Lines that
    /// are not valid UTF-8 or not a non-negative integer are skipped with a
    /// warning; blank lines are ignored.
    ///
    /// # Errors
    /// Returns [`SyncError::Tracking`] if the file exists but cannot be read.
    pub async fn load(path: impl Into<PathBuf>) -> Result<Self, SyncError> {
        let path = path.into();

        let content = match tokio::fs::read(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                info!(path = %path.display(), "No tracking file found, starting fresh");
                return Ok(Self::empty(path));
            }
            Err(source) => return Err(SyncError::Tracking { path, source }),
        };

        let ids = parse_tracking(&content, &path);
        let first_run = ids.is_empty();

        info!(
            path = %path.display(),
            ids = ids.len(),
            first_run,
            "Loaded tracking file"
        );

        Ok(Self {
            path,
            ids,
            first_run,
        })
    }

    /// Creates an empty, first-run store backed by `path` without reading it
    pub fn empty(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            ids: HashSet::new(),
            first_run: true,
        }
    }

    /// Records `id` as persisted
    ///
    /// Appends the id to the tracking file (creating it and its parent
    /// directories if needed) before adding it to the in-memory set, so the
    /// set never claims more than the file holds. Recording an id that is
    /// already present is a no-op.
    #[tracing::instrument(skip(self), fields(path = %self.path.display()))]
    pub async fn record(&mut self, id: EventId) -> Result<(), SyncError> {
        if self.ids.contains(&id) {
            debug!("Id already tracked");
            return Ok(());
        }

        self.append_line(id).await.map_err(|source| SyncError::Tracking {
            path: self.path.clone(),
            source,
        })?;

        self.ids.insert(id);
        self.first_run = false;
        debug!(total = self.ids.len(), "Recorded event id");
        Ok(())
    }

    async fn append_line(&self, id: EventId) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(&self.path)
            .await?;

        let mut line = format!("{id}\n");
        if ends_unterminated(&mut file).await? {
            warn!(
                path = %self.path.display(),
                "Tracking file did not end with a newline, terminating last line"
            );
            line.insert(0, '\n');
        }
        file.write_all(line.as_bytes()).await?;
        file.flush().await?;
        Ok(())
    }

    pub fn contains(&self, id: EventId) -> bool {
        self.ids.contains(&id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Whether no history existed at load time and nothing has been recorded since
    pub fn is_first_run(&self) -> bool {
        self.first_run
    }

    /// The historical id set
    pub fn ids(&self) -> &HashSet<EventId> {
        &self.ids
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Whether `file` is non-empty and its last byte is not a newline
async fn ends_unterminated(file: &mut tokio::fs::File) -> std::io::Result<bool> {
    if file.metadata().await?.len() == 0 {
        return Ok(false);
    }
    file.seek(SeekFrom::End(-1)).await?;
    let mut last = [0u8; 1];
    file.read_exact(&mut last).await?;
    Ok(last[0] != b'\n')
}

/// Parses tracking file content, warning about lines that are not ids
fn parse_tracking(content: &[u8], path: &Path) -> HashSet<EventId> {
    let mut ids = HashSet::new();
    for (index, raw) in content.split(|b| *b == b'\n').enumerate() {
        let Ok(line) = std::str::from_utf8(raw) else {
            warn!(
                path = %path.display(),
                line = index + 1,
                "Skipping tracking entry that is not valid UTF-8"
            );
            continue;
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match line.parse::<EventId>() {
            Ok(id) => {
                ids.insert(id);
            }
            Err(_) => warn!(
                path = %path.display(),
                line = index + 1,
                content = line,
                "Skipping malformed tracking entry"
            ),
        }
    }
    ids
}
