//! External data-source collaborators.
//!
//! Remote enumeration, download, and archive extraction live outside this
//! engine; these traits pin down only the contracts the engine consumes.
//! Files and archive members are delivered decompressed — a member is
//! readable as plain CSV rows.

use std::fs::File;
use std::io::Read;
use std::path::PathBuf;

use async_trait::async_trait;
use common::{Error, Result};
use tracing::debug;

/// A snapshot dataset: one generation of every table, plus the opaque
/// version identifier the publisher stamped on it.
pub struct FeedSnapshot {
    pub version_id: String,
    pub tables: Box<dyn TabularSource>,
}

/// Yields named tabular members of one dataset delivery.
pub trait TabularSource: Send + Sync {
    fn member(&self, name: &str) -> Result<Box<dyn Read + Send>>;
}

/// Fetches the current snapshot publication of a versioned feed.
#[async_trait]
pub trait FeedSource: Send + Sync {
    async fn fetch(&self) -> Result<FeedSnapshot>;
}

/// Inbox of pending single-file deliveries for the calendar-partitioned
/// datasets. A processed file is acknowledged (removed); a failed file is
/// quarantined so the next run does not retry it.
#[async_trait]
pub trait FileInbox: Send + Sync {
    async fn pending(&self) -> Result<Vec<String>>;

    /// Local path of a decompressed delivery, ready for row extraction.
    async fn fetch(&self, name: &str) -> Result<PathBuf>;

    async fn acknowledge(&self, name: &str) -> Result<()>;

    async fn quarantine(&self, name: &str) -> Result<()>;
}

/// Directory-backed tabular source: member `stops` maps to `stops.txt`.
pub struct DirSource {
    dir: PathBuf,
}

impl DirSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

impl TabularSource for DirSource {
    fn member(&self, name: &str) -> Result<Box<dyn Read + Send>> {
        let path = self.dir.join(format!("{name}.txt"));
        let file = File::open(&path)
            .map_err(|e| Error::Storage(format!("missing member {}: {e}", path.display())))?;
        Ok(Box::new(file))
    }
}

/// Directory-backed inbox used when an out-of-band process has already
/// staged deliveries locally. Quarantined files move to an `error`
/// subdirectory.
pub struct DirInbox {
    dir: PathBuf,
}

impl DirInbox {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn error_dir(&self) -> PathBuf {
        self.dir.join("error")
    }
}

#[async_trait]
impl FileInbox for DirInbox {
    async fn pending(&self) -> Result<Vec<String>> {
        let mut names = Vec::new();
        let mut entries = tokio::fs::read_dir(&self.dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            if entry.file_type().await?.is_file() {
                names.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        names.sort();
        Ok(names)
    }

    async fn fetch(&self, name: &str) -> Result<PathBuf> {
        let path = self.dir.join(name);
        if !path.is_file() {
            return Err(Error::Storage(format!("no such delivery: {}", path.display())));
        }
        Ok(path)
    }

    async fn acknowledge(&self, name: &str) -> Result<()> {
        debug!(name, "acknowledging delivery");
        tokio::fs::remove_file(self.dir.join(name)).await?;
        Ok(())
    }

    async fn quarantine(&self, name: &str) -> Result<()> {
        let error_dir = self.error_dir();
        tokio::fs::create_dir_all(&error_dir).await?;
        tokio::fs::rename(self.dir.join(name), error_dir.join(name)).await?;
        Ok(())
    }
}

/// Feed source over a staged snapshot directory. The version identifier
/// is delivered alongside the tables in a `feed_version` sidecar stamped
/// by the download collaborator.
pub struct DirFeedSource {
    dir: PathBuf,
}

impl DirFeedSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

#[async_trait]
impl FeedSource for DirFeedSource {
    async fn fetch(&self) -> Result<FeedSnapshot> {
        let version_path = self.dir.join("feed_version");
        let version_id = tokio::fs::read_to_string(&version_path)
            .await
            .map_err(|e| {
                Error::Storage(format!("missing version sidecar {}: {e}", version_path.display()))
            })?
            .trim()
            .to_string();

        Ok(FeedSnapshot {
            version_id,
            tables: Box::new(DirSource::new(self.dir.clone())),
        })
    }
}
