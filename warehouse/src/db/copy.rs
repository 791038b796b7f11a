//! Bulk-copy collaborator.
//!
//! The engine stages a plain CSV file locally and hands it, together with
//! a column list and a destination table, to this collaborator. The copy
//! is all-or-nothing from the engine's point of view and is never retried;
//! failures surface with the exit code and captured diagnostics.

use std::path::Path;
use std::process::Stdio;

use async_trait::async_trait;
use common::config::WarehouseConfig;
use common::{CopyFailure, Error, Result};
use tokio::process::Command;
use tracing::{debug, info};

#[async_trait]
pub trait BulkCopy: Send + Sync {
    async fn copy(&self, local_path: &Path, destination: &str, columns: &[String]) -> Result<()>;
}

/// Production implementation shelling out to `psql \copy`.
pub struct PsqlCopy {
    uri: String,
}

impl PsqlCopy {
    pub fn new(config: &WarehouseConfig) -> Self {
        Self { uri: config.uri() }
    }
}

#[async_trait]
impl BulkCopy for PsqlCopy {
    async fn copy(&self, local_path: &Path, destination: &str, columns: &[String]) -> Result<()> {
        let copy_command = format!(
            "\\copy {} ({}) FROM '{}' WITH CSV HEADER",
            destination,
            columns.join(","),
            local_path.display(),
        );
        debug!(destination, "running psql copy");

        let output = Command::new("psql")
            .arg(&self.uri)
            .arg("-v")
            .arg("ON_ERROR_STOP=1")
            .arg("-c")
            .arg(&copy_command)
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .await?;

        if !output.status.success() {
            return Err(Error::Copy(CopyFailure {
                exit_code: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            }));
        }

        info!(destination, "bulk copy complete");
        Ok(())
    }
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Debug, Clone)]
    pub struct CopyCall {
        pub destination: String,
        pub columns: Vec<String>,
        pub staged_csv: String,
    }

    /// Captures every copy invocation, snapshotting the staged file's
    /// contents before the loader drops it.
    pub struct RecordingCopy {
        calls: Mutex<Vec<CopyCall>>,
        fail_with: Mutex<Option<CopyFailure>>,
    }

    impl RecordingCopy {
        pub fn new() -> Self {
            Self {
                calls: Mutex::new(Vec::new()),
                fail_with: Mutex::new(None),
            }
        }

        pub fn fail_next(&self, failure: CopyFailure) {
            *self.fail_with.lock().unwrap() = Some(failure);
        }

        pub fn calls(&self) -> Vec<CopyCall> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl BulkCopy for RecordingCopy {
        async fn copy(
            &self,
            local_path: &Path,
            destination: &str,
            columns: &[String],
        ) -> Result<()> {
            if let Some(failure) = self.fail_with.lock().unwrap().take() {
                return Err(Error::Copy(failure));
            }
            let staged_csv = std::fs::read_to_string(local_path)?;
            self.calls.lock().unwrap().push(CopyCall {
                destination: destination.to_string(),
                columns: columns.to_vec(),
                staged_csv,
            });
            Ok(())
        }
    }
}
