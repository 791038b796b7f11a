//! Fare/transaction export job.
//!
//! Processes whatever deliveries are pending in the inbox, one at a time.
//! Data files are classified by name and delta-loaded; a failed file is
//! quarantined and the run moves on, a loaded file is acknowledged.
//! Lookup-table archives arriving on the same channel are refreshed by a
//! separate process and left untouched here.

use std::sync::Arc;

use common::Result;
use tracing::{Instrument, debug, error, info, info_span};

use crate::db::Warehouse;
use crate::db::copy::BulkCopy;
use crate::loader::delta::DeltaLoader;
use crate::schema::fare::{FARE_CATALOG, SERVICE_DATE_COLUMN};
use crate::source::FileInbox;

pub struct FareJob {
    delta: DeltaLoader,
}

impl FareJob {
    pub fn new(warehouse: Arc<dyn Warehouse>, copy: Arc<dyn BulkCopy>, db_schema: &str) -> Self {
        Self {
            delta: DeltaLoader::new(warehouse, copy, db_schema),
        }
    }

    pub async fn run(&self, inbox: &dyn FileInbox) -> Result<()> {
        for file_name in inbox.pending().await? {
            let Some(table) = classify(&file_name) else {
                debug!(file = %file_name, "not a fare data file, leaving in place");
                continue;
            };

            // the span is attached to the future, not held across awaits
            let span = info_span!("fare_load_file", file = %file_name);
            async {
                match self.load_one(inbox, &file_name, table).await {
                    Ok(rows) => {
                        info!(table, rows, "file loaded");
                        inbox.acknowledge(&file_name).await
                    }
                    Err(e) => {
                        error!(table, error = %e, "file load failed");
                        inbox.quarantine(&file_name).await
                    }
                }
            }
            .instrument(span)
            .await?;
        }
        Ok(())
    }

    async fn load_one(&self, inbox: &dyn FileInbox, file_name: &str, table: &str) -> Result<u64> {
        let schema = FARE_CATALOG.schema_for(table)?;
        let local_path = inbox.fetch(file_name).await?;
        self.delta
            .load_file(schema, SERVICE_DATE_COLUMN, file_name, &local_path)
            .await
    }
}

/// Route a delivery to its destination table by file name, as the export
/// process names them. Lookup archives and anything unrecognized return
/// `None`.
fn classify(file_name: &str) -> Option<&'static str> {
    let lowered = file_name.to_lowercase();
    if lowered.contains("_ridership_") {
        Some("ridership")
    } else if lowered.contains("_faregate_") {
        Some("faregate")
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::copy::tests::RecordingCopy;
    use crate::db::tests::FakeWarehouse;
    use std::fs;
    use tempfile::TempDir;

    use crate::source::DirInbox;

    const FAREGATE_HEADER: &str = "trxtime,servicedate,deviceclassid,deviceid,uniquemsid,eventsequno,tariffversion,tarifflocationid,unplanned,eventcode,inserted";

    fn stage(dir: &TempDir, name: &str, contents: &str) {
        fs::write(dir.path().join(name), contents).unwrap();
    }

    #[test]
    fn classification_by_file_name() {
        assert_eq!(classify("20240305_FAREGATE_export.csv"), Some("faregate"));
        assert_eq!(
            classify("bulk_import_ridership_20231115_20240203.csv"),
            Some("ridership")
        );
        assert_eq!(classify("afc_lookups_20240305.tar"), None);
    }

    #[tokio::test]
    async fn delivery_is_loaded_and_acknowledged() {
        let dir = TempDir::new().unwrap();
        stage(
            &dir,
            "20240305_faregate_export.csv",
            &format!("{FAREGATE_HEADER}\n08:12:44,2024-03-05,1,55,9001,3,12,40,0,612,2024-03-06\n"),
        );
        let warehouse = Arc::new(FakeWarehouse::new());
        let copy = Arc::new(RecordingCopy::new());
        let job = FareJob::new(warehouse.clone(), copy.clone(), "fare");

        job.run(&DirInbox::new(dir.path())).await.unwrap();

        let statements = warehouse.statements();
        assert!(statements[0].starts_with("CREATE TABLE fare.faregate_y2024m03 PARTITION OF"));
        assert_eq!(
            statements[1],
            "DELETE FROM fare.faregate WHERE servicedate = '2024-03-05'"
        );
        assert_eq!(copy.calls()[0].destination, "fare.faregate");
        // acknowledged: the delivery is gone
        assert!(!dir.path().join("20240305_faregate_export.csv").exists());
    }

    #[tokio::test]
    async fn failed_delivery_is_quarantined_and_siblings_load() {
        let dir = TempDir::new().unwrap();
        // missing almost every declared column
        stage(&dir, "20240301_faregate_broken.csv", "trxtime\n08:00:00\n");
        stage(
            &dir,
            "20240305_faregate_export.csv",
            &format!("{FAREGATE_HEADER}\n08:12:44,2024-03-05,1,55,9001,3,12,40,0,612,2024-03-06\n"),
        );
        let warehouse = Arc::new(FakeWarehouse::new());
        let copy = Arc::new(RecordingCopy::new());
        let job = FareJob::new(warehouse.clone(), copy.clone(), "fare");

        job.run(&DirInbox::new(dir.path())).await.unwrap();

        assert!(dir.path().join("error/20240301_faregate_broken.csv").exists());
        assert!(!dir.path().join("20240305_faregate_export.csv").exists());
        assert_eq!(copy.calls().len(), 1);
    }

    #[tokio::test]
    async fn lookup_archives_are_left_in_place() {
        let dir = TempDir::new().unwrap();
        stage(&dir, "afc_lookups_20240305.tar", "binary");
        let warehouse = Arc::new(FakeWarehouse::new());
        let copy = Arc::new(RecordingCopy::new());
        let job = FareJob::new(warehouse.clone(), copy.clone(), "fare");

        job.run(&DirInbox::new(dir.path())).await.unwrap();

        assert!(dir.path().join("afc_lookups_20240305.tar").exists());
        assert!(warehouse.statements().is_empty());
    }
}
