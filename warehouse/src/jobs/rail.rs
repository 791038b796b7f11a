//! Rail-operations export job.
//!
//! Data files are named `{YYYYMMDD}_{table}_{suffix}` and replace their
//! service date in the named table. Files without a date prefix are
//! lookup refreshes handled elsewhere and skipped here.

use std::sync::Arc;

use common::Result;
use tracing::{Instrument, debug, error, info, info_span};

use crate::db::Warehouse;
use crate::db::copy::BulkCopy;
use crate::loader::delta::DeltaLoader;
use crate::partition::resolve;
use crate::schema::rail::{RAIL_CATALOG, SERVICE_DATE_COLUMN};
use crate::source::FileInbox;

pub struct RailJob {
    delta: DeltaLoader,
}

impl RailJob {
    pub fn new(warehouse: Arc<dyn Warehouse>, copy: Arc<dyn BulkCopy>, db_schema: &str) -> Self {
        Self {
            delta: DeltaLoader::new(warehouse, copy, db_schema),
        }
    }

    pub async fn run(&self, inbox: &dyn FileInbox) -> Result<()> {
        for file_name in inbox.pending().await? {
            if resolve::service_date(&file_name).is_err() {
                debug!(file = %file_name, "no service-date prefix, leaving lookup file in place");
                continue;
            }

            // the span is attached to the future, not held across awaits
            let span = info_span!("rail_load_file", file = %file_name);
            async {
                match self.load_one(inbox, &file_name).await {
                    Ok(rows) => {
                        info!(rows, "file loaded");
                        inbox.acknowledge(&file_name).await
                    }
                    Err(e) => {
                        error!(error = %e, "file load failed");
                        inbox.quarantine(&file_name).await
                    }
                }
            }
            .instrument(span)
            .await?;
        }
        Ok(())
    }

    async fn load_one(&self, inbox: &dyn FileInbox, file_name: &str) -> Result<u64> {
        let table = resolve::table_from_file_name(file_name)?;
        let schema = RAIL_CATALOG.schema_for(&table)?;
        let local_path = inbox.fetch(file_name).await?;
        self.delta
            .load_file(schema, SERVICE_DATE_COLUMN, file_name, &local_path)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::copy::tests::RecordingCopy;
    use crate::db::tests::FakeWarehouse;
    use crate::source::DirInbox;
    use std::fs;
    use tempfile::TempDir;

    const MOVEMENTS_HEADER: &str = "svc_date,trip_id,stop_id,stop_sequence,arrival_time,departure_time,track_id,headway_seconds,dwell_seconds";

    fn stage(dir: &TempDir, name: &str, contents: &str) {
        fs::write(dir.path().join(name), contents).unwrap();
    }

    #[tokio::test]
    async fn routes_file_to_table_from_its_name() {
        let dir = TempDir::new().unwrap();
        stage(
            &dir,
            "20240305_train_movements_0133.csv",
            &format!("{MOVEMENTS_HEADER}\n2024-03-05,t1,s1,1,08:00:00,08:00:30,2,240,30\n"),
        );
        let warehouse = Arc::new(FakeWarehouse::new());
        let copy = Arc::new(RecordingCopy::new());
        let job = RailJob::new(warehouse.clone(), copy.clone(), "rail");

        job.run(&DirInbox::new(dir.path())).await.unwrap();

        let statements = warehouse.statements();
        assert!(statements[0].starts_with("CREATE TABLE rail.train_movements_y2024m03"));
        assert_eq!(
            statements[1],
            "DELETE FROM rail.train_movements WHERE svc_date = '2024-03-05'"
        );
        assert_eq!(copy.calls()[0].destination, "rail.train_movements");
    }

    #[tokio::test]
    async fn unknown_table_is_quarantined() {
        let dir = TempDir::new().unwrap();
        stage(&dir, "20240305_mystery_table_01.csv", "a,b\n1,2\n");
        let warehouse = Arc::new(FakeWarehouse::new());
        let copy = Arc::new(RecordingCopy::new());
        let job = RailJob::new(warehouse.clone(), copy.clone(), "rail");

        job.run(&DirInbox::new(dir.path())).await.unwrap();

        assert!(dir.path().join("error/20240305_mystery_table_01.csv").exists());
        assert!(warehouse.statements().is_empty());
    }

    #[tokio::test]
    async fn lookup_files_are_skipped() {
        let dir = TempDir::new().unwrap();
        stage(&dir, "pattern_full.csv", "pattern_id\np1\n");
        let warehouse = Arc::new(FakeWarehouse::new());
        let copy = Arc::new(RecordingCopy::new());
        let job = RailJob::new(warehouse.clone(), copy.clone(), "rail");

        job.run(&DirInbox::new(dir.path())).await.unwrap();

        assert!(dir.path().join("pattern_full.csv").exists());
        assert!(warehouse.statements().is_empty());
    }
}
