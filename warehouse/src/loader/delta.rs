//! Delete-then-insert loads for the calendar-partitioned datasets.
//!
//! Source systems resend corrected data for dates already loaded, so a
//! delivery replaces its date (or date range) wholesale: verify the month
//! partition(s), delete the matching rows from the parent, then bulk-load
//! the file. The delete and the copy commit independently; a crash in
//! between leaves the range empty rather than duplicated.

use std::path::Path;
use std::sync::Arc;

use common::Result;
use tokio::fs::File;
use tracing::info;

use super::TableLoader;
use crate::db::Warehouse;
use crate::db::copy::BulkCopy;
use crate::partition::lifecycle::PartitionLifecycleManager;
use crate::partition::resolve;
use crate::partition::{CalendarMonth, PartitionKey};
use crate::schema::TableSchema;

pub struct DeltaLoader {
    warehouse: Arc<dyn Warehouse>,
    lifecycle: PartitionLifecycleManager,
    loader: TableLoader,
    db_schema: String,
}

impl DeltaLoader {
    pub fn new(warehouse: Arc<dyn Warehouse>, copy: Arc<dyn BulkCopy>, db_schema: &str) -> Self {
        Self {
            lifecycle: PartitionLifecycleManager::new(warehouse.clone(), db_schema),
            loader: TableLoader::new(copy),
            warehouse,
            db_schema: db_schema.to_string(),
        }
    }

    /// Replace the rows keyed by `file_name`'s date (or bulk range) with
    /// the delivery at `local_path`. `date_column` is the dataset's
    /// service-date column. Returns the number of rows loaded.
    pub async fn load_file(
        &self,
        schema: &TableSchema,
        date_column: &str,
        file_name: &str,
        local_path: &Path,
    ) -> Result<u64> {
        let parent = format!("{}.{}", self.db_schema, schema.table_name);

        if resolve::is_bulk_file(file_name) {
            let (start_date, end_date) = resolve::bulk_date_range(file_name)?;

            // every month the bulk range touches needs its partition in
            // place before any rows are removed
            for month in resolve::months_covering(start_date, end_date) {
                self.lifecycle
                    .ensure(schema.table_name, &PartitionKey::Month(month))
                    .await?;
            }

            let delete_query = format!(
                "DELETE FROM {parent} WHERE {date_column} >= '{start_date}' AND {date_column} <= '{end_date}'"
            );
            let deleted = self.warehouse.execute(&delete_query).await?;
            info!(table = %parent, %start_date, %end_date, deleted, "cleared bulk range");
        } else {
            let service_date = resolve::service_date(file_name)?;
            let month = PartitionKey::Month(CalendarMonth::containing(service_date));
            self.lifecycle.ensure(schema.table_name, &month).await?;

            let delete_query =
                format!("DELETE FROM {parent} WHERE {date_column} = '{service_date}'");
            let deleted = self.warehouse.execute(&delete_query).await?;
            info!(table = %parent, %service_date, deleted, "cleared service date");
        }

        let source = File::open(local_path).await?.into_std().await;
        self.loader
            .load(schema, Box::new(source), &parent, &[])
            .await
    }
}
