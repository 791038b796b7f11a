//! Schedule snapshot job.
//!
//! Fetches the current feed publication, gates on the stored version
//! history, and on a new version loads the full snapshot: feed metadata
//! first (which appends the version-history row), then every catalog
//! table into a fresh sealed partition, then the derived geometry tables.

use std::sync::Arc;

use common::{Error, Result};
use tracing::{Instrument, error, info, info_span, warn};

use crate::db::Warehouse;
use crate::db::copy::BulkCopy;
use crate::derived::DerivedTableBuilder;
use crate::loader::TableLoader;
use crate::partition::PartitionKey;
use crate::partition::lifecycle::PartitionLifecycleManager;
use crate::schema::schedule::{FEED_INFO_SCHEMA, SCHEDULE_CATALOG};
use crate::snapshot::{FeedMetadata, GateDecision, SnapshotVersionGate, parse_feed_metadata};
use crate::source::{FeedSnapshot, FeedSource};

pub struct ScheduleJob {
    gate: SnapshotVersionGate,
    lifecycle: PartitionLifecycleManager,
    loader: TableLoader,
    derived: DerivedTableBuilder,
    db_schema: String,
}

impl ScheduleJob {
    pub fn new(warehouse: Arc<dyn Warehouse>, copy: Arc<dyn BulkCopy>, db_schema: &str) -> Self {
        Self {
            gate: SnapshotVersionGate::new(warehouse.clone(), db_schema),
            lifecycle: PartitionLifecycleManager::new(warehouse.clone(), db_schema),
            loader: TableLoader::new(copy),
            derived: DerivedTableBuilder::new(warehouse, db_schema),
            db_schema: db_schema.to_string(),
        }
    }

    pub async fn run(&self, feed: &dyn FeedSource) -> Result<()> {
        let snapshot = feed.fetch().await?;

        if self.gate.decide(&snapshot.version_id).await? == GateDecision::Skip {
            info!(version = %snapshot.version_id, "snapshot already loaded, nothing to do");
            return Ok(());
        }

        // shared step: every table depends on the feed metadata
        let metadata = parse_feed_metadata(snapshot.tables.member("feed_info")?)?;
        info!(
            version = %metadata.feed_version,
            start = %metadata.validity.start_date,
            end = %metadata.validity.end_date,
            "loading new snapshot"
        );

        self.append_version_history(&snapshot, &metadata).await?;
        self.load_tables(&snapshot, &metadata).await?;
        self.derived.build_all(&metadata.validity).await?;

        info!(version = %metadata.feed_version, "snapshot load complete");
        Ok(())
    }

    /// Append the metadata row to the main feed_info table. This is the
    /// version-history write the gate consults on the next run; it is not
    /// partitioned.
    async fn append_version_history(
        &self,
        snapshot: &FeedSnapshot,
        metadata: &FeedMetadata,
    ) -> Result<()> {
        let constants = [
            (
                "creation_timestamp",
                metadata.creation_timestamp.format("%Y-%m-%d %H:%M:%S").to_string(),
            ),
            ("valid_start_date", metadata.validity.start_date.to_string()),
            ("valid_end_date", metadata.validity.end_date.to_string()),
        ];
        self.loader
            .load(
                &FEED_INFO_SCHEMA,
                snapshot.tables.member("feed_info")?,
                &format!("{}.feed_info", self.db_schema),
                &constants,
            )
            .await?;
        Ok(())
    }

    /// Load every catalog table into its own sealed partition. A failing
    /// table does not abort its siblings; the first failure is reported
    /// after the rest have been attempted, and the derived builds never
    /// run on an incomplete snapshot.
    async fn load_tables(&self, snapshot: &FeedSnapshot, metadata: &FeedMetadata) -> Result<()> {
        let mut first_failure: Option<Error> = None;

        for table_name in SCHEDULE_CATALOG.table_names() {
            // the span is attached to the future, not held across awaits
            let span = info_span!("load_snapshot_table", table = table_name);
            async {
                match self.load_one_table(snapshot, metadata, table_name).await {
                    Ok(rows) => info!(rows, "table loaded"),
                    Err(e) => {
                        error!(error = %e, "table load failed");
                        first_failure.get_or_insert(e);
                    }
                }
            }
            .instrument(span)
            .await;
        }

        match first_failure {
            None => Ok(()),
            Some(e) => {
                warn!("snapshot incomplete, skipping derived builds");
                Err(e)
            }
        }
    }

    async fn load_one_table(
        &self,
        snapshot: &FeedSnapshot,
        metadata: &FeedMetadata,
        table_name: &str,
    ) -> Result<u64> {
        let schema = SCHEDULE_CATALOG.schema_for(table_name)?;
        let range = metadata.validity;

        let handle = self
            .lifecycle
            .ensure(table_name, &PartitionKey::Validity(range))
            .await?;

        let constants = [
            ("valid_start_date", range.start_date.to_string()),
            ("valid_end_date", range.end_date.to_string()),
        ];
        let rows = self
            .loader
            .load(
                schema,
                snapshot.tables.member(table_name)?,
                &handle.qualified_name,
                &constants,
            )
            .await?;

        self.lifecycle.seal(&handle, &schema.primary_key, &range).await?;
        Ok(rows)
    }
}
