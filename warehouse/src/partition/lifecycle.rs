//! Partition lifecycle management.
//!
//! Two strategies behind one `ensure` surface, picked by the key variant:
//!
//! * Calendar months become declarative range partitions attached to the
//!   parent. Creation is idempotent: the pg_tables check runs first and an
//!   existing partition is never recreated.
//! * Validity ranges become inheritance-based child tables. These are
//!   always created fresh, because historical snapshot ranges are
//!   non-contiguous and queried independently. Loading the same range
//!   twice therefore yields two coexisting children.
//!
//! Creation is not transactional with the subsequent load; a failed load
//! leaves an unconstrained child behind, which downstream builds detect
//! via the missing CHECK constraints.

use std::sync::Arc;

use common::Result;
use tracing::info;

use super::{CalendarMonth, PartitionKey, ValidityRange};
use crate::db::Warehouse;

/// A partition known to exist. `created` is false when a declarative
/// partition was already in place for the key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionHandle {
    pub qualified_name: String,
    pub created: bool,
}

pub struct PartitionLifecycleManager {
    warehouse: Arc<dyn Warehouse>,
    db_schema: String,
}

impl PartitionLifecycleManager {
    pub fn new(warehouse: Arc<dyn Warehouse>, db_schema: &str) -> Self {
        Self {
            warehouse,
            db_schema: db_schema.to_string(),
        }
    }

    /// Make sure a partition exists for `parent_table` and `key`,
    /// creating it if needed.
    pub async fn ensure(&self, parent_table: &str, key: &PartitionKey) -> Result<PartitionHandle> {
        match key {
            PartitionKey::Month(month) => self.ensure_month(parent_table, month).await,
            PartitionKey::Validity(range) => self.create_snapshot_child(parent_table, range).await,
        }
    }

    async fn ensure_month(
        &self,
        parent_table: &str,
        month: &CalendarMonth,
    ) -> Result<PartitionHandle> {
        let partition = month.partition_name(parent_table);
        let qualified_name = format!("{}.{}", self.db_schema, partition);

        if self.warehouse.table_exists(&self.db_schema, &partition).await? {
            return Ok(PartitionHandle {
                qualified_name,
                created: false,
            });
        }

        let from_month = month.first_day();
        let to_month = month.next().first_day();
        let create_query = format!(
            "CREATE TABLE {qualified_name} PARTITION OF {}.{parent_table} \
             FOR VALUES FROM ('{from_month}') TO ('{to_month}')",
            self.db_schema,
        );
        self.warehouse.execute(&create_query).await?;

        info!(partition = %qualified_name, "created month partition");
        Ok(PartitionHandle {
            qualified_name,
            created: true,
        })
    }

    async fn create_snapshot_child(
        &self,
        parent_table: &str,
        range: &ValidityRange,
    ) -> Result<PartitionHandle> {
        let qualified_name = format!("{}.{}", self.db_schema, range.partition_name(parent_table));

        let create_query = format!(
            "CREATE TABLE {qualified_name} () INHERITS ({}.{parent_table})",
            self.db_schema,
        );
        self.warehouse.execute(&create_query).await?;

        info!(partition = %qualified_name, "created snapshot child table");
        Ok(PartitionHandle {
            qualified_name,
            created: true,
        })
    }

    /// Seal a freshly loaded snapshot child: primary key first (when the
    /// schema declares one), then the two CHECK constraints pinning the
    /// validity columns to their exact literals. The checks are what lets
    /// the planner prune historical snapshots by validity window.
    pub async fn seal(
        &self,
        handle: &PartitionHandle,
        primary_key: &[&'static str],
        range: &ValidityRange,
    ) -> Result<()> {
        let alter_query = format!(
            "ALTER TABLE {} {}ADD CHECK (valid_start_date = '{}'),ADD CHECK (valid_end_date = '{}')",
            handle.qualified_name,
            primary_key_clause(primary_key),
            range.start_date,
            range.end_date,
        );
        self.warehouse.execute(&alter_query).await?;

        info!(partition = %handle.qualified_name, "partition sealed");
        Ok(())
    }
}

fn primary_key_clause(primary_key: &[&'static str]) -> String {
    if primary_key.is_empty() {
        String::new()
    } else {
        format!("ADD PRIMARY KEY ({}),", primary_key.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::tests::FakeWarehouse;
    use chrono::NaiveDate;

    fn month(year: i32, month: u32) -> PartitionKey {
        let first = NaiveDate::from_ymd_opt(year, month, 1).unwrap();
        PartitionKey::Month(CalendarMonth::containing(first))
    }

    fn range() -> ValidityRange {
        ValidityRange {
            start_date: NaiveDate::from_ymd_opt(2024, 1, 11).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2024, 6, 30).unwrap(),
        }
    }

    #[tokio::test]
    async fn month_partition_created_when_absent() {
        let warehouse = Arc::new(FakeWarehouse::new());
        let manager = PartitionLifecycleManager::new(warehouse.clone(), "fare");

        let handle = manager.ensure("faregate", &month(2024, 3)).await.unwrap();

        assert!(handle.created);
        assert_eq!(handle.qualified_name, "fare.faregate_y2024m03");
        let statements = warehouse.statements();
        assert_eq!(statements.len(), 1);
        assert_eq!(
            statements[0],
            "CREATE TABLE fare.faregate_y2024m03 PARTITION OF fare.faregate \
             FOR VALUES FROM ('2024-03-01') TO ('2024-04-01')"
        );
    }

    #[tokio::test]
    async fn month_partition_ensure_is_idempotent() {
        let warehouse = Arc::new(FakeWarehouse::new());
        let manager = PartitionLifecycleManager::new(warehouse.clone(), "fare");

        let first = manager.ensure("faregate", &month(2024, 3)).await.unwrap();
        let second = manager.ensure("faregate", &month(2024, 3)).await.unwrap();

        assert!(first.created);
        assert!(!second.created);
        // only the first call issued DDL
        assert_eq!(warehouse.statements().len(), 1);
    }

    #[tokio::test]
    async fn december_partition_bounds_roll_into_next_year() {
        let warehouse = Arc::new(FakeWarehouse::new());
        let manager = PartitionLifecycleManager::new(warehouse.clone(), "fare");

        manager.ensure("ridership", &month(2023, 12)).await.unwrap();

        let statements = warehouse.statements();
        assert!(statements[0].contains("FROM ('2023-12-01') TO ('2024-01-01')"));
    }

    #[tokio::test]
    async fn snapshot_child_always_created() {
        let warehouse = Arc::new(FakeWarehouse::new());
        let manager = PartitionLifecycleManager::new(warehouse.clone(), "gtfs");
        let key = PartitionKey::Validity(range());

        manager.ensure("stops", &key).await.unwrap();
        manager.ensure("stops", &key).await.unwrap();

        let statements = warehouse.statements();
        assert_eq!(statements.len(), 2);
        for statement in &statements {
            assert_eq!(
                statement,
                "CREATE TABLE gtfs.stops_20240111_20240630 () INHERITS (gtfs.stops)"
            );
        }
    }

    #[tokio::test]
    async fn seal_adds_primary_key_then_checks() {
        let warehouse = Arc::new(FakeWarehouse::new());
        let manager = PartitionLifecycleManager::new(warehouse.clone(), "gtfs");
        let handle = PartitionHandle {
            qualified_name: "gtfs.stops_20240111_20240630".to_string(),
            created: true,
        };

        manager.seal(&handle, &["stop_id"], &range()).await.unwrap();

        let statements = warehouse.statements();
        assert_eq!(
            statements[0],
            "ALTER TABLE gtfs.stops_20240111_20240630 ADD PRIMARY KEY (stop_id),\
             ADD CHECK (valid_start_date = '2024-01-11'),\
             ADD CHECK (valid_end_date = '2024-06-30')"
        );
    }

    #[tokio::test]
    async fn seal_without_primary_key_only_adds_checks() {
        let warehouse = Arc::new(FakeWarehouse::new());
        let manager = PartitionLifecycleManager::new(warehouse.clone(), "gtfs");
        let handle = PartitionHandle {
            qualified_name: "gtfs.transfers_20240111_20240630".to_string(),
            created: true,
        };

        manager.seal(&handle, &[], &range()).await.unwrap();

        let statements = warehouse.statements();
        assert!(!statements[0].contains("PRIMARY KEY"));
        assert!(statements[0].contains("ADD CHECK (valid_start_date = '2024-01-11')"));
    }
}
