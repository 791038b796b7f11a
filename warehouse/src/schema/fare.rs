//! Catalog for the fare/transaction export.
//!
//! Both tables are high-volume facts range-partitioned by calendar month
//! on `servicedate`; loads are delete-then-insert replacements for a
//! service date (or date range, for bulk exports), never appends. The
//! parent tables pre-exist and carry no primary key.

use once_cell::sync::Lazy;

use super::{ColumnType, SchemaCatalog, TableSchema};
use ColumnType::{Float64, Int16, Int32, Int64, Text};

/// Column in delete statements for this dataset's service-date key.
pub const SERVICE_DATE_COLUMN: &str = "servicedate";

pub static FARE_CATALOG: Lazy<SchemaCatalog> = Lazy::new(|| {
    SchemaCatalog::new(vec![
        TableSchema {
            table_name: "faregate",
            columns: vec![
                ("trxtime", Text),
                ("servicedate", Text),
                ("deviceclassid", Int32),
                ("deviceid", Int64),
                ("uniquemsid", Int64),
                ("eventsequno", Int64),
                ("tariffversion", Int32),
                ("tarifflocationid", Int32),
                ("unplanned", Int16),
                ("eventcode", Int32),
                ("inserted", Text),
            ],
            date_columns: vec![],
            primary_key: vec![],
        },
        TableSchema {
            table_name: "ridership",
            columns: vec![
                ("deviceclassid", Int32),
                ("deviceid", Int64),
                ("uniquemsid", Int64),
                ("salestransactionno", Int64),
                ("sequenceno", Int64),
                ("trxtime", Text),
                ("servicedate", Text),
                ("branchlineid", Int32),
                ("fareoptamount", Float64),
                ("tariffversion", Int32),
                ("articleno", Int64),
                ("card", Text),
                ("ticketstocktype", Text),
                ("tvmtarifflocationid", Int32),
                ("movementtype", Text),
                ("bookcanc", Text),
                ("correctioncounter", Int32),
                ("correctionflag", Text),
                ("tempbooking", Text),
                ("testsaleflag", Text),
                ("inserted", Text),
            ],
            date_columns: vec![],
            primary_key: vec![],
        },
    ])
});

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fare_tables_have_service_date() {
        for table in ["faregate", "ridership"] {
            let schema = FARE_CATALOG.schema_for(table).unwrap();
            assert!(
                schema.column_names().iter().any(|c| c == SERVICE_DATE_COLUMN),
                "{table} missing {SERVICE_DATE_COLUMN}"
            );
        }
    }

    #[test]
    fn ridership_column_count() {
        let schema = FARE_CATALOG.schema_for("ridership").unwrap();
        assert_eq!(schema.columns.len(), 21);
    }
}
