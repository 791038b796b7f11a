//! Catalog for the rail-operations export.
//!
//! Data tables arrive as `{YYYYMMDD}_{table}_{suffix}.csv` files and are
//! delta-loaded by `svc_date`. Lookup tables from the same export are a
//! plain truncate-and-reload and are handled outside this engine.

use once_cell::sync::Lazy;

use super::{ColumnType, SchemaCatalog, TableSchema};
use ColumnType::{Float64, Int32, Int64, Text};

/// Column in delete statements for this dataset's service-date key.
pub const SERVICE_DATE_COLUMN: &str = "svc_date";

pub static RAIL_CATALOG: Lazy<SchemaCatalog> = Lazy::new(|| {
    SchemaCatalog::new(vec![
        TableSchema {
            table_name: "train_movements",
            columns: vec![
                ("svc_date", Text),
                ("trip_id", Text),
                ("stop_id", Text),
                ("stop_sequence", Int32),
                ("arrival_time", Text),
                ("departure_time", Text),
                ("track_id", Text),
                ("headway_seconds", Int64),
                ("dwell_seconds", Int64),
            ],
            date_columns: vec![],
            primary_key: vec![],
        },
        TableSchema {
            table_name: "passenger_journeys",
            columns: vec![
                ("svc_date", Text),
                ("journey_id", Text),
                ("origin_stop_id", Text),
                ("destination_stop_id", Text),
                ("boarding_time", Text),
                ("alighting_time", Text),
                ("route_id", Text),
                ("load_factor", Float64),
            ],
            date_columns: vec![],
            primary_key: vec![],
        },
    ])
});
