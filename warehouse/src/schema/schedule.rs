//! Catalog for the published schedule snapshot feed.
//!
//! Every table of one feed publication is wholesale-replaced into a fresh
//! validity-range partition; the feed_info table is the version-history
//! table and is appended to directly, never partitioned.

use once_cell::sync::Lazy;

use super::{ColumnType, SchemaCatalog, TableSchema};
use ColumnType::{Float64, Int16, Int64, Text};

pub static SCHEDULE_CATALOG: Lazy<SchemaCatalog> = Lazy::new(|| {
    SchemaCatalog::new(vec![
        TableSchema {
            table_name: "agency",
            columns: vec![
                ("agency_id", Text),
                ("agency_name", Text),
                ("agency_url", Text),
                ("agency_timezone", Text),
                ("agency_lang", Text),
                ("agency_phone", Text),
            ],
            date_columns: vec![],
            primary_key: vec!["agency_id"],
        },
        TableSchema {
            table_name: "calendar",
            columns: vec![
                ("service_id", Text),
                ("monday", Int16),
                ("tuesday", Int16),
                ("wednesday", Int16),
                ("thursday", Int16),
                ("friday", Int16),
                ("saturday", Int16),
                ("sunday", Int16),
                ("start_date", Text),
                ("end_date", Text),
            ],
            date_columns: vec!["start_date", "end_date"],
            primary_key: vec!["service_id"],
        },
        TableSchema {
            table_name: "calendar_attributes",
            columns: vec![
                ("service_id", Text),
                ("service_description", Text),
                ("service_schedule_name", Text),
                ("service_schedule_type", Text),
                ("service_schedule_typicality", Int64),
            ],
            date_columns: vec![],
            primary_key: vec!["service_id"],
        },
        TableSchema {
            table_name: "calendar_dates",
            columns: vec![
                ("service_id", Text),
                ("date", Text),
                ("exception_type", Int16),
                ("holiday_name", Text),
            ],
            date_columns: vec!["date"],
            primary_key: vec!["service_id", "date"],
        },
        TableSchema {
            table_name: "checkpoints",
            columns: vec![("checkpoint_id", Text), ("checkpoint_name", Text)],
            date_columns: vec![],
            primary_key: vec!["checkpoint_id"],
        },
        TableSchema {
            table_name: "directions",
            columns: vec![
                ("route_id", Text),
                ("direction_id", Int16),
                ("direction", Text),
                ("direction_destination", Text),
            ],
            date_columns: vec![],
            primary_key: vec!["route_id", "direction_id"],
        },
        TableSchema {
            table_name: "facilities",
            columns: vec![
                ("facility_id", Text),
                ("facility_code", Text),
                ("facility_class", Int16),
                ("facility_type", Text),
                ("stop_id", Text),
                ("facility_short_name", Text),
                ("facility_long_name", Text),
                ("facility_desc", Text),
                ("facility_lat", Float64),
                ("facility_lon", Float64),
                ("wheelchair_facility", Int16),
            ],
            date_columns: vec![],
            primary_key: vec!["facility_id"],
        },
        TableSchema {
            table_name: "facilities_properties",
            columns: vec![
                ("facility_id", Text),
                ("property_id", Text),
                ("value", Text),
            ],
            date_columns: vec![],
            primary_key: vec![],
        },
        TableSchema {
            table_name: "levels",
            columns: vec![
                ("level_id", Text),
                ("level_index", Float64),
                ("level_name", Text),
                ("level_elevation", Text),
            ],
            date_columns: vec![],
            primary_key: vec!["level_id"],
        },
        TableSchema {
            table_name: "lines",
            columns: vec![
                ("line_id", Text),
                ("line_short_name", Text),
                ("line_long_name", Text),
                ("line_desc", Text),
                ("line_url", Text),
                ("line_color", Text),
                ("line_text_color", Text),
                ("line_sort_order", Int64),
            ],
            date_columns: vec![],
            primary_key: vec!["line_id"],
        },
        TableSchema {
            table_name: "multi_route_trips",
            columns: vec![("added_route_id", Text), ("trip_id", Text)],
            date_columns: vec![],
            primary_key: vec!["added_route_id", "trip_id"],
        },
        TableSchema {
            table_name: "pathways",
            columns: vec![
                ("pathway_id", Text),
                ("from_stop_id", Text),
                ("to_stop_id", Text),
                ("facility_id", Text),
                ("pathway_mode", Int64),
                ("traversal_time", Int64),
                ("wheelchair_traversal_time", Int64),
                ("stair_count", Int64),
                ("pathway_name", Text),
                ("pathway_code", Text),
                ("signposted_as", Text),
                ("instructions", Text),
            ],
            date_columns: vec![],
            primary_key: vec!["pathway_id"],
        },
        TableSchema {
            table_name: "route_patterns",
            columns: vec![
                ("route_pattern_id", Text),
                ("route_id", Text),
                ("direction_id", Int16),
                ("route_pattern_name", Text),
                ("route_pattern_time_desc", Text),
                ("route_pattern_typicality", Int16),
                ("route_pattern_sort_order", Int64),
                ("representative_trip_id", Text),
            ],
            date_columns: vec![],
            primary_key: vec!["route_pattern_id"],
        },
        TableSchema {
            table_name: "routes",
            columns: vec![
                ("route_id", Text),
                ("agency_id", Text),
                ("route_short_name", Text),
                ("route_long_name", Text),
                ("route_desc", Text),
                ("route_type", Int64),
                ("route_url", Text),
                ("route_color", Text),
                ("route_text_color", Text),
                ("route_sort_order", Int64),
                ("route_fare_class", Text),
                ("line_id", Text),
                ("listed_route", Text),
            ],
            date_columns: vec![],
            primary_key: vec!["route_id"],
        },
        TableSchema {
            table_name: "shapes",
            columns: vec![
                ("shape_id", Text),
                ("shape_pt_lat", Float64),
                ("shape_pt_lon", Float64),
                ("shape_pt_sequence", Int64),
                ("shape_dist_traveled", Float64),
            ],
            date_columns: vec![],
            primary_key: vec!["shape_id", "shape_pt_sequence"],
        },
        TableSchema {
            table_name: "stop_times",
            columns: vec![
                ("trip_id", Text),
                ("arrival_time", Text),
                ("departure_time", Text),
                ("stop_id", Text),
                ("stop_sequence", Int64),
                ("stop_headsign", Text),
                ("pickup_type", Int64),
                ("drop_off_type", Int64),
                ("timepoint", Int64),
                ("checkpoint_id", Text),
            ],
            date_columns: vec![],
            primary_key: vec!["trip_id", "stop_sequence"],
        },
        TableSchema {
            table_name: "stops",
            columns: vec![
                ("stop_id", Text),
                ("stop_code", Text),
                ("stop_name", Text),
                ("stop_desc", Text),
                ("stop_lat", Float64),
                ("stop_lon", Float64),
                ("zone_id", Text),
                ("stop_address", Text),
                ("stop_url", Text),
                ("level_id", Text),
                ("location_type", Int64),
                ("parent_station", Text),
                ("wheelchair_boarding", Int64),
            ],
            date_columns: vec![],
            primary_key: vec!["stop_id"],
        },
        TableSchema {
            table_name: "transfers",
            columns: vec![
                ("from_stop_id", Text),
                ("to_stop_id", Text),
                ("transfer_type", Int64),
                ("min_transfer_time", Int64),
                ("min_walk_time", Int64),
                ("min_wheelchair_time", Int64),
                ("suggested_buffer_time", Int64),
                ("wheelchair_transfer", Int64),
                ("from_trip_id", Text),
                ("to_trip_id", Text),
            ],
            date_columns: vec![],
            primary_key: vec![],
        },
        TableSchema {
            table_name: "trips",
            columns: vec![
                ("route_id", Text),
                ("service_id", Text),
                ("trip_id", Text),
                ("trip_headsign", Text),
                ("trip_short_name", Text),
                ("direction_id", Int16),
                ("block_id", Text),
                ("shape_id", Text),
                ("wheelchair_accessible", Int16),
                ("trip_route_type", Int64),
                ("route_pattern_id", Text),
                ("bikes_allowed", Int16),
            ],
            date_columns: vec![],
            primary_key: vec!["trip_id"],
        },
    ])
});

/// Schema of the feed metadata member. Loaded outside the partition path:
/// one row is appended to the main feed_info table per accepted snapshot,
/// which doubles as the version history consulted by the gate.
pub static FEED_INFO_SCHEMA: Lazy<TableSchema> = Lazy::new(|| TableSchema {
    table_name: "feed_info",
    columns: vec![
        ("feed_publisher_name", Text),
        ("feed_publisher_url", Text),
        ("feed_lang", Text),
        ("feed_start_date", Text),
        ("feed_end_date", Text),
        ("feed_version", Text),
        ("feed_contact_email", Text),
    ],
    date_columns: vec!["feed_start_date", "feed_end_date"],
    primary_key: vec![],
});

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_has_all_snapshot_tables() {
        assert_eq!(SCHEDULE_CATALOG.len(), 19);
        for table in ["agency", "shapes", "stop_times", "stops", "trips", "routes"] {
            assert!(SCHEDULE_CATALOG.contains(table), "missing {table}");
        }
        // feed_info is not part of the partitioned load
        assert!(!SCHEDULE_CATALOG.contains("feed_info"));
    }

    #[test]
    fn calendar_declares_date_coercions() {
        let calendar = SCHEDULE_CATALOG.schema_for("calendar").unwrap();
        assert!(calendar.is_date_column("start_date"));
        assert!(calendar.is_date_column("end_date"));
        assert!(!calendar.is_date_column("service_id"));
    }
}
