//! Derived geometry tables built after a snapshot's primary loads.
//!
//! Fixed dependency order: shapes_geog, then stops_geog, then
//! stop_in_pattern. Each step reads only sealed partitions of the current
//! validity range; a source that is absent or still unconstrained means a
//! prior load died mid-lifecycle, and the step refuses to run rather than
//! aggregate half-loaded data. Each output is itself an inheritance
//! partition, sealed like any primary table.

use std::sync::Arc;

use common::{Error, Result};
use tracing::info;

use crate::db::Warehouse;
use crate::partition::lifecycle::PartitionLifecycleManager;
use crate::partition::{PartitionKey, ValidityRange};

/// Projected X/Y enrichment only applies inside the service region.
const LON_MIN: &str = "-74.0000000";
const LON_MAX: &str = "-69.0000000";
const LAT_MIN: &str = "41.0000000";
const LAT_MAX: &str = "43.0000000";

/// Path positions are computed for buses only.
const BUS_ROUTE_TYPE: i32 = 3;

struct DerivedStep {
    table: &'static str,
    sources: &'static [&'static str],
    primary_key: &'static [&'static str],
}

const STEPS: &[DerivedStep] = &[
    DerivedStep {
        table: "shapes_geog",
        sources: &["shapes"],
        primary_key: &["shape_id"],
    },
    DerivedStep {
        table: "stops_geog",
        sources: &["stops"],
        primary_key: &["stop_id"],
    },
    DerivedStep {
        table: "stop_in_pattern",
        sources: &["shapes_geog", "trips", "routes", "stop_times", "stops_geog"],
        primary_key: &["shape_id", "stop_sequence"],
    },
];

pub struct DerivedTableBuilder {
    warehouse: Arc<dyn Warehouse>,
    lifecycle: PartitionLifecycleManager,
    db_schema: String,
}

impl DerivedTableBuilder {
    pub fn new(warehouse: Arc<dyn Warehouse>, db_schema: &str) -> Self {
        Self {
            lifecycle: PartitionLifecycleManager::new(warehouse.clone(), db_schema),
            warehouse,
            db_schema: db_schema.to_string(),
        }
    }

    /// Build every derived table for one validity range, in order.
    pub async fn build_all(&self, range: &ValidityRange) -> Result<()> {
        for step in STEPS {
            self.build_step(step, range).await?;
        }
        Ok(())
    }

    async fn build_step(&self, step: &DerivedStep, range: &ValidityRange) -> Result<()> {
        for source in step.sources {
            self.require_sealed(source, range).await?;
        }

        let handle = self
            .lifecycle
            .ensure(step.table, &PartitionKey::Validity(*range))
            .await?;

        let insert_query = match step.table {
            "shapes_geog" => self.shapes_geog_query(&handle.qualified_name, range),
            "stops_geog" => self.stops_geog_query(&handle.qualified_name, range),
            "stop_in_pattern" => self.stop_in_pattern_query(&handle.qualified_name, range),
            other => return Err(Error::UnknownTable(other.to_string())),
        };
        self.warehouse.execute(&insert_query).await?;

        self.lifecycle.seal(&handle, step.primary_key, range).await?;

        info!(table = %handle.qualified_name, "derived table built");
        Ok(())
    }

    /// A source partition must exist and already carry its validity
    /// CHECK constraints. Anything else is a leftover of a failed load.
    async fn require_sealed(&self, table: &str, range: &ValidityRange) -> Result<()> {
        let partition = range.partition_name(table);
        let qualified = format!("{}.{}", self.db_schema, partition);

        if !self.warehouse.table_exists(&self.db_schema, &partition).await? {
            return Err(Error::PartialPartition(qualified));
        }
        if self.warehouse.check_constraint_count(&self.db_schema, &partition).await? == 0 {
            return Err(Error::PartialPartition(qualified));
        }
        Ok(())
    }

    fn partition(&self, table: &str, range: &ValidityRange) -> String {
        format!("{}.{}", self.db_schema, range.partition_name(table))
    }

    /// One line geometry per path, points ordered by sequence number.
    fn shapes_geog_query(&self, destination: &str, range: &ValidityRange) -> String {
        let shapes = self.partition("shapes", range);
        format!(
            "INSERT INTO {destination} \
             SELECT shape_id\
             ,ST_MakeLine(array_agg(ST_GeomFromText('POINT(' || shape_pt_lon || ' ' || shape_pt_lat || ')', 4326) ORDER BY shape_pt_sequence))\
             ,valid_start_date, valid_end_date \
             FROM {shapes} \
             GROUP BY shape_id, valid_start_date, valid_end_date \
             ORDER BY shape_id"
        )
    }

    /// Geography and geometry points per stop, plus integer projected
    /// X/Y (EPSG:3585, millimeter-scaled) inside the service bounding
    /// box; null outside it.
    fn stops_geog_query(&self, destination: &str, range: &ValidityRange) -> String {
        let stops = self.partition("stops", range);
        format!(
            "INSERT INTO {destination} \
             SELECT stop_id, parent_station\
             , ST_GeogFromText('SRID=4326;POINT(' || stop_lon || ' ' || stop_lat || ')')\
             , ST_GeomFromText('POINT(' || stop_lon || ' ' || stop_lat || ')', 4326)\
             , CASE WHEN stop_lon::decimal BETWEEN {LON_MIN} AND {LON_MAX} \
               AND stop_lat::decimal BETWEEN {LAT_MIN} AND {LAT_MAX} \
               THEN (st_x(st_transform(st_geomFromText('POINT(' || stop_lon || ' ' || stop_lat || ')', 4326), 3585)) * 1000)::int \
               ELSE null END x\
             , CASE WHEN stop_lon::decimal BETWEEN {LON_MIN} AND {LON_MAX} \
               AND stop_lat::decimal BETWEEN {LAT_MIN} AND {LAT_MAX} \
               THEN (st_y(st_transform(st_geomFromText('POINT(' || stop_lon || ' ' || stop_lat || ')', 4326), 3585)) * 1000)::int \
               ELSE null END y\
             , valid_start_date, valid_end_date \
             FROM {stops} \
             ORDER BY stop_id"
        )
    }

    /// Per (path, stop_sequence): the stop and its linear distance along
    /// the path in meters, via one representative trip per path,
    /// restricted to bus routes.
    fn stop_in_pattern_query(&self, destination: &str, range: &ValidityRange) -> String {
        let shapes_geog = self.partition("shapes_geog", range);
        let trips = self.partition("trips", range);
        let routes = self.partition("routes", range);
        let stop_times = self.partition("stop_times", range);
        let stops_geog = self.partition("stops_geog", range);
        format!(
            "INSERT INTO {destination} \
             SELECT shg.shape_id, st.stop_sequence, st.stop_id\
             ,(ST_LineLocatePoint(shape, geom) * ST_Length(ST_Transform(shape,26986)))::INT\
             ,shg.valid_start_date, shg.valid_end_date \
             FROM {shapes_geog} shg \
             INNER JOIN (\
             SELECT shape_id, min(trip_id) trip_id, min(route_id) route_id \
             FROM {trips} \
             GROUP BY shape_id\
             ) t ON t.shape_id = shg.shape_id \
             INNER JOIN {routes} r ON r.route_id = t.route_id AND r.route_type = {BUS_ROUTE_TYPE} \
             INNER JOIN {stop_times} st ON st.trip_id = t.trip_id \
             INNER JOIN {stops_geog} stg ON stg.stop_id = st.stop_id \
             ORDER BY shg.shape_id, st.stop_sequence"
        )
    }
}
