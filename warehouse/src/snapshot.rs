//! Snapshot versioning: the idempotency gate for versioned feed loads and
//! the feed-metadata parsing that binds a snapshot to its validity range.
//!
//! The warehouse's feed_info table is the sole version history: one row is
//! appended per accepted snapshot, and "current" is the row with the
//! latest creation_timestamp. There is no other duplicate detection in the
//! load path.

use std::io::Read;
use std::sync::Arc;

use chrono::{NaiveDate, NaiveDateTime};
use common::{Error, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::info;

use crate::db::Warehouse;
use crate::partition::ValidityRange;
use crate::schema::schedule::FEED_INFO_SCHEMA;

static VERSION_TIMESTAMP: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\d{4}-\d{2}-\d{2}T\d{2}:\d{2}:\d{2}").expect("valid regex")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    Proceed,
    Skip,
}

/// Pure comparison: skip only on an exact match with the stored version;
/// any difference, including no stored version at all, proceeds.
pub fn decide(fetched_version: &str, stored_version: Option<&str>) -> GateDecision {
    match stored_version {
        Some(stored) if stored == fetched_version => GateDecision::Skip,
        _ => GateDecision::Proceed,
    }
}

pub struct SnapshotVersionGate {
    warehouse: Arc<dyn Warehouse>,
    db_schema: String,
}

impl SnapshotVersionGate {
    pub fn new(warehouse: Arc<dyn Warehouse>, db_schema: &str) -> Self {
        Self {
            warehouse,
            db_schema: db_schema.to_string(),
        }
    }

    pub async fn decide(&self, fetched_version: &str) -> Result<GateDecision> {
        let query = format!(
            "SELECT feed_version FROM {}.feed_info ORDER BY creation_timestamp DESC LIMIT 1",
            self.db_schema,
        );
        let stored = self.warehouse.select_optional_string(&query).await?;

        let decision = decide(fetched_version, stored.as_deref());
        info!(
            fetched_version,
            stored_version = stored.as_deref().unwrap_or("<none>"),
            ?decision,
            "snapshot version gate"
        );
        Ok(decision)
    }
}

/// The first row of the feed's metadata member, resolved into the
/// snapshot's identity: its validity window and the publication timestamp
/// embedded in the version text.
#[derive(Debug, Clone)]
pub struct FeedMetadata {
    pub feed_version: String,
    pub creation_timestamp: NaiveDateTime,
    pub validity: ValidityRange,
    /// Raw declared-column values of the metadata row, in schema order,
    /// re-appended to the version-history table on load.
    pub row: Vec<String>,
}

pub fn parse_feed_metadata(reader: impl Read) -> Result<FeedMetadata> {
    let mut csv_reader = csv::Reader::from_reader(reader);
    let headers = csv_reader.headers()?.clone();

    let indices: Vec<usize> = FEED_INFO_SCHEMA
        .columns
        .iter()
        .map(|(name, _)| {
            headers
                .iter()
                .position(|h| h == *name)
                .ok_or_else(|| Error::MissingColumn {
                    table: "feed_info".to_string(),
                    column: name.to_string(),
                })
        })
        .collect::<Result<_>>()?;

    let record = csv_reader
        .records()
        .next()
        .transpose()?
        .ok_or_else(|| Error::InvalidFeedMetadata("feed_info has no rows".to_string()))?;

    let row: Vec<String> = indices
        .iter()
        .map(|&i| record.get(i).unwrap_or_default().to_string())
        .collect();

    let column = |name: &str| -> &str {
        FEED_INFO_SCHEMA
            .columns
            .iter()
            .position(|(c, _)| *c == name)
            .map(|i| row[i].as_str())
            .unwrap_or_default()
    };

    let feed_version = column("feed_version").to_string();
    let creation_timestamp = extract_creation_timestamp(&feed_version)?;
    let start_date = parse_feed_date(column("feed_start_date"))?;
    let end_date = parse_feed_date(column("feed_end_date"))?;

    Ok(FeedMetadata {
        feed_version,
        creation_timestamp,
        validity: ValidityRange {
            start_date,
            end_date,
        },
        row,
    })
}

fn extract_creation_timestamp(feed_version: &str) -> Result<NaiveDateTime> {
    let matched = VERSION_TIMESTAMP
        .find(feed_version)
        .ok_or_else(|| {
            Error::InvalidFeedMetadata(format!("no timestamp in feed_version '{feed_version}'"))
        })?;
    NaiveDateTime::parse_from_str(matched.as_str(), "%Y-%m-%dT%H:%M:%S")
        .map_err(|e| Error::InvalidFeedMetadata(format!("bad feed_version timestamp: {e}")))
}

fn parse_feed_date(raw: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(raw, "%Y%m%d")
        .map_err(|_| Error::InvalidFeedMetadata(format!("bad feed date '{raw}'")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::tests::FakeWarehouse;
    use std::io::Cursor;

    const FEED_INFO_CSV: &str = "\
feed_publisher_name,feed_publisher_url,feed_lang,feed_start_date,feed_end_date,feed_version,feed_contact_email
Transit Authority,https://example.com,en,20240111,20240630,Winter 2024-01-10T03:00:00 version 77,feedback@example.com
";

    #[test]
    fn skip_only_on_exact_match() {
        assert_eq!(decide("v1", Some("v1")), GateDecision::Skip);
        assert_eq!(decide("v1", Some("v2")), GateDecision::Proceed);
        assert_eq!(decide("v1", Some("V1")), GateDecision::Proceed);
        assert_eq!(decide("v1", None), GateDecision::Proceed);
    }

    #[tokio::test]
    async fn gate_proceeds_with_empty_history() {
        let warehouse = Arc::new(FakeWarehouse::new());
        let gate = SnapshotVersionGate::new(warehouse, "gtfs");
        assert_eq!(gate.decide("v1").await.unwrap(), GateDecision::Proceed);
    }

    #[tokio::test]
    async fn gate_skips_when_version_already_stored() {
        let warehouse = Arc::new(FakeWarehouse::new());
        warehouse.set_stored_version(Some("Winter 2024-01-10T03:00:00 version 77"));
        let gate = SnapshotVersionGate::new(warehouse, "gtfs");
        assert_eq!(
            gate.decide("Winter 2024-01-10T03:00:00 version 77").await.unwrap(),
            GateDecision::Skip
        );
    }

    #[test]
    fn metadata_resolves_validity_and_timestamp() {
        let metadata = parse_feed_metadata(Cursor::new(FEED_INFO_CSV)).unwrap();
        assert_eq!(
            metadata.validity.start_date,
            NaiveDate::from_ymd_opt(2024, 1, 11).unwrap()
        );
        assert_eq!(
            metadata.validity.end_date,
            NaiveDate::from_ymd_opt(2024, 6, 30).unwrap()
        );
        assert_eq!(
            metadata.creation_timestamp,
            NaiveDateTime::parse_from_str("2024-01-10T03:00:00", "%Y-%m-%dT%H:%M:%S").unwrap()
        );
        assert_eq!(metadata.row.len(), FEED_INFO_SCHEMA.columns.len());
    }

    #[test]
    fn metadata_requires_embedded_timestamp() {
        let csv = FEED_INFO_CSV.replace("2024-01-10T03:00:00", "january tenth");
        assert!(matches!(
            parse_feed_metadata(Cursor::new(csv)),
            Err(Error::InvalidFeedMetadata(_))
        ));
    }

    #[test]
    fn metadata_requires_a_row() {
        let csv = "feed_publisher_name,feed_publisher_url,feed_lang,feed_start_date,feed_end_date,feed_version,feed_contact_email\n";
        assert!(matches!(
            parse_feed_metadata(Cursor::new(csv)),
            Err(Error::InvalidFeedMetadata(_))
        ));
    }
}
