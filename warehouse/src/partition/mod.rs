pub mod lifecycle;
pub mod resolve;

use chrono::{Datelike, NaiveDate};

/// One calendar month, the key for rolling range partitions of
/// high-volume fact tables. Exactly one partition exists per
/// `(parent_table, year, month)`; it is created lazily and never
/// recreated.
///
/// Represented by its first day, so every constructible value names a
/// real month.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CalendarMonth {
    first_day: NaiveDate,
}

impl CalendarMonth {
    pub fn containing(date: NaiveDate) -> Self {
        // day 1 is valid in every month
        Self {
            first_day: date.with_day(1).unwrap_or(date),
        }
    }

    pub fn year(&self) -> i32 {
        self.first_day.year()
    }

    pub fn month(&self) -> u32 {
        self.first_day.month()
    }

    pub fn first_day(&self) -> NaiveDate {
        self.first_day
    }

    /// The following month; December rolls into January of year + 1.
    /// Saturates at the last month chrono can represent.
    pub fn next(&self) -> Self {
        let next = if self.month() == 12 {
            NaiveDate::from_ymd_opt(self.year() + 1, 1, 1)
        } else {
            NaiveDate::from_ymd_opt(self.year(), self.month() + 1, 1)
        };
        Self {
            first_day: next.unwrap_or(self.first_day),
        }
    }

    /// Deterministic partition table name, e.g. `faregate_y2024m03`.
    pub fn partition_name(&self, parent_table: &str) -> String {
        format!("{}_y{:04}m{:02}", parent_table, self.year(), self.month())
    }
}

/// `[start_date, end_date]` validity window of one snapshot publication.
/// The pair uniquely names a partition; every row in it carries the two
/// dates as constant columns pinned by CHECK constraints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidityRange {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

impl ValidityRange {
    /// Deterministic partition table name using the compact date forms,
    /// e.g. `stops_20240111_20240630`.
    pub fn partition_name(&self, parent_table: &str) -> String {
        format!(
            "{}_{}_{}",
            parent_table,
            self.start_date.format("%Y%m%d"),
            self.end_date.format("%Y%m%d"),
        )
    }
}

/// Partition identity handed to the lifecycle manager. The variant picks
/// the strategy: calendar months become declarative range partitions,
/// validity ranges become inheritance-based snapshot children.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PartitionKey {
    Month(CalendarMonth),
    Validity(ValidityRange),
}

impl PartitionKey {
    pub fn partition_name(&self, parent_table: &str) -> String {
        match self {
            PartitionKey::Month(month) => month.partition_name(parent_table),
            PartitionKey::Validity(range) => range.partition_name(parent_table),
        }
    }
}
