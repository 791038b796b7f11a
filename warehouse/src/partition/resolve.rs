//! Partition key resolution from source file names.
//!
//! Calendar-partitioned exports name their files with an 8-digit service
//! date prefix (`20240305_faregate_....csv.gz`); bulk re-exports embed a
//! `[start, end]` pair instead and cover every month the range touches.

use chrono::NaiveDate;
use common::{Error, Result};
use once_cell::sync::Lazy;
use regex::Regex;

use super::CalendarMonth;

static EIGHT_DIGITS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d{8}").expect("valid regex"));

/// Whether this file is a bulk export covering a date range.
pub fn is_bulk_file(file_name: &str) -> bool {
    file_name.contains("bulk_import")
}

/// Parse the 8-digit `%Y%m%d` service-date prefix of a file name.
pub fn service_date(file_name: &str) -> Result<NaiveDate> {
    let prefix = file_name.get(..8).ok_or_else(|| key_error(file_name))?;
    NaiveDate::parse_from_str(prefix, "%Y%m%d").map_err(|_| key_error(file_name))
}

/// Parse the `[start, end]` pair embedded in a bulk file name: the first
/// two 8-digit groups anywhere in the name.
pub fn bulk_date_range(file_name: &str) -> Result<(NaiveDate, NaiveDate)> {
    let mut dates = EIGHT_DIGITS
        .find_iter(file_name)
        .filter_map(|m| NaiveDate::parse_from_str(m.as_str(), "%Y%m%d").ok());

    match (dates.next(), dates.next()) {
        (Some(start), Some(end)) => Ok((start, end)),
        _ => Err(key_error(file_name)),
    }
}

/// Expand a date range into the contiguous, duplicate-free sequence of
/// calendar months from `month(start)` through `month(end)` inclusive.
/// Every month touched by a bulk range gets a partition verified before
/// any rows are deleted or loaded.
pub fn months_covering(start: NaiveDate, end: NaiveDate) -> Vec<CalendarMonth> {
    let mut months = Vec::new();
    let last = CalendarMonth::containing(end);
    let mut current = CalendarMonth::containing(start);

    while current.first_day() <= last.first_day() {
        months.push(current);
        current = current.next();
    }

    months
}

/// Extract the destination table from a rail-operations data file name,
/// shaped `{YYYYMMDD}_{table}_{suffix}`; everything between the date
/// prefix and the final underscore group is the table name.
pub fn table_from_file_name(file_name: &str) -> Result<String> {
    let rest = file_name.get(9..).ok_or_else(|| key_error(file_name))?;
    match rest.rsplit_once('_') {
        Some((table, _)) if !table.is_empty() => Ok(table.to_string()),
        _ => Err(key_error(file_name)),
    }
}

fn key_error(file_name: &str) -> Error {
    Error::UnparseableKey(file_name.to_string())
}
