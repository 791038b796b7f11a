pub mod delta;

use std::io::Read;
use std::sync::Arc;

use chrono::NaiveDate;
use common::{Error, Result};
use tempfile::NamedTempFile;
use tracing::info;

use crate::db::copy::BulkCopy;
use crate::schema::{ColumnType, TableSchema};

/// Date strings in source files use the compact feed form.
const SOURCE_DATE_FORMAT: &str = "%Y%m%d";

/// Typed, schema-driven load of one table into one destination.
///
/// Extraction is constrained to exactly the declared columns in declared
/// order: unknown source columns are dropped, a missing declared column
/// fails the table. Declared date columns are coerced from the compact
/// form and re-emitted ISO; any value that fails coercion or type
/// validation fails the whole table — rows are never partially skipped.
/// The staged file then goes to the bulk-copy collaborator, whose failure
/// propagates unchanged (no retry).
pub struct TableLoader {
    copy: Arc<dyn BulkCopy>,
}

impl TableLoader {
    pub fn new(copy: Arc<dyn BulkCopy>) -> Self {
        Self { copy }
    }

    /// Load `source` into `destination`, appending `constants` as
    /// trailing columns on every row. Returns the number of rows staged.
    pub async fn load(
        &self,
        schema: &TableSchema,
        source: Box<dyn Read + Send>,
        destination: &str,
        constants: &[(&str, String)],
    ) -> Result<u64> {
        let staged = stage_rows(schema, source, constants)?;

        let mut columns = schema.column_names();
        columns.extend(constants.iter().map(|(name, _)| name.to_string()));

        self.copy.copy(staged.file.path(), destination, &columns).await?;

        info!(destination, rows = staged.rows, "table staged and copied");
        Ok(staged.rows)
    }
}

struct StagedFile {
    file: NamedTempFile,
    rows: u64,
}

fn stage_rows(
    schema: &TableSchema,
    source: Box<dyn Read + Send>,
    constants: &[(&str, String)],
) -> Result<StagedFile> {
    let mut reader = csv::Reader::from_reader(source);
    let headers = reader.headers()?.clone();

    // Project the source down to the declared columns, in declared order.
    let indices: Vec<usize> = schema
        .columns
        .iter()
        .map(|(name, _)| {
            headers
                .iter()
                .position(|h| h == *name)
                .ok_or_else(|| Error::MissingColumn {
                    table: schema.table_name.to_string(),
                    column: name.to_string(),
                })
        })
        .collect::<Result<_>>()?;

    let file = NamedTempFile::new()?;
    let mut writer = csv::Writer::from_writer(file.reopen()?);

    let mut header_row: Vec<&str> = schema.columns.iter().map(|(name, _)| *name).collect();
    header_row.extend(constants.iter().map(|(name, _)| *name));
    writer.write_record(&header_row)?;

    let mut rows = 0u64;
    for record in reader.records() {
        let record = record?;
        let mut out: Vec<String> = Vec::with_capacity(header_row.len());

        for (&index, (name, column_type)) in indices.iter().zip(&schema.columns) {
            let raw = record.get(index).unwrap_or_default();
            out.push(coerce_value(schema, name, *column_type, raw)?);
        }
        out.extend(constants.iter().map(|(_, value)| value.clone()));

        writer.write_record(&out)?;
        rows += 1;
    }
    writer.flush()?;

    Ok(StagedFile { file, rows })
}

/// Validate a raw field against its semantic type, coercing declared date
/// columns. Empty fields stay empty and load as NULL.
fn coerce_value(
    schema: &TableSchema,
    column: &str,
    column_type: ColumnType,
    raw: &str,
) -> Result<String> {
    if raw.is_empty() {
        return Ok(String::new());
    }

    if schema.is_date_column(column) {
        let date = NaiveDate::parse_from_str(raw, SOURCE_DATE_FORMAT)
            .map_err(|e| coercion_error(schema, column, raw, &e.to_string()))?;
        return Ok(date.format("%Y-%m-%d").to_string());
    }

    let valid = match column_type {
        ColumnType::Text => true,
        ColumnType::Int16 => raw.parse::<i16>().is_ok(),
        ColumnType::Int32 => raw.parse::<i32>().is_ok(),
        ColumnType::Int64 => raw.parse::<i64>().is_ok(),
        ColumnType::Float64 => raw.parse::<f64>().is_ok(),
    };
    if !valid {
        return Err(coercion_error(schema, column, raw, "type mismatch"));
    }

    Ok(raw.to_string())
}

fn coercion_error(schema: &TableSchema, column: &str, value: &str, reason: &str) -> Error {
    Error::Coercion {
        table: schema.table_name.to_string(),
        column: column.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}
