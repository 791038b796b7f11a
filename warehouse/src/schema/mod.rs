pub mod fare;
pub mod rail;
pub mod schedule;

use std::collections::HashMap;

use common::{Error, Result};

/// Semantic column types understood by the loader.
///
/// These describe how a raw field from a source file is validated before
/// it is staged for the bulk-copy collaborator; they deliberately mirror
/// the column types of the warehouse parent tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Text,
    Int16,
    Int32,
    Int64,
    Float64,
}

/// Declarative description of one loadable table.
///
/// Immutable after catalog construction and shared by every load of the
/// table: the ordered column list drives projection, `date_columns` names
/// the string columns coerced to dates, and `primary_key` feeds the
/// post-load constraint step.
#[derive(Debug, Clone)]
pub struct TableSchema {
    pub table_name: &'static str,
    pub columns: Vec<(&'static str, ColumnType)>,
    pub date_columns: Vec<&'static str>,
    pub primary_key: Vec<&'static str>,
}

impl TableSchema {
    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|(name, _)| name.to_string()).collect()
    }

    pub fn is_date_column(&self, column: &str) -> bool {
        self.date_columns.contains(&column)
    }
}

/// Static catalog of the tables one dataset loads.
///
/// Each dataset variant carries its own catalog; entries are never shared
/// across datasets even when column names coincide.
pub struct SchemaCatalog {
    tables: HashMap<&'static str, TableSchema>,
}

impl SchemaCatalog {
    pub fn new(tables: Vec<TableSchema>) -> Self {
        let tables = tables
            .into_iter()
            .map(|table| (table.table_name, table))
            .collect();
        Self { tables }
    }

    pub fn schema_for(&self, table_name: &str) -> Result<&TableSchema> {
        self.tables
            .get(table_name)
            .ok_or_else(|| Error::UnknownTable(table_name.to_string()))
    }

    pub fn contains(&self, table_name: &str) -> bool {
        self.tables.contains_key(table_name)
    }

    /// Table names in deterministic (sorted) order, used when a whole
    /// snapshot is loaded table by table.
    pub fn table_names(&self) -> Vec<&'static str> {
        let mut names: Vec<&'static str> = self.tables.keys().copied().collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> SchemaCatalog {
        SchemaCatalog::new(vec![TableSchema {
            table_name: "stops",
            columns: vec![("stop_id", ColumnType::Text), ("stop_lat", ColumnType::Float64)],
            date_columns: vec![],
            primary_key: vec!["stop_id"],
        }])
    }

    #[test]
    fn schema_for_known_table() {
        let catalog = catalog();
        let schema = catalog.schema_for("stops").unwrap();
        assert_eq!(schema.table_name, "stops");
        assert_eq!(schema.column_names(), vec!["stop_id", "stop_lat"]);
    }

    #[test]
    fn schema_for_unknown_table_errors() {
        let catalog = catalog();
        match catalog.schema_for("nope") {
            Err(common::Error::UnknownTable(name)) => assert_eq!(name, "nope"),
            other => panic!("expected UnknownTable, got {:?}", other.map(|_| ())),
        }
    }
}
