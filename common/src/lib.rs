use thiserror::Error;

pub mod config;

pub type Result<T> = std::result::Result<T, Error>;

/// Structured failure payload from the external bulk-copy collaborator.
///
/// The copy executable either succeeds or fails as a whole; on failure we
/// keep the exit code and whatever diagnostics it printed so callers can
/// tell configuration problems apart from data problems.
#[derive(Debug, Clone)]
pub struct CopyFailure {
    pub exit_code: Option<i32>,
    pub stderr: String,
}

impl std::fmt::Display for CopyFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.exit_code {
            Some(code) => write!(f, "exit code {}: {}", code, self.stderr.trim()),
            None => write!(f, "terminated by signal: {}", self.stderr.trim()),
        }
    }
}

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Database error: {0}")]
    Postgres(#[from] tokio_postgres::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] ::config::ConfigError),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Unknown table: {0}")]
    UnknownTable(String),

    #[error("Unparseable partition key: {0}")]
    UnparseableKey(String),

    #[error("Missing column '{column}' in source for table {table}")]
    MissingColumn { table: String, column: String },

    #[error("Failed to coerce value '{value}' for {table}.{column}: {reason}")]
    Coercion {
        table: String,
        column: String,
        value: String,
        reason: String,
    },

    #[error("Bulk copy failed: {0}")]
    Copy(CopyFailure),

    #[error("Invalid feed metadata: {0}")]
    InvalidFeedMetadata(String),

    #[error("Partition {0} exists but is not constrained")]
    PartialPartition(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("{0}")]
    Other(String),
}
