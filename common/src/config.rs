use config::{Config, ConfigError};
use serde::Deserialize;
use tracing::debug;

#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    pub warehouse: WarehouseConfig,
    #[serde(default = "default_schedule_config")]
    pub schedule: DatasetConfig,
    #[serde(default = "default_fare_config")]
    pub fare: DatasetConfig,
    #[serde(default = "default_rail_config")]
    pub rail: DatasetConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct WarehouseConfig {
    pub host: String,
    #[serde(default = "default_db_port")]
    pub port: u16,
    pub user: String,
    pub password: String,
    pub dbname: String,
}

impl WarehouseConfig {
    /// Connection string consumed by tokio-postgres and by the psql copy
    /// collaborator.
    pub fn connection_string(&self) -> String {
        format!(
            "host={} port={} user={} password={} dbname={}",
            self.host, self.port, self.user, self.password, self.dbname
        )
    }

    pub fn uri(&self) -> String {
        format!(
            "postgresql://{}:{}@{}:{}/{}",
            self.user, self.password, self.host, self.port, self.dbname
        )
    }
}

/// Per-dataset settings: the database schema its tables live in and the
/// local staging directory its collaborator delivers files to.
#[derive(Debug, Deserialize, Clone)]
pub struct DatasetConfig {
    pub db_schema: String,
    #[serde(default = "default_inbox_dir")]
    pub inbox_dir: String,
}

fn default_schedule_config() -> DatasetConfig {
    DatasetConfig {
        db_schema: "gtfs".to_string(),
        inbox_dir: default_inbox_dir(),
    }
}

fn default_fare_config() -> DatasetConfig {
    DatasetConfig {
        db_schema: "fare".to_string(),
        inbox_dir: default_inbox_dir(),
    }
}

fn default_rail_config() -> DatasetConfig {
    DatasetConfig {
        db_schema: "rail".to_string(),
        inbox_dir: default_inbox_dir(),
    }
}

fn default_inbox_dir() -> String {
    "/tmp/warehouse_inbox".to_string()
}

fn default_db_port() -> u16 {
    5432
}

impl Settings {
    pub fn new(path: &str) -> Result<Self, ConfigError> {
        let builder = Config::builder()
            .add_source(config::File::with_name(path))
            .add_source(config::Environment::with_prefix("APP").separator("__"));

        // Build the configuration
        let config = builder.build()?;

        // Try to deserialize the entire configuration
        let settings: Settings = config.try_deserialize()?;

        debug!(
            host = %settings.warehouse.host,
            dbname = %settings.warehouse.dbname,
            "Loaded warehouse configuration"
        );

        Ok(settings)
    }
}
