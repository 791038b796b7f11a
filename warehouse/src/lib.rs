pub mod db;
pub mod derived;
pub mod jobs;
pub mod loader;
pub mod partition;
pub mod schema;
pub mod snapshot;
pub mod source;

use std::sync::Arc;

use common::Result;
use common::config::Settings;

use db::PostgresWarehouse;
use db::copy::PsqlCopy;
use jobs::fare::FareJob;
use jobs::rail::RailJob;
use jobs::schedule::ScheduleJob;
use source::{DirFeedSource, DirInbox};

/// Runs the schedule snapshot pipeline.
pub async fn run_schedule_pipeline(config_path: &str) -> Result<()> {
    let config = Settings::new(config_path)?;

    let warehouse = Arc::new(PostgresWarehouse::connect(&config.warehouse).await?);
    let copy = Arc::new(PsqlCopy::new(&config.warehouse));
    let feed = DirFeedSource::new(&config.schedule.inbox_dir);

    ScheduleJob::new(warehouse, copy, &config.schedule.db_schema)
        .run(&feed)
        .await
}

/// Runs the fare-export pipeline over pending inbox deliveries.
pub async fn run_fare_pipeline(config_path: &str) -> Result<()> {
    let config = Settings::new(config_path)?;

    let warehouse = Arc::new(PostgresWarehouse::connect(&config.warehouse).await?);
    let copy = Arc::new(PsqlCopy::new(&config.warehouse));
    let inbox = DirInbox::new(&config.fare.inbox_dir);

    FareJob::new(warehouse, copy, &config.fare.db_schema)
        .run(&inbox)
        .await
}

/// Runs the rail-operations pipeline over pending inbox deliveries.
pub async fn run_rail_pipeline(config_path: &str) -> Result<()> {
    let config = Settings::new(config_path)?;

    let warehouse = Arc::new(PostgresWarehouse::connect(&config.warehouse).await?);
    let copy = Arc::new(PsqlCopy::new(&config.warehouse));
    let inbox = DirInbox::new(&config.rail.inbox_dir);

    RailJob::new(warehouse, copy, &config.rail.db_schema)
        .run(&inbox)
        .await
}
