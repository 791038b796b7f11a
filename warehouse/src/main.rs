use anyhow::Context;
use clap::{Arg, Command};
use std::process;

fn config_arg() -> Arg {
    Arg::new("config")
        .short('c')
        .long("config")
        .value_name("FILE")
        .help("Sets a custom config file")
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let matches = Command::new("Warehouse Load Manager")
        .version("1.0")
        .about("Manages partitioned warehouse bulk loads")
        .subcommand(
            Command::new("schedule")
                .about("Load the latest schedule snapshot")
                .arg(config_arg()),
        )
        .subcommand(
            Command::new("fare")
                .about("Load pending fare export files")
                .arg(config_arg()),
        )
        .subcommand(
            Command::new("rail")
                .about("Load pending rail operations files")
                .arg(config_arg()),
        )
        .get_matches();

    match matches.subcommand() {
        Some(("schedule", sub)) => {
            let config_path = config_path(sub);
            println!("Starting schedule load with config: {}", config_path);
            warehouse::run_schedule_pipeline(config_path)
                .await
                .context("schedule load failed")?;
        }
        Some(("fare", sub)) => {
            let config_path = config_path(sub);
            println!("Starting fare load with config: {}", config_path);
            warehouse::run_fare_pipeline(config_path)
                .await
                .context("fare load failed")?;
        }
        Some(("rail", sub)) => {
            let config_path = config_path(sub);
            println!("Starting rail load with config: {}", config_path);
            warehouse::run_rail_pipeline(config_path)
                .await
                .context("rail load failed")?;
        }
        _ => {
            println!("No subcommand specified. Use --help for usage information.");
            process::exit(1);
        }
    }

    Ok(())
}

fn config_path(matches: &clap::ArgMatches) -> &str {
    matches
        .get_one::<String>("config")
        .map(|s| s.as_str())
        .unwrap_or("config/warehouse.toml")
}
