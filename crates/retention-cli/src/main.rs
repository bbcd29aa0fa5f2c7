//! Retention Driver Analysis - Main Entry Point

use clap::Parser;
use retention_cli::{init_environment, run, Args};
use std::process::ExitCode;
use tracing::{error, info};
use warehouse::{SnowflakeClient, WarehouseConfig};

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let args = Args::parse();
    init_environment();

    info!("=== Retention Driver Analysis v{} ===", env!("CARGO_PKG_VERSION"));

    let config = match WarehouseConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    let client = match SnowflakeClient::new(config) {
        Ok(client) => client,
        Err(e) => {
            error!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    match run(&client, &args).await {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}
