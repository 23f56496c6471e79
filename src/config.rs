//! Shared command-line / environment configuration

use clap::Args;
use std::path::PathBuf;

pub const DEFAULT_DB_PATH: &str = "data/WWI_simple.db";
pub const DB_PATH_ENV: &str = "SALES_DB_PATH";

/// Location of the SQLite data store
#[derive(Args, Debug, Clone)]
pub struct StoreArgs {
    /// Path to the SQLite data store holding FactSale, DimCustomer and DimCity
    #[arg(long = "db-path", env = DB_PATH_ENV, default_value = DEFAULT_DB_PATH)]
    pub db_path: PathBuf,
}

impl Default for StoreArgs {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from(DEFAULT_DB_PATH),
        }
    }
}

/// Install the fmt subscriber, honouring `RUST_LOG` (default `info`)
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();
}
