//! REST API Server for the sales dashboard
//!
//! Usage:
//!   ./target/release/api_server [--port PORT] [--db-path PATH]
//!
//! REST endpoints:
//!   GET  /api/v1/health      - Health check
//!   GET  /api/v1/options     - Selector values (?policy=overview|drilldown)
//!   GET  /api/v1/dashboard   - KPIs, charts and segment table
//!   GET  /api/v1/segments    - Segment table only
//!   POST /api/v1/reload      - Reload the data store
//!
//! Filter parameters: policy, category, city, start, end (YYYY-MM-DD), share_base

use anyhow::{Context, Result};
use clap::Parser;
use std::net::SocketAddr;
use std::sync::Arc;
use wwi_sales::api::{self, DashboardService};
use wwi_sales::config::{init_tracing, StoreArgs};

#[derive(Parser, Debug)]
#[command(name = "api_server")]
#[command(about = "Serve the sales dashboard as JSON")]
struct Args {
    /// Port to listen on
    #[arg(long, env = "PORT", default_value = "8080")]
    port: u16,

    #[command(flatten)]
    store: StoreArgs,

    /// Load the data store before accepting requests
    #[arg(long)]
    preload: bool,
}

fn print_banner(port: u16, db_path: &std::path::Path) {
    println!("============================================================");
    println!("              SALES DASHBOARD API SERVER");
    println!("============================================================");
    println!();
    println!("  Port:     {}", port);
    println!("  Store:    {}", db_path.display());
    println!("  REST:     http://localhost:{}/api/v1/", port);
    println!();
    println!("REST Endpoints:");
    println!("  GET  /api/v1/health           Health check");
    println!("  GET  /api/v1/options          Selector values");
    println!("  GET  /api/v1/dashboard        KPIs, charts, table");
    println!("  GET  /api/v1/segments         Segment table");
    println!("  POST /api/v1/reload           Reload data store");
    println!();
    println!("============================================================");
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let args = Args::parse();
    print_banner(args.port, &args.store.db_path);

    let service = Arc::new(DashboardService::new(args.store.db_path.clone()));
    if args.preload {
        let dataset = service
            .dataset()
            .await
            .with_context(|| format!("loading {}", args.store.db_path.display()))?;
        tracing::info!("Preloaded {} rows", dataset.rows().len());
    }

    let addr: SocketAddr = format!("0.0.0.0:{}", args.port).parse()?;
    let app = api::router(service);
    tracing::info!("Starting REST server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
