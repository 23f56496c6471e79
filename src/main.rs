use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use wwi_sales::config::{init_tracing, StoreArgs};
use wwi_sales::filter::FilterPolicy;
use wwi_sales::Dataset;

/// Print statistics about the sales data store
#[derive(Parser, Debug)]
#[command(name = "wwi_sales", version)]
struct Cli {
    #[command(flatten)]
    store: StoreArgs,
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let dataset = Dataset::load(&cli.store.db_path)
        .with_context(|| format!("loading data store {}", cli.store.db_path.display()))?;
    info!("Dataset ready");

    let rows = dataset.rows();
    let missing_amount = rows.iter().filter(|r| r.amount.is_none()).count();
    let missing_date = rows.iter().filter(|r| r.invoice_date.is_none()).count();
    let missing_city = rows.iter().filter(|r| r.city.is_none()).count();
    let options = dataset.options(FilterPolicy::Drilldown);

    println!("\n{}", "=".repeat(60));
    println!("              SALES DATA STORE STATISTICS");
    println!("{}\n", "=".repeat(60));

    println!("ENTITY COUNTS");
    println!("{}", "-".repeat(40));
    println!("  Sales (distinct):   {:>10}", dataset.global_transactions());
    println!("  Enriched rows:      {:>10}", rows.len());
    println!("  Categories:         {:>10}", options.categories.len());
    println!("  Cities:             {:>10}", options.cities.len());

    println!("\nDATE RANGE");
    println!("{}", "-".repeat(40));
    println!("  From: {}", options.min_date.map(|d| d.to_string()).unwrap_or_else(|| "N/A".into()));
    println!("  To:   {}", options.max_date.map(|d| d.to_string()).unwrap_or_else(|| "N/A".into()));

    println!("\nDATA QUALITY");
    println!("{}", "-".repeat(40));
    println!("  Unparseable/missing amounts: {:>6}", missing_amount);
    println!("  Unparseable/missing dates:   {:>6}", missing_date);
    println!("  Rows without city match:     {:>6}", missing_city);

    println!("\n{}", "=".repeat(60));
    println!();

    Ok(())
}
