//! Synthetic data generator for the sales data store
//!
//! Writes a SQLite file with `DimCustomer`, `DimCity` and `FactSale` shaped
//! like the Wide World Importers extract the dashboard reads. A controlled
//! fraction of rows gets unparseable amounts or dates and city keys with no
//! dimension row, so the missing-value paths are exercised.
//!
//! Usage:
//!   cargo run --release --bin generate_synthetic -- [OPTIONS]
//!
//! Options:
//!   --sales <N>          Number of FactSale rows (default: 5000)
//!   --customers <N>      Number of customers (default: 60)
//!   --cities <N>         Number of cities (default: 25)
//!   --start <DATE>       First invoice date (default: 2013-01-01)
//!   --days <N>           Span of invoice dates in days (default: 1095)
//!   --dirty-rate <F>     Fraction of unparseable amounts/dates (default: 0.01)
//!   --orphan-rate <F>    Fraction of sales with an unknown city key (default: 0.005)
//!   --seed <N>           Random seed for reproducibility (optional)
//!   --output <PATH>      Output database (default: data/WWI_simple.db)

use anyhow::{bail, Context, Result};
use chrono::{Duration, NaiveDate};
use clap::Parser;
use rand::prelude::*;
use rand::rngs::StdRng;
use rusqlite::Connection;
use std::path::PathBuf;
use tracing::info;
use wwi_sales::config::{init_tracing, DEFAULT_DB_PATH};
use wwi_sales::db;
use wwi_sales::models::{Cell, CityDim, CustomerDim, SaleFact, SourceTables};

/// Synthetic sales store generator
#[derive(Parser, Debug)]
#[command(name = "generate_synthetic")]
#[command(about = "Generate a synthetic sales data store")]
struct Args {
    #[arg(long, default_value = "5000")]
    sales: usize,

    #[arg(long, default_value = "60")]
    customers: usize,

    #[arg(long, default_value = "25")]
    cities: usize,

    /// First invoice date
    #[arg(long, default_value = "2013-01-01")]
    start: NaiveDate,

    /// Span of invoice dates in days
    #[arg(long, default_value = "1095")]
    days: i64,

    /// Fraction of sales with an unparseable amount or date (0.0 - 1.0)
    #[arg(long, default_value = "0.01")]
    dirty_rate: f64,

    /// Fraction of sales referencing a city key missing from DimCity (0.0 - 1.0)
    #[arg(long, default_value = "0.005")]
    orphan_rate: f64,

    /// Random seed for reproducibility
    #[arg(long)]
    seed: Option<u64>,

    #[arg(long, default_value = DEFAULT_DB_PATH)]
    output: PathBuf,

    /// Replace the output file if it exists
    #[arg(long)]
    overwrite: bool,
}

const CATEGORIES: &[&str] = &[
    "Novelty Shop",
    "Supermarket",
    "Computer Store",
    "Gift Store",
    "Corporate",
    "Kiosk",
];

const BUYING_GROUPS: &[&str] = &["Tailspin Toys", "Wingtip Toys", "N/A"];

const CITIES: &[(&str, &str)] = &[
    ("Sylvanite", "Montana"),
    ("Peeples Valley", "Arizona"),
    ("Medicine Lodge", "Kansas"),
    ("Gasport", "New York"),
    ("Jessie", "North Dakota"),
    ("Frankewing", "Tennessee"),
    ("Bow Mar", "Colorado"),
    ("Cherry Grove Beach", "South Carolina"),
    ("Eulaton", "Alabama"),
    ("Greenville", "Mississippi"),
    ("Tooele", "Utah"),
    ("Lisco", "Nebraska"),
    ("Wapinitia", "Oregon"),
    ("Rockwall", "Texas"),
    ("East Fultonham", "Ohio"),
    ("Tomnolen", "Mississippi"),
    ("Walker Valley", "New York"),
    ("Moorcroft", "Wyoming"),
    ("Helmetta", "New Jersey"),
    ("Long Grove", "Illinois"),
];

fn city_row(key: i64) -> CityDim {
    let (name, state) = CITIES[(key as usize - 1) % CITIES.len()];
    let round = (key as usize - 1) / CITIES.len();
    CityDim {
        city_key: key,
        city: Some(if round == 0 { name.to_string() } else { format!("{} {}", name, round + 1) }),
        state_province: Some(state.to_string()),
    }
}

fn customer_row(key: i64, rng: &mut impl Rng) -> CustomerDim {
    let group = *BUYING_GROUPS.choose(rng).unwrap_or(&"N/A");
    CustomerDim {
        customer_key: key,
        customer: Some(format!("{} (Store {})", group, key)),
        category: CATEGORIES.choose(rng).map(|c| c.to_string()),
        buying_group: Some(group.to_string()),
    }
}

/// Skewed amount: most sales small, a long tail of large orders
fn random_amount(rng: &mut impl Rng) -> f64 {
    let amount = rng.gen_range(2.0_f64..9.5).exp();
    (amount * 100.0).round() / 100.0
}

fn sale_row(key: i64, args: &Args, rng: &mut impl Rng) -> SaleFact {
    let date = args.start + Duration::days(rng.gen_range(0..args.days.max(1)));

    let invoice_date = if rng.gen_bool(args.dirty_rate) {
        Cell::from("unknown")
    } else {
        Cell::from(date.format("%Y-%m-%d").to_string().as_str())
    };
    let total_including_tax = if rng.gen_bool(args.dirty_rate) {
        Cell::from("N/A")
    } else {
        Cell::Real(random_amount(rng))
    };
    let city_key = if rng.gen_bool(args.orphan_rate) {
        args.cities as i64 + 1000
    } else {
        rng.gen_range(1..=args.cities as i64)
    };

    SaleFact {
        sale_key: key,
        customer_key: Some(rng.gen_range(1..=args.customers as i64)),
        city_key: Some(city_key),
        invoice_date,
        total_including_tax,
        category: None,
    }
}

fn main() -> Result<()> {
    init_tracing();
    let args = Args::parse();

    if args.customers == 0 || args.cities == 0 {
        bail!("--customers and --cities must be at least 1");
    }
    for (name, rate) in [("dirty-rate", args.dirty_rate), ("orphan-rate", args.orphan_rate)] {
        if !(0.0..=1.0).contains(&rate) {
            bail!("--{} must be between 0 and 1, got {}", name, rate);
        }
    }

    println!("Synthetic Sales Store Generator");
    println!("{}", "━".repeat(60));
    println!("Output:       {}", args.output.display());
    println!("Sales:        {}", args.sales);
    println!("Customers:    {}", args.customers);
    println!("Cities:       {}", args.cities);
    println!("Date range:   {} + {} days", args.start, args.days);
    println!("Dirty rate:   {:.1}%", args.dirty_rate * 100.0);
    println!("Orphan rate:  {:.1}%", args.orphan_rate * 100.0);
    if let Some(seed) = args.seed {
        println!("Random seed:  {}", seed);
    }
    println!();

    // Initialize RNG
    let mut rng: StdRng = match args.seed {
        Some(s) => StdRng::seed_from_u64(s),
        None => StdRng::from_entropy(),
    };

    let tables = SourceTables {
        customers: (1..=args.customers as i64).map(|k| customer_row(k, &mut rng)).collect(),
        cities: (1..=args.cities as i64).map(city_row).collect(),
        sales: (1..=args.sales as i64).map(|k| sale_row(k, &args, &mut rng)).collect(),
    };

    if args.output.exists() {
        if !args.overwrite {
            bail!("{} already exists (use --overwrite)", args.output.display());
        }
        std::fs::remove_file(&args.output)
            .with_context(|| format!("removing {}", args.output.display()))?;
    }
    if let Some(parent) = args.output.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    let mut conn = Connection::open(&args.output)
        .with_context(|| format!("creating {}", args.output.display()))?;
    db::init_schema(&conn)?;
    db::write_tables(&mut conn, &tables)?;
    info!(
        "Wrote {} sales, {} customers, {} cities to {}",
        tables.sales.len(),
        tables.customers.len(),
        tables.cities.len(),
        args.output.display()
    );

    println!("✓ Done");
    Ok(())
}
