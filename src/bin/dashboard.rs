//! Terminal rendition of the sales dashboard
//!
//! Run: ./target/release/dashboard [--section all|kpi|charts|table] [filters]
//!
//! Examples:
//!   dashboard --city Todos --start 2014-01-01 --end 2014-12-31
//!   dashboard --policy drilldown --category "Novelty Shop" --city Sylvanite
//!   dashboard --csv segments.csv

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use serde::Serialize;
use std::path::{Path, PathBuf};
use wwi_sales::config::{init_tracing, StoreArgs};
use wwi_sales::dashboard::{compute, ComputeOptions, DashboardView, Dataset};
use wwi_sales::filter::FilterPolicy;
use wwi_sales::format::{currency, decimal, or_no_data};
use wwi_sales::kpi::{Bar, ShareBase};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Section {
    All,
    Kpi,
    Charts,
    Table,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum PolicyArg {
    Overview,
    Drilldown,
}

impl From<PolicyArg> for FilterPolicy {
    fn from(p: PolicyArg) -> Self {
        match p {
            PolicyArg::Overview => FilterPolicy::Overview,
            PolicyArg::Drilldown => FilterPolicy::Drilldown,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ShareBaseArg {
    Global,
    Filtered,
}

impl From<ShareBaseArg> for ShareBase {
    fn from(s: ShareBaseArg) -> Self {
        match s {
            ShareBaseArg::Global => ShareBase::Global,
            ShareBaseArg::Filtered => ShareBase::Filtered,
        }
    }
}

/// Sales segmentation dashboard
#[derive(Parser, Debug)]
#[command(name = "dashboard")]
#[command(about = "Filter sales, segment by spend percentile and print KPIs")]
struct Args {
    #[command(flatten)]
    store: StoreArgs,

    /// Page policy: overview (city or "Todos") or drilldown (category and city required)
    #[arg(long, value_enum, default_value = "overview")]
    policy: PolicyArg,

    /// Customer category; drilldown only. Defaults to the first category
    #[arg(long)]
    category: Option<String>,

    /// City name, or "Todos" for all cities. Defaults to the first option
    #[arg(long)]
    city: Option<String>,

    /// First invoice date (YYYY-MM-DD), inclusive. Defaults to the earliest date
    #[arg(long)]
    start: Option<String>,

    /// Last invoice date (YYYY-MM-DD), inclusive. Defaults to the latest date
    #[arg(long)]
    end: Option<String>,

    /// Denominator for the share of transactions
    #[arg(long, value_enum, default_value = "global")]
    share_base: ShareBaseArg,

    #[arg(long, value_enum, default_value = "all")]
    section: Section,

    /// Write the per-segment table to this CSV file
    #[arg(long)]
    csv: Option<PathBuf>,
}

#[derive(Serialize)]
struct CsvSegmentRow {
    segment: String,
    total_value: f64,
    average_ticket: Option<f64>,
    transactions: usize,
    share_pct: f64,
}

fn print_section_header(title: &str) {
    println!("\n{}", "═".repeat(72));
    println!("  {}", title);
    println!("{}\n", "═".repeat(72));
}

fn print_bars(title: &str, bars: &[Bar], fmt: fn(f64) -> String) {
    println!("\n{}", title);
    println!("{}", "─".repeat(64));
    let max = bars.iter().map(|b| b.value).fold(0.0_f64, f64::max);
    for bar in bars {
        let len = if max > 0.0 { (bar.value / max * 40.0).round() as usize } else { 0 };
        println!("  {:8} {:>16} {}", bar.label, fmt(bar.value), "#".repeat(len));
    }
}

fn print_kpis(view: &DashboardView) {
    print_section_header("KEY PERFORMANCE INDICATORS");
    println!("  Total Purchase Value:   {:>20}", view.display.total_value);
    println!("  Average Ticket:         {:>20}", view.display.average_ticket);
    println!("  Purchase Frequency:     {:>20}", view.display.purchase_frequency);
    println!("  Transactions in view:   {:>20}", view.summary.transactions);
    match view.thresholds {
        Some(t) => println!("  Thresholds:  p20 = {}   p80 = {}", decimal(t.p20), decimal(t.p80)),
        None => println!("  Thresholds:  no data"),
    }
    if view.unsegmented_rows > 0 {
        println!("  Rows without amount:    {:>20}", view.unsegmented_rows);
    }
}

fn print_charts(view: &DashboardView) {
    print_section_header("DISTRIBUTION BY SEGMENT");
    print_bars("Total Purchase Value by Segment", &view.value_by_segment, currency);
    print_bars("Share of Transactions by Segment (%)", &view.share_by_segment, decimal);
}

fn print_table(view: &DashboardView) {
    print_section_header("KPIs BY SEGMENT");
    println!(
        "  {:8} {:>18} {:>16} {:>14} {:>10}",
        "Segment", "Total Value", "Avg Ticket", "Transactions", "Share %"
    );
    println!("  {}", "─".repeat(70));
    for row in &view.segment_table {
        println!(
            "  {:8} {:>18} {:>16} {:>14} {:>9.2}%",
            row.segment.label(),
            currency(row.total_value),
            or_no_data(row.average_ticket, currency),
            row.transactions,
            row.share_pct
        );
    }
}

fn write_csv(path: &Path, view: &DashboardView) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("creating {}", path.display()))?;
    for row in &view.segment_table {
        writer.serialize(CsvSegmentRow {
            segment: row.segment.label().to_string(),
            total_value: row.total_value,
            average_ticket: row.average_ticket,
            transactions: row.transactions,
            share_pct: row.share_pct,
        })?;
    }
    writer.flush()?;
    Ok(())
}

fn main() -> Result<()> {
    init_tracing();
    let args = Args::parse();

    let dataset = Dataset::load(&args.store.db_path)
        .with_context(|| format!("loading data store {}", args.store.db_path.display()))?;

    let policy = FilterPolicy::from(args.policy);
    let selection = dataset.options(policy).resolve_selection(
        args.category.as_deref(),
        args.city.as_deref(),
        args.start.as_deref(),
        args.end.as_deref(),
    )?;

    let options = ComputeOptions {
        policy,
        share_base: args.share_base.into(),
    };
    let view = compute(&dataset, &selection, &options)?;

    println!("\n{}", "█".repeat(72));
    println!("  SALES DASHBOARD  ({:?})", policy);
    println!(
        "  Category: {}   City: {}   Dates: {} .. {}",
        view.selection.category,
        view.selection.city,
        view.selection.date_start.map(|d| d.to_string()).unwrap_or_else(|| "-".into()),
        view.selection.date_end.map(|d| d.to_string()).unwrap_or_else(|| "-".into()),
    );
    println!("{}", "█".repeat(72));

    match args.section {
        Section::All => {
            print_kpis(&view);
            print_charts(&view);
            print_table(&view);
        }
        Section::Kpi => print_kpis(&view),
        Section::Charts => print_charts(&view),
        Section::Table => print_table(&view),
    }

    if let Some(path) = &args.csv {
        write_csv(path, &view)?;
        println!("\nSegment table written to {}", path.display());
    }

    println!("\n{}", "█".repeat(72));
    Ok(())
}
