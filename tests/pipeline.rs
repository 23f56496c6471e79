//! End-to-end tests: SQLite store -> dataset -> dashboard view

use rusqlite::Connection;
use std::io::Write;
use std::path::PathBuf;
use tempfile::{NamedTempFile, TempDir};
use wwi_sales::db;
use wwi_sales::models::{Cell, CityDim, CustomerDim, SaleFact, Segment, SourceTables};
use wwi_sales::{compute, ComputeOptions, Dataset, FilterPolicy, FilterSelection, Selector, ShareBase, StoreError};

fn sale(key: i64, customer: i64, city: i64, date: &str, amount: Cell) -> SaleFact {
    SaleFact {
        sale_key: key,
        customer_key: Some(customer),
        city_key: Some(city),
        invoice_date: Cell::from(date),
        total_including_tax: amount,
        category: None,
    }
}

/// Ten clean sales of 10..100, one orphan city, one bad amount, one bad date
fn create_test_store(dir: &TempDir) -> PathBuf {
    let mut sales: Vec<SaleFact> = (1..=10)
        .map(|i| {
            let date = format!("2016-{:02}-{:02}", (i - 1) % 3 + 1, i);
            sale(i, i % 2 + 1, (i - 1) % 2 + 1, &date, Cell::Real(i as f64 * 10.0))
        })
        .collect();
    sales.push(sale(11, 1, 99, "2016-01-20", Cell::Real(45.0)));
    sales.push(sale(12, 2, 1, "2016-02-20", Cell::from("twelve")));
    sales.push(sale(13, 2, 2, "sometime", Cell::Real(1000.0)));

    let tables = SourceTables {
        sales,
        customers: vec![
            CustomerDim { customer_key: 1, customer: Some("Tailspin".into()), category: Some("Gift Store".into()), buying_group: None },
            CustomerDim { customer_key: 2, customer: Some("Wingtip".into()), category: Some("Novelty Shop".into()), buying_group: None },
        ],
        cities: vec![
            CityDim { city_key: 1, city: Some("Sylvanite".into()), state_province: Some("Montana".into()) },
            CityDim { city_key: 2, city: Some("Gasport".into()), state_province: Some("New York".into()) },
        ],
    };

    let path = dir.path().join("WWI_simple.db");
    let mut conn = Connection::open(&path).unwrap();
    db::init_schema(&conn).unwrap();
    db::write_tables(&mut conn, &tables).unwrap();
    path
}

#[test]
fn test_end_to_end_pipeline() {
    let dir = TempDir::new().unwrap();
    let dataset = Dataset::load(&create_test_store(&dir)).unwrap();

    assert_eq!(dataset.rows().len(), 13);
    assert_eq!(dataset.global_transactions(), 13);

    // Orphan city key keeps the row with a null city
    let orphan = dataset.rows().iter().find(|r| r.sale_key == 11).unwrap();
    assert_eq!(orphan.city, None);
    assert_eq!(orphan.city_key, Some(99));
    assert_eq!(orphan.amount, Some(45.0));
    assert_eq!(orphan.category.as_deref(), Some("Gift Store"));

    // Unparseable values become missing
    let bad_amount = dataset.rows().iter().find(|r| r.sale_key == 12).unwrap();
    assert_eq!(bad_amount.amount, None);
    let bad_date = dataset.rows().iter().find(|r| r.sale_key == 13).unwrap();
    assert_eq!(bad_date.invoice_date, None);

    let options = dataset.options(FilterPolicy::Overview);
    let view = compute(&dataset, &options.default_selection(), &ComputeOptions::default()).unwrap();

    // Default range excludes the undated sale 13; sale 12 has no amount
    assert_eq!(view.summary.transactions, 12);
    assert_eq!(view.unsegmented_rows, 1);
    assert_eq!(view.summary.total_value, 595.0);
    let segmented: usize = view.segment_table.iter().map(|r| r.transactions).sum();
    assert_eq!(segmented, 11);
}

#[test]
fn test_city_filter_and_global_share() {
    let dir = TempDir::new().unwrap();
    let dataset = Dataset::load(&create_test_store(&dir)).unwrap();

    let selection = FilterSelection { city: Selector::from("Sylvanite"), ..Default::default() };
    let view = compute(&dataset, &selection, &ComputeOptions::default()).unwrap();

    // Sylvanite: sales 1, 3, 5, 7, 9 and 12 (no amount)
    assert_eq!(view.summary.transactions, 6);
    assert_eq!(view.summary.total_value, 250.0);
    assert_eq!(view.summary.average_ticket, Some(50.0));

    let share: f64 = view.segment_table.iter().map(|r| r.share_pct).sum();
    assert!((share - 5.0 / 13.0 * 100.0).abs() < 1e-9);

    let filtered = ComputeOptions { share_base: ShareBase::Filtered, ..Default::default() };
    let view = compute(&dataset, &selection, &filtered).unwrap();
    let share: f64 = view.segment_table.iter().map(|r| r.share_pct).sum();
    assert!((share - 5.0 / 6.0 * 100.0).abs() < 1e-9);
}

#[test]
fn test_drilldown_page() {
    let dir = TempDir::new().unwrap();
    let dataset = Dataset::load(&create_test_store(&dir)).unwrap();
    let options = ComputeOptions { policy: FilterPolicy::Drilldown, ..Default::default() };

    let selection = FilterSelection {
        category: Selector::from("Novelty Shop"),
        city: Selector::from("Sylvanite"),
        ..Default::default()
    };
    let view = compute(&dataset, &selection, &options).unwrap();
    // customer 2 = odd sale keys; Sylvanite = odd sale keys; plus sale 12
    assert_eq!(view.summary.transactions, 6);

    let t = view.thresholds.unwrap();
    for row in &view.segment_table {
        match row.segment {
            Segment::Low => assert!(row.average_ticket.map_or(true, |a| a <= t.p20)),
            Segment::High => assert!(row.average_ticket.map_or(true, |a| a > t.p80)),
            Segment::Medium => {}
        }
    }

    let all_city = FilterSelection { city: Selector::All, ..selection };
    assert!(compute(&dataset, &all_city, &options).is_err());
}

#[test]
fn test_missing_store() {
    let dir = TempDir::new().unwrap();
    let err = Dataset::load(&dir.path().join("nope.db")).unwrap_err();
    assert!(matches!(err, StoreError::NotFound(_)));
}

#[test]
fn test_corrupt_store_is_connection_error() {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(&[0x42; 4096]).unwrap();
    file.flush().unwrap();

    let err = Dataset::load(file.path()).unwrap_err();
    assert!(matches!(err, StoreError::Connection { .. }), "got {:?}", err);
}
