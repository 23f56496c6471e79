use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Raw column value as it comes out of the store, before type coercion
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
}

impl Cell {
    pub fn is_null(&self) -> bool {
        matches!(self, Cell::Null)
    }
}

impl From<rusqlite::types::Value> for Cell {
    fn from(v: rusqlite::types::Value) -> Self {
        use rusqlite::types::Value;
        match v {
            Value::Null => Cell::Null,
            Value::Integer(i) => Cell::Integer(i),
            Value::Real(f) => Cell::Real(f),
            Value::Text(s) => Cell::Text(s),
            // Blobs are only meaningful if they hold UTF-8 text
            Value::Blob(b) => String::from_utf8(b).map(Cell::Text).unwrap_or(Cell::Null),
        }
    }
}

impl From<&str> for Cell {
    fn from(s: &str) -> Self {
        Cell::Text(s.to_string())
    }
}

impl From<f64> for Cell {
    fn from(f: f64) -> Self {
        Cell::Real(f)
    }
}

impl From<i64> for Cell {
    fn from(i: i64) -> Self {
        Cell::Integer(i)
    }
}

/// One row of `FactSale`
#[derive(Debug, Clone, PartialEq)]
pub struct SaleFact {
    pub sale_key: i64,
    pub customer_key: Option<i64>,
    pub city_key: Option<i64>,
    pub invoice_date: Cell,
    pub total_including_tax: Cell,
    /// Only populated when the fact relation itself carries a `Category` column;
    /// the customer's category takes precedence
    pub category: Option<String>,
}

/// One row of `DimCustomer`
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct CustomerDim {
    pub customer_key: i64,
    pub customer: Option<String>,
    pub category: Option<String>,
    pub buying_group: Option<String>,
}

/// One row of `DimCity`
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct CityDim {
    pub city_key: i64,
    pub city: Option<String>,
    pub state_province: Option<String>,
}

/// The three relations exactly as loaded from the store
#[derive(Debug, Clone, Default)]
pub struct SourceTables {
    pub sales: Vec<SaleFact>,
    pub customers: Vec<CustomerDim>,
    pub cities: Vec<CityDim>,
}

/// Fact row after the left joins, columns still untyped
#[derive(Debug, Clone, PartialEq)]
pub struct JoinedSale {
    pub fact: SaleFact,
    pub customer: Option<CustomerDim>,
    pub city: Option<CityDim>,
}

/// Denormalized, type-normalized sale: the working relation of the pipeline
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnrichedSale {
    pub sale_key: i64,
    pub customer_key: Option<i64>,
    pub city_key: Option<i64>,
    pub invoice_date: Option<NaiveDateTime>,
    pub amount: Option<f64>,
    pub category: Option<String>,
    pub customer: Option<String>,
    pub buying_group: Option<String>,
    pub city: Option<String>,
    pub state_province: Option<String>,
}

/// Spend tier assigned from the percentile thresholds
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Segment {
    Low,
    Medium,
    High,
}

impl Segment {
    pub const ALL: [Segment; 3] = [Segment::Low, Segment::Medium, Segment::High];

    pub fn label(&self) -> &'static str {
        match self {
            Segment::Low => "Low",
            Segment::Medium => "Medium",
            Segment::High => "High",
        }
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::types::Value;

    #[test]
    fn test_cell_from_sql_value() {
        assert_eq!(Cell::from(Value::Null), Cell::Null);
        assert_eq!(Cell::from(Value::Integer(7)), Cell::Integer(7));
        assert_eq!(Cell::from(Value::Text("x".into())), Cell::Text("x".into()));
        assert_eq!(Cell::from(Value::Blob(b"12.5".to_vec())), Cell::Text("12.5".into()));
        assert_eq!(Cell::from(Value::Blob(vec![0xff, 0xfe])), Cell::Null);
    }

    #[test]
    fn test_segment_ordering_and_labels() {
        assert!(Segment::Low < Segment::Medium && Segment::Medium < Segment::High);
        assert_eq!(Segment::ALL.map(|s| s.label()), ["Low", "Medium", "High"]);
        assert_eq!(Segment::High.to_string(), "High");
    }
}
