//! Type coercion for the monetary and invoice date columns.
//!
//! Unparseable values become `None`; they are excluded from every aggregate
//! downstream instead of counting as zero.

use crate::models::{Cell, EnrichedSale, JoinedSale};
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use tracing::debug;

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M:%S",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%Y%m%d"];

/// Numeric coercion of the amount column
pub fn to_amount(cell: &Cell) -> Option<f64> {
    let value = match cell {
        Cell::Null => return None,
        Cell::Integer(i) => *i as f64,
        Cell::Real(f) => *f,
        Cell::Text(s) => s.trim().parse::<f64>().ok()?,
    };
    value.is_finite().then_some(value)
}

/// Date-time coercion of the invoice date column
pub fn to_datetime(cell: &Cell) -> Option<NaiveDateTime> {
    match cell {
        Cell::Text(s) => parse_datetime(s.trim()),
        // Integer date keys of the form 20160131
        Cell::Integer(i) if (10_000_101..=99_991_231).contains(i) => {
            NaiveDate::parse_from_str(&i.to_string(), "%Y%m%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        }
        _ => None,
    }
}

pub fn parse_datetime(s: &str) -> Option<NaiveDateTime> {
    if s.is_empty() {
        return None;
    }
    // Keep the wall-clock time of the stated offset so the calendar day is unchanged
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.naive_local());
    }
    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .or_else(|| {
            DATE_FORMATS
                .iter()
                .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

/// Flatten joined rows into the typed working relation.
///
/// `Category` is taken from the customer dimension; the fact row's own
/// `Category` column only fills in when the customer has none.
pub fn normalize(joined: Vec<JoinedSale>) -> Vec<EnrichedSale> {
    let mut bad_amounts = 0usize;
    let mut bad_dates = 0usize;

    let rows: Vec<EnrichedSale> = joined
        .into_iter()
        .map(|j| {
            let amount = to_amount(&j.fact.total_including_tax);
            if amount.is_none() && !j.fact.total_including_tax.is_null() {
                bad_amounts += 1;
            }
            let invoice_date = to_datetime(&j.fact.invoice_date);
            if invoice_date.is_none() && !j.fact.invoice_date.is_null() {
                bad_dates += 1;
            }

            let (customer, customer_category, buying_group) = match j.customer {
                Some(c) => (c.customer, c.category, c.buying_group),
                None => (None, None, None),
            };
            let (city, state_province) = match j.city {
                Some(c) => (c.city, c.state_province),
                None => (None, None),
            };

            EnrichedSale {
                sale_key: j.fact.sale_key,
                customer_key: j.fact.customer_key,
                city_key: j.fact.city_key,
                invoice_date,
                amount,
                category: customer_category.or(j.fact.category),
                customer,
                buying_group,
                city,
                state_province,
            }
        })
        .collect();

    if bad_amounts > 0 || bad_dates > 0 {
        debug!(
            "Coerced {} unparseable amounts and {} unparseable dates to missing",
            bad_amounts, bad_dates
        );
    }
    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CityDim, CustomerDim, SaleFact};
    use chrono::{Datelike, Timelike};

    #[test]
    fn test_amount_coercion() {
        assert_eq!(to_amount(&Cell::Integer(12)), Some(12.0));
        assert_eq!(to_amount(&Cell::Real(9.75)), Some(9.75));
        assert_eq!(to_amount(&Cell::from(" 1e3 ")), Some(1000.0));
        assert_eq!(to_amount(&Cell::from("12,50")), None);
        assert_eq!(to_amount(&Cell::from("NaN")), None);
        assert_eq!(to_amount(&Cell::from("")), None);
        assert_eq!(to_amount(&Cell::Null), None);
    }

    #[test]
    fn test_datetime_coercion() {
        let d = to_datetime(&Cell::from("2016-05-31")).unwrap();
        assert_eq!((d.year(), d.month(), d.day(), d.hour()), (2016, 5, 31, 0));

        let d = to_datetime(&Cell::from("2016-05-31 13:45:00")).unwrap();
        assert_eq!(d.hour(), 13);

        let d = to_datetime(&Cell::from("2016-05-31T13:45:00.250")).unwrap();
        assert_eq!(d.minute(), 45);

        let d = to_datetime(&Cell::Integer(20160531)).unwrap();
        assert_eq!(d.date(), NaiveDate::from_ymd_opt(2016, 5, 31).unwrap());

        let d = to_datetime(&Cell::from("2016-01-31T22:00:00-05:00")).unwrap();
        assert_eq!(d.date(), NaiveDate::from_ymd_opt(2016, 1, 31).unwrap());
        assert_eq!(d.hour(), 22);
        let d = to_datetime(&Cell::from("2016-03-01T01:30:00+09:00")).unwrap();
        assert_eq!((d.month(), d.day()), (3, 1));

        assert!(to_datetime(&Cell::from("2016-02-30")).is_none());
        assert!(to_datetime(&Cell::from("yesterday")).is_none());
        assert!(to_datetime(&Cell::Real(20160531.0)).is_none());
        assert!(to_datetime(&Cell::Integer(7)).is_none());
    }

    #[test]
    fn test_normalize_flattens_dimensions() {
        let joined = vec![JoinedSale {
            fact: SaleFact {
                sale_key: 3,
                customer_key: Some(1),
                city_key: Some(2),
                invoice_date: Cell::from("garbage"),
                total_including_tax: Cell::from("88.10"),
                category: None,
            },
            customer: Some(CustomerDim {
                customer_key: 1,
                customer: Some("Wingtip".into()),
                category: Some("Gift Store".into()),
                buying_group: None,
            }),
            city: Some(CityDim {
                city_key: 2,
                city: Some("Reno".into()),
                state_province: Some("Nevada".into()),
            }),
        }];

        let rows = normalize(joined);
        assert_eq!(rows.len(), 1);
        let row = &rows[0];
        assert_eq!(row.amount, Some(88.10));
        assert_eq!(row.invoice_date, None);
        assert_eq!(row.category.as_deref(), Some("Gift Store"));
        assert_eq!(row.city.as_deref(), Some("Reno"));
        assert_eq!(row.state_province.as_deref(), Some("Nevada"));
    }

    fn joined_with_categories(fact: Option<&str>, customer: Option<&str>) -> JoinedSale {
        JoinedSale {
            fact: SaleFact {
                sale_key: 9,
                customer_key: Some(1),
                city_key: None,
                invoice_date: Cell::Null,
                total_including_tax: Cell::Real(5.0),
                category: fact.map(String::from),
            },
            customer: Some(CustomerDim {
                customer_key: 1,
                category: customer.map(String::from),
                ..Default::default()
            }),
            city: None,
        }
    }

    #[test]
    fn test_category_prefers_customer_dimension() {
        let rows = normalize(vec![
            joined_with_categories(Some("Kiosk"), Some("Gift Store")),
            joined_with_categories(Some("Kiosk"), None),
            joined_with_categories(None, Some("Corporate")),
            joined_with_categories(None, None),
        ]);
        let categories: Vec<Option<&str>> = rows.iter().map(|r| r.category.as_deref()).collect();
        assert_eq!(categories, vec![Some("Gift Store"), Some("Kiosk"), Some("Corporate"), None]);
    }
}
