//! Left joins of the sales facts onto the customer and city dimensions.

use crate::models::{CityDim, CustomerDim, JoinedSale, SaleFact};
use std::collections::HashMap;
use tracing::warn;

/// Index a dimension by key. Duplicate keys keep every row so the join fans
/// out the way a relational left join does.
fn index_by<T, F>(rows: &[T], key: F) -> HashMap<i64, Vec<&T>>
where
    F: Fn(&T) -> i64,
{
    let mut index: HashMap<i64, Vec<&T>> = HashMap::with_capacity(rows.len());
    for row in rows {
        index.entry(key(row)).or_default().push(row);
    }
    index
}

/// Dimension rows matching `key`, or a single `None` on a miss
fn matches<T: Clone>(index: &HashMap<i64, Vec<&T>>, key: Option<i64>) -> Vec<Option<T>> {
    match key.and_then(|k| index.get(&k)) {
        Some(rows) => rows.iter().map(|r| Some((*r).clone())).collect(),
        None => vec![None],
    }
}

fn duplicate_keys<T>(index: &HashMap<i64, Vec<&T>>) -> usize {
    index.values().filter(|rows| rows.len() > 1).count()
}

/// `facts LEFT JOIN customers ON "Customer Key" LEFT JOIN cities ON "City Key"`
///
/// Every fact survives. A miss (or a null key) leaves the dimension `None`; a
/// key matching several dimension rows yields one output row per match, in
/// fact order.
pub fn left_join(facts: &[SaleFact], customers: &[CustomerDim], cities: &[CityDim]) -> Vec<JoinedSale> {
    let customer_index = index_by(customers, |c| c.customer_key);
    let city_index = index_by(cities, |c| c.city_key);

    let dup_customers = duplicate_keys(&customer_index);
    if dup_customers > 0 {
        warn!("DimCustomer has {} duplicated keys; joined rows will fan out", dup_customers);
    }
    let dup_cities = duplicate_keys(&city_index);
    if dup_cities > 0 {
        warn!("DimCity has {} duplicated keys; joined rows will fan out", dup_cities);
    }

    let mut joined = Vec::with_capacity(facts.len());
    for fact in facts {
        for customer in matches(&customer_index, fact.customer_key) {
            for city in matches(&city_index, fact.city_key) {
                joined.push(JoinedSale {
                    fact: fact.clone(),
                    customer: customer.clone(),
                    city,
                });
            }
        }
    }

    joined
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Cell;

    fn fact(sale_key: i64, customer_key: Option<i64>, city_key: Option<i64>) -> SaleFact {
        SaleFact {
            sale_key,
            customer_key,
            city_key,
            invoice_date: Cell::from("2016-03-01"),
            total_including_tax: Cell::from(10.0),
            category: None,
        }
    }

    fn city(city_key: i64, name: &str) -> CityDim {
        CityDim {
            city_key,
            city: Some(name.to_string()),
            state_province: None,
        }
    }

    fn customer(customer_key: i64, category: &str) -> CustomerDim {
        CustomerDim {
            customer_key,
            category: Some(category.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_unmatched_city_keeps_fact() {
        let facts = vec![fact(1, Some(10), Some(999))];
        let joined = left_join(&facts, &[customer(10, "Gift Store")], &[city(1, "Tulsa")]);

        assert_eq!(joined.len(), 1);
        assert_eq!(joined[0].fact, facts[0]);
        assert!(joined[0].city.is_none());
        assert_eq!(joined[0].customer.as_ref().unwrap().category.as_deref(), Some("Gift Store"));
    }

    #[test]
    fn test_null_keys_never_match() {
        let facts = vec![fact(1, None, None)];
        let joined = left_join(&facts, &[customer(0, "x")], &[city(0, "y")]);
        assert_eq!(joined.len(), 1);
        assert!(joined[0].customer.is_none());
        assert!(joined[0].city.is_none());
    }

    #[test]
    fn test_duplicate_dimension_key_fans_out() {
        let facts = vec![fact(1, Some(10), Some(1)), fact(2, Some(10), Some(2))];
        let cities = vec![city(1, "Tulsa"), city(1, "Tulsa (dup)"), city(2, "Erie")];
        let joined = left_join(&facts, &[customer(10, "Corporate")], &cities);

        let keys: Vec<i64> = joined.iter().map(|j| j.fact.sale_key).collect();
        assert_eq!(keys, vec![1, 1, 2]);
        assert_eq!(joined[1].city.as_ref().unwrap().city.as_deref(), Some("Tulsa (dup)"));
    }

    #[test]
    fn test_preserves_fact_order() {
        let facts: Vec<SaleFact> = (0..5).rev().map(|k| fact(k, Some(k), Some(k))).collect();
        let joined = left_join(&facts, &[], &[]);
        let keys: Vec<i64> = joined.iter().map(|j| j.fact.sale_key).collect();
        assert_eq!(keys, vec![4, 3, 2, 1, 0]);
    }
}
