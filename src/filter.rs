//! Filter engine: user selections applied to the enriched relation.

use crate::error::FilterError;
use crate::models::EnrichedSale;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Label shown for the "no restriction" entry of a selector
pub const ALL_SENTINEL: &str = "Todos";

/// One selector control: either unrestricted or an exact value
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Selector {
    #[default]
    All,
    Exact(String),
}

impl Selector {
    pub fn matches(&self, value: Option<&str>) -> bool {
        match self {
            Selector::All => true,
            Selector::Exact(wanted) => value == Some(wanted.as_str()),
        }
    }

    pub fn is_all(&self) -> bool {
        matches!(self, Selector::All)
    }
}

impl From<&str> for Selector {
    fn from(s: &str) -> Self {
        let trimmed = s.trim();
        if trimmed.is_empty() || trimmed == ALL_SENTINEL || trimmed.eq_ignore_ascii_case("all") {
            Selector::All
        } else {
            Selector::Exact(trimmed.to_string())
        }
    }
}

impl From<Option<&str>> for Selector {
    fn from(s: Option<&str>) -> Self {
        s.map(Selector::from).unwrap_or_default()
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Selector::All => f.write_str(ALL_SENTINEL),
            Selector::Exact(v) => f.write_str(v),
        }
    }
}

/// How the page exposes its controls
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterPolicy {
    /// City selector with an "all" entry, no category selector
    #[default]
    Overview,
    /// Category and city both required
    Drilldown,
}

impl FilterPolicy {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "overview" | "dashboard" => Some(FilterPolicy::Overview),
            "drilldown" | "procesamiento" => Some(FilterPolicy::Drilldown),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FilterSelection {
    pub category: Selector,
    pub city: Selector,
    /// Inclusive; `None` means no lower bound
    pub date_start: Option<NaiveDate>,
    /// Inclusive; `None` means no upper bound
    pub date_end: Option<NaiveDate>,
}

impl FilterSelection {
    /// Apply the page policy: the overview page has no category control, and
    /// the drilldown page accepts only concrete values.
    pub fn under_policy(mut self, policy: FilterPolicy) -> Result<Self, FilterError> {
        match policy {
            FilterPolicy::Overview => self.category = Selector::All,
            FilterPolicy::Drilldown => {
                if self.category.is_all() {
                    return Err(FilterError::SelectionRequired("category"));
                }
                if self.city.is_all() {
                    return Err(FilterError::SelectionRequired("city"));
                }
            }
        }
        Ok(self)
    }

    fn date_in_range(&self, row: &EnrichedSale) -> bool {
        if self.date_start.is_none() && self.date_end.is_none() {
            return true;
        }
        let Some(date) = row.invoice_date.map(|dt| dt.date()) else {
            return false;
        };
        self.date_start.map_or(true, |start| date >= start)
            && self.date_end.map_or(true, |end| date <= end)
    }

    pub fn matches(&self, row: &EnrichedSale) -> bool {
        self.category.matches(row.category.as_deref())
            && self.city.matches(row.city.as_deref())
            && self.date_in_range(row)
    }
}

/// Parse a `YYYY-MM-DD` bound; blank means unbounded
pub fn parse_date_bound(s: Option<&str>) -> Result<Option<NaiveDate>, FilterError> {
    match s.map(str::trim) {
        None | Some("") => Ok(None),
        Some(v) => NaiveDate::parse_from_str(v, "%Y-%m-%d")
            .map(Some)
            .map_err(|_| FilterError::InvalidDate(v.to_string())),
    }
}

/// Rows satisfying every predicate of `selection`, in input order
pub fn apply<'a>(rows: &'a [EnrichedSale], selection: &FilterSelection) -> Vec<&'a EnrichedSale> {
    rows.iter().filter(|row| selection.matches(row)).collect()
}

/// Values the controls are populated with
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FilterOptions {
    pub policy: FilterPolicy,
    pub categories: Vec<String>,
    pub cities: Vec<String>,
    pub min_date: Option<NaiveDate>,
    pub max_date: Option<NaiveDate>,
}

impl FilterOptions {
    pub fn from_rows(rows: &[EnrichedSale], policy: FilterPolicy) -> Self {
        let categories: BTreeSet<&str> = rows.iter().filter_map(|r| r.category.as_deref()).collect();
        let cities: BTreeSet<&str> = rows.iter().filter_map(|r| r.city.as_deref()).collect();

        let mut city_options: Vec<String> = Vec::with_capacity(cities.len() + 1);
        if policy == FilterPolicy::Overview {
            city_options.push(ALL_SENTINEL.to_string());
        }
        city_options.extend(cities.into_iter().map(String::from));

        let category_options = match policy {
            FilterPolicy::Overview => Vec::new(),
            FilterPolicy::Drilldown => categories.into_iter().map(String::from).collect(),
        };

        let dates = rows.iter().filter_map(|r| r.invoice_date.map(|d| d.date()));
        let (min_date, max_date) = dates.fold((None, None), |(lo, hi): (Option<NaiveDate>, Option<NaiveDate>), d| {
            (Some(lo.map_or(d, |l| l.min(d))), Some(hi.map_or(d, |h| h.max(d))))
        });

        Self {
            policy,
            categories: category_options,
            cities: city_options,
            min_date,
            max_date,
        }
    }

    /// The selection a page starts with: first entry of each control and
    /// the full date range.
    pub fn default_selection(&self) -> FilterSelection {
        FilterSelection {
            category: self
                .categories
                .first()
                .map(|c| Selector::Exact(c.clone()))
                .unwrap_or_default(),
            city: self
                .cities
                .first()
                .map(|c| Selector::from(c.as_str()))
                .unwrap_or_default(),
            date_start: self.min_date,
            date_end: self.max_date,
        }
    }

    /// Build a selection from explicit control values, falling back to
    /// `default_selection` for every control left unset.
    pub fn resolve_selection(
        &self,
        category: Option<&str>,
        city: Option<&str>,
        start: Option<&str>,
        end: Option<&str>,
    ) -> Result<FilterSelection, FilterError> {
        let defaults = self.default_selection();
        Ok(FilterSelection {
            category: category.map(Selector::from).unwrap_or(defaults.category),
            city: city.map(Selector::from).unwrap_or(defaults.city),
            date_start: match start {
                Some(s) => parse_date_bound(Some(s))?,
                None => defaults.date_start,
            },
            date_end: match end {
                Some(s) => parse_date_bound(Some(s))?,
                None => defaults.date_end,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDateTime;

    fn row(sale_key: i64, category: &str, city: Option<&str>, date: Option<&str>) -> EnrichedSale {
        EnrichedSale {
            sale_key,
            customer_key: Some(1),
            city_key: Some(1),
            invoice_date: date.map(|d| NaiveDateTime::parse_from_str(d, "%Y-%m-%d %H:%M:%S").unwrap()),
            amount: Some(10.0),
            category: Some(category.to_string()),
            customer: None,
            buying_group: None,
            city: city.map(String::from),
            state_province: None,
        }
    }

    fn day(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn rows() -> Vec<EnrichedSale> {
        vec![
            row(1, "Gift Store", Some("Reno"), Some("2016-01-01 00:00:00")),
            row(2, "Gift Store", Some("Erie"), Some("2016-01-31 23:59:59")),
            row(3, "Novelty Shop", Some("Reno"), Some("2016-02-15 12:00:00")),
            row(4, "Novelty Shop", None, Some("2016-03-01 08:00:00")),
            row(5, "Corporate", Some("Erie"), None),
        ]
    }

    fn keys(rows: &[&EnrichedSale]) -> Vec<i64> {
        rows.iter().map(|r| r.sale_key).collect()
    }

    #[test]
    fn test_sentinel_parsing() {
        assert_eq!(Selector::from("Todos"), Selector::All);
        assert_eq!(Selector::from("ALL"), Selector::All);
        assert_eq!(Selector::from(None), Selector::All);
        assert_eq!(Selector::from("Reno"), Selector::Exact("Reno".into()));
        assert_eq!(Selector::from(" Reno "), Selector::Exact("Reno".into()));
        assert!(Selector::from(" Reno ").matches(Some("Reno")));
    }

    #[test]
    fn test_end_date_includes_whole_day() {
        let data = rows();
        let selection = FilterSelection {
            date_start: Some(day("2016-01-01")),
            date_end: Some(day("2016-01-31")),
            ..Default::default()
        };
        assert_eq!(keys(&apply(&data, &selection)), vec![1, 2]);
    }

    #[test]
    fn test_all_city_equals_no_city_predicate() {
        let data = rows();
        let with_sentinel = FilterSelection {
            city: Selector::from("Todos"),
            date_start: Some(day("2016-01-01")),
            date_end: Some(day("2016-12-31")),
            ..Default::default()
        };
        let without = FilterSelection {
            city: Selector::All,
            ..with_sentinel.clone()
        };
        assert_eq!(apply(&data, &with_sentinel), apply(&data, &without));
        assert_eq!(keys(&apply(&data, &with_sentinel)), vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_predicates_are_conjunctive() {
        let data = rows();
        let selection = FilterSelection {
            category: Selector::from("Novelty Shop"),
            city: Selector::from("Reno"),
            ..Default::default()
        };
        assert_eq!(keys(&apply(&data, &selection)), vec![3]);
    }

    #[test]
    fn test_unbounded_dates_keep_undated_rows() {
        let data = rows();
        assert_eq!(apply(&data, &FilterSelection::default()).len(), data.len());

        let lower_only = FilterSelection {
            date_start: Some(day("2016-02-01")),
            ..Default::default()
        };
        assert_eq!(keys(&apply(&data, &lower_only)), vec![3, 4]);
    }

    #[test]
    fn test_filter_is_subset_and_idempotent() {
        let data = rows();
        let selection = FilterSelection {
            city: Selector::from("Erie"),
            date_start: Some(day("2015-01-01")),
            date_end: Some(day("2017-01-01")),
            ..Default::default()
        };
        let first = apply(&data, &selection);
        let second = apply(&data, &selection);
        assert_eq!(first, second);
        assert!(first.len() <= data.len());
        for r in &first {
            assert!(data.contains(*r));
            let d = r.invoice_date.unwrap().date();
            assert!(d >= selection.date_start.unwrap() && d <= selection.date_end.unwrap());
        }
    }

    #[test]
    fn test_inverted_range_is_empty_not_error() {
        let data = rows();
        let selection = FilterSelection {
            date_start: Some(day("2016-03-01")),
            date_end: Some(day("2016-01-01")),
            ..Default::default()
        };
        assert!(apply(&data, &selection).is_empty());
    }

    #[test]
    fn test_policies() {
        let overview = FilterSelection {
            category: Selector::from("Gift Store"),
            ..Default::default()
        }
        .under_policy(FilterPolicy::Overview)
        .unwrap();
        assert_eq!(overview.category, Selector::All);

        let err = FilterSelection {
            category: Selector::from("Gift Store"),
            ..Default::default()
        }
        .under_policy(FilterPolicy::Drilldown)
        .unwrap_err();
        assert_eq!(err, FilterError::SelectionRequired("city"));

        assert_eq!(FilterPolicy::parse("procesamiento"), Some(FilterPolicy::Drilldown));
        assert_eq!(FilterPolicy::parse("nope"), None);
    }

    #[test]
    fn test_date_bound_parsing() {
        assert_eq!(parse_date_bound(None), Ok(None));
        assert_eq!(parse_date_bound(Some(" ")), Ok(None));
        assert_eq!(parse_date_bound(Some("2016-01-02")), Ok(Some(day("2016-01-02"))));
        assert!(matches!(parse_date_bound(Some("01/02/2016")), Err(FilterError::InvalidDate(_))));
    }

    #[test]
    fn test_options_enumerate_controls() {
        let data = rows();

        let overview = FilterOptions::from_rows(&data, FilterPolicy::Overview);
        assert_eq!(overview.cities, vec!["Todos", "Erie", "Reno"]);
        assert!(overview.categories.is_empty());
        assert_eq!(overview.min_date, Some(day("2016-01-01")));
        assert_eq!(overview.max_date, Some(day("2016-03-01")));

        let drilldown = FilterOptions::from_rows(&data, FilterPolicy::Drilldown);
        assert_eq!(drilldown.categories, vec!["Corporate", "Gift Store", "Novelty Shop"]);
        assert_eq!(drilldown.cities, vec!["Erie", "Reno"]);

        let selection = drilldown.default_selection();
        assert_eq!(selection.category, Selector::Exact("Corporate".into()));
        assert_eq!(selection.city, Selector::Exact("Erie".into()));
        assert_eq!(selection.date_start, Some(day("2016-01-01")));
    }

    #[test]
    fn test_resolve_selection_fills_unset_controls() {
        let options = FilterOptions::from_rows(&rows(), FilterPolicy::Overview);

        let selection = options.resolve_selection(None, None, None, None).unwrap();
        assert_eq!(selection, options.default_selection());

        let selection = options
            .resolve_selection(None, Some("Reno"), Some("2016-02-01"), None)
            .unwrap();
        assert_eq!(selection.category, Selector::All);
        assert_eq!(selection.city, Selector::Exact("Reno".into()));
        assert_eq!(selection.date_start, Some(day("2016-02-01")));
        assert_eq!(selection.date_end, Some(day("2016-03-01")));

        // An explicit blank bound clears the default
        let selection = options.resolve_selection(None, Some("Todos"), Some(""), None).unwrap();
        assert_eq!(selection.city, Selector::All);
        assert_eq!(selection.date_start, None);

        assert!(matches!(
            options.resolve_selection(None, None, Some("31/01/2016"), None),
            Err(FilterError::InvalidDate(_))
        ));
    }
}
