//! KPI aggregation over the filtered, segmented rows.

use crate::models::Segment;
use crate::segment::SegmentedSale;
use chrono::Datelike;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

/// Denominator for the share-of-transactions chart
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShareBase {
    /// Distinct sale keys of the whole, unfiltered fact relation
    #[default]
    Global,
    /// Distinct sale keys of the filtered view
    Filtered,
}

impl ShareBase {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "global" => Some(ShareBase::Global),
            "filtered" => Some(ShareBase::Filtered),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    /// Sum of the non-missing amounts; 0 for an empty view
    pub total_value: f64,
    /// `None` when no row has an amount
    pub average_ticket: Option<f64>,
    /// Mean transactions per calendar month; `None` when no row is dated
    pub purchase_frequency: Option<f64>,
    pub transactions: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SegmentRow {
    pub segment: Segment,
    pub total_value: f64,
    pub average_ticket: Option<f64>,
    /// Distinct sale keys in the segment
    pub transactions: usize,
    pub share_pct: f64,
}

/// One bar of a categorical chart
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Bar {
    pub label: String,
    pub value: f64,
}

pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

pub fn summarize(rows: &[SegmentedSale<'_>]) -> Summary {
    let amounts: Vec<f64> = rows.iter().filter_map(|r| r.sale.amount).collect();

    let mut per_month: BTreeMap<(i32, u32), usize> = BTreeMap::new();
    for date in rows.iter().filter_map(|r| r.sale.invoice_date) {
        *per_month.entry((date.year(), date.month())).or_insert(0) += 1;
    }
    let monthly: Vec<f64> = per_month.values().map(|&n| n as f64).collect();

    Summary {
        total_value: amounts.iter().sum(),
        average_ticket: mean(&amounts),
        purchase_frequency: mean(&monthly),
        transactions: rows.len(),
    }
}

/// One row per segment, always all three, in segment order.
/// Rows without a segment are left out.
pub fn segment_table(rows: &[SegmentedSale<'_>], base: ShareBase, global_transactions: usize) -> Vec<SegmentRow> {
    let filtered_transactions = rows
        .iter()
        .map(|r| r.sale.sale_key)
        .collect::<HashSet<_>>()
        .len();
    let denominator = match base {
        ShareBase::Global => global_transactions,
        ShareBase::Filtered => filtered_transactions,
    };

    Segment::ALL
        .iter()
        .map(|&segment| {
            let members: Vec<&SegmentedSale<'_>> = rows.iter().filter(|r| r.segment == Some(segment)).collect();
            let amounts: Vec<f64> = members.iter().filter_map(|r| r.sale.amount).collect();
            let transactions = members.iter().map(|r| r.sale.sale_key).collect::<HashSet<_>>().len();
            let share_pct = if denominator > 0 {
                transactions as f64 / denominator as f64 * 100.0
            } else {
                0.0
            };

            SegmentRow {
                segment,
                total_value: amounts.iter().sum(),
                average_ticket: mean(&amounts),
                transactions,
                share_pct,
            }
        })
        .collect()
}

/// Bars sorted by value, highest first; ties keep segment order
fn sorted_bars<F>(table: &[SegmentRow], value: F) -> Vec<Bar>
where
    F: Fn(&SegmentRow) -> f64,
{
    let mut bars: Vec<Bar> = table
        .iter()
        .map(|row| Bar {
            label: row.segment.label().to_string(),
            value: value(row),
        })
        .collect();
    bars.sort_by(|a, b| b.value.total_cmp(&a.value));
    bars
}

pub fn value_by_segment(table: &[SegmentRow]) -> Vec<Bar> {
    sorted_bars(table, |r| r.total_value)
}

pub fn share_by_segment(table: &[SegmentRow]) -> Vec<Bar> {
    sorted_bars(table, |r| r.share_pct)
}
