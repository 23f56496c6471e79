//! Percentile-based spend segmentation.
//!
//! Thresholds are computed over whatever rows are passed in, so callers
//! segment the *filtered* view and get new thresholds on every filter change.

use crate::models::{EnrichedSale, Segment};
use serde::Serialize;

pub const LOW_QUANTILE: f64 = 0.20;
pub const HIGH_QUANTILE: f64 = 0.80;

/// Quantile of an ascending slice with linear interpolation between ranks
/// (`h = (n - 1) * q`). `None` for an empty slice.
pub fn percentile(sorted: &[f64], q: f64) -> Option<f64> {
    if sorted.is_empty() {
        return None;
    }
    let q = q.clamp(0.0, 1.0);
    let h = (sorted.len() - 1) as f64 * q;
    let lo = h.floor() as usize;
    let hi = h.ceil() as usize;
    let frac = h - lo as f64;
    Some(sorted[lo] + frac * (sorted[hi] - sorted[lo]))
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Thresholds {
    pub p20: f64,
    pub p80: f64,
}

impl Thresholds {
    /// Thresholds over the non-missing amounts; `None` when there are none
    pub fn from_amounts<I>(amounts: I) -> Option<Self>
    where
        I: IntoIterator<Item = Option<f64>>,
    {
        let mut values: Vec<f64> = amounts.into_iter().flatten().collect();
        values.sort_by(f64::total_cmp);
        Some(Self {
            p20: percentile(&values, LOW_QUANTILE)?,
            p80: percentile(&values, HIGH_QUANTILE)?,
        })
    }

    /// Right-closed bins: `(-inf, p20]`, `(p20, p80]`, `(p80, inf)`.
    /// When `p20 == p80` the middle bin is empty.
    pub fn classify(&self, amount: f64) -> Segment {
        if amount <= self.p20 {
            Segment::Low
        } else if amount <= self.p80 {
            Segment::Medium
        } else {
            Segment::High
        }
    }
}

/// A filtered row together with its segment (`None` for a missing amount)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SegmentedSale<'a> {
    pub sale: &'a EnrichedSale,
    pub segment: Option<Segment>,
}

/// Segment every row against thresholds computed from the same rows
pub fn segment_rows<'a>(rows: &[&'a EnrichedSale]) -> (Option<Thresholds>, Vec<SegmentedSale<'a>>) {
    let thresholds = Thresholds::from_amounts(rows.iter().map(|r| r.amount));
    let segmented = rows
        .iter()
        .map(|&sale| SegmentedSale {
            sale,
            segment: match (thresholds, sale.amount) {
                (Some(t), Some(amount)) => Some(t.classify(amount)),
                _ => None,
            },
        })
        .collect();
    (thresholds, segmented)
}
