//! Dashboard composition.
//!
//! [`Dataset`] is the joined and normalized relation, prepared once per load.
//! [`compute`] is a pure function of a dataset and a filter selection: it
//! never mutates the dataset and keeps no state between calls.

use crate::db;
use crate::error::{FilterError, StoreResult};
use crate::filter::{self, FilterOptions, FilterPolicy, FilterSelection};
use crate::format::{currency, decimal, or_no_data};
use crate::join::left_join;
use crate::kpi::{self, Bar, SegmentRow, ShareBase, Summary};
use crate::models::{EnrichedSale, SourceTables};
use crate::normalize::normalize;
use crate::segment::{segment_rows, Thresholds};
use serde::Serialize;
use std::collections::HashSet;
use std::path::Path;
use tracing::{debug, info};

#[derive(Debug, Clone, Default)]
pub struct Dataset {
    rows: Vec<EnrichedSale>,
    /// Distinct sale keys of the fact relation before any join or filter
    global_transactions: usize,
}

impl Dataset {
    pub fn prepare(tables: SourceTables) -> Self {
        let global_transactions = tables
            .sales
            .iter()
            .map(|s| s.sale_key)
            .collect::<HashSet<_>>()
            .len();
        let joined = left_join(&tables.sales, &tables.customers, &tables.cities);
        let rows = normalize(joined);
        info!(
            "Prepared {} enriched rows ({} distinct sales)",
            rows.len(),
            global_transactions
        );
        Self {
            rows,
            global_transactions,
        }
    }

    /// Load the store and prepare the working relation
    pub fn load(path: &Path) -> StoreResult<Self> {
        Ok(Self::prepare(db::load_tables(path)?))
    }

    pub fn rows(&self) -> &[EnrichedSale] {
        &self.rows
    }

    pub fn global_transactions(&self) -> usize {
        self.global_transactions
    }

    pub fn options(&self, policy: FilterPolicy) -> FilterOptions {
        FilterOptions::from_rows(&self.rows, policy)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ComputeOptions {
    pub policy: FilterPolicy,
    pub share_base: ShareBase,
}

/// KPI values formatted for display
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KpiDisplay {
    pub total_value: String,
    pub average_ticket: String,
    pub purchase_frequency: String,
}

impl From<&Summary> for KpiDisplay {
    fn from(s: &Summary) -> Self {
        Self {
            total_value: currency(s.total_value),
            average_ticket: or_no_data(s.average_ticket, currency),
            purchase_frequency: or_no_data(s.purchase_frequency, decimal),
        }
    }
}

/// Everything a page renders for one selection
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardView {
    pub selection: FilterSelection,
    pub share_base: ShareBase,
    pub thresholds: Option<Thresholds>,
    pub summary: Summary,
    pub display: KpiDisplay,
    pub value_by_segment: Vec<Bar>,
    pub share_by_segment: Vec<Bar>,
    pub segment_table: Vec<SegmentRow>,
    /// Rows in the view whose amount is missing and carry no segment
    pub unsegmented_rows: usize,
}

/// Run filter, segmentation and aggregation for one selection
pub fn compute(
    dataset: &Dataset,
    selection: &FilterSelection,
    options: &ComputeOptions,
) -> Result<DashboardView, FilterError> {
    let selection = selection.clone().under_policy(options.policy)?;

    let filtered = filter::apply(dataset.rows(), &selection);
    let (thresholds, segmented) = segment_rows(&filtered);
    debug!(
        "Selection kept {} of {} rows, thresholds {:?}",
        filtered.len(),
        dataset.rows().len(),
        thresholds
    );

    let summary = kpi::summarize(&segmented);
    let segment_table = kpi::segment_table(&segmented, options.share_base, dataset.global_transactions());
    let unsegmented_rows = segmented.iter().filter(|s| s.segment.is_none()).count();

    Ok(DashboardView {
        display: KpiDisplay::from(&summary),
        value_by_segment: kpi::value_by_segment(&segment_table),
        share_by_segment: kpi::share_by_segment(&segment_table),
        selection,
        share_base: options.share_base,
        thresholds,
        summary,
        segment_table,
        unsegmented_rows,
    })
}
