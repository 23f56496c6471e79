//! Sales segmentation dashboard engine.
//!
//! Loads `FactSale`, `DimCustomer` and `DimCity` from a SQLite store, joins
//! and normalizes them, and computes percentile-based spend segments and KPIs
//! for a filter selection.

pub mod api;
pub mod config;
pub mod dashboard;
pub mod db;
pub mod error;
pub mod filter;
pub mod format;
pub mod join;
pub mod kpi;
pub mod models;
pub mod normalize;
pub mod segment;

pub use dashboard::{compute, ComputeOptions, DashboardView, Dataset};
pub use error::{FilterError, StoreError};
pub use filter::{FilterPolicy, FilterSelection, Selector};
pub use kpi::ShareBase;
