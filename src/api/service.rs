//! Shared logic behind the REST handlers.
//!
//! The prepared dataset is cached after the first load; every request then
//! runs the pure `compute` over an immutable snapshot.

use crate::dashboard::{self, ComputeOptions, DashboardView, Dataset};
use crate::error::{FilterError, StoreError};
use crate::filter::{FilterOptions, FilterPolicy, FilterSelection};
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::info;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Filter(#[from] FilterError),

    #[error("invalid parameter {name}: {value:?}")]
    InvalidParameter { name: &'static str, value: String },

    #[error("load task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

pub struct DashboardService {
    db_path: PathBuf,
    cached_dataset: Arc<RwLock<Option<Arc<Dataset>>>>,
}

impl DashboardService {
    pub fn new(db_path: impl Into<PathBuf>) -> Self {
        Self {
            db_path: db_path.into(),
            cached_dataset: Arc::new(RwLock::new(None)),
        }
    }

    /// Serve a dataset that is already prepared, without touching the store
    pub fn with_dataset(db_path: impl Into<PathBuf>, dataset: Dataset) -> Self {
        Self {
            db_path: db_path.into(),
            cached_dataset: Arc::new(RwLock::new(Some(Arc::new(dataset)))),
        }
    }

    pub async fn dataset(&self) -> Result<Arc<Dataset>, ServiceError> {
        // Check cache first
        {
            let cache = self.cached_dataset.read().await;
            if let Some(dataset) = cache.as_ref() {
                return Ok(dataset.clone());
            }
        }

        let path = self.db_path.clone();
        let dataset = Arc::new(tokio::task::spawn_blocking(move || Dataset::load(&path)).await??);

        {
            let mut cache = self.cached_dataset.write().await;
            *cache = Some(dataset.clone());
        }

        Ok(dataset)
    }

    /// Drop the cached dataset and load it again
    pub async fn reload(&self) -> Result<Arc<Dataset>, ServiceError> {
        {
            let mut cache = self.cached_dataset.write().await;
            *cache = None;
        }
        info!("Reloading dataset from {}", self.db_path.display());
        self.dataset().await
    }

    pub async fn options(&self, policy: FilterPolicy) -> Result<FilterOptions, ServiceError> {
        Ok(self.dataset().await?.options(policy))
    }

    pub async fn dashboard(
        &self,
        selection: &FilterSelection,
        options: &ComputeOptions,
    ) -> Result<DashboardView, ServiceError> {
        let dataset = self.dataset().await?;
        Ok(dashboard::compute(&dataset, selection, options)?)
    }
}
