//! REST API handlers for the sales dashboard
//!
//! These handlers use the shared DashboardService.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::service::{DashboardService, ServiceError};
use crate::dashboard::{ComputeOptions, DashboardView};
use crate::error::StoreError;
use crate::filter::{parse_date_bound, FilterOptions, FilterPolicy, FilterSelection, Selector};
use crate::kpi::{SegmentRow, ShareBase};

// ============================================================================
// Response Types
// ============================================================================

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Serialize)]
pub struct ReloadResponse {
    pub rows: usize,
    pub transactions: usize,
}

pub type ApiError = (StatusCode, Json<ErrorResponse>);

impl From<ServiceError> for ApiError {
    fn from(e: ServiceError) -> Self {
        let status = match &e {
            ServiceError::Store(StoreError::NotFound(_)) => StatusCode::NOT_FOUND,
            ServiceError::Store(_) => StatusCode::SERVICE_UNAVAILABLE,
            ServiceError::Filter(_) | ServiceError::InvalidParameter { .. } => StatusCode::BAD_REQUEST,
            ServiceError::Task(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            tracing::error!("Request failed: {}", e);
        }
        (status, Json(ErrorResponse { error: e.to_string() }))
    }
}

// ============================================================================
// Query Parameters
// ============================================================================

#[derive(Deserialize, Default)]
pub struct OptionsQuery {
    pub policy: Option<String>,
}

#[derive(Deserialize, Default)]
pub struct DashboardQuery {
    pub policy: Option<String>,
    pub category: Option<String>,
    pub city: Option<String>,
    pub start: Option<String>,
    pub end: Option<String>,
    pub share_base: Option<String>,
}

fn parse_policy(raw: Option<&str>) -> Result<FilterPolicy, ServiceError> {
    match raw {
        None => Ok(FilterPolicy::default()),
        Some(v) => FilterPolicy::parse(v).ok_or_else(|| ServiceError::InvalidParameter {
            name: "policy",
            value: v.to_string(),
        }),
    }
}

impl DashboardQuery {
    pub fn into_request(self) -> Result<(FilterSelection, ComputeOptions), ServiceError> {
        let policy = parse_policy(self.policy.as_deref())?;
        let share_base = match self.share_base.as_deref() {
            None => ShareBase::default(),
            Some(v) => ShareBase::parse(v).ok_or_else(|| ServiceError::InvalidParameter {
                name: "share_base",
                value: v.to_string(),
            })?,
        };

        let selection = FilterSelection {
            category: Selector::from(self.category.as_deref()),
            city: Selector::from(self.city.as_deref()),
            date_start: parse_date_bound(self.start.as_deref())?,
            date_end: parse_date_bound(self.end.as_deref())?,
        };
        Ok((selection, ComputeOptions { policy, share_base }))
    }
}

// ============================================================================
// Handlers
// ============================================================================

pub type AppState = Arc<DashboardService>;

/// GET /api/v1/health
pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({"status": "ok"}))
}

/// GET /api/v1/options?policy=overview|drilldown
pub async fn get_options(
    State(service): State<AppState>,
    Query(params): Query<OptionsQuery>,
) -> Result<Json<FilterOptions>, ApiError> {
    let policy = parse_policy(params.policy.as_deref())?;
    Ok(Json(service.options(policy).await?))
}

/// GET /api/v1/dashboard
pub async fn get_dashboard(
    State(service): State<AppState>,
    Query(params): Query<DashboardQuery>,
) -> Result<Json<DashboardView>, ApiError> {
    let (selection, options) = params.into_request()?;
    Ok(Json(service.dashboard(&selection, &options).await?))
}

/// GET /api/v1/segments
pub async fn get_segments(
    State(service): State<AppState>,
    Query(params): Query<DashboardQuery>,
) -> Result<Json<Vec<SegmentRow>>, ApiError> {
    let (selection, options) = params.into_request()?;
    let view = service.dashboard(&selection, &options).await?;
    Ok(Json(view.segment_table))
}

/// POST /api/v1/reload
pub async fn reload(State(service): State<AppState>) -> Result<Json<ReloadResponse>, ApiError> {
    let dataset = service.reload().await?;
    Ok(Json(ReloadResponse {
        rows: dataset.rows().len(),
        transactions: dataset.global_transactions(),
    }))
}
