//! Admin reports.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Query, State};
use chrono::{DateTime, Utc};
use domain::RevenueReport;
use serde::{Deserialize, Serialize};
use store::Store;

use crate::auth::Identity;
use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct RevenueParams {
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
pub struct RevenueResponse {
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub confirmed_orders: usize,
    pub revenue_cents: i64,
    pub revenue: String,
}

impl From<RevenueReport> for RevenueResponse {
    fn from(report: RevenueReport) -> Self {
        Self {
            from: report.from,
            to: report.to,
            confirmed_orders: report.confirmed_orders,
            revenue_cents: report.revenue.cents(),
            revenue: report.revenue.to_string(),
        }
    }
}

/// GET /reports/revenue?from=&to=
#[tracing::instrument(skip(state))]
pub async fn revenue<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Identity(caller): Identity,
    Query(params): Query<RevenueParams>,
) -> Result<Json<RevenueResponse>, ApiError> {
    if let (Some(from), Some(to)) = (params.from, params.to)
        && from > to
    {
        return Err(ApiError::BadRequest(
            "`from` must not be later than `to`".to_string(),
        ));
    }

    let report = state.reports.revenue(&caller, params.from, params.to).await?;
    Ok(Json(report.into()))
}
