//! Manual daily reset and reset history

use axum::{
    Extension, Json,
    extract::{Path, State},
};
use shared::models::{DailyResetLog, DailyResetRequest, DailyResetSummary, ResetTrigger};
use shared::staff::permissions;

use crate::auth::{UserIdentity, require_venue};
use crate::db;
use crate::error::internal;
use crate::state::AppState;

use super::{ApiResult, business_date};

/// POST /api/venues/{venue_id}/daily-reset
///
/// A second call for the same date reports `skipped: true`.
pub async fn run_daily_reset(
    State(state): State<AppState>,
    Extension(identity): Extension<UserIdentity>,
    Path(venue_id): Path<i64>,
    Json(data): Json<DailyResetRequest>,
) -> ApiResult<DailyResetSummary> {
    let access = require_venue(&state, venue_id, &identity, permissions::ORDERS_MANAGE).await?;
    let date = business_date(data.date.as_deref())?;
    let summary = db::daily_reset::run(&state.pool, venue_id, date, ResetTrigger::Manual)
        .await
        .map_err(internal)?;
    tracing::info!(
        venue_id,
        reset_date = %summary.reset_date,
        skipped = summary.skipped,
        user_id = %access.user_id,
        "Manual daily reset"
    );
    Ok(Json(summary))
}

/// GET /api/venues/{venue_id}/daily-reset
pub async fn reset_history(
    State(state): State<AppState>,
    Extension(identity): Extension<UserIdentity>,
    Path(venue_id): Path<i64>,
) -> ApiResult<Vec<DailyResetLog>> {
    require_venue(&state, venue_id, &identity, permissions::REPORTS_VIEW).await?;
    let history = db::daily_reset::history(&state.pool, venue_id, 30)
        .await
        .map_err(internal)?;
    Ok(Json(history))
}
