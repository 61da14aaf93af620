//! Revenue analytics

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
};
use shared::models::{AnalyticsQuery, RevenueSummary};
use shared::staff::permissions;
use shared::util::now_millis;

use crate::auth::{UserIdentity, require_venue};
use crate::db;
use crate::error::internal;
use crate::state::AppState;

use super::ApiResult;

/// GET /api/venues/{venue_id}/analytics/summary?days=
pub async fn revenue_summary(
    State(state): State<AppState>,
    Extension(identity): Extension<UserIdentity>,
    Path(venue_id): Path<i64>,
    Query(query): Query<AnalyticsQuery>,
) -> ApiResult<RevenueSummary> {
    require_venue(&state, venue_id, &identity, permissions::REPORTS_VIEW).await?;
    let summary = db::analytics::revenue_summary(&state.pool, venue_id, query.days(), now_millis())
        .await
        .map_err(internal)?;
    Ok(Json(summary))
}
