//! Customer feedback (staff view)

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
};
use shared::models::Feedback;
use shared::staff::permissions;
use shared::types::PageQuery;

use crate::auth::{UserIdentity, require_venue};
use crate::db;
use crate::error::internal;
use crate::state::AppState;

use super::ApiResult;

/// GET /api/venues/{venue_id}/feedback?page=&per_page=
pub async fn list_feedback(
    State(state): State<AppState>,
    Extension(identity): Extension<UserIdentity>,
    Path(venue_id): Path<i64>,
    Query(query): Query<PageQuery>,
) -> ApiResult<Vec<Feedback>> {
    require_venue(&state, venue_id, &identity, permissions::REPORTS_VIEW).await?;
    let (limit, offset) = query.limit_offset();
    let feedback = db::feedback::list(&state.pool, venue_id, limit, offset)
        .await
        .map_err(internal)?;
    Ok(Json(feedback))
}
