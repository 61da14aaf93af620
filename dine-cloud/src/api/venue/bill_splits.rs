//! Bill split endpoints

use axum::{
    Extension, Json,
    extract::{Path, State},
};
use shared::error::{AppError, ErrorCode};
use shared::models::{BillSplitCreate, BillSplitDetail, SharePayRequest};
use shared::staff::permissions;

use crate::auth::{UserIdentity, require_venue, venue_access};
use crate::db;
use crate::error::internal;
use crate::state::AppState;

use super::ApiResult;

/// POST /api/venues/{venue_id}/bill-splits
pub async fn create_split(
    State(state): State<AppState>,
    Extension(identity): Extension<UserIdentity>,
    Path(venue_id): Path<i64>,
    Json(data): Json<BillSplitCreate>,
) -> ApiResult<BillSplitDetail> {
    let access = require_venue(&state, venue_id, &identity, permissions::PAYMENTS_COLLECT).await?;
    let detail = db::bill_splits::create(&state.pool, venue_id, &access.user_id, &data).await?;
    Ok(Json(detail))
}

/// GET /api/venues/{venue_id}/bill-splits/{split_id}
pub async fn get_split(
    State(state): State<AppState>,
    Extension(identity): Extension<UserIdentity>,
    Path((venue_id, split_id)): Path<(i64, i64)>,
) -> ApiResult<BillSplitDetail> {
    venue_access(&state, venue_id, &identity).await?;
    let detail = db::bill_splits::find(&state.pool, venue_id, split_id)
        .await
        .map_err(internal)?
        .ok_or_else(|| {
            AppError::with_message(ErrorCode::SplitNotFound, "Bill split not found")
                .with_detail("split_id", split_id)
        })?;
    Ok(Json(detail))
}

/// POST /api/venues/{venue_id}/bill-splits/{split_id}/shares/{share_id}/pay
///
/// Paying the last open share settles every order of the split.
pub async fn pay_share(
    State(state): State<AppState>,
    Extension(identity): Extension<UserIdentity>,
    Path((venue_id, split_id, share_id)): Path<(i64, i64, i64)>,
    Json(data): Json<SharePayRequest>,
) -> ApiResult<BillSplitDetail> {
    require_venue(&state, venue_id, &identity, permissions::PAYMENTS_COLLECT).await?;
    let detail =
        db::bill_splits::pay_share(&state.pool, venue_id, split_id, share_id, data.payment_method)
            .await?;
    Ok(Json(detail))
}
