//! Venue endpoints: list, create, detail, settings

use axum::{
    Extension, Json,
    extract::{Path, State},
};
use shared::error::{AppError, ErrorCode};
use shared::models::{Venue, VenueCreate, VenueSummary, VenueUpdate};
use shared::staff::permissions;
use validator::Validate;

use crate::auth::{UserIdentity, require_venue, venue_access};
use crate::db;
use crate::error::internal;
use crate::state::AppState;

use super::ApiResult;

fn venue_not_found(venue_id: i64) -> AppError {
    AppError::with_message(ErrorCode::VenueNotFound, "Venue not found").with_detail("venue_id", venue_id)
}

/// GET /api/venues
pub async fn list_venues(
    State(state): State<AppState>,
    Extension(identity): Extension<UserIdentity>,
) -> ApiResult<Vec<VenueSummary>> {
    let venues = db::venues::list_for_user(&state.pool, &identity.user_id)
        .await
        .map_err(internal)?;
    Ok(Json(venues))
}

/// POST /api/venues
///
/// The caller becomes OWNER of the new venue.
pub async fn create_venue(
    State(state): State<AppState>,
    Extension(identity): Extension<UserIdentity>,
    Json(data): Json<VenueCreate>,
) -> ApiResult<Venue> {
    data.validate()?;
    let venue = db::venues::create(&state.pool, &identity.user_id, identity.email.as_deref(), &data).await?;
    tracing::info!(venue_id = venue.id, user_id = %identity.user_id, "Venue created");
    Ok(Json(venue))
}

/// GET /api/venues/{venue_id}
pub async fn get_venue(
    State(state): State<AppState>,
    Extension(identity): Extension<UserIdentity>,
    Path(venue_id): Path<i64>,
) -> ApiResult<Venue> {
    venue_access(&state, venue_id, &identity).await?;
    let venue = db::venues::find(&state.pool, venue_id)
        .await
        .map_err(internal)?
        .ok_or_else(|| venue_not_found(venue_id))?;
    Ok(Json(venue))
}

/// PATCH /api/venues/{venue_id}
pub async fn update_venue(
    State(state): State<AppState>,
    Extension(identity): Extension<UserIdentity>,
    Path(venue_id): Path<i64>,
    Json(data): Json<VenueUpdate>,
) -> ApiResult<Venue> {
    require_venue(&state, venue_id, &identity, permissions::VENUE_SETTINGS).await?;
    data.validate()?;
    let venue = db::venues::update(&state.pool, venue_id, &data)
        .await
        .map_err(internal)?
        .ok_or_else(|| venue_not_found(venue_id))?;
    Ok(Json(venue))
}
