//! Reservation endpoints

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
};
use shared::models::{Reservation, ReservationCreate, ReservationListQuery, ReservationStatusUpdate};
use shared::staff::permissions;
use shared::util::start_of_day_millis;
use validator::Validate;

use crate::auth::{UserIdentity, require_venue, venue_access};
use crate::db;
use crate::error::internal;
use crate::state::AppState;

use super::{ApiResult, business_date};

/// GET /api/venues/{venue_id}/reservations?date=&status=
pub async fn list_reservations(
    State(state): State<AppState>,
    Extension(identity): Extension<UserIdentity>,
    Path(venue_id): Path<i64>,
    Query(query): Query<ReservationListQuery>,
) -> ApiResult<Vec<Reservation>> {
    venue_access(&state, venue_id, &identity).await?;
    let date = business_date(query.date.as_deref())?;
    let reservations = db::reservations::list_for_day(
        &state.pool,
        venue_id,
        start_of_day_millis(date),
        query.status,
    )
    .await
    .map_err(internal)?;
    Ok(Json(reservations))
}

/// POST /api/venues/{venue_id}/reservations
pub async fn create_reservation(
    State(state): State<AppState>,
    Extension(identity): Extension<UserIdentity>,
    Path(venue_id): Path<i64>,
    Json(data): Json<ReservationCreate>,
) -> ApiResult<Reservation> {
    require_venue(&state, venue_id, &identity, permissions::TABLES_MANAGE).await?;
    data.validate()?;
    let reservation = db::reservations::create(&state.pool, venue_id, &data).await?;
    Ok(Json(reservation))
}

/// PATCH /api/venues/{venue_id}/reservations/{reservation_id}/status
pub async fn update_reservation_status(
    State(state): State<AppState>,
    Extension(identity): Extension<UserIdentity>,
    Path((venue_id, reservation_id)): Path<(i64, i64)>,
    Json(data): Json<ReservationStatusUpdate>,
) -> ApiResult<Reservation> {
    require_venue(&state, venue_id, &identity, permissions::TABLES_MANAGE).await?;
    let reservation =
        db::reservations::change_status(&state.pool, venue_id, reservation_id, data.status).await?;
    Ok(Json(reservation))
}
