//! Kitchen display endpoints: stations, tickets, bump and backfill

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
};
use serde_json::{Value, json};
use shared::error::{AppError, ErrorCode};
use shared::kds::TicketStatus;
use shared::models::{
    BackfillResult, KdsStation, KdsStationCreate, KdsTicket, TicketListQuery, TicketStatusUpdate,
    TicketUpdateResponse,
};
use shared::staff::permissions;
use validator::Validate;

use crate::auth::{UserIdentity, require_venue, venue_access};
use crate::db;
use crate::error::internal;
use crate::state::AppState;

use super::ApiResult;

/// GET /api/venues/{venue_id}/kds/stations
pub async fn list_stations(
    State(state): State<AppState>,
    Extension(identity): Extension<UserIdentity>,
    Path(venue_id): Path<i64>,
) -> ApiResult<Vec<KdsStation>> {
    venue_access(&state, venue_id, &identity).await?;
    let stations = db::kds::list_stations(&state.pool, venue_id)
        .await
        .map_err(internal)?;
    Ok(Json(stations))
}

/// POST /api/venues/{venue_id}/kds/stations
pub async fn create_station(
    State(state): State<AppState>,
    Extension(identity): Extension<UserIdentity>,
    Path(venue_id): Path<i64>,
    Json(data): Json<KdsStationCreate>,
) -> ApiResult<KdsStation> {
    require_venue(&state, venue_id, &identity, permissions::KDS_OPERATE).await?;
    data.validate()?;
    let station = db::kds::create_station(&state.pool, venue_id, &data)
        .await
        .map_err(internal)?;
    Ok(Json(station))
}

/// DELETE /api/venues/{venue_id}/kds/stations/{station_id}
///
/// Deactivates; tickets already routed to the station keep their reference.
pub async fn delete_station(
    State(state): State<AppState>,
    Extension(identity): Extension<UserIdentity>,
    Path((venue_id, station_id)): Path<(i64, i64)>,
) -> ApiResult<Value> {
    require_venue(&state, venue_id, &identity, permissions::KDS_OPERATE).await?;
    let found = db::kds::deactivate_station(&state.pool, venue_id, station_id)
        .await
        .map_err(internal)?;
    if !found {
        return Err(
            AppError::with_message(ErrorCode::StationNotFound, "Station not found")
                .with_detail("station_id", station_id),
        );
    }
    Ok(Json(json!({ "deactivated": station_id })))
}

/// GET /api/venues/{venue_id}/kds/tickets?station_id=&include_bumped=
pub async fn list_tickets(
    State(state): State<AppState>,
    Extension(identity): Extension<UserIdentity>,
    Path(venue_id): Path<i64>,
    Query(query): Query<TicketListQuery>,
) -> ApiResult<Vec<KdsTicket>> {
    require_venue(&state, venue_id, &identity, permissions::KDS_OPERATE).await?;
    let tickets =
        db::kds::list_tickets(&state.pool, venue_id, query.station_id, query.include_bumped)
            .await
            .map_err(internal)?;
    Ok(Json(tickets))
}

/// PATCH /api/venues/{venue_id}/kds/tickets/{ticket_id}
pub async fn update_ticket(
    State(state): State<AppState>,
    Extension(identity): Extension<UserIdentity>,
    Path((venue_id, ticket_id)): Path<(i64, i64)>,
    Json(data): Json<TicketStatusUpdate>,
) -> ApiResult<TicketUpdateResponse> {
    require_venue(&state, venue_id, &identity, permissions::KDS_OPERATE).await?;
    let result = db::kds::update_ticket(&state.pool, venue_id, ticket_id, data.status).await?;
    Ok(Json(result))
}

/// POST /api/venues/{venue_id}/kds/tickets/{ticket_id}/bump
pub async fn bump_ticket(
    State(state): State<AppState>,
    Extension(identity): Extension<UserIdentity>,
    Path((venue_id, ticket_id)): Path<(i64, i64)>,
) -> ApiResult<TicketUpdateResponse> {
    require_venue(&state, venue_id, &identity, permissions::KDS_OPERATE).await?;
    let result =
        db::kds::update_ticket(&state.pool, venue_id, ticket_id, TicketStatus::Bumped).await?;
    Ok(Json(result))
}

/// POST /api/venues/{venue_id}/kds/backfill
pub async fn backfill_tickets(
    State(state): State<AppState>,
    Extension(identity): Extension<UserIdentity>,
    Path(venue_id): Path<i64>,
) -> ApiResult<BackfillResult> {
    require_venue(&state, venue_id, &identity, permissions::KDS_OPERATE).await?;
    let result = db::kds::backfill(&state.pool, venue_id).await.map_err(internal)?;
    tracing::info!(
        venue_id,
        orders_backfilled = result.orders_backfilled,
        tickets_created = result.tickets_created,
        errors = result.errors.len(),
        "KDS backfill finished"
    );
    Ok(Json(result))
}
