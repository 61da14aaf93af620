//! Table endpoints: floor overview, CRUD, seating and closing

use axum::{
    Extension, Json,
    extract::{Path, State},
};
use serde_json::{Value, json};
use shared::models::{
    CloseTableRequest, SeatRequest, TableCreate, TableOverview, TableSession, TableUpdate,
    VenueTable,
};
use shared::staff::permissions;
use validator::Validate;

use crate::auth::{UserIdentity, require_venue, venue_access};
use crate::db;
use crate::db::tables::CloseOutcome;
use crate::error::internal;
use crate::state::AppState;

use super::ApiResult;

/// GET /api/venues/{venue_id}/tables
pub async fn list_tables(
    State(state): State<AppState>,
    Extension(identity): Extension<UserIdentity>,
    Path(venue_id): Path<i64>,
) -> ApiResult<Vec<TableOverview>> {
    venue_access(&state, venue_id, &identity).await?;
    let tables = db::tables::list(&state.pool, venue_id).await.map_err(internal)?;
    Ok(Json(tables))
}

/// POST /api/venues/{venue_id}/tables
pub async fn create_table(
    State(state): State<AppState>,
    Extension(identity): Extension<UserIdentity>,
    Path(venue_id): Path<i64>,
    Json(data): Json<TableCreate>,
) -> ApiResult<VenueTable> {
    require_venue(&state, venue_id, &identity, permissions::TABLES_MANAGE).await?;
    data.validate()?;
    let table = db::tables::create(&state.pool, venue_id, &data).await?;
    Ok(Json(table))
}

/// PATCH /api/venues/{venue_id}/tables/{table_id}
pub async fn update_table(
    State(state): State<AppState>,
    Extension(identity): Extension<UserIdentity>,
    Path((venue_id, table_id)): Path<(i64, i64)>,
    Json(data): Json<TableUpdate>,
) -> ApiResult<VenueTable> {
    require_venue(&state, venue_id, &identity, permissions::TABLES_MANAGE).await?;
    data.validate()?;
    let table = db::tables::update(&state.pool, venue_id, table_id, &data).await?;
    Ok(Json(table))
}

/// DELETE /api/venues/{venue_id}/tables/{table_id}
pub async fn delete_table(
    State(state): State<AppState>,
    Extension(identity): Extension<UserIdentity>,
    Path((venue_id, table_id)): Path<(i64, i64)>,
) -> ApiResult<Value> {
    require_venue(&state, venue_id, &identity, permissions::TABLES_MANAGE).await?;
    db::tables::delete(&state.pool, venue_id, table_id).await?;
    Ok(Json(json!({ "deleted": table_id })))
}

/// POST /api/venues/{venue_id}/tables/{table_id}/seat
pub async fn seat_table(
    State(state): State<AppState>,
    Extension(identity): Extension<UserIdentity>,
    Path((venue_id, table_id)): Path<(i64, i64)>,
    Json(data): Json<SeatRequest>,
) -> ApiResult<TableSession> {
    require_venue(&state, venue_id, &identity, permissions::TABLES_MANAGE).await?;
    data.validate()?;
    let session = db::tables::seat(&state.pool, venue_id, table_id, data.party_size).await?;
    Ok(Json(session))
}

/// POST /api/venues/{venue_id}/tables/{table_id}/close
pub async fn close_table(
    State(state): State<AppState>,
    Extension(identity): Extension<UserIdentity>,
    Path((venue_id, table_id)): Path<(i64, i64)>,
    Json(data): Json<CloseTableRequest>,
) -> ApiResult<CloseOutcome> {
    require_venue(&state, venue_id, &identity, permissions::TABLES_MANAGE).await?;
    let outcome = db::tables::close(&state.pool, venue_id, table_id, data.force).await?;
    tracing::info!(venue_id, table_id, force = data.force, "Table closed");
    Ok(Json(outcome))
}
