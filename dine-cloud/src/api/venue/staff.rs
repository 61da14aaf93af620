//! Staff endpoints: team list, invites, role changes and removal

use axum::{
    Extension, Json,
    extract::{Path, State},
};
use serde_json::{Value, json};
use shared::models::{MemberInvite, MemberRoleUpdate, VenueMember};
use shared::staff::{Member, check_invite, permissions};
use validator::Validate;

use crate::auth::{UserIdentity, require_venue};
use crate::db;
use crate::error::internal;
use crate::state::AppState;

use super::ApiResult;

/// GET /api/venues/{venue_id}/staff
pub async fn list_members(
    State(state): State<AppState>,
    Extension(identity): Extension<UserIdentity>,
    Path(venue_id): Path<i64>,
) -> ApiResult<Vec<VenueMember>> {
    require_venue(&state, venue_id, &identity, permissions::STAFF_MANAGE).await?;
    let members = db::members::list(&state.pool, venue_id)
        .await
        .map_err(internal)?;
    Ok(Json(members))
}

/// POST /api/venues/{venue_id}/staff
pub async fn invite_member(
    State(state): State<AppState>,
    Extension(identity): Extension<UserIdentity>,
    Path(venue_id): Path<i64>,
    Json(data): Json<MemberInvite>,
) -> ApiResult<VenueMember> {
    let access = require_venue(&state, venue_id, &identity, permissions::STAFF_MANAGE).await?;
    data.validate()?;
    check_invite(access.role, data.role)?;
    let member = db::members::add(&state.pool, venue_id, &data).await?;
    tracing::info!(venue_id, user_id = %member.user_id, role = %member.role, "Member added");
    Ok(Json(member))
}

/// PATCH /api/venues/{venue_id}/staff/{user_id}
pub async fn update_member_role(
    State(state): State<AppState>,
    Extension(identity): Extension<UserIdentity>,
    Path((venue_id, user_id)): Path<(i64, String)>,
    Json(data): Json<MemberRoleUpdate>,
) -> ApiResult<VenueMember> {
    let access = require_venue(&state, venue_id, &identity, permissions::STAFF_MANAGE).await?;
    let actor = Member {
        user_id: &access.user_id,
        role: access.role,
    };
    let member = db::members::change_role(&state.pool, venue_id, actor, &user_id, data.role).await?;
    Ok(Json(member))
}

/// DELETE /api/venues/{venue_id}/staff/{user_id}
pub async fn remove_member(
    State(state): State<AppState>,
    Extension(identity): Extension<UserIdentity>,
    Path((venue_id, user_id)): Path<(i64, String)>,
) -> ApiResult<Value> {
    let access = require_venue(&state, venue_id, &identity, permissions::STAFF_MANAGE).await?;
    let actor = Member {
        user_id: &access.user_id,
        role: access.role,
    };
    db::members::remove(&state.pool, venue_id, actor, &user_id).await?;
    tracing::info!(venue_id, user_id = %user_id, removed_by = %access.user_id, "Member removed");
    Ok(Json(json!({ "removed": user_id })))
}
