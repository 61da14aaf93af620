//! Assistant endpoints: plan a request, then execute the confirmed steps

use axum::{
    Extension, Json,
    extract::{Path, State},
};
use serde::Deserialize;
use serde_json::json;
use shared::error::{AppError, ErrorCode};
use shared::staff::permissions;
use validator::Validate;

use crate::assistant::{
    AssistantPlan, ExecutionReport, PlannerContext, RawStep, execute_plan, parse_steps,
    plan_assistant_action,
};
use crate::auth::{UserIdentity, require_venue};
use crate::db;
use crate::error::internal;
use crate::state::AppState;

use super::ApiResult;

#[derive(Debug, Deserialize, Validate)]
pub struct PlanRequest {
    #[validate(length(min = 1, max = 2000))]
    pub prompt: String,
}

#[derive(Debug, Deserialize)]
pub struct ExecuteRequest {
    /// Original request, kept for the action log
    pub prompt: Option<String>,
    pub steps: Vec<RawStep>,
}

/// POST /api/venues/{venue_id}/assistant/plan
///
/// Nothing is changed here; the client shows the plan and sends the steps
/// back to `execute` once the user confirms.
pub async fn plan(
    State(state): State<AppState>,
    Extension(identity): Extension<UserIdentity>,
    Path(venue_id): Path<i64>,
    Json(data): Json<PlanRequest>,
) -> ApiResult<AssistantPlan> {
    let access = require_venue(&state, venue_id, &identity, permissions::ASSISTANT_USE).await?;
    data.validate()?;
    let llm = state.llm.as_ref().ok_or_else(|| {
        AppError::with_message(ErrorCode::AssistantUnavailable, "Assistant is not configured")
    })?;

    let venue = db::venues::find(&state.pool, venue_id)
        .await
        .map_err(internal)?
        .ok_or_else(|| AppError::new(ErrorCode::VenueNotFound))?;
    let menu = db::menu::list(&state.pool, venue_id, false)
        .await
        .map_err(internal)?;
    let tables = db::tables::list(&state.pool, venue_id)
        .await
        .map_err(internal)?;

    let context = PlannerContext {
        venue_name: venue.name,
        currency: venue.currency,
        role: access.role.to_string(),
        menu: menu
            .iter()
            .map(|m| {
                json!({
                    "id": m.id,
                    "name": m.name,
                    "price": m.price,
                    "category": m.category,
                    "is_available": m.is_available,
                })
            })
            .collect(),
        tables: tables.into_iter().map(|t| t.label).collect(),
    };

    let plan = plan_assistant_action(llm, &data.prompt, &context).await?;
    Ok(Json(plan))
}

/// POST /api/venues/{venue_id}/assistant/execute
///
/// Steps are validated again; each one is checked against the caller's role
/// when it runs.
pub async fn execute(
    State(state): State<AppState>,
    Extension(identity): Extension<UserIdentity>,
    Path(venue_id): Path<i64>,
    Json(data): Json<ExecuteRequest>,
) -> ApiResult<ExecutionReport> {
    let access = require_venue(&state, venue_id, &identity, permissions::ASSISTANT_USE).await?;
    let steps = parse_steps(data.steps)?;
    let report = execute_plan(&state, &access, data.prompt.as_deref(), &steps).await;
    Ok(Json(report))
}
