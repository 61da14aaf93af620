//! Menu endpoints: CRUD and vision import

use axum::{
    Extension, Json,
    extract::{Path, State},
};
use rust_decimal::Decimal;
use serde_json::{Value, json};
use shared::error::{AppError, ErrorCode};
use shared::menu_import::{DEFAULT_MATCH_THRESHOLD, match_items};
use shared::models::{
    MenuExtractRequest, MenuItem, MenuItemCreate, MenuItemUpdate, MenuMatchRequest,
    MenuMatchResponse,
};
use shared::staff::permissions;
use validator::Validate;

use crate::auth::{UserIdentity, require_venue, venue_access};
use crate::db;
use crate::error::internal;
use crate::state::AppState;

use super::ApiResult;

fn check_price(price: Decimal) -> Result<(), AppError> {
    if price.is_sign_negative() {
        return Err(AppError::validation("Price must not be negative").with_detail("price", price.to_string()));
    }
    Ok(())
}

fn check_threshold(threshold: f64) -> Result<(), AppError> {
    if threshold > 0.0 && threshold <= 1.0 {
        Ok(())
    } else {
        Err(AppError::validation("threshold must be above 0 and at most 1"))
    }
}

fn item_not_found(item_id: i64) -> AppError {
    AppError::with_message(ErrorCode::MenuItemNotFound, "Menu item not found")
        .with_detail("menu_item_id", item_id)
}

/// GET /api/venues/{venue_id}/menu
///
/// Staff see every item, including unavailable ones.
pub async fn list_menu(
    State(state): State<AppState>,
    Extension(identity): Extension<UserIdentity>,
    Path(venue_id): Path<i64>,
) -> ApiResult<Vec<MenuItem>> {
    venue_access(&state, venue_id, &identity).await?;
    let items = db::menu::list(&state.pool, venue_id, false)
        .await
        .map_err(internal)?;
    Ok(Json(items))
}

/// POST /api/venues/{venue_id}/menu
pub async fn create_menu_item(
    State(state): State<AppState>,
    Extension(identity): Extension<UserIdentity>,
    Path(venue_id): Path<i64>,
    Json(data): Json<MenuItemCreate>,
) -> ApiResult<MenuItem> {
    require_venue(&state, venue_id, &identity, permissions::MENU_MANAGE).await?;
    data.validate()?;
    check_price(data.price)?;
    let item = db::menu::create(&state.pool, venue_id, &data)
        .await
        .map_err(internal)?;
    Ok(Json(item))
}

/// PATCH /api/venues/{venue_id}/menu/{item_id}
pub async fn update_menu_item(
    State(state): State<AppState>,
    Extension(identity): Extension<UserIdentity>,
    Path((venue_id, item_id)): Path<(i64, i64)>,
    Json(data): Json<MenuItemUpdate>,
) -> ApiResult<MenuItem> {
    require_venue(&state, venue_id, &identity, permissions::MENU_MANAGE).await?;
    data.validate()?;
    if let Some(price) = data.price {
        check_price(price)?;
    }
    let item = db::menu::update(&state.pool, venue_id, item_id, &data)
        .await
        .map_err(internal)?
        .ok_or_else(|| item_not_found(item_id))?;
    Ok(Json(item))
}

/// DELETE /api/venues/{venue_id}/menu/{item_id}
pub async fn delete_menu_item(
    State(state): State<AppState>,
    Extension(identity): Extension<UserIdentity>,
    Path((venue_id, item_id)): Path<(i64, i64)>,
) -> ApiResult<Value> {
    require_venue(&state, venue_id, &identity, permissions::MENU_MANAGE).await?;
    let deleted = db::menu::delete(&state.pool, venue_id, item_id)
        .await
        .map_err(internal)?;
    if !deleted {
        return Err(item_not_found(item_id));
    }
    Ok(Json(json!({ "deleted": item_id })))
}

/// POST /api/venues/{venue_id}/menu/import/extract
///
/// Reads item names and prices off one menu page image.
pub async fn import_extract(
    State(state): State<AppState>,
    Extension(identity): Extension<UserIdentity>,
    Path(venue_id): Path<i64>,
    Json(data): Json<MenuExtractRequest>,
) -> ApiResult<Value> {
    require_venue(&state, venue_id, &identity, permissions::MENU_MANAGE).await?;
    data.validate()?;
    let llm = state.llm.as_ref().ok_or_else(|| {
        AppError::with_message(ErrorCode::AssistantUnavailable, "Menu import is not configured")
    })?;

    let items = llm.extract_menu_items(&data.image_url).await.map_err(|e| {
        tracing::error!(venue_id, error = %e, "Menu extraction failed");
        AppError::with_message(ErrorCode::MenuImportFailed, "Could not read the menu image")
    })?;
    tracing::info!(venue_id, items = items.len(), "Menu items extracted");
    Ok(Json(json!({ "items": items })))
}

/// POST /api/venues/{venue_id}/menu/import/match
pub async fn import_match(
    State(state): State<AppState>,
    Extension(identity): Extension<UserIdentity>,
    Path(venue_id): Path<i64>,
    Json(data): Json<MenuMatchRequest>,
) -> ApiResult<MenuMatchResponse> {
    require_venue(&state, venue_id, &identity, permissions::MENU_MANAGE).await?;
    let threshold = data.threshold.unwrap_or(DEFAULT_MATCH_THRESHOLD);
    check_threshold(threshold)?;

    let matched = match_items(&data.items, &data.blocks, threshold);
    let matched_count = matched.iter().filter(|m| m.position.is_some()).count();
    let saved_count = if data.save {
        db::menu::save_imported(&state.pool, venue_id, &matched)
            .await
            .map_err(internal)?
    } else {
        0
    };

    Ok(Json(MenuMatchResponse {
        matched,
        matched_count,
        saved_count,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn negative_prices_are_rejected() {
        assert!(check_price(Decimal::ZERO).is_ok());
        assert!(check_price(Decimal::new(450, 2)).is_ok());
        let err = check_price(Decimal::new(-1, 2)).unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationFailed);
    }

    #[test]
    fn match_threshold_range() {
        assert!(check_threshold(1.0).is_ok());
        assert!(check_threshold(DEFAULT_MATCH_THRESHOLD).is_ok());
        assert!(check_threshold(0.0).is_err());
        assert!(check_threshold(1.5).is_err());
        assert!(check_threshold(f64::NAN).is_err());
    }
}
