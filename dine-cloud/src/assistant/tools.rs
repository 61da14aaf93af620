//! Assistant tools: typed calls, their permissions and their handlers

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use shared::error::{AppError, ErrorCode};
use shared::models::{MenuItemCreate, MenuItemUpdate};
use shared::order::OrderStatus;
use shared::payment::QrType;
use shared::staff::permissions;
use validator::Validate;

use super::PlanError;
use crate::auth::VenueAccess;
use crate::db;
use crate::error::{ServiceError, internal};
use crate::state::AppState;

/// Menu item reference: by id, or by (case-insensitive) name
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemRef {
    #[serde(default)]
    pub item_id: Option<i64>,
    #[serde(default)]
    pub name: Option<String>,
}

impl ItemRef {
    fn describe(&self) -> String {
        match (&self.name, self.item_id) {
            (Some(name), _) => name.clone(),
            (None, Some(id)) => format!("#{id}"),
            (None, None) => "?".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceChange {
    #[serde(flatten)]
    pub item: ItemRef,
    pub price: Decimal,
}

#[derive(Debug, Deserialize)]
struct UpdatePricesParams {
    updates: Vec<PriceChange>,
}

#[derive(Debug, Deserialize)]
struct AvailabilityParams {
    items: Vec<ItemRef>,
    available: bool,
}

#[derive(Debug, Deserialize)]
struct CreateTablesParams {
    labels: Vec<String>,
    #[serde(default)]
    capacity: Option<i32>,
    #[serde(default)]
    qr_type: Option<QrType>,
}

#[derive(Debug, Default, Deserialize)]
struct RevenueParams {
    #[serde(default)]
    days: Option<i64>,
}

/// One validated tool invocation
#[derive(Debug, Clone, PartialEq)]
pub enum ToolCall {
    UpdatePrices(Vec<PriceChange>),
    ToggleAvailability { items: Vec<ItemRef>, available: bool },
    CreateMenuItem(MenuItemCreate),
    CreateTables {
        labels: Vec<String>,
        capacity: Option<i32>,
        qr_type: Option<QrType>,
    },
    CompleteServedOrders,
    BackfillTickets,
    RevenueSummary { days: Option<i64> },
    ListStaff,
}

/// Tool catalogue shown to the planner: `(name, params description)`
pub const TOOL_CATALOGUE: &[(&str, &str)] = &[
    (
        "menu.update_prices",
        r#"{"updates": [{"item_id"?: number, "name"?: string, "price": number}]}"#,
    ),
    (
        "menu.toggle_availability",
        r#"{"items": [{"item_id"?: number, "name"?: string}], "available": boolean}"#,
    ),
    (
        "menu.create_item",
        r#"{"name": string, "price": number, "description"?: string, "category"?: string}"#,
    ),
    (
        "tables.create",
        r#"{"labels": [string], "capacity"?: number, "qr_type"?: "TABLE_FULL_SERVICE"|"TABLE_COLLECTION"|"COUNTER"}"#,
    ),
    ("orders.complete_served", "{}"),
    ("kds.backfill_tickets", "{}"),
    ("analytics.revenue_summary", r#"{"days"?: number}"#),
    ("staff.list", "{}"),
];

const MAX_BATCH: usize = 50;

fn params<T: serde::de::DeserializeOwned>(tool: &str, value: Value) -> Result<T, PlanError> {
    let value = if value.is_null() { json!({}) } else { value };
    serde_json::from_value(value).map_err(|e| PlanError::InvalidParams {
        tool: tool.to_string(),
        message: e.to_string(),
    })
}

fn invalid(tool: &str, message: impl Into<String>) -> PlanError {
    PlanError::InvalidParams {
        tool: tool.to_string(),
        message: message.into(),
    }
}

fn check_refs(tool: &str, refs: &[&ItemRef]) -> Result<(), PlanError> {
    if refs.is_empty() || refs.len() > MAX_BATCH {
        return Err(invalid(tool, format!("expected 1..={MAX_BATCH} items")));
    }
    if refs.iter().any(|r| r.item_id.is_none() && r.name.is_none()) {
        return Err(invalid(tool, "each item needs item_id or name"));
    }
    Ok(())
}

impl ToolCall {
    /// Parse and validate one `{tool, params}` step
    pub fn parse(tool: &str, value: Value) -> Result<Self, PlanError> {
        let call = match tool {
            "menu.update_prices" => {
                let p: UpdatePricesParams = params(tool, value)?;
                check_refs(tool, &p.updates.iter().map(|u| &u.item).collect::<Vec<_>>())?;
                if p.updates.iter().any(|u| u.price.is_sign_negative()) {
                    return Err(invalid(tool, "prices must not be negative"));
                }
                ToolCall::UpdatePrices(p.updates)
            }
            "menu.toggle_availability" => {
                let p: AvailabilityParams = params(tool, value)?;
                check_refs(tool, &p.items.iter().collect::<Vec<_>>())?;
                ToolCall::ToggleAvailability {
                    items: p.items,
                    available: p.available,
                }
            }
            "menu.create_item" => {
                let p: MenuItemCreate = params(tool, value)?;
                p.validate().map_err(|e| invalid(tool, e.to_string()))?;
                if p.price.is_sign_negative() {
                    return Err(invalid(tool, "price must not be negative"));
                }
                ToolCall::CreateMenuItem(p)
            }
            "tables.create" => {
                let p: CreateTablesParams = params(tool, value)?;
                if p.labels.is_empty() || p.labels.len() > MAX_BATCH {
                    return Err(invalid(tool, format!("expected 1..={MAX_BATCH} labels")));
                }
                if p.labels.iter().any(|l| l.trim().is_empty() || l.len() > 32) {
                    return Err(invalid(tool, "labels must be 1..=32 characters"));
                }
                if p.capacity.is_some_and(|c| !(1..=50).contains(&c)) {
                    return Err(invalid(tool, "capacity must be 1..=50"));
                }
                ToolCall::CreateTables {
                    labels: p.labels,
                    capacity: p.capacity,
                    qr_type: p.qr_type,
                }
            }
            "orders.complete_served" => ToolCall::CompleteServedOrders,
            "kds.backfill_tickets" => ToolCall::BackfillTickets,
            "analytics.revenue_summary" => {
                let p: RevenueParams = params(tool, value)?;
                ToolCall::RevenueSummary { days: p.days }
            }
            "staff.list" => ToolCall::ListStaff,
            other => return Err(PlanError::UnknownTool(other.to_string())),
        };
        Ok(call)
    }

    pub fn name(&self) -> &'static str {
        match self {
            ToolCall::UpdatePrices(_) => "menu.update_prices",
            ToolCall::ToggleAvailability { .. } => "menu.toggle_availability",
            ToolCall::CreateMenuItem(_) => "menu.create_item",
            ToolCall::CreateTables { .. } => "tables.create",
            ToolCall::CompleteServedOrders => "orders.complete_served",
            ToolCall::BackfillTickets => "kds.backfill_tickets",
            ToolCall::RevenueSummary { .. } => "analytics.revenue_summary",
            ToolCall::ListStaff => "staff.list",
        }
    }

    /// Permission the caller needs to run this tool
    pub fn permission(&self) -> &'static str {
        match self {
            ToolCall::UpdatePrices(_)
            | ToolCall::ToggleAvailability { .. }
            | ToolCall::CreateMenuItem(_) => permissions::MENU_MANAGE,
            ToolCall::CreateTables { .. } => permissions::TABLES_MANAGE,
            ToolCall::CompleteServedOrders => permissions::ORDERS_MANAGE,
            ToolCall::BackfillTickets => permissions::KDS_OPERATE,
            ToolCall::RevenueSummary { .. } => permissions::REPORTS_VIEW,
            ToolCall::ListStaff => permissions::STAFF_MANAGE,
        }
    }
}

/// Outcome of one executed step
#[derive(Debug, Clone, Serialize)]
pub struct StepResult {
    pub tool: &'static str,
    pub ok: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

type ToolOutput = Result<(String, Option<Value>), AppError>;

fn service(e: ServiceError) -> AppError {
    e.into()
}

async fn resolve_item(state: &AppState, venue_id: i64, item: &ItemRef) -> Result<Option<i64>, AppError> {
    if let Some(id) = item.item_id {
        return Ok(Some(id));
    }
    let Some(name) = item.name.as_deref() else {
        return Ok(None);
    };
    let found = db::menu::find_by_name(&state.pool, venue_id, name)
        .await
        .map_err(internal)?;
    Ok(found.map(|m| m.id))
}

async fn update_prices(state: &AppState, venue_id: i64, updates: &[PriceChange]) -> ToolOutput {
    let mut updated = Vec::new();
    let mut missing = Vec::new();
    for change in updates {
        let item = match resolve_item(state, venue_id, &change.item).await? {
            Some(id) => {
                let data = MenuItemUpdate {
                    price: Some(change.price),
                    ..Default::default()
                };
                db::menu::update(&state.pool, venue_id, id, &data)
                    .await
                    .map_err(internal)?
            }
            None => None,
        };
        match item {
            Some(item) => updated.push(json!({"id": item.id, "name": item.name, "price": item.price})),
            None => missing.push(change.item.describe()),
        }
    }

    if updated.is_empty() {
        return Err(AppError::with_message(
            ErrorCode::MenuItemNotFound,
            format!("No matching menu items: {}", missing.join(", ")),
        ));
    }
    let mut message = format!("Updated {} price(s)", updated.len());
    if !missing.is_empty() {
        message.push_str(&format!(" (not found: {})", missing.join(", ")));
    }
    Ok((message, Some(Value::Array(updated))))
}

async fn toggle_availability(
    state: &AppState,
    venue_id: i64,
    items: &[ItemRef],
    available: bool,
) -> ToolOutput {
    let mut ids = Vec::new();
    let mut missing = Vec::new();
    for item in items {
        match resolve_item(state, venue_id, item).await? {
            Some(id) => ids.push(id),
            None => missing.push(item.describe()),
        }
    }
    let changed = db::menu::set_availability(&state.pool, venue_id, &ids, available)
        .await
        .map_err(internal)?;
    if changed == 0 {
        return Err(AppError::with_message(
            ErrorCode::MenuItemNotFound,
            "No matching menu items",
        ));
    }
    let state_word = if available { "available" } else { "unavailable" };
    let mut message = format!("Marked {changed} item(s) {state_word}");
    if !missing.is_empty() {
        message.push_str(&format!(" (not found: {})", missing.join(", ")));
    }
    Ok((message, None))
}

async fn create_tables(
    state: &AppState,
    venue_id: i64,
    labels: &[String],
    capacity: Option<i32>,
    qr_type: Option<QrType>,
) -> ToolOutput {
    let mut created = Vec::new();
    let mut skipped = Vec::new();
    for label in labels {
        match db::tables::insert(&state.pool, venue_id, label.trim(), capacity, qr_type).await {
            Ok(table) => created.push(table.label),
            Err(ServiceError::App(e)) if e.code == ErrorCode::TableLabelExists => {
                skipped.push(label.trim().to_string())
            }
            Err(e) => return Err(service(e)),
        }
    }
    if created.is_empty() {
        return Err(AppError::with_message(
            ErrorCode::TableLabelExists,
            format!("All tables already exist: {}", skipped.join(", ")),
        ));
    }
    let mut message = format!("Created {} table(s): {}", created.len(), created.join(", "));
    if !skipped.is_empty() {
        message.push_str(&format!(" (already existed: {})", skipped.join(", ")));
    }
    Ok((message, None))
}

async fn complete_served(state: &AppState, venue_id: i64) -> ToolOutput {
    let ids = db::orders::served_and_paid(&state.pool, venue_id)
        .await
        .map_err(internal)?;
    let mut completed = 0;
    for order_id in &ids {
        match db::orders::change_status(&state.pool, venue_id, *order_id, OrderStatus::Completed).await {
            Ok(_) => completed += 1,
            // a concurrent change already moved it on
            Err(ServiceError::App(e)) => {
                tracing::debug!(order_id, error = %e, "Skipped order while completing served orders")
            }
            Err(e) => return Err(service(e)),
        }
    }
    Ok((format!("Completed {completed} served order(s)"), Some(json!({"order_ids": ids}))))
}

impl ToolCall {
    async fn run(&self, state: &AppState, venue_id: i64) -> ToolOutput {
        match self {
            ToolCall::UpdatePrices(updates) => update_prices(state, venue_id, updates).await,
            ToolCall::ToggleAvailability { items, available } => {
                toggle_availability(state, venue_id, items, *available).await
            }
            ToolCall::CreateMenuItem(data) => {
                let item = db::menu::create(&state.pool, venue_id, data)
                    .await
                    .map_err(internal)?;
                Ok((
                    format!("Added {} at {}", item.name, item.price),
                    Some(json!({"id": item.id})),
                ))
            }
            ToolCall::CreateTables {
                labels,
                capacity,
                qr_type,
            } => create_tables(state, venue_id, labels, *capacity, *qr_type).await,
            ToolCall::CompleteServedOrders => complete_served(state, venue_id).await,
            ToolCall::BackfillTickets => {
                let result = db::kds::backfill(&state.pool, venue_id)
                    .await
                    .map_err(internal)?;
                let message = format!(
                    "Backfilled {} ticket(s) for {} order(s), {} error(s)",
                    result.tickets_created,
                    result.orders_backfilled,
                    result.errors.len()
                );
                Ok((message, serde_json::to_value(&result).ok()))
            }
            ToolCall::RevenueSummary { days } => {
                let days = days.unwrap_or(7).clamp(1, 90);
                let summary = db::analytics::revenue_summary(
                    &state.pool,
                    venue_id,
                    days,
                    shared::util::now_millis(),
                )
                .await
                .map_err(internal)?;
                let message = format!(
                    "Revenue over {days} day(s): {} from {} paid order(s)",
                    summary.revenue, summary.paid_order_count
                );
                Ok((message, serde_json::to_value(&summary).ok()))
            }
            ToolCall::ListStaff => {
                let members = db::members::list(&state.pool, venue_id)
                    .await
                    .map_err(internal)?;
                Ok((
                    format!("{} team member(s)", members.len()),
                    serde_json::to_value(&members).ok(),
                ))
            }
        }
    }
}

/// Run steps in order. A failing step is recorded and the rest still run.
pub async fn execute_steps(
    state: &AppState,
    access: &VenueAccess,
    steps: &[ToolCall],
) -> Vec<StepResult> {
    let mut results = Vec::with_capacity(steps.len());
    for step in steps {
        let result = if !access.can(step.permission()) {
            StepResult {
                tool: step.name(),
                ok: false,
                message: format!("{}: requires {}", step.name(), step.permission()),
                data: None,
            }
        } else {
            match step.run(state, access.venue_id).await {
                Ok((message, data)) => StepResult {
                    tool: step.name(),
                    ok: true,
                    message,
                    data,
                },
                Err(e) => {
                    tracing::warn!(venue_id = access.venue_id, tool = step.name(), error = %e, "Assistant step failed");
                    StepResult {
                        tool: step.name(),
                        ok: false,
                        message: format!("{} failed: {}", step.name(), e.message),
                        data: None,
                    }
                }
            }
        };
        results.push(result);
    }
    results
}

/// One user-facing message from all step messages
pub fn join_messages(results: &[StepResult]) -> String {
    results
        .iter()
        .map(|r| r.message.as_str())
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_price_updates_by_name_or_id() {
        let call = ToolCall::parse(
            "menu.update_prices",
            json!({"updates": [{"name": "Latte", "price": 4.2}, {"item_id": 7, "price": 3}]}),
        )
        .unwrap();
        let ToolCall::UpdatePrices(updates) = &call else {
            panic!("wrong tool");
        };
        assert_eq!(updates[0].item.name.as_deref(), Some("Latte"));
        assert_eq!(updates[1].item.item_id, Some(7));
        assert_eq!(call.permission(), permissions::MENU_MANAGE);
    }

    #[test]
    fn rejects_unknown_tools_and_bad_params() {
        assert!(matches!(
            ToolCall::parse("orders.delete_all", json!({})),
            Err(PlanError::UnknownTool(_))
        ));
        assert!(matches!(
            ToolCall::parse("menu.update_prices", json!({"updates": [{"price": 1}]})),
            Err(PlanError::InvalidParams { .. })
        ));
        assert!(matches!(
            ToolCall::parse("menu.update_prices", json!({"updates": [{"name": "x", "price": -1}]})),
            Err(PlanError::InvalidParams { .. })
        ));
        assert!(matches!(
            ToolCall::parse("tables.create", json!({"labels": []})),
            Err(PlanError::InvalidParams { .. })
        ));
        assert!(matches!(
            ToolCall::parse("menu.create_item", json!({"name": "", "price": 2})),
            Err(PlanError::InvalidParams { .. })
        ));
    }

    #[test]
    fn parameterless_tools_accept_null_or_empty() {
        assert_eq!(
            ToolCall::parse("staff.list", Value::Null).unwrap(),
            ToolCall::ListStaff
        );
        assert_eq!(
            ToolCall::parse("analytics.revenue_summary", Value::Null).unwrap(),
            ToolCall::RevenueSummary { days: None }
        );
    }

    #[test]
    fn every_catalogued_tool_parses() {
        let samples = [
            json!({"updates": [{"name": "a", "price": 1}]}),
            json!({"items": [{"name": "a"}], "available": false}),
            json!({"name": "Soup", "price": 5}),
            json!({"labels": ["T1"]}),
            json!({}),
            json!({}),
            json!({"days": 30}),
            json!({}),
        ];
        for ((name, _), params) in TOOL_CATALOGUE.iter().zip(samples) {
            let call = ToolCall::parse(name, params).unwrap();
            assert_eq!(call.name(), *name);
        }
    }

    #[test]
    fn messages_are_joined_in_order() {
        let results = vec![
            StepResult {
                tool: "staff.list",
                ok: true,
                message: "3 team member(s)".into(),
                data: None,
            },
            StepResult {
                tool: "tables.create",
                ok: false,
                message: "tables.create: requires tables:manage".into(),
                data: None,
            },
        ];
        assert_eq!(
            join_messages(&results),
            "3 team member(s)\ntables.create: requires tables:manage"
        );
    }
}
