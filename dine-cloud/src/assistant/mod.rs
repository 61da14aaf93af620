//! Staff assistant
//!
//! One chat-completions call turns a natural-language request into either a
//! direct answer or an ordered list of tool calls. Execution is a plain loop
//! over the typed tools; every run is recorded in `assistant_actions`.

pub mod tools;

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use shared::error::{AppError, ErrorCode};

pub use tools::{StepResult, TOOL_CATALOGUE, ToolCall, execute_steps, join_messages};

use crate::auth::VenueAccess;
use crate::db;
use crate::llm::{LlmClient, LlmError};
use crate::state::AppState;

pub const MAX_STEPS: usize = 10;

#[derive(Debug, thiserror::Error)]
pub enum PlanError {
    #[error("plan is not a JSON object with a type")]
    Malformed,
    #[error("unknown plan type: {0}")]
    UnknownType(String),
    #[error("answer has no text")]
    EmptyAnswer,
    #[error("plan must have 1 to 10 steps, got {0}")]
    StepCount(usize),
    #[error("unknown tool: {0}")]
    UnknownTool(String),
    #[error("invalid params for {tool}: {message}")]
    InvalidParams { tool: String, message: String },
}

impl From<PlanError> for AppError {
    fn from(err: PlanError) -> Self {
        AppError::with_message(ErrorCode::InvalidRequest, err.to_string())
    }
}

/// A step as it travels over the wire: tool name plus raw params
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawStep {
    pub tool: String,
    #[serde(default)]
    pub params: Value,
}

/// A validated step with the permission it needs
#[derive(Debug, Clone, Serialize)]
pub struct PlannedStep {
    pub tool: &'static str,
    pub params: Value,
    pub permission: &'static str,
    #[serde(skip)]
    pub call: ToolCall,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AssistantPlan {
    Answer { text: String },
    Tools { summary: String, steps: Vec<PlannedStep> },
}

/// Validate raw steps into typed tool calls
pub fn parse_steps(raw: Vec<RawStep>) -> Result<Vec<PlannedStep>, PlanError> {
    if raw.is_empty() || raw.len() > MAX_STEPS {
        return Err(PlanError::StepCount(raw.len()));
    }
    raw.into_iter()
        .map(|step| {
            let call = ToolCall::parse(&step.tool, step.params.clone())?;
            Ok(PlannedStep {
                tool: call.name(),
                params: step.params,
                permission: call.permission(),
                call,
            })
        })
        .collect()
}

/// Parse the model's JSON object into a plan
pub fn parse_plan(value: Value) -> Result<AssistantPlan, PlanError> {
    let Value::Object(mut obj) = value else {
        return Err(PlanError::Malformed);
    };
    let kind = obj
        .get("type")
        .and_then(Value::as_str)
        .ok_or(PlanError::Malformed)?
        .to_string();

    match kind.as_str() {
        "answer" => {
            let text = obj
                .get("text")
                .and_then(Value::as_str)
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .ok_or(PlanError::EmptyAnswer)?;
            Ok(AssistantPlan::Answer {
                text: text.to_string(),
            })
        }
        "tools" => {
            let summary = obj
                .get("summary")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string();
            let raw: Vec<RawStep> = serde_json::from_value(obj.remove("steps").unwrap_or(Value::Null))
                .map_err(|_| PlanError::Malformed)?;
            Ok(AssistantPlan::Tools {
                summary,
                steps: parse_steps(raw)?,
            })
        }
        other => Err(PlanError::UnknownType(other.to_string())),
    }
}

/// What the planner is told about the venue
#[derive(Debug, Clone, Serialize)]
pub struct PlannerContext {
    pub venue_name: String,
    pub currency: String,
    pub role: String,
    pub menu: Vec<Value>,
    pub tables: Vec<String>,
}

fn system_prompt() -> String {
    let tools = TOOL_CATALOGUE
        .iter()
        .map(|(name, params)| format!("- {name}: params {params}"))
        .collect::<Vec<_>>()
        .join("\n");
    format!(
        "You are the back-office assistant of a restaurant. Reply with one JSON object only.\n\
         To answer a question directly: {{\"type\": \"answer\", \"text\": string}}.\n\
         To act: {{\"type\": \"tools\", \"summary\": string, \"steps\": [{{\"tool\": string, \"params\": object}}]}} \
         with at most {MAX_STEPS} steps, using only these tools:\n{tools}\n\
         Refer to menu items by the ids in the context when possible."
    )
}

#[derive(Debug, thiserror::Error)]
pub enum AssistantError {
    #[error(transparent)]
    Llm(#[from] LlmError),
    #[error(transparent)]
    Plan(#[from] PlanError),
}

impl From<AssistantError> for AppError {
    fn from(err: AssistantError) -> Self {
        match err {
            AssistantError::Llm(e) => {
                tracing::error!(error = %e, "Assistant planning call failed");
                AppError::upstream("Assistant is unavailable")
            }
            AssistantError::Plan(e) => {
                tracing::warn!(error = %e, "Assistant returned an unusable plan");
                AppError::upstream(format!("Assistant returned an invalid plan: {e}"))
            }
        }
    }
}

/// One planning call; unknown tools or bad params are rejected here
pub async fn plan_assistant_action(
    llm: &LlmClient,
    prompt: &str,
    context: &PlannerContext,
) -> Result<AssistantPlan, AssistantError> {
    let messages = vec![
        json!({"role": "system", "content": system_prompt()}),
        json!({"role": "system", "content": format!("Venue context: {}", json!(context))}),
        json!({"role": "user", "content": prompt}),
    ];
    let value = llm.chat_json(&llm.assistant_model, messages).await?;
    Ok(parse_plan(value)?)
}

/// Result of executing a plan
#[derive(Debug, Clone, Serialize)]
pub struct ExecutionReport {
    pub success: bool,
    pub message: String,
    pub steps: Vec<StepResult>,
    pub action_id: Option<i64>,
}

/// Run the steps sequentially and record the run
pub async fn execute_plan(
    state: &AppState,
    access: &VenueAccess,
    prompt: Option<&str>,
    steps: &[PlannedStep],
) -> ExecutionReport {
    let calls: Vec<ToolCall> = steps.iter().map(|s| s.call.clone()).collect();
    let results = execute_steps(state, access, &calls).await;
    let success = results.iter().all(|r| r.ok);
    let message = join_messages(&results);

    let plan = json!(steps);
    let logged = json!(results);
    let action_id = match db::assistant::log_action(
        &state.pool,
        &db::assistant::ActionLog {
            venue_id: access.venue_id,
            user_id: &access.user_id,
            prompt,
            plan: &plan,
            results: &logged,
            success,
        },
    )
    .await
    {
        Ok(id) => Some(id),
        Err(e) => {
            tracing::error!(venue_id = access.venue_id, error = %e, "Failed to record assistant action");
            None
        }
    };

    tracing::info!(
        venue_id = access.venue_id,
        user_id = %access.user_id,
        steps = results.len(),
        success,
        "Assistant plan executed"
    );
    ExecutionReport {
        success,
        message,
        steps: results,
        action_id,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn answer_plans_need_text() {
        let plan = parse_plan(json!({"type": "answer", "text": " We open at 9. "})).unwrap();
        assert!(matches!(plan, AssistantPlan::Answer { text } if text == "We open at 9."));
        assert!(matches!(
            parse_plan(json!({"type": "answer", "text": ""})),
            Err(PlanError::EmptyAnswer)
        ));
    }

    #[test]
    fn tool_plans_are_typed() {
        let plan = parse_plan(json!({
            "type": "tools",
            "summary": "Raise latte price and add two tables",
            "steps": [
                {"tool": "menu.update_prices", "params": {"updates": [{"item_id": 1, "price": 4.5}]}},
                {"tool": "tables.create", "params": {"labels": ["T9", "T10"]}}
            ]
        }))
        .unwrap();
        let AssistantPlan::Tools { summary, steps } = plan else {
            panic!("expected tools");
        };
        assert_eq!(summary, "Raise latte price and add two tables");
        assert_eq!(steps.len(), 2);
        assert_eq!(steps[1].tool, "tables.create");
        assert_eq!(steps[1].permission, "tables:manage");
    }

    #[test]
    fn malformed_plans_are_rejected() {
        assert!(matches!(parse_plan(json!([1, 2])), Err(PlanError::Malformed)));
        assert!(matches!(
            parse_plan(json!({"type": "dance"})),
            Err(PlanError::UnknownType(_))
        ));
        assert!(matches!(
            parse_plan(json!({"type": "tools", "steps": []})),
            Err(PlanError::StepCount(0))
        ));
        assert!(matches!(
            parse_plan(json!({"type": "tools", "steps": [{"tool": "db.drop", "params": {}}]})),
            Err(PlanError::UnknownTool(_))
        ));
    }

    #[test]
    fn serialized_plan_carries_type_tag() {
        let plan = parse_plan(json!({"type": "tools", "steps": [{"tool": "staff.list"}]})).unwrap();
        let value = serde_json::to_value(&plan).unwrap();
        assert_eq!(value["type"], "tools");
        assert_eq!(value["steps"][0]["tool"], "staff.list");
        assert_eq!(value["steps"][0]["permission"], "staff:manage");
    }

    #[test]
    fn system_prompt_lists_every_tool() {
        let prompt = system_prompt();
        for (name, _) in TOOL_CATALOGUE {
            assert!(prompt.contains(name));
        }
    }
}
