//! OpenAI-compatible chat completions client
//!
//! Used by the staff assistant (planning) and by menu import (vision
//! extraction). Every call asks for a JSON object response and returns it
//! parsed.

use serde_json::{Value, json};
use shared::menu_import::ScrapedItem;

#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("LLM request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("LLM API error (HTTP {status}): {body}")]
    Status { status: u16, body: String },
    #[error("LLM returned no content")]
    EmptyResponse,
    #[error("LLM returned invalid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),
}

#[derive(Clone)]
pub struct LlmClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    pub assistant_model: String,
    pub vision_model: String,
}

const MENU_EXTRACT_PROMPT: &str = "You read restaurant menus. Return a JSON object \
{\"items\": [{\"name\": string, \"price\": number|null, \"description\": string|null, \
\"category\": string|null}]} listing every dish on the menu image, in reading order. \
Prices are plain numbers without currency symbols.";

impl LlmClient {
    pub fn new(
        http: reqwest::Client,
        base_url: &str,
        api_key: &str,
        assistant_model: &str,
        vision_model: &str,
    ) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            assistant_model: assistant_model.to_string(),
            vision_model: vision_model.to_string(),
        }
    }

    /// POST `/chat/completions` and parse `choices[0].message.content` as JSON
    pub async fn chat_json(&self, model: &str, messages: Vec<Value>) -> Result<Value, LlmError> {
        let request_body = json!({
            "model": model,
            "temperature": 0.2,
            "response_format": {"type": "json_object"},
            "messages": messages,
        });

        let resp = self
            .http
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request_body)
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(LlmError::Status { status, body });
        }

        let body: Value = resp.json().await?;
        parse_completion(&body)
    }

    /// Extract menu items from a menu photo or rendered PDF page
    pub async fn extract_menu_items(&self, image_url: &str) -> Result<Vec<ScrapedItem>, LlmError> {
        let messages = vec![
            json!({"role": "system", "content": MENU_EXTRACT_PROMPT}),
            json!({
                "role": "user",
                "content": [
                    {"type": "text", "text": "Extract the menu items."},
                    {"type": "image_url", "image_url": {"url": image_url}}
                ]
            }),
        ];
        let value = self.chat_json(&self.vision_model, messages).await?;
        parse_menu_items(value)
    }
}

fn parse_completion(body: &Value) -> Result<Value, LlmError> {
    let text = body
        .get("choices")
        .and_then(|c| c.as_array())
        .and_then(|arr| arr.first())
        .and_then(|choice| choice.get("message"))
        .and_then(|msg| msg.get("content"))
        .and_then(|t| t.as_str())
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or(LlmError::EmptyResponse)?;

    Ok(serde_json::from_str(strip_code_fence(text))?)
}

/// Models occasionally wrap JSON in a markdown fence even in JSON mode
fn strip_code_fence(text: &str) -> &str {
    let Some(inner) = text.strip_prefix("```") else {
        return text;
    };
    let inner = inner.strip_prefix("json").unwrap_or(inner);
    inner.strip_suffix("```").unwrap_or(inner).trim()
}

fn parse_menu_items(value: Value) -> Result<Vec<ScrapedItem>, LlmError> {
    let items = match value {
        Value::Object(mut map) => map.remove("items").unwrap_or(Value::Array(Vec::new())),
        other => other,
    };
    let items: Vec<ScrapedItem> = serde_json::from_value(items)?;
    Ok(items
        .into_iter()
        .filter(|item| !item.name.trim().is_empty())
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    fn completion(content: &str) -> Value {
        json!({"choices": [{"message": {"role": "assistant", "content": content}}]})
    }

    #[test]
    fn completion_content_is_parsed_as_json() {
        let value = parse_completion(&completion(r#"{"type":"answer","text":"hi"}"#)).unwrap();
        assert_eq!(value["text"], "hi");
    }

    #[test]
    fn fenced_content_is_unwrapped() {
        let value = parse_completion(&completion("```json\n{\"a\": 1}\n```")).unwrap();
        assert_eq!(value["a"], 1);
    }

    #[test]
    fn missing_content_is_an_error() {
        assert!(matches!(
            parse_completion(&json!({"choices": []})),
            Err(LlmError::EmptyResponse)
        ));
        assert!(matches!(
            parse_completion(&completion("   ")),
            Err(LlmError::EmptyResponse)
        ));
        assert!(matches!(
            parse_completion(&completion("not json")),
            Err(LlmError::InvalidJson(_))
        ));
    }

    #[test]
    fn menu_items_skip_blank_names() {
        let items = parse_menu_items(json!({
            "items": [
                {"name": "Margherita", "price": 9.5, "category": "Pizza"},
                {"name": "  ", "price": 1.0},
                {"name": "Tiramisu"}
            ]
        }))
        .unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].price, Some(Decimal::new(95, 1)));
        assert_eq!(items[1].price, None);
    }
}
