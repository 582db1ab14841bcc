//! HTTP client for OpenAI-compatible chat completion endpoints
//!
//! Requests JSON-schema constrained output and reports anything that does not
//! parse or lacks a required field as a schema violation.
//! Rate limited with a token bucket (`requests_per_second`, default 2).

use super::ai_augmented::GenerativeModel;
use crate::config::ModelConfig;
use crate::error::ModelError;
use async_trait::async_trait;
use governor::{Quota, RateLimiter};
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use std::num::NonZeroU32;
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    #[serde(default)]
    content: Option<String>,
}

pub struct HttpModelClient {
    client: Client,
    endpoint: String,
    model: String,
    api_key: String,
    rate_limiter: RateLimiter<
        governor::state::direct::NotKeyed,
        governor::state::InMemoryState,
        governor::clock::DefaultClock,
    >,
}

impl HttpModelClient {
    pub fn new(config: &ModelConfig, api_key: String) -> Result<Self, ModelError> {
        let client = Client::builder()
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .connect_timeout(Duration::from_secs(5))
            .build()
            .map_err(|e| ModelError::Transport(format!("Failed to build HTTP client: {}", e)))?;

        let per_second = NonZeroU32::new(config.requests_per_second).unwrap_or(NonZeroU32::MIN);

        Ok(Self {
            client,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            api_key,
            rate_limiter: RateLimiter::direct(Quota::per_second(per_second)),
        })
    }

    fn request_body(&self, prompt: &str, schema: &serde_json::Value) -> serde_json::Value {
        json!({
            "model": self.model,
            "temperature": 0,
            "messages": [
                {"role": "system", "content": "You produce careful order-of-magnitude estimates as JSON."},
                {"role": "user", "content": prompt}
            ],
            "response_format": {
                "type": "json_schema",
                "json_schema": {"name": "estimate", "schema": schema, "strict": true}
            }
        })
    }
}

#[async_trait]
impl GenerativeModel for HttpModelClient {
    fn name(&self) -> &str {
        &self.model
    }

    async fn generate(&self, prompt: &str, schema: &serde_json::Value) -> Result<serde_json::Value, ModelError> {
        self.rate_limiter.until_ready().await;

        let url = format!("{}/chat/completions", self.endpoint);
        debug!(model = %self.model, "Requesting structured estimate");

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&self.request_body(prompt, schema))
            .send()
            .await
            .map_err(|e| ModelError::Transport(format!("Model request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ModelError::Api(format!("Model endpoint returned {}: {}", status, body)));
        }

        let chat: ChatResponse = response
            .json()
            .await
            .map_err(|e| ModelError::Api(format!("Unexpected response envelope: {}", e)))?;

        let content = chat
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| ModelError::SchemaViolation("empty completion".to_string()))?;

        parse_structured_output(&content, schema)
    }
}

/// Parse completion text as JSON and check the schema's required fields
pub fn parse_structured_output(content: &str, schema: &serde_json::Value) -> Result<serde_json::Value, ModelError> {
    let value: serde_json::Value = serde_json::from_str(content.trim())
        .map_err(|e| ModelError::SchemaViolation(format!("output is not JSON: {}", e)))?;

    let object = value
        .as_object()
        .ok_or_else(|| ModelError::SchemaViolation("output is not a JSON object".to_string()))?;

    let required = schema
        .get("required")
        .and_then(|r| r.as_array())
        .map(|r| r.iter().filter_map(|k| k.as_str()).collect::<Vec<_>>())
        .unwrap_or_default();

    let missing: Vec<&str> = required.into_iter().filter(|k| !object.contains_key(*k)).collect();
    if !missing.is_empty() {
        return Err(ModelError::SchemaViolation(format!("missing field(s): {}", missing.join(", "))));
    }

    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::ai_augmented::guess_schema;

    #[test]
    fn test_parse_accepts_complete_object() {
        let value = parse_structured_output(
            r#" {"value": 3.5, "unit": "kg", "confidence": 0.7} "#,
            &guess_schema(),
        )
        .unwrap();
        assert_eq!(value["unit"], "kg");
    }

    #[test]
    fn test_parse_reports_missing_fields() {
        let err = parse_structured_output(r#"{"value": 3.5}"#, &guess_schema()).unwrap_err();
        match err {
            ModelError::SchemaViolation(msg) => {
                assert!(msg.contains("unit"));
                assert!(msg.contains("confidence"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_parse_rejects_non_json() {
        let err = parse_structured_output("about forty", &guess_schema()).unwrap_err();
        assert!(matches!(err, ModelError::SchemaViolation(_)));
    }

    #[test]
    fn test_client_builds_from_config() {
        let config = ModelConfig {
            requests_per_second: 0,
            ..ModelConfig::default()
        };
        let client = HttpModelClient::new(&config, "test-key".to_string()).unwrap();
        assert_eq!(client.name(), config.model);
        assert!(!client.endpoint.ends_with('/'));
    }
}
