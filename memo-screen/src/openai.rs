// OpenAI-compatible chat completions oracle
//
// Every call pins the answer shape with a strict `json_schema` response format
// and then deserializes the content into the typed reply. Any mismatch is a
// contract violation; there is no retry.

use crate::oracle::{
    Aggregation, Classification, Description, Judgment, Oracle, OracleReply, TokenUsage,
};
use crate::types::{Finding, Result, ScreenConfig, ScreenError};
use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, error};
use url::Url;

pub struct OpenAiOracle {
    client: Client,
    api_key: String,
    completions_url: Url,
    model: String,
    temperature: f32,
}

impl OpenAiOracle {
    pub fn new(config: &ScreenConfig) -> Result<Self> {
        config.validate()?;
        let api_key = config
            .api_key
            .clone()
            .ok_or_else(|| ScreenError::Config("OPENAI_API_KEY is not set".to_string()))?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;

        Ok(Self {
            client,
            api_key,
            completions_url: config.completions_url()?,
            model: config.model.clone(),
            temperature: config.temperature,
        })
    }

    fn build_request(
        &self,
        system_prompt: &str,
        user_content: String,
        schema: ResponseSchema,
        max_tokens: Option<u32>,
    ) -> ChatRequest {
        ChatRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system_prompt.to_string(),
                },
                ChatMessage {
                    role: "user",
                    content: user_content,
                },
            ],
            temperature: self.temperature,
            max_tokens,
            response_format: ResponseFormat {
                format_type: "json_schema",
                json_schema: schema,
            },
        }
    }

    /// Send one completion request and return the raw message content.
    async fn complete(
        &self,
        system_prompt: &str,
        user_content: String,
        schema: ResponseSchema,
        max_tokens: Option<u32>,
    ) -> Result<(String, TokenUsage)> {
        let request = self.build_request(system_prompt, user_content, schema, max_tokens);
        debug!("Sending {} request to {}", request.response_format.json_schema.name, self.completions_url);

        let response = self
            .client
            .post(self.completions_url.clone())
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!("Chat completion failed with status {}", status);
            return Err(ScreenError::OracleContract(format!(
                "chat completion failed with status {}: {}",
                status, body
            )));
        }

        let chat: ChatResponse = response.json().await?;
        extract_content(chat)
    }
}

#[async_trait]
impl Oracle for OpenAiOracle {
    fn oracle_name(&self) -> String {
        format!("OpenAI ({})", self.model)
    }

    async fn classify(&self, system_prompt: &str, chunk: &str) -> Result<OracleReply<Classification>> {
        let (content, usage) = self
            .complete(system_prompt, chunk.to_string(), chunk_schema(), None)
            .await?;
        let value = parse_content(&content).map_err(|e| {
            ScreenError::OracleContract(format!("chunk check reply '{}' rejected: {}", content, e))
        })?;
        Ok(OracleReply::new(value, usage))
    }

    async fn aggregate(&self, system_prompt: &str, findings: &[Finding]) -> Result<OracleReply<Aggregation>> {
        let (content, usage) = self
            .complete(system_prompt, serde_json::to_string(findings)?, aggregator_schema(), None)
            .await?;
        let value = parse_content(&content).map_err(|e| {
            ScreenError::AggregatorContract(format!("aggregator reply '{}' rejected: {}", content, e))
        })?;
        Ok(OracleReply::new(value, usage))
    }

    async fn describe(
        &self,
        system_prompt: &str,
        text: &str,
        max_output_tokens: u32,
    ) -> Result<OracleReply<Description>> {
        let (content, usage) = self
            .complete(system_prompt, text.to_string(), describer_schema(), Some(max_output_tokens))
            .await?;
        let value = parse_content(&content).map_err(|e| {
            ScreenError::OracleContract(format!("describer reply '{}' rejected: {}", content, e))
        })?;
        Ok(OracleReply::new(value, usage))
    }

    async fn judge(&self, system_prompt: &str, text: &str) -> Result<OracleReply<Judgment>> {
        let (content, usage) = self
            .complete(system_prompt, text.to_string(), judge_schema(), None)
            .await?;
        let value = parse_content(&content).map_err(|e| {
            ScreenError::OracleContract(format!("judge reply '{}' rejected: {}", content, e))
        })?;
        Ok(OracleReply::new(value, usage))
    }
}

fn extract_content(response: ChatResponse) -> Result<(String, TokenUsage)> {
    let usage = response
        .usage
        .map(|usage| TokenUsage {
            prompt_tokens: usage.prompt_tokens,
            completion_tokens: usage.completion_tokens,
        })
        .unwrap_or_default();

    let choice = response
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| ScreenError::OracleContract("completion returned no choices".to_string()))?;

    if let Some(refusal) = choice.message.refusal {
        error!("Model refusal: {}", refusal);
        return Err(ScreenError::OracleRefusal(refusal));
    }

    let content = choice
        .message
        .content
        .ok_or_else(|| ScreenError::OracleContract("completion returned no content".to_string()))?;
    Ok((content, usage))
}

fn parse_content<T: DeserializeOwned>(content: &str) -> std::result::Result<T, serde_json::Error> {
    serde_json::from_str(content.trim())
}

fn strict_object(properties: Value, required: &[&str]) -> Value {
    json!({
        "type": "object",
        "properties": properties,
        "required": required,
        "additionalProperties": false
    })
}

fn chunk_schema() -> ResponseSchema {
    ResponseSchema {
        name: "cop_chunk_check",
        schema: strict_object(
            json!({
                "tag": { "type": "string", "enum": ["SUS", "NAN"] },
                "summary": { "type": "string" },
                "context": { "type": "string" }
            }),
            &["tag", "summary", "context"],
        ),
        strict: true,
    }
}

// The pass-specific labels are checked by the verifier, not the schema.
fn aggregator_schema() -> ResponseSchema {
    ResponseSchema {
        name: "cop_aggregate",
        schema: strict_object(json!({ "result": { "type": "string" } }), &["result"]),
        strict: true,
    }
}

fn describer_schema() -> ResponseSchema {
    ResponseSchema {
        name: "describe",
        schema: strict_object(json!({ "description": { "type": "string" } }), &["description"]),
        strict: true,
    }
}

fn judge_schema() -> ResponseSchema {
    ResponseSchema {
        name: "judge",
        schema: strict_object(
            json!({ "tag": { "type": "string", "enum": ["GOOD", "BAD"] } }),
            &["tag"],
        ),
        strict: true,
    }
}

#[derive(Debug, Clone, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    response_format: ResponseFormat,
}

#[derive(Debug, Clone, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Clone, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    format_type: &'static str,
    json_schema: ResponseSchema,
}

#[derive(Debug, Clone, Serialize)]
struct ResponseSchema {
    name: &'static str,
    schema: Value,
    strict: bool,
}

#[derive(Debug, Clone, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
    usage: Option<ChatUsage>,
}

#[derive(Debug, Clone, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Debug, Clone, Deserialize)]
struct ChatResponseMessage {
    content: Option<String>,
    #[serde(default)]
    refusal: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct ChatUsage {
    #[serde(default)]
    prompt_tokens: u64,
    #[serde(default)]
    completion_tokens: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Tag;

    fn test_config() -> ScreenConfig {
        ScreenConfig {
            api_key: Some("test-key".to_string()),
            ..ScreenConfig::default()
        }
    }

    #[test]
    fn test_oracle_requires_api_key() {
        let result = OpenAiOracle::new(&ScreenConfig::default());
        assert!(matches!(result, Err(ScreenError::Config(_))));
    }

    #[test]
    fn test_oracle_creation() {
        let oracle = OpenAiOracle::new(&test_config()).unwrap();
        assert_eq!(oracle.completions_url.as_str(), "https://api.openai.com/v1/chat/completions");
        assert_eq!(oracle.oracle_name(), "OpenAI (gpt-4o-mini-2024-07-18)");
    }

    #[test]
    fn test_request_shape() {
        let oracle = OpenAiOracle::new(&test_config()).unwrap();
        let request = oracle.build_request("sys", "hello there".to_string(), describer_schema(), Some(150));
        let value = serde_json::to_value(&request).unwrap();

        assert_eq!(value["messages"][0]["role"], "system");
        assert_eq!(value["messages"][1]["content"], "hello there");
        assert_eq!(value["max_tokens"], 150);
        assert_eq!(value["response_format"]["type"], "json_schema");
        assert_eq!(value["response_format"]["json_schema"]["strict"], true);

        let request = oracle.build_request("sys", "chunk".to_string(), chunk_schema(), None);
        let value = serde_json::to_value(&request).unwrap();
        assert!(value.get("max_tokens").is_none());
    }

    #[test]
    fn test_refusal_is_reported() {
        let response: ChatResponse = serde_json::from_value(json!({
            "choices": [{ "message": { "content": null, "refusal": "I can't help with that." } }],
            "usage": { "prompt_tokens": 12, "completion_tokens": 3 }
        }))
        .unwrap();

        assert!(matches!(extract_content(response), Err(ScreenError::OracleRefusal(_))));
    }

    #[test]
    fn test_content_and_usage_extracted() {
        let response: ChatResponse = serde_json::from_value(json!({
            "choices": [{ "message": { "content": "{\"tag\":\"NAN\",\"summary\":\"a pun\",\"context\":\"wordplay\"}" } }],
            "usage": { "prompt_tokens": 40, "completion_tokens": 9 }
        }))
        .unwrap();

        let (content, usage) = extract_content(response).unwrap();
        assert_eq!(usage.prompt_tokens, 40);
        assert_eq!(usage.completion_tokens, 9);

        let classification: Classification = parse_content(&content).unwrap();
        assert_eq!(classification.tag, Tag::Nan);
    }

    #[test]
    fn test_strict_parsing_rejects_bad_shapes() {
        assert!(parse_content::<Classification>("{\"tag\":\"NAN\",\"summary\":\"x\"}").is_err());
        assert!(parse_content::<Classification>("{\"tag\":\"MAYBE\",\"summary\":\"x\",\"context\":\"y\"}").is_err());
        assert!(parse_content::<Aggregation>("{\"verdict\":\"VALID1\"}").is_err());
        assert!(parse_content::<Judgment>("{\"tag\":\"GOOD\",\"why\":\"funny\"}").is_err());
        assert!(parse_content::<Aggregation>("{\"result\":\"VALID1\"}").is_ok());
    }
}
