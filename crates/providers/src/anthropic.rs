//! Anthropic native provider implementation.
//!
//! Uses Anthropic's Messages API directly:
//! - `x-api-key` header authentication (not Bearer)
//! - `anthropic-version` header
//! - System prompt as top-level field
//! - Native tool use with `tool_use` / `tool_result` content blocks
//!
//! `stop_reason` decides the [`Completion`]: `tool_use` → `ToolUse`,
//! `end_turn`/`stop_sequence`/`max_tokens` → `Final`.

use agentloop_core::provider::*;
use agentloop_core::{Message, MessageContent, ProviderError, Role, ToolCall};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, trace};

use crate::http;

const ANTHROPIC_VERSION: &str = "2023-06-01";
const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";
const DEFAULT_MAX_TOKENS: u32 = 4096;

/// Anthropic native Messages API provider.
pub struct AnthropicProvider {
    name: String,
    base_url: String,
    api_key: String,
    client: reqwest::Client,
}

impl AnthropicProvider {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            name: "anthropic".into(),
            base_url: DEFAULT_BASE_URL.into(),
            api_key: api_key.into(),
            client: http::client(Duration::from_secs(300)),
        }
    }

    /// Create with a custom base URL (e.g., for testing or proxies).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Anthropic puts the system prompt in a top-level field, not in messages.
    fn extract_system(messages: &[Message]) -> (Option<String>, Vec<&Message>) {
        let (system, rest): (Vec<&Message>, Vec<&Message>) =
            messages.iter().partition(|m| m.role == Role::System);

        let system = (!system.is_empty()).then(|| {
            system
                .iter()
                .map(|m| m.text())
                .collect::<Vec<_>>()
                .join("\n\n")
        });

        (system, rest)
    }

    fn to_api_messages(messages: &[&Message]) -> Vec<AnthropicMessage> {
        messages
            .iter()
            .filter(|m| m.role != Role::System)
            .map(|msg| match &msg.content {
                MessageContent::Text { text } => AnthropicMessage {
                    role: match msg.role {
                        Role::Assistant => "assistant".into(),
                        _ => "user".into(),
                    },
                    content: AnthropicContent::Text(text.clone()),
                },
                MessageContent::ToolUse { text, calls } => {
                    let mut blocks = Vec::with_capacity(calls.len() + 1);
                    if !text.is_empty() {
                        blocks.push(ContentBlock::Text { text: text.clone() });
                    }
                    blocks.extend(calls.iter().map(|tc| ContentBlock::ToolUse {
                        id: tc.id.clone(),
                        name: tc.name.clone(),
                        input: tc.arguments.clone(),
                    }));
                    AnthropicMessage {
                        role: "assistant".into(),
                        content: AnthropicContent::Blocks(blocks),
                    }
                }
                // The whole batch travels as one user turn.
                MessageContent::ToolResults { results } => AnthropicMessage {
                    role: "user".into(),
                    content: AnthropicContent::Blocks(
                        results
                            .iter()
                            .map(|r| ContentBlock::ToolResult {
                                tool_use_id: r.call_id.clone(),
                                content: r.output.clone(),
                                is_error: r.is_error,
                            })
                            .collect(),
                    ),
                },
            })
            .collect()
    }

    fn to_api_tools(tools: &[ToolDefinition]) -> Vec<AnthropicTool> {
        tools
            .iter()
            .map(|t| AnthropicTool {
                name: t.name.clone(),
                description: t.description.clone(),
                input_schema: t.parameters.clone(),
            })
            .collect()
    }

    fn classify(resp: &AnthropicResponse, raw: &str) -> Result<Completion, ProviderError> {
        let mut text = String::new();
        let mut calls = Vec::new();

        for block in &resp.content {
            match block {
                ResponseContentBlock::Text { text: t } => {
                    if !text.is_empty() {
                        text.push('\n');
                    }
                    text.push_str(t);
                }
                ResponseContentBlock::ToolUse { id, name, input } => calls.push(ToolCall {
                    id: id.clone(),
                    name: name.clone(),
                    arguments: input.clone(),
                }),
                ResponseContentBlock::Other => {}
            }
        }

        match resp.stop_reason.as_deref() {
            Some("tool_use") if !calls.is_empty() => Ok(Completion::ToolUse { text, calls }),
            Some("end_turn") | Some("stop_sequence") | Some("max_tokens") if calls.is_empty() => {
                Ok(Completion::Final { text })
            }
            _ => Err(ProviderError::ProtocolViolation { raw: raw.to_string() }),
        }
    }
}

#[async_trait]
impl Provider for AnthropicProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        let url = format!("{}/v1/messages", self.base_url);
        let (system, messages) = Self::extract_system(&request.messages);

        let mut body = serde_json::json!({
            "model": request.model,
            "messages": Self::to_api_messages(&messages),
            "max_tokens": request.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
            "temperature": request.temperature,
        });

        if let Some(ref sys) = system {
            body["system"] = serde_json::json!(sys);
        }

        if !request.tools.is_empty() {
            body["tools"] = serde_json::json!(Self::to_api_tools(&request.tools));
        }

        debug!(provider = %self.name, model = %request.model, "Sending Anthropic request");

        let response = self
            .client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&body)
            .send()
            .await
            .map_err(http::transport_error)?;
        let response = http::check_status(&self.name, response).await?;

        let raw = response.text().await.map_err(http::transport_error)?;
        trace!(provider = %self.name, body = %raw, "Anthropic response");

        let resp: AnthropicResponse = serde_json::from_str(&raw)
            .map_err(|_| ProviderError::ProtocolViolation { raw: raw.clone() })?;

        Ok(ProviderResponse {
            completion: Self::classify(&resp, &raw)?,
            usage: resp.usage.map(|u| Usage {
                prompt_tokens: u.input_tokens,
                completion_tokens: u.output_tokens,
                total_tokens: u.input_tokens + u.output_tokens,
            }),
            model: resp.model.unwrap_or(request.model),
        })
    }
}

// --- Anthropic API types ---

#[derive(Debug, Serialize)]
struct AnthropicMessage {
    role: String,
    content: AnthropicContent,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum AnthropicContent {
    Text(String),
    Blocks(Vec<ContentBlock>),
}

#[derive(Debug, Serialize)]
#[serde(tag = "type")]
enum ContentBlock {
    #[serde(rename = "text")]
    Text { text: String },
    #[serde(rename = "tool_use")]
    ToolUse {
        id: String,
        name: String,
        input: serde_json::Value,
    },
    #[serde(rename = "tool_result")]
    ToolResult {
        tool_use_id: String,
        content: String,
        #[serde(skip_serializing_if = "std::ops::Not::not")]
        is_error: bool,
    },
}

#[derive(Debug, Serialize)]
struct AnthropicTool {
    name: String,
    description: String,
    input_schema: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    content: Vec<ResponseContentBlock>,
    #[serde(default)]
    usage: Option<AnthropicUsage>,
    #[serde(default)]
    stop_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum ResponseContentBlock {
    #[serde(rename = "text")]
    Text { text: String },
    #[serde(rename = "tool_use")]
    ToolUse {
        id: String,
        name: String,
        input: serde_json::Value,
    },
    /// Thinking and any future block kinds carry nothing the loop uses.
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
struct AnthropicUsage {
    input_tokens: u32,
    output_tokens: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use agentloop_core::ToolResultBlock;

    fn classify(json: serde_json::Value) -> Result<Completion, ProviderError> {
        let raw = json.to_string();
        let resp: AnthropicResponse = serde_json::from_str(&raw).unwrap();
        AnthropicProvider::classify(&resp, &raw)
    }

    #[test]
    fn constructor() {
        let provider = AnthropicProvider::new("sk-ant-test");
        assert_eq!(provider.name(), "anthropic");
        assert_eq!(provider.base_url, DEFAULT_BASE_URL);
    }

    #[test]
    fn constructor_with_base_url() {
        let provider =
            AnthropicProvider::new("sk-ant-test").with_base_url("https://custom.proxy.com/");
        assert_eq!(provider.base_url, "https://custom.proxy.com");
    }

    #[test]
    fn system_extraction() {
        let messages = vec![
            Message::system("You are helpful"),
            Message::system("Be concise"),
            Message::user("Hello"),
            Message::assistant("Hi!"),
        ];

        let (system, non_system) = AnthropicProvider::extract_system(&messages);
        assert_eq!(system.as_deref(), Some("You are helpful\n\nBe concise"));
        assert_eq!(non_system.len(), 2);
        assert_eq!(non_system[0].role, Role::User);
        assert_eq!(non_system[1].role, Role::Assistant);
    }

    #[test]
    fn system_extraction_no_system() {
        let messages = vec![Message::user("Hello")];
        let (system, non_system) = AnthropicProvider::extract_system(&messages);
        assert!(system.is_none());
        assert_eq!(non_system.len(), 1);
    }

    #[test]
    fn tool_results_become_one_user_turn() {
        let messages = vec![
            Message::user("Search rust and tokio"),
            Message::tool_use(
                "Let me search",
                vec![
                    ToolCall {
                        id: "toolu_1".into(),
                        name: "text_stats".into(),
                        arguments: serde_json::json!({"text": "rust"}),
                    },
                    ToolCall {
                        id: "toolu_2".into(),
                        name: "text_stats".into(),
                        arguments: serde_json::json!({"text": "tokio"}),
                    },
                ],
            ),
            Message::tool_results(vec![
                ToolResultBlock {
                    call_id: "toolu_1".into(),
                    tool_name: "text_stats".into(),
                    output: "1 word".into(),
                    is_error: false,
                },
                ToolResultBlock {
                    call_id: "toolu_2".into(),
                    tool_name: "text_stats".into(),
                    output: "Error executing text_stats: boom".into(),
                    is_error: true,
                },
            ]),
        ];
        let refs: Vec<&Message> = messages.iter().collect();
        let api = AnthropicProvider::to_api_messages(&refs);
        assert_eq!(api.len(), 3);

        let json = serde_json::to_value(&api).unwrap();
        assert_eq!(json[1]["role"], "assistant");
        assert_eq!(json[1]["content"][0]["type"], "text");
        assert_eq!(json[1]["content"][1]["type"], "tool_use");
        assert_eq!(json[1]["content"][2]["input"]["text"], "tokio");

        assert_eq!(json[2]["role"], "user");
        assert_eq!(json[2]["content"].as_array().unwrap().len(), 2);
        assert_eq!(json[2]["content"][0]["tool_use_id"], "toolu_1");
        assert!(json[2]["content"][0].get("is_error").is_none());
        assert_eq!(json[2]["content"][1]["is_error"], true);
    }

    #[test]
    fn end_turn_is_final() {
        let completion = classify(serde_json::json!({
            "model": "claude-sonnet-4",
            "content": [{"type": "text", "text": "Hello"}, {"type": "text", "text": "there"}],
            "stop_reason": "end_turn"
        }))
        .unwrap();
        assert_eq!(completion, Completion::Final { text: "Hello\nthere".into() });
    }

    #[test]
    fn tool_use_stop_reason() {
        let completion = classify(serde_json::json!({
            "content": [
                {"type": "thinking", "thinking": "need a tool"},
                {"type": "text", "text": "Calculating"},
                {"type": "tool_use", "id": "toolu_9", "name": "calculator", "input": {"expression": "25 * 4"}}
            ],
            "stop_reason": "tool_use"
        }))
        .unwrap();
        match completion {
            Completion::ToolUse { text, calls } => {
                assert_eq!(text, "Calculating");
                assert_eq!(calls[0].id, "toolu_9");
                assert_eq!(calls[0].arguments["expression"], "25 * 4");
            }
            other => panic!("Expected ToolUse, got {other:?}"),
        }
    }

    #[test]
    fn unexpected_stop_reason_is_protocol_violation() {
        let err = classify(serde_json::json!({
            "content": [],
            "stop_reason": "refusal"
        }))
        .unwrap_err();
        match err {
            ProviderError::ProtocolViolation { raw } => assert!(raw.contains("refusal")),
            other => panic!("Expected ProtocolViolation, got {other:?}"),
        }
    }

    #[test]
    fn tool_use_without_blocks_is_protocol_violation() {
        let err = classify(serde_json::json!({
            "content": [{"type": "text", "text": "hmm"}],
            "stop_reason": "tool_use"
        }))
        .unwrap_err();
        assert!(matches!(err, ProviderError::ProtocolViolation { .. }));
    }

    #[test]
    fn tool_definition_conversion() {
        let tools = vec![ToolDefinition {
            name: "calculator".into(),
            description: "Evaluate arithmetic".into(),
            parameters: serde_json::json!({"type": "object", "properties": {}}),
        }];
        let api_tools = AnthropicProvider::to_api_tools(&tools);
        assert_eq!(api_tools.len(), 1);
        assert_eq!(api_tools[0].name, "calculator");
        assert_eq!(api_tools[0].input_schema["type"], "object");
    }
}
