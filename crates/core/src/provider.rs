//! Provider trait: the abstraction over completion endpoints.
//!
//! A Provider knows how to send a conversation to a language model and
//! decide, at the boundary, what came back: a final answer or a batch of
//! tool invocations. Everything downstream pattern-matches on [`Completion`].
//!
//! Implementations: OpenAI-compatible, Anthropic, retry decorator.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use crate::error::ProviderError;
use crate::message::{Message, ToolCall};

/// A completion request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderRequest {
    /// The model to use (e.g., "gpt-4o-mini", "claude-sonnet-4")
    pub model: String,

    /// The conversation messages, oldest first
    pub messages: Vec<Message>,

    /// Temperature (0.0 = deterministic, 1.0 = creative)
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Maximum tokens to generate
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,

    /// Tools the model may call
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<ToolDefinition>,
}

fn default_temperature() -> f32 {
    0.7
}

/// A tool definition sent to the model so it knows what it can call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// The tool name
    pub name: String,

    /// Description of what the tool does
    pub description: String,

    /// JSON Schema describing the tool's parameters
    pub parameters: serde_json::Value,
}

/// The two shapes a completion can take.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "finish", rename_all = "snake_case")]
pub enum Completion {
    /// Plain text, no tools requested.
    Final { text: String },

    /// One or more tool invocations, with any text the model emitted alongside.
    ToolUse {
        #[serde(default)]
        text: String,
        calls: Vec<ToolCall>,
    },
}

/// A complete response from a provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderResponse {
    pub completion: Completion,

    /// Token usage statistics
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,

    /// Which model actually responded (may differ from requested)
    pub model: String,
}

/// Token usage information.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// The core Provider trait.
///
/// The agent loop calls `complete()` without knowing which backend
/// is behind it.
#[async_trait]
pub trait Provider: Send + Sync {
    /// A human-readable name for this provider (e.g., "openai", "anthropic").
    fn name(&self) -> &str;

    /// Send a request and get a complete response.
    async fn complete(&self, request: ProviderRequest) -> std::result::Result<ProviderResponse, ProviderError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn completion_is_tagged_by_finish() {
        let final_answer = Completion::Final { text: "100".into() };
        let json = serde_json::to_value(&final_answer).unwrap();
        assert_eq!(json["finish"], "final");

        let tool_use = Completion::ToolUse {
            text: String::new(),
            calls: vec![ToolCall {
                id: "call_1".into(),
                name: "calculator".into(),
                arguments: serde_json::json!({"expression": "25 * 4"}),
            }],
        };
        let json = serde_json::to_value(&tool_use).unwrap();
        assert_eq!(json["finish"], "tool_use");
        assert_eq!(json["calls"][0]["name"], "calculator");
    }

    #[test]
    fn request_temperature_defaults() {
        let req: ProviderRequest =
            serde_json::from_str(r#"{"model": "gpt-4o-mini", "messages": []}"#).unwrap();
        assert!((req.temperature - 0.7).abs() < f32::EPSILON);
        assert!(req.tools.is_empty());
    }
}
