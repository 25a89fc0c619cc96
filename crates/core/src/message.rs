//! Message domain types.
//!
//! These are the value objects that flow through the whole system:
//! user input → memory → completion request → tool calls → tool results → answer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The role of a message sender in a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// The end user
    User,
    /// The model
    Assistant,
    /// A batch of tool results answering the preceding tool-use request
    ToolResult,
    /// System instructions
    System,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::ToolResult => "tool_result",
            Role::System => "system",
        };
        f.write_str(name)
    }
}

/// A tool invocation requested by the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Invocation ID assigned by the endpoint (echoed back with the result)
    pub id: String,

    /// Name of the tool to execute
    pub name: String,

    /// Keyword arguments as a JSON object
    pub arguments: serde_json::Value,
}

/// The outcome of one tool invocation, tagged with the originating call ID.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResultBlock {
    pub call_id: String,
    pub tool_name: String,
    pub output: String,
    #[serde(default)]
    pub is_error: bool,
}

/// What a message carries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MessageContent {
    /// Plain text
    Text { text: String },

    /// An assistant turn requesting tools (optionally with accompanying text)
    ToolUse {
        #[serde(default, skip_serializing_if = "String::is_empty")]
        text: String,
        calls: Vec<ToolCall>,
    },

    /// All results for one tool-use batch, in request order
    ToolResults { results: Vec<ToolResultBlock> },
}

/// A single message in a conversation. Immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub role: Role,
    pub content: MessageContent,
    pub timestamp: DateTime<Utc>,
}

impl Message {
    pub fn new(role: Role, content: MessageContent) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            role,
            content,
            timestamp: Utc::now(),
        }
    }

    /// Create a new user message.
    pub fn user(text: impl Into<String>) -> Self {
        Self::new(Role::User, MessageContent::Text { text: text.into() })
    }

    /// Create a new assistant text message.
    pub fn assistant(text: impl Into<String>) -> Self {
        Self::new(Role::Assistant, MessageContent::Text { text: text.into() })
    }

    /// Create a new system message.
    pub fn system(text: impl Into<String>) -> Self {
        Self::new(Role::System, MessageContent::Text { text: text.into() })
    }

    /// Create an assistant message that requests tools.
    pub fn tool_use(text: impl Into<String>, calls: Vec<ToolCall>) -> Self {
        Self::new(
            Role::Assistant,
            MessageContent::ToolUse {
                text: text.into(),
                calls,
            },
        )
    }

    /// Create the tool-result turn answering a tool-use message.
    pub fn tool_results(results: Vec<ToolResultBlock>) -> Self {
        Self::new(Role::ToolResult, MessageContent::ToolResults { results })
    }

    /// The human-readable text of this message (empty for pure tool traffic).
    pub fn text(&self) -> &str {
        match &self.content {
            MessageContent::Text { text } | MessageContent::ToolUse { text, .. } => text,
            MessageContent::ToolResults { .. } => "",
        }
    }

    /// Tool calls requested by this message, if any.
    pub fn tool_calls(&self) -> &[ToolCall] {
        match &self.content {
            MessageContent::ToolUse { calls, .. } => calls,
            _ => &[],
        }
    }

    pub fn is_tool_use(&self) -> bool {
        matches!(self.content, MessageContent::ToolUse { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_user_message() {
        let msg = Message::user("Hello, agent!");
        assert_eq!(msg.role, Role::User);
        assert_eq!(msg.text(), "Hello, agent!");
        assert!(msg.tool_calls().is_empty());
    }

    #[test]
    fn tool_use_exposes_calls() {
        let msg = Message::tool_use(
            "",
            vec![ToolCall {
                id: "call_1".into(),
                name: "calculator".into(),
                arguments: serde_json::json!({"expression": "1 + 1"}),
            }],
        );
        assert_eq!(msg.role, Role::Assistant);
        assert!(msg.is_tool_use());
        assert_eq!(msg.tool_calls()[0].name, "calculator");
    }

    #[test]
    fn content_is_tagged_in_json() {
        let msg = Message::tool_results(vec![ToolResultBlock {
            call_id: "call_1".into(),
            tool_name: "calculator".into(),
            output: "2".into(),
            is_error: false,
        }]);
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["role"], "tool_result");
        assert_eq!(json["content"]["type"], "tool_results");
        assert_eq!(json["content"]["results"][0]["call_id"], "call_1");
    }
}
