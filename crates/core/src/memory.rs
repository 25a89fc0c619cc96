//! Conversation memory: a bounded, ordered message history.
//!
//! The memory is the context sent to the completion endpoint on every
//! turn. It is a plain FIFO: when the configured maximum is exceeded the
//! oldest messages are evicted. Appends are checked so the history can
//! never hold two assistant turns in a row or a tool-result turn that
//! answers nothing.

use std::collections::VecDeque;
use std::path::Path;
use serde::{Deserialize, Serialize};
use tracing::debug;
use crate::error::MemoryError;
use crate::message::{Message, MessageContent, Role};

/// Bounded conversation history owned by one agent.
#[derive(Debug, Clone, PartialEq)]
pub struct ConversationMemory {
    messages: VecDeque<Message>,
    max_messages: usize,
}

/// A saved copy of the history, used to roll back a failed turn.
#[derive(Debug, Clone)]
pub struct MemoryCheckpoint {
    messages: VecDeque<Message>,
}

/// On-disk form.
#[derive(Serialize, Deserialize)]
struct PersistedMemory {
    max_messages: usize,
    messages: Vec<Message>,
}

impl ConversationMemory {
    /// Create an empty memory holding at most `max_messages` (minimum 1).
    pub fn new(max_messages: usize) -> Self {
        let max_messages = max_messages.max(1);
        Self {
            messages: VecDeque::with_capacity(max_messages.min(256)),
            max_messages,
        }
    }

    /// Append a message with the given role and content.
    pub fn add(&mut self, role: Role, content: MessageContent) -> Result<(), MemoryError> {
        self.push(Message::new(role, content))
    }

    /// Append an already-built message.
    pub fn push(&mut self, message: Message) -> Result<(), MemoryError> {
        self.check_sequence(&message)?;
        self.messages.push_back(message);
        while self.messages.len() > self.max_messages {
            if let Some(evicted) = self.messages.pop_front() {
                debug!(role = %evicted.role, "Evicted oldest message from memory");
            }
        }
        Ok(())
    }

    fn check_sequence(&self, next: &Message) -> Result<(), MemoryError> {
        let violation = |previous: &str| MemoryError::RoleSequence {
            previous: previous.to_string(),
            attempted: describe(next),
        };

        let last = self.messages.back();
        match (last, next.role) {
            // A tool-use request must be answered before anything else.
            (Some(prev), role) if prev.is_tool_use() && role != Role::ToolResult => {
                Err(violation(&describe(prev)))
            }
            (Some(prev), Role::Assistant) if prev.role == Role::Assistant => {
                Err(violation(&describe(prev)))
            }
            (prev, Role::ToolResult) if !prev.is_some_and(Message::is_tool_use) => {
                Err(violation(&prev.map(describe).unwrap_or_else(|| "nothing".into())))
            }
            _ => Ok(()),
        }
    }

    /// The ordered history, optionally only the most recent `limit` messages.
    ///
    /// Always a copy: mutating the result does not touch the memory.
    pub fn snapshot(&self, limit: Option<usize>) -> Vec<Message> {
        let skip = limit.map_or(0, |l| self.messages.len().saturating_sub(l));
        self.messages.iter().skip(skip).cloned().collect()
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.back()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn max_messages(&self) -> usize {
        self.max_messages
    }

    /// Empty the history.
    pub fn clear(&mut self) {
        self.messages.clear();
    }

    pub fn checkpoint(&self) -> MemoryCheckpoint {
        MemoryCheckpoint {
            messages: self.messages.clone(),
        }
    }

    pub fn restore(&mut self, checkpoint: MemoryCheckpoint) {
        self.messages = checkpoint.messages;
    }

    /// Serialize the history to JSON.
    pub fn to_json(&self) -> Result<String, MemoryError> {
        let persisted = PersistedMemory {
            max_messages: self.max_messages,
            messages: self.messages.iter().cloned().collect(),
        };
        serde_json::to_string_pretty(&persisted)
            .map_err(|e| MemoryError::Persistence(format!("Failed to serialize memory: {e}")))
    }

    /// Rebuild a memory from [`to_json`](Self::to_json) output.
    ///
    /// The stored sequence is trusted as-is; when it holds more than
    /// `max_messages`, the newest ones are kept.
    pub fn from_json(json: &str) -> Result<Self, MemoryError> {
        let persisted: PersistedMemory = serde_json::from_str(json)
            .map_err(|e| MemoryError::Persistence(format!("Failed to parse memory: {e}")))?;
        let mut memory = Self::new(persisted.max_messages);
        memory.messages = persisted.messages.into();
        while memory.messages.len() > memory.max_messages {
            memory.messages.pop_front();
        }
        Ok(memory)
    }

    /// Write the history to `path` as JSON, creating parent directories.
    pub fn save(&self, path: &Path) -> Result<(), MemoryError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                MemoryError::Persistence(format!("Failed to create memory directory: {e}"))
            })?;
        }
        std::fs::write(path, self.to_json()?)
            .map_err(|e| MemoryError::Persistence(format!("Failed to write memory file: {e}")))
    }

    pub fn load(path: &Path) -> Result<Self, MemoryError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| MemoryError::Persistence(format!("Failed to read memory file: {e}")))?;
        Self::from_json(&content)
    }
}

fn describe(message: &Message) -> String {
    if message.is_tool_use() {
        "assistant tool-use".into()
    } else {
        message.role.to_string()
    }
}
