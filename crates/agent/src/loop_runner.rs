//! The tool-calling loop.
//!
//! One [`Agent`] owns one conversation memory. Each user input runs a
//! bounded protocol against the completion endpoint:
//!
//! 1. append the input as a `user` message
//! 2. send system prompt + history + tool schemas
//! 3. `Final` → append it as the assistant turn and return
//! 4. `ToolUse` → append the request, run every call in order, append all
//!    results as one tool-result turn, go back to 2
//!
//! After `max_turns` round-trips without a final answer the loop stops with
//! [`TURN_LIMIT_MESSAGE`]. Any error restores the memory to its state before
//! step 1, so no unanswered tool-use request is ever left behind.

use std::sync::Arc;
use std::time::Instant;
use agentloop_config::AppConfig;
use agentloop_core::event::{DomainEvent, EventBus};
use agentloop_core::{
    Completion, ConversationMemory, Message, Provider, ProviderRequest, Role, ToolDefinition,
    ToolRegistry,
};
use chrono::Utc;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::agent_type::AgentType;
use crate::error::AgentError;

/// Result text when the turn budget runs out.
pub const TURN_LIMIT_MESSAGE: &str = "maximum turns reached without a final answer";

/// Generation and loop parameters for one agent.
#[derive(Debug, Clone)]
pub struct AgentSettings {
    pub system_prompt: String,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: Option<u32>,
    /// Completion round-trips allowed per input (minimum 1)
    pub max_turns: u32,
    /// Messages kept in memory
    pub memory_size: usize,
}

impl AgentSettings {
    /// Settings for `agent_type`: config defaults, then the `[agents.<type>]`
    /// override, with the built-in role prompt when none is configured.
    pub fn from_config(config: &AppConfig, agent_type: AgentType) -> Self {
        let over = config.agents.get(agent_type.as_str()).cloned().unwrap_or_default();
        Self {
            system_prompt: over
                .system_prompt
                .unwrap_or_else(|| crate::orchestrator::keywords::system_prompt(agent_type).into()),
            model: over
                .model
                .unwrap_or_else(|| agentloop_providers::default_model(config)),
            temperature: over.temperature.unwrap_or(config.default_temperature),
            max_tokens: Some(over.max_tokens.unwrap_or(config.default_max_tokens)),
            max_turns: over.max_turns.unwrap_or(config.agent.max_turns),
            memory_size: config.agent.memory_size,
        }
    }
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self::from_config(&AppConfig::default(), AgentType::General)
    }
}

/// How a loop call ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LoopOutcome {
    Final,
    TurnLimit,
}

/// A successful loop call.
#[derive(Debug, Clone, Serialize)]
pub struct AgentReply {
    pub text: String,
    pub outcome: LoopOutcome,
    /// Completion round-trips used
    pub turns: u32,
    /// Tools called, in call order (repeats included)
    pub tools_invoked: Vec<String>,
}

/// A single agent: one memory, one endpoint binding, a shared tool registry.
pub struct Agent {
    id: String,
    agent_type: AgentType,
    provider: Arc<dyn Provider>,
    tools: Arc<ToolRegistry>,
    settings: AgentSettings,
    memory: ConversationMemory,
    event_bus: Arc<EventBus>,
    last_tools_invoked: Vec<String>,
}

impl Agent {
    pub fn new(
        id: impl Into<String>,
        agent_type: AgentType,
        provider: Arc<dyn Provider>,
        tools: Arc<ToolRegistry>,
        mut settings: AgentSettings,
    ) -> Self {
        settings.max_turns = settings.max_turns.max(1);
        Self {
            id: id.into(),
            agent_type,
            provider,
            tools,
            memory: ConversationMemory::new(settings.memory_size),
            settings,
            event_bus: Arc::new(EventBus::default()),
            last_tools_invoked: Vec::new(),
        }
    }

    /// Publish loop events on a shared bus.
    pub fn with_event_bus(mut self, event_bus: Arc<EventBus>) -> Self {
        self.event_bus = event_bus;
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn agent_type(&self) -> AgentType {
        self.agent_type
    }

    pub fn settings(&self) -> &AgentSettings {
        &self.settings
    }

    pub fn memory(&self) -> &ConversationMemory {
        &self.memory
    }

    /// Tools called by the most recent `run`, in call order. Unlike
    /// [`AgentReply::tools_invoked`] this is kept when the run fails, since
    /// the tools already ran even though their turn was rolled back.
    pub fn last_tools_invoked(&self) -> &[String] {
        &self.last_tools_invoked
    }

    /// Replace the history, e.g. with one loaded from disk.
    pub fn set_memory(&mut self, memory: ConversationMemory) {
        self.memory = memory;
    }

    pub fn clear_history(&mut self) {
        self.memory.clear();
    }

    /// Run the loop and return a plain string.
    ///
    /// Endpoint failures become `"Error processing request: ..."`; a
    /// protocol violation comes back as the raw response shape.
    pub async fn process_with_tools(&mut self, input: &str) -> String {
        match self.run(input).await {
            Ok(reply) => reply.text,
            Err(e) => e.user_message(),
        }
    }

    /// Run the loop for one user input.
    pub async fn run(&mut self, input: &str) -> Result<AgentReply, AgentError> {
        let checkpoint = self.memory.checkpoint();
        self.last_tools_invoked.clear();
        let result = self.run_turns(input).await;
        if let Err(e) = &result {
            warn!(agent = %self.id, error = %e, "Loop failed, rolling back turn");
            self.memory.restore(checkpoint);
            self.event_bus.publish(DomainEvent::ErrorOccurred {
                agent: self.id.clone(),
                error_message: e.to_string(),
                timestamp: Utc::now(),
            });
        }
        result
    }

    async fn run_turns(&mut self, input: &str) -> Result<AgentReply, AgentError> {
        info!(agent = %self.id, history = self.memory.len(), "Processing input");
        self.memory.push(Message::user(input))?;

        let tools = self.tools.all_schemas();

        for turn in 1..=self.settings.max_turns {
            debug!(agent = %self.id, iteration = turn, "Requesting completion");
            let response = self.provider.complete(self.build_request(input, &tools)).await?;

            self.event_bus.publish(DomainEvent::CompletionReceived {
                agent: self.id.clone(),
                model: response.model.clone(),
                iteration: turn,
                tool_calls: match &response.completion {
                    Completion::ToolUse { calls, .. } => calls.len(),
                    Completion::Final { .. } => 0,
                },
                tokens_used: response.usage.as_ref().map(|u| u.total_tokens),
                timestamp: Utc::now(),
            });

            let (text, calls) = match response.completion {
                Completion::Final { text } => {
                    self.memory.push(Message::assistant(text.clone()))?;
                    info!(agent = %self.id, turns = turn, "Final answer");
                    return Ok(AgentReply {
                        text,
                        outcome: LoopOutcome::Final,
                        turns: turn,
                        tools_invoked: self.last_tools_invoked.clone(),
                    });
                }
                Completion::ToolUse { calls, .. } if calls.is_empty() => {
                    return Err(AgentError::ProtocolViolation {
                        raw: "tool-use response with no tool calls".into(),
                    });
                }
                Completion::ToolUse { text, calls } => (text, calls),
            };

            debug!(agent = %self.id, tool_count = calls.len(), "Executing tool calls");
            self.memory.push(Message::tool_use(text, calls.clone()))?;

            let mut results = Vec::with_capacity(calls.len());
            for call in &calls {
                let start = Instant::now();
                let result = self.tools.execute_call(call).await;
                let duration_ms = start.elapsed().as_millis() as u64;

                if result.is_error {
                    warn!(agent = %self.id, tool = %call.name, output = %result.output, "Tool call failed");
                }
                self.event_bus.publish(DomainEvent::ToolExecuted {
                    agent: self.id.clone(),
                    tool_name: call.name.clone(),
                    success: !result.is_error,
                    duration_ms,
                    timestamp: Utc::now(),
                });
                self.last_tools_invoked.push(call.name.clone());
                results.push(result);
            }
            self.memory.push(Message::tool_results(results))?;
        }

        warn!(agent = %self.id, max_turns = self.settings.max_turns, "Turn limit reached");
        self.event_bus.publish(DomainEvent::TurnLimitReached {
            agent: self.id.clone(),
            max_turns: self.settings.max_turns,
            timestamp: Utc::now(),
        });
        self.memory.push(Message::assistant(TURN_LIMIT_MESSAGE))?;

        Ok(AgentReply {
            text: TURN_LIMIT_MESSAGE.into(),
            outcome: LoopOutcome::TurnLimit,
            turns: self.settings.max_turns,
            tools_invoked: self.last_tools_invoked.clone(),
        })
    }

    /// System prompt followed by the history, starting at the oldest user
    /// message. Eviction can leave assistant or tool-result turns at the
    /// front whose user turn is gone; those are left out. When a long tool
    /// exchange has evicted the current input itself, the history restarts
    /// at the first surviving tool-use request, preceded by `input`.
    fn build_request(&self, input: &str, tools: &[ToolDefinition]) -> ProviderRequest {
        let mut history = self.memory.snapshot(None);
        match history.iter().position(|m| m.role == Role::User) {
            Some(first_user) => {
                history.drain(..first_user);
            }
            None => {
                let first_request = history
                    .iter()
                    .position(Message::is_tool_use)
                    .unwrap_or(history.len());
                history.drain(..first_request);
                history.insert(0, Message::user(input));
            }
        }

        let mut messages = Vec::with_capacity(history.len() + 1);
        if !self.settings.system_prompt.is_empty() {
            messages.push(Message::system(&self.settings.system_prompt));
        }
        messages.extend(history);

        ProviderRequest {
            model: self.settings.model.clone(),
            messages,
            temperature: self.settings.temperature,
            max_tokens: self.settings.max_tokens,
            tools: tools.to_vec(),
        }
    }
}
