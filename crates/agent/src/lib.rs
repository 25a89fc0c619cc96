//! The agent loop and the multi-agent orchestrator.
//!
//! An [`Agent`] drives one conversation through a **request → tool calls →
//! results → request** cycle:
//!
//! 1. **Receive** a user message and append it to memory
//! 2. **Send** system prompt + history + tool schemas to the provider
//! 3. **If tool calls**: execute them in order, append the results, go to 2
//! 4. **If a final answer**: append it and return
//!
//! The loop stops after `max_turns` round-trips. The [`Orchestrator`] sits
//! in front of a set of agents and picks one per query by keyword score.

pub mod agent_type;
pub mod error;
pub mod loop_runner;
pub mod orchestrator;

#[cfg(test)]
mod test_helpers;

pub use agent_type::AgentType;
pub use error::AgentError;
pub use loop_runner::{Agent, AgentReply, AgentSettings, LoopOutcome, TURN_LIMIT_MESSAGE};
pub use orchestrator::{KeywordRouter, Orchestrator, OrchestratorResponse, RoutingDecision};
