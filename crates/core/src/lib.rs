//! # agentloop core
//!
//! Domain types, traits, and error definitions for the agentloop
//! tool-calling runtime. This crate has **no I/O of its own** beyond
//! memory persistence: it defines the model every other crate builds on.
//!
//! ## Layout
//!
//! - [`message`]: role-tagged messages and tool traffic
//! - [`memory`]: bounded conversation history
//! - [`tool`]: tool trait, schema derivation, registry
//! - [`provider`]: completion endpoint trait and the [`Completion`] sum type
//! - [`event`]: broadcast event bus

pub mod error;
pub mod event;
pub mod memory;
pub mod message;
pub mod provider;
pub mod tool;

// Re-export key types at crate root for ergonomics
pub use error::{MemoryError, ProviderError, ToolError};
pub use event::{DomainEvent, EventBus};
pub use memory::{ConversationMemory, MemoryCheckpoint};
pub use message::{Message, MessageContent, Role, ToolCall, ToolResultBlock};
pub use provider::{Completion, Provider, ProviderRequest, ProviderResponse, ToolDefinition, Usage};
pub use tool::{ParamSpec, ParamType, Tool, ToolArgs, ToolDescriptor, ToolRegistry};
