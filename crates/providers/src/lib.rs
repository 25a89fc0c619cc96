//! Completion endpoint adapters for agentloop.
//!
//! All providers implement the `agentloop_core::Provider` trait and turn
//! the raw endpoint response into a `Completion` at this boundary.
//! [`build_from_config`] picks the adapter and wraps it in [`RetryProvider`].

pub mod anthropic;
mod http;
pub mod openai_compat;
pub mod retry;
pub mod router;

pub use anthropic::AnthropicProvider;
pub use openai_compat::OpenAiCompatProvider;
pub use retry::{RetryPolicy, RetryProvider};
pub use router::{build_from_config, default_model};
