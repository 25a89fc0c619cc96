//! Provider selection: builds the configured completion endpoint.
//!
//! `default_provider` picks the adapter; every provider comes back wrapped
//! in a [`RetryProvider`] configured from `[retry]`.

use std::sync::Arc;
use agentloop_config::AppConfig;
use agentloop_core::Provider;
use tracing::{info, warn};
use crate::anthropic::AnthropicProvider;
use crate::openai_compat::OpenAiCompatProvider;
use crate::retry::{RetryPolicy, RetryProvider};

/// Build the default provider from configuration.
pub fn build_from_config(config: &AppConfig) -> Arc<dyn Provider> {
    let name = config.default_provider.as_str();
    let provider_config = config.providers.get(name);

    let api_key = provider_config
        .and_then(|p| p.api_key.clone())
        .or_else(|| config.api_key.clone())
        .unwrap_or_default();
    if api_key.is_empty() && !is_local(name) {
        warn!(provider = name, "No API key configured; requests will be rejected");
    }

    let custom_url = provider_config.and_then(|p| p.api_url.clone());

    let inner: Arc<dyn Provider> = if name == "anthropic" {
        let mut p = AnthropicProvider::new(&api_key);
        if let Some(url) = custom_url {
            p = p.with_base_url(url);
        }
        Arc::new(p)
    } else {
        let base_url = custom_url.unwrap_or_else(|| default_base_url(name));
        Arc::new(OpenAiCompatProvider::new(name, base_url, &api_key))
    };

    info!(provider = name, "Completion provider ready");
    Arc::new(RetryProvider::new(inner, RetryPolicy::from(&config.retry)))
}

/// The model to request: the provider's own default, else the global one.
pub fn default_model(config: &AppConfig) -> String {
    config
        .providers
        .get(&config.default_provider)
        .and_then(|p| p.default_model.clone())
        .unwrap_or_else(|| config.default_model.clone())
}

fn is_local(provider_name: &str) -> bool {
    matches!(provider_name, "ollama" | "vllm" | "llamacpp" | "llama.cpp")
}

/// Get the default base URL for well-known providers.
fn default_base_url(provider_name: &str) -> String {
    match provider_name {
        "openrouter" => "https://openrouter.ai/api/v1".into(),
        "openai" => "https://api.openai.com/v1".into(),
        "ollama" => "http://localhost:11434/v1".into(),
        "deepseek" => "https://api.deepseek.com/v1".into(),
        "groq" => "https://api.groq.com/openai/v1".into(),
        "together" => "https://api.together.xyz/v1".into(),
        "vllm" => "http://localhost:8000/v1".into(),
        "llamacpp" | "llama.cpp" => "http://localhost:8080/v1".into(),
        _ => format!("https://{provider_name}.api.example.com/v1"),
    }
}
