pub mod ask;
pub mod chat;
pub mod init;
pub mod route;
pub mod tools;

use std::sync::Arc;
use agentloop_agent::Orchestrator;
use agentloop_config::AppConfig;

/// Load config and fail early, with setup hints, when no key is available.
///
/// Local endpoints (ollama) run without a key.
pub(crate) fn load_config() -> Result<AppConfig, Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;

    if !config.has_api_key() && config.default_provider != "ollama" {
        eprintln!();
        eprintln!("  ERROR: No API key configured!");
        eprintln!();
        eprintln!("  Set one of these environment variables:");
        eprintln!("    AGENTLOOP_API_KEY=...   (generic)");
        eprintln!("    OPENAI_API_KEY=sk-...   (OpenAI)");
        eprintln!("    ANTHROPIC_API_KEY=...   (Anthropic)");
        eprintln!();
        eprintln!("  Or add it to your config file:");
        eprintln!("    {}", AppConfig::config_path().display());
        eprintln!();
        return Err("No API key found. See above for setup instructions.".into());
    }
    Ok(config)
}

/// Provider, tools and one agent per type, wired from `config`.
pub(crate) fn build_orchestrator(
    config: &AppConfig,
) -> Result<Orchestrator, Box<dyn std::error::Error>> {
    let provider = agentloop_providers::build_from_config(config);
    let tools = Arc::new(agentloop_tools::default_registry());
    Ok(Orchestrator::from_config(config, provider, tools)?)
}
