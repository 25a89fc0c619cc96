//! `agentloop ask`: single-message mode.

use std::path::Path;
use agentloop_agent::AgentType;
use agentloop_core::ConversationMemory;

pub async fn run(
    message: &str,
    agent: Option<&str>,
    history: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = super::load_config()?;
    let mut orchestrator = super::build_orchestrator(&config)?;

    let agent_type = match agent {
        Some(name) => name.parse::<AgentType>()?,
        None => orchestrator.route(message).agent,
    };
    let agent = orchestrator
        .get_agent_mut(agent_type)
        .ok_or_else(|| format!("No agent registered for '{agent_type}'"))?;

    if let Some(path) = history.filter(|p| p.exists()) {
        agent.set_memory(ConversationMemory::load(path)?);
    }

    eprint!("  [{agent_type}] thinking...");
    let result = agent.run(message).await;
    eprint!("\r                              \r");

    match result {
        Ok(reply) => {
            println!("{}", reply.text);
            if !reply.tools_invoked.is_empty() {
                eprintln!("  (tools: {})", reply.tools_invoked.join(", "));
            }
        }
        Err(e) => {
            eprintln!("{}", e.user_message());
            return Err(e.into());
        }
    }

    if let Some(path) = history {
        agent.memory().save(path)?;
    }
    Ok(())
}
