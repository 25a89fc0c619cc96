//! `agentloop chat`: interactive mode. Every line is routed on its own;
//! each agent keeps its own history for the session.

use std::io::Write;
use tokio::io::{AsyncBufReadExt, BufReader};

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = super::load_config()?;
    let mut orchestrator = super::build_orchestrator(&config)?;

    println!();
    println!("  agentloop: interactive mode");
    println!();
    println!("  Provider:  {}", config.default_provider);
    println!("  Model:     {}", agentloop_providers::default_model(&config));
    println!(
        "  Agents:    {}",
        orchestrator
            .list_agents()
            .iter()
            .map(|t| t.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    );
    println!();
    println!("  Commands: /agents, /clear, exit");
    println!();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("  You > ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let input = line.trim();
        match input {
            "" => continue,
            "exit" | "quit" => break,
            "/clear" => {
                orchestrator.clear_all_histories();
                println!("  History cleared for all agents.");
                continue;
            }
            "/agents" => {
                for agent_type in orchestrator.list_agents() {
                    if let Some(agent) = orchestrator.get_agent(agent_type) {
                        println!(
                            "  {:<9} {:>3} messages  model {}",
                            agent_type.as_str(),
                            agent.memory().len(),
                            agent.settings().model
                        );
                    }
                }
                continue;
            }
            _ => {}
        }

        eprint!("  ...");
        let resp = orchestrator.process(input).await;
        eprint!("\r     \r");

        println!();
        for line in resp.response.lines() {
            println!("  {} > {line}", resp.agent);
        }
        if !resp.tools_used.is_empty() {
            println!("  (tools: {})", resp.tools_used.join(", "));
        }
        println!();
    }

    println!();
    println!("  Goodbye!");
    Ok(())
}
