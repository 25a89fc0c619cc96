//! agentloop CLI: the main entry point.
//!
//! Commands:
//! - `init`: Write a starter config
//! - `chat`: Interactive session, each line routed to an agent
//! - `ask`: Send a single message
//! - `route`: Show how a query would be routed
//! - `tools`: List the registered tool schemas

use std::path::PathBuf;
use clap::{Parser, Subcommand};
use tracing::debug;

mod commands;

#[derive(Parser)]
#[command(
    name = "agentloop",
    about = "agentloop: keyword-routed, tool-calling LLM agents",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Write a starter config to ~/.agentloop/config.toml
    Init {
        /// Overwrite an existing config
        #[arg(long)]
        force: bool,
    },

    /// Chat interactively; every line is routed to the best agent
    Chat,

    /// Send a single message
    Ask {
        /// The message to send
        #[arg(short, long)]
        message: String,

        /// Skip routing and use this agent (general, math, research, code)
        #[arg(short, long)]
        agent: Option<String>,

        /// JSON file holding the conversation; loaded before and saved after
        #[arg(long)]
        history: Option<PathBuf>,
    },

    /// Print the routing decision for a query as JSON
    Route {
        /// The query to score
        query: String,
    },

    /// Print the tool schemas sent to the model
    Tools,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    debug!(command = ?cli.command, "Dispatching command");
    match cli.command {
        Commands::Init { force } => commands::init::run(force)?,
        Commands::Chat => commands::chat::run().await?,
        Commands::Ask {
            message,
            agent,
            history,
        } => commands::ask::run(&message, agent.as_deref(), history.as_deref()).await?,
        Commands::Route { query } => commands::route::run(&query)?,
        Commands::Tools => commands::tools::run()?,
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ask_parses_with_agent_override() {
        let cli = Cli::try_parse_from(["agentloop", "-v", "ask", "-m", "2 + 2?", "--agent", "math"])
            .unwrap();
        assert!(cli.verbose);
        match &cli.command {
            Commands::Ask { message, agent, history } => {
                assert_eq!(message, "2 + 2?");
                assert_eq!(agent.as_deref(), Some("math"));
                assert!(history.is_none());
            }
            other => panic!("expected Ask, got {other:?}"),
        }
        // What the dispatch log line records.
        assert!(format!("{:?}", cli.command).starts_with("Ask"));
    }

    #[test]
    fn route_takes_positional_query() {
        let cli = Cli::try_parse_from(["agentloop", "route", "What is 25 * 4?"]).unwrap();
        assert!(matches!(cli.command, Commands::Route { ref query } if query == "What is 25 * 4?"));
    }
}
