//! `agentloop route`: show a routing decision without calling a model.

use agentloop_agent::KeywordRouter;
use agentloop_config::AppConfig;

pub fn run(query: &str) -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;
    let router = KeywordRouter::from_config(&config.routing)?;
    let decision = router.route(query);
    println!("{}", serde_json::to_string_pretty(&decision)?);
    Ok(())
}
