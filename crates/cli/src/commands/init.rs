//! `agentloop init`: write a starter config.

use agentloop_config::AppConfig;

pub fn run(force: bool) -> Result<(), Box<dyn std::error::Error>> {
    let config_dir = AppConfig::config_dir();
    let config_path = AppConfig::config_path();

    if !config_dir.exists() {
        std::fs::create_dir_all(&config_dir)?;
        println!("Created config directory: {}", config_dir.display());
    }

    if config_path.exists() && !force {
        println!("Config already exists at: {}", config_path.display());
        println!("Edit it manually or re-run with --force to overwrite.");
        return Ok(());
    }

    std::fs::write(&config_path, AppConfig::default_toml())?;
    println!("Wrote config to: {}", config_path.display());
    println!();
    println!("Next steps:");
    println!("  1. Set an API key (api_key in the file, or OPENAI_API_KEY / ANTHROPIC_API_KEY)");
    println!("  2. Run `agentloop chat`");

    Ok(())
}
