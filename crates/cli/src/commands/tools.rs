//! `agentloop tools`: print the tool schemas sent with every request.

pub fn run() -> Result<(), Box<dyn std::error::Error>> {
    let registry = agentloop_tools::default_registry();
    println!("{}", serde_json::to_string_pretty(&registry.all_schemas())?);
    Ok(())
}
