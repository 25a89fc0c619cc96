//! Built-in tools for agentloop agents.
//!
//! Each tool declares its parameters through `ParamSpec`; the registry
//! derives the schemas the model sees and validates arguments before a
//! tool is called.

pub mod calculator;
pub mod current_time;
pub mod text_stats;
pub mod unit_convert;

use agentloop_core::ToolRegistry;
use tracing::error;

/// Create a registry holding every built-in tool.
pub fn default_registry() -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    let builtins: Vec<Box<dyn agentloop_core::Tool>> = vec![
        Box::new(calculator::CalculatorTool),
        Box::new(current_time::CurrentTimeTool),
        Box::new(text_stats::TextStatsTool),
        Box::new(unit_convert::UnitConvertTool),
    ];
    for tool in builtins {
        let name = tool.name().to_string();
        if let Err(e) = registry.register(tool) {
            error!(tool = %name, error = %e, "Failed to register built-in tool");
        }
    }
    registry
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_registry_has_all_builtins() {
        let registry = default_registry();
        assert_eq!(
            registry.names(),
            vec!["calculator", "current_time", "text_stats", "unit_convert"]
        );
    }

    #[test]
    fn schemas_are_sorted_and_described() {
        let schemas = default_registry().all_schemas();
        assert_eq!(schemas.len(), 4);
        assert_eq!(schemas[0].name, "calculator");
        for schema in &schemas {
            assert!(!schema.description.is_empty());
            assert!(!schema.description.contains("Args:"));
            assert_eq!(schema.parameters["type"], "object");
        }
    }
}
