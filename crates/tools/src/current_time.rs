//! Current time tool: the wall-clock time at a fixed UTC offset.

use agentloop_core::{ParamSpec, Tool, ToolArgs, ToolError};
use async_trait::async_trait;
use chrono::{FixedOffset, Utc};

const DEFAULT_FORMAT: &str = "%Y-%m-%d %H:%M:%S %:z";

pub struct CurrentTimeTool;

#[async_trait]
impl Tool for CurrentTimeTool {
    fn name(&self) -> &str {
        "current_time"
    }

    fn description(&self) -> &str {
        "Get the current date and time.\n\n\
         Args:\n    utc_offset_minutes: Offset from UTC in minutes, e.g. 330 for UTC+05:30\n    \
         format: strftime-style format string"
    }

    fn parameters(&self) -> Vec<ParamSpec> {
        vec![
            ParamSpec::new("utc_offset_minutes", "i32").with_default(serde_json::json!(0)),
            ParamSpec::new("format", "Option<String>")
                .with_default(serde_json::json!(DEFAULT_FORMAT)),
        ]
    }

    async fn call(&self, args: &ToolArgs) -> Result<String, ToolError> {
        let minutes = args.i64("utc_offset_minutes")?;
        let offset = i32::try_from(minutes)
            .ok()
            .and_then(|m| m.checked_mul(60))
            .and_then(FixedOffset::east_opt)
            .ok_or_else(|| ToolError::ExecutionFailed {
                tool_name: "current_time".into(),
                reason: format!("UTC offset out of range: {minutes} minutes"),
            })?;

        let format = args.str("format")?;
        let items: Vec<_> = chrono::format::StrftimeItems::new(format).collect();
        if items.contains(&chrono::format::Item::Error) {
            return Err(ToolError::ExecutionFailed {
                tool_name: "current_time".into(),
                reason: format!("Invalid format string: {format}"),
            });
        }

        let now = Utc::now().with_timezone(&offset);
        Ok(now.format_with_items(items.into_iter()).to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agentloop_core::ToolRegistry;

    fn registry() -> ToolRegistry {
        let mut registry = ToolRegistry::new();
        registry.register(Box::new(CurrentTimeTool)).unwrap();
        registry
    }

    #[tokio::test]
    async fn default_format_is_utc() {
        let out = registry().execute("current_time", serde_json::json!({})).await.unwrap();
        assert!(out.ends_with("+00:00"), "got {out}");
        assert!(chrono::DateTime::parse_from_str(&out, DEFAULT_FORMAT).is_ok());
    }

    #[tokio::test]
    async fn applies_offset() {
        let out = registry()
            .execute("current_time", serde_json::json!({"utc_offset_minutes": 330, "format": "%:z"}))
            .await
            .unwrap();
        assert_eq!(out, "+05:30");
    }

    #[tokio::test]
    async fn rejects_out_of_range_offset() {
        let out = registry()
            .execute("current_time", serde_json::json!({"utc_offset_minutes": 100000}))
            .await
            .unwrap();
        assert!(out.starts_with("Error executing current_time: UTC offset out of range"));
    }

    #[tokio::test]
    async fn rejects_bad_format() {
        let out = registry()
            .execute("current_time", serde_json::json!({"format": "%Q"}))
            .await
            .unwrap();
        assert!(out.contains("Invalid format string"));
    }

    #[test]
    fn offset_param_is_integer_with_default() {
        let registry = registry();
        let schema = &registry.schema_for("current_time").unwrap().parameters;
        assert_eq!(schema["properties"]["utc_offset_minutes"]["type"], "integer");
        assert_eq!(schema["properties"]["utc_offset_minutes"]["default"], 0);
        assert_eq!(schema["properties"]["format"]["type"], "string");
        assert_eq!(schema["required"].as_array().unwrap().len(), 0);
    }
}
