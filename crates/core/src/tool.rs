//! Tool trait and registry: the abstraction over agent capabilities.
//!
//! A tool declares its parameters as [`ParamSpec`]s (name + type hint +
//! required/default). At registration the registry resolves the hints,
//! derives the JSON schema once, and caches it in a [`ToolDescriptor`].
//! Execution binds keyword arguments against that descriptor and never
//! lets a tool failure escape as anything other than text.

use async_trait::async_trait;
use futures::FutureExt;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tracing::{debug, warn};
use crate::error::ToolError;
use crate::message::{ToolCall, ToolResultBlock};
use crate::provider::ToolDefinition;

/// Semantic type of a tool parameter (the JSON Schema primitive it maps to).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamType {
    String,
    Integer,
    Number,
    Boolean,
    Array,
    Object,
}

impl ParamType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ParamType::String => "string",
            ParamType::Integer => "integer",
            ParamType::Number => "number",
            ParamType::Boolean => "boolean",
            ParamType::Array => "array",
            ParamType::Object => "object",
        }
    }

    /// Resolve a declared type hint.
    ///
    /// Accepts JSON Schema names as well as common Rust and Python
    /// spellings (`&str`, `i64`, `Vec<String>`, `int`, `List[str]`, ...).
    /// `Option<T>` resolves to `T`. Returns `None` for anything else.
    pub fn resolve(hint: &str) -> Option<Self> {
        let hint = hint.trim().trim_start_matches('&').trim();
        if let Some(inner) = hint
            .strip_prefix("Option<")
            .and_then(|rest| rest.strip_suffix('>'))
        {
            return Self::resolve(inner);
        }

        let base = hint
            .split(['<', '['])
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();

        let resolved = match base.as_str() {
            "string" | "str" | "char" | "text" => ParamType::String,
            "integer" | "int" | "i8" | "i16" | "i32" | "i64" | "i128" | "isize" | "u8"
            | "u16" | "u32" | "u64" | "u128" | "usize" => ParamType::Integer,
            "number" | "float" | "f32" | "f64" | "double" => ParamType::Number,
            "boolean" | "bool" => ParamType::Boolean,
            "array" | "list" | "vec" | "tuple" | "sequence" | "hashset" | "btreeset" | "set" => {
                ParamType::Array
            }
            "object" | "dict" | "map" | "hashmap" | "btreemap" | "mapping" | "value" => {
                ParamType::Object
            }
            _ => return None,
        };
        Some(resolved)
    }

    fn accepts(&self, value: &serde_json::Value) -> bool {
        match self {
            ParamType::String => value.is_string(),
            ParamType::Integer => value.is_i64() || value.is_u64(),
            ParamType::Number => value.is_number(),
            ParamType::Boolean => value.is_boolean(),
            ParamType::Array => value.is_array(),
            ParamType::Object => value.is_object(),
        }
    }
}

/// A parameter as declared by a tool, before resolution.
#[derive(Debug, Clone)]
pub struct ParamSpec {
    pub name: String,
    pub type_hint: String,
    pub required: bool,
    pub default: Option<serde_json::Value>,
    pub description: Option<String>,
}

impl ParamSpec {
    /// A required parameter.
    pub fn new(name: impl Into<String>, type_hint: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_hint: type_hint.into(),
            required: true,
            default: None,
            description: None,
        }
    }

    /// Mark the parameter optional with no default.
    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    /// Mark the parameter optional, filled with `default` when omitted.
    pub fn with_default(mut self, default: serde_json::Value) -> Self {
        self.required = false;
        self.default = Some(default);
        self
    }

    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// A parameter after its type hint has been resolved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedParam {
    pub name: String,
    pub kind: ParamType,
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Everything the registry knows about a tool. Immutable after registration.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolDescriptor {
    pub name: String,
    pub description: String,
    pub params: Vec<ResolvedParam>,
    definition: ToolDefinition,
}

impl ToolDescriptor {
    fn build(name: &str, description: &str, specs: Vec<ParamSpec>) -> Result<Self, ToolError> {
        if name.trim().is_empty() {
            return Err(ToolError::InvalidDefinition("tool name must not be empty".into()));
        }

        let (summary, docs) = split_docstring(description);
        let mut params: Vec<ResolvedParam> = Vec::with_capacity(specs.len());

        for spec in specs {
            if params.iter().any(|p| p.name == spec.name) {
                return Err(ToolError::InvalidDefinition(format!(
                    "{name}: parameter '{}' declared twice",
                    spec.name
                )));
            }
            let kind = ParamType::resolve(&spec.type_hint).unwrap_or_else(|| {
                warn!(
                    tool = name,
                    param = %spec.name,
                    type_hint = %spec.type_hint,
                    "Unresolvable parameter type, treating as string"
                );
                ParamType::String
            });
            let description = spec.description.or_else(|| docs.get(&spec.name).cloned());
            params.push(ResolvedParam {
                name: spec.name,
                kind,
                required: spec.required,
                default: spec.default,
                description,
            });
        }

        let definition = ToolDefinition {
            name: name.to_string(),
            description: summary.clone(),
            parameters: schema_for_params(&params),
        };

        Ok(Self {
            name: name.to_string(),
            description: summary,
            params,
            definition,
        })
    }

    /// The machine schema sent to the completion endpoint.
    pub fn definition(&self) -> &ToolDefinition {
        &self.definition
    }

    fn param(&self, name: &str) -> Option<&ResolvedParam> {
        self.params.iter().find(|p| p.name == name)
    }
}

fn schema_for_params(params: &[ResolvedParam]) -> serde_json::Value {
    let mut properties = serde_json::Map::new();
    for p in params {
        let mut prop = serde_json::json!({ "type": p.kind.as_str() });
        if let Some(desc) = &p.description {
            prop["description"] = serde_json::json!(desc);
        }
        if let Some(default) = &p.default {
            prop["default"] = default.clone();
        }
        properties.insert(p.name.clone(), prop);
    }
    let required: Vec<&str> = params
        .iter()
        .filter(|p| p.required)
        .map(|p| p.name.as_str())
        .collect();

    serde_json::json!({
        "type": "object",
        "properties": properties,
        "required": required,
    })
}

/// Split a free-text description into its summary and per-parameter docs.
///
/// Parameter docs are read from an `Args:` section, one `name: text` or
/// `name (type): text` line per parameter.
fn split_docstring(description: &str) -> (String, HashMap<String, String>) {
    let mut docs = HashMap::new();
    let Some(idx) = description.find("Args:") else {
        return (description.trim().to_string(), docs);
    };

    let summary = description[..idx].trim().to_string();
    for line in description[idx + "Args:".len()..].lines() {
        let line = line.trim();
        let Some((head, text)) = line.split_once(':') else {
            continue;
        };
        let param = head.split_whitespace().next().unwrap_or_default();
        if !param.is_empty() && !text.trim().is_empty() {
            docs.insert(param.to_string(), text.trim().to_string());
        }
    }
    (summary, docs)
}

/// Bound keyword arguments handed to a tool.
#[derive(Debug, Clone, Default)]
pub struct ToolArgs {
    values: serde_json::Map<String, serde_json::Value>,
}

impl ToolArgs {
    pub fn new(values: serde_json::Map<String, serde_json::Value>) -> Self {
        Self { values }
    }

    pub fn get(&self, name: &str) -> Option<&serde_json::Value> {
        self.values.get(name).filter(|v| !v.is_null())
    }

    pub fn str(&self, name: &str) -> Result<&str, ToolError> {
        self.get(name)
            .and_then(|v| v.as_str())
            .ok_or_else(|| missing(name, "string"))
    }

    pub fn i64(&self, name: &str) -> Result<i64, ToolError> {
        self.get(name)
            .and_then(|v| v.as_i64())
            .ok_or_else(|| missing(name, "integer"))
    }

    pub fn f64(&self, name: &str) -> Result<f64, ToolError> {
        self.get(name)
            .and_then(|v| v.as_f64())
            .ok_or_else(|| missing(name, "number"))
    }

    pub fn bool(&self, name: &str) -> Result<bool, ToolError> {
        self.get(name)
            .and_then(|v| v.as_bool())
            .ok_or_else(|| missing(name, "boolean"))
    }
}

fn missing(name: &str, kind: &str) -> ToolError {
    ToolError::InvalidArguments(format!("'{name}' must be a {kind}"))
}

/// The core Tool trait.
///
/// `parameters()` is the tool's declaration of the keyword arguments
/// `call` accepts; the registry guarantees `call` only ever sees those.
#[async_trait]
pub trait Tool: Send + Sync {
    /// The unique name of this tool (e.g., "calculator").
    fn name(&self) -> &str;

    /// Free-text description, optionally with an `Args:` section.
    fn description(&self) -> &str;

    /// Declared parameters, in order.
    fn parameters(&self) -> Vec<ParamSpec>;

    /// Run the tool. The returned text is what the model sees.
    async fn call(&self, args: &ToolArgs) -> std::result::Result<String, ToolError>;
}

type ToolFn = dyn Fn(&ToolArgs) -> std::result::Result<String, ToolError> + Send + Sync;

/// Adapter that lets a plain closure be registered as a tool.
struct FnTool {
    name: String,
    description: String,
    params: Vec<ParamSpec>,
    func: Box<ToolFn>,
}

#[async_trait]
impl Tool for FnTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn parameters(&self) -> Vec<ParamSpec> {
        self.params.clone()
    }

    async fn call(&self, args: &ToolArgs) -> std::result::Result<String, ToolError> {
        (self.func)(args)
    }
}

struct RegisteredTool {
    descriptor: ToolDescriptor,
    tool: Arc<dyn Tool>,
}

/// A registry of available tools, keyed by name.
///
/// Constructed explicitly and handed to each agent; there is no global
/// instance. Read-only once the agents are built, so one registry can be
/// shared behind an `Arc`.
pub struct ToolRegistry {
    tools: BTreeMap<String, RegisteredTool>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: BTreeMap::new(),
        }
    }

    /// Register a tool. Replaces any existing tool with the same name.
    pub fn register(&mut self, tool: Box<dyn Tool>) -> Result<&ToolDescriptor, ToolError> {
        let descriptor = ToolDescriptor::build(tool.name(), tool.description(), tool.parameters())?;
        let name = descriptor.name.clone();

        if self.tools.contains_key(&name) {
            warn!(tool = %name, "Tool re-registered, replacing previous definition");
        } else {
            debug!(tool = %name, params = descriptor.params.len(), "Tool registered");
        }

        self.tools.insert(
            name.clone(),
            RegisteredTool {
                descriptor,
                tool: Arc::from(tool),
            },
        );
        Ok(&self.tools[&name].descriptor)
    }

    /// Register a closure as a tool.
    pub fn register_fn<F>(
        &mut self,
        name: impl Into<String>,
        callable: F,
        description: impl Into<String>,
        params: Vec<ParamSpec>,
    ) -> Result<&ToolDescriptor, ToolError>
    where
        F: Fn(&ToolArgs) -> std::result::Result<String, ToolError> + Send + Sync + 'static,
    {
        self.register(Box::new(FnTool {
            name: name.into(),
            description: description.into(),
            params,
            func: Box::new(callable),
        }))
    }

    pub fn descriptor(&self, name: &str) -> Option<&ToolDescriptor> {
        self.tools.get(name).map(|t| &t.descriptor)
    }

    /// Schema for one tool.
    pub fn schema_for(&self, name: &str) -> Option<&ToolDefinition> {
        self.descriptor(name).map(|d| d.definition())
    }

    /// All tool schemas, ordered by name.
    pub fn all_schemas(&self) -> Vec<ToolDefinition> {
        self.tools
            .values()
            .map(|t| t.descriptor.definition().clone())
            .collect()
    }

    /// List all registered tool names, ordered.
    pub fn names(&self) -> Vec<&str> {
        self.tools.keys().map(|s| s.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Execute a tool by name with keyword arguments.
    ///
    /// Only an unknown `name` is an `Err`. Bad arguments, tool errors and
    /// panics all come back as `Ok("Error executing <name>: <cause>")`.
    pub async fn execute(
        &self,
        name: &str,
        arguments: serde_json::Value,
    ) -> std::result::Result<String, ToolError> {
        Ok(self
            .invoke(name, arguments)
            .await?
            .unwrap_or_else(|cause| execution_error(name, &cause)))
    }

    /// Execute a model-requested call, folding every failure into the result.
    pub async fn execute_call(&self, call: &ToolCall) -> ToolResultBlock {
        let (output, is_error) = match self.invoke(&call.name, call.arguments.clone()).await {
            Ok(Ok(output)) => (output, false),
            Ok(Err(cause)) => (execution_error(&call.name, &cause), true),
            Err(e) => (format!("Error: {e}"), true),
        };

        ToolResultBlock {
            call_id: call.id.clone(),
            tool_name: call.name.clone(),
            output,
            is_error,
        }
    }

    /// Look up, bind and run. The inner `Err` is the failure cause.
    async fn invoke(
        &self,
        name: &str,
        arguments: serde_json::Value,
    ) -> std::result::Result<std::result::Result<String, String>, ToolError> {
        let entry = self.tools.get(name).ok_or_else(|| ToolError::NotFound {
            name: name.to_string(),
            available: self.names().iter().map(|s| s.to_string()).collect(),
        })?;

        let args = match bind_arguments(&entry.descriptor, arguments) {
            Ok(args) => args,
            Err(cause) => return Ok(Err(cause)),
        };

        let outcome = match AssertUnwindSafe(entry.tool.call(&args)).catch_unwind().await {
            Ok(Ok(output)) => Ok(output),
            Ok(Err(ToolError::ExecutionFailed { reason, .. })) => Err(reason),
            Ok(Err(e)) => Err(e.to_string()),
            Err(panic) => {
                let cause = panic
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| panic.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "tool panicked".into());
                warn!(tool = name, cause = %cause, "Tool panicked");
                Err(cause)
            }
        };
        Ok(outcome)
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn execution_error(name: &str, cause: &str) -> String {
    format!("Error executing {name}: {cause}")
}

/// Check `arguments` against the descriptor and fill defaults.
fn bind_arguments(
    descriptor: &ToolDescriptor,
    arguments: serde_json::Value,
) -> std::result::Result<ToolArgs, String> {
    let mut values = match arguments {
        serde_json::Value::Object(map) => map,
        serde_json::Value::Null => serde_json::Map::new(),
        other => return Err(format!("arguments must be a JSON object, got {other}")),
    };

    if let Some(unknown) = values.keys().find(|k| descriptor.param(k).is_none()) {
        return Err(format!("unexpected argument '{unknown}'"));
    }

    for param in &descriptor.params {
        match values.get(&param.name) {
            Some(value) if !value.is_null() => {
                if !param.kind.accepts(value) {
                    return Err(format!(
                        "argument '{}' expected {}, got {value}",
                        param.name,
                        param.kind.as_str()
                    ));
                }
            }
            _ => {
                if let Some(default) = &param.default {
                    values.insert(param.name.clone(), default.clone());
                } else if param.required {
                    return Err(format!("missing required argument '{}'", param.name));
                }
            }
        }
    }

    Ok(ToolArgs::new(values))
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A simple test tool for unit tests.
    struct EchoTool;

    #[async_trait]
    impl Tool for EchoTool {
        fn name(&self) -> &str { "echo" }
        fn description(&self) -> &str {
            "Echoes back the input.\n\nArgs:\n    text: the text to echo\n    times (int): how often"
        }
        fn parameters(&self) -> Vec<ParamSpec> {
            vec![
                ParamSpec::new("text", "&str"),
                ParamSpec::new("times", "u32").with_default(serde_json::json!(1)),
            ]
        }
        async fn call(&self, args: &ToolArgs) -> std::result::Result<String, ToolError> {
            let text = args.str("text")?;
            let times = args.i64("times")? as usize;
            Ok(vec![text; times].join(" "))
        }
    }

    struct PanickingTool;

    #[async_trait]
    impl Tool for PanickingTool {
        fn name(&self) -> &str { "explode" }
        fn description(&self) -> &str { "Always panics" }
        fn parameters(&self) -> Vec<ParamSpec> { vec![] }
        async fn call(&self, _args: &ToolArgs) -> std::result::Result<String, ToolError> {
            panic!("kaboom")
        }
    }

    fn registry() -> ToolRegistry {
        let mut registry = ToolRegistry::new();
        registry.register(Box::new(EchoTool)).unwrap();
        registry
    }

    #[test]
    fn registry_register_and_lookup() {
        let registry = registry();
        assert!(registry.descriptor("echo").is_some());
        assert!(registry.descriptor("nonexistent").is_none());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn schema_is_derived_at_registration() {
        let registry = registry();
        let schema = registry.schema_for("echo").unwrap();
        assert_eq!(schema.description, "Echoes back the input.");
        assert_eq!(schema.parameters["properties"]["text"]["type"], "string");
        assert_eq!(schema.parameters["properties"]["text"]["description"], "the text to echo");
        assert_eq!(schema.parameters["properties"]["times"]["type"], "integer");
        assert_eq!(schema.parameters["properties"]["times"]["default"], 1);
        assert_eq!(schema.parameters["required"], serde_json::json!(["text"]));
    }

    #[test]
    fn unresolvable_type_falls_back_to_string() {
        let mut registry = ToolRegistry::new();
        let descriptor = registry
            .register_fn(
                "lookup",
                |_args| Ok("ok".into()),
                "Look something up",
                vec![ParamSpec::new("key", "CustomerId")],
            )
            .unwrap();
        assert_eq!(descriptor.params[0].kind, ParamType::String);
    }

    #[test]
    fn type_hint_resolution() {
        assert_eq!(ParamType::resolve("int"), Some(ParamType::Integer));
        assert_eq!(ParamType::resolve("Option<f64>"), Some(ParamType::Number));
        assert_eq!(ParamType::resolve("Vec<String>"), Some(ParamType::Array));
        assert_eq!(ParamType::resolve("List[str]"), Some(ParamType::Array));
        assert_eq!(ParamType::resolve("HashMap<String, i64>"), Some(ParamType::Object));
        assert_eq!(ParamType::resolve("bool"), Some(ParamType::Boolean));
        assert_eq!(ParamType::resolve("Widget"), None);
    }

    #[test]
    fn empty_name_rejected() {
        let mut registry = ToolRegistry::new();
        let err = registry
            .register_fn("  ", |_| Ok(String::new()), "nameless", vec![])
            .unwrap_err();
        assert!(matches!(err, ToolError::InvalidDefinition(_)));
    }

    #[test]
    fn duplicate_parameter_rejected() {
        let mut registry = ToolRegistry::new();
        let err = registry
            .register_fn(
                "dup",
                |_| Ok(String::new()),
                "duplicate params",
                vec![ParamSpec::new("a", "str"), ParamSpec::new("a", "int")],
            )
            .unwrap_err();
        assert!(matches!(err, ToolError::InvalidDefinition(_)));
    }

    #[test]
    fn reregistering_overwrites() {
        let mut registry = registry();
        registry
            .register_fn("echo", |_| Ok("replaced".into()), "Replacement", vec![])
            .unwrap();
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.schema_for("echo").unwrap().description, "Replacement");
    }

    #[test]
    fn all_schemas_are_sorted_by_name() {
        let mut registry = registry();
        registry
            .register_fn("alpha", |_| Ok(String::new()), "First", vec![])
            .unwrap();
        let names: Vec<String> = registry.all_schemas().into_iter().map(|d| d.name).collect();
        assert_eq!(names, vec!["alpha", "echo"]);
    }

    #[tokio::test]
    async fn registry_execute_tool() {
        let registry = registry();
        let out = registry
            .execute("echo", serde_json::json!({"text": "hi", "times": 2}))
            .await
            .unwrap();
        assert_eq!(out, "hi hi");
    }

    #[tokio::test]
    async fn defaults_fill_omitted_arguments() {
        let registry = registry();
        let out = registry
            .execute("echo", serde_json::json!({"text": "once"}))
            .await
            .unwrap();
        assert_eq!(out, "once");
    }

    #[tokio::test]
    async fn registry_execute_missing_tool() {
        let registry = registry();
        let err = registry.execute("nonexistent", serde_json::json!({})).await.unwrap_err();
        match err {
            ToolError::NotFound { name, available } => {
                assert_eq!(name, "nonexistent");
                assert_eq!(available, vec!["echo".to_string()]);
            }
            other => panic!("Expected NotFound, got: {other:?}"),
        }
    }

    #[tokio::test]
    async fn bad_arguments_become_error_text() {
        let registry = registry();

        let out = registry.execute("echo", serde_json::json!({})).await.unwrap();
        assert_eq!(out, "Error executing echo: missing required argument 'text'");

        let out = registry
            .execute("echo", serde_json::json!({"text": "x", "volume": 11}))
            .await
            .unwrap();
        assert_eq!(out, "Error executing echo: unexpected argument 'volume'");

        let out = registry
            .execute("echo", serde_json::json!({"text": 5}))
            .await
            .unwrap();
        assert!(out.starts_with("Error executing echo: argument 'text' expected string"));

        let out = registry.execute("echo", serde_json::json!([1, 2])).await.unwrap();
        assert!(out.contains("must be a JSON object"));
    }

    #[tokio::test]
    async fn tool_failure_becomes_error_text() {
        let mut registry = ToolRegistry::new();
        registry
            .register_fn(
                "fail",
                |_| {
                    Err(ToolError::ExecutionFailed {
                        tool_name: "fail".into(),
                        reason: "disk full".into(),
                    })
                },
                "Always fails",
                vec![],
            )
            .unwrap();
        let out = registry.execute("fail", serde_json::Value::Null).await.unwrap();
        assert!(out.starts_with("Error executing fail:"));
        assert!(out.contains("disk full"));
    }

    #[tokio::test]
    async fn panicking_tool_is_contained() {
        let mut registry = ToolRegistry::new();
        registry.register(Box::new(PanickingTool)).unwrap();
        let out = registry.execute("explode", serde_json::json!({})).await.unwrap();
        assert_eq!(out, "Error executing explode: kaboom");
    }

    #[tokio::test]
    async fn execute_call_tags_results() {
        let registry = registry();
        let ok = registry
            .execute_call(&ToolCall {
                id: "call_1".into(),
                name: "echo".into(),
                arguments: serde_json::json!({"text": "hey"}),
            })
            .await;
        assert_eq!(ok.call_id, "call_1");
        assert_eq!(ok.output, "hey");
        assert!(!ok.is_error);

        let missing = registry
            .execute_call(&ToolCall {
                id: "call_2".into(),
                name: "ghost".into(),
                arguments: serde_json::json!({}),
            })
            .await;
        assert!(missing.is_error);
        assert!(missing.output.contains("ghost"));
        assert!(missing.output.contains("echo"));
    }
}
