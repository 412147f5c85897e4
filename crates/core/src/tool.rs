//! Tool abstractions: the external capability surface the model can invoke.
//!
//! The pipeline consumes two collaborator traits: `ToolCatalog` (what tools
//! exist, and their provider-native schemas) and `ToolInvoker` (resolve a
//! detected signal and execute it). A registry-backed in-process
//! implementation of both is provided for applications that host their own
//! tools.

use crate::error::ToolError;
use crate::transport::ProviderToolSchema;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// An in-band indication that the model wants an external capability invoked
/// before it continues answering. Produced at most once per generation pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCallSignal {
    /// Name of the function the model asked for.
    pub name: String,

    /// Call arguments; defaults to an empty mapping when the provider sent none.
    #[serde(default)]
    pub args: serde_json::Map<String, serde_json::Value>,
}

impl ToolCallSignal {
    pub fn new(name: impl Into<String>, args: serde_json::Map<String, serde_json::Value>) -> Self {
        Self {
            name: name.into(),
            args,
        }
    }

    /// A signal with no arguments.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            args: serde_json::Map::new(),
        }
    }
}

/// A tool definition as known to the catalog.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    /// JSON Schema describing the tool's parameters.
    pub parameters: serde_json::Value,
}

/// A signal that has been matched against the catalog and is ready to execute.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolvedToolCall {
    /// Unique id for this invocation.
    pub id: String,

    /// The resolved tool name.
    pub name: String,

    /// Arguments as a JSON object.
    pub arguments: serde_json::Value,
}

/// A tool's result content: already textual, or structured data that the
/// bridge will stringify before reporting it back to the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ToolContent {
    Text(String),
    Structured(serde_json::Value),
}

/// The result of a tool execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResult {
    /// The call id this result is for.
    pub call_id: String,

    /// The output content.
    pub content: ToolContent,
}

impl ToolResult {
    /// Render the result as text: pass through if already textual, else
    /// structurally stringify.
    pub fn to_text(&self) -> Result<String, ToolError> {
        match &self.content {
            ToolContent::Text(text) => Ok(text.clone()),
            ToolContent::Structured(value) => serde_json::to_string(value)
                .map_err(|e| ToolError::InvalidArguments(format!("unserializable result: {e}"))),
        }
    }
}

/// The catalog of tools offered to the model.
#[async_trait]
pub trait ToolCatalog: Send + Sync {
    /// All known tool definitions.
    async fn list(&self) -> Result<Vec<ToolDefinition>, ToolError>;

    /// Translate definitions into the provider's native tool schema.
    fn to_provider_format(&self, definitions: &[ToolDefinition]) -> Vec<ProviderToolSchema> {
        definitions
            .iter()
            .map(|d| ProviderToolSchema {
                name: d.name.clone(),
                description: d.description.clone(),
                parameters: d.parameters.clone(),
            })
            .collect()
    }
}

/// The executor for detected tool calls.
#[async_trait]
pub trait ToolInvoker: Send + Sync {
    /// Match a detected signal against the known definitions. `Ok(None)`
    /// means no tool corresponds to the signal.
    async fn resolve(
        &self,
        definitions: &[ToolDefinition],
        signal: &ToolCallSignal,
        context_id: &str,
    ) -> Result<Option<ResolvedToolCall>, ToolError>;

    /// Execute a resolved call.
    async fn invoke(&self, call: ResolvedToolCall) -> Result<ToolResult, ToolError>;
}

/// An in-process tool implementation.
#[async_trait]
pub trait Tool: Send + Sync {
    /// The unique name of this tool.
    fn name(&self) -> &str;

    /// A description of what this tool does (sent to the model).
    fn description(&self) -> &str;

    /// JSON Schema describing this tool's parameters.
    fn parameters_schema(&self) -> serde_json::Value;

    /// Execute the tool with the given arguments.
    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolContent, ToolError>;

    /// Convert this tool into a ToolDefinition.
    fn to_definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters: self.parameters_schema(),
        }
    }
}

/// A registry of in-process tools, implementing both collaborator traits.
pub struct ToolRegistry {
    tools: HashMap<String, Box<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
        }
    }

    /// Register a tool. Replaces any existing tool with the same name.
    pub fn register(&mut self, tool: Box<dyn Tool>) {
        let name = tool.name().to_string();
        self.tools.insert(name, tool);
    }

    /// Get a tool by name.
    pub fn get(&self, name: &str) -> Option<&dyn Tool> {
        self.tools.get(name).map(|t| t.as_ref())
    }

    /// List all registered tool names.
    pub fn names(&self) -> Vec<&str> {
        self.tools.keys().map(|s| s.as_str()).collect()
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ToolCatalog for ToolRegistry {
    async fn list(&self) -> Result<Vec<ToolDefinition>, ToolError> {
        Ok(self.tools.values().map(|t| t.to_definition()).collect())
    }
}

#[async_trait]
impl ToolInvoker for ToolRegistry {
    async fn resolve(
        &self,
        definitions: &[ToolDefinition],
        signal: &ToolCallSignal,
        _context_id: &str,
    ) -> Result<Option<ResolvedToolCall>, ToolError> {
        if !definitions.iter().any(|d| d.name == signal.name) {
            return Ok(None);
        }
        if !self.tools.contains_key(&signal.name) {
            return Ok(None);
        }
        Ok(Some(ResolvedToolCall {
            id: uuid::Uuid::new_v4().to_string(),
            name: signal.name.clone(),
            arguments: serde_json::Value::Object(signal.args.clone()),
        }))
    }

    async fn invoke(&self, call: ResolvedToolCall) -> Result<ToolResult, ToolError> {
        let tool = self
            .tools
            .get(&call.name)
            .ok_or_else(|| ToolError::NotFound(call.name.clone()))?;
        let content = tool.execute(call.arguments).await?;
        Ok(ToolResult {
            call_id: call.id,
            content,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A simple test tool for unit tests.
    struct EchoTool;

    #[async_trait]
    impl Tool for EchoTool {
        fn name(&self) -> &str {
            "echo"
        }
        fn description(&self) -> &str {
            "Echoes back the input"
        }
        fn parameters_schema(&self) -> serde_json::Value {
            serde_json::json!({
                "type": "object",
                "properties": {
                    "text": { "type": "string" }
                },
                "required": ["text"]
            })
        }
        async fn execute(&self, arguments: serde_json::Value) -> Result<ToolContent, ToolError> {
            let text = arguments["text"].as_str().unwrap_or("").to_string();
            Ok(ToolContent::Text(text))
        }
    }

    fn args(pairs: &[(&str, &str)]) -> serde_json::Map<String, serde_json::Value> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), serde_json::Value::String(v.to_string())))
            .collect()
    }

    #[test]
    fn registry_register_and_lookup() {
        let mut registry = ToolRegistry::new();
        registry.register(Box::new(EchoTool));
        assert!(registry.get("echo").is_some());
        assert!(registry.get("nonexistent").is_none());
    }

    #[tokio::test]
    async fn registry_lists_definitions() {
        let mut registry = ToolRegistry::new();
        registry.register(Box::new(EchoTool));
        let defs = registry.list().await.unwrap();
        assert_eq!(defs.len(), 1);
        assert_eq!(defs[0].name, "echo");
    }

    #[tokio::test]
    async fn registry_resolves_and_invokes() {
        let mut registry = ToolRegistry::new();
        registry.register(Box::new(EchoTool));
        let defs = registry.list().await.unwrap();

        let signal = ToolCallSignal::new("echo", args(&[("text", "hello world")]));
        let resolved = registry
            .resolve(&defs, &signal, "ctx-1")
            .await
            .unwrap()
            .expect("should resolve");
        assert_eq!(resolved.name, "echo");

        let result = registry.invoke(resolved).await.unwrap();
        assert_eq!(result.to_text().unwrap(), "hello world");
    }

    #[tokio::test]
    async fn registry_resolve_unknown_tool_is_none() {
        let registry = ToolRegistry::new();
        let signal = ToolCallSignal::named("nonexistent");
        let resolved = registry.resolve(&[], &signal, "ctx-1").await.unwrap();
        assert!(resolved.is_none());
    }

    #[test]
    fn structured_result_stringifies() {
        let result = ToolResult {
            call_id: "call_1".into(),
            content: ToolContent::Structured(serde_json::json!({"answer": 42})),
        };
        assert_eq!(result.to_text().unwrap(), r#"{"answer":42}"#);
    }

    #[test]
    fn signal_args_default_to_empty() {
        let json = r#"{"name":"lookup"}"#;
        let signal: ToolCallSignal = serde_json::from_str(json).unwrap();
        assert_eq!(signal.name, "lookup");
        assert!(signal.args.is_empty());
    }

    #[test]
    fn provider_format_copies_schema() {
        let registry = ToolRegistry::new();
        let defs = vec![ToolDefinition {
            name: "lookup".into(),
            description: "Look something up".into(),
            parameters: serde_json::json!({"type": "object"}),
        }];
        let schemas = registry.to_provider_format(&defs);
        assert_eq!(schemas.len(), 1);
        assert_eq!(schemas[0].name, "lookup");
    }
}
