use anyhow::Result;
use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

/// A request/response operation exposed to protocol clients.
///
/// `execute` returns `Err` only for malformed arguments or failures the tool
/// cannot describe itself; expected failures are part of the returned value.
#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &'static str;
    fn description(&self) -> &'static str;
    /// JSON Schema of the arguments object
    fn schema(&self) -> Value;
    async fn execute(&self, arguments: Value) -> Result<Value>;
}

/// Listing entry as advertised by `tools/list`
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub input_schema: Value,
}

impl ToolDefinition {
    pub fn of(tool: &dyn Tool) -> Self {
        Self {
            name: tool.name().to_string(),
            description: tool.description().to_string(),
            input_schema: tool.schema(),
        }
    }
}
