//! Tool registry
//!
//! Holds every tool the server advertises and looks them up by name.

use anyhow::Result;
use std::sync::Arc;

use super::implementations::*;
use super::trait_def::{Tool, ToolDefinition};
use crate::config::LocaldockConfig;
use crate::emulator::{EmulatorApi, HttpEmulatorClient};

/// Registry of all available tools
pub struct ToolRegistry {
    tools: Vec<Arc<dyn Tool>>,
}

impl ToolRegistry {
    /// Create the standard tools talking to the configured emulator over HTTP
    pub fn with_defaults(config: LocaldockConfig) -> Result<Self> {
        let client = HttpEmulatorClient::new(&config)?;
        Ok(Self::with_api(config, Arc::new(client)))
    }

    /// Create the standard tools on top of an existing emulator client
    pub fn with_api(config: LocaldockConfig, api: Arc<dyn EmulatorApi>) -> Self {
        let context = ToolContext::new(config, api);

        let tools: Vec<Arc<dyn Tool>> = vec![
            Arc::new(DetectServicesTool),
            Arc::new(DockerNetworkConfigTool::new(context.clone())),
            Arc::new(CheckHealthTool::new(context.clone())),
            Arc::new(ExportStateTool::new(context.clone())),
            Arc::new(ImportStateTool::new(context)),
        ];

        Self { tools }
    }

    /// Listing entries for every tool, in registration order
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools
            .iter()
            .map(|tool| ToolDefinition::of(tool.as_ref()))
            .collect()
    }

    /// Get a tool by name
    pub fn get_tool(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.iter().find(|t| t.name() == name).cloned()
    }

    /// Get all registered tool names
    pub fn tool_names(&self) -> Vec<&str> {
        self.tools.iter().map(|t| t.name()).collect()
    }

    /// Number of registered tools
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Check if registry is empty
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}
