use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::trait_def::Tool;
use crate::config::LocaldockConfig;
use crate::detection::ProjectScanner;
use crate::emulator::EmulatorApi;
use crate::health::HealthChecker;
use crate::network::{NetworkConfigGenerator, NetworkOptions, DEFAULT_NETWORK, EDGE_PORT};
use crate::snapshot::{
    ExportRequest, HandlerRegistry, ServiceKind, SnapshotError, SnapshotService,
};

const DEFAULT_WAIT_ATTEMPTS: u64 = 10;
const DEFAULT_WAIT_INTERVAL_SECS: u64 = 2;

/// Shared state handed to every tool
#[derive(Clone)]
pub struct ToolContext {
    pub config: LocaldockConfig,
    pub api: Arc<dyn EmulatorApi>,
}

impl ToolContext {
    pub fn new(config: LocaldockConfig, api: Arc<dyn EmulatorApi>) -> Self {
        Self { config, api }
    }

    fn snapshot_service(&self) -> SnapshotService {
        SnapshotService::with_registry(
            Arc::clone(&self.api),
            HandlerRegistry::for_region(&self.config.region),
        )
        .with_connect_timeout(self.config.connect_timeout())
    }
}

/// Optional array of strings; a missing or null value is empty
fn string_list(args: &Value, key: &str) -> Result<Vec<String>> {
    match &args[key] {
        Value::Null => Ok(Vec::new()),
        Value::Array(items) => items
            .iter()
            .map(|item| {
                item.as_str()
                    .map(str::to_string)
                    .ok_or_else(|| anyhow!("'{}' must contain only strings", key))
            })
            .collect(),
        _ => Err(anyhow!("'{}' must be an array of strings", key)),
    }
}

fn failure(error: &SnapshotError) -> Value {
    json!({
        "success": false,
        "error": error.to_string(),
        "troubleshooting": error.troubleshooting_tips(),
    })
}

pub struct DetectServicesTool;

#[async_trait]
impl Tool for DetectServicesTool {
    fn name(&self) -> &'static str {
        "detect_services"
    }

    fn description(&self) -> &'static str {
        "Scan a project for Dockerfiles, docker-compose files, AWS SDK usage and LocalStack configuration"
    }

    fn schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "path": {
                    "type": "string",
                    "description": "Project directory to scan. Default is the current directory."
                }
            },
            "required": []
        })
    }

    async fn execute(&self, args: Value) -> Result<Value> {
        let path = PathBuf::from(args["path"].as_str().unwrap_or("."));
        debug!(path = %path.display(), "detect_services parameters");

        // The walk is blocking file I/O
        let report = tokio::task::spawn_blocking(move || {
            ProjectScanner::new(&path)
                .map(|scanner| scanner.scan())
                .map_err(|e| anyhow!(e.help_message()))
        })
        .await
        .context("Project scan task failed")??;

        serde_json::to_value(report).context("Failed to serialize detection report")
    }
}

pub struct DockerNetworkConfigTool {
    context: ToolContext,
}

impl DockerNetworkConfigTool {
    pub fn new(context: ToolContext) -> Self {
        Self { context }
    }
}

#[async_trait]
impl Tool for DockerNetworkConfigTool {
    fn name(&self) -> &'static str {
        "docker_network_config"
    }

    fn description(&self) -> &'static str {
        "Generate a docker-compose network that runs an application next to LocalStack, with the matching AWS environment variables"
    }

    fn schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "services": {
                    "type": "array",
                    "items": {"type": "string"},
                    "description": "LocalStack services to enable. Default: s3, dynamodb, sqs, sns, lambda."
                },
                "network_name": {
                    "type": "string",
                    "description": format!("Docker network name. Default is '{}'.", DEFAULT_NETWORK)
                },
                "app_service": {
                    "type": "string",
                    "description": "Compose service name of the application. Empty string omits the app service. Default is 'app'."
                },
                "port": {
                    "type": "integer",
                    "description": format!("Host port for the LocalStack edge endpoint. Default is {}.", EDGE_PORT),
                    "minimum": 1,
                    "maximum": 65535
                },
                "persistence": {
                    "type": "boolean",
                    "description": "Keep LocalStack state in a named volume. Default is false."
                }
            },
            "required": []
        })
    }

    async fn execute(&self, args: Value) -> Result<Value> {
        let defaults = NetworkOptions::default();
        let port = match args["port"].as_u64() {
            Some(p) => u16::try_from(p).map_err(|_| anyhow!("'port' must be between 1 and 65535"))?,
            None => defaults.port,
        };
        let app_service = match args["app_service"].as_str() {
            Some("") => None,
            Some(name) => Some(name.to_string()),
            None => defaults.app_service,
        };

        let options = NetworkOptions {
            services: string_list(&args, "services")?,
            network_name: args["network_name"]
                .as_str()
                .map(str::to_string)
                .unwrap_or(defaults.network_name),
            app_service,
            port,
            persistence: args["persistence"].as_bool().unwrap_or(false),
            region: self.context.config.region.clone(),
        };
        debug!(?options, "docker_network_config parameters");

        let config = NetworkConfigGenerator::generate(&options)?;
        serde_json::to_value(config).context("Failed to serialize network config")
    }
}

pub struct CheckHealthTool {
    context: ToolContext,
}

impl CheckHealthTool {
    pub fn new(context: ToolContext) -> Self {
        Self { context }
    }
}

#[async_trait]
impl Tool for CheckHealthTool {
    fn name(&self) -> &'static str {
        "check_health"
    }

    fn description(&self) -> &'static str {
        "Check the LocalStack health endpoint, optionally waiting until the given services are running"
    }

    fn schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "wait": {
                    "type": "boolean",
                    "description": "Poll until the services are ready. Default is false."
                },
                "services": {
                    "type": "array",
                    "items": {"type": "string"},
                    "description": "Services that must be running or available when waiting"
                },
                "attempts": {
                    "type": "integer",
                    "description": "Maximum number of polls when waiting. Default is 10.",
                    "minimum": 1
                },
                "interval_secs": {
                    "type": "integer",
                    "description": "Seconds between polls. Default is 2.",
                    "minimum": 0
                }
            },
            "required": []
        })
    }

    async fn execute(&self, args: Value) -> Result<Value> {
        let checker = HealthChecker::new(
            Arc::clone(&self.context.api),
            self.context.config.connect_timeout(),
        );

        if !args["wait"].as_bool().unwrap_or(false) {
            let report = checker.check().await;
            return serde_json::to_value(report).context("Failed to serialize health report");
        }

        let services = string_list(&args, "services")?;
        let attempts = args["attempts"].as_u64().unwrap_or(DEFAULT_WAIT_ATTEMPTS);
        let interval = args["interval_secs"]
            .as_u64()
            .unwrap_or(DEFAULT_WAIT_INTERVAL_SECS);

        let readiness = checker
            .wait_until_ready(
                &services,
                u32::try_from(attempts).unwrap_or(u32::MAX),
                Duration::from_secs(interval),
            )
            .await;
        serde_json::to_value(readiness).context("Failed to serialize readiness report")
    }
}

pub struct ExportStateTool {
    context: ToolContext,
}

impl ExportStateTool {
    pub fn new(context: ToolContext) -> Self {
        Self { context }
    }
}

#[async_trait]
impl Tool for ExportStateTool {
    fn name(&self) -> &'static str {
        "export_state"
    }

    fn description(&self) -> &'static str {
        "Export LocalStack resource metadata (buckets, tables, queues, topics, functions) to a YAML or JSON snapshot file"
    }

    fn schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "services": {
                    "type": "array",
                    "items": {"type": "string", "enum": ServiceKind::all_names()},
                    "description": "Service kinds to export, in order. Default is all of them."
                },
                "output_path": {
                    "type": "string",
                    "description": "Snapshot file to write. A .json extension selects JSON. Default is localstack-snapshot-<timestamp>.yaml."
                },
                "include_details": {
                    "type": "boolean",
                    "description": "Also record object metadata and table item counts. Default is false."
                }
            },
            "required": []
        })
    }

    async fn execute(&self, args: Value) -> Result<Value> {
        let services = string_list(&args, "services")?;
        let mut request = if services.is_empty() {
            ExportRequest::all()
        } else {
            ExportRequest::new(services)
        };
        if let Some(output) = args["output_path"].as_str().filter(|p| !p.is_empty()) {
            request = request.with_output(output);
        }
        request = request.with_details(args["include_details"].as_bool().unwrap_or(false));
        debug!(?request, "export_state parameters");

        match self.context.snapshot_service().export(request).await {
            Ok(summary) => {
                info!(
                    path = %summary.output_path.display(),
                    resources = summary.total_resources,
                    "export_state completed"
                );
                Ok(json!({
                    "success": true,
                    "services": summary.snapshot.services,
                    "summary": summary,
                }))
            }
            Err(e) => {
                warn!(error = %e, "export_state failed");
                Ok(failure(&e))
            }
        }
    }
}

pub struct ImportStateTool {
    context: ToolContext,
}

impl ImportStateTool {
    pub fn new(context: ToolContext) -> Self {
        Self { context }
    }
}

#[async_trait]
impl Tool for ImportStateTool {
    fn name(&self) -> &'static str {
        "import_state"
    }

    fn description(&self) -> &'static str {
        "Recreate resources from a snapshot file written by export_state"
    }

    fn schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "file_path": {
                    "type": "string",
                    "description": "Snapshot file to import"
                }
            },
            "required": ["file_path"]
        })
    }

    async fn execute(&self, args: Value) -> Result<Value> {
        let file_path = args["file_path"]
            .as_str()
            .filter(|p| !p.is_empty())
            .ok_or_else(|| anyhow!("Missing 'file_path' parameter"))?;
        debug!(file_path, "import_state parameters");

        match self.context.snapshot_service().import(Path::new(file_path)).await {
            Ok(summary) => {
                info!(
                    imported = summary.imported_count,
                    skipped = summary.skipped_count,
                    "import_state completed"
                );
                Ok(json!({ "success": true, "summary": summary }))
            }
            Err(e) => {
                warn!(error = %e, "import_state failed");
                Ok(failure(&e))
            }
        }
    }
}
