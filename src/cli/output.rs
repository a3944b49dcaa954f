//! Output formatting for multiple formats
//!
//! Every command result can be printed as JSON, YAML, or human-readable text.
//! JSON and YAML are the serde representation of the result; the human format
//! is a short report with the recommendations last.
//!
//! # Example
//!
//! ```no_run
//! use localdock::cli::output::{OutputFormat, OutputFormatter};
//! use localdock::detection::ProjectScanner;
//!
//! # fn example() -> anyhow::Result<()> {
//! let report = ProjectScanner::new(".")?.scan();
//! let formatter = OutputFormatter::new(OutputFormat::Json);
//! println!("{}", formatter.format_detection(&report)?);
//! # Ok(())
//! # }
//! ```

use anyhow::{Context, Result};
use serde::Serialize;

use crate::config::LocaldockConfig;
use crate::detection::DetectionReport;
use crate::health::{HealthReport, Readiness};
use crate::network::NetworkConfig;
use crate::snapshot::{ExportSummary, ImportSummary};

const RULE: &str = "\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}";
const CHECK: &str = "\u{2713}";
const CROSS: &str = "\u{2717}";
const WARN: &str = "\u{26A0}";

/// Output format enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// JSON format (machine-readable)
    Json,
    /// YAML format (human-friendly, version-control friendly)
    Yaml,
    /// Human-readable formatted text
    Human,
}

/// Output formatter for command results
pub struct OutputFormatter {
    format: OutputFormat,
}

impl OutputFormatter {
    /// Creates a new output formatter with the specified format
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    pub fn format_detection(&self, report: &DetectionReport) -> Result<String> {
        self.structured(report, "detection report")
            .unwrap_or_else(|| Ok(human_detection(report)))
    }

    pub fn format_network(&self, config: &NetworkConfig) -> Result<String> {
        self.structured(config, "network config")
            .unwrap_or_else(|| Ok(human_network(config)))
    }

    /// Health report followed by the effective configuration
    pub fn format_health(&self, report: &HealthReport, config: &LocaldockConfig) -> Result<String> {
        match self.format {
            OutputFormat::Human => {
                let mut output = human_health(report);
                output.push_str(&human_config(config));
                Ok(output)
            }
            _ => self
                .structured(
                    &serde_json::json!({ "health": report, "config": config.to_display_map() }),
                    "health report",
                )
                .unwrap_or_else(|| Ok(String::new())),
        }
    }

    pub fn format_readiness(&self, readiness: &Readiness) -> Result<String> {
        self.structured(readiness, "readiness report")
            .unwrap_or_else(|| Ok(human_readiness(readiness)))
    }

    pub fn format_export(&self, summary: &ExportSummary) -> Result<String> {
        self.structured(summary, "export summary")
            .unwrap_or_else(|| Ok(human_export(summary)))
    }

    pub fn format_import(&self, summary: &ImportSummary) -> Result<String> {
        self.structured(summary, "import summary")
            .unwrap_or_else(|| Ok(human_import(summary)))
    }

    /// JSON or YAML rendering; `None` for the human format
    fn structured<T: Serialize>(&self, value: &T, what: &str) -> Option<Result<String>> {
        match self.format {
            OutputFormat::Json => Some(
                serde_json::to_string_pretty(value)
                    .with_context(|| format!("Failed to serialize {} to JSON", what)),
            ),
            OutputFormat::Yaml => Some(
                serde_yaml::to_string(value)
                    .with_context(|| format!("Failed to serialize {} to YAML", what)),
            ),
            OutputFormat::Human => None,
        }
    }
}

fn header(output: &mut String, title: &str) {
    output.push_str(&format!("{}\n{}\n\n", title, RULE));
}

fn recommendations(output: &mut String, items: &[String]) {
    if items.is_empty() {
        return;
    }
    output.push_str("\nRecommendations:\n");
    for item in items {
        output.push_str(&format!("  - {}\n", item));
    }
}

fn human_detection(report: &DetectionReport) -> String {
    let mut output = String::new();
    header(&mut output, "Project Detection");

    output.push_str(&format!("Project:       {}\n", report.project_path.display()));
    output.push_str(&format!("Files scanned: {}\n\n", report.files_scanned));

    output.push_str("Docker:\n");
    if report.dockerfiles.is_empty() && report.compose_files.is_empty() {
        output.push_str("\u{2514}\u{2500} (no Dockerfile or compose file found)\n");
    }
    for dockerfile in &report.dockerfiles {
        output.push_str(&format!(
            "\u{251C}\u{2500} {} (FROM {})\n",
            dockerfile.path,
            dockerfile.base_image.as_deref().unwrap_or("?")
        ));
    }
    for compose in &report.compose_files {
        let marker = if compose.has_localstack { " [localstack]" } else { "" };
        output.push_str(&format!(
            "\u{251C}\u{2500} {}: {}{}\n",
            compose.path,
            compose.services.join(", "),
            marker
        ));
    }

    output.push_str("\nAWS services:\n");
    if report.aws_services.is_empty() {
        output.push_str("\u{2514}\u{2500} (none detected)\n");
    }
    for service in &report.aws_services {
        output.push_str(&format!(
            "\u{251C}\u{2500} {:<12} {} file(s)\n",
            service.name,
            service.files.len()
        ));
    }

    let symbol = if report.localstack_configured { CHECK } else { CROSS };
    output.push_str(&format!("\n{} LocalStack endpoint configured\n", symbol));

    recommendations(&mut output, &report.recommendations);
    output
}

fn human_network(config: &NetworkConfig) -> String {
    let mut output = String::new();
    header(&mut output, "Docker Network Configuration");

    output.push_str(&format!("Network:  {}\n", config.network_name));
    output.push_str(&format!("Services: {}\n\n", config.services.join(", ")));
    output.push_str("docker-compose.yml:\n");
    output.push_str(&config.compose_yaml);

    output.push_str("\nHost environment:\n");
    for (key, value) in &config.host_environment {
        output.push_str(&format!("  export {}={}\n", key, value));
    }
    output.push_str("\nContainer environment:\n");
    for (key, value) in &config.container_environment {
        output.push_str(&format!("  {}={}\n", key, value));
    }

    if !config.notes.is_empty() {
        output.push_str("\nNotes:\n");
        for note in &config.notes {
            output.push_str(&format!("  - {}\n", note));
        }
    }
    output
}

fn human_health(report: &HealthReport) -> String {
    let mut output = String::new();
    header(&mut output, "LocalStack Health");

    if !report.reachable {
        output.push_str(&format!("{} {} is not reachable\n", CROSS, report.endpoint));
        if let Some(error) = &report.error {
            output.push_str(&format!("  Error: {}\n", error));
        }
        recommendations(&mut output, &report.recommendations);
        output.push('\n');
        return output;
    }

    output.push_str(&format!("{} {}\n", CHECK, report.endpoint));
    if let Some(version) = &report.version {
        output.push_str(&format!(
            "  Version: {} ({})\n",
            version,
            report.edition.as_deref().unwrap_or("community")
        ));
    }
    output.push_str(&format!(
        "  Running: {}  Available: {}\n\n",
        report.running_count, report.available_count
    ));
    for (service, status) in &report.services {
        let symbol = match status.as_str() {
            "running" | "available" => CHECK,
            _ => CROSS,
        };
        output.push_str(&format!("{} {:<24} {}\n", symbol, service, status));
    }

    recommendations(&mut output, &report.recommendations);
    output.push('\n');
    output
}

fn human_config(config: &LocaldockConfig) -> String {
    let mut output = String::new();
    header(&mut output, "Configuration");

    let mut entries: Vec<_> = config.to_display_map().into_iter().collect();
    entries.sort();
    for (key, value) in entries {
        output.push_str(&format!("  {:<22} {}\n", key, value));
    }
    output
}

fn human_readiness(readiness: &Readiness) -> String {
    let mut output = if readiness.ready {
        format!("{} Ready after {} attempt(s)\n\n", CHECK, readiness.attempts)
    } else {
        format!(
            "{} Not ready after {} attempt(s); pending: {}\n\n",
            CROSS,
            readiness.attempts,
            if readiness.pending.is_empty() {
                "endpoint".to_string()
            } else {
                readiness.pending.join(", ")
            }
        )
    };
    output.push_str(&human_health(&readiness.report));
    output
}

fn human_export(summary: &ExportSummary) -> String {
    let mut output = String::new();
    header(&mut output, "Snapshot Export");

    output.push_str(&format!("File:      {}\n", summary.output_path.display()));
    output.push_str(&format!("Size:      {} bytes\n", summary.file_size_bytes));
    output.push_str(&format!("Captured:  {}\n", summary.captured_at.to_rfc3339()));
    output.push_str(&format!("Resources: {}\n\n", summary.total_resources));

    for service in &summary.services {
        let symbol = match service.status {
            "complete" => CHECK,
            "partial" => WARN,
            _ => CROSS,
        };
        output.push_str(&format!(
            "{} {:<10} {:>5}  {}",
            symbol,
            service.kind.as_str(),
            service.resource_count,
            service.status
        ));
        if let Some(reason) = &service.reason {
            output.push_str(&format!(" ({})", reason));
        }
        output.push('\n');
    }
    if !summary.ignored_services.is_empty() {
        output.push_str(&format!("\nIgnored: {}\n", summary.ignored_services.join(", ")));
    }

    recommendations(&mut output, &summary.recommendations);
    output
}

fn human_import(summary: &ImportSummary) -> String {
    let mut output = String::new();
    header(&mut output, "Snapshot Import");

    output.push_str(&format!("File:     {}\n", summary.source_path.display()));
    let version_marker = if summary.version_mismatch {
        format!(" {} mismatch", WARN)
    } else {
        String::new()
    };
    output.push_str(&format!("Version:  {}{}\n", summary.format_version, version_marker));
    output.push_str(&format!(
        "Imported: {}  Skipped: {}\n\n",
        summary.imported_count, summary.skipped_count
    ));

    for service in &summary.services {
        let symbol = if service.skipped_count == 0 { CHECK } else { WARN };
        output.push_str(&format!(
            "{} {:<10} imported {:>4}  skipped {:>4}\n",
            symbol,
            service.kind.as_str(),
            service.imported_count,
            service.skipped_count
        ));
        for skip in &service.skipped {
            output.push_str(&format!("    - {}: {}\n", skip.name, skip.reason));
        }
    }

    if !summary.errors.is_empty() {
        output.push_str("\nErrors:\n");
        for error in &summary.errors {
            output.push_str(&format!("  {} {}\n", CROSS, error));
        }
    }

    recommendations(&mut output, &summary.recommendations);
    output
}
