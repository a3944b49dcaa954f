use serde::Serialize;
use std::path::PathBuf;

use crate::snapshot::ServiceKind;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ComposeFile {
    pub path: String,
    /// Service names declared under `services:`
    pub services: Vec<String>,
    pub has_localstack: bool,
}

impl ComposeFile {
    /// Reads service names from the document. Files that are not valid YAML
    /// still count, with no services listed.
    pub fn parse(path: String, text: &str) -> Self {
        let doc: serde_yaml::Value = serde_yaml::from_str(text).unwrap_or_default();

        let mut services = Vec::new();
        let mut has_localstack = false;
        if let Some(map) = doc.get("services").and_then(|s| s.as_mapping()) {
            for (name, definition) in map {
                let Some(name) = name.as_str() else {
                    continue;
                };
                let image = definition
                    .get("image")
                    .and_then(|i| i.as_str())
                    .unwrap_or("");
                if name.contains("localstack") || image.contains("localstack/localstack") {
                    has_localstack = true;
                }
                services.push(name.to_string());
            }
        }

        Self {
            path,
            services,
            has_localstack,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Dockerfile {
    pub path: String,
    /// Image of the final `FROM` stage
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_image: Option<String>,
}

impl Dockerfile {
    pub fn parse(path: String, text: &str) -> Self {
        let base_image = text
            .lines()
            .map(str::trim)
            .filter(|line| {
                line.get(..5)
                    .is_some_and(|prefix| prefix.eq_ignore_ascii_case("FROM "))
            })
            .filter_map(|line| {
                line[5..]
                    .split_whitespace()
                    .find(|token| !token.starts_with("--"))
                    .map(str::to_string)
            })
            .last();

        Self { path, base_image }
    }
}

/// An AWS service referenced by the project
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectedService {
    pub name: String,
    /// Files that reference the service, relative to the project root
    pub files: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectionReport {
    pub project_path: PathBuf,
    pub files_scanned: usize,
    pub compose_files: Vec<ComposeFile>,
    pub dockerfiles: Vec<Dockerfile>,
    pub aws_services: Vec<DetectedService>,
    /// True when some file points an SDK or compose service at LocalStack
    pub localstack_configured: bool,
    pub localstack_references: Vec<String>,
    pub recommendations: Vec<String>,
}

impl DetectionReport {
    pub fn new(
        project_path: PathBuf,
        files_scanned: usize,
        compose_files: Vec<ComposeFile>,
        dockerfiles: Vec<Dockerfile>,
        aws_services: Vec<DetectedService>,
        localstack_references: Vec<String>,
    ) -> Self {
        let mut report = Self {
            project_path,
            files_scanned,
            compose_files,
            dockerfiles,
            aws_services,
            localstack_configured: !localstack_references.is_empty(),
            localstack_references,
            recommendations: Vec::new(),
        };
        report.recommendations = report.build_recommendations();
        report
    }

    pub fn uses_docker(&self) -> bool {
        !self.compose_files.is_empty() || !self.dockerfiles.is_empty()
    }

    pub fn has_localstack_service(&self) -> bool {
        self.compose_files.iter().any(|c| c.has_localstack)
    }

    pub fn service_names(&self) -> Vec<&str> {
        self.aws_services.iter().map(|s| s.name.as_str()).collect()
    }

    /// Detected services that snapshots can capture
    pub fn snapshot_kinds(&self) -> Vec<ServiceKind> {
        self.aws_services
            .iter()
            .filter_map(|s| s.name.parse().ok())
            .collect()
    }

    fn build_recommendations(&self) -> Vec<String> {
        let mut recommendations = Vec::new();
        let names = self.service_names().join(",");

        if self.aws_services.is_empty() {
            recommendations.push(
                "No AWS SDK usage detected; LocalStack may not be needed for this project"
                    .to_string(),
            );
            return recommendations;
        }

        if !self.uses_docker() {
            recommendations.push(
                "No Dockerfile or compose file found; containerize the app to run it next to LocalStack"
                    .to_string(),
            );
        }

        if !self.has_localstack_service() {
            recommendations.push(format!(
                "Add a localstack service to docker-compose with SERVICES={} (see docker_network_config)",
                names
            ));
        }

        if !self.localstack_configured {
            recommendations.push(
                "Point the AWS SDK at LocalStack: AWS_ENDPOINT_URL=http://localhost:4566 from the host, \
                 http://localstack:4566 inside the compose network"
                    .to_string(),
            );
        }

        if !self.snapshot_kinds().is_empty() {
            recommendations.push(
                "Use export_state to save emulator resources before recreating the LocalStack container"
                    .to_string(),
            );
        }

        recommendations
    }
}
