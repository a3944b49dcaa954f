//! Snapshot export and import orchestration
//!
//! [`SnapshotService`] checks that the emulator answers, runs the registered
//! handler for each requested kind in order, and turns the outcome into a
//! summary with advisory recommendations. Both directions are single-pass:
//! nothing is persisted between steps and nothing is retried.
//!
//! # Example
//!
//! ```no_run
//! use localdock::emulator::HttpEmulatorClient;
//! use localdock::snapshot::{ExportRequest, SnapshotService};
//! use localdock::LocaldockConfig;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = LocaldockConfig::default();
//! let client = Arc::new(HttpEmulatorClient::new(&config)?);
//! let service = SnapshotService::new(client);
//!
//! let summary = service.export(ExportRequest::new(["s3", "sqs"])).await?;
//! println!("{} resources written to {}", summary.total_resources, summary.output_path.display());
//! # Ok(())
//! # }
//! ```

use chrono::{DateTime, SubsecRound, Utc};
use serde::Serialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::codec::{default_file_name, read_snapshot, write_snapshot};
use super::error::SnapshotError;
use super::handlers::{ExtractStatus, HandlerRegistry, ItemFault, ResourceSkip};
use super::kind::ServiceKind;
use super::model::{ServiceStates, Snapshot, FORMAT_VERSION};
use crate::emulator::EmulatorApi;

/// Timeout for the single connectivity check that precedes export and import
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Exports above this many resources get a recommendation to split
pub const LARGE_EXPORT_THRESHOLD: usize = 1000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportRequest {
    /// Requested kind names, in extraction order. Unknown names are ignored.
    pub services: Vec<String>,
    /// Destination file; a timestamped name in the working directory if unset
    pub output: Option<PathBuf>,
    pub include_details: bool,
}

impl ExportRequest {
    pub fn new<I, S>(services: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            services: services.into_iter().map(Into::into).collect(),
            output: None,
            include_details: false,
        }
    }

    /// Every supported kind
    pub fn all() -> Self {
        Self::new(ServiceKind::all_names())
    }

    pub fn with_output(mut self, output: impl Into<PathBuf>) -> Self {
        self.output = Some(output.into());
        self
    }

    pub fn with_details(mut self, include_details: bool) -> Self {
        self.include_details = include_details;
        self
    }
}

/// Outcome of one kind's extraction
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportedService {
    pub kind: ServiceKind,
    pub resource_count: usize,
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub faults: Vec<ItemFault>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportSummary {
    pub output_path: PathBuf,
    /// Kinds that produced a state in the file
    pub services_exported: usize,
    pub total_resources: usize,
    pub file_size_bytes: u64,
    pub captured_at: DateTime<Utc>,
    /// Every requested known kind, degraded ones included
    pub services: Vec<ExportedService>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub ignored_services: Vec<String>,
    pub recommendations: Vec<String>,
    /// The document that was written
    #[serde(skip)]
    pub snapshot: Snapshot,
}

/// Outcome of one kind's reconstruction
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportedService {
    pub kind: ServiceKind,
    pub imported_count: usize,
    pub skipped_count: usize,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub imported: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub skipped: Vec<ResourceSkip>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportSummary {
    pub source_path: PathBuf,
    pub format_version: String,
    pub version_mismatch: bool,
    pub services_processed: usize,
    pub imported_count: usize,
    pub skipped_count: usize,
    pub services: Vec<ImportedService>,
    /// `<kind>: <error>` for each reconstructor that failed as a whole
    pub errors: Vec<String>,
    pub recommendations: Vec<String>,
}

pub struct SnapshotService {
    api: Arc<dyn EmulatorApi>,
    registry: HandlerRegistry,
    connect_timeout: Duration,
}

impl SnapshotService {
    pub fn new(api: Arc<dyn EmulatorApi>) -> Self {
        Self::with_registry(api, HandlerRegistry::with_defaults())
    }

    pub fn with_registry(api: Arc<dyn EmulatorApi>, registry: HandlerRegistry) -> Self {
        Self {
            api,
            registry,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// One health probe with the short connectivity timeout
    pub async fn ensure_reachable(&self) -> Result<(), SnapshotError> {
        match self.api.health(self.connect_timeout).await {
            Ok(health) => {
                debug!(
                    endpoint = %self.api.endpoint(),
                    version = health.version.as_deref().unwrap_or("unknown"),
                    "Emulator reachable"
                );
                Ok(())
            }
            Err(source) => Err(SnapshotError::EmulatorUnreachable {
                endpoint: self.api.endpoint().to_string(),
                source,
            }),
        }
    }

    pub async fn export(&self, request: ExportRequest) -> Result<ExportSummary, SnapshotError> {
        self.ensure_reachable().await?;

        let captured_at = Utc::now().trunc_subsecs(0);
        let mut states = ServiceStates::new();
        let mut reports = Vec::new();
        let mut ignored = Vec::new();
        let mut seen = HashSet::new();

        for name in &request.services {
            let Ok(kind) = name.parse::<ServiceKind>() else {
                debug!(service = %name, "Ignoring unknown service");
                ignored.push(name.clone());
                continue;
            };
            if !seen.insert(kind) {
                debug!(service = %kind, "Ignoring repeated service");
                continue;
            }
            let Some(handler) = self.registry.get(kind) else {
                debug!(service = %kind, "No handler registered");
                ignored.push(name.clone());
                continue;
            };

            let extraction = handler.extract(self.api.as_ref(), request.include_details).await;
            let resource_count = extraction.state.resource_count();
            let (reason, faults) = match extraction.status.clone() {
                ExtractStatus::Complete => (None, Vec::new()),
                ExtractStatus::Degraded { reason } => (Some(reason), Vec::new()),
                ExtractStatus::Partial { faults } => (None, faults),
            };
            reports.push(ExportedService {
                kind,
                resource_count,
                status: extraction.status.label(),
                reason,
                faults,
            });

            if !extraction.is_degraded() {
                states.insert(extraction.state);
            }
        }

        let snapshot = Snapshot::new(captured_at, states);
        let output_path = request
            .output
            .clone()
            .unwrap_or_else(|| default_file_name(captured_at));
        let file_size_bytes = write_snapshot(&output_path, &snapshot)?;

        let total_resources = snapshot.total_resource_count();
        info!(
            path = %output_path.display(),
            services = snapshot.services.len(),
            resources = total_resources,
            bytes = file_size_bytes,
            "Snapshot exported"
        );

        Ok(ExportSummary {
            recommendations: export_recommendations(total_resources, &reports, &ignored),
            output_path,
            services_exported: snapshot.services.len(),
            total_resources,
            file_size_bytes,
            captured_at,
            services: reports,
            ignored_services: ignored,
            snapshot,
        })
    }

    pub async fn import(&self, path: &Path) -> Result<ImportSummary, SnapshotError> {
        let snapshot = read_snapshot(path)?;
        let version_mismatch = !snapshot.is_current_version();
        if version_mismatch {
            warn!(
                found = %snapshot.format_version,
                expected = FORMAT_VERSION,
                "Snapshot format version differs"
            );
        }

        self.ensure_reachable().await?;

        let mut reports = Vec::new();
        let mut errors = Vec::new();
        let mut recorded_only = Vec::new();

        for state in snapshot.services.iter() {
            let kind = state.kind();
            let Some(handler) = self.registry.get(kind) else {
                errors.push(format!("{}: no reconstructor registered", kind));
                continue;
            };

            match handler.reconstruct(self.api.as_ref(), state).await {
                Ok(outcome) => {
                    if !handler.recreates_resources() && outcome.skipped_count() > 0 {
                        recorded_only.push(kind);
                    }
                    reports.push(ImportedService {
                        kind,
                        imported_count: outcome.imported_count(),
                        skipped_count: outcome.skipped_count(),
                        imported: outcome.imported,
                        skipped: outcome.skipped,
                    });
                }
                Err(e) => {
                    warn!(service = %kind, error = %e, "Reconstruction failed");
                    errors.push(format!("{}: {}", kind, e));
                }
            }
        }

        let imported_count = reports.iter().map(|r| r.imported_count).sum();
        let skipped_count = reports.iter().map(|r| r.skipped_count).sum();
        info!(
            path = %path.display(),
            imported = imported_count,
            skipped = skipped_count,
            errors = errors.len(),
            "Snapshot imported"
        );

        let recommendations = import_recommendations(
            &snapshot,
            imported_count,
            skipped_count,
            &errors,
            &recorded_only,
        );

        Ok(ImportSummary {
            source_path: path.to_path_buf(),
            format_version: snapshot.format_version,
            version_mismatch,
            services_processed: reports.len(),
            imported_count,
            skipped_count,
            services: reports,
            errors,
            recommendations,
        })
    }
}

fn export_recommendations(
    total: usize,
    reports: &[ExportedService],
    ignored: &[String],
) -> Vec<String> {
    let mut recommendations = Vec::new();

    if total == 0 {
        recommendations.push(
            "No resources were found in the requested services; the snapshot is empty".to_string(),
        );
    } else if total > LARGE_EXPORT_THRESHOLD {
        recommendations.push(format!(
            "Large export ({} resources); consider exporting services separately",
            total
        ));
    }

    for report in reports {
        if let Some(reason) = &report.reason {
            recommendations.push(format!(
                "{} could not be listed and was left out ({}); check that it is enabled in LocalStack",
                report.kind, reason
            ));
        }
        if !report.faults.is_empty() {
            let items: Vec<&str> = report.faults.iter().map(|f| f.item.as_str()).collect();
            recommendations.push(format!(
                "Details for some {} {} could not be read: {}",
                report.kind,
                report.kind.resource_noun(),
                items.join(", ")
            ));
        }
    }

    if !ignored.is_empty() {
        let names: Vec<String> = ignored
            .iter()
            .map(|name| match ServiceKind::suggest(name) {
                Some(kind) if kind.as_str() != name.trim().to_lowercase() => {
                    format!("{} (did you mean {}?)", name, kind)
                }
                _ => name.clone(),
            })
            .collect();
        recommendations.push(format!(
            "Ignored unsupported services: {} (supported: {})",
            names.join(", "),
            ServiceKind::all_names().join(", ")
        ));
    }

    recommendations
}

fn import_recommendations(
    snapshot: &Snapshot,
    imported: usize,
    skipped: usize,
    errors: &[String],
    recorded_only: &[ServiceKind],
) -> Vec<String> {
    let mut recommendations = Vec::new();

    if snapshot.format_version.is_empty() {
        recommendations.push(format!(
            "Snapshot has no format version (current is {}); proceed with caution and verify the imported resources",
            FORMAT_VERSION
        ));
    } else if snapshot.format_version != FORMAT_VERSION {
        recommendations.push(format!(
            "Snapshot format version {} differs from {}; proceed with caution and verify the imported resources",
            snapshot.format_version, FORMAT_VERSION
        ));
    }

    if skipped > 0 || !errors.is_empty() {
        recommendations.push(
            "Some resources were skipped or failed; check the logs (LOCALDOCK_LOG_LEVEL=debug) for details"
                .to_string(),
        );
    }

    if !recorded_only.is_empty() {
        let kinds: Vec<&str> = recorded_only.iter().map(|k| k.as_str()).collect();
        recommendations.push(format!(
            "{} resources are recorded in the snapshot but not recreated; provision them with your own scripts",
            kinds.join(", ")
        ));
    }

    let listed: usize = snapshot.services.iter().map(|s| s.listed_count()).sum();
    if listed == 0 {
        recommendations.push("The snapshot contains no resources".to_string());
    } else if imported == 0 {
        recommendations.push(
            "Nothing was imported; the resources may already exist in the emulator".to_string(),
        );
    }

    recommendations
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::emulator::MockEmulator;
    use crate::snapshot::model::{BucketRecord, S3State, ServiceState, SqsState};
    use tempfile::TempDir;

    fn service(mock: MockEmulator) -> (SnapshotService, Arc<MockEmulator>) {
        let mock = Arc::new(mock);
        (SnapshotService::new(mock.clone()), mock)
    }

    #[tokio::test]
    async fn test_export_unreachable_is_fatal() {
        let dir = TempDir::new().unwrap();
        let output = dir.path().join("snap.yaml");
        let (service, _) = service(MockEmulator::offline());

        let err = service
            .export(ExportRequest::all().with_output(&output))
            .await
            .unwrap_err();

        assert!(matches!(err, SnapshotError::EmulatorUnreachable { .. }));
        assert!(!output.exists());
    }

    #[tokio::test]
    async fn test_export_ignores_unknown_and_repeated_kinds() {
        let dir = TempDir::new().unwrap();
        let (service, mock) = service(MockEmulator::new().with_queue("orders"));

        let summary = service
            .export(
                ExportRequest::new(["sqs", "kinesis", "SQS"]).with_output(dir.path().join("s.yaml")),
            )
            .await
            .unwrap();

        assert_eq!(summary.services_exported, 1);
        assert_eq!(summary.ignored_services, vec!["kinesis".to_string()]);
        assert_eq!(mock.calls(), vec!["sqs:ListQueues".to_string()]);
        assert!(summary
            .recommendations
            .iter()
            .any(|r| r.starts_with("Ignored unsupported services: kinesis")));
    }

    #[tokio::test]
    async fn test_degraded_kind_is_reported_but_absent() {
        let dir = TempDir::new().unwrap();
        let (service, _) = service(
            MockEmulator::new()
                .with_bucket("assets")
                .with_table("users", "id", 0)
                .fail("dynamodb", "ListTables"),
        );

        let summary = service
            .export(ExportRequest::new(["s3", "dynamodb"]).with_output(dir.path().join("s.yaml")))
            .await
            .unwrap();

        assert_eq!(summary.snapshot.services.kinds(), vec![ServiceKind::S3]);
        assert_eq!(summary.total_resources, 1);
        assert_eq!(summary.services[1].status, "degraded");
        assert_eq!(summary.services[1].resource_count, 0);
        assert!(summary.recommendations.iter().any(|r| r.starts_with("dynamodb could not be listed")));
    }

    #[tokio::test]
    async fn test_capture_time_has_whole_seconds() {
        let dir = TempDir::new().unwrap();
        let (service, _) = service(MockEmulator::new());

        let summary = service
            .export(ExportRequest::new(["s3"]).with_output(dir.path().join("snap.yaml")))
            .await
            .unwrap();

        assert_eq!(summary.captured_at.timestamp_subsec_nanos(), 0);
        assert_eq!(summary.snapshot.captured_at, summary.captured_at);
        assert!(summary.output_path.ends_with("snap.yaml"));
    }

    #[tokio::test]
    async fn test_large_export_recommendation() {
        let mut mock = MockEmulator::new();
        for i in 0..=LARGE_EXPORT_THRESHOLD {
            mock = mock.with_queue(&format!("q{}", i));
        }
        let dir = TempDir::new().unwrap();
        let (service, _) = service(mock);

        let summary = service
            .export(ExportRequest::new(["sqs"]).with_output(dir.path().join("s.json")))
            .await
            .unwrap();

        assert_eq!(summary.total_resources, LARGE_EXPORT_THRESHOLD + 1);
        assert!(summary.recommendations[0].starts_with("Large export"));
    }

    #[tokio::test]
    async fn test_import_reports_state_mismatch_as_error() {
        // A handler registered for the wrong kind fails as a whole
        struct Misrouted;

        #[async_trait::async_trait]
        impl crate::snapshot::handlers::ServiceHandler for Misrouted {
            fn kind(&self) -> ServiceKind {
                ServiceKind::Sqs
            }

            async fn extract(
                &self,
                _api: &dyn EmulatorApi,
                _include_details: bool,
            ) -> crate::snapshot::handlers::Extraction {
                crate::snapshot::handlers::Extraction::complete(ServiceState::empty(ServiceKind::Sqs))
            }

            async fn reconstruct(
                &self,
                _api: &dyn EmulatorApi,
                state: &ServiceState,
            ) -> Result<crate::snapshot::handlers::Reconstruction, SnapshotError> {
                Err(SnapshotError::StateMismatch {
                    expected: ServiceKind::S3,
                    actual: state.kind(),
                })
            }
        }

        let dir = TempDir::new().unwrap();
        let path = dir.path().join("snap.yaml");
        let states: ServiceStates = vec![
            ServiceState::Sqs(SqsState::new(vec!["http://localhost:4566/000000000000/q".to_string()])),
            ServiceState::S3(S3State::new(vec![BucketRecord::named("assets")])),
        ]
        .into_iter()
        .collect();
        write_snapshot(&path, &Snapshot::new(Utc::now(), states)).unwrap();

        let mut registry = HandlerRegistry::with_defaults();
        registry.register(Arc::new(Misrouted));
        let service = SnapshotService::with_registry(Arc::new(MockEmulator::new()), registry);

        let summary = service.import(&path).await.unwrap();

        assert_eq!(summary.errors.len(), 1);
        assert!(summary.errors[0].starts_with("sqs: "));
        assert_eq!(summary.imported_count, 1);
        assert_eq!(summary.services_processed, 1);
    }

    #[tokio::test]
    async fn test_import_flags_recorded_only_kinds() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("snap.yaml");
        let source = Arc::new(MockEmulator::new().with_topic("alerts"));
        SnapshotService::new(source)
            .export(ExportRequest::new(["sns"]).with_output(&path))
            .await
            .unwrap();

        let (service, _) = service(MockEmulator::new());
        let summary = service.import(&path).await.unwrap();

        assert_eq!(summary.skipped_count, 1);
        assert!(summary
            .recommendations
            .iter()
            .any(|r| r.starts_with("sns resources are recorded in the snapshot but not recreated")));
    }

    #[tokio::test]
    async fn test_import_reads_file_before_connectivity_check() {
        let (service, _) = service(MockEmulator::offline());

        let err = service.import(Path::new("/nonexistent/snap.yaml")).await.unwrap_err();
        assert!(matches!(err, SnapshotError::Read { .. }));
    }
}
