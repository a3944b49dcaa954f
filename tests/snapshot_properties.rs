//! Snapshot export/import behavior against the in-memory emulator
//!
//! These tests drive `SnapshotService` end to end: extraction through every
//! handler, the file on disk, and reconstruction into a second emulator.

use localdock::emulator::MockEmulator;
use localdock::snapshot::{
    read_snapshot, ExportRequest, ServiceKind, SnapshotError, SnapshotService, FORMAT_VERSION,
};
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

fn populated() -> MockEmulator {
    MockEmulator::new()
        .with_bucket("assets")
        .with_bucket("uploads")
        .with_object("assets", "logo.png", 2048)
        .with_table("users", "user_id", 3)
        .with_queue("orders")
        .with_queue("events.fifo")
        .with_topic("alerts")
        .with_function("resize", "python3.12")
}

async fn export_to(mock: MockEmulator, request: ExportRequest) -> localdock::ExportSummary {
    SnapshotService::new(Arc::new(mock))
        .export(request)
        .await
        .expect("export should succeed")
}

#[tokio::test]
async fn test_total_is_sum_of_exported_counts() {
    let dir = TempDir::new().unwrap();
    let output = dir.path().join("snap.yaml");
    let mock = populated().fail("sqs", "ListQueues");

    let summary = export_to(
        mock,
        ExportRequest::new(["s3", "dynamodb", "sqs", "sns", "lambda", "kinesis"]).with_output(&output),
    )
    .await;

    // 2 buckets + 1 table + 1 topic + 1 function; sqs degraded, kinesis unknown
    assert_eq!(summary.total_resources, 5);
    let per_kind: usize = summary.snapshot.services.iter().map(|s| s.resource_count()).sum();
    assert_eq!(summary.total_resources, per_kind);
    assert!(!summary.snapshot.services.contains(ServiceKind::Sqs));
    assert_eq!(summary.ignored_services, vec!["kinesis".to_string()]);

    let sqs = summary
        .services
        .iter()
        .find(|s| s.kind == ServiceKind::Sqs)
        .unwrap();
    assert_eq!(sqs.status, "degraded");
    assert_eq!(sqs.resource_count, 0);

    let on_disk = read_snapshot(&output).unwrap();
    assert_eq!(on_disk.summary.total_resource_count, 5);
}

#[tokio::test]
async fn test_resource_count_matches_list_length() {
    let dir = TempDir::new().unwrap();
    let output = dir.path().join("snap.json");

    export_to(populated(), ExportRequest::all().with_output(&output).with_details(true)).await;

    let snapshot = read_snapshot(&output).unwrap();
    assert_eq!(snapshot.format_version, FORMAT_VERSION);
    assert_eq!(snapshot.services.len(), 5);
    for state in snapshot.services.iter() {
        assert_eq!(
            state.resource_count(),
            state.listed_count(),
            "{} count drifted",
            state.kind()
        );
    }
}

#[tokio::test]
async fn test_s3_round_trip_into_fresh_emulator() {
    let dir = TempDir::new().unwrap();
    let output = dir.path().join("snap.yaml");
    export_to(populated(), ExportRequest::new(["s3"]).with_output(&output)).await;

    let target = Arc::new(MockEmulator::new());
    let service = SnapshotService::new(target.clone());

    let first = service.import(&output).await.unwrap();
    assert_eq!(first.imported_count, 2);
    assert_eq!(first.skipped_count, 0);
    assert!(first.errors.is_empty());
    assert_eq!(target.bucket_names(), vec!["assets", "uploads"]);

    let second = service.import(&output).await.unwrap();
    assert_eq!(second.imported_count, 0);
    assert_eq!(second.skipped_count, 2);
    assert_eq!(target.bucket_names().len(), 2);
}

#[tokio::test]
async fn test_import_counts_add_up_per_kind() {
    let dir = TempDir::new().unwrap();
    let output = dir.path().join("snap.yaml");
    export_to(populated(), ExportRequest::all().with_output(&output)).await;

    let target = Arc::new(MockEmulator::new());
    let summary = SnapshotService::new(target.clone())
        .import(&output)
        .await
        .unwrap();

    assert_eq!(summary.services_processed, 5);
    for service in &summary.services {
        assert_eq!(service.imported_count, service.imported.len());
        assert_eq!(service.skipped_count, service.skipped.len());
    }
    // buckets and queues are recreated, the rest is recorded only
    assert_eq!(summary.imported_count, 4);
    assert_eq!(summary.skipped_count, 3);
    assert_eq!(target.queue_names(), vec!["orders", "events.fifo"]);
}

#[tokio::test]
async fn test_truncated_file_is_fatal_with_tips() {
    let dir = TempDir::new().unwrap();
    let output = dir.path().join("snap.json");
    export_to(populated(), ExportRequest::all().with_output(&output)).await;

    let text = fs::read_to_string(&output).unwrap();
    fs::write(&output, &text[..text.len() / 2]).unwrap();

    let err = SnapshotService::new(Arc::new(MockEmulator::new()))
        .import(&output)
        .await
        .unwrap_err();

    assert!(matches!(err, SnapshotError::Parse { .. }));
    assert!(err.is_file_error());
    assert!(err.help_message().contains("truncation"));
}

#[tokio::test]
async fn test_version_mismatch_still_imports() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("old.yaml");
    fs::write(
        &path,
        "formatVersion: \"0.9\"\n\
         capturedAt: 2024-01-01T00:00:00Z\n\
         services:\n  \
           s3:\n    \
             buckets:\n      \
               - name: legacy\n    \
             resourceCount: 1\n",
    )
    .unwrap();

    let target = Arc::new(MockEmulator::new());
    let summary = SnapshotService::new(target.clone())
        .import(&path)
        .await
        .unwrap();

    assert!(summary.version_mismatch);
    assert_eq!(summary.format_version, "0.9");
    assert_eq!(summary.imported_count, 1);
    assert_eq!(target.bucket_names(), vec!["legacy"]);
    assert!(summary.recommendations.iter().any(|r| r.contains("0.9")));
}

#[tokio::test]
async fn test_unversioned_file_still_imports() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("snap.yaml");
    fs::write(
        &path,
        "capturedAt: 2024-01-01T00:00:00Z\n\
         services:\n  \
           s3:\n    \
             buckets:\n      \
               - name: legacy\n",
    )
    .unwrap();

    let target = Arc::new(MockEmulator::new());
    let summary = SnapshotService::new(target.clone())
        .import(&path)
        .await
        .unwrap();

    assert!(summary.version_mismatch);
    assert_eq!(summary.format_version, "");
    assert_eq!(summary.imported_count, 1);
    assert_eq!(target.bucket_names(), vec!["legacy"]);
    assert!(summary
        .recommendations
        .iter()
        .any(|r| r.contains("no format version")));
}

#[tokio::test]
async fn test_file_without_timestamp_still_imports() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("snap.json");
    fs::write(
        &path,
        r#"{"formatVersion": "1.0", "services": {"sqs": {"queues": ["http://localhost:4566/000000000000/jobs"]}}}"#,
    )
    .unwrap();

    let target = Arc::new(MockEmulator::new());
    let summary = SnapshotService::new(target.clone())
        .import(&path)
        .await
        .unwrap();

    assert!(!summary.version_mismatch);
    assert_eq!(summary.imported_count, 1);
    assert_eq!(target.queue_names(), vec!["jobs"]);
}

#[tokio::test]
async fn test_empty_sqs_export() {
    let dir = TempDir::new().unwrap();
    let output = dir.path().join("snap.yaml");

    let summary = export_to(MockEmulator::new(), ExportRequest::new(["sqs"]).with_output(&output)).await;

    assert_eq!(summary.total_resources, 0);
    assert_eq!(summary.services_exported, 1);
    assert!(summary.recommendations[0].starts_with("No resources were found"));

    let yaml: serde_yaml::Value = serde_yaml::from_str(&fs::read_to_string(&output).unwrap()).unwrap();
    let sqs = &yaml["services"]["sqs"];
    assert_eq!(sqs["queues"].as_sequence().map(|q| q.len()), Some(0));
    assert_eq!(sqs["resourceCount"].as_u64(), Some(0));
}

#[tokio::test]
async fn test_missing_file_is_read_error() {
    let err = SnapshotService::new(Arc::new(MockEmulator::new()))
        .import(Path::new("/nonexistent/dir/snap.yaml"))
        .await
        .unwrap_err();

    assert!(matches!(err, SnapshotError::Read { .. }));
    assert!(err.troubleshooting_tips()[0].contains("path"));
}
