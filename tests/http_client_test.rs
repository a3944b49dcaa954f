//! HTTP client tests against a stub emulator
//!
//! Each test starts a `wiremock` server that answers the way LocalStack does
//! for one protocol and checks what the client sends and how it decodes the
//! answer.

use localdock::emulator::{EmulatorApi, EmulatorError, EmulatorRequest, HttpEmulatorClient};
use localdock::snapshot::{ExportRequest, HandlerRegistry, SnapshotService};
use localdock::LocaldockConfig;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use wiremock::matchers::{body_string_contains, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client_for(server: &MockServer) -> HttpEmulatorClient {
    let config = LocaldockConfig {
        endpoint: server.uri(),
        region: "us-east-1".to_string(),
        request_timeout_secs: 5,
        connect_timeout_secs: 2,
        log_level: "info".to_string(),
    };
    HttpEmulatorClient::new(&config).unwrap()
}

async fn mount_health(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/_localstack/health"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "services": {"s3": "running", "sqs": "available", "kinesis": "disabled"},
            "edition": "community",
            "version": "3.0.2"
        })))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_health_is_decoded() {
    let server = MockServer::start().await;
    mount_health(&server).await;

    let health = client_for(&server)
        .health(Duration::from_secs(1))
        .await
        .unwrap();

    assert_eq!(health.version.as_deref(), Some("3.0.2"));
    assert!(health.is_usable("sqs"));
    assert!(!health.is_usable("kinesis"));
    assert_eq!(health.running_services(), vec!["s3"]);
}

#[tokio::test]
async fn test_health_error_status() {
    let server = MockServer::start().await;
    Mock::given(path("/_localstack/health"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let err = client_for(&server)
        .health(Duration::from_secs(1))
        .await
        .unwrap_err();

    assert_eq!(err.status(), Some(503));
    assert!(!err.is_connectivity());
}

#[tokio::test]
async fn test_requests_carry_service_scoped_authorization() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            "<ListAllMyBucketsResult><Buckets></Buckets></ListAllMyBucketsResult>",
        ))
        .expect(1)
        .mount(&server)
        .await;

    client_for(&server)
        .call(EmulatorRequest::get("s3", "/"))
        .await
        .unwrap();

    let requests = server.received_requests().await.unwrap();
    let authorization = requests[0]
        .headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .unwrap()
        .to_string();
    assert!(authorization.starts_with("AWS4-HMAC-SHA256 Credential=test/"));
    assert!(authorization.contains("/us-east-1/s3/aws4_request"));
    assert!(requests[0].headers.get("x-amz-date").is_some());
}

#[tokio::test]
async fn test_json_error_type_is_extracted() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(header("X-Amz-Target", "DynamoDB_20120810.DescribeTable"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "__type": "com.amazonaws.dynamodb.v20120810#ResourceNotFoundException",
            "message": "Requested resource not found"
        })))
        .mount(&server)
        .await;

    let err = client_for(&server)
        .call(EmulatorRequest::json_target(
            "dynamodb",
            "DynamoDB_20120810.DescribeTable",
            &json!({"TableName": "missing"}),
        ))
        .await
        .unwrap_err();

    match err {
        EmulatorError::Status { status, code, message } => {
            assert_eq!(status, 400);
            assert_eq!(code.as_deref(), Some("ResourceNotFoundException"));
            assert_eq!(message, "Requested resource not found");
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

#[tokio::test]
async fn test_xml_error_code_is_extracted() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/assets"))
        .respond_with(ResponseTemplate::new(409).set_body_string(
            "<Error><Code>BucketAlreadyOwnedByYou</Code><Message>already owned</Message></Error>",
        ))
        .mount(&server)
        .await;

    let err = client_for(&server)
        .call(EmulatorRequest::put("s3", "/assets"))
        .await
        .unwrap_err();

    assert_eq!(err.status(), Some(409));
    assert_eq!(err.code(), Some("BucketAlreadyOwnedByYou"));
}

#[tokio::test]
async fn test_sns_query_parameters() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(query_param("Action", "ListTopics"))
        .and(query_param("Version", "2010-03-31"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<ListTopicsResponse/>"))
        .expect(1)
        .mount(&server)
        .await;

    client_for(&server)
        .call(EmulatorRequest::query_action("sns", "ListTopics", "2010-03-31"))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_sqs_export_over_http() {
    let server = MockServer::start().await;
    mount_health(&server).await;
    Mock::given(method("POST"))
        .and(path("/"))
        .and(header("X-Amz-Target", "AmazonSQS.ListQueues"))
        .and(body_string_contains("MaxResults"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "QueueUrls": [
                format!("{}/000000000000/orders", server.uri()),
                format!("{}/000000000000/events.fifo", server.uri())
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let output = dir.path().join("snap.yaml");
    let service = SnapshotService::with_registry(
        Arc::new(client_for(&server)),
        HandlerRegistry::for_region("us-east-1"),
    );

    let summary = service
        .export(ExportRequest::new(["sqs"]).with_output(&output))
        .await
        .unwrap();

    assert_eq!(summary.total_resources, 2);
    let queues = summary.snapshot.services.iter().next().unwrap().resource_names();
    assert!(queues[0].ends_with("/000000000000/orders"));
    assert!(queues[1].ends_with("/events.fifo"));
}
