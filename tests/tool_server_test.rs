//! Tool server session tests
//!
//! Feeds line-delimited JSON-RPC through `ToolServer::serve` with an
//! in-memory emulator and checks the responses a client would see.

use localdock::emulator::MockEmulator;
use localdock::server::ToolServer;
use localdock::tools::ToolRegistry;
use localdock::LocaldockConfig;
use serde_json::{json, Value};
use std::fs;
use std::sync::Arc;
use tempfile::TempDir;

async fn run_session(mock: Arc<MockEmulator>, requests: &[Value]) -> Vec<Value> {
    let server = ToolServer::new(ToolRegistry::with_api(LocaldockConfig::default(), mock));
    let input: String = requests.iter().map(|r| format!("{}\n", r)).collect();
    let mut output = Vec::new();

    server.serve(input.as_bytes(), &mut output).await.unwrap();

    String::from_utf8(output)
        .unwrap()
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect()
}

fn call(id: u64, tool: &str, arguments: Value) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "method": "tools/call",
        "params": {"name": tool, "arguments": arguments}
    })
}

fn tool_payload(response: &Value) -> Value {
    let text = response["result"]["content"][0]["text"].as_str().unwrap();
    serde_json::from_str(text).unwrap()
}

#[tokio::test]
async fn test_export_then_import_session() {
    let dir = TempDir::new().unwrap();
    let snapshot = dir.path().join("state.json");
    let path = snapshot.to_str().unwrap();

    let source = Arc::new(MockEmulator::new().with_bucket("assets").with_queue("orders"));
    let responses = run_session(
        source,
        &[
            json!({"jsonrpc": "2.0", "id": 1, "method": "initialize", "params": {}}),
            json!({"jsonrpc": "2.0", "method": "notifications/initialized"}),
            call(2, "export_state", json!({"services": ["s3", "sqs"], "output_path": path})),
        ],
    )
    .await;

    assert_eq!(responses.len(), 2);
    let export = tool_payload(&responses[1]);
    assert_eq!(responses[1]["result"]["isError"], false);
    assert_eq!(export["success"], true);
    assert_eq!(export["summary"]["totalResources"], 2);
    assert_eq!(export["services"]["s3"]["resourceCount"], 1);
    assert!(fs::read_to_string(&snapshot).unwrap().contains("\"formatVersion\""));

    let target = Arc::new(MockEmulator::new());
    let responses = run_session(target.clone(), &[call(3, "import_state", json!({"file_path": path}))]).await;

    let import = tool_payload(&responses[0]);
    assert_eq!(import["success"], true);
    assert_eq!(import["summary"]["importedCount"], 2);
    assert_eq!(target.bucket_names(), vec!["assets"]);
    assert_eq!(target.queue_names(), vec!["orders"]);
}

#[tokio::test]
async fn test_import_without_file_path_is_tool_error() {
    let responses = run_session(
        Arc::new(MockEmulator::new()),
        &[call(1, "import_state", json!({}))],
    )
    .await;

    let result = &responses[0]["result"];
    assert_eq!(result["isError"], true);
    assert!(result["content"][0]["text"]
        .as_str()
        .unwrap()
        .contains("Missing 'file_path' parameter"));
}

#[tokio::test]
async fn test_tools_list_advertises_schemas() {
    let responses = run_session(
        Arc::new(MockEmulator::new()),
        &[json!({"jsonrpc": "2.0", "id": 1, "method": "tools/list"})],
    )
    .await;

    let tools = responses[0]["result"]["tools"].as_array().unwrap();
    let import = tools.iter().find(|t| t["name"] == "import_state").unwrap();
    assert_eq!(import["inputSchema"]["required"], json!(["file_path"]));
    let export = tools.iter().find(|t| t["name"] == "export_state").unwrap();
    assert!(export["inputSchema"]["properties"]["services"]["items"]["enum"]
        .as_array()
        .unwrap()
        .contains(&json!("lambda")));
}

#[tokio::test]
async fn test_bad_line_does_not_stop_session() {
    let server = ToolServer::new(ToolRegistry::with_api(
        LocaldockConfig::default(),
        Arc::new(MockEmulator::new()),
    ));
    let input = "not json\n{\"jsonrpc\":\"2.0\",\"id\":9,\"method\":\"ping\"}\n";
    let mut output = Vec::new();

    server.serve(input.as_bytes(), &mut output).await.unwrap();

    let lines: Vec<Value> = String::from_utf8(output)
        .unwrap()
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect();
    assert_eq!(lines[0]["error"]["code"], -32700);
    assert_eq!(lines[1]["id"], 9);
    assert_eq!(lines[1]["result"], json!({}));
}

#[tokio::test]
async fn test_invalid_utf8_line_does_not_stop_session() {
    let server = ToolServer::new(ToolRegistry::with_api(
        LocaldockConfig::default(),
        Arc::new(MockEmulator::new()),
    ));
    let mut input = b"{\"jsonrpc\":\"2.0\",\"id\":1,\"method\":\"ping\"}\n".to_vec();
    input.extend_from_slice(b"{\"jsonrpc\":\"2.0\",\"id\":2,\"method\":\"\xff\"}\n");
    input.extend_from_slice(b"{\"jsonrpc\":\"2.0\",\"id\":3,\"method\":\"ping\"}\n");
    let mut output = Vec::new();

    server.serve(input.as_slice(), &mut output).await.unwrap();

    let lines: Vec<Value> = String::from_utf8(output)
        .unwrap()
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect();
    assert_eq!(lines.len(), 3);
    assert_eq!(lines[0]["id"], 1);
    assert_eq!(lines[1]["error"]["code"], -32700);
    assert_eq!(lines[2]["id"], 3);
    assert_eq!(lines[2]["result"], json!({}));
}

#[tokio::test]
async fn test_network_tool_over_protocol() {
    let responses = run_session(
        Arc::new(MockEmulator::new()),
        &[call(
            1,
            "docker_network_config",
            json!({"services": ["s3", "sqs"], "network_name": "dev-net", "persistence": true}),
        )],
    )
    .await;

    let config = tool_payload(&responses[0]);
    assert_eq!(config["networkName"], "dev-net");
    assert_eq!(config["services"], json!(["s3", "sqs"]));
    assert_eq!(
        config["containerEnvironment"]["AWS_ENDPOINT_URL"],
        "http://localstack:4566"
    );
}
