//! Line-delimited JSON-RPC 2.0 server over stdio
//!
//! Implements the subset of the Model Context Protocol needed to expose the
//! [`ToolRegistry`]: `initialize`, `ping`, `tools/list` and `tools/call`.
//! Every request is one JSON object per line; every response is written the
//! same way. Requests without an `id` are notifications and get no reply.

use serde_json::{json, Value};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tracing::{debug, info, warn};

use crate::tools::ToolRegistry;
use crate::{NAME, VERSION};

/// Protocol revision announced in `initialize`
pub const PROTOCOL_VERSION: &str = "2024-11-05";

/// Standard JSON-RPC 2.0 error codes
pub mod codes {
    pub const PARSE_ERROR: i32 = -32700;
    pub const INVALID_REQUEST: i32 = -32600;
    pub const METHOD_NOT_FOUND: i32 = -32601;
    pub const INVALID_PARAMS: i32 = -32602;
}

fn json_rpc_result(id: Value, result: Value) -> Value {
    json!({ "jsonrpc": "2.0", "id": id, "result": result })
}

fn json_rpc_error(id: Value, code: i32, message: &str) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "error": { "code": code, "message": message }
    })
}

pub struct ToolServer {
    registry: ToolRegistry,
}

impl ToolServer {
    pub fn new(registry: ToolRegistry) -> Self {
        Self { registry }
    }

    /// Serves stdin/stdout until stdin closes
    pub async fn serve_stdio(&self) -> std::io::Result<()> {
        if atty::is(atty::Stream::Stdin) {
            eprintln!(
                "{} is waiting for JSON-RPC requests on stdin, one per line. \
                 Configure it as a stdio tool server in your MCP client instead of running it directly.",
                NAME
            );
        }
        self.serve(BufReader::new(tokio::io::stdin()), tokio::io::stdout())
            .await
    }

    pub async fn serve<R, W>(&self, mut reader: R, mut writer: W) -> std::io::Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        info!(tools = self.registry.len(), "Tool server started");
        let mut buf = Vec::new();

        loop {
            buf.clear();
            if reader.read_until(b'\n', &mut buf).await? == 0 {
                break;
            }

            let response = match std::str::from_utf8(&buf) {
                Ok(line) if line.trim().is_empty() => continue,
                Ok(line) => self.handle_message(line.trim_end()).await,
                Err(e) => {
                    warn!(error = %e, "Request is not valid UTF-8");
                    Some(json_rpc_error(
                        Value::Null,
                        codes::PARSE_ERROR,
                        &format!("Parse error: {}", e),
                    ))
                }
            };

            if let Some(response) = response {
                let mut out = response.to_string();
                out.push('\n');
                writer.write_all(out.as_bytes()).await?;
                writer.flush().await?;
            }
        }

        info!("Input closed, tool server stopping");
        Ok(())
    }

    /// Handles one JSON-RPC message; `None` for notifications
    pub async fn handle_message(&self, text: &str) -> Option<Value> {
        let request: Value = match serde_json::from_str(text) {
            Ok(v) => v,
            Err(e) => {
                warn!(error = %e, "Unparseable request");
                return Some(json_rpc_error(
                    Value::Null,
                    codes::PARSE_ERROR,
                    &format!("Parse error: {}", e),
                ));
            }
        };

        let id = request.get("id").cloned();
        let Some(method) = request.get("method").and_then(|m| m.as_str()) else {
            return Some(json_rpc_error(
                id.unwrap_or(Value::Null),
                codes::INVALID_REQUEST,
                "Invalid request: missing method",
            ));
        };
        let Some(id) = id else {
            debug!(method, "Notification received");
            return None;
        };
        let params = request.get("params").cloned().unwrap_or(Value::Null);
        debug!(method, %id, "Request received");

        let response = match method {
            "initialize" => json_rpc_result(id, self.initialize_result()),
            "ping" => json_rpc_result(id, json!({})),
            "tools/list" => json_rpc_result(id, json!({ "tools": self.registry.definitions() })),
            "tools/call" => self.call_tool(id, &params).await,
            _ => json_rpc_error(
                id,
                codes::METHOD_NOT_FOUND,
                &format!("Method not found: {}", method),
            ),
        };
        Some(response)
    }

    fn initialize_result(&self) -> Value {
        json!({
            "protocolVersion": PROTOCOL_VERSION,
            "capabilities": { "tools": {} },
            "serverInfo": { "name": NAME, "version": VERSION }
        })
    }

    async fn call_tool(&self, id: Value, params: &Value) -> Value {
        let Some(name) = params.get("name").and_then(|n| n.as_str()) else {
            return json_rpc_error(id, codes::INVALID_PARAMS, "Invalid params: missing tool name");
        };
        let Some(tool) = self.registry.get_tool(name) else {
            return json_rpc_error(
                id,
                codes::INVALID_PARAMS,
                &format!("Unknown tool: {}", name),
            );
        };
        let arguments = params
            .get("arguments")
            .cloned()
            .unwrap_or_else(|| json!({}));

        let (text, is_error) = match tool.execute(arguments).await {
            Ok(value) => {
                let failed = value.get("success") == Some(&Value::Bool(false));
                let text = serde_json::to_string_pretty(&value).unwrap_or_else(|_| value.to_string());
                (text, failed)
            }
            Err(e) => {
                warn!(tool = name, error = %e, "Tool call failed");
                (format!("{:#}", e), true)
            }
        };

        json_rpc_result(
            id,
            json!({
                "content": [{ "type": "text", "text": text }],
                "isError": is_error
            }),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LocaldockConfig;
    use crate::emulator::MockEmulator;
    use std::sync::Arc;

    fn server(mock: MockEmulator) -> ToolServer {
        ToolServer::new(ToolRegistry::with_api(
            LocaldockConfig::default(),
            Arc::new(mock),
        ))
    }

    #[tokio::test]
    async fn test_parse_error() {
        let response = server(MockEmulator::new()).handle_message("{not json").await.unwrap();

        assert_eq!(response["error"]["code"], codes::PARSE_ERROR);
        assert!(response["id"].is_null());
    }

    #[tokio::test]
    async fn test_unknown_method() {
        let response = server(MockEmulator::new())
            .handle_message(r#"{"jsonrpc":"2.0","id":7,"method":"resources/list"}"#)
            .await
            .unwrap();

        assert_eq!(response["id"], 7);
        assert_eq!(response["error"]["code"], codes::METHOD_NOT_FOUND);
    }

    #[tokio::test]
    async fn test_notification_has_no_reply() {
        let response = server(MockEmulator::new())
            .handle_message(r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#)
            .await;
        assert!(response.is_none());
    }

    #[tokio::test]
    async fn test_initialize_announces_tools() {
        let response = server(MockEmulator::new())
            .handle_message(r#"{"jsonrpc":"2.0","id":1,"method":"initialize","params":{}}"#)
            .await
            .unwrap();

        assert_eq!(response["result"]["protocolVersion"], PROTOCOL_VERSION);
        assert_eq!(response["result"]["serverInfo"]["name"], NAME);
    }

    #[tokio::test]
    async fn test_failed_export_is_tool_error() {
        let response = server(MockEmulator::offline())
            .handle_message(
                r#"{"jsonrpc":"2.0","id":"a","method":"tools/call","params":{"name":"export_state","arguments":{}}}"#,
            )
            .await
            .unwrap();

        let result = &response["result"];
        assert_eq!(result["isError"], true);
        assert!(result["content"][0]["text"]
            .as_str()
            .unwrap()
            .contains("troubleshooting"));
    }

    #[tokio::test]
    async fn test_unknown_tool_is_invalid_params() {
        let response = server(MockEmulator::new())
            .handle_message(
                r#"{"jsonrpc":"2.0","id":2,"method":"tools/call","params":{"name":"delete_everything"}}"#,
            )
            .await
            .unwrap();

        assert_eq!(response["error"]["code"], codes::INVALID_PARAMS);
    }

    #[tokio::test]
    async fn test_serve_writes_one_line_per_request() {
        let input = concat!(
            r#"{"jsonrpc":"2.0","id":1,"method":"ping"}"#,
            "\n\n",
            r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#,
            "\n",
            r#"{"jsonrpc":"2.0","id":2,"method":"tools/list"}"#,
            "\n"
        );
        let mut output = Vec::new();

        server(MockEmulator::new())
            .serve(input.as_bytes(), &mut output)
            .await
            .unwrap();

        let lines: Vec<Value> = String::from_utf8(output)
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["id"], 1);
        assert_eq!(lines[1]["result"]["tools"].as_array().unwrap().len(), 5);
    }
}
