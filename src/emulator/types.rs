use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::error::EmulatorError;

/// Content type of the AWS JSON 1.0 protocol (DynamoDB, SQS)
pub const AMZ_JSON_1_0: &str = "application/x-amz-json-1.0";

/// A single call into one of the emulated services.
///
/// `service` is the signing name (`s3`, `dynamodb`, ...); the emulator routes
/// on it, so it must always be set.
#[derive(Debug, Clone, PartialEq)]
pub struct EmulatorRequest {
    pub service: String,
    pub method: Method,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
}

impl EmulatorRequest {
    pub fn new(service: impl Into<String>, method: Method, path: impl Into<String>) -> Self {
        Self {
            service: service.into(),
            method,
            path: path.into(),
            query: Vec::new(),
            headers: Vec::new(),
            body: None,
        }
    }

    pub fn get(service: impl Into<String>, path: impl Into<String>) -> Self {
        Self::new(service, Method::GET, path)
    }

    pub fn post(service: impl Into<String>, path: impl Into<String>) -> Self {
        Self::new(service, Method::POST, path)
    }

    pub fn put(service: impl Into<String>, path: impl Into<String>) -> Self {
        Self::new(service, Method::PUT, path)
    }

    /// JSON 1.0 protocol call: `POST /` with an `X-Amz-Target` header
    pub fn json_target(
        service: impl Into<String>,
        target: impl Into<String>,
        body: &serde_json::Value,
    ) -> Self {
        Self::post(service, "/")
            .with_header("X-Amz-Target", target)
            .with_header("Content-Type", AMZ_JSON_1_0)
            .with_body(body.to_string())
    }

    /// Query protocol call: `POST /?Action=...&Version=...`
    pub fn query_action(service: impl Into<String>, action: &str, version: &str) -> Self {
        Self::post(service, "/")
            .with_query("Action", action)
            .with_query("Version", version)
    }

    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((key.into(), value.into()));
        self
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    pub fn header(&self, key: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
    }

    pub fn query_param(&self, key: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Operation name of a JSON 1.0 call, e.g. `ListTables`
    pub fn target_operation(&self) -> Option<&str> {
        self.header("X-Amz-Target")
            .map(|t| t.rsplit('.').next().unwrap_or(t))
    }
}

/// Successful response from the emulator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmulatorResponse {
    pub status: u16,
    pub body: String,
}

impl EmulatorResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn ok(body: impl Into<String>) -> Self {
        Self::new(200, body)
    }

    /// Decodes a JSON body. An empty body decodes as `{}`.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, EmulatorError> {
        let body = if self.body.trim().is_empty() {
            "{}"
        } else {
            self.body.as_str()
        };
        serde_json::from_str(body)
            .map_err(|e| EmulatorError::invalid_response(format!("malformed JSON: {}", e)))
    }

    pub fn xml(&self) -> Result<roxmltree::Document<'_>, EmulatorError> {
        roxmltree::Document::parse(&self.body)
            .map_err(|e| EmulatorError::invalid_response(format!("malformed XML: {}", e)))
    }
}

/// Body of the emulator health endpoint
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmulatorHealth {
    #[serde(default)]
    pub services: BTreeMap<String, String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub edition: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

impl EmulatorHealth {
    pub fn status_of(&self, service: &str) -> Option<&str> {
        self.services.get(service).map(String::as_str)
    }

    /// `running` means started, `available` means it starts on first use
    pub fn is_usable(&self, service: &str) -> bool {
        matches!(self.status_of(service), Some("running") | Some("available"))
    }

    pub fn running_services(&self) -> Vec<&str> {
        self.services
            .iter()
            .filter(|(_, status)| status.as_str() == "running")
            .map(|(name, _)| name.as_str())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_json_target_request() {
        let request = EmulatorRequest::json_target(
            "dynamodb",
            "DynamoDB_20120810.ListTables",
            &json!({}),
        );

        assert_eq!(request.method, Method::POST);
        assert_eq!(request.path, "/");
        assert_eq!(request.header("x-amz-target"), Some("DynamoDB_20120810.ListTables"));
        assert_eq!(request.target_operation(), Some("ListTables"));
        assert_eq!(request.body.as_deref(), Some("{}"));
    }

    #[test]
    fn test_query_action_request() {
        let request = EmulatorRequest::query_action("sns", "ListTopics", "2010-03-31");
        assert_eq!(request.query_param("Action"), Some("ListTopics"));
        assert_eq!(request.query_param("Version"), Some("2010-03-31"));
        assert!(request.target_operation().is_none());
    }

    #[test]
    fn test_empty_body_decodes_as_object() {
        let response = EmulatorResponse::ok("");
        let value: serde_json::Value = response.json().unwrap();
        assert_eq!(value, json!({}));
    }

    #[test]
    fn test_malformed_json_is_invalid_response() {
        let response = EmulatorResponse::ok("{not json");
        let result: Result<serde_json::Value, _> = response.json();
        assert!(matches!(
            result,
            Err(EmulatorError::InvalidResponse { .. })
        ));
    }

    #[test]
    fn test_health_parsing() {
        let health: EmulatorHealth = serde_json::from_value(json!({
            "services": {"s3": "running", "sqs": "available", "kms": "disabled"},
            "edition": "community",
            "version": "3.0.2"
        }))
        .unwrap();

        assert!(health.is_usable("s3"));
        assert!(health.is_usable("sqs"));
        assert!(!health.is_usable("kms"));
        assert!(!health.is_usable("lambda"));
        assert_eq!(health.running_services(), vec!["s3"]);
        assert_eq!(health.version.as_deref(), Some("3.0.2"));
    }
}
