//! In-memory emulator for tests and offline use
//!
//! Speaks the same wire formats as the real emulator for the subset of
//! operations localdock issues, keeps created resources in memory, and lets
//! tests inject failures for individual operations.

use async_trait::async_trait;
use reqwest::Method;
use serde_json::{json, Value};
use std::collections::{BTreeMap, HashSet};
use std::sync::Mutex;
use std::time::Duration;

use super::client::EmulatorApi;
use super::error::EmulatorError;
use super::types::{EmulatorHealth, EmulatorRequest, EmulatorResponse};

const MOCK_ENDPOINT: &str = "http://mock-emulator:4566";
const ACCOUNT_ID: &str = "000000000000";
const REGION: &str = "us-east-1";

#[derive(Debug, Clone)]
struct MockObject {
    key: String,
    size: u64,
}

#[derive(Debug, Clone)]
struct MockBucket {
    name: String,
    objects: Vec<MockObject>,
}

#[derive(Debug, Clone)]
struct MockTable {
    name: String,
    hash_key: String,
    items: u64,
}

#[derive(Debug, Clone)]
struct MockFunction {
    name: String,
    runtime: String,
}

#[derive(Debug, Default)]
struct MockState {
    buckets: Vec<MockBucket>,
    tables: Vec<MockTable>,
    queues: Vec<String>,
    topics: Vec<String>,
    functions: Vec<MockFunction>,
}

pub struct MockEmulator {
    state: Mutex<MockState>,
    faults: Mutex<HashSet<String>>,
    calls: Mutex<Vec<String>>,
    online: bool,
}

impl MockEmulator {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(MockState::default()),
            faults: Mutex::new(HashSet::new()),
            calls: Mutex::new(Vec::new()),
            online: true,
        }
    }

    /// An emulator whose every call fails as unreachable
    pub fn offline() -> Self {
        Self {
            online: false,
            ..Self::new()
        }
    }

    pub fn with_bucket(self, name: &str) -> Self {
        self.state.lock().unwrap().buckets.push(MockBucket {
            name: name.to_string(),
            objects: Vec::new(),
        });
        self
    }

    pub fn with_object(self, bucket: &str, key: &str, size: u64) -> Self {
        {
            let mut state = self.state.lock().unwrap();
            if let Some(b) = state.buckets.iter_mut().find(|b| b.name == bucket) {
                b.objects.push(MockObject {
                    key: key.to_string(),
                    size,
                });
            }
        }
        self
    }

    pub fn with_table(self, name: &str, hash_key: &str, items: u64) -> Self {
        self.state.lock().unwrap().tables.push(MockTable {
            name: name.to_string(),
            hash_key: hash_key.to_string(),
            items,
        });
        self
    }

    pub fn with_queue(self, name: &str) -> Self {
        self.state.lock().unwrap().queues.push(name.to_string());
        self
    }

    pub fn with_topic(self, name: &str) -> Self {
        self.state.lock().unwrap().topics.push(name.to_string());
        self
    }

    pub fn with_function(self, name: &str, runtime: &str) -> Self {
        self.state.lock().unwrap().functions.push(MockFunction {
            name: name.to_string(),
            runtime: runtime.to_string(),
        });
        self
    }

    /// Makes `operation` of `service` fail with a 500.
    ///
    /// Operation keys: `ListBuckets`, `ListObjects:<bucket>`,
    /// `CreateBucket:<bucket>`, `ListTables`, `DescribeTable:<table>`,
    /// `Scan:<table>`, `ListQueues`, `CreateQueue:<queue>`, `ListTopics`,
    /// `ListFunctions`.
    pub fn fail(self, service: &str, operation: &str) -> Self {
        self.faults
            .lock()
            .unwrap()
            .insert(format!("{}:{}", service, operation));
        self
    }

    pub fn bucket_names(&self) -> Vec<String> {
        let state = self.state.lock().unwrap();
        state.buckets.iter().map(|b| b.name.clone()).collect()
    }

    pub fn queue_names(&self) -> Vec<String> {
        self.state.lock().unwrap().queues.clone()
    }

    /// Every operation key received, in order, as `service:operation`
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn queue_url(name: &str) -> String {
        format!("{}/{}/{}", MOCK_ENDPOINT, ACCOUNT_ID, name)
    }

    fn operation_key(request: &EmulatorRequest) -> String {
        let resource = request.path.trim_start_matches('/');
        let json_body: Value = request
            .body
            .as_deref()
            .and_then(|b| serde_json::from_str(b).ok())
            .unwrap_or(Value::Null);

        let operation = match request.service.as_str() {
            "s3" if request.method == Method::GET && resource.is_empty() => {
                "ListBuckets".to_string()
            }
            "s3" if request.method == Method::GET => format!("ListObjects:{}", resource),
            "s3" if request.method == Method::PUT && !resource.is_empty() => {
                format!("CreateBucket:{}", resource)
            }
            "dynamodb" => match request.target_operation() {
                Some(op @ ("DescribeTable" | "Scan")) => {
                    format!("{}:{}", op, json_body["TableName"].as_str().unwrap_or(""))
                }
                Some(op) => op.to_string(),
                None => "Unsupported".to_string(),
            },
            "sqs" => match request.target_operation() {
                Some("CreateQueue") => format!(
                    "CreateQueue:{}",
                    json_body["QueueName"].as_str().unwrap_or("")
                ),
                Some(op) => op.to_string(),
                None => "Unsupported".to_string(),
            },
            "sns" => request.query_param("Action").unwrap_or("Unsupported").to_string(),
            "lambda" if resource.starts_with("2015-03-31/functions") => {
                "ListFunctions".to_string()
            }
            _ => "Unsupported".to_string(),
        };

        format!("{}:{}", request.service, operation)
    }

    fn injected_failure(key: &str) -> EmulatorError {
        EmulatorError::Status {
            status: 500,
            code: Some("InternalError".to_string()),
            message: format!("injected failure for {}", key),
        }
    }

    fn not_found(code: &str, message: String) -> EmulatorError {
        EmulatorError::Status {
            status: 400,
            code: Some(code.to_string()),
            message,
        }
    }

    fn handle(&self, key: &str, request: &EmulatorRequest) -> Result<EmulatorResponse, EmulatorError> {
        let mut state = self.state.lock().unwrap();
        let (service, operation) = key.split_once(':').unwrap_or((key, ""));
        let (op, arg) = operation.split_once(':').unwrap_or((operation, ""));

        match (service, op) {
            ("s3", "ListBuckets") => {
                let buckets: String = state
                    .buckets
                    .iter()
                    .map(|b| {
                        format!(
                            "<Bucket><Name>{}</Name><CreationDate>2024-01-01T00:00:00.000Z</CreationDate></Bucket>",
                            b.name
                        )
                    })
                    .collect();
                Ok(EmulatorResponse::ok(format!(
                    "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\
                     <ListAllMyBucketsResult xmlns=\"http://s3.amazonaws.com/doc/2006-03-01/\">\
                     <Owner><ID>{}</ID></Owner><Buckets>{}</Buckets></ListAllMyBucketsResult>",
                    ACCOUNT_ID, buckets
                )))
            }
            ("s3", "ListObjects") => {
                let bucket = state
                    .buckets
                    .iter()
                    .find(|b| b.name == arg)
                    .ok_or_else(|| EmulatorError::Status {
                        status: 404,
                        code: Some("NoSuchBucket".to_string()),
                        message: "The specified bucket does not exist".to_string(),
                    })?;
                let contents: String = bucket
                    .objects
                    .iter()
                    .map(|o| {
                        format!(
                            "<Contents><Key>{}</Key><LastModified>2024-01-02T00:00:00.000Z</LastModified>\
                             <ETag>&quot;etag-{}&quot;</ETag><Size>{}</Size></Contents>",
                            o.key, o.key, o.size
                        )
                    })
                    .collect();
                Ok(EmulatorResponse::ok(format!(
                    "<ListBucketResult xmlns=\"http://s3.amazonaws.com/doc/2006-03-01/\">\
                     <Name>{}</Name><KeyCount>{}</KeyCount><IsTruncated>false</IsTruncated>{}</ListBucketResult>",
                    bucket.name,
                    bucket.objects.len(),
                    contents
                )))
            }
            ("s3", "CreateBucket") => {
                if state.buckets.iter().any(|b| b.name == arg) {
                    return Err(EmulatorError::from_response(
                        409,
                        "<Error><Code>BucketAlreadyOwnedByYou</Code>\
                         <Message>Your previous request to create the named bucket succeeded and you already own it.</Message></Error>",
                    ));
                }
                state.buckets.push(MockBucket {
                    name: arg.to_string(),
                    objects: Vec::new(),
                });
                Ok(EmulatorResponse::ok(""))
            }
            ("dynamodb", "ListTables") => {
                let names: Vec<&str> = state.tables.iter().map(|t| t.name.as_str()).collect();
                Ok(EmulatorResponse::ok(json!({ "TableNames": names }).to_string()))
            }
            ("dynamodb", "DescribeTable") => {
                let table = state.tables.iter().find(|t| t.name == arg).ok_or_else(|| {
                    Self::not_found(
                        "ResourceNotFoundException",
                        format!("Requested resource not found: Table: {} not found", arg),
                    )
                })?;
                Ok(EmulatorResponse::ok(
                    json!({
                        "Table": {
                            "TableName": table.name,
                            "TableStatus": "ACTIVE",
                            "KeySchema": [{"AttributeName": table.hash_key, "KeyType": "HASH"}],
                            "AttributeDefinitions": [{"AttributeName": table.hash_key, "AttributeType": "S"}],
                            "ItemCount": 0
                        }
                    })
                    .to_string(),
                ))
            }
            ("dynamodb", "Scan") => {
                let table = state.tables.iter().find(|t| t.name == arg).ok_or_else(|| {
                    Self::not_found(
                        "ResourceNotFoundException",
                        "Requested resource not found".to_string(),
                    )
                })?;
                Ok(EmulatorResponse::ok(
                    json!({ "Count": table.items, "ScannedCount": table.items }).to_string(),
                ))
            }
            ("sqs", "ListQueues") => {
                if state.queues.is_empty() {
                    return Ok(EmulatorResponse::ok("{}"));
                }
                let urls: Vec<String> = state.queues.iter().map(|q| Self::queue_url(q)).collect();
                Ok(EmulatorResponse::ok(json!({ "QueueUrls": urls }).to_string()))
            }
            ("sqs", "CreateQueue") => {
                if !state.queues.iter().any(|q| q == arg) {
                    state.queues.push(arg.to_string());
                }
                Ok(EmulatorResponse::ok(
                    json!({ "QueueUrl": Self::queue_url(arg) }).to_string(),
                ))
            }
            ("sns", "ListTopics") => {
                let members: String = state
                    .topics
                    .iter()
                    .map(|t| {
                        format!(
                            "<member><TopicArn>arn:aws:sns:{}:{}:{}</TopicArn></member>",
                            REGION, ACCOUNT_ID, t
                        )
                    })
                    .collect();
                Ok(EmulatorResponse::ok(format!(
                    "<ListTopicsResponse xmlns=\"http://sns.amazonaws.com/doc/2010-03-31/\">\
                     <ListTopicsResult><Topics>{}</Topics></ListTopicsResult>\
                     <ResponseMetadata><RequestId>mock</RequestId></ResponseMetadata></ListTopicsResponse>",
                    members
                )))
            }
            ("lambda", "ListFunctions") => {
                let functions: Vec<Value> = state
                    .functions
                    .iter()
                    .map(|f| {
                        json!({
                            "FunctionName": f.name,
                            "FunctionArn": format!("arn:aws:lambda:{}:{}:function:{}", REGION, ACCOUNT_ID, f.name),
                            "Runtime": f.runtime,
                            "Handler": "index.handler",
                            "Description": "",
                            "Timeout": 3,
                            "MemorySize": 128,
                            "CodeSize": 1024
                        })
                    })
                    .collect();
                Ok(EmulatorResponse::ok(json!({ "Functions": functions }).to_string()))
            }
            _ => Err(EmulatorError::Status {
                status: 501,
                code: Some("NotImplemented".to_string()),
                message: format!(
                    "mock emulator does not support {} {}",
                    request.method, request.path
                ),
            }),
        }
    }

    fn unreachable() -> EmulatorError {
        EmulatorError::Unreachable {
            endpoint: MOCK_ENDPOINT.to_string(),
            message: "connection refused".to_string(),
        }
    }
}

impl Default for MockEmulator {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EmulatorApi for MockEmulator {
    async fn call(&self, request: EmulatorRequest) -> Result<EmulatorResponse, EmulatorError> {
        if !self.online {
            return Err(Self::unreachable());
        }

        let key = Self::operation_key(&request);
        self.calls.lock().unwrap().push(key.clone());

        if self.faults.lock().unwrap().contains(&key) {
            return Err(Self::injected_failure(&key));
        }

        self.handle(&key, &request)
    }

    async fn health(&self, _timeout: Duration) -> Result<EmulatorHealth, EmulatorError> {
        if !self.online {
            return Err(Self::unreachable());
        }

        let services: BTreeMap<String, String> = ["s3", "dynamodb", "sqs", "sns", "lambda"]
            .iter()
            .map(|s| (s.to_string(), "running".to_string()))
            .collect();

        Ok(EmulatorHealth {
            services,
            edition: Some("community".to_string()),
            version: Some("3.0.2".to_string()),
        })
    }

    fn endpoint(&self) -> &str {
        MOCK_ENDPOINT
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_bucket_twice_conflicts() {
        let mock = MockEmulator::new();

        mock.call(EmulatorRequest::put("s3", "/data")).await.unwrap();
        let err = mock
            .call(EmulatorRequest::put("s3", "/data"))
            .await
            .unwrap_err();

        assert_eq!(err.status(), Some(409));
        assert_eq!(err.code(), Some("BucketAlreadyOwnedByYou"));
        assert_eq!(mock.bucket_names(), vec!["data".to_string()]);
    }

    #[tokio::test]
    async fn test_fault_injection_and_call_log() {
        let mock = MockEmulator::new().fail("sqs", "ListQueues");
        let request = EmulatorRequest::json_target("sqs", "AmazonSQS.ListQueues", &json!({}));

        let err = mock.call(request).await.unwrap_err();
        assert_eq!(err.status(), Some(500));
        assert_eq!(mock.calls(), vec!["sqs:ListQueues".to_string()]);
    }

    #[tokio::test]
    async fn test_offline_mock() {
        let mock = MockEmulator::offline();
        assert!(mock.health(Duration::from_secs(1)).await.unwrap_err().is_connectivity());
        assert!(mock
            .call(EmulatorRequest::get("s3", "/"))
            .await
            .unwrap_err()
            .is_connectivity());
    }
}
