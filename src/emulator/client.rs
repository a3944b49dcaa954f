//! HTTP client for the local AWS emulator
//!
//! Every call goes to the configured base URL and carries a placeholder
//! SigV4 `Authorization` header. The emulator reads the credential scope to
//! route the request to a service but does not verify the signature.
//!
//! # Example
//!
//! ```no_run
//! use localdock::emulator::{EmulatorApi, EmulatorRequest, HttpEmulatorClient};
//! use localdock::LocaldockConfig;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = HttpEmulatorClient::new(&LocaldockConfig::default())?;
//! let response = client.call(EmulatorRequest::get("s3", "/")).await?;
//! println!("{}", response.body);
//! # Ok(())
//! # }
//! ```

use async_trait::async_trait;
use chrono::Utc;
use reqwest::header::AUTHORIZATION;
use reqwest::Client;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use super::error::EmulatorError;
use super::types::{EmulatorHealth, EmulatorRequest, EmulatorResponse};
use crate::config::LocaldockConfig;

/// Path of the emulator health endpoint
pub const HEALTH_PATH: &str = "/_localstack/health";

const PLACEHOLDER_ACCESS_KEY: &str = "test";
const PLACEHOLDER_SIGNATURE: &str =
    "0000000000000000000000000000000000000000000000000000000000000000";

/// Access to the emulator's service endpoints.
///
/// Implemented over HTTP by [`HttpEmulatorClient`] and in memory by
/// [`crate::emulator::MockEmulator`].
#[async_trait]
pub trait EmulatorApi: Send + Sync {
    /// Sends one request. Non-2xx answers are returned as `EmulatorError::Status`.
    async fn call(&self, request: EmulatorRequest) -> Result<EmulatorResponse, EmulatorError>;

    /// Reads the health endpoint, giving up after `timeout`
    async fn health(&self, timeout: Duration) -> Result<EmulatorHealth, EmulatorError>;

    fn endpoint(&self) -> &str;
}

pub struct HttpEmulatorClient {
    endpoint: String,
    region: String,
    http_client: Client,
    request_timeout: Duration,
}

impl HttpEmulatorClient {
    pub fn new(config: &LocaldockConfig) -> Result<Self, EmulatorError> {
        let request_timeout = config.request_timeout();
        let http_client = Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| EmulatorError::Network {
                message: format!("Failed to build HTTP client: {}", e),
            })?;

        Ok(Self {
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            region: config.region.clone(),
            http_client,
            request_timeout,
        })
    }

    /// Placeholder SigV4 header for `service`
    pub fn authorization_header(&self, service: &str) -> String {
        format!(
            "AWS4-HMAC-SHA256 Credential={}/{}/{}/{}/aws4_request, SignedHeaders=host;x-amz-date, Signature={}",
            PLACEHOLDER_ACCESS_KEY,
            Utc::now().format("%Y%m%d"),
            self.region,
            service,
            PLACEHOLDER_SIGNATURE
        )
    }

    fn url(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{}", self.endpoint, path)
        } else {
            format!("{}/{}", self.endpoint, path)
        }
    }
}

#[async_trait]
impl EmulatorApi for HttpEmulatorClient {
    async fn call(&self, request: EmulatorRequest) -> Result<EmulatorResponse, EmulatorError> {
        let url = self.url(&request.path);
        let start = Instant::now();

        let mut builder = self
            .http_client
            .request(request.method.clone(), &url)
            .header(AUTHORIZATION, self.authorization_header(&request.service))
            .header("x-amz-date", Utc::now().format("%Y%m%dT%H%M%SZ").to_string());

        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        for (key, value) in &request.headers {
            builder = builder.header(key.as_str(), value.as_str());
        }
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| EmulatorError::from_reqwest(e, &self.endpoint, self.request_timeout))?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| EmulatorError::from_reqwest(e, &self.endpoint, self.request_timeout))?;

        debug!(
            service = %request.service,
            method = %request.method,
            path = %request.path,
            status,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Emulator call completed"
        );

        if (200..300).contains(&status) {
            Ok(EmulatorResponse::new(status, body))
        } else {
            Err(EmulatorError::from_response(status, &body))
        }
    }

    async fn health(&self, timeout: Duration) -> Result<EmulatorHealth, EmulatorError> {
        let url = self.url(HEALTH_PATH);
        debug!("Checking emulator health at {}", url);

        let response = self
            .http_client
            .get(&url)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| {
                let err = EmulatorError::from_reqwest(e, &self.endpoint, timeout);
                warn!(error = %err, "Emulator health check failed");
                err
            })?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| EmulatorError::from_reqwest(e, &self.endpoint, timeout))?;

        if !(200..300).contains(&status) {
            return Err(EmulatorError::from_response(status, &body));
        }

        EmulatorResponse::new(status, body).json()
    }

    fn endpoint(&self) -> &str {
        &self.endpoint
    }
}
