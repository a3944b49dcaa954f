//! Emulator client errors

use std::time::Duration;
use thiserror::Error;

/// Errors returned by calls into the emulator.
///
/// The client never retries; callers decide whether an error is fatal or
/// should be degraded into an empty result.
#[derive(Debug, Clone, Error)]
pub enum EmulatorError {
    /// Nothing is listening at the endpoint
    #[error("Cannot connect to emulator at {endpoint}: {message}")]
    Unreachable { endpoint: String, message: String },

    /// The request did not complete in time
    #[error("Request to emulator timed out after {}s", .after.as_secs())]
    Timeout { after: Duration },

    /// The emulator answered with a non-2xx status
    #[error("Emulator returned {status}{}: {message}", .code.as_ref().map(|c| format!(" ({})", c)).unwrap_or_default())]
    Status {
        status: u16,
        code: Option<String>,
        message: String,
    },

    /// The response body could not be decoded
    #[error("Invalid response from emulator: {message}")]
    InvalidResponse { message: String },

    /// Any other transport failure
    #[error("Network error: {message}")]
    Network { message: String },
}

impl EmulatorError {
    pub fn invalid_response(message: impl Into<String>) -> Self {
        EmulatorError::InvalidResponse {
            message: message.into(),
        }
    }

    /// True when the failure means the emulator itself is not reachable
    pub fn is_connectivity(&self) -> bool {
        matches!(
            self,
            EmulatorError::Unreachable { .. } | EmulatorError::Timeout { .. }
        )
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            EmulatorError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Service error code such as `BucketAlreadyOwnedByYou`
    pub fn code(&self) -> Option<&str> {
        match self {
            EmulatorError::Status { code, .. } => code.as_deref(),
            _ => None,
        }
    }

    pub(crate) fn from_reqwest(err: reqwest::Error, endpoint: &str, timeout: Duration) -> Self {
        if err.is_timeout() {
            EmulatorError::Timeout { after: timeout }
        } else if err.is_connect() {
            EmulatorError::Unreachable {
                endpoint: endpoint.to_string(),
                message: err.to_string(),
            }
        } else {
            EmulatorError::Network {
                message: err.to_string(),
            }
        }
    }

    /// Builds a `Status` error from an error response body.
    ///
    /// JSON protocols put the code in `__type` (optionally prefixed with a
    /// namespace and `#`), XML protocols in `<Code>`.
    pub fn from_response(status: u16, body: &str) -> Self {
        let (code, message) = parse_error_body(body);
        EmulatorError::Status {
            status,
            code,
            message: message.unwrap_or_else(|| format!("HTTP {}", status)),
        }
    }
}

fn parse_error_body(body: &str) -> (Option<String>, Option<String>) {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return (None, None);
    }

    if trimmed.starts_with('{') {
        if let Ok(value) = serde_json::from_str::<serde_json::Value>(trimmed) {
            let code = value["__type"]
                .as_str()
                .or_else(|| value["code"].as_str())
                .map(|t| t.rsplit('#').next().unwrap_or(t).to_string());
            let message = value["message"]
                .as_str()
                .or_else(|| value["Message"].as_str())
                .map(str::to_string);
            return (code, message);
        }
    }

    if trimmed.starts_with('<') {
        if let Ok(doc) = roxmltree::Document::parse(trimmed) {
            let text_of = |name: &str| {
                doc.descendants()
                    .find(|n| n.has_tag_name(name))
                    .and_then(|n| n.text())
                    .map(|t| t.trim().to_string())
            };
            return (text_of("Code"), text_of("Message"));
        }
    }

    (None, Some(trimmed.chars().take(200).collect()))
}
