//! Emulator health checks
//!
//! Reads the LocalStack health endpoint once ([`HealthChecker::check`]) or
//! polls it until the requested services are usable
//! ([`HealthChecker::wait_until_ready`]).

use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use crate::emulator::{EmulatorApi, EmulatorHealth};
use crate::snapshot::ServiceKind;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthReport {
    pub endpoint: String,
    pub reachable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub edition: Option<String>,
    /// Service name to status as reported by the emulator
    pub services: BTreeMap<String, String>,
    pub running_count: usize,
    pub available_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub recommendations: Vec<String>,
}

impl HealthReport {
    fn from_health(endpoint: &str, health: EmulatorHealth) -> Self {
        let running_count = health.running_services().len();
        let available_count = health
            .services
            .values()
            .filter(|s| s.as_str() == "available")
            .count();

        let mut recommendations = Vec::new();
        let missing: Vec<&str> = ServiceKind::ALL
            .iter()
            .map(|k| k.as_str())
            .filter(|name| !health.is_usable(name))
            .collect();
        if !missing.is_empty() {
            recommendations.push(format!(
                "Snapshot services not enabled: {}; add them to SERVICES in the localstack container",
                missing.join(", ")
            ));
        }
        if running_count == 0 && available_count > 0 {
            recommendations.push(
                "Services start lazily on first use; the first request may be slow".to_string(),
            );
        }

        Self {
            endpoint: endpoint.to_string(),
            reachable: true,
            version: health.version,
            edition: health.edition,
            services: health.services,
            running_count,
            available_count,
            error: None,
            recommendations,
        }
    }

    fn unreachable(endpoint: &str, error: String) -> Self {
        Self {
            endpoint: endpoint.to_string(),
            reachable: false,
            version: None,
            edition: None,
            services: BTreeMap::new(),
            running_count: 0,
            available_count: 0,
            error: Some(error),
            recommendations: vec![
                "Start LocalStack: docker compose up -d localstack (or: localstack start -d)".to_string(),
                format!("Verify the endpoint responds: curl {}/_localstack/health", endpoint),
                "Set LOCALDOCK_ENDPOINT if LocalStack listens elsewhere".to_string(),
            ],
        }
    }

    /// True when every named service is `running` or `available`
    pub fn is_ready_for(&self, services: &[String]) -> bool {
        self.reachable && self.not_ready(services).is_empty()
    }

    fn not_ready(&self, services: &[String]) -> Vec<String> {
        services
            .iter()
            .filter(|s| {
                !matches!(
                    self.services.get(s.as_str()).map(String::as_str),
                    Some("running") | Some("available")
                )
            })
            .cloned()
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Readiness {
    pub ready: bool,
    pub attempts: u32,
    /// Requested services still not usable at the last attempt
    pub pending: Vec<String>,
    pub report: HealthReport,
}

pub struct HealthChecker {
    api: Arc<dyn EmulatorApi>,
    timeout: Duration,
}

impl HealthChecker {
    pub fn new(api: Arc<dyn EmulatorApi>, timeout: Duration) -> Self {
        Self { api, timeout }
    }

    pub async fn check(&self) -> HealthReport {
        let endpoint = self.api.endpoint();
        match self.api.health(self.timeout).await {
            Ok(health) => {
                debug!(endpoint = %endpoint, services = health.services.len(), "Emulator healthy");
                HealthReport::from_health(endpoint, health)
            }
            Err(e) => HealthReport::unreachable(endpoint, e.to_string()),
        }
    }

    /// Polls until every service in `services` is usable, at most `attempts`
    /// times. An empty list waits only for the endpoint to answer.
    pub async fn wait_until_ready(
        &self,
        services: &[String],
        attempts: u32,
        interval: Duration,
    ) -> Readiness {
        let attempts = attempts.max(1);
        let mut attempt = 0;

        loop {
            attempt += 1;
            let report = self.check().await;
            let pending = if report.reachable {
                report.not_ready(services)
            } else {
                services.to_vec()
            };

            if report.reachable && pending.is_empty() {
                info!(attempt, "Emulator ready");
                return Readiness {
                    ready: true,
                    attempts: attempt,
                    pending,
                    report,
                };
            }
            if attempt >= attempts {
                info!(attempt, pending = %pending.join(","), "Emulator not ready, giving up");
                return Readiness {
                    ready: false,
                    attempts: attempt,
                    pending,
                    report,
                };
            }

            debug!(attempt, pending = %pending.join(","), "Waiting for emulator");
            tokio::time::sleep(interval).await;
        }
    }
}
