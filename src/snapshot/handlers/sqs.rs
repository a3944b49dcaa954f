use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use super::{state_mismatch, Extraction, Reconstruction, ServiceHandler, MAX_PAGES};
use crate::emulator::{EmulatorApi, EmulatorError, EmulatorRequest};
use crate::snapshot::error::SnapshotError;
use crate::snapshot::kind::ServiceKind;
use crate::snapshot::model::{ServiceState, SqsState};

const SERVICE: &str = "sqs";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ListQueuesOutput {
    // Omitted entirely when there are no queues
    #[serde(default)]
    queue_urls: Vec<String>,
    next_token: Option<String>,
}

fn request(operation: &str, body: Value) -> EmulatorRequest {
    EmulatorRequest::json_target(SERVICE, format!("AmazonSQS.{}", operation), &body)
}

/// Queue name from a queue URL such as
/// `http://localhost:4566/000000000000/orders`. A bare name is returned as is.
pub fn queue_name_from_url(url: &str) -> Option<String> {
    let url = url.trim();
    if url.is_empty() {
        return None;
    }
    if !url.contains('/') {
        return Some(url.to_string());
    }

    let parsed = reqwest::Url::parse(url).ok()?;
    parsed
        .path_segments()?
        .filter(|s| !s.is_empty())
        .last()
        .map(str::to_string)
}

/// Queue URLs. Attributes and messages are not captured.
pub struct SqsHandler;

async fn list_queues(api: &dyn EmulatorApi) -> Result<Vec<String>, EmulatorError> {
    let mut urls = Vec::new();
    let mut token: Option<String> = None;

    for _ in 0..MAX_PAGES {
        let mut body = json!({ "MaxResults": 1000 });
        if let Some(next) = token.take() {
            body["NextToken"] = Value::String(next);
        }
        let page: ListQueuesOutput = api.call(request("ListQueues", body)).await?.json()?;
        urls.extend(page.queue_urls);

        token = page.next_token;
        if token.is_none() {
            break;
        }
    }

    Ok(urls)
}

fn create_queue_request(name: &str) -> EmulatorRequest {
    let body = if name.ends_with(".fifo") {
        json!({ "QueueName": name, "Attributes": { "FifoQueue": "true" } })
    } else {
        json!({ "QueueName": name })
    };
    request("CreateQueue", body)
}

#[async_trait]
impl ServiceHandler for SqsHandler {
    fn kind(&self) -> ServiceKind {
        ServiceKind::Sqs
    }

    async fn extract(&self, api: &dyn EmulatorApi, _include_details: bool) -> Extraction {
        match list_queues(api).await {
            Ok(urls) => {
                info!(service = SERVICE, queues = urls.len(), "Extracted queues");
                Extraction::complete(ServiceState::Sqs(SqsState::new(urls)))
            }
            Err(e) => {
                warn!(service = SERVICE, error = %e, "Queue listing failed, exporting no queues");
                Extraction::degraded(ServiceKind::Sqs, &e)
            }
        }
    }

    async fn reconstruct(
        &self,
        api: &dyn EmulatorApi,
        state: &ServiceState,
    ) -> Result<Reconstruction, SnapshotError> {
        let ServiceState::Sqs(sqs) = state else {
            return Err(state_mismatch(ServiceKind::Sqs, state));
        };

        let mut outcome = Reconstruction::new(ServiceKind::Sqs);
        for url in &sqs.queues {
            let Some(name) = queue_name_from_url(url) else {
                outcome.record(url, Err("queue name could not be derived from URL".to_string()));
                continue;
            };

            let result = api
                .call(create_queue_request(&name))
                .await
                .map(|_| ())
                .map_err(|e| e.to_string());
            if let Err(reason) = &result {
                debug!(queue = %name, reason = %reason, "Queue not created");
            }
            outcome.record(name, result);
        }

        info!(
            service = SERVICE,
            imported = outcome.imported_count(),
            skipped = outcome.skipped_count(),
            "Restored queues"
        );
        Ok(outcome)
    }
}
