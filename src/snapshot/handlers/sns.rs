use async_trait::async_trait;
use tracing::{info, warn};

use super::{child_text, find_text, state_mismatch, Extraction, Reconstruction, ServiceHandler, MAX_PAGES};
use crate::emulator::{EmulatorApi, EmulatorError, EmulatorRequest};
use crate::snapshot::error::SnapshotError;
use crate::snapshot::kind::ServiceKind;
use crate::snapshot::model::{ServiceState, SnsState};

const SERVICE: &str = "sns";
const API_VERSION: &str = "2010-03-31";

pub struct SnsHandler;

async fn list_topics(api: &dyn EmulatorApi) -> Result<Vec<String>, EmulatorError> {
    let mut arns = Vec::new();
    let mut token: Option<String> = None;

    for _ in 0..MAX_PAGES {
        let mut request = EmulatorRequest::query_action(SERVICE, "ListTopics", API_VERSION);
        if let Some(next) = token.take() {
            request = request.with_query("NextToken", next);
        }

        let response = api.call(request).await?;
        let doc = response.xml()?;
        arns.extend(
            doc.descendants()
                .filter(|n| n.has_tag_name("member"))
                .filter_map(|n| child_text(n, "TopicArn"))
                .map(str::to_string),
        );

        token = find_text(&doc, "NextToken")
            .filter(|t| !t.is_empty())
            .map(str::to_string);
        if token.is_none() {
            break;
        }
    }

    Ok(arns)
}

#[async_trait]
impl ServiceHandler for SnsHandler {
    fn kind(&self) -> ServiceKind {
        ServiceKind::Sns
    }

    fn recreates_resources(&self) -> bool {
        false
    }

    async fn extract(&self, api: &dyn EmulatorApi, _include_details: bool) -> Extraction {
        match list_topics(api).await {
            Ok(arns) => {
                info!(service = SERVICE, topics = arns.len(), "Extracted topics");
                Extraction::complete(ServiceState::Sns(SnsState::new(arns)))
            }
            Err(e) => {
                warn!(service = SERVICE, error = %e, "Topic listing failed, exporting no topics");
                Extraction::degraded(ServiceKind::Sns, &e)
            }
        }
    }

    async fn reconstruct(
        &self,
        _api: &dyn EmulatorApi,
        state: &ServiceState,
    ) -> Result<Reconstruction, SnapshotError> {
        let ServiceState::Sns(sns) = state else {
            return Err(state_mismatch(ServiceKind::Sns, state));
        };

        Ok(Reconstruction::skip_all(
            ServiceKind::Sns,
            sns.topics.clone(),
            "topic recreation is not supported; ARN recorded only",
        ))
    }
}
