use async_trait::async_trait;
use serde::Deserialize;
use tracing::{info, warn};

use super::{state_mismatch, Extraction, Reconstruction, ServiceHandler, MAX_PAGES};
use crate::emulator::{EmulatorApi, EmulatorError, EmulatorRequest};
use crate::snapshot::error::SnapshotError;
use crate::snapshot::kind::ServiceKind;
use crate::snapshot::model::{FunctionRecord, LambdaState, ServiceState};

const SERVICE: &str = "lambda";
const FUNCTIONS_PATH: &str = "/2015-03-31/functions/";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ListFunctionsOutput {
    #[serde(default)]
    functions: Vec<FunctionConfiguration>,
    next_marker: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct FunctionConfiguration {
    function_name: String,
    runtime: Option<String>,
    handler: Option<String>,
    description: Option<String>,
    timeout: Option<u32>,
    memory_size: Option<u32>,
}

impl From<FunctionConfiguration> for FunctionRecord {
    fn from(f: FunctionConfiguration) -> Self {
        FunctionRecord {
            name: f.function_name,
            runtime: f.runtime,
            handler: f.handler,
            description: f.description.filter(|d| !d.is_empty()),
            timeout: f.timeout,
            memory_size: f.memory_size,
        }
    }
}

/// Function configurations. Code packages are never downloaded.
pub struct LambdaHandler;

async fn list_functions(api: &dyn EmulatorApi) -> Result<Vec<FunctionRecord>, EmulatorError> {
    let mut functions = Vec::new();
    let mut marker: Option<String> = None;

    for _ in 0..MAX_PAGES {
        let mut request = EmulatorRequest::get(SERVICE, FUNCTIONS_PATH);
        if let Some(m) = marker.take() {
            request = request.with_query("Marker", m);
        }

        let page: ListFunctionsOutput = api.call(request).await?.json()?;
        functions.extend(page.functions.into_iter().map(FunctionRecord::from));

        marker = page.next_marker.filter(|m| !m.is_empty());
        if marker.is_none() {
            break;
        }
    }

    Ok(functions)
}

#[async_trait]
impl ServiceHandler for LambdaHandler {
    fn kind(&self) -> ServiceKind {
        ServiceKind::Lambda
    }

    fn recreates_resources(&self) -> bool {
        false
    }

    async fn extract(&self, api: &dyn EmulatorApi, _include_details: bool) -> Extraction {
        match list_functions(api).await {
            Ok(functions) => {
                info!(service = SERVICE, functions = functions.len(), "Extracted functions");
                Extraction::complete(ServiceState::Lambda(LambdaState::new(functions)))
            }
            Err(e) => {
                warn!(service = SERVICE, error = %e, "Function listing failed, exporting no functions");
                Extraction::degraded(ServiceKind::Lambda, &e)
            }
        }
    }

    async fn reconstruct(
        &self,
        _api: &dyn EmulatorApi,
        state: &ServiceState,
    ) -> Result<Reconstruction, SnapshotError> {
        let ServiceState::Lambda(lambda) = state else {
            return Err(state_mismatch(ServiceKind::Lambda, state));
        };

        Ok(Reconstruction::skip_all(
            ServiceKind::Lambda,
            lambda.functions.iter().map(|f| f.name.clone()).collect(),
            "function deployment needs the code package; configuration recorded only",
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::emulator::MockEmulator;

    #[tokio::test]
    async fn test_extract_function_configuration() {
        let mock = MockEmulator::new().with_function("resize", "python3.12");

        let extraction = LambdaHandler.extract(&mock, false).await;

        let ServiceState::Lambda(state) = &extraction.state else {
            panic!("expected lambda state");
        };
        let f = &state.functions[0];
        assert_eq!(f.name, "resize");
        assert_eq!(f.runtime.as_deref(), Some("python3.12"));
        assert_eq!(f.handler.as_deref(), Some("index.handler"));
        assert_eq!(f.description, None);
        assert_eq!(f.timeout, Some(3));
        assert_eq!(f.memory_size, Some(128));
    }

    #[tokio::test]
    async fn test_reconstruct_skips_with_reason() {
        let mock = MockEmulator::new();
        let state = ServiceState::Lambda(LambdaState::new(vec![FunctionRecord {
            name: "resize".to_string(),
            ..Default::default()
        }]));

        let outcome = LambdaHandler.reconstruct(&mock, &state).await.unwrap();

        assert_eq!(outcome.skipped_count(), 1);
        assert!(outcome.skipped[0].reason.contains("code package"));
    }

    #[tokio::test]
    async fn test_reconstruct_rejects_foreign_state() {
        let mock = MockEmulator::new();
        let err = LambdaHandler
            .reconstruct(&mock, &ServiceState::empty(ServiceKind::S3))
            .await
            .unwrap_err();
        assert!(matches!(err, SnapshotError::StateMismatch { .. }));
    }
}
