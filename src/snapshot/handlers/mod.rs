//! Per-service extractors and reconstructors
//!
//! Each supported kind has one [`ServiceHandler`] holding both directions.
//! The [`HandlerRegistry`] maps kinds to handlers so the orchestrator never
//! branches on the kind itself.
//!
//! Failures are absorbed at three granularities and each has its own shape:
//! - whole-kind listing failed: [`ExtractStatus::Degraded`] with an empty state
//! - optional per-item detail failed: [`ExtractStatus::Partial`] listing the [`ItemFault`]s
//! - one resource could not be recreated: a [`ResourceSkip`] in the [`Reconstruction`]

mod dynamodb;
mod lambda;
mod s3;
mod sns;
mod sqs;

pub use dynamodb::DynamoDbHandler;
pub use lambda::LambdaHandler;
pub use s3::S3Handler;
pub use sns::SnsHandler;
pub use sqs::{queue_name_from_url, SqsHandler};

use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;

use super::error::SnapshotError;
use super::kind::ServiceKind;
use super::model::ServiceState;
use crate::emulator::{EmulatorApi, EmulatorError};

/// Upper bound on pages fetched by a paginated listing
pub(crate) const MAX_PAGES: usize = 100;

/// One item whose optional detail could not be read
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemFault {
    pub item: String,
    pub reason: String,
}

impl ItemFault {
    pub fn new(item: impl Into<String>, error: &EmulatorError) -> Self {
        Self {
            item: item.into(),
            reason: error.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtractStatus {
    Complete,
    /// The kind-level listing failed; the state is empty
    Degraded { reason: String },
    /// The listing succeeded but some items are missing detail
    Partial { faults: Vec<ItemFault> },
}

impl ExtractStatus {
    pub fn label(&self) -> &'static str {
        match self {
            ExtractStatus::Complete => "complete",
            ExtractStatus::Degraded { .. } => "degraded",
            ExtractStatus::Partial { .. } => "partial",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Extraction {
    pub state: ServiceState,
    pub status: ExtractStatus,
}

impl Extraction {
    pub fn complete(state: ServiceState) -> Self {
        Self {
            state,
            status: ExtractStatus::Complete,
        }
    }

    pub fn degraded(kind: ServiceKind, error: &EmulatorError) -> Self {
        Self {
            state: ServiceState::empty(kind),
            status: ExtractStatus::Degraded {
                reason: error.to_string(),
            },
        }
    }

    pub fn with_faults(state: ServiceState, faults: Vec<ItemFault>) -> Self {
        if faults.is_empty() {
            Self::complete(state)
        } else {
            Self {
                state,
                status: ExtractStatus::Partial { faults },
            }
        }
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self.status, ExtractStatus::Degraded { .. })
    }
}

/// A resource that was found in the snapshot but not recreated
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceSkip {
    pub name: String,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reconstruction {
    pub kind: ServiceKind,
    pub imported: Vec<String>,
    pub skipped: Vec<ResourceSkip>,
}

impl Reconstruction {
    pub fn new(kind: ServiceKind) -> Self {
        Self {
            kind,
            imported: Vec::new(),
            skipped: Vec::new(),
        }
    }

    /// Every listed resource reported as skipped with the same reason
    pub fn skip_all(kind: ServiceKind, names: Vec<String>, reason: &str) -> Self {
        Self {
            kind,
            imported: Vec::new(),
            skipped: names
                .into_iter()
                .map(|name| ResourceSkip {
                    name,
                    reason: reason.to_string(),
                })
                .collect(),
        }
    }

    pub fn record(&mut self, name: impl Into<String>, result: Result<(), String>) {
        let name = name.into();
        match result {
            Ok(()) => self.imported.push(name),
            Err(reason) => self.skipped.push(ResourceSkip { name, reason }),
        }
    }

    pub fn imported_count(&self) -> usize {
        self.imported.len()
    }

    pub fn skipped_count(&self) -> usize {
        self.skipped.len()
    }
}

/// Extractor and reconstructor for one service kind
#[async_trait]
pub trait ServiceHandler: Send + Sync {
    fn kind(&self) -> ServiceKind;

    /// False when `reconstruct` only reports what the snapshot holds
    fn recreates_resources(&self) -> bool {
        true
    }

    /// Captures the kind's resources. Never fails; errors degrade the result.
    async fn extract(&self, api: &dyn EmulatorApi, include_details: bool) -> Extraction;

    /// Replays a captured state. Per-resource failures become skips; `Err`
    /// means the reconstructor could not run at all.
    async fn reconstruct(
        &self,
        api: &dyn EmulatorApi,
        state: &ServiceState,
    ) -> Result<Reconstruction, SnapshotError>;
}

pub(crate) fn state_mismatch(expected: ServiceKind, state: &ServiceState) -> SnapshotError {
    SnapshotError::StateMismatch {
        expected,
        actual: state.kind(),
    }
}

/// Text of the first direct child element named `name`
pub(crate) fn child_text<'a>(node: roxmltree::Node<'a, '_>, name: &str) -> Option<&'a str> {
    node.children()
        .find(|c| c.has_tag_name(name))
        .and_then(|c| c.text())
        .map(str::trim)
}

/// Text of the first element named `name` anywhere in the document
pub(crate) fn find_text<'a>(doc: &'a roxmltree::Document<'_>, name: &str) -> Option<&'a str> {
    doc.descendants()
        .find(|n| n.has_tag_name(name))
        .and_then(|n| n.text())
        .map(str::trim)
}

#[derive(Clone)]
pub struct HandlerRegistry {
    handlers: Vec<Arc<dyn ServiceHandler>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self {
            handlers: Vec::new(),
        }
    }

    pub fn with_defaults() -> Self {
        Self::for_region(crate::config::DEFAULT_REGION)
    }

    /// Default handlers, with bucket creation targeting `region`
    pub fn for_region(region: &str) -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(S3Handler::with_region(region)));
        registry.register(Arc::new(DynamoDbHandler));
        registry.register(Arc::new(SqsHandler));
        registry.register(Arc::new(SnsHandler));
        registry.register(Arc::new(LambdaHandler));
        registry
    }

    /// Adds a handler, replacing any existing handler for the same kind
    pub fn register(&mut self, handler: Arc<dyn ServiceHandler>) {
        let kind = handler.kind();
        self.handlers.retain(|h| h.kind() != kind);
        self.handlers.push(handler);
    }

    pub fn get(&self, kind: ServiceKind) -> Option<Arc<dyn ServiceHandler>> {
        self.handlers.iter().find(|h| h.kind() == kind).cloned()
    }

    pub fn kinds(&self) -> Vec<ServiceKind> {
        self.handlers.iter().map(|h| h.kind()).collect()
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl Default for HandlerRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}
