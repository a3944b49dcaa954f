//! Export and import of the emulator's resource state
//!
//! A snapshot records resource metadata for selected service kinds (bucket
//! names, table schemas, queue URLs, topic ARNs, function configuration) in a
//! human-diffable YAML or JSON file. Payloads are never captured: objects,
//! items, messages and code packages stay in the emulator.

pub mod codec;
pub mod error;
pub mod handlers;
pub mod kind;
pub mod model;
pub mod service;

pub use codec::{default_file_name, read_snapshot, write_snapshot, SnapshotFormat};
pub use error::SnapshotError;
pub use handlers::{
    ExtractStatus, Extraction, HandlerRegistry, ItemFault, Reconstruction, ResourceSkip,
    ServiceHandler,
};
pub use kind::ServiceKind;
pub use model::{ServiceState, ServiceStates, Snapshot, SnapshotSummary, FORMAT_VERSION};
pub use service::{
    ExportRequest, ExportSummary, ExportedService, ImportSummary, ImportedService,
    SnapshotService, DEFAULT_CONNECT_TIMEOUT, LARGE_EXPORT_THRESHOLD,
};
