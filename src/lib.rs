//! localdock - Docker and LocalStack development assistant
//!
//! This library backs the `localdock` command line tool and its stdio tool
//! server. Its core is snapshot export and import of LocalStack resources;
//! around it sit project detection, compose network generation and health
//! checks.
//!
//! # Example Usage
//!
//! ```no_run
//! use localdock::emulator::HttpEmulatorClient;
//! use localdock::snapshot::{ExportRequest, SnapshotService};
//! use localdock::LocaldockConfig;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = LocaldockConfig::default();
//! let client = HttpEmulatorClient::new(&config)?;
//! let service = SnapshotService::new(Arc::new(client));
//!
//! let summary = service
//!     .export(ExportRequest::new(["s3", "sqs"]).with_output("snapshot.yaml"))
//!     .await?;
//! println!("{} resources written", summary.total_resources);
//! # Ok(())
//! # }
//! ```
//!
//! # Project Structure
//!
//! - [`emulator`]: HTTP access to the LocalStack endpoint
//! - [`snapshot`]: per-service extractors and reconstructors, the snapshot
//!   file format, and the export/import orchestration
//! - [`detection`]: project scanning for Docker and AWS usage
//! - [`network`]: docker-compose generation
//! - [`health`]: emulator health checks
//! - [`tools`] and [`server`]: the JSON-RPC tool surface

pub mod cli;
pub mod config;
pub mod detection;
pub mod emulator;
pub mod health;
pub mod network;
pub mod server;
pub mod snapshot;
pub mod tools;
pub mod util;

pub use config::{ConfigError, LocaldockConfig};
pub use emulator::{EmulatorApi, EmulatorError, HttpEmulatorClient};
pub use snapshot::{ExportRequest, ExportSummary, ImportSummary, SnapshotError, SnapshotService};
pub use util::{init_default, init_from_env, init_logging, LoggingConfig};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
