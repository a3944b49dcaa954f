use std::path::PathBuf;
use thiserror::Error;

use super::kind::ServiceKind;
use crate::emulator::EmulatorError;

/// Errors raised by snapshot export and import
#[derive(Debug, Error)]
pub enum SnapshotError {
    /// The connectivity check before export/import failed
    #[error("Emulator is not reachable at {endpoint}: {source}")]
    EmulatorUnreachable {
        endpoint: String,
        #[source]
        source: EmulatorError,
    },

    #[error("Failed to read snapshot file {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write snapshot file {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The file was read but is not a valid snapshot document
    #[error("Snapshot file {} could not be parsed: {message}", .path.display())]
    Parse { path: PathBuf, message: String },

    #[error("Failed to serialize snapshot: {0}")]
    Serialize(String),

    /// A handler was given a state belonging to another kind
    #[error("{expected} handler cannot restore {actual} state")]
    StateMismatch {
        expected: ServiceKind,
        actual: ServiceKind,
    },
}

impl SnapshotError {
    /// True for failures that come from the snapshot file itself
    pub fn is_file_error(&self) -> bool {
        matches!(
            self,
            SnapshotError::Read { .. } | SnapshotError::Write { .. } | SnapshotError::Parse { .. }
        )
    }

    /// Short remediation hints for the failure
    pub fn troubleshooting_tips(&self) -> Vec<String> {
        let tips: &[&str] = match self {
            SnapshotError::EmulatorUnreachable { .. } => &[
                "Start LocalStack: docker compose up -d localstack (or: localstack start -d)",
                "Verify it responds: curl http://localhost:4566/_localstack/health",
                "Set LOCALDOCK_ENDPOINT if the emulator listens on another host or port",
                "Check that port 4566 is published and not blocked by a firewall",
            ],
            SnapshotError::Read { .. } => &[
                "Check that the snapshot file path is correct",
                "Check that the file exists and is readable by the current user",
                "Use an absolute path if the working directory is unclear",
            ],
            SnapshotError::Parse { .. } => &[
                "Make sure the file is a snapshot produced by export_state",
                "Check the file for YAML/JSON syntax errors or truncation",
                "Files ending in .json are parsed as JSON, everything else as YAML",
                "Export a fresh snapshot if the file was edited by hand",
            ],
            SnapshotError::Write { .. } => &[
                "Check that the output directory is writable",
                "Check available disk space",
                "Choose another output path",
            ],
            SnapshotError::Serialize(_) => &["Retry the export; report a bug if it persists"],
            SnapshotError::StateMismatch { .. } => &[
                "Check the emulator logs: docker compose logs localstack",
                "Verify the service is enabled: curl http://localhost:4566/_localstack/health",
            ],
        };
        tips.iter().map(|t| t.to_string()).collect()
    }

    /// A user-facing message with troubleshooting hints
    pub fn help_message(&self) -> String {
        let mut message = format!("Error: {}\n\nHelp: Try:\n", self);
        for tip in self.troubleshooting_tips() {
            message.push_str(&format!("- {}\n", tip));
        }
        message
    }
}
