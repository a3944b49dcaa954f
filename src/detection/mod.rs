//! Detection of Docker and AWS service usage in a project
//!
//! The scanner walks the project once (respecting `.gitignore`), classifies
//! Dockerfiles and compose files, and searches source and config files for
//! AWS SDK clients and LocalStack endpoints.
//!
//! # Example
//!
//! ```no_run
//! use localdock::detection::ProjectScanner;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let report = ProjectScanner::new(".")?.scan();
//! for service in &report.aws_services {
//!     println!("{} used in {} files", service.name, service.files.len());
//! }
//! # Ok(())
//! # }
//! ```

pub mod patterns;
pub mod report;
pub mod scanner;

pub use report::{ComposeFile, DetectedService, DetectionReport, Dockerfile};
pub use scanner::ProjectScanner;

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DetectionError {
    #[error("Project path not found: {}", .0.display())]
    PathNotFound(PathBuf),

    #[error("Project path is not a directory: {}", .0.display())]
    NotADirectory(PathBuf),

    #[error("Failed to access {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl DetectionError {
    /// Returns a user-friendly error message with troubleshooting hints
    pub fn help_message(&self) -> String {
        match self {
            DetectionError::PathNotFound(path) => format!(
                "Error: Project path not found\nPath: {}\n\n\
                 Help: The specified path does not exist. Please check:\n\
                 - Is the path correct?\n\
                 - Does the path exist on your system?\n\
                 - Do you have permission to access it?",
                path.display()
            ),
            DetectionError::NotADirectory(path) => format!(
                "Error: Project path is not a directory\nPath: {}\n\n\
                 Help: The specified path is a file, not a directory.\n\
                 Please provide the path to the project root directory.",
                path.display()
            ),
            DetectionError::Io { .. } => format!(
                "Error: {}\n\nHelp: Check that the directory is readable by the current user.",
                self
            ),
        }
    }
}
