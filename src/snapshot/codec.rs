//! Reading and writing snapshot files
//!
//! YAML is the default format; a `.json` extension selects JSON. Both keep
//! service entries in the order they were captured.

use chrono::{DateTime, Utc};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use super::error::SnapshotError;
use super::model::Snapshot;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotFormat {
    Yaml,
    Json,
}

impl SnapshotFormat {
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => SnapshotFormat::Json,
            _ => SnapshotFormat::Yaml,
        }
    }
}

pub fn encode(snapshot: &Snapshot, format: SnapshotFormat) -> Result<String, SnapshotError> {
    match format {
        SnapshotFormat::Yaml => {
            serde_yaml::to_string(snapshot).map_err(|e| SnapshotError::Serialize(e.to_string()))
        }
        SnapshotFormat::Json => serde_json::to_string_pretty(snapshot)
            .map(|mut s| {
                s.push('\n');
                s
            })
            .map_err(|e| SnapshotError::Serialize(e.to_string())),
    }
}

/// Parses snapshot text. `path` is only used in error messages.
pub fn decode(text: &str, format: SnapshotFormat, path: &Path) -> Result<Snapshot, SnapshotError> {
    let parse_error = |message: String| SnapshotError::Parse {
        path: path.to_path_buf(),
        message,
    };

    if text.trim().is_empty() {
        return Err(parse_error("file is empty".to_string()));
    }

    match format {
        SnapshotFormat::Yaml => serde_yaml::from_str(text).map_err(|e| parse_error(e.to_string())),
        SnapshotFormat::Json => serde_json::from_str(text).map_err(|e| parse_error(e.to_string())),
    }
}

/// Writes the snapshot, creating parent directories. Returns the file size.
pub fn write_snapshot(path: &Path, snapshot: &Snapshot) -> Result<u64, SnapshotError> {
    let text = encode(snapshot, SnapshotFormat::from_path(path))?;
    let write_error = |source| SnapshotError::Write {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(write_error)?;
    }
    fs::write(path, &text).map_err(write_error)?;

    let size = fs::metadata(path).map_err(write_error)?.len();
    debug!(path = %path.display(), bytes = size, "Snapshot written");
    Ok(size)
}

pub fn read_snapshot(path: &Path) -> Result<Snapshot, SnapshotError> {
    let text = fs::read_to_string(path).map_err(|source| SnapshotError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    decode(&text, SnapshotFormat::from_path(path), path)
}

/// File name used when the caller gives no output path
pub fn default_file_name(captured_at: DateTime<Utc>) -> PathBuf {
    PathBuf::from(format!(
        "localstack-snapshot-{}.yaml",
        captured_at.format("%Y%m%d-%H%M%S")
    ))
}
