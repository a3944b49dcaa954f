//! Project walker that collects Docker and AWS usage

use ignore::WalkBuilder;
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info, warn};

use super::patterns::{
    is_compose_file, is_dockerfile, is_excluded_dir, is_searched_file, ServicePatterns,
    MAX_FILES, MAX_FILE_BYTES, MAX_SCAN_DEPTH,
};
use super::report::{ComposeFile, DetectedService, DetectionReport, Dockerfile};
use super::DetectionError;

pub struct ProjectScanner {
    root: PathBuf,
    max_depth: usize,
    max_files: usize,
    patterns: ServicePatterns,
}

impl ProjectScanner {
    pub fn new(root: impl AsRef<Path>) -> Result<Self, DetectionError> {
        Self::with_limits(root, MAX_SCAN_DEPTH, MAX_FILES)
    }

    pub fn with_limits(
        root: impl AsRef<Path>,
        max_depth: usize,
        max_files: usize,
    ) -> Result<Self, DetectionError> {
        let root = root.as_ref();
        if !root.exists() {
            return Err(DetectionError::PathNotFound(root.to_path_buf()));
        }
        if !root.is_dir() {
            return Err(DetectionError::NotADirectory(root.to_path_buf()));
        }
        let root = root.canonicalize().map_err(|source| DetectionError::Io {
            path: root.to_path_buf(),
            source,
        })?;

        Ok(Self {
            root,
            max_depth,
            max_files,
            patterns: ServicePatterns::new(),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn scan(&self) -> DetectionReport {
        let start = Instant::now();
        info!(
            root = %self.root.display(),
            max_depth = self.max_depth,
            max_files = self.max_files,
            "Scanning project"
        );

        let mut files_scanned = 0;
        let mut compose_files = Vec::new();
        let mut dockerfiles = Vec::new();
        let mut services: BTreeMap<&'static str, BTreeSet<String>> = BTreeMap::new();
        let mut endpoint_files = Vec::new();

        let walker = WalkBuilder::new(&self.root)
            .max_depth(Some(self.max_depth))
            .hidden(false)
            .git_global(false)
            .git_exclude(false)
            .filter_entry(|entry| {
                let is_dir = entry.file_type().is_some_and(|t| t.is_dir());
                !(is_dir && entry.depth() > 0 && is_excluded_dir(&entry.file_name().to_string_lossy()))
            })
            .build();

        for result in walker {
            let entry = match result {
                Ok(entry) => entry,
                Err(err) => {
                    warn!(error = %err, "Failed to read directory entry");
                    continue;
                }
            };
            if !entry.file_type().is_some_and(|t| t.is_file()) {
                continue;
            }

            if files_scanned >= self.max_files {
                warn!(files_scanned, max_files = self.max_files, "Reached file limit, stopping scan");
                break;
            }
            files_scanned += 1;

            let path = entry.path();
            let rel_path = path
                .strip_prefix(&self.root)
                .unwrap_or(path)
                .to_string_lossy()
                .replace('\\', "/");
            let name = entry.file_name().to_string_lossy();

            let dockerfile = is_dockerfile(&name);
            if !dockerfile && !is_searched_file(path) {
                continue;
            }
            let Some(text) = read_small_file(path) else {
                continue;
            };

            if dockerfile {
                debug!(path = %rel_path, "Found Dockerfile");
                dockerfiles.push(Dockerfile::parse(rel_path.clone(), &text));
            } else if is_compose_file(&name) {
                debug!(path = %rel_path, "Found compose file");
                compose_files.push(ComposeFile::parse(rel_path.clone(), &text));
            }

            for service in self.patterns.services_in(&text) {
                services.entry(service).or_default().insert(rel_path.clone());
            }
            if self.patterns.mentions_local_endpoint(&text) {
                endpoint_files.push(rel_path);
            }
        }

        let aws_services: Vec<DetectedService> = services
            .into_iter()
            .map(|(name, files)| DetectedService {
                name: name.to_string(),
                files: files.into_iter().collect(),
            })
            .collect();

        info!(
            files_scanned,
            compose_files = compose_files.len(),
            dockerfiles = dockerfiles.len(),
            aws_services = aws_services.len(),
            elapsed_ms = start.elapsed().as_millis(),
            "Project scan completed"
        );

        DetectionReport::new(
            self.root.clone(),
            files_scanned,
            compose_files,
            dockerfiles,
            aws_services,
            endpoint_files,
        )
    }
}

fn read_small_file(path: &Path) -> Option<String> {
    let size = fs::metadata(path).ok()?.len();
    if size > MAX_FILE_BYTES {
        debug!(path = %path.display(), size, "Skipping large file");
        return None;
    }
    // Binary or non-UTF-8 files are skipped
    fs::read_to_string(path).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn create_project() -> TempDir {
        let dir = TempDir::new().unwrap();
        let base = dir.path();

        fs::write(
            base.join("docker-compose.yml"),
            "services:\n  app:\n    build: .\n  localstack:\n    image: localstack/localstack:3\n",
        )
        .unwrap();
        fs::write(base.join("Dockerfile"), "FROM python:3.12-slim\nCOPY . /app\n").unwrap();

        fs::create_dir(base.join("app")).unwrap();
        fs::write(
            base.join("app/storage.py"),
            "import boto3\ns3 = boto3.client('s3', endpoint_url='http://localhost:4566')\n",
        )
        .unwrap();
        fs::write(base.join("app/jobs.py"), "sqs = boto3.client(\"sqs\")\n").unwrap();

        fs::create_dir(base.join("node_modules")).unwrap();
        fs::write(
            base.join("node_modules/index.js"),
            "const db = new AWS.DynamoDB();",
        )
        .unwrap();

        dir
    }

    #[test]
    fn test_missing_path() {
        let err = ProjectScanner::new("/nonexistent/project").err().unwrap();
        assert!(matches!(err, DetectionError::PathNotFound(_)));
    }

    #[test]
    fn test_file_is_not_a_directory() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("file.txt");
        fs::write(&file, "x").unwrap();

        let err = ProjectScanner::new(&file).err().unwrap();
        assert!(matches!(err, DetectionError::NotADirectory(_)));
    }

    #[test]
    fn test_scan_finds_docker_and_services() {
        let project = create_project();
        let report = ProjectScanner::new(project.path()).unwrap().scan();

        assert_eq!(report.compose_files.len(), 1);
        assert!(report.compose_files[0].has_localstack);
        assert_eq!(report.dockerfiles[0].base_image.as_deref(), Some("python:3.12-slim"));
        assert_eq!(report.service_names(), vec!["s3", "sqs"]);
        assert!(report.localstack_configured);
    }

    #[test]
    fn test_scan_skips_excluded_dirs() {
        let project = create_project();
        let report = ProjectScanner::new(project.path()).unwrap().scan();

        assert!(!report.service_names().contains(&"dynamodb"));
    }

    #[test]
    fn test_scan_respects_file_limit() {
        let dir = TempDir::new().unwrap();
        for i in 0..20 {
            fs::write(dir.path().join(format!("file{}.txt", i)), "content").unwrap();
        }

        let report = ProjectScanner::with_limits(dir.path(), 4, 5).unwrap().scan();
        assert_eq!(report.files_scanned, 5);
    }
}
