//! File classification and AWS SDK usage patterns

use regex::Regex;
use std::path::Path;

/// Directories never descended into
pub const EXCLUDED_DIRS: &[&str] = &[
    ".git",
    "node_modules",
    "target",
    "dist",
    "build",
    "out",
    ".next",
    "venv",
    ".venv",
    "__pycache__",
    ".pytest_cache",
    ".mypy_cache",
    "vendor",
    ".idea",
    ".vscode",
    "coverage",
    ".gradle",
    ".terraform",
    ".serverless",
];

/// Extensions of files searched for SDK usage and endpoint configuration
pub const SEARCHED_EXTENSIONS: &[&str] = &[
    "py", "js", "mjs", "cjs", "ts", "tsx", "go", "java", "kt", "rs", "rb", "php", "cs", "sh",
    "tf", "json", "yml", "yaml", "toml", "properties", "cfg", "ini", "env",
];

/// Extension-less files that are searched as well
pub const SEARCHED_FILE_NAMES: &[&str] = &[".env", ".env.local", ".env.example", "Makefile"];

pub const MAX_SCAN_DEPTH: usize = 8;

pub const MAX_FILES: usize = 5000;

/// Larger files are classified but not read
pub const MAX_FILE_BYTES: u64 = 1024 * 1024;

/// (service name, class names used by the AWS SDK for JavaScript v2)
const AWS_SERVICES: &[(&str, &str)] = &[
    ("s3", "S3"),
    ("dynamodb", "DynamoDB|DynamoDB\\.DocumentClient"),
    ("sqs", "SQS"),
    ("sns", "SNS"),
    ("lambda", "Lambda"),
    ("kinesis", "Kinesis"),
    ("secretsmanager", "SecretsManager"),
    ("ssm", "SSM"),
    ("events", "EventBridge|CloudWatchEvents"),
    ("stepfunctions", "StepFunctions"),
];

pub fn is_excluded_dir(name: &str) -> bool {
    EXCLUDED_DIRS.contains(&name) || name.ends_with(".egg-info")
}

pub fn is_compose_file(name: &str) -> bool {
    let lower = name.to_lowercase();
    let Some(stem) = lower
        .strip_suffix(".yml")
        .or_else(|| lower.strip_suffix(".yaml"))
    else {
        return false;
    };
    stem == "compose" || stem == "docker-compose" || stem.starts_with("docker-compose.")
}

pub fn is_dockerfile(name: &str) -> bool {
    name == "Dockerfile" || name.starts_with("Dockerfile.") || name.ends_with(".dockerfile")
}

pub fn is_searched_file(path: &Path) -> bool {
    let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
    if SEARCHED_FILE_NAMES.contains(&name) {
        return true;
    }
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| SEARCHED_EXTENSIONS.contains(&ext))
}

/// Compiled per-service usage patterns
pub struct ServicePatterns {
    services: Vec<(&'static str, Regex)>,
    endpoint: Regex,
}

impl ServicePatterns {
    pub fn new() -> Self {
        let services = AWS_SERVICES
            .iter()
            .map(|(name, js_classes)| {
                let pattern = format!(
                    concat!(
                        r#"boto3\.(?:client|resource)\(\s*['"]{id}['"]"#,
                        r#"|@aws-sdk/client-{id}\b"#,
                        r#"|aws-sdk-go(?:-v2)?/service/{id}\b"#,
                        r#"|software\.amazon\.awssdk\.services\.{id}\b"#,
                        r#"|com\.amazonaws\.services\.{id}"#,
                        r#"|aws[-_]sdk[-_]{id}\b"#,
                        r#"|\baws\s+{id}(?:api)?\s"#,
                        r#"|new\s+(?:AWS\.)?(?:{js})\s*\("#
                    ),
                    id = name,
                    js = js_classes
                );
                (*name, Regex::new(&pattern).expect("valid regex"))
            })
            .collect();

        Self {
            services,
            endpoint: Regex::new(r"(?i)localstack|(?:localhost|127\.0\.0\.1):4566\b|AWS_ENDPOINT_URL")
                .expect("valid regex"),
        }
    }

    /// Names of the services referenced in `text`
    pub fn services_in(&self, text: &str) -> Vec<&'static str> {
        self.services
            .iter()
            .filter(|(_, re)| re.is_match(text))
            .map(|(name, _)| *name)
            .collect()
    }

    pub fn mentions_local_endpoint(&self, text: &str) -> bool {
        self.endpoint.is_match(text)
    }
}

impl Default for ServicePatterns {
    fn default() -> Self {
        Self::new()
    }
}
