use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One category of emulated resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceKind {
    S3,
    DynamoDb,
    Sqs,
    Sns,
    Lambda,
}

impl ServiceKind {
    pub const ALL: [ServiceKind; 5] = [
        ServiceKind::S3,
        ServiceKind::DynamoDb,
        ServiceKind::Sqs,
        ServiceKind::Sns,
        ServiceKind::Lambda,
    ];

    /// Key used in snapshot files and the emulator's signing name
    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceKind::S3 => "s3",
            ServiceKind::DynamoDb => "dynamodb",
            ServiceKind::Sqs => "sqs",
            ServiceKind::Sns => "sns",
            ServiceKind::Lambda => "lambda",
        }
    }

    /// Plural noun for the resources of this kind
    pub fn resource_noun(&self) -> &'static str {
        match self {
            ServiceKind::S3 => "buckets",
            ServiceKind::DynamoDb => "tables",
            ServiceKind::Sqs => "queues",
            ServiceKind::Sns => "topics",
            ServiceKind::Lambda => "functions",
        }
    }

    pub fn all_names() -> Vec<&'static str> {
        Self::ALL.iter().map(|k| k.as_str()).collect()
    }

    /// Closest known kind to a misspelled name, within two edits
    pub fn suggest(name: &str) -> Option<ServiceKind> {
        let name = name.trim().to_lowercase();
        Self::ALL
            .iter()
            .map(|k| (*k, strsim::levenshtein(&name, k.as_str())))
            .filter(|(_, distance)| *distance <= 2)
            .min_by_key(|(_, distance)| *distance)
            .map(|(kind, _)| kind)
    }
}

impl fmt::Display for ServiceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ServiceKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "s3" => Ok(ServiceKind::S3),
            "dynamodb" => Ok(ServiceKind::DynamoDb),
            "sqs" => Ok(ServiceKind::Sqs),
            "sns" => Ok(ServiceKind::Sns),
            "lambda" => Ok(ServiceKind::Lambda),
            other => {
                let hint = Self::suggest(other)
                    .map(|k| format!(" Did you mean '{}'?", k))
                    .unwrap_or_default();
                Err(format!(
                    "Unknown service kind: {}.{} Valid options: {}",
                    other,
                    hint,
                    Self::all_names().join(", ")
                ))
            }
        }
    }
}
