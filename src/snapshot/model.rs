//! Snapshot document types
//!
//! A [`Snapshot`] maps service kinds to their [`ServiceState`]. Each state
//! carries a `resourceCount` that its constructor derives from the item list,
//! so an exported snapshot can never disagree with itself. Counts read from a
//! file are informational only; import always walks the lists.

use chrono::{DateTime, Utc};
use serde::de::{IgnoredAny, MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

use super::kind::ServiceKind;

/// Snapshot format version written by this build
pub const FORMAT_VERSION: &str = "1.0";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    /// Empty when the file carries no version
    #[serde(default)]
    pub format_version: String,
    #[serde(default)]
    pub captured_at: DateTime<Utc>,
    #[serde(default)]
    pub services: ServiceStates,
    #[serde(default)]
    pub summary: SnapshotSummary,
}

impl Snapshot {
    pub fn new(captured_at: DateTime<Utc>, services: ServiceStates) -> Self {
        let summary = SnapshotSummary::of(&services);
        Self {
            format_version: FORMAT_VERSION.to_string(),
            captured_at,
            services,
            summary,
        }
    }

    pub fn is_current_version(&self) -> bool {
        self.format_version == FORMAT_VERSION
    }

    /// Sum of each state's own count
    pub fn total_resource_count(&self) -> usize {
        self.services.total_resource_count()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotSummary {
    #[serde(default)]
    pub total_resource_count: usize,
    #[serde(default)]
    pub service_count: usize,
}

impl SnapshotSummary {
    pub fn of(services: &ServiceStates) -> Self {
        Self {
            total_resource_count: services.total_resource_count(),
            service_count: services.len(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct S3State {
    #[serde(default)]
    pub buckets: Vec<BucketRecord>,
    #[serde(default)]
    pub resource_count: usize,
}

impl S3State {
    pub fn new(buckets: Vec<BucketRecord>) -> Self {
        let resource_count = buckets.len();
        Self {
            buckets,
            resource_count,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BucketRecord {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creation_date: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub objects: Vec<ObjectRecord>,
}

impl BucketRecord {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }
}

/// Object metadata only; payloads are never captured
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectRecord {
    pub key: String,
    #[serde(default)]
    pub size: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub etag: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DynamoDbState {
    #[serde(default)]
    pub tables: Vec<TableRecord>,
    #[serde(default)]
    pub resource_count: usize,
}

impl DynamoDbState {
    pub fn new(tables: Vec<TableRecord>) -> Self {
        let resource_count = tables.len();
        Self {
            tables,
            resource_count,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableRecord {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub key_schema: Vec<KeySchemaElement>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attribute_definitions: Vec<AttributeDefinition>,
    /// Present only when item-level detail was requested
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item_count: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeySchemaElement {
    pub attribute_name: String,
    pub key_type: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttributeDefinition {
    pub attribute_name: String,
    pub attribute_type: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SqsState {
    #[serde(default)]
    pub queues: Vec<String>,
    #[serde(default)]
    pub resource_count: usize,
}

impl SqsState {
    pub fn new(queues: Vec<String>) -> Self {
        let resource_count = queues.len();
        Self {
            queues,
            resource_count,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnsState {
    #[serde(default)]
    pub topics: Vec<String>,
    #[serde(default)]
    pub resource_count: usize,
}

impl SnsState {
    pub fn new(topics: Vec<String>) -> Self {
        let resource_count = topics.len();
        Self {
            topics,
            resource_count,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LambdaState {
    #[serde(default)]
    pub functions: Vec<FunctionRecord>,
    #[serde(default)]
    pub resource_count: usize,
}

impl LambdaState {
    pub fn new(functions: Vec<FunctionRecord>) -> Self {
        let resource_count = functions.len();
        Self {
            functions,
            resource_count,
        }
    }
}

/// Function configuration; the deployment package is never captured
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FunctionRecord {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub runtime: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub handler: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory_size: Option<u32>,
}

/// State captured for one service kind
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ServiceState {
    S3(S3State),
    DynamoDb(DynamoDbState),
    Sqs(SqsState),
    Sns(SnsState),
    Lambda(LambdaState),
}

impl ServiceState {
    /// A state with zero resources
    pub fn empty(kind: ServiceKind) -> Self {
        match kind {
            ServiceKind::S3 => ServiceState::S3(S3State::default()),
            ServiceKind::DynamoDb => ServiceState::DynamoDb(DynamoDbState::default()),
            ServiceKind::Sqs => ServiceState::Sqs(SqsState::default()),
            ServiceKind::Sns => ServiceState::Sns(SnsState::default()),
            ServiceKind::Lambda => ServiceState::Lambda(LambdaState::default()),
        }
    }

    pub fn kind(&self) -> ServiceKind {
        match self {
            ServiceState::S3(_) => ServiceKind::S3,
            ServiceState::DynamoDb(_) => ServiceKind::DynamoDb,
            ServiceState::Sqs(_) => ServiceKind::Sqs,
            ServiceState::Sns(_) => ServiceKind::Sns,
            ServiceState::Lambda(_) => ServiceKind::Lambda,
        }
    }

    /// The count stored in the record
    pub fn resource_count(&self) -> usize {
        match self {
            ServiceState::S3(s) => s.resource_count,
            ServiceState::DynamoDb(s) => s.resource_count,
            ServiceState::Sqs(s) => s.resource_count,
            ServiceState::Sns(s) => s.resource_count,
            ServiceState::Lambda(s) => s.resource_count,
        }
    }

    /// Length of the item list, which is what import acts on
    pub fn listed_count(&self) -> usize {
        match self {
            ServiceState::S3(s) => s.buckets.len(),
            ServiceState::DynamoDb(s) => s.tables.len(),
            ServiceState::Sqs(s) => s.queues.len(),
            ServiceState::Sns(s) => s.topics.len(),
            ServiceState::Lambda(s) => s.functions.len(),
        }
    }

    pub fn resource_names(&self) -> Vec<String> {
        match self {
            ServiceState::S3(s) => s.buckets.iter().map(|b| b.name.clone()).collect(),
            ServiceState::DynamoDb(s) => s.tables.iter().map(|t| t.name.clone()).collect(),
            ServiceState::Sqs(s) => s.queues.clone(),
            ServiceState::Sns(s) => s.topics.clone(),
            ServiceState::Lambda(s) => s.functions.iter().map(|f| f.name.clone()).collect(),
        }
    }
}

/// Ordered `kind → state` mapping.
///
/// Serialized as a map keyed by kind name. Unknown keys are skipped when
/// reading; a repeated key replaces the earlier entry in place.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServiceStates {
    entries: Vec<ServiceState>,
}

impl ServiceStates {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, state: ServiceState) {
        let kind = state.kind();
        match self.entries.iter_mut().find(|s| s.kind() == kind) {
            Some(existing) => *existing = state,
            None => self.entries.push(state),
        }
    }

    pub fn get(&self, kind: ServiceKind) -> Option<&ServiceState> {
        self.entries.iter().find(|s| s.kind() == kind)
    }

    pub fn contains(&self, kind: ServiceKind) -> bool {
        self.get(kind).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ServiceState> {
        self.entries.iter()
    }

    pub fn kinds(&self) -> Vec<ServiceKind> {
        self.entries.iter().map(ServiceState::kind).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn total_resource_count(&self) -> usize {
        self.entries.iter().map(ServiceState::resource_count).sum()
    }
}

impl FromIterator<ServiceState> for ServiceStates {
    fn from_iter<I: IntoIterator<Item = ServiceState>>(iter: I) -> Self {
        let mut states = ServiceStates::new();
        for state in iter {
            states.insert(state);
        }
        states
    }
}

impl Serialize for ServiceStates {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for state in &self.entries {
            map.serialize_entry(state.kind().as_str(), state)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for ServiceStates {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct StatesVisitor;

        impl<'de> Visitor<'de> for StatesVisitor {
            type Value = ServiceStates;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map of service kind to service state")
            }

            fn visit_unit<E: serde::de::Error>(self) -> Result<Self::Value, E> {
                Ok(ServiceStates::new())
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
                let mut states = ServiceStates::new();
                while let Some(key) = map.next_key::<String>()? {
                    let state = match key.parse::<ServiceKind>() {
                        Ok(ServiceKind::S3) => ServiceState::S3(map.next_value()?),
                        Ok(ServiceKind::DynamoDb) => ServiceState::DynamoDb(map.next_value()?),
                        Ok(ServiceKind::Sqs) => ServiceState::Sqs(map.next_value()?),
                        Ok(ServiceKind::Sns) => ServiceState::Sns(map.next_value()?),
                        Ok(ServiceKind::Lambda) => ServiceState::Lambda(map.next_value()?),
                        Err(_) => {
                            map.next_value::<IgnoredAny>()?;
                            continue;
                        }
                    };
                    states.insert(state);
                }
                Ok(states)
            }
        }

        deserializer.deserialize_any(StatesVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constructors_derive_counts() {
        let s3 = S3State::new(vec![BucketRecord::named("a"), BucketRecord::named("b")]);
        assert_eq!(s3.resource_count, 2);

        let sqs = SqsState::new(vec![]);
        assert_eq!(sqs.resource_count, 0);
    }

    #[test]
    fn test_insert_replaces_same_kind() {
        let mut states = ServiceStates::new();
        states.insert(ServiceState::Sqs(SqsState::new(vec!["q1".to_string()])));
        states.insert(ServiceState::S3(S3State::default()));
        states.insert(ServiceState::Sqs(SqsState::new(vec![
            "q1".to_string(),
            "q2".to_string(),
        ])));

        assert_eq!(states.kinds(), vec![ServiceKind::Sqs, ServiceKind::S3]);
        assert_eq!(states.total_resource_count(), 2);
    }

    #[test]
    fn test_summary_matches_states() {
        let states: ServiceStates = vec![
            ServiceState::S3(S3State::new(vec![BucketRecord::named("a")])),
            ServiceState::Sns(SnsState::new(vec!["arn:1".to_string(), "arn:2".to_string()])),
        ]
        .into_iter()
        .collect();

        let snapshot = Snapshot::new(Utc::now(), states);
        assert_eq!(snapshot.summary.total_resource_count, 3);
        assert_eq!(snapshot.summary.service_count, 2);
        assert!(snapshot.is_current_version());
    }

    #[test]
    fn test_unknown_kinds_are_skipped_and_order_kept() {
        let yaml = r#"
lambda:
  functions: []
  resourceCount: 0
kinesis:
  streams: [a, b]
s3:
  buckets:
    - name: assets
  resourceCount: 1
"#;
        let states: ServiceStates = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(states.kinds(), vec![ServiceKind::Lambda, ServiceKind::S3]);
        assert_eq!(states.get(ServiceKind::S3).unwrap().resource_names(), vec!["assets"]);
    }

    #[test]
    fn test_empty_services_value() {
        let states: ServiceStates = serde_yaml::from_str("~").unwrap();
        assert!(states.is_empty());
    }

    #[test]
    fn test_untagged_state_serializes_inner_record() {
        let state = ServiceState::Sqs(SqsState::default());
        let value = serde_json::to_value(&state).unwrap();
        assert_eq!(value, serde_json::json!({"queues": [], "resourceCount": 0}));
    }
}
