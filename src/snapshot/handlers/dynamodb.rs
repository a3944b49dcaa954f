use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use super::{state_mismatch, Extraction, ItemFault, Reconstruction, ServiceHandler, MAX_PAGES};
use crate::emulator::{EmulatorApi, EmulatorError, EmulatorRequest};
use crate::snapshot::error::SnapshotError;
use crate::snapshot::kind::ServiceKind;
use crate::snapshot::model::{
    AttributeDefinition, DynamoDbState, KeySchemaElement, ServiceState, TableRecord,
};

const SERVICE: &str = "dynamodb";
const TARGET_PREFIX: &str = "DynamoDB_20120810";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ListTablesOutput {
    #[serde(default)]
    table_names: Vec<String>,
    last_evaluated_table_name: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct DescribeTableOutput {
    table: TableDescription,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct TableDescription {
    table_status: Option<String>,
    #[serde(default)]
    key_schema: Vec<WireKeySchemaElement>,
    #[serde(default)]
    attribute_definitions: Vec<WireAttributeDefinition>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct WireKeySchemaElement {
    attribute_name: String,
    key_type: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct WireAttributeDefinition {
    attribute_name: String,
    attribute_type: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ScanCountOutput {
    #[serde(default)]
    count: u64,
    last_evaluated_key: Option<Value>,
}

fn request(operation: &str, body: Value) -> EmulatorRequest {
    EmulatorRequest::json_target(SERVICE, format!("{}.{}", TARGET_PREFIX, operation), &body)
}

/// Table schemas, and with detail requested, item counts. Items themselves
/// are never read.
pub struct DynamoDbHandler;

async fn list_tables(api: &dyn EmulatorApi) -> Result<Vec<String>, EmulatorError> {
    let mut names = Vec::new();
    let mut start: Option<String> = None;

    for _ in 0..MAX_PAGES {
        let body = match start.take() {
            Some(name) => json!({ "ExclusiveStartTableName": name }),
            None => json!({}),
        };
        let page: ListTablesOutput = api.call(request("ListTables", body)).await?.json()?;
        names.extend(page.table_names);

        start = page.last_evaluated_table_name;
        if start.is_none() {
            break;
        }
    }

    Ok(names)
}

async fn describe_table(api: &dyn EmulatorApi, name: &str) -> Result<TableRecord, EmulatorError> {
    let output: DescribeTableOutput = api
        .call(request("DescribeTable", json!({ "TableName": name })))
        .await?
        .json()?;

    Ok(TableRecord {
        name: name.to_string(),
        status: output.table.table_status,
        key_schema: output
            .table
            .key_schema
            .into_iter()
            .map(|k| KeySchemaElement {
                attribute_name: k.attribute_name,
                key_type: k.key_type,
            })
            .collect(),
        attribute_definitions: output
            .table
            .attribute_definitions
            .into_iter()
            .map(|a| AttributeDefinition {
                attribute_name: a.attribute_name,
                attribute_type: a.attribute_type,
            })
            .collect(),
        item_count: None,
    })
}

async fn count_items(api: &dyn EmulatorApi, name: &str) -> Result<u64, EmulatorError> {
    let mut total = 0;
    let mut start_key: Option<Value> = None;

    for _ in 0..MAX_PAGES {
        let mut body = json!({ "TableName": name, "Select": "COUNT" });
        if let Some(key) = start_key.take() {
            body["ExclusiveStartKey"] = key;
        }
        let page: ScanCountOutput = api.call(request("Scan", body)).await?.json()?;
        total += page.count;

        start_key = page.last_evaluated_key;
        if start_key.is_none() {
            break;
        }
    }

    Ok(total)
}

#[async_trait]
impl ServiceHandler for DynamoDbHandler {
    fn kind(&self) -> ServiceKind {
        ServiceKind::DynamoDb
    }

    fn recreates_resources(&self) -> bool {
        false
    }

    async fn extract(&self, api: &dyn EmulatorApi, include_details: bool) -> Extraction {
        let names = match list_tables(api).await {
            Ok(names) => names,
            Err(e) => {
                warn!(service = SERVICE, error = %e, "Table listing failed, exporting no tables");
                return Extraction::degraded(ServiceKind::DynamoDb, &e);
            }
        };

        let mut tables = Vec::with_capacity(names.len());
        let mut faults = Vec::new();

        for name in names {
            let mut record = match describe_table(api, &name).await {
                Ok(record) => record,
                Err(e) => {
                    debug!(table = %name, error = %e, "DescribeTable failed");
                    faults.push(ItemFault::new(&name, &e));
                    TableRecord {
                        name: name.clone(),
                        ..Default::default()
                    }
                }
            };

            if include_details {
                match count_items(api, &name).await {
                    Ok(count) => record.item_count = Some(count),
                    Err(e) => {
                        debug!(table = %name, error = %e, "Count scan failed");
                        faults.push(ItemFault::new(&name, &e));
                    }
                }
            }

            tables.push(record);
        }

        info!(service = SERVICE, tables = tables.len(), "Extracted tables");
        Extraction::with_faults(ServiceState::DynamoDb(DynamoDbState::new(tables)), faults)
    }

    async fn reconstruct(
        &self,
        _api: &dyn EmulatorApi,
        state: &ServiceState,
    ) -> Result<Reconstruction, SnapshotError> {
        let ServiceState::DynamoDb(dynamodb) = state else {
            return Err(state_mismatch(ServiceKind::DynamoDb, state));
        };

        Ok(Reconstruction::skip_all(
            ServiceKind::DynamoDb,
            dynamodb.tables.iter().map(|t| t.name.clone()).collect(),
            "table recreation is not supported; schema recorded only",
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::emulator::MockEmulator;
    use crate::snapshot::handlers::ExtractStatus;

    fn tables(extraction: &Extraction) -> &[TableRecord] {
        match &extraction.state {
            ServiceState::DynamoDb(state) => &state.tables,
            other => panic!("expected dynamodb state, got {:?}", other.kind()),
        }
    }

    #[tokio::test]
    async fn test_extract_schema_without_counts() {
        let mock = MockEmulator::new().with_table("users", "user_id", 42);

        let extraction = DynamoDbHandler.extract(&mock, false).await;

        assert_eq!(extraction.status, ExtractStatus::Complete);
        let tables = tables(&extraction);
        assert_eq!(tables.len(), 1);
        assert_eq!(tables[0].status.as_deref(), Some("ACTIVE"));
        assert_eq!(tables[0].key_schema[0].attribute_name, "user_id");
        assert_eq!(tables[0].key_schema[0].key_type, "HASH");
        assert_eq!(tables[0].attribute_definitions[0].attribute_type, "S");
        assert_eq!(tables[0].item_count, None);
        assert!(!mock.calls().iter().any(|c| c.starts_with("dynamodb:Scan")));
    }

    #[tokio::test]
    async fn test_extract_counts_items_with_details() {
        let mock = MockEmulator::new()
            .with_table("users", "user_id", 42)
            .with_table("orders", "order_id", 0);

        let extraction = DynamoDbHandler.extract(&mock, true).await;

        let tables = tables(&extraction);
        assert_eq!(tables[0].item_count, Some(42));
        assert_eq!(tables[1].item_count, Some(0));
        assert!(mock.calls().contains(&"dynamodb:Scan:users".to_string()));
    }

    #[tokio::test]
    async fn test_describe_failure_keeps_table_name() {
        let mock = MockEmulator::new()
            .with_table("users", "user_id", 1)
            .fail("dynamodb", "DescribeTable:users");

        let extraction = DynamoDbHandler.extract(&mock, false).await;

        assert!(matches!(extraction.status, ExtractStatus::Partial { .. }));
        let tables = tables(&extraction);
        assert_eq!(tables[0].name, "users");
        assert!(tables[0].key_schema.is_empty());
        assert_eq!(extraction.state.resource_count(), 1);
    }

    #[tokio::test]
    async fn test_reconstruct_reports_every_table_skipped() {
        let mock = MockEmulator::new();
        let state = ServiceState::DynamoDb(DynamoDbState::new(vec![
            TableRecord {
                name: "users".to_string(),
                ..Default::default()
            },
            TableRecord {
                name: "orders".to_string(),
                ..Default::default()
            },
        ]));

        let outcome = DynamoDbHandler.reconstruct(&mock, &state).await.unwrap();

        assert_eq!(outcome.imported_count(), 0);
        assert_eq!(outcome.skipped_count(), 2);
        assert!(mock.calls().is_empty());
    }
}
