//! DynamoDB-backed table store.

use async_trait::async_trait;
use aws_sdk_dynamodb::Client;
use aws_sdk_dynamodb::types::{
    AttributeDefinition, GlobalSecondaryIndex, KeySchemaElement, LocalSecondaryIndex, Projection,
    ProvisionedThroughput, TableStatus,
};
use std::time::{Duration, Instant};
use tracing::debug;

use crate::client::{ClientConfig, build_client};
use crate::errors::{DumpError, Result, TransportKind, map_sdk_error};
use crate::schema::{self, IndexDef, KeyElement, SchemaSnapshot, Throughput};
use crate::store::{Cursor, Item, ScanPage, TableStore};
use crate::table_operations::PreparedCreateTable;

/// How long to poll for a created table to turn ACTIVE or a deleted one to disappear.
#[derive(Debug, Clone, Copy)]
pub struct WaitConfig {
    pub poll_interval: Duration,
    pub timeout: Duration,
}

impl Default for WaitConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(500),
            timeout: Duration::from_secs(300),
        }
    }
}

/// [`TableStore`] over the AWS SDK DynamoDB client.
#[derive(Debug, Clone)]
pub struct DynamoStore {
    client: Client,
    wait: Option<WaitConfig>,
}

impl DynamoStore {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            wait: Some(WaitConfig::default()),
        }
    }

    /// Build the SDK client from `config` and wrap it.
    pub async fn connect(config: &ClientConfig) -> Self {
        Self::new(build_client(config).await)
    }

    /// Replace the table status wait policy. `None` disables waiting.
    pub fn with_wait(mut self, wait: Option<WaitConfig>) -> Self {
        self.wait = wait;
        self
    }

    /// Current status of `table`, or `None` if it does not exist.
    async fn table_status(&self, table: &str) -> Result<Option<TableStatus>> {
        match self.client.describe_table().table_name(table).send().await {
            Ok(output) => Ok(output.table().and_then(|t| t.table_status()).cloned()),
            Err(e) => match map_sdk_error(e, "DescribeTable", Some(table)) {
                DumpError::TableNotFound(_) => Ok(None),
                other => Err(other),
            },
        }
    }

    /// Poll until the status of `table` equals `target` (`None` = gone).
    async fn wait_for_status(&self, table: &str, target: Option<TableStatus>) -> Result<()> {
        let Some(wait) = self.wait else {
            return Ok(());
        };

        let start = Instant::now();
        loop {
            let status = self.table_status(table).await?;
            if status == target {
                return Ok(());
            }
            if start.elapsed() >= wait.timeout {
                return Err(DumpError::transport(
                    "DescribeTable",
                    Some(table),
                    TransportKind::Other,
                    format!(
                        "timed out after {:?} waiting for status {:?} (last seen {:?})",
                        wait.timeout, target, status
                    ),
                ));
            }
            debug!(table = %table, status = ?status, "waiting for table status");
            tokio::time::sleep(wait.poll_interval).await;
        }
    }
}

fn build_error(what: &str, e: impl std::fmt::Display) -> DumpError {
    DumpError::InvalidRequest(format!("Failed to build {}: {}", what, e))
}

fn build_key_schema(elements: &[KeyElement]) -> Result<Vec<KeySchemaElement>> {
    elements
        .iter()
        .map(|element| {
            KeySchemaElement::builder()
                .attribute_name(&element.attribute_name)
                .key_type(element.key_type.to_sdk())
                .build()
                .map_err(|e| build_error("key schema element", e))
        })
        .collect()
}

fn build_throughput(throughput: Throughput) -> Result<ProvisionedThroughput> {
    ProvisionedThroughput::builder()
        .read_capacity_units(throughput.read_capacity_units)
        .write_capacity_units(throughput.write_capacity_units)
        .build()
        .map_err(|e| build_error("provisioned throughput", e))
}

fn build_projection(projection: &schema::Projection) -> Projection {
    Projection::builder()
        .projection_type(projection.projection_type.to_sdk())
        .set_non_key_attributes(projection.non_key_attributes.clone())
        .build()
}

fn build_gsi(index: &IndexDef) -> Result<GlobalSecondaryIndex> {
    GlobalSecondaryIndex::builder()
        .index_name(&index.index_name)
        .set_key_schema(Some(build_key_schema(&index.key_schema)?))
        .projection(build_projection(&index.projection))
        .provisioned_throughput(build_throughput(
            index.provisioned_throughput.unwrap_or_default().or_minimum(),
        )?)
        .build()
        .map_err(|e| build_error("global secondary index", e))
}

fn build_lsi(index: &IndexDef) -> Result<LocalSecondaryIndex> {
    LocalSecondaryIndex::builder()
        .index_name(&index.index_name)
        .set_key_schema(Some(build_key_schema(&index.key_schema)?))
        .projection(build_projection(&index.projection))
        .build()
        .map_err(|e| build_error("local secondary index", e))
}

#[async_trait]
impl TableStore for DynamoStore {
    async fn list_tables(&self) -> Result<Vec<String>> {
        let mut names = Vec::new();
        let mut start: Option<String> = None;

        loop {
            let output = self
                .client
                .list_tables()
                .set_exclusive_start_table_name(start.take())
                .send()
                .await
                .map_err(|e| map_sdk_error(e, "ListTables", None))?;

            names.extend(output.table_names().iter().cloned());

            match output.last_evaluated_table_name() {
                Some(last) => start = Some(last.to_string()),
                None => break,
            }
        }

        Ok(names)
    }

    async fn describe_table(&self, table: &str) -> Result<SchemaSnapshot> {
        let output = self
            .client
            .describe_table()
            .table_name(table)
            .send()
            .await
            .map_err(|e| map_sdk_error(e, "DescribeTable", Some(table)))?;

        let description = output
            .table()
            .ok_or_else(|| DumpError::TableNotFound(table.to_string()))?;
        SchemaSnapshot::from_description(description)
    }

    async fn create_table(&self, request: &PreparedCreateTable) -> Result<()> {
        let attribute_definitions = request
            .attribute_definitions
            .iter()
            .map(|def| {
                AttributeDefinition::builder()
                    .attribute_name(&def.attribute_name)
                    .attribute_type(def.attribute_type.to_sdk())
                    .build()
                    .map_err(|e| build_error("attribute definition", e))
            })
            .collect::<Result<Vec<_>>>()?;

        let gsis = request
            .global_secondary_indexes
            .as_ref()
            .map(|indexes| indexes.iter().map(build_gsi).collect::<Result<Vec<_>>>())
            .transpose()?;

        let lsis = request
            .local_secondary_indexes
            .as_ref()
            .map(|indexes| indexes.iter().map(build_lsi).collect::<Result<Vec<_>>>())
            .transpose()?;

        self.client
            .create_table()
            .table_name(&request.table_name)
            .set_attribute_definitions(Some(attribute_definitions))
            .set_key_schema(Some(build_key_schema(&request.key_schema)?))
            .provisioned_throughput(build_throughput(request.throughput)?)
            .set_global_secondary_indexes(gsis)
            .set_local_secondary_indexes(lsis)
            .send()
            .await
            .map_err(|e| map_sdk_error(e, "CreateTable", Some(&request.table_name)))?;

        self.wait_for_status(&request.table_name, Some(TableStatus::Active))
            .await
    }

    async fn delete_table(&self, table: &str) -> Result<()> {
        self.client
            .delete_table()
            .table_name(table)
            .send()
            .await
            .map_err(|e| map_sdk_error(e, "DeleteTable", Some(table)))?;

        self.wait_for_status(table, None).await
    }

    async fn scan(&self, table: &str, cursor: Option<Cursor>) -> Result<ScanPage> {
        let output = self
            .client
            .scan()
            .table_name(table)
            .set_exclusive_start_key(cursor)
            .send()
            .await
            .map_err(|e| map_sdk_error(e, "Scan", Some(table)))?;

        Ok(ScanPage {
            items: output.items.unwrap_or_default(),
            next_cursor: output.last_evaluated_key.filter(|key| !key.is_empty()),
        })
    }

    async fn put_item(&self, table: &str, item: Item) -> Result<()> {
        self.client
            .put_item()
            .table_name(table)
            .set_item(Some(item))
            .send()
            .await
            .map(|_| ())
            .map_err(|e| map_sdk_error(e, "PutItem", Some(table)))
    }
}
