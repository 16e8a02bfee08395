//! Table schema snapshots.
//!
//! A [`SchemaSnapshot`] is the structural half of a table backup: keys,
//! attribute definitions, throughput and secondary indexes. It is persisted
//! in the `DescribeTable` response shape (`{"Table": {...}}`, PascalCase)
//! so schema files stay interchangeable with the service's own JSON.

use aws_sdk_dynamodb::types as sdk;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::errors::{DumpError, Result};

/// Key role within a key schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum KeyType {
    #[serde(rename = "HASH")]
    Hash,
    #[serde(rename = "RANGE")]
    Range,
}

/// Scalar types allowed for key attributes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScalarType {
    S,
    N,
    B,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProjectionType {
    #[serde(rename = "ALL")]
    All,
    #[serde(rename = "KEYS_ONLY")]
    KeysOnly,
    #[serde(rename = "INCLUDE")]
    Include,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AttributeDefinition {
    pub attribute_name: String,
    pub attribute_type: ScalarType,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct KeyElement {
    pub attribute_name: String,
    pub key_type: KeyType,
}

/// Provisioned capacity. Zero means the store reported none (on-demand).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Throughput {
    #[serde(default)]
    pub read_capacity_units: i64,
    #[serde(default)]
    pub write_capacity_units: i64,
}

impl Throughput {
    /// Capacity to provision: each unit falls back to 1 when absent or zero.
    pub fn or_minimum(&self) -> Throughput {
        Throughput {
            read_capacity_units: self.read_capacity_units.max(1),
            write_capacity_units: self.write_capacity_units.max(1),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Projection {
    pub projection_type: ProjectionType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub non_key_attributes: Option<Vec<String>>,
}

/// A global or local secondary index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct IndexDef {
    pub index_name: String,
    pub key_schema: Vec<KeyElement>,
    pub projection: Projection,
    /// Only global indexes carry capacity.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provisioned_throughput: Option<Throughput>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SchemaSnapshot {
    pub table_name: String,
    #[serde(default)]
    pub attribute_definitions: Vec<AttributeDefinition>,
    pub key_schema: Vec<KeyElement>,
    #[serde(default)]
    pub provisioned_throughput: Throughput,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub global_secondary_indexes: Option<Vec<IndexDef>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local_secondary_indexes: Option<Vec<IndexDef>>,
}

/// On-disk wrapper matching the `DescribeTable` output.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct SchemaDocument {
    table: SchemaSnapshot,
}

impl SchemaSnapshot {
    /// Check the invariants a snapshot must hold to be provisioned.
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.table_name.is_empty() {
            return Err("TableName is empty".to_string());
        }
        if self.key_schema.is_empty() {
            return Err(format!("KeySchema of '{}' is empty", self.table_name));
        }
        for index in self
            .global_secondary_indexes
            .iter()
            .chain(self.local_secondary_indexes.iter())
            .flatten()
        {
            if index.key_schema.is_empty() {
                return Err(format!("KeySchema of index '{}' is empty", index.index_name));
            }
        }
        Ok(())
    }

    /// Serialize as a pretty-printed schema document.
    pub fn to_document(&self) -> Result<String> {
        let document = SchemaDocument { table: self.clone() };
        serde_json::to_string_pretty(&document)
            .map_err(|e| DumpError::InvalidRequest(format!("failed to serialize schema: {}", e)))
    }

    /// Parse a schema document read from `path`.
    pub fn from_document(path: &Path, bytes: &[u8]) -> Result<Self> {
        let document: SchemaDocument =
            serde_json::from_slice(bytes).map_err(|e| DumpError::malformed(path, e))?;
        document
            .table
            .validate()
            .map_err(|reason| DumpError::malformed(path, reason))?;
        Ok(document.table)
    }

    /// Read and validate the schema file at `path`.
    pub async fn read(path: &Path) -> Result<Self> {
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| DumpError::io(path, e))?;
        Self::from_document(path, &bytes)
    }

    /// Build a snapshot from a `DescribeTable` description.
    pub fn from_description(description: &sdk::TableDescription) -> Result<Self> {
        let table_name = description
            .table_name()
            .ok_or_else(|| DumpError::InvalidRequest("table description has no name".to_string()))?
            .to_string();

        let attribute_definitions = description
            .attribute_definitions()
            .iter()
            .map(|def| {
                Ok(AttributeDefinition {
                    attribute_name: def.attribute_name().to_string(),
                    attribute_type: scalar_type_from_sdk(def.attribute_type())?,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let key_schema = key_schema_from_sdk(description.key_schema())?;

        let provisioned_throughput = description
            .provisioned_throughput()
            .map(throughput_from_sdk)
            .unwrap_or_default();

        let global_secondary_indexes = non_empty(description.global_secondary_indexes())
            .map(|indexes| {
                indexes
                    .iter()
                    .map(|gsi| {
                        Ok(IndexDef {
                            index_name: gsi.index_name().unwrap_or_default().to_string(),
                            key_schema: key_schema_from_sdk(gsi.key_schema())?,
                            projection: projection_from_sdk(gsi.projection())?,
                            provisioned_throughput: Some(
                                gsi.provisioned_throughput()
                                    .map(throughput_from_sdk)
                                    .unwrap_or_default(),
                            ),
                        })
                    })
                    .collect::<Result<Vec<_>>>()
            })
            .transpose()?;

        let local_secondary_indexes = non_empty(description.local_secondary_indexes())
            .map(|indexes| {
                indexes
                    .iter()
                    .map(|lsi| {
                        Ok(IndexDef {
                            index_name: lsi.index_name().unwrap_or_default().to_string(),
                            key_schema: key_schema_from_sdk(lsi.key_schema())?,
                            projection: projection_from_sdk(lsi.projection())?,
                            provisioned_throughput: None,
                        })
                    })
                    .collect::<Result<Vec<_>>>()
            })
            .transpose()?;

        Ok(SchemaSnapshot {
            table_name,
            attribute_definitions,
            key_schema,
            provisioned_throughput,
            global_secondary_indexes,
            local_secondary_indexes,
        })
    }
}

fn non_empty<T>(slice: &[T]) -> Option<&[T]> {
    if slice.is_empty() { None } else { Some(slice) }
}

fn unsupported(what: &str, value: &str) -> DumpError {
    DumpError::InvalidRequest(format!("unsupported {} '{}'", what, value))
}

fn scalar_type_from_sdk(value: &sdk::ScalarAttributeType) -> Result<ScalarType> {
    match value {
        sdk::ScalarAttributeType::S => Ok(ScalarType::S),
        sdk::ScalarAttributeType::N => Ok(ScalarType::N),
        sdk::ScalarAttributeType::B => Ok(ScalarType::B),
        other => Err(unsupported("attribute type", other.as_str())),
    }
}

fn key_schema_from_sdk(elements: &[sdk::KeySchemaElement]) -> Result<Vec<KeyElement>> {
    elements
        .iter()
        .map(|element| {
            let key_type = match element.key_type() {
                sdk::KeyType::Hash => KeyType::Hash,
                sdk::KeyType::Range => KeyType::Range,
                other => return Err(unsupported("key type", other.as_str())),
            };
            Ok(KeyElement {
                attribute_name: element.attribute_name().to_string(),
                key_type,
            })
        })
        .collect()
}

fn projection_from_sdk(projection: Option<&sdk::Projection>) -> Result<Projection> {
    let projection_type = match projection.and_then(|p| p.projection_type()) {
        Some(sdk::ProjectionType::All) | None => ProjectionType::All,
        Some(sdk::ProjectionType::KeysOnly) => ProjectionType::KeysOnly,
        Some(sdk::ProjectionType::Include) => ProjectionType::Include,
        Some(other) => return Err(unsupported("projection type", other.as_str())),
    };
    let non_key_attributes = projection
        .map(|p| p.non_key_attributes())
        .and_then(non_empty)
        .map(<[String]>::to_vec);
    Ok(Projection {
        projection_type,
        non_key_attributes,
    })
}

fn throughput_from_sdk(description: &sdk::ProvisionedThroughputDescription) -> Throughput {
    Throughput {
        read_capacity_units: description.read_capacity_units().unwrap_or_default(),
        write_capacity_units: description.write_capacity_units().unwrap_or_default(),
    }
}

impl KeyType {
    pub fn to_sdk(self) -> sdk::KeyType {
        match self {
            KeyType::Hash => sdk::KeyType::Hash,
            KeyType::Range => sdk::KeyType::Range,
        }
    }
}

impl ScalarType {
    pub fn to_sdk(self) -> sdk::ScalarAttributeType {
        match self {
            ScalarType::S => sdk::ScalarAttributeType::S,
            ScalarType::N => sdk::ScalarAttributeType::N,
            ScalarType::B => sdk::ScalarAttributeType::B,
        }
    }
}

impl ProjectionType {
    pub fn to_sdk(self) -> sdk::ProjectionType {
        match self {
            ProjectionType::All => sdk::ProjectionType::All,
            ProjectionType::KeysOnly => sdk::ProjectionType::KeysOnly,
            ProjectionType::Include => sdk::ProjectionType::Include,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DESCRIBE_OUTPUT: &str = r#"{
      "Table": {
        "AttributeDefinitions": [
          {"AttributeName": "pk", "AttributeType": "S"},
          {"AttributeName": "sk", "AttributeType": "N"},
          {"AttributeName": "email", "AttributeType": "S"}
        ],
        "TableName": "users",
        "KeySchema": [
          {"AttributeName": "pk", "KeyType": "HASH"},
          {"AttributeName": "sk", "KeyType": "RANGE"}
        ],
        "TableStatus": "ACTIVE",
        "ProvisionedThroughput": {
          "NumberOfDecreasesToday": 0,
          "ReadCapacityUnits": 0,
          "WriteCapacityUnits": 0
        },
        "ItemCount": 12,
        "GlobalSecondaryIndexes": [{
          "IndexName": "by-email",
          "KeySchema": [{"AttributeName": "email", "KeyType": "HASH"}],
          "Projection": {"ProjectionType": "INCLUDE", "NonKeyAttributes": ["name"]},
          "IndexStatus": "ACTIVE",
          "ProvisionedThroughput": {"ReadCapacityUnits": 3, "WriteCapacityUnits": 0}
        }]
      }
    }"#;

    #[test]
    fn parses_describe_table_output() {
        let snapshot =
            SchemaSnapshot::from_document(Path::new("users.json"), DESCRIBE_OUTPUT.as_bytes())
                .unwrap();

        assert_eq!(snapshot.table_name, "users");
        assert_eq!(snapshot.key_schema.len(), 2);
        assert_eq!(snapshot.key_schema[1].key_type, KeyType::Range);
        assert_eq!(snapshot.attribute_definitions[1].attribute_type, ScalarType::N);
        assert!(snapshot.local_secondary_indexes.is_none());

        let gsi = &snapshot.global_secondary_indexes.as_ref().unwrap()[0];
        assert_eq!(gsi.projection.projection_type, ProjectionType::Include);
        assert_eq!(
            gsi.provisioned_throughput.unwrap().or_minimum(),
            Throughput {
                read_capacity_units: 3,
                write_capacity_units: 1
            }
        );
    }

    #[test]
    fn document_roundtrip_keeps_shape() {
        let snapshot =
            SchemaSnapshot::from_document(Path::new("users.json"), DESCRIBE_OUTPUT.as_bytes())
                .unwrap();
        let text = snapshot.to_document().unwrap();

        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["Table"]["TableName"], "users");
        assert!(value["Table"].get("LocalSecondaryIndexes").is_none());

        let reparsed = SchemaSnapshot::from_document(Path::new("users.json"), text.as_bytes()).unwrap();
        assert_eq!(reparsed, snapshot);
    }

    #[test]
    fn empty_key_schema_is_malformed() {
        let doc = r#"{"Table": {"TableName": "t", "KeySchema": []}}"#;
        let err = SchemaSnapshot::from_document(Path::new("t.json"), doc.as_bytes()).unwrap_err();
        assert!(matches!(err, DumpError::MalformedArtifact { .. }));
    }

    #[test]
    fn invalid_json_is_malformed() {
        let err = SchemaSnapshot::from_document(Path::new("t.json"), b"{ not json").unwrap_err();
        assert!(matches!(err, DumpError::MalformedArtifact { .. }));
    }

    #[test]
    fn minimum_throughput_defaults_zero_to_one() {
        let throughput = Throughput::default().or_minimum();
        assert_eq!(throughput.read_capacity_units, 1);
        assert_eq!(throughput.write_capacity_units, 1);
    }
}
