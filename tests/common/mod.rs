#![allow(dead_code)]

use aws_sdk_dynamodb::types::AttributeValue;

use dynadump::schema::{
    AttributeDefinition, IndexDef, KeyElement, KeyType, Projection, ProjectionType, ScalarType,
    SchemaSnapshot, Throughput,
};
use dynadump::store::Item;

/// Hash key `id` (N), with a GSI on `email` and an LSI-free layout.
pub fn users_schema(name: &str) -> SchemaSnapshot {
    SchemaSnapshot {
        table_name: name.to_string(),
        attribute_definitions: vec![
            AttributeDefinition {
                attribute_name: "id".to_string(),
                attribute_type: ScalarType::N,
            },
            AttributeDefinition {
                attribute_name: "email".to_string(),
                attribute_type: ScalarType::S,
            },
        ],
        key_schema: vec![KeyElement {
            attribute_name: "id".to_string(),
            key_type: KeyType::Hash,
        }],
        provisioned_throughput: Throughput {
            read_capacity_units: 5,
            write_capacity_units: 5,
        },
        global_secondary_indexes: Some(vec![IndexDef {
            index_name: "by-email".to_string(),
            key_schema: vec![KeyElement {
                attribute_name: "email".to_string(),
                key_type: KeyType::Hash,
            }],
            projection: Projection {
                projection_type: ProjectionType::All,
                non_key_attributes: None,
            },
            provisioned_throughput: Some(Throughput {
                read_capacity_units: 2,
                write_capacity_units: 2,
            }),
        }]),
        local_secondary_indexes: None,
    }
}

pub fn user(id: usize) -> Item {
    let mut item = Item::new();
    item.insert("id".to_string(), AttributeValue::N(id.to_string()));
    item.insert("email".to_string(), AttributeValue::S(format!("user{}@example.com", id)));
    item.insert("active".to_string(), AttributeValue::Bool(id % 2 == 0));
    item.insert(
        "tags".to_string(),
        AttributeValue::Ss(vec!["a".to_string(), format!("t{}", id)]),
    );
    item
}

pub fn users(count: usize) -> Vec<Item> {
    (0..count).map(user).collect()
}

/// Items sorted by their numeric `id`.
pub fn sorted_by_id(mut items: Vec<Item>) -> Vec<Item> {
    items.sort_by_key(|item| match item.get("id") {
        Some(AttributeValue::N(n)) => n.parse::<u64>().unwrap(),
        _ => u64::MAX,
    });
    items
}
