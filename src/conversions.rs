//! Type conversions between DynamoDB JSON and `AttributeValue`.
//!
//! Items are persisted in the DynamoDB JSON form the service speaks on the
//! wire: every attribute is a single-key object naming its type
//! (`{"S": "abc"}`, `{"N": "42"}`, `{"M": {...}}`). Binary values are
//! base64 encoded.

use aws_sdk_dynamodb::primitives::Blob;
use aws_sdk_dynamodb::types::AttributeValue;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde_json::{Map, Value};
use std::collections::HashMap;

use crate::store::Item;

/// Convert a DynamoDB AttributeValue to its DynamoDB JSON form.
pub fn attribute_value_to_json(value: &AttributeValue) -> Result<Value, String> {
    let (tag, inner) = match value {
        AttributeValue::S(s) => ("S", Value::String(s.clone())),
        AttributeValue::N(n) => ("N", Value::String(n.clone())),
        AttributeValue::Bool(b) => ("BOOL", Value::Bool(*b)),
        AttributeValue::Null(b) => ("NULL", Value::Bool(*b)),
        AttributeValue::B(b) => ("B", Value::String(BASE64.encode(b.as_ref()))),
        AttributeValue::Ss(ss) => (
            "SS",
            Value::Array(ss.iter().cloned().map(Value::String).collect()),
        ),
        AttributeValue::Ns(ns) => (
            "NS",
            Value::Array(ns.iter().cloned().map(Value::String).collect()),
        ),
        AttributeValue::Bs(bs) => (
            "BS",
            Value::Array(
                bs.iter()
                    .map(|b| Value::String(BASE64.encode(b.as_ref())))
                    .collect(),
            ),
        ),
        AttributeValue::L(list) => (
            "L",
            Value::Array(
                list.iter()
                    .map(attribute_value_to_json)
                    .collect::<Result<Vec<_>, _>>()?,
            ),
        ),
        AttributeValue::M(map) => ("M", Value::Object(item_to_json(map)?)),
        _ => return Err("unknown DynamoDB AttributeValue type".to_string()),
    };

    let mut wrapper = Map::with_capacity(1);
    wrapper.insert(tag.to_string(), inner);
    Ok(Value::Object(wrapper))
}

/// Convert an item to a JSON object of DynamoDB JSON attributes.
///
/// `serde_json::Map` keeps keys sorted, so the output is stable for a given item.
pub fn item_to_json(item: &HashMap<String, AttributeValue>) -> Result<Map<String, Value>, String> {
    let mut object = Map::new();
    for (key, value) in item {
        let json = attribute_value_to_json(value).map_err(|e| format!("attribute '{}': {}", key, e))?;
        object.insert(key.clone(), json);
    }
    Ok(object)
}

/// Convert a DynamoDB JSON attribute (`{"S": "..."}`) to an AttributeValue.
pub fn json_to_attribute_value(value: &Value) -> Result<AttributeValue, String> {
    let object = value
        .as_object()
        .ok_or_else(|| format!("expected a typed attribute object, got {}", type_name(value)))?;

    if object.len() != 1 {
        return Err(format!(
            "typed attribute must have exactly one type key, got {}",
            object.len()
        ));
    }

    // len() == 1 checked above
    let Some((tag, inner)) = object.iter().next() else {
        return Err("empty typed attribute".to_string());
    };

    match tag.as_str() {
        "S" => Ok(AttributeValue::S(expect_str(tag, inner)?.to_string())),
        "N" => Ok(AttributeValue::N(number_text(inner)?)),
        "BOOL" => inner
            .as_bool()
            .map(AttributeValue::Bool)
            .ok_or_else(|| "BOOL must be a boolean".to_string()),
        "NULL" => inner
            .as_bool()
            .map(AttributeValue::Null)
            .ok_or_else(|| "NULL must be a boolean".to_string()),
        "B" => Ok(AttributeValue::B(decode_blob(expect_str(tag, inner)?)?)),
        "SS" => {
            let strings = expect_array(tag, inner)?
                .iter()
                .map(|v| expect_str(tag, v).map(str::to_string))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(AttributeValue::Ss(strings))
        }
        "NS" => {
            let numbers = expect_array(tag, inner)?
                .iter()
                .map(number_text)
                .collect::<Result<Vec<_>, _>>()?;
            Ok(AttributeValue::Ns(numbers))
        }
        "BS" => {
            let blobs = expect_array(tag, inner)?
                .iter()
                .map(|v| expect_str(tag, v).and_then(decode_blob))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(AttributeValue::Bs(blobs))
        }
        "L" => {
            let items = expect_array(tag, inner)?
                .iter()
                .map(json_to_attribute_value)
                .collect::<Result<Vec<_>, _>>()?;
            Ok(AttributeValue::L(items))
        }
        "M" => {
            let map = inner
                .as_object()
                .ok_or_else(|| "M must be an object".to_string())?;
            Ok(AttributeValue::M(json_to_item(map)?))
        }
        other => Err(format!("unsupported attribute type '{}'", other)),
    }
}

/// Convert a JSON object of DynamoDB JSON attributes into an item.
pub fn json_to_item(object: &Map<String, Value>) -> Result<Item, String> {
    let mut item = HashMap::with_capacity(object.len());
    for (key, value) in object {
        let attr = json_to_attribute_value(value).map_err(|e| format!("attribute '{}': {}", key, e))?;
        item.insert(key.clone(), attr);
    }
    Ok(item)
}

fn expect_str<'a>(tag: &str, value: &'a Value) -> Result<&'a str, String> {
    value
        .as_str()
        .ok_or_else(|| format!("{} expects strings, got {}", tag, type_name(value)))
}

fn expect_array<'a>(tag: &str, value: &'a Value) -> Result<&'a Vec<Value>, String> {
    value
        .as_array()
        .ok_or_else(|| format!("{} must be an array, got {}", tag, type_name(value)))
}

/// Numbers are strings in DynamoDB JSON; bare JSON numbers are accepted too.
fn number_text(value: &Value) -> Result<String, String> {
    match value {
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(format!("N expects a number string, got {}", type_name(other))),
    }
}

fn decode_blob(encoded: &str) -> Result<Blob, String> {
    BASE64
        .decode(encoded)
        .map(Blob::new)
        .map_err(|e| format!("invalid base64 binary value: {}", e))
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn nested_item_roundtrips() {
        let mut inner = HashMap::new();
        inner.insert("flag".to_string(), AttributeValue::Bool(true));
        inner.insert("nothing".to_string(), AttributeValue::Null(true));

        let mut item = HashMap::new();
        item.insert("id".to_string(), AttributeValue::S("user#1".to_string()));
        item.insert("age".to_string(), AttributeValue::N("42".to_string()));
        item.insert("blob".to_string(), AttributeValue::B(Blob::new(vec![0u8, 159, 255])));
        item.insert(
            "tags".to_string(),
            AttributeValue::Ss(vec!["a".to_string(), "b".to_string()]),
        );
        item.insert(
            "list".to_string(),
            AttributeValue::L(vec![AttributeValue::N("1".to_string()), AttributeValue::M(inner)]),
        );

        let json = item_to_json(&item).unwrap();
        assert_eq!(json["id"], json!({"S": "user#1"}));
        assert_eq!(json["blob"], json!({"B": "AJ//"}));

        let back = json_to_item(&json).unwrap();
        assert_eq!(back, item);
    }

    #[test]
    fn bare_json_numbers_are_accepted() {
        let value = json_to_attribute_value(&json!({"N": 7})).unwrap();
        assert_eq!(value, AttributeValue::N("7".to_string()));
    }

    #[test]
    fn untyped_values_are_rejected() {
        assert!(json_to_attribute_value(&json!("plain")).is_err());
        assert!(json_to_attribute_value(&json!({"S": "a", "N": "1"})).is_err());
        assert!(json_to_attribute_value(&json!({"X": "a"})).is_err());
        assert!(json_to_attribute_value(&json!({"SS": ["a", 1]})).is_err());
        assert!(json_to_attribute_value(&json!({"B": "not base64!"})).is_err());
    }

    #[test]
    fn item_errors_name_the_attribute() {
        let object = json!({"id": {"S": 5}});
        let err = json_to_item(object.as_object().unwrap()).unwrap_err();
        assert!(err.contains("'id'"), "{}", err);
    }
}
