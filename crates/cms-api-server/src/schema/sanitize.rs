//! Schema-driven coercion of request values.
//!
//! Incoming write values are loosely typed JSON. Each declared property pins
//! a primitive type; the value is coerced to it before it ever reaches the
//! persistence layer.

use serde_json::{Map, Value};

use super::{PropertySchema, SchemaType};

/// Coerce `value` to the type its schema declares. Unknown or untyped
/// declarations pass the value through unchanged.
pub fn sanitize_value_from_schema(value: &Value, schema: &PropertySchema) -> Value {
    match schema.kind {
        Some(SchemaType::Integer) => Value::from(coerce_i64(value)),
        Some(SchemaType::Number) => Value::from(coerce_f64(value)),
        Some(SchemaType::String) => Value::from(coerce_string(value)),
        Some(SchemaType::Boolean) => Value::from(coerce_bool(value)),
        Some(SchemaType::Array) => Value::Array(coerce_array(value, schema)),
        Some(SchemaType::Object) => Value::Object(coerce_object(value, schema)),
        None => value.clone(),
    }
}

fn coerce_i64(value: &Value) -> i64 {
    match value {
        Value::Number(n) => n.as_i64().unwrap_or_else(|| n.as_f64().unwrap_or(0.0) as i64),
        Value::String(s) => s.trim().parse::<i64>().unwrap_or(0),
        Value::Bool(b) => i64::from(*b),
        _ => 0,
    }
}

fn coerce_f64(value: &Value) -> f64 {
    match value {
        Value::Number(n) => n.as_f64().unwrap_or(0.0),
        Value::String(s) => s.trim().parse::<f64>().unwrap_or(0.0),
        Value::Bool(b) => f64::from(u8::from(*b)),
        _ => 0.0,
    }
}

fn coerce_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => String::new(),
    }
}

fn coerce_bool(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map_or(false, |f| f != 0.0),
        Value::String(s) => !matches!(s.as_str(), "" | "0" | "false" | "FALSE"),
        _ => false,
    }
}

fn coerce_array(value: &Value, schema: &PropertySchema) -> Vec<Value> {
    let item_schema = schema.items.as_deref();
    let sanitize_item = |v: &Value| match item_schema {
        Some(s) => sanitize_value_from_schema(v, s),
        None => v.clone(),
    };

    match value {
        Value::Array(items) => items.iter().map(sanitize_item).collect(),
        // A comma-separated scalar is accepted as a list.
        Value::String(s) => s
            .split(',')
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(|p| sanitize_item(&Value::from(p)))
            .collect(),
        Value::Null => Vec::new(),
        other => vec![sanitize_item(other)],
    }
}

fn coerce_object(value: &Value, schema: &PropertySchema) -> Map<String, Value> {
    let Some(map) = value.as_object() else {
        return Map::new();
    };

    let Some(props) = &schema.properties else {
        return map.clone();
    };

    map.iter()
        .map(|(key, v)| {
            let sanitized = match props.get(key) {
                Some(prop) => sanitize_value_from_schema(v, prop),
                None => v.clone(),
            };
            (key.clone(), sanitized)
        })
        .collect()
}
