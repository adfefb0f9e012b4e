//! JSON Schema declarations for resource items.
//!
//! Schemas drive three things: the published item description, sanitization
//! of incoming write values, and context filtering of outgoing responses.

pub mod sanitize;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::utils::ApiError;

pub use sanitize::sanitize_value_from_schema;

pub const SCHEMA_DRAFT: &str = "http://json-schema.org/draft-04/schema#";

/// Visibility context a property is emitted under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestContext {
    View,
    Edit,
    Embed,
}

impl RequestContext {
    pub const ALL: [RequestContext; 3] = [
        RequestContext::View,
        RequestContext::Edit,
        RequestContext::Embed,
    ];

    pub fn parse(value: &str) -> Result<Self, ApiError> {
        match value {
            "view" => Ok(RequestContext::View),
            "edit" => Ok(RequestContext::Edit),
            "embed" => Ok(RequestContext::Embed),
            other => Err(ApiError::InvalidParam(format!(
                "context '{other}' is not one of view, edit, embed"
            ))),
        }
    }
}

impl Default for RequestContext {
    fn default() -> Self {
        RequestContext::View
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SchemaType {
    String,
    Integer,
    Number,
    Boolean,
    Array,
    Object,
}

/// A single property declaration. Optional facets serialize only when set,
/// so the published schema stays minimal.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PropertySchema {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<SchemaType>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub context: Vec<RequestContext>,
    #[serde(rename = "enum", skip_serializing_if = "Option::is_none")]
    pub one_of: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub readonly: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub items: Option<Box<PropertySchema>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub properties: Option<BTreeMap<String, PropertySchema>>,
}

impl PropertySchema {
    pub fn new(kind: SchemaType) -> Self {
        PropertySchema {
            kind: Some(kind),
            ..Default::default()
        }
    }

    pub fn string(description: &str) -> Self {
        Self::new(SchemaType::String).description(description)
    }

    pub fn integer(description: &str) -> Self {
        Self::new(SchemaType::Integer).description(description)
    }

    pub fn boolean(description: &str) -> Self {
        Self::new(SchemaType::Boolean).description(description)
    }

    pub fn object(description: &str) -> Self {
        Self::new(SchemaType::Object).description(description)
    }

    pub fn array_of(items: PropertySchema, description: &str) -> Self {
        let mut prop = Self::new(SchemaType::Array).description(description);
        prop.items = Some(Box::new(items));
        prop
    }

    pub fn description(mut self, description: &str) -> Self {
        self.description = Some(description.to_string());
        self
    }

    pub fn context(mut self, contexts: &[RequestContext]) -> Self {
        self.context = contexts.to_vec();
        self
    }

    pub fn one_of(mut self, values: Vec<String>) -> Self {
        self.one_of = Some(values);
        self
    }

    pub fn format(mut self, format: &str) -> Self {
        self.format = Some(format.to_string());
        self
    }

    pub fn readonly(mut self) -> Self {
        self.readonly = Some(true);
        self
    }

    pub fn default_value(mut self, value: Value) -> Self {
        self.default = Some(value);
        self
    }

    pub fn property(mut self, name: &str, prop: PropertySchema) -> Self {
        self.properties
            .get_or_insert_with(BTreeMap::new)
            .insert(name.to_string(), prop);
        self
    }

    /// Whether this property is visible under the given context. Properties
    /// without an explicit context annotation are visible everywhere.
    pub fn visible_in(&self, context: RequestContext) -> bool {
        self.context.is_empty() || self.context.contains(&context)
    }
}

/// A full item schema: the draft marker, a resource title, and the property
/// set keyed by field name.
#[derive(Debug, Clone, Serialize)]
pub struct Schema {
    #[serde(rename = "$schema")]
    pub draft: &'static str,
    pub title: String,
    #[serde(rename = "type")]
    pub kind: SchemaType,
    pub properties: BTreeMap<String, PropertySchema>,
}

impl Schema {
    pub fn object(title: &str) -> Self {
        Schema {
            draft: SCHEMA_DRAFT,
            title: title.to_string(),
            kind: SchemaType::Object,
            properties: BTreeMap::new(),
        }
    }

    pub fn with_property(mut self, name: &str, prop: PropertySchema) -> Self {
        self.properties.insert(name.to_string(), prop);
        self
    }

    /// Resolve the field names a response should carry: the declared property
    /// set, optionally narrowed by a comma-separated `_fields` selection.
    pub fn fields_for_response(&self, requested: Option<&str>) -> Vec<String> {
        match requested {
            Some(list) => list
                .split(',')
                .map(str::trim)
                .filter(|f| !f.is_empty() && self.properties.contains_key(*f))
                .map(str::to_string)
                .collect(),
            None => self.properties.keys().cloned().collect(),
        }
    }
}
