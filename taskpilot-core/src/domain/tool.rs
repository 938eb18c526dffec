//! Tool descriptors as reported by discovery.
//!
//! A descriptor is immutable once discovered; a new discovery pass produces a
//! new snapshot of descriptors rather than mutating existing ones.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDescriptor {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(rename = "inputSchema", default)]
    pub input_schema: InputSchema,
    /// Endpoint used by the streaming call variant, absolute or relative to
    /// the tool server base URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
}

impl ToolDescriptor {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        input_schema: InputSchema,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            input_schema,
            endpoint: None,
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    /// Builds a descriptor from one entry of a `tools/list` result.
    pub fn from_listing(entry: &Value) -> Option<Self> {
        let name = entry.get("name").and_then(Value::as_str)?.trim();
        if name.is_empty() {
            return None;
        }
        let description = entry
            .get("description")
            .and_then(Value::as_str)
            .unwrap_or_default();
        let schema = entry
            .get("inputSchema")
            .map(InputSchema::from_value)
            .unwrap_or_default();
        let endpoint = entry
            .get("endpoint")
            .and_then(Value::as_str)
            .filter(|value| !value.trim().is_empty())
            .map(str::to_string);
        Some(Self {
            name: name.to_string(),
            description: description.to_string(),
            input_schema: schema,
            endpoint,
        })
    }
}

/// Declared JSON type of a schema property.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldType {
    String,
    Number,
    Integer,
    Boolean,
    Array,
    Object,
    Other(String),
}

impl FieldType {
    pub fn parse(value: &str) -> Self {
        match value {
            "string" => FieldType::String,
            "number" => FieldType::Number,
            "integer" => FieldType::Integer,
            "boolean" => FieldType::Boolean,
            "array" => FieldType::Array,
            "object" => FieldType::Object,
            other => FieldType::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            FieldType::String => "string",
            FieldType::Number => "number",
            FieldType::Integer => "integer",
            FieldType::Boolean => "boolean",
            FieldType::Array => "array",
            FieldType::Object => "object",
            FieldType::Other(name) => name,
        }
    }

    /// Unknown declared types accept any value.
    pub fn accepts(&self, value: &Value) -> bool {
        match self {
            FieldType::String => value.is_string(),
            FieldType::Number => value.is_number(),
            FieldType::Integer => value.is_i64() || value.is_u64(),
            FieldType::Boolean => value.is_boolean(),
            FieldType::Array => value.is_array(),
            FieldType::Object => value.is_object(),
            FieldType::Other(_) => true,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldSpec {
    pub name: String,
    pub field_type: Option<FieldType>,
    pub description: Option<String>,
}

/// The subset of a JSON schema the client acts on: the required-field list
/// and per-property declared types, in declaration order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Value", into = "Value")]
pub struct InputSchema {
    pub required: Vec<String>,
    pub fields: Vec<FieldSpec>,
}

impl InputSchema {
    pub fn from_value(value: &Value) -> Self {
        let required = value
            .get("required")
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        let fields = value
            .get("properties")
            .and_then(Value::as_object)
            .map(|properties| {
                properties
                    .iter()
                    .map(|(name, spec)| FieldSpec {
                        name: name.clone(),
                        field_type: spec.get("type").and_then(Value::as_str).map(FieldType::parse),
                        description: spec
                            .get("description")
                            .and_then(Value::as_str)
                            .map(str::to_string),
                    })
                    .collect()
            })
            .unwrap_or_default();

        Self { required, fields }
    }

    pub fn to_value(&self) -> Value {
        let mut properties = Map::new();
        for field in &self.fields {
            let mut spec = Map::new();
            if let Some(field_type) = &field.field_type {
                spec.insert("type".into(), Value::String(field_type.as_str().to_string()));
            }
            if let Some(description) = &field.description {
                spec.insert("description".into(), Value::String(description.clone()));
            }
            properties.insert(field.name.clone(), Value::Object(spec));
        }
        json!({
            "type": "object",
            "properties": properties,
            "required": self.required,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.required.is_empty() && self.fields.is_empty()
    }

    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|field| field.name == name)
    }

    pub fn is_required(&self, name: &str) -> bool {
        self.required.iter().any(|field| field == name)
    }
}

impl From<Value> for InputSchema {
    fn from(value: Value) -> Self {
        InputSchema::from_value(&value)
    }
}

impl From<InputSchema> for Value {
    fn from(schema: InputSchema) -> Self {
        schema.to_value()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_keeps_declaration_order() {
        let schema = InputSchema::from_value(&json!({
            "type": "object",
            "properties": {
                "title": {"type": "string"},
                "author": {"type": "string"},
                "year": {"type": "integer", "description": "Publication year"}
            },
            "required": ["title", "author"]
        }));

        let names: Vec<_> = schema.fields.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, ["title", "author", "year"]);
        assert!(schema.is_required("author"));
        assert!(!schema.is_required("year"));
        assert_eq!(
            schema.field("year").and_then(|f| f.field_type.clone()),
            Some(FieldType::Integer)
        );
    }

    #[test]
    fn listing_entry_without_name_is_skipped() {
        assert!(ToolDescriptor::from_listing(&json!({"description": "nameless"})).is_none());
        let tool = ToolDescriptor::from_listing(&json!({"name": "list_books"})).expect("named");
        assert!(tool.input_schema.is_empty());
        assert!(tool.endpoint.is_none());
    }

    #[test]
    fn integer_type_rejects_floats_and_strings() {
        assert!(FieldType::Integer.accepts(&json!(1997)));
        assert!(!FieldType::Integer.accepts(&json!(19.5)));
        assert!(!FieldType::Integer.accepts(&json!("1997")));
        assert!(FieldType::Other("date".into()).accepts(&json!("2024-01-01")));
    }
}
