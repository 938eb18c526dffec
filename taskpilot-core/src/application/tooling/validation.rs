//! Schema checks applied before a tool call is dispatched.

use std::fmt;

use serde_json::{Map, Value};

use crate::domain::ToolDescriptor;

/// Every problem found in one input, in schema order: missing required
/// fields first, then type mismatches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationFailure {
    pub tool: String,
    pub problems: Vec<String>,
    pub missing: Vec<String>,
}

impl fmt::Display for ValidationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Invalid input for tool {}: {}",
            self.tool,
            self.problems.join(", ")
        )
    }
}

impl std::error::Error for ValidationFailure {}

pub fn validate_input(tool: &ToolDescriptor, input: &Value) -> Result<(), ValidationFailure> {
    let schema = &tool.input_schema;
    if schema.is_empty() {
        return Ok(());
    }

    let empty = Map::new();
    let (fields, mut problems) = match input {
        Value::Object(map) => (map, Vec::new()),
        Value::Null => (&empty, Vec::new()),
        other => (&empty, vec![format!("Input should be an object, got {}", kind_of(other))]),
    };

    let missing: Vec<String> = schema
        .required
        .iter()
        .filter(|field| !fields.contains_key(field.as_str()))
        .cloned()
        .collect();
    problems.extend(missing.iter().map(|field| format!("Missing required field: {field}")));

    for (name, value) in fields {
        let Some(expected) = schema.field(name).and_then(|spec| spec.field_type.as_ref()) else {
            continue;
        };
        if !expected.accepts(value) {
            problems.push(format!("Field {name} should be of type {}", expected.as_str()));
        }
    }

    if problems.is_empty() {
        Ok(())
    } else {
        Err(ValidationFailure {
            tool: tool.name.clone(),
            problems,
            missing,
        })
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
