//! Reply validation: raw model text → typed [`Branch`] tree.
//!
//! Three steps, always in this order:
//!
//! 1. [`decode`] — parse the text as JSON. Malformed text fails here with
//!    [`ValidationError::Decode`]; nothing partial is ever returned.
//! 2. [`backfill_ids`] — walk the tree through `children` arrays and give
//!    every node whose `id` is absent, `null`, or `""` a fresh UUID v4.
//!    Existing ids are never touched.
//! 3. [`validate_branch`] — read the JSON into a [`Branch`], failing with
//!    [`ValidationError::Schema`] at the first node that lacks a required
//!    field or has one of the wrong type.
//!
//! Topics and summaries are passed through verbatim. Unknown keys are ignored.

use crate::error::{SchemaProblem, ValidationError};
use crate::output::Branch;
use serde_json::{Map, Value};
use tracing::debug;

/// Decode, backfill, and validate a raw model reply.
pub fn parse_mind_map(raw: &str) -> Result<Branch, ValidationError> {
    let mut value = decode(raw)?;
    let assigned = backfill_ids(&mut value);
    if assigned > 0 {
        debug!("Assigned {} missing branch id(s)", assigned);
    }
    validate_branch(&value)
}

/// Step 1: parse `raw` as JSON.
pub fn decode(raw: &str) -> Result<Value, ValidationError> {
    serde_json::from_str(raw).map_err(ValidationError::Decode)
}

/// Step 2: assign a UUID v4 to every node missing an `id`.
///
/// Returns the number of ids assigned.
pub fn backfill_ids(value: &mut Value) -> usize {
    backfill_ids_with(value, &mut || uuid::Uuid::new_v4().to_string())
}

/// Like [`backfill_ids`] with a caller-supplied id generator.
///
/// The generator must return non-empty strings that are unique within the tree.
pub fn backfill_ids_with<F>(value: &mut Value, next_id: &mut F) -> usize
where
    F: FnMut() -> String,
{
    let Value::Object(node) = value else {
        return 0;
    };

    let mut assigned = 0;
    if needs_id(node) {
        node.insert("id".to_string(), Value::String(next_id()));
        assigned += 1;
    }

    if let Some(Value::Array(children)) = node.get_mut("children") {
        for child in children {
            assigned += backfill_ids_with(child, next_id);
        }
    }
    assigned
}

fn needs_id(node: &Map<String, Value>) -> bool {
    match node.get("id") {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.is_empty(),
        Some(_) => false,
    }
}

/// Step 3: read a JSON value into a [`Branch`] tree.
pub fn validate_branch(value: &Value) -> Result<Branch, ValidationError> {
    read_branch(value, &mut String::from("$"))
}

fn read_branch(value: &Value, path: &mut String) -> Result<Branch, ValidationError> {
    let node = value
        .as_object()
        .ok_or_else(|| schema_error(path, SchemaProblem::NotAnObject {
            found: kind_of(value),
        }))?;

    let id = required_string(node, "id", path)?;
    if id.is_empty() {
        return Err(schema_error(
            path,
            SchemaProblem::WrongType {
                field: "id",
                expected: "a non-empty string",
                found: "an empty string",
            },
        ));
    }
    let topic = required_string(node, "topic", path)?;
    let summary = required_string(node, "summary", path)?;

    let children = match node.get("children") {
        None => Vec::new(),
        Some(Value::Array(items)) => {
            let mut children = Vec::with_capacity(items.len());
            for (i, item) in items.iter().enumerate() {
                let mark = path.len();
                path.push_str(&format!(".children[{i}]"));
                children.push(read_branch(item, path)?);
                path.truncate(mark);
            }
            children
        }
        Some(other) => {
            return Err(schema_error(
                path,
                SchemaProblem::WrongType {
                    field: "children",
                    expected: "an array",
                    found: kind_of(other),
                },
            ))
        }
    };

    Ok(Branch {
        id,
        topic,
        summary,
        children,
    })
}

fn required_string(
    node: &Map<String, Value>,
    field: &'static str,
    path: &str,
) -> Result<String, ValidationError> {
    match node.get(field) {
        Some(Value::String(s)) => Ok(s.clone()),
        None => Err(schema_error(path, SchemaProblem::MissingField { field })),
        Some(other) => Err(schema_error(
            path,
            SchemaProblem::WrongType {
                field,
                expected: "a string",
                found: kind_of(other),
            },
        )),
    }
}

fn schema_error(path: &str, problem: SchemaProblem) -> ValidationError {
    ValidationError::Schema {
        path: path.to_string(),
        problem,
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
