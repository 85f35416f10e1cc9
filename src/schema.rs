//! Structural validation of BFIR documents against the embedded JSON Schema
//! (Draft 2020-12, via the `jsonschema` crate).
//!
//! This runs before parsing: a document that fails here never reaches the
//! converter. The schema checks shape only (required keys, types, enum
//! discriminators); id uniqueness and reference resolution are semantic
//! checks done later.

use serde_json::Value;

const BFIR_SCHEMA: &str = include_str!("../schemas/bfir.schema.json");

/// A single schema violation with its location in the document.
#[derive(Debug, Clone)]
pub struct Violation {
    /// JSON Pointer to the violating value (empty for the document root).
    pub instance_path: String,
    pub message: String,
}

impl std::fmt::Display for Violation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.instance_path.is_empty() {
            write!(f, "  {}", self.message)
        } else {
            write!(f, "  {}: {}", self.instance_path, self.message)
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    /// The embedded schema itself failed to load or compile. Indicates a
    /// packaging bug, not a user error.
    #[error("embedded BFIR schema is invalid: {0}")]
    Schema(String),
    #[error("document failed BFIR schema validation:\n{}", format_violations(.0))]
    Invalid(Vec<Violation>),
}

fn format_violations(violations: &[Violation]) -> String {
    violations
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Validate a parsed JSON value against the BFIR schema. Returns all
/// violations at once rather than stopping at the first.
pub fn validate(instance: &Value) -> Result<(), SchemaError> {
    let schema: Value =
        serde_json::from_str(BFIR_SCHEMA).map_err(|e| SchemaError::Schema(e.to_string()))?;
    let validator =
        jsonschema::validator_for(&schema).map_err(|e| SchemaError::Schema(e.to_string()))?;

    let violations: Vec<Violation> = validator
        .iter_errors(instance)
        .map(|e| Violation {
            instance_path: e.instance_path.to_string(),
            message: e.to_string(),
        })
        .collect();

    if violations.is_empty() {
        Ok(())
    } else {
        Err(SchemaError::Invalid(violations))
    }
}
