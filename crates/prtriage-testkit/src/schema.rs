//! JSON schema validators for prtriage DTOs.
//!
//! Schemas are generated from the schemars derives at call time, so they can
//! never drift from the types.

use jsonschema::Validator;
use prtriage_types::{AnalysisResult, ConfigFile, ReviewResult};
use schemars::{JsonSchema, schema_for};
use serde::Serialize;

/// Error type for schema validation failures.
#[derive(Debug)]
pub struct SchemaValidationError {
    /// The validation errors.
    pub errors: Vec<String>,
}

impl std::fmt::Display for SchemaValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Schema validation failed: {}", self.errors.join("; "))
    }
}

impl std::error::Error for SchemaValidationError {}

/// Compile the schema of `T`.
pub fn validator<T: JsonSchema>() -> Validator {
    let schema = serde_json::to_value(schema_for!(T)).expect("schema should serialize");
    jsonschema::validator_for(&schema).expect("generated schema should compile")
}

/// Validate `value`'s JSON form against `T`'s schema.
pub fn validate<T: JsonSchema + Serialize>(value: &T) -> Result<(), SchemaValidationError> {
    let json = serde_json::to_value(value).expect("value should serialize to JSON");
    validate_json::<T>(&json)
}

/// Validate arbitrary JSON against `T`'s schema.
pub fn validate_json<T: JsonSchema>(json: &serde_json::Value) -> Result<(), SchemaValidationError> {
    let errors: Vec<String> = validator::<T>()
        .iter_errors(json)
        .map(|e| e.to_string())
        .collect();
    if errors.is_empty() {
        Ok(())
    } else {
        Err(SchemaValidationError { errors })
    }
}

pub fn validate_config_file(config: &ConfigFile) -> Result<(), SchemaValidationError> {
    validate(config)
}

pub fn validate_analysis_result(result: &AnalysisResult) -> Result<(), SchemaValidationError> {
    validate(result)
}

pub fn validate_review_result(result: &ReviewResult) -> Result<(), SchemaValidationError> {
    validate(result)
}
