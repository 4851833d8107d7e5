//! Structural validation for entities and export packages
//!
//! Validation is pure: schemas are static rule tables checked against raw
//! JSON before anything is deserialized into typed models.

pub mod entities;
pub mod envelope;
pub mod rules;

use std::fmt;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};

pub use entities::schema_for;
pub use envelope::{check_package, validate_package, PackageValidation, ValidatedPackage};
pub use rules::{EntitySchema, FieldKind, FieldRule};

/// One failed rule, addressed by a dotted JSON path
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    pub path: String,
    pub message: String,
}

impl FieldError {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Re-root this error under `prefix` (`"data.runners[2]"` + `"status"`)
    #[must_use]
    pub fn nested(self, prefix: &str) -> Self {
        let path = match (prefix.is_empty(), self.path.is_empty()) {
            (true, _) => self.path,
            (false, true) => prefix.to_string(),
            (false, false) => format!("{prefix}.{}", self.path),
        };
        Self { path, ..self }
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.path.is_empty() {
            f.write_str(&self.message)
        } else {
            write!(f, "{}: {}", self.path, self.message)
        }
    }
}

/// Check `value` against `schema` and deserialize it
pub fn validate<T: DeserializeOwned>(value: &Value, schema: &EntitySchema) -> Result<T> {
    safe_validate(value, schema).map_err(Error::SchemaValidation)
}

/// Like [`validate`], but hands back the raw field errors
pub fn safe_validate<T: DeserializeOwned>(
    value: &Value,
    schema: &EntitySchema,
) -> std::result::Result<T, Vec<FieldError>> {
    let errors = schema.check(value);
    if !errors.is_empty() {
        return Err(errors);
    }
    serde_json::from_value(value.clone())
        .map_err(|error| vec![FieldError::new("", format!("{} {error}", schema.name))])
}

/// Errors for one rejected array element
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemErrors {
    pub index: usize,
    pub errors: Vec<FieldError>,
}

/// Partition of an array into accepted items and per-index rejections
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArrayValidation<T> {
    pub valid: bool,
    pub valid_items: Vec<T>,
    pub errors: Vec<ItemErrors>,
}

impl<T> ArrayValidation<T> {
    /// Flatten item errors into paths rooted at `prefix`, e.g. `data.runners[3].status`
    pub fn field_errors(&self, prefix: &str) -> Vec<FieldError> {
        self.errors
            .iter()
            .flat_map(|item| {
                let root = format!("{prefix}[{}]", item.index);
                item.errors
                    .iter()
                    .cloned()
                    .map(move |error| error.nested(&root))
            })
            .collect()
    }
}

/// Validate every element, keeping the good ones and recording the bad ones
pub fn validate_array<T: DeserializeOwned>(
    items: &[Value],
    schema: &EntitySchema,
) -> ArrayValidation<T> {
    let mut valid_items = Vec::with_capacity(items.len());
    let mut errors = Vec::new();

    for (index, item) in items.iter().enumerate() {
        match safe_validate(item, schema) {
            Ok(parsed) => valid_items.push(parsed),
            Err(item_errors) => errors.push(ItemErrors {
                index,
                errors: item_errors,
            }),
        }
    }

    ArrayValidation {
        valid: errors.is_empty(),
        valid_items,
        errors,
    }
}
