//! Error types for tree conversion.
//!
//! Only [`Error::MissingRequired`] and [`Error::FieldDeserializeFail`] are the
//! expected outcomes of deserializing malformed data. Everything else raised
//! while processing a record field is rewrapped into a
//! [`Error::FieldDeserializeFail`] that names the field.

use serde_json::Value;
use thiserror::Error;

use crate::descriptor::TypeDescriptor;

/// Result type alias for tree conversion operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error type returned by custom format hooks.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Main error type for serialization, deserialization and schema discovery
#[derive(Error, Debug)]
pub enum Error {
    /// A required field is absent, has no default and is not optional.
    #[error(
        "Missing '{field_name}' (expected type of '{expected_type}') in data for type '{containing_type}'"
    )]
    MissingRequired {
        field_name: String,
        expected_type: String,
        containing_type: String,
    },

    /// A value is present but has the wrong shape or type.
    ///
    /// `field_name` is empty when the failure is not attributable to a field.
    #[error("{}", field_fail_message(.field_name, .expected_type, .actual_value))]
    FieldDeserializeFail {
        field_name: String,
        expected_type: String,
        actual_value: Value,
        #[source]
        source: Option<Box<Error>>,
    },

    /// A registered custom format hook failed.
    #[error("Custom format for type '{type_name}' failed")]
    Custom {
        type_name: String,
        #[source]
        source: BoxError,
    },

    /// An opaque value reached the serializer without a registered hook.
    #[error("No custom format registered to serialize opaque type '{type_name}'")]
    NoCustomFormat { type_name: String },

    /// Two distinct mapping keys render to the same object key.
    #[error("Mapping keys {first} and {second} both serialize to object key '{key}'")]
    KeyCollision {
        key: String,
        first: Value,
        second: Value,
    },

    /// Nesting went deeper than the configured limit.
    #[error("Recursion depth limit of {limit} exceeded at '{path}'")]
    DepthLimitExceeded { limit: usize, path: String },

    /// Schema discovery failed for a type.
    #[error("Failed to discover field-type attributes of type '{type_name}'")]
    Discovery {
        type_name: String,
        #[source]
        source: Box<Error>,
    },

    /// A union was built from an empty list of alternatives.
    #[error("A union requires at least one alternative")]
    EmptyUnion,

    /// A dynamic value could not be turned into the requested Rust value.
    #[error("Cannot convert {found} into {expected}")]
    Conversion { expected: String, found: String },
}

impl Error {
    /// Build a field failure with no underlying cause.
    pub fn field_fail(field_name: &str, expected: &TypeDescriptor, actual: &Value) -> Self {
        Error::FieldDeserializeFail {
            field_name: field_name.to_string(),
            expected_type: expected.type_name(),
            actual_value: actual.clone(),
            source: None,
        }
    }

    /// Attribute this error to a record field.
    ///
    /// The two dedicated kinds pass through without another layer; a field
    /// failure that does not name a field yet takes this field's name. Any
    /// other error becomes the cause of a new field failure.
    pub fn in_field(self, field_name: &str, expected: &TypeDescriptor, actual: &Value) -> Self {
        match self {
            Error::FieldDeserializeFail {
                field_name: inner,
                expected_type,
                actual_value,
                source,
            } if inner.is_empty() => Error::FieldDeserializeFail {
                field_name: field_name.to_string(),
                expected_type,
                actual_value,
                source,
            },
            e @ (Error::MissingRequired { .. }
            | Error::FieldDeserializeFail { .. }
            | Error::DepthLimitExceeded { .. }) => e,
            other => Error::FieldDeserializeFail {
                field_name: field_name.to_string(),
                expected_type: expected.type_name(),
                actual_value: actual.clone(),
                source: Some(Box::new(other)),
            },
        }
    }

    /// Name of the field this error is attributed to, if any.
    pub fn field_name(&self) -> Option<&str> {
        match self {
            Error::MissingRequired { field_name, .. } => Some(field_name),
            Error::FieldDeserializeFail { field_name, .. } if !field_name.is_empty() => {
                Some(field_name)
            }
            _ => None,
        }
    }
}

fn field_fail_message(field_name: &str, expected_type: &str, actual_value: &Value) -> String {
    let prefix = if field_name.is_empty() {
        "Expecting to find".to_string()
    } else {
        format!("Expecting field '{field_name}' to have")
    };
    format!(
        "{prefix} type '{expected_type}'. Instead, found value '{actual_value}', which has incorrect type '{}'",
        tree_kind(actual_value)
    )
}

/// Short name of a tree node's JSON kind, used in diagnostics.
pub(crate) fn tree_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_f64() => "float",
        Value::Number(_) => "integer",
        Value::String(_) => "text",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
