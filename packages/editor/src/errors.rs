//! Error types for the properties editor

use dadm_model::{ModelError, SerializeError};
use thiserror::Error;

use crate::field::FieldPath;

#[derive(Error, Debug)]
pub enum EditorError {
    #[error("Adapter error: {0}")]
    Adapter(#[from] AdapterError),

    #[error("Serializer bridge error: {0}")]
    Bridge(#[from] BridgeError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("Invalid field path: {0}")]
    FieldPath(#[from] FieldPathError),

    #[error("{0}")]
    Validation(#[from] ValidationError),

    #[error("Field {0} is not bound for the current selection")]
    UnboundField(FieldPath),

    #[error("Editor has been shut down")]
    ShutDown,
}

/// Failures while reading or writing the host document
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AdapterError {
    #[error("Element not found: {0}")]
    ElementNotFound(String),

    #[error("Field {field} is not supported on {kind} elements")]
    Unsupported { field: String, kind: String },

    #[error("Host document error: {0}")]
    Model(#[from] ModelError),
}

/// Failures while regenerating or propagating the serialized document
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BridgeError {
    #[error("Serialization failed: {0}")]
    Serialize(#[from] SerializeError),

    #[error("Document sink rejected update: {0}")]
    Sink(String),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid config: {0}")]
    Parse(#[from] serde_json::Error),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FieldPathError {
    #[error("empty field path")]
    Empty,

    #[error("unknown field path: {0}")]
    Unknown(String),

    #[error("extension key missing in {0}")]
    MissingExtensionKey(String),
}

/// Per-field validation failure
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{path}: {message}")]
pub struct ValidationError {
    pub path: FieldPath,
    pub message: String,
}

impl ValidationError {
    pub fn new(path: FieldPath, message: impl Into<String>) -> Self {
        Self {
            path,
            message: message.into(),
        }
    }
}

impl AdapterError {
    pub fn unsupported(field: &FieldPath, kind: &str) -> Self {
        Self::Unsupported {
            field: field.to_string(),
            kind: kind.to_string(),
        }
    }
}
