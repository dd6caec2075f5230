use thiserror::Error;

pub type ModelResult<T> = Result<T, ModelError>;

pub type SerializeResult<T> = Result<T, SerializeError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ModelError {
    #[error("Element not found: {0}")]
    ElementNotFound(String),

    #[error("Element {0} cannot contain child elements")]
    NotAContainer(String),

    #[error("Duplicate element id: {0}")]
    DuplicateId(String),

    #[error("Document lock poisoned")]
    Poisoned,

    #[error("Invalid document JSON: {0}")]
    Json(String),
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SerializeError {
    #[error("Element {element}: {field} contains a character that is not allowed in XML")]
    InvalidCharacter { element: String, field: String },
}

impl ModelError {
    pub fn element_not_found(key: impl Into<String>) -> Self {
        Self::ElementNotFound(key.into())
    }
}

impl SerializeError {
    pub fn invalid_character(element: impl Into<String>, field: impl Into<String>) -> Self {
        Self::InvalidCharacter {
            element: element.into(),
            field: field.into(),
        }
    }
}

impl From<serde_json::Error> for ModelError {
    fn from(e: serde_json::Error) -> Self {
        ModelError::Json(e.to_string())
    }
}
