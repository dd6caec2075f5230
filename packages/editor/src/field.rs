//! # Field Bindings
//!
//! Editable mirror of one property of the selected element.
//!
//! Field paths are addressed by their dotted form:
//!
//! ```text
//! name | id | documentation
//! implementation.type | implementation.topic
//! extensions.<key>          e.g. extensions.service.name
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::errors::FieldPathError;

const EXTENSION_PREFIX: &str = "extensions.";

/// Address of one editable property
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FieldPath {
    Name,
    Id,
    Documentation,
    ImplementationType,
    ImplementationTopic,
    /// Namespaced extension property, keyed without the `extensions.` prefix
    Extension(String),
}

impl FieldPath {
    pub fn extension(key: impl Into<String>) -> Self {
        FieldPath::Extension(key.into())
    }

    /// Fields every element kind carries
    pub fn core() -> [FieldPath; 3] {
        [FieldPath::Name, FieldPath::Id, FieldPath::Documentation]
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldPath::Name => f.write_str("name"),
            FieldPath::Id => f.write_str("id"),
            FieldPath::Documentation => f.write_str("documentation"),
            FieldPath::ImplementationType => f.write_str("implementation.type"),
            FieldPath::ImplementationTopic => f.write_str("implementation.topic"),
            FieldPath::Extension(key) => write!(f, "{}{}", EXTENSION_PREFIX, key),
        }
    }
}

impl FromStr for FieldPath {
    type Err = FieldPathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "" => Err(FieldPathError::Empty),
            "name" => Ok(FieldPath::Name),
            "id" => Ok(FieldPath::Id),
            "documentation" => Ok(FieldPath::Documentation),
            "implementation.type" => Ok(FieldPath::ImplementationType),
            "implementation.topic" => Ok(FieldPath::ImplementationTopic),
            other => match other.strip_prefix(EXTENSION_PREFIX) {
                Some("") => Err(FieldPathError::MissingExtensionKey(other.to_string())),
                Some(key) => Ok(FieldPath::Extension(key.to_string())),
                None if other == "extensions" => {
                    Err(FieldPathError::MissingExtensionKey(other.to_string()))
                }
                None => Err(FieldPathError::Unknown(other.to_string())),
            },
        }
    }
}

impl Serialize for FieldPath {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for FieldPath {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// UI-facing save status of a field
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "message", rename_all = "camelCase")]
pub enum FieldStatus {
    #[default]
    Idle,
    Editing,
    Saving,
    Saved,
    Error(String),
}

impl FieldStatus {
    pub fn is_error(&self) -> bool {
        matches!(self, FieldStatus::Error(_))
    }
}

impl fmt::Display for FieldStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldStatus::Idle => f.write_str("idle"),
            FieldStatus::Editing => f.write_str("editing…"),
            FieldStatus::Saving => f.write_str("saving…"),
            FieldStatus::Saved => f.write_str("saved"),
            FieldStatus::Error(message) => write!(f, "error: {}", message),
        }
    }
}

/// Editable value of one field plus its bookkeeping
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldBinding {
    pub path: FieldPath,
    pub value: String,
    /// Value differs from what was last loaded or committed
    pub dirty: bool,
    /// Inline validation message
    pub error: Option<String>,
    pub status: FieldStatus,
}

impl FieldBinding {
    pub fn new(path: FieldPath, value: String) -> Self {
        Self {
            path,
            value,
            dirty: false,
            error: None,
            status: FieldStatus::Idle,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.error.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_known_paths() {
        assert_eq!("name".parse::<FieldPath>(), Ok(FieldPath::Name));
        assert_eq!("id".parse::<FieldPath>(), Ok(FieldPath::Id));
        assert_eq!(
            "implementation.topic".parse::<FieldPath>(),
            Ok(FieldPath::ImplementationTopic)
        );
        assert_eq!(
            "extensions.service.name".parse::<FieldPath>(),
            Ok(FieldPath::extension("service.name"))
        );
    }

    #[test]
    fn test_parse_rejects_bad_paths() {
        assert_eq!("".parse::<FieldPath>(), Err(FieldPathError::Empty));
        assert!(matches!(
            "extensions.".parse::<FieldPath>(),
            Err(FieldPathError::MissingExtensionKey(_))
        ));
        assert!(matches!(
            "implementation.kind".parse::<FieldPath>(),
            Err(FieldPathError::Unknown(_))
        ));
    }

    #[test]
    fn test_display_matches_dotted_form() {
        for raw in [
            "name",
            "id",
            "documentation",
            "implementation.type",
            "implementation.topic",
            "extensions.service.version",
        ] {
            let path: FieldPath = raw.parse().unwrap();
            assert_eq!(path.to_string(), raw);
        }
    }

    #[test]
    fn test_status_display() {
        assert_eq!(FieldStatus::Saving.to_string(), "saving…");
        assert_eq!(
            FieldStatus::Error("boom".to_string()).to_string(),
            "error: boom"
        );
    }

    #[test]
    fn test_field_path_serde_uses_dotted_form() {
        let json = serde_json::to_string(&FieldPath::extension("service.type")).unwrap();
        assert_eq!(json, "\"extensions.service.type\"");

        let back: FieldPath = serde_json::from_str(&json).unwrap();
        assert_eq!(back, FieldPath::extension("service.type"));
    }
}
