//! Field validation rules gating persistence.
//!
//! Pure and synchronous. A failing rule blocks the commit for that field and
//! is surfaced as an inline message.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::errors::ValidationError;
use crate::field::FieldPath;

pub const NAME_MAX_CHARS: usize = 100;

// ASCII classes on purpose: `\d` in the regex crate matches any Unicode digit.
static ID_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z][A-Za-z0-9_]*$").unwrap());

static SLUG_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z][A-Za-z0-9_-]*$").unwrap());

static VERSION_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[0-9]+\.[0-9]+(\.[0-9]+)?$").unwrap());

/// Validate a candidate value for a field
pub fn validate(path: &FieldPath, value: &str) -> Result<(), ValidationError> {
    let fail = |message: &str| Err(ValidationError::new(path.clone(), message));

    match path {
        FieldPath::Name => {
            if value.trim().is_empty() {
                return fail("Name is required");
            }
            if value.chars().count() > NAME_MAX_CHARS {
                return fail("Name must be 100 characters or fewer");
            }
            Ok(())
        }

        FieldPath::Id => {
            if value.is_empty() {
                return fail("ID is required");
            }
            if !ID_PATTERN.is_match(value) {
                return fail(
                    "ID must start with a letter and contain only letters, digits, and underscores",
                );
            }
            Ok(())
        }

        FieldPath::ImplementationTopic => {
            if !value.is_empty() && !SLUG_PATTERN.is_match(value) {
                return fail(
                    "Topic must start with a letter and contain only letters, digits, hyphens, and underscores",
                );
            }
            Ok(())
        }

        FieldPath::Extension(key) if key == "service.name" => {
            if !value.is_empty() && !SLUG_PATTERN.is_match(value) {
                return fail(
                    "Service name must start with a letter and contain only letters, digits, hyphens, and underscores",
                );
            }
            Ok(())
        }

        FieldPath::Extension(key) if key == "service.version" => {
            if !value.is_empty() && !VERSION_PATTERN.is_match(value) {
                return fail("Version must look like 1.0 or 1.0.0");
            }
            Ok(())
        }

        // documentation, implementation.type, extensions.service.type, unknown keys
        _ => Ok(()),
    }
}
