//! Editing scripts: a recorded sequence of host and user events.

use anyhow::{Context, Result};
use dadm_editor::FieldPath;
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Step {
    /// Select an element by its id, or clear the selection
    Select(Option<String>),
    Focus(FieldPath),
    Edit { path: FieldPath, value: String },
    Blur(FieldPath),
    /// Let the given number of milliseconds pass
    Wait(u64),
}

pub fn parse(source: &str) -> Result<Vec<Step>> {
    Ok(serde_json::from_str(source)?)
}

pub fn load(path: &Path) -> Result<Vec<Step>> {
    let source = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read script {}", path.display()))?;
    parse(&source).with_context(|| format!("Invalid script {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_steps() {
        let steps = parse(
            r#"[
                {"select": "Task_1"},
                {"focus": "id"},
                {"edit": {"path": "id", "value": "Task_2"}},
                {"blur": "id"},
                {"wait": 400},
                {"edit": {"path": "extensions.service.name", "value": ""}},
                {"select": null}
            ]"#,
        )
        .unwrap();

        assert_eq!(steps.len(), 7);
        assert_eq!(steps[0], Step::Select(Some("Task_1".to_string())));
        assert_eq!(
            steps[2],
            Step::Edit {
                path: FieldPath::Id,
                value: "Task_2".to_string()
            }
        );
        assert_eq!(steps[4], Step::Wait(400));
        assert_eq!(
            steps[5],
            Step::Edit {
                path: FieldPath::extension("service.name"),
                value: String::new()
            }
        );
        assert_eq!(steps[6], Step::Select(None));
    }

    #[test]
    fn test_unknown_field_path_is_rejected() {
        assert!(parse(r#"[{"blur": "colour"}]"#).is_err());
    }
}
