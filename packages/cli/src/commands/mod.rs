pub mod replay;
pub mod show;

pub use replay::{replay, ReplayArgs};
pub use show::{show, ShowArgs};

use anyhow::{Context, Result};
use dadm_model::Document;
use std::path::Path;

/// Read a document from its JSON persistence form
pub fn load_document(path: &Path) -> Result<Document> {
    let source = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read document {}", path.display()))?;
    Document::from_json(&source)
        .with_context(|| format!("Invalid document {}", path.display()))
}
