//! Field State Store: editable mirror of the selected element's properties.
//!
//! The store is detached from the document between commits. Edits land here
//! first and only reach the tree through the commit pipeline.

use std::collections::BTreeMap;

use dadm_model::NodeKey;

use crate::adapter::DocumentAdapter;
use crate::errors::{AdapterError, EditorError, ValidationError};
use crate::field::{FieldBinding, FieldPath, FieldStatus};
use crate::validator::validate;

#[derive(Debug, Default)]
pub struct FieldStateStore {
    node: Option<NodeKey>,
    bindings: BTreeMap<FieldPath, FieldBinding>,
    /// Value last read from or written to the document, per field
    baseline: BTreeMap<FieldPath, String>,
}

impl FieldStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace every binding with the element's current values.
    ///
    /// Prior bindings are discarded even when the read fails.
    pub fn load(
        &mut self,
        adapter: &DocumentAdapter,
        node: &NodeKey,
        extension_keys: &[String],
    ) -> Result<(), AdapterError> {
        self.clear();
        let values = adapter.read_all(node, extension_keys)?;

        for (path, value) in values {
            self.baseline.insert(path.clone(), value.clone());
            self.bindings
                .insert(path.clone(), FieldBinding::new(path, value));
        }
        self.node = Some(node.clone());
        Ok(())
    }

    pub fn clear(&mut self) {
        self.node = None;
        self.bindings.clear();
        self.baseline.clear();
    }

    /// Element the bindings were loaded from
    pub fn node(&self) -> Option<&NodeKey> {
        self.node.as_ref()
    }

    pub fn is_loaded_for(&self, node: &NodeKey) -> bool {
        self.node.as_ref() == Some(node)
    }

    /// Update a field's value and re-run its validation.
    ///
    /// Returns the validation failure, if any, after recording it on the binding.
    pub fn set_field(&mut self, path: &FieldPath, value: &str) -> Result<(), EditorError> {
        let baseline = self.baseline.get(path).cloned();
        let binding = self
            .bindings
            .get_mut(path)
            .ok_or_else(|| EditorError::UnboundField(path.clone()))?;

        binding.value = value.to_string();
        binding.dirty = baseline.as_deref() != Some(value);
        if binding.dirty {
            binding.status = FieldStatus::Editing;
        }

        match validate(path, value) {
            Ok(()) => {
                binding.error = None;
                if binding.status.is_error() {
                    binding.status = FieldStatus::Editing;
                }
                Ok(())
            }
            Err(e) => {
                binding.error = Some(e.message.clone());
                Err(e.into())
            }
        }
    }

    pub fn mark_focused(&mut self, path: &FieldPath) {
        if let Some(binding) = self.bindings.get_mut(path) {
            binding.status = FieldStatus::Editing;
        }
    }

    /// Record a blur. Returns the inline validation error when the field
    /// cannot be committed.
    pub fn mark_blurred(&mut self, path: &FieldPath) -> Result<(), EditorError> {
        let binding = self
            .bindings
            .get_mut(path)
            .ok_or_else(|| EditorError::UnboundField(path.clone()))?;

        match &binding.error {
            Some(message) => {
                binding.status = FieldStatus::Error(message.clone());
                Err(ValidationError::new(path.clone(), message.clone()).into())
            }
            None => {
                binding.status = FieldStatus::Saving;
                Ok(())
            }
        }
    }

    pub fn set_status(&mut self, path: &FieldPath, status: FieldStatus) {
        if let Some(binding) = self.bindings.get_mut(path) {
            binding.status = status;
        }
    }

    /// Record that `value` is now what the document holds for `path`.
    ///
    /// Status is left to the caller; the field may still be propagating.
    pub fn mark_committed(&mut self, path: &FieldPath, value: &str) {
        self.baseline.insert(path.clone(), value.to_string());
        if let Some(binding) = self.bindings.get_mut(path) {
            binding.dirty = binding.value != value;
        }
    }

    pub fn binding(&self, path: &FieldPath) -> Option<&FieldBinding> {
        self.bindings.get(path)
    }

    pub fn value(&self, path: &FieldPath) -> Option<&str> {
        self.bindings.get(path).map(|b| b.value.as_str())
    }

    pub fn bindings(&self) -> impl Iterator<Item = &FieldBinding> {
        self.bindings.values()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    pub fn has_dirty_fields(&self) -> bool {
        self.bindings.values().any(|b| b.dirty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dadm_model::{shared, Document};

    fn loaded() -> (FieldStateStore, DocumentAdapter, NodeKey) {
        let builder = Document::builder("D", "P")
            .service_task("Task_1")
            .name("Ask assistant");
        let task = builder.last_key();
        let adapter = DocumentAdapter::new(shared(builder.build()));

        let mut store = FieldStateStore::new();
        store
            .load(&adapter, &task, &["service.name".to_string()])
            .unwrap();
        (store, adapter, task)
    }

    #[test]
    fn test_load_populates_bindings() {
        let (store, _, task) = loaded();

        assert!(store.is_loaded_for(&task));
        assert_eq!(store.value(&FieldPath::Id), Some("Task_1"));
        assert_eq!(store.value(&FieldPath::extension("service.name")), Some(""));
        assert!(!store.has_dirty_fields());
        assert!(store.bindings().all(|b| b.status == FieldStatus::Idle));
    }

    #[test]
    fn test_set_field_tracks_dirty_and_errors() {
        let (mut store, _, _) = loaded();

        assert!(store.set_field(&FieldPath::Id, "Task_2").is_ok());
        assert!(store.binding(&FieldPath::Id).unwrap().dirty);

        let err = store.set_field(&FieldPath::Id, "1abc").unwrap_err();
        assert!(matches!(err, EditorError::Validation(_)));
        let binding = store.binding(&FieldPath::Id).unwrap();
        assert_eq!(binding.value, "1abc");
        assert!(binding.error.is_some());

        // back to the loaded value: clean and valid again
        store.set_field(&FieldPath::Id, "Task_1").unwrap();
        let binding = store.binding(&FieldPath::Id).unwrap();
        assert!(!binding.dirty);
        assert!(binding.is_valid());
    }

    #[test]
    fn test_set_field_does_not_touch_document() {
        let (mut store, adapter, task) = loaded();

        store.set_field(&FieldPath::Name, "Renamed").unwrap();

        assert_eq!(adapter.read(&task, &FieldPath::Name).unwrap(), "Ask assistant");
        assert_eq!(adapter.with_document(|d| d.revision()).unwrap(), 0);
    }

    #[test]
    fn test_unbound_field() {
        let (mut store, _, _) = loaded();
        let path = FieldPath::extension("service.version");
        assert!(matches!(
            store.set_field(&path, "1.0"),
            Err(EditorError::UnboundField(_))
        ));
    }

    #[test]
    fn test_focus_blur_status() {
        let (mut store, _, _) = loaded();

        store.mark_focused(&FieldPath::Name);
        assert_eq!(store.binding(&FieldPath::Name).unwrap().status, FieldStatus::Editing);

        store.set_field(&FieldPath::Name, "New name").unwrap();
        assert!(store.mark_blurred(&FieldPath::Name).is_ok());
        assert_eq!(store.binding(&FieldPath::Name).unwrap().status, FieldStatus::Saving);

        let _ = store.set_field(&FieldPath::Name, "   ");
        assert!(store.mark_blurred(&FieldPath::Name).is_err());
        assert!(store.binding(&FieldPath::Name).unwrap().status.is_error());
    }

    #[test]
    fn test_dirty_edit_leaves_saved_status() {
        let (mut store, _, _) = loaded();

        store.set_field(&FieldPath::Name, "New name").unwrap();
        store.mark_committed(&FieldPath::Name, "New name");
        store.set_status(&FieldPath::Name, FieldStatus::Saved);

        // no focus event from the host in between
        store.set_field(&FieldPath::Name, "Newer name").unwrap();
        assert_eq!(store.binding(&FieldPath::Name).unwrap().status, FieldStatus::Editing);
    }

    #[test]
    fn test_clean_edit_keeps_status() {
        let (mut store, _, _) = loaded();
        store.set_status(&FieldPath::Name, FieldStatus::Saved);

        store.set_field(&FieldPath::Name, "Ask assistant").unwrap();
        assert_eq!(store.binding(&FieldPath::Name).unwrap().status, FieldStatus::Saved);
    }

    #[test]
    fn test_mark_committed() {
        let (mut store, _, _) = loaded();

        store.set_field(&FieldPath::Name, "New name").unwrap();
        store.mark_committed(&FieldPath::Name, "New name");
        assert!(!store.binding(&FieldPath::Name).unwrap().dirty);

        // edited again while the first value was being written
        store.set_field(&FieldPath::Name, "Newer name").unwrap();
        store.mark_committed(&FieldPath::Name, "New name");
        assert!(store.binding(&FieldPath::Name).unwrap().dirty);
    }

    #[test]
    fn test_reload_discards_edits() {
        let (mut store, adapter, task) = loaded();

        store.set_field(&FieldPath::Name, "Unsaved").unwrap();
        store.load(&adapter, &task, &[]).unwrap();

        assert_eq!(store.value(&FieldPath::Name), Some("Ask assistant"));
        assert!(store.binding(&FieldPath::extension("service.name")).is_none());
    }

    #[test]
    fn test_failed_load_clears_store() {
        let (mut store, adapter, _) = loaded();

        assert!(store.load(&adapter, &NodeKey::new("gone"), &[]).is_err());
        assert!(store.is_empty());
        assert!(store.node().is_none());
    }
}
