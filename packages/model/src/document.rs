//! # Process Document
//!
//! Owning tree for one process diagram.
//!
//! A Document holds a single `bpmn:process` root and its flow elements.
//! Every element carries a stable [`NodeKey`]; mutable access to an element
//! bumps the document revision, which downstream consumers treat as the
//! change notification.
//!
//! ```text
//! definitions
//!   └── process (root)
//!         ├── startEvent
//!         ├── serviceTask ── documentation, extensionElements
//!         └── endEvent
//! ```

use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::error::{ModelError, ModelResult, SerializeResult};
use crate::id_generator::KeyGenerator;
use crate::model::{
    Documentation, Element, ElementKind, ExtensionElements, NodeKey, Properties, Property,
};
use crate::serializer::Serializer;

/// Document shared between the host and the properties editor
pub type SharedDocument = Arc<Mutex<Document>>;

/// Wrap a document for sharing
pub fn shared(document: Document) -> SharedDocument {
    Arc::new(Mutex::new(document))
}

/// Lock a shared document, mapping poisoning to a model error
pub fn lock(document: &SharedDocument) -> ModelResult<MutexGuard<'_, Document>> {
    document.lock().map_err(|_| ModelError::Poisoned)
}

/// Editable process document
#[derive(Debug, Clone)]
pub struct Document {
    /// `bpmn:definitions` id
    pub id: String,

    root: Element,

    /// Increments on every mutable element access
    revision: u64,

    keys: KeyGenerator,
}

/// On-disk JSON shape
#[derive(Serialize, Deserialize)]
struct DocumentFile {
    id: String,
    process: Element,
}

impl Document {
    /// Create a document with an empty process root
    pub fn new(id: impl Into<String>, process_id: impl Into<String>) -> Self {
        let id = id.into();
        let mut keys = KeyGenerator::new(&id);
        let root = Element::new(keys.next_key(), ElementKind::Process, process_id);

        Self {
            id,
            root,
            revision: 0,
            keys,
        }
    }

    #[cfg(any(test, feature = "fixtures"))]
    pub fn builder(id: impl Into<String>, process_id: impl Into<String>) -> DocumentBuilder {
        DocumentBuilder::new(Self::new(id, process_id))
    }

    /// Load a document from its JSON form, assigning fresh keys
    pub fn from_json(source: &str) -> ModelResult<Self> {
        let file: DocumentFile = serde_json::from_str(source)?;
        let mut keys = KeyGenerator::new(&file.id);
        let mut root = file.process;

        if root.kind != ElementKind::Process {
            return Err(ModelError::NotAContainer(root.id));
        }
        assign_keys(&mut root, &mut keys);

        let doc = Self {
            id: file.id,
            root,
            revision: 0,
            keys,
        };
        doc.check_unique_ids()?;
        Ok(doc)
    }

    pub fn to_json(&self) -> ModelResult<String> {
        let file = DocumentFile {
            id: self.id.clone(),
            process: self.root.clone(),
        };
        Ok(serde_json::to_string_pretty(&file)?)
    }

    pub fn root(&self) -> &Element {
        &self.root
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn element(&self, key: &NodeKey) -> Option<&Element> {
        self.root.find(key)
    }

    /// Get mutable element reference (counts as a change)
    pub fn element_mut(&mut self, key: &NodeKey) -> Option<&mut Element> {
        let element = self.root.find_mut(key)?;
        self.revision += 1;
        Some(element)
    }

    pub fn find_by_id(&self, id: &str) -> Option<&Element> {
        self.elements().into_iter().find(|e| e.id == id)
    }

    /// All elements, depth first
    pub fn elements(&self) -> Vec<&Element> {
        let mut out = Vec::new();
        self.root.walk(&mut out);
        out
    }

    /// Append a new element under `parent`
    pub fn add_element(
        &mut self,
        parent: &NodeKey,
        kind: ElementKind,
        id: impl Into<String>,
    ) -> ModelResult<NodeKey> {
        let id = id.into();
        if self.find_by_id(&id).is_some() {
            return Err(ModelError::DuplicateId(id));
        }

        let key = self.keys.next_key();
        let element = Element::new(key.clone(), kind, id);

        let parent_el = self
            .element_mut(parent)
            .ok_or_else(|| ModelError::element_not_found(parent.as_str()))?;
        if !parent_el.kind.is_container() {
            return Err(ModelError::NotAContainer(parent_el.id.clone()));
        }
        parent_el.children.push(element);

        Ok(key)
    }

    pub fn create_documentation(&self, text: impl Into<String>) -> Documentation {
        Documentation { text: text.into() }
    }

    pub fn create_extension_elements(&self) -> ExtensionElements {
        ExtensionElements::default()
    }

    pub fn create_properties(&self) -> Properties {
        Properties::default()
    }

    pub fn create_property(&self, name: impl Into<String>, value: impl Into<String>) -> Property {
        Property {
            name: name.into(),
            value: value.into(),
        }
    }

    /// Serialize the whole tree to its XML text form
    pub fn serialize(&self) -> SerializeResult<String> {
        Serializer::new().serialize(self)
    }

    fn check_unique_ids(&self) -> ModelResult<()> {
        let mut seen = std::collections::HashSet::new();
        for element in self.elements() {
            if !seen.insert(element.id.as_str()) {
                return Err(ModelError::DuplicateId(element.id.clone()));
            }
        }
        Ok(())
    }
}

fn assign_keys(element: &mut Element, keys: &mut KeyGenerator) {
    element.key = keys.next_key();
    for child in &mut element.children {
        assign_keys(child, keys);
    }
}

/// Fluent construction of fixture documents.
///
/// Detail setters (`name`, `documentation`, ...) apply to the element added last.
/// Panics on an invalid fixture; only compiled for tests and the `fixtures`
/// feature.
#[cfg(any(test, feature = "fixtures"))]
pub struct DocumentBuilder {
    doc: Document,
    last: NodeKey,
}

#[cfg(any(test, feature = "fixtures"))]
impl DocumentBuilder {
    fn new(doc: Document) -> Self {
        let last = doc.root.key.clone();
        Self { doc, last }
    }

    pub fn service_task(self, id: &str) -> Self {
        self.element(ElementKind::ServiceTask, id)
    }

    pub fn start_event(self, id: &str) -> Self {
        self.element(ElementKind::Generic("startEvent".to_string()), id)
    }

    pub fn end_event(self, id: &str) -> Self {
        self.element(ElementKind::Generic("endEvent".to_string()), id)
    }

    /// Add an element of any kind under the process root
    pub fn element(mut self, kind: ElementKind, id: &str) -> Self {
        let root = self.doc.root.key.clone();
        match self.doc.add_element(&root, kind, id) {
            Ok(key) => self.last = key,
            Err(e) => panic!("invalid fixture document: {}", e),
        }
        self
    }

    pub fn name(mut self, name: &str) -> Self {
        self.last_mut().name = name.to_string();
        self
    }

    pub fn documentation(mut self, text: &str) -> Self {
        let doc = self.doc.create_documentation(text);
        self.last_mut().documentation.push(doc);
        self
    }

    pub fn implementation(mut self, task_type: &str, topic: &str) -> Self {
        let el = self.last_mut();
        el.implementation.task_type = task_type.to_string();
        el.implementation.topic = topic.to_string();
        self
    }

    pub fn extension(mut self, name: &str, value: &str) -> Self {
        let property = self.doc.create_property(name, value);
        let el = self.last_mut();
        el.extension_elements
            .get_or_insert_with(ExtensionElements::default)
            .properties
            .get_or_insert_with(Properties::default)
            .values
            .push(property);
        self
    }

    /// Key of the element added last
    pub fn last_key(&self) -> NodeKey {
        self.last.clone()
    }

    pub fn build(mut self) -> Document {
        self.doc.revision = 0;
        self.doc
    }

    fn last_mut(&mut self) -> &mut Element {
        let key = self.last.clone();
        self.doc
            .root
            .find_mut(&key)
            .expect("builder tracks keys it created")
    }
}
