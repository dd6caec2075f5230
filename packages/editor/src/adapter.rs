//! # Document Adapter
//!
//! Translates `(field path, value)` pairs into mutations of one element of
//! the host document, and reads current values back for initial population.
//!
//! ## Write Semantics
//!
//! Every write returns `Ok(true)` when the tree changed and `Ok(false)` when
//! the stored value already matched. A no-op write never takes mutable
//! access to the element, so it never bumps the document revision.
//!
//! ### Documentation
//! - Blank (after trimming) clears any documentation nodes
//! - Otherwise exactly one documentation node holds the value
//!
//! ### Extension properties
//! - Container and properties list are created lazily on first non-empty write
//! - An empty value removes the entry; entries are never empty-valued
//! - Container and list are kept once created, even when emptied

use std::collections::BTreeMap;
use std::sync::MutexGuard;

use dadm_model::{lock, Document, Element, ExtensionElements, ModelError, NodeKey, SharedDocument};

use crate::errors::AdapterError;
use crate::field::FieldPath;

/// Underlying attribute of the implementation descriptor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImplementationProperty {
    Type,
    Topic,
}

/// Field-level access to the shared host document
#[derive(Debug, Clone)]
pub struct DocumentAdapter {
    document: SharedDocument,
}

impl DocumentAdapter {
    pub fn new(document: SharedDocument) -> Self {
        Self { document }
    }

    /// Run a read-only closure against the locked document
    pub fn with_document<R>(&self, f: impl FnOnce(&Document) -> R) -> Result<R, AdapterError> {
        let doc = self.lock()?;
        Ok(f(&doc))
    }

    /// Current value of every field the element's kind carries.
    ///
    /// Missing optional structures read as the empty string.
    pub fn read_all(
        &self,
        node: &NodeKey,
        extension_keys: &[String],
    ) -> Result<BTreeMap<FieldPath, String>, AdapterError> {
        let doc = self.lock()?;
        let el = element(&doc, node)?;

        let mut values = BTreeMap::new();
        for path in FieldPath::core() {
            let value = read_field(el, &path)?;
            values.insert(path, value);
        }

        if el.kind.supports_implementation() {
            values.insert(
                FieldPath::ImplementationType,
                el.implementation.task_type.clone(),
            );
            values.insert(
                FieldPath::ImplementationTopic,
                el.implementation.topic.clone(),
            );
        }

        if el.kind.supports_extensions() {
            for key in extension_keys {
                let value = el.extension_property(key).unwrap_or_default().to_string();
                values.insert(FieldPath::extension(key.as_str()), value);
            }
        }

        Ok(values)
    }

    /// Current value of a single field
    pub fn read(&self, node: &NodeKey, path: &FieldPath) -> Result<String, AdapterError> {
        let doc = self.lock()?;
        read_field(element(&doc, node)?, path)
    }

    /// Route a field write to its operation
    pub fn write(&self, node: &NodeKey, path: &FieldPath, value: &str) -> Result<bool, AdapterError> {
        match path {
            FieldPath::Name => self.write_name(node, value),
            FieldPath::Id => self.write_id(node, value),
            FieldPath::Documentation => self.write_documentation(node, value),
            FieldPath::ImplementationType => {
                self.write_implementation(node, ImplementationProperty::Type, value)
            }
            FieldPath::ImplementationTopic => {
                self.write_implementation(node, ImplementationProperty::Topic, value)
            }
            FieldPath::Extension(key) => self.write_extension_property(node, key, value),
        }
    }

    pub fn write_name(&self, node: &NodeKey, value: &str) -> Result<bool, AdapterError> {
        let mut doc = self.lock()?;
        if element(&doc, node)?.name == value {
            return Ok(false);
        }
        element_mut(&mut doc, node)?.name = value.to_string();
        Ok(true)
    }

    /// Replace the element's `id` attribute.
    ///
    /// Ids stay unique across the document; a value already used by another
    /// element is rejected.
    pub fn write_id(&self, node: &NodeKey, value: &str) -> Result<bool, AdapterError> {
        let mut doc = self.lock()?;
        if element(&doc, node)?.id == value {
            return Ok(false);
        }
        if doc.find_by_id(value).is_some() {
            return Err(ModelError::DuplicateId(value.to_string()).into());
        }
        element_mut(&mut doc, node)?.id = value.to_string();
        Ok(true)
    }

    pub fn write_documentation(&self, node: &NodeKey, value: &str) -> Result<bool, AdapterError> {
        let mut doc = self.lock()?;
        let existing = &element(&doc, node)?.documentation;

        if value.trim().is_empty() {
            if existing.is_empty() {
                return Ok(false);
            }
            element_mut(&mut doc, node)?.documentation.clear();
            return Ok(true);
        }

        if existing.len() == 1 && existing[0].text == value {
            return Ok(false);
        }

        let fresh = doc.create_documentation(value);
        let docs = &mut element_mut(&mut doc, node)?.documentation;
        match docs.first_mut() {
            Some(first) => {
                first.text = value.to_string();
                docs.truncate(1);
            }
            None => docs.push(fresh),
        }
        Ok(true)
    }

    pub fn write_implementation(
        &self,
        node: &NodeKey,
        property: ImplementationProperty,
        value: &str,
    ) -> Result<bool, AdapterError> {
        let mut doc = self.lock()?;
        let el = element(&doc, node)?;
        if !el.kind.supports_implementation() {
            let path = match property {
                ImplementationProperty::Type => FieldPath::ImplementationType,
                ImplementationProperty::Topic => FieldPath::ImplementationTopic,
            };
            return Err(AdapterError::unsupported(&path, el.kind.tag()));
        }

        let current = match property {
            ImplementationProperty::Type => &el.implementation.task_type,
            ImplementationProperty::Topic => &el.implementation.topic,
        };
        if current == value {
            return Ok(false);
        }

        let implementation = &mut element_mut(&mut doc, node)?.implementation;
        match property {
            ImplementationProperty::Type => implementation.task_type = value.to_string(),
            ImplementationProperty::Topic => implementation.topic = value.to_string(),
        }
        Ok(true)
    }

    pub fn write_extension_property(
        &self,
        node: &NodeKey,
        key: &str,
        value: &str,
    ) -> Result<bool, AdapterError> {
        let mut doc = self.lock()?;
        let el = element(&doc, node)?;
        if !el.kind.supports_extensions() {
            return Err(AdapterError::unsupported(
                &FieldPath::extension(key),
                el.kind.tag(),
            ));
        }

        let current = el.extension_property(key);
        if value.is_empty() {
            if current.is_none() {
                return Ok(false);
            }
            let properties = element_mut(&mut doc, node)?
                .extension_elements
                .as_mut()
                .and_then(|ext| ext.properties.as_mut());
            if let Some(properties) = properties {
                properties.values.retain(|p| p.name != key);
            }
            return Ok(true);
        }

        if current == Some(value) {
            return Ok(false);
        }

        let container = doc.create_extension_elements();
        let list = doc.create_properties();
        let entry = doc.create_property(key, value);

        let el = element_mut(&mut doc, node)?;
        let properties = el
            .extension_elements
            .get_or_insert_with(|| container)
            .properties
            .get_or_insert_with(|| list);

        match properties.values.iter_mut().find(|p| p.name == key) {
            Some(existing) => existing.value = value.to_string(),
            None => properties.values.push(entry),
        }
        Ok(true)
    }

    fn lock(&self) -> Result<MutexGuard<'_, Document>, AdapterError> {
        Ok(lock(&self.document)?)
    }
}

fn element<'a>(doc: &'a Document, node: &NodeKey) -> Result<&'a Element, AdapterError> {
    doc.element(node)
        .ok_or_else(|| AdapterError::ElementNotFound(node.to_string()))
}

fn element_mut<'a>(doc: &'a mut Document, node: &NodeKey) -> Result<&'a mut Element, AdapterError> {
    doc.element_mut(node)
        .ok_or_else(|| AdapterError::ElementNotFound(node.to_string()))
}

fn read_field(el: &Element, path: &FieldPath) -> Result<String, AdapterError> {
    let value = match path {
        FieldPath::Name => el.name.clone(),
        FieldPath::Id => el.id.clone(),
        FieldPath::Documentation => el.documentation_text().unwrap_or_default().to_string(),
        FieldPath::ImplementationType | FieldPath::ImplementationTopic
            if !el.kind.supports_implementation() =>
        {
            return Err(AdapterError::unsupported(path, el.kind.tag()));
        }
        FieldPath::ImplementationType => el.implementation.task_type.clone(),
        FieldPath::ImplementationTopic => el.implementation.topic.clone(),
        FieldPath::Extension(_) if !el.kind.supports_extensions() => {
            return Err(AdapterError::unsupported(path, el.kind.tag()));
        }
        FieldPath::Extension(key) => el.extension_property(key).unwrap_or_default().to_string(),
    };
    Ok(value)
}

/// True when the element has an extension container holding a properties list
pub fn has_extension_list(el: &Element) -> bool {
    matches!(
        el.extension_elements,
        Some(ExtensionElements {
            properties: Some(_)
        })
    )
}
