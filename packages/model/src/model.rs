use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable internal handle for an element.
///
/// Unlike the `id` attribute, a key never changes while the document is alive,
/// so it survives the user renaming an element's identifier.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeKey(String);

impl NodeKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for NodeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Closed set of element kinds the properties panel distinguishes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ElementKind {
    /// The root process node
    Process,
    /// Task with an external implementation and service-binding metadata
    ServiceTask,
    /// Any other diagram element, tagged with its BPMN element name
    Generic(String),
}

impl ElementKind {
    /// BPMN element name, without namespace prefix
    pub fn tag(&self) -> &str {
        match self {
            ElementKind::Process => "process",
            ElementKind::ServiceTask => "serviceTask",
            ElementKind::Generic(tag) => tag,
        }
    }

    pub fn supports_implementation(&self) -> bool {
        matches!(self, ElementKind::ServiceTask)
    }

    pub fn supports_extensions(&self) -> bool {
        matches!(self, ElementKind::ServiceTask)
    }

    pub fn is_container(&self) -> bool {
        matches!(self, ElementKind::Process)
    }
}

/// Diagram element node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Element {
    #[serde(skip)]
    pub key: NodeKey,
    pub kind: ElementKind,
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub documentation: Vec<Documentation>,
    #[serde(default, skip_serializing_if = "Implementation::is_empty")]
    pub implementation: Implementation,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extension_elements: Option<ExtensionElements>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<Element>,
}

/// `bpmn:documentation` child node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Documentation {
    pub text: String,
}

/// External task implementation descriptor (`camunda:type`, `camunda:topic`)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Implementation {
    #[serde(rename = "type", default)]
    pub task_type: String,
    #[serde(default)]
    pub topic: String,
}

impl Implementation {
    pub fn is_empty(&self) -> bool {
        self.task_type.is_empty() && self.topic.is_empty()
    }
}

/// `bpmn:extensionElements` container
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtensionElements {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<Properties>,
}

/// `camunda:properties` list
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Properties {
    #[serde(default)]
    pub values: Vec<Property>,
}

/// `camunda:property` entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Property {
    pub name: String,
    pub value: String,
}

impl Element {
    pub fn new(key: NodeKey, kind: ElementKind, id: impl Into<String>) -> Self {
        Self {
            key,
            kind,
            id: id.into(),
            name: String::new(),
            documentation: Vec::new(),
            implementation: Implementation::default(),
            extension_elements: None,
            children: Vec::new(),
        }
    }

    /// Find an element by key in this subtree
    pub fn find(&self, key: &NodeKey) -> Option<&Element> {
        if &self.key == key {
            return Some(self);
        }
        self.children.iter().find_map(|child| child.find(key))
    }

    /// Find a mutable element by key in this subtree
    pub fn find_mut(&mut self, key: &NodeKey) -> Option<&mut Element> {
        if &self.key == key {
            return Some(self);
        }
        self.children.iter_mut().find_map(|child| child.find_mut(key))
    }

    /// Depth-first walk, parents before children
    pub fn walk<'a>(&'a self, out: &mut Vec<&'a Element>) {
        out.push(self);
        for child in &self.children {
            child.walk(out);
        }
    }

    /// Text of the first documentation node, if any
    pub fn documentation_text(&self) -> Option<&str> {
        self.documentation.first().map(|d| d.text.as_str())
    }

    /// Value of an extension property entry, if present
    pub fn extension_property(&self, name: &str) -> Option<&str> {
        self.extension_elements
            .as_ref()
            .and_then(|ext| ext.properties.as_ref())
            .and_then(|props| props.values.iter().find(|p| p.name == name))
            .map(|p| p.value.as_str())
    }
}
