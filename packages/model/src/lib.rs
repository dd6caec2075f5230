//! # DADM Process Model
//!
//! In-memory process diagram tree edited by the properties panel.
//!
//! The model offers three capabilities to its consumers:
//! - property access on elements addressed by a stable [`NodeKey`]
//! - factories for structural sub-elements (documentation, extension
//!   containers, extension property entries)
//! - serialization of the whole tree to its XML text form

pub mod document;
pub mod error;
pub mod id_generator;
pub mod model;
pub mod serializer;

pub use document::{lock, shared, Document, SharedDocument};
#[cfg(any(test, feature = "fixtures"))]
pub use document::DocumentBuilder;
pub use error::{ModelError, ModelResult, SerializeError, SerializeResult};
pub use model::{
    Documentation, Element, ElementKind, ExtensionElements, Implementation, NodeKey, Properties,
    Property,
};
pub use serializer::{serialize, Serializer};
