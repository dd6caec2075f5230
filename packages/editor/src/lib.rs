//! # DADM Properties Editor
//!
//! Edits the properties of the selected element of a process diagram.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │ host: selection + shared document           │
//! └─────────────────────────────────────────────┘
//!                     ↓ select / attach
//! ┌─────────────────────────────────────────────┐
//! │ editor: field store + commit scheduler      │
//! │  - Load fields from the selected element    │
//! │  - Validate on every edit                   │
//! │  - Debounced, per-element serialized writes │
//! └─────────────────────────────────────────────┘
//!                     ↓ adapter write
//! ┌─────────────────────────────────────────────┐
//! │ model: element tree → serialized XML        │
//! └─────────────────────────────────────────────┘
//!                     ↓ DocumentSink
//!                host text buffer
//! ```
//!
//! ## Core Principles
//!
//! 1. **Document is source of truth**: the field store is a detached mirror
//! 2. **Commit on blur**: keystrokes never touch the tree
//! 3. **One write in flight per element**: later commits wait their turn
//! 4. **Selection changes win**: pending timers for the old element are cancelled
//!
//! ## Usage
//!
//! ```rust,ignore
//! use dadm_editor::{ChannelSink, EditorConfig, FieldPath, PropertiesEditor};
//!
//! let (sink, mut updates) = ChannelSink::channel();
//! let editor = PropertiesEditor::new(EditorConfig::default(), Arc::new(sink));
//!
//! editor.attach(document);
//! editor.select(Some(task_key));
//! editor.edit(&FieldPath::Id, "Task_2")?;
//! editor.blur(&FieldPath::Id);
//!
//! let xml = updates.recv().await;
//! ```

mod adapter;
mod bridge;
mod config;
mod errors;
mod field;
mod scheduler;
mod selection;
mod session;
mod store;
mod validator;

pub use adapter::{has_extension_list, DocumentAdapter, ImplementationProperty};
pub use bridge::{ChannelSink, DocumentSink, NullSink, RenderStamp, Rendered, SerializerBridge};
pub use config::{EditorConfig, DEFAULT_CONFIG_NAME};
pub use errors::{
    AdapterError, BridgeError, ConfigError, EditorError, FieldPathError, ValidationError,
};
pub use field::{FieldBinding, FieldPath, FieldStatus};
pub use scheduler::{CommitRequest, CommitScheduler, GatePermit, ScheduledCommit, WriteGate};
pub use selection::{SelectionContext, SelectionController};
pub use session::{EditorHooks, FieldEditHook, PropertiesEditor};
pub use store::FieldStateStore;
pub use validator::{validate, NAME_MAX_CHARS};

// Re-export common types for convenience
pub use dadm_model::{Document, NodeKey, SharedDocument};
