//! Serializer Bridge: regenerates the document text after each committed
//! write and hands it to the host.
//!
//! Propagation runs through one editor-wide section, so the host receives
//! texts in render order and never ends on an older text than one it has
//! already been given.

use std::sync::Arc;

use async_trait::async_trait;
use dadm_model::Document;
use tokio::sync::{mpsc, Mutex as AsyncMutex};
use tracing::debug;

use crate::errors::BridgeError;

/// Receiver of freshly serialized document text
#[async_trait]
pub trait DocumentSink: Send + Sync {
    async fn publish(&self, text: String) -> Result<(), BridgeError>;
}

/// Sink forwarding every revision over an unbounded channel
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<String>,
}

impl ChannelSink {
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<String>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

#[async_trait]
impl DocumentSink for ChannelSink {
    async fn publish(&self, text: String) -> Result<(), BridgeError> {
        self.tx
            .send(text)
            .map_err(|_| BridgeError::Sink("receiver dropped".to_string()))
    }
}

/// Sink that discards everything
#[derive(Debug, Clone, Default)]
pub struct NullSink;

#[async_trait]
impl DocumentSink for NullSink {
    async fn publish(&self, _text: String) -> Result<(), BridgeError> {
        Ok(())
    }
}

/// Position of a rendered text in the document's history.
///
/// `epoch` changes whenever a different document is attached; `revision` is
/// the document revision the text was rendered from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct RenderStamp {
    pub epoch: u64,
    pub revision: u64,
}

/// Serialized document text with the state it was rendered from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rendered {
    pub stamp: RenderStamp,
    pub text: String,
}

#[derive(Clone)]
pub struct SerializerBridge {
    sink: Arc<dyn DocumentSink>,
    /// Stamp of the newest text the sink accepted; held across publishing
    published: Arc<AsyncMutex<Option<RenderStamp>>>,
}

impl SerializerBridge {
    pub fn new(sink: Arc<dyn DocumentSink>) -> Self {
        Self {
            sink,
            published: Arc::new(AsyncMutex::new(None)),
        }
    }

    /// Regenerate the full text form of the document
    pub fn render(&self, doc: &Document, epoch: u64) -> Result<Rendered, BridgeError> {
        Ok(Rendered {
            stamp: RenderStamp {
                epoch,
                revision: doc.revision(),
            },
            text: doc.serialize()?,
        })
    }

    /// Hand rendered text to the host.
    ///
    /// Returns `Ok(false)` without publishing when the sink has already
    /// accepted a newer text.
    pub async fn propagate(&self, rendered: Rendered) -> Result<bool, BridgeError> {
        let mut published = self.published.lock().await;
        if published.is_some_and(|last| last > rendered.stamp) {
            debug!(
                revision = rendered.stamp.revision,
                "Newer document already propagated; text dropped"
            );
            return Ok(false);
        }

        self.sink.publish(rendered.text).await?;
        *published = Some(rendered.stamp);
        Ok(true)
    }
}

impl std::fmt::Debug for SerializerBridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerializerBridge").finish_non_exhaustive()
    }
}
