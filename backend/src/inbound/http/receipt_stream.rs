//! Bridge from the receipt renderer to a streaming HTTP body.
//!
//! The renderer runs in its own task and writes into a bounded channel; the
//! response body drains it. A full channel makes the renderer wait, and a
//! dropped body (client gone) closes the sink so rendering stops.
//!
//! The body only ends cleanly after the renderer reports completion. A render
//! error, or a sender dropped without completing (the task panicked or was
//! cancelled), ends the body with an error so the response is aborted rather
//! than passed off as a whole document.

use actix_web::web::Bytes;
use async_trait::async_trait;
use futures_util::{Stream, StreamExt, stream};
use tokio::sync::mpsc;
use tracing::warn;

use crate::domain::ports::{DocumentSink, DocumentSinkError};
use crate::domain::receipt_document::RenderError;

/// Chunks buffered between renderer and response body.
pub const RECEIPT_CHANNEL_CAPACITY: usize = 4;

/// One message from the renderer to the response body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReceiptFrame {
    Chunk(Vec<u8>),
    /// The document is complete; the body may end.
    Complete,
    Failed(RenderError),
}

/// Why a receipt body was cut short.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReceiptStreamError {
    #[error("receipt rendering failed: {0}")]
    Render(#[from] RenderError),
    #[error("receipt renderer stopped before completing the document")]
    Interrupted,
}

/// Document sink writing into a bounded channel.
#[derive(Debug)]
pub struct ChannelSink {
    sender: mpsc::Sender<ReceiptFrame>,
}

impl ChannelSink {
    /// Create a sink and the receiving half that feeds the response body.
    pub fn bounded(capacity: usize) -> (Self, mpsc::Receiver<ReceiptFrame>) {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        (Self { sender }, receiver)
    }

    /// Mark the document complete.
    pub async fn complete(self) {
        // A gone receiver has nothing left to finish.
        let _ = self.sender.send(ReceiptFrame::Complete).await;
    }

    /// Report a render failure to the body.
    pub async fn fail(self, error: RenderError) {
        let _ = self.sender.send(ReceiptFrame::Failed(error)).await;
    }
}

#[async_trait]
impl DocumentSink for ChannelSink {
    async fn write_chunk(&mut self, chunk: Vec<u8>) -> Result<(), DocumentSinkError> {
        self.sender
            .send(ReceiptFrame::Chunk(chunk))
            .await
            .map_err(|_| DocumentSinkError::closed())
    }
}

/// Turn the receiving half into a response body stream, starting with
/// `first`, which the handler already pulled to confirm rendering began.
pub fn body_stream(
    first: Vec<u8>,
    receiver: mpsc::Receiver<ReceiptFrame>,
) -> impl Stream<Item = Result<Bytes, actix_web::Error>> + 'static {
    let rest = stream::unfold(Some(receiver), |state| async move {
        let mut receiver = state?;
        let item = match receiver.recv().await {
            Some(ReceiptFrame::Chunk(chunk)) => {
                return Some((Ok(Bytes::from(chunk)), Some(receiver)));
            }
            Some(ReceiptFrame::Complete) => return None,
            Some(ReceiptFrame::Failed(error)) => ReceiptStreamError::from(error),
            None => ReceiptStreamError::Interrupted,
        };
        warn!(error = %item, "aborting receipt response");
        Some((Err(actix_web::error::ErrorInternalServerError(item)), None))
    });
    stream::once(async move { Ok::<_, actix_web::Error>(Bytes::from(first)) }).chain(rest)
}
