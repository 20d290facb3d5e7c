//! Port receiving rendered document bytes as they are produced.

use async_trait::async_trait;

use super::define_port_error;

define_port_error! {
    /// Errors raised by document sinks.
    pub enum DocumentSinkError {
        /// The consumer went away; no further chunks will be accepted.
        Closed => "document sink closed",
    }
}

/// Consumer of streamed document output.
///
/// Writes may apply backpressure by awaiting until the consumer has capacity.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DocumentSink: Send {
    /// Accept the next chunk of output.
    async fn write_chunk(&mut self, chunk: Vec<u8>) -> Result<(), DocumentSinkError>;
}

/// Sink that collects every chunk in memory.
///
/// Used by tests and tools that need the complete document.
#[derive(Debug, Default, Clone)]
pub struct VecDocumentSink {
    chunks: Vec<Vec<u8>>,
}

impl VecDocumentSink {
    /// Number of chunks received so far.
    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    /// Concatenate every received chunk.
    pub fn into_bytes(self) -> Vec<u8> {
        self.chunks.concat()
    }
}

#[async_trait]
impl DocumentSink for VecDocumentSink {
    async fn write_chunk(&mut self, chunk: Vec<u8>) -> Result<(), DocumentSinkError> {
        self.chunks.push(chunk);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn vec_sink_concatenates_chunks() {
        let mut sink = VecDocumentSink::default();
        sink.write_chunk(b"%PDF".to_vec()).await.expect("write");
        sink.write_chunk(b"-1.4".to_vec()).await.expect("write");

        assert_eq!(sink.chunk_count(), 2);
        assert_eq!(sink.into_bytes(), b"%PDF-1.4");
    }
}
