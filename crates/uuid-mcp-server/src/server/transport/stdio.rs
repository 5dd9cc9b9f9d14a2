use futures::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite, Stdin, Stdout};
use tokio_util::codec::{FramedRead, FramedWrite, LinesCodec, LinesCodecError};
use uuid_mcp_core::protocol::Response;

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// An incoming line was longer than the configured limit.
    #[error("frame exceeds {limit} bytes")]
    FrameTooLarge { limit: usize },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to encode response: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Newline-delimited JSON frames over a byte stream pair.
///
/// Reads are capped at `max_message_bytes` per line. Every write is flushed
/// before `send` returns, so a response is on the wire before the next frame
/// is read.
pub struct StdioTransport<R, W> {
    reader: FramedRead<R, LinesCodec>,
    writer: FramedWrite<W, LinesCodec>,
    max_message_bytes: usize,
}

impl StdioTransport<Stdin, Stdout> {
    /// Transport bound to the process's stdin and stdout.
    pub fn stdio(max_message_bytes: usize) -> Self {
        Self::new(tokio::io::stdin(), tokio::io::stdout(), max_message_bytes)
    }
}

impl<R, W> StdioTransport<R, W>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    pub fn new(reader: R, writer: W, max_message_bytes: usize) -> Self {
        Self {
            reader: FramedRead::new(reader, LinesCodec::new_with_max_length(max_message_bytes)),
            writer: FramedWrite::new(writer, LinesCodec::new()),
            max_message_bytes,
        }
    }

    /// Next frame, or `None` once the peer closes its end.
    ///
    /// Cancel safe: dropping the future loses no data.
    pub async fn recv(&mut self) -> Option<Result<String, TransportError>> {
        let frame = self.reader.next().await?;
        Some(frame.map_err(|err| match err {
            LinesCodecError::MaxLineLengthExceeded => TransportError::FrameTooLarge {
                limit: self.max_message_bytes,
            },
            LinesCodecError::Io(err) => TransportError::Io(err),
        }))
    }

    /// Serializes and writes one response line, then flushes.
    pub async fn send(&mut self, response: &Response) -> Result<(), TransportError> {
        let line = serde_json::to_string(response)?;
        self.writer.send(line).await.map_err(|err| match err {
            LinesCodecError::Io(err) => TransportError::Io(err),
            // Only the decoder enforces a length limit.
            LinesCodecError::MaxLineLengthExceeded => TransportError::FrameTooLarge {
                limit: self.max_message_bytes,
            },
        })
    }

    /// Flushes and shuts down the write half.
    pub async fn close(&mut self) -> Result<(), TransportError> {
        SinkExt::<String>::close(&mut self.writer)
            .await
            .map_err(|err| match err {
                LinesCodecError::Io(err) => TransportError::Io(err),
                LinesCodecError::MaxLineLengthExceeded => TransportError::FrameTooLarge {
                    limit: self.max_message_bytes,
                },
            })
    }
}
