use tsbuf_wire::FormatError;

/// Errors surfaced by [`StreamBuffer`](crate::StreamBuffer).
///
/// Two classes share this enum and must be told apart by the caller:
///
/// ```text
///   BufferError
///   ├── fatal (construction or refill aborted, nothing queued)
///   │   ├── InvalidConfig     ← zero workers / chunk size, overflow
///   │   ├── Format(..)        ← packet size could not be detected
///   │   └── Io                ← read / seek / skip failed
///   └── per-packet (only this packet is lost, the stream goes on)
///       ├── Decode            ← the decoder rejected the bytes
///       ├── TruncatedPacket   ← trailing partial packet at end of stream
///       └── WorkerLost        ← the decode worker died before answering
/// ```
///
/// End of stream is not an error; `next()` returns `None` for it.
#[derive(Debug, thiserror::Error)]
pub enum BufferError {
    /// The configuration cannot produce a working buffer.
    #[error("invalid buffer configuration: {reason}")]
    InvalidConfig { reason: &'static str },

    /// Packet-size auto-detection rejected the head of the stream.
    #[error("auto detecting packet size failed: {0}")]
    Format(FormatError),

    /// The source failed. `context` names the operation that was running.
    #[error("{context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    /// The decoder failed on one packet. `index` is the packet's
    /// zero-based position among the packets read from the source.
    #[error("building packet {index} failed")]
    Decode {
        index: u64,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// The stream ended partway through a packet. The short slice was
    /// dispatched like any other, but never reaches the decoder.
    #[error("packet {index} truncated: {len} of {expected} bytes before end of stream")]
    TruncatedPacket {
        index: u64,
        len: usize,
        expected: usize,
    },

    /// The worker dropped its completion signal without a result,
    /// which happens when the decoder panics.
    #[error("decode worker for packet {index} exited without a result")]
    WorkerLost { index: u64 },
}

impl BufferError {
    pub(crate) fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// `true` for errors that end the current operation with nothing
    /// queued; `false` for errors scoped to a single packet.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::InvalidConfig { .. } | Self::Format(_) | Self::Io { .. }
        )
    }

    /// Zero-based index of the packet a per-packet error belongs to.
    #[must_use]
    pub fn packet_index(&self) -> Option<u64> {
        match self {
            Self::Decode { index, .. }
            | Self::TruncatedPacket { index, .. }
            | Self::WorkerLost { index } => Some(*index),
            _ => None,
        }
    }

    /// Borrow the decoder's own error, if this is a `Decode` error
    /// produced by a decoder whose error type is `E`.
    #[must_use]
    pub fn decoder_error<E: std::error::Error + 'static>(&self) -> Option<&E> {
        match self {
            Self::Decode { source, .. } => source.downcast_ref::<E>(),
            _ => None,
        }
    }
}

impl From<FormatError> for BufferError {
    /// Detector I/O failures are I/O failures of the buffer; everything
    /// else is a format rejection.
    fn from(err: FormatError) -> Self {
        match err {
            FormatError::Io { context, source } => Self::Io {
                context: format!("auto detecting packet size failed: {context}"),
                source,
            },
            other => Self::Format(other),
        }
    }
}
