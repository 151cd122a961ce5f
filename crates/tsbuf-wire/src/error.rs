/// Errors raised while locating packet boundaries at the head of a stream.
///
/// The first three variants mean the bytes themselves do not look like a
/// fixed-size packet stream. `Io` means the source failed underneath us
/// (a seek error, a read error other than running out of input, or a
/// resync skip that could not be satisfied) and is always fatal.
///
/// ```text
///   FormatError
///   ├── MissingLeadingSync   ← fewer than 193 bytes at the head
///   ├── NotSyncAligned       ← byte 0 is not 0x47
///   ├── NoSecondSyncMarker   ← no 0x47 at index >= 188 inside the probe
///   └── Io                   ← read / seek / skip failed
/// ```
#[derive(Debug, thiserror::Error)]
pub enum FormatError {
    /// The source ended before the probe window could be filled.
    #[error("missing leading sync: needed {needed} probe bytes, stream held {available}")]
    MissingLeadingSync { needed: usize, available: usize },

    /// The stream does not start on a packet boundary.
    #[error("stream is not sync aligned: first byte is {found:#04X}, expected 0x47")]
    NotSyncAligned { found: u8 },

    /// Only one sync byte was seen in the probe window, so the distance
    /// between two packet starts cannot be measured.
    #[error("only one sync byte detected in first {window} bytes")]
    NoSecondSyncMarker { window: usize },

    /// The underlying source failed. `context` names the operation.
    #[error("{context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },
}

impl FormatError {
    pub(crate) fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }
}
