use std::io::Read;

use tsbuf_wire::source::read_full;

use crate::error::BufferError;

/// Bulk reader that refills one reusable buffer from the source.
///
/// Each [`fill`](Self::fill) overwrites the buffer from the start and
/// tries to fill it completely. Three outcomes are possible:
///
/// ```text
///   Ok(Some(chunk))  ← 1..=capacity bytes; short only at end of stream
///   Ok(None)         ← the source was already exhausted
///   Err(Io)          ← read failed; whatever was read is discarded
/// ```
///
/// The returned slice borrows the buffer, so the borrow checker keeps a
/// refill from happening while anyone still looks at the previous chunk.
/// Decode tasks never hold such a borrow: they get owned copies.
pub struct ChunkReader {
  buf: Vec<u8>,
}

impl ChunkReader {
  /// Allocate a reader with a `capacity`-byte buffer.
  #[must_use]
  pub fn new(capacity: usize) -> Self {
    Self {
      buf: vec![0u8; capacity],
    }
  }

  /// Buffer size in bytes.
  #[must_use]
  pub fn capacity(&self) -> usize {
    self.buf.len()
  }

  /// Read the next chunk from `source`.
  ///
  /// # Errors
  ///
  /// Returns [`BufferError::Io`] if the source reports any error other
  /// than `Interrupted`, even after a partial read.
  pub fn fill<R: Read + ?Sized>(&mut self, source: &mut R) -> Result<Option<&[u8]>, BufferError> {
    let capacity = self.buf.len();
    let n = read_full(source, &mut self.buf)
      .map_err(|e| BufferError::io(format!("reading {capacity} bytes failed"), e))?;

    if n == 0 {
      return Ok(None);
    }
    Ok(Some(&self.buf[..n]))
  }
}
