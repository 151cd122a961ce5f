use tsbuf_types::PacketDecoder;
use tsbuf_wire::{ByteSource, Detection, SyncDetector};

use crate::chunk_reader::ChunkReader;
use crate::config::BufferConfig;
use crate::decode_queue::DecodeQueue;
use crate::error::BufferError;
use crate::pool::DecodePool;

/// Running totals kept by a [`StreamBuffer`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BufferStats {
  /// Bytes read from the source by refills (probe bytes excluded).
  pub bytes_read: u64,
  /// Refills that returned data.
  pub chunks_read: u64,
  pub packets_dispatched: u64,
  pub packets_drained: u64,
}

/// Pull-based packet reader over a fixed-size-packet byte stream.
///
/// Reads the source in large chunks, decodes every packet of a chunk
/// concurrently, and yields the results one at a time in stream order.
/// Iterate it, or call [`Iterator::next`] directly:
///
/// ```text
///   Some(Ok(packet))   ← next packet in stream order
///   Some(Err(e))       ← e.is_fatal(): refill failed, nothing queued
///                        otherwise: this packet failed, keep going
///   None               ← source exhausted
/// ```
///
/// The buffer alternates between two states. While decode tasks are
/// pending it drains them head-first, blocking only on the head task.
/// Once the queue is empty, the next call reads one chunk and dispatches
/// it. Nothing is read ahead of that one chunk.
///
/// ```text
///   Refilling ──(chunk read, tasks queued)──► Draining
///       ▲                                        │
///       └──────────(last task drained)───────────┘
/// ```
///
/// A fatal error leaves the buffer in `Refilling`; calling `next` again
/// retries the read. `None` is likewise returned again on every later
/// call once the source is dry.
///
/// `next` blocks the calling thread. Do not call it from inside an async
/// task; wrap the buffer in `spawn_blocking` instead.
///
/// # Example
///
/// ```rust,no_run
/// use std::fs::File;
/// use tsbuf_buffer::{BufferConfig, StreamBuffer};
/// use tsbuf_types::TsPacketDecoder;
///
/// let file = File::open("capture.ts").unwrap();
/// let buffer = StreamBuffer::new(file, TsPacketDecoder, &BufferConfig::default()).unwrap();
/// for packet in buffer {
///     match packet {
///         Ok(packet) => println!("pid {:#06x}", packet.header.pid),
///         Err(e) if e.is_fatal() => break,
///         Err(e) => eprintln!("skipping: {e}"),
///     }
/// }
/// ```
pub struct StreamBuffer<S, D: PacketDecoder> {
  source: S,
  packet_size: usize,
  detection: Option<Detection>,
  reader: ChunkReader,
  queue: DecodeQueue<D>,
  stats: BufferStats,
}

impl<S: ByteSource, D: PacketDecoder> StreamBuffer<S, D> {
  /// Build a buffer with its own decode pool.
  ///
  /// When `config.packet_size` is 0 the packet size is detected from the
  /// head of `source` first, which also resynchronizes the source to a
  /// packet boundary.
  ///
  /// # Errors
  ///
  /// - [`BufferError::InvalidConfig`] for a bad configuration.
  /// - [`BufferError::Format`] if auto-detection rejects the stream.
  /// - [`BufferError::Io`] if the source or the pool fails to start.
  pub fn new(source: S, decoder: D, config: &BufferConfig) -> Result<Self, BufferError> {
    config.validate()?;
    let pool = DecodePool::new(config.workers)
      .map_err(|e| BufferError::io("starting decode pool failed", e))?;
    Self::with_pool(source, decoder, config, pool)
  }

  /// Build a buffer that decodes on `pool`. `config.workers` is ignored.
  ///
  /// # Errors
  ///
  /// Same as [`new`](Self::new), minus pool start-up.
  pub fn with_pool(
    mut source: S,
    decoder: D,
    config: &BufferConfig,
    pool: DecodePool,
  ) -> Result<Self, BufferError> {
    config.validate_chunk()?;

    let detection = if config.packet_size == 0 {
      Some(SyncDetector::new().detect(&mut source)?)
    } else {
      None
    };
    let packet_size = detection.map_or(config.packet_size, |d| d.packet_size);
    let chunk_len = config.chunk_len(packet_size)?;

    Ok(Self {
      source,
      packet_size,
      detection,
      reader: ChunkReader::new(chunk_len),
      queue: DecodeQueue::new(decoder, pool),
      stats: BufferStats::default(),
    })
  }

  /// The fixed packet size, given or detected.
  #[must_use]
  pub fn packet_size(&self) -> usize {
    self.packet_size
  }

  /// How the packet size was found, if it was auto-detected.
  #[must_use]
  pub fn detection(&self) -> Option<Detection> {
    self.detection
  }

  /// Bytes per refill.
  #[must_use]
  pub fn chunk_len(&self) -> usize {
    self.reader.capacity()
  }

  /// Decode tasks dispatched and not yet drained.
  #[must_use]
  pub fn pending(&self) -> usize {
    self.queue.len()
  }

  #[must_use]
  pub fn stats(&self) -> BufferStats {
    self.stats
  }

  /// Borrow the underlying source.
  #[must_use]
  pub fn get_ref(&self) -> &S {
    &self.source
  }

  /// Read one chunk and queue its packets. Returns the number of tasks
  /// queued; 0 means end of stream.
  fn refill(&mut self) -> Result<usize, BufferError> {
    let Some(chunk) = self.reader.fill(&mut self.source)? else {
      return Ok(0);
    };

    let read = chunk.len();
    let queued = self.queue.dispatch(chunk, self.packet_size);
    log::trace!("refill read {read} bytes, dispatched {queued} packets");

    self.stats.bytes_read += read as u64;
    self.stats.chunks_read += 1;
    self.stats.packets_dispatched += queued as u64;
    Ok(queued)
  }
}

impl<S: ByteSource, D: PacketDecoder> Iterator for StreamBuffer<S, D> {
  type Item = Result<D::Packet, BufferError>;

  /// Return the next packet in stream order, a per-packet error, a fatal
  /// refill error, or `None` at end of stream.
  fn next(&mut self) -> Option<Self::Item> {
    loop {
      if let Some(outcome) = self.queue.pop() {
        self.stats.packets_drained += 1;
        return Some(outcome);
      }

      match self.refill() {
        Ok(0) => return None,
        Ok(_) => {}
        Err(e) => return Some(Err(e)),
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::io::{self, Cursor, Read};
  use tsbuf_types::{PacketError, TsPacketDecoder};
  use tsbuf_wire::{Resync, Sequential, sync::SYNC_BYTE};

  /// `count` packets of `size` bytes, tagged with their index in byte 4.
  fn stream(size: usize, count: usize) -> Vec<u8> {
    let mut out = Vec::with_capacity(size * count);
    for i in 0..count {
      let mut packet = vec![0u8; size];
      packet[0] = SYNC_BYTE;
      packet[3] = 0x10;
      packet[4] = i as u8;
      out.extend_from_slice(&packet);
    }
    out
  }

  /// Reads the tag back out of byte 4.
  struct Tag;

  impl PacketDecoder for Tag {
    type Packet = u8;
    type Error = PacketError;

    fn decode(&self, bytes: &[u8]) -> Result<u8, PacketError> {
      if bytes[0] != SYNC_BYTE {
        return Err(PacketError::MissingSync { found: bytes[0] });
      }
      Ok(bytes[4])
    }
  }

  fn config(chunk_packets: usize) -> BufferConfig {
    BufferConfig::default()
      .with_chunk_packets(chunk_packets)
      .with_workers(2)
  }

  #[test]
  fn yields_all_packets_then_none() {
    let data = stream(188, 5);
    let buffer = StreamBuffer::new(Cursor::new(data), Tag, &config(2)).unwrap();
    assert_eq!(buffer.packet_size(), 188);
    assert_eq!(buffer.chunk_len(), 376);

    let tags: Vec<u8> = buffer.map(Result::unwrap).collect();
    assert_eq!(tags, vec![0, 1, 2, 3, 4]);
  }

  #[test]
  fn none_repeats_after_exhaustion() {
    let data = stream(188, 2);
    let mut buffer = StreamBuffer::new(Cursor::new(data), Tag, &config(10)).unwrap();
    assert_eq!(buffer.next().unwrap().unwrap(), 0);
    assert_eq!(buffer.next().unwrap().unwrap(), 1);
    assert!(buffer.next().is_none());
    assert!(buffer.next().is_none());
  }

  #[test]
  fn pending_matches_chunk_then_shrinks() {
    let data = stream(188, 7);
    let mut buffer = StreamBuffer::new(Cursor::new(data), Tag, &config(3)).unwrap();
    assert_eq!(buffer.pending(), 0);

    buffer.next().unwrap().unwrap();
    assert_eq!(buffer.pending(), 2);
    buffer.next().unwrap().unwrap();
    assert_eq!(buffer.pending(), 1);
    buffer.next().unwrap().unwrap();
    assert_eq!(buffer.pending(), 0);

    buffer.next().unwrap().unwrap();
    assert_eq!(buffer.pending(), 2);

    let stats = buffer.stats();
    assert_eq!(stats.chunks_read, 2);
    assert_eq!(stats.packets_dispatched, 6);
    assert_eq!(stats.packets_drained, 4);
    assert_eq!(stats.bytes_read, 6 * 188);
  }

  #[test]
  fn explicit_packet_size_skips_detection() {
    // No leading sync byte, so detection would fail.
    let mut data = stream(188, 2);
    data[0] = 0;
    let mut buffer =
      StreamBuffer::new(Cursor::new(data), Tag, &config(4).with_packet_size(188)).unwrap();
    assert!(buffer.detection().is_none());
    assert!(buffer.next().unwrap().is_err());
    assert_eq!(buffer.next().unwrap().unwrap(), 1);
  }

  #[test]
  fn seekable_source_starts_at_first_packet() {
    let data = stream(188, 3);
    let mut buffer = StreamBuffer::new(Cursor::new(data), Tag, &config(4)).unwrap();
    assert_eq!(buffer.detection().unwrap().resync, Resync::Rewound);
    assert_eq!(buffer.next().unwrap().unwrap(), 0);
  }

  #[test]
  fn forward_only_source_starts_at_packet_two() {
    let data = stream(188, 5);
    let buffer = StreamBuffer::new(Sequential(&data[..]), Tag, &config(4)).unwrap();
    assert_eq!(buffer.detection().unwrap().resync, Resync::Skipped(183));

    let tags: Vec<u8> = buffer.map(Result::unwrap).collect();
    assert_eq!(tags, vec![2, 3, 4]);
  }

  #[test]
  fn trailing_partial_packet_is_reported_last() {
    let mut data = stream(188, 3);
    data.truncate(2 * 188 + 50);
    let mut buffer =
      StreamBuffer::new(Cursor::new(data), Tag, &config(8).with_packet_size(188)).unwrap();

    assert_eq!(buffer.next().unwrap().unwrap(), 0);
    assert_eq!(buffer.next().unwrap().unwrap(), 1);
    assert!(matches!(
      buffer.next().unwrap(),
      Err(BufferError::TruncatedPacket {
        index: 2,
        len: 50,
        expected: 188
      })
    ));
    assert!(buffer.next().is_none());
  }

  #[test]
  fn format_errors_fail_construction() {
    let mut data = stream(188, 3);
    data[0] = 0x00;
    let result = StreamBuffer::new(Cursor::new(data), Tag, &config(4));
    assert!(matches!(
      result,
      Err(BufferError::Format(tsbuf_wire::FormatError::NotSyncAligned { found: 0 }))
    ));
  }

  #[test]
  fn refill_failure_is_fatal_and_retried() {
    /// Serves `good` bytes, then errors on every read.
    struct Flaky {
      data: Vec<u8>,
      pos: usize,
      good: usize,
    }

    impl Read for Flaky {
      fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.pos >= self.good {
          return Err(io::Error::other("disk on fire"));
        }
        let n = buf.len().min(self.good - self.pos);
        buf[..n].copy_from_slice(&self.data[self.pos..self.pos + n]);
        self.pos += n;
        Ok(n)
      }
    }

    impl ByteSource for Flaky {}

    // First chunk (2 packets) is clean; the second would need byte 377.
    let source = Flaky {
      data: stream(188, 4),
      pos: 0,
      good: 2 * 188,
    };
    let mut buffer = StreamBuffer::new(source, Tag, &config(2).with_packet_size(188)).unwrap();

    assert_eq!(buffer.next().unwrap().unwrap(), 0);
    assert_eq!(buffer.next().unwrap().unwrap(), 1);

    let err = buffer.next().unwrap().unwrap_err();
    assert!(err.is_fatal());
    assert_eq!(buffer.pending(), 0);

    let again = buffer.next().unwrap().unwrap_err();
    assert!(matches!(again, BufferError::Io { .. }));
  }

  #[test]
  fn decodes_real_headers() {
    let data = stream(188, 4);
    let buffer = StreamBuffer::new(Cursor::new(data), TsPacketDecoder, &config(3)).unwrap();
    let packets: Vec<_> = buffer.map(Result::unwrap).collect();
    assert_eq!(packets.len(), 4);
    assert!(packets.iter().all(|p| p.header.pid == 0 && p.payload.len() == 184));
    assert_eq!(packets[3].payload[0], 3);
  }

  #[test]
  fn with_pool_rejects_zero_chunk() {
    let runtime = tokio::runtime::Runtime::new().unwrap();
    let pool = DecodePool::from_handle(runtime.handle().clone());
    let config = BufferConfig::default().with_chunk_packets(0);
    let result = StreamBuffer::with_pool(Cursor::new(stream(188, 2)), Tag, &config, pool);
    assert!(matches!(
      result,
      Err(BufferError::InvalidConfig {
        reason: "chunk_packets must be at least 1"
      })
    ));
  }

  proptest::proptest! {
    #![proptest_config(proptest::prelude::ProptestConfig::with_cases(48))]

    /// Right after a refill, every packet of the chunk is queued:
    /// ⌈read / packet_size⌉ tasks, one of which the same call drains.
    #[test]
    fn refill_queues_one_task_per_packet(
      len in 0usize..3_000,
      packet_size in 188usize..=204,
      chunk_packets in 1usize..8,
    ) {
      let mut data = stream(packet_size, len.div_ceil(packet_size));
      data.truncate(len);
      let config = config(chunk_packets).with_packet_size(packet_size);
      let mut buffer = StreamBuffer::new(Cursor::new(data), Tag, &config).unwrap();

      let first = buffer.next();
      let read = len.min(packet_size * chunk_packets);
      let queued = read.div_ceil(packet_size);
      proptest::prop_assert_eq!(first.is_none(), len == 0);
      proptest::prop_assert_eq!(buffer.stats().packets_dispatched, queued as u64);
      proptest::prop_assert_eq!(buffer.pending(), queued.saturating_sub(1));
    }
  }
}
