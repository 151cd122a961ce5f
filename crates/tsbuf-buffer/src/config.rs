use crate::error::BufferError;

/// Packets per chunk when the caller does not say otherwise.
pub const DEFAULT_CHUNK_PACKETS: usize = 10_000;

/// Configuration for a [`StreamBuffer`](crate::StreamBuffer).
///
/// ```text
/// ┌───────────────┬─────────────────────────────────────────────────┐
/// │ Field         │ Purpose                                         │
/// ├───────────────┼─────────────────────────────────────────────────┤
/// │ packet_size   │ Fixed packet size in bytes; 0 = auto-detect     │
/// │ chunk_packets │ Packets per bulk read (chunk = size × packets)  │
/// │ workers       │ Threads decoding packets concurrently           │
/// └───────────────┴─────────────────────────────────────────────────┘
/// ```
///
/// `chunk_packets` also bounds how many decode tasks exist at once:
/// every packet of a chunk is dispatched on refill, and no new chunk is
/// read until all of them have been drained. `workers` bounds how many
/// of those tasks run at the same moment.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BufferConfig {
    /// Packet size in bytes. `0` probes the stream head for sync bytes.
    pub packet_size: usize,

    /// Number of packets read per refill.
    pub chunk_packets: usize,

    /// Size of the decode worker pool.
    pub workers: usize,
}

impl Default for BufferConfig {
    /// Auto-detected packet size, 10 000 packets per chunk, one worker
    /// per logical CPU.
    fn default() -> Self {
        Self {
            packet_size: 0,
            chunk_packets: DEFAULT_CHUNK_PACKETS,
            workers: num_cpus::get(),
        }
    }
}

impl BufferConfig {
    #[must_use]
    pub fn with_packet_size(mut self, packet_size: usize) -> Self {
        self.packet_size = packet_size;
        self
    }

    #[must_use]
    pub fn with_chunk_packets(mut self, chunk_packets: usize) -> Self {
        self.chunk_packets = chunk_packets;
        self
    }

    #[must_use]
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    /// Check the fields that do not depend on the stream.
    ///
    /// # Errors
    ///
    /// [`BufferError::InvalidConfig`] when `chunk_packets` or `workers`
    /// is zero.
    pub fn validate(&self) -> Result<(), BufferError> {
        self.validate_chunk()?;
        if self.workers == 0 {
            return Err(BufferError::InvalidConfig {
                reason: "workers must be at least 1",
            });
        }
        Ok(())
    }

    /// Check `chunk_packets` alone. Buffers built on a borrowed pool
    /// ignore `workers`, so this is all they validate.
    ///
    /// # Errors
    ///
    /// [`BufferError::InvalidConfig`] when `chunk_packets` is zero.
    pub fn validate_chunk(&self) -> Result<(), BufferError> {
        if self.chunk_packets == 0 {
            return Err(BufferError::InvalidConfig {
                reason: "chunk_packets must be at least 1",
            });
        }
        Ok(())
    }

    /// Bytes per chunk for a known packet size.
    ///
    /// # Errors
    ///
    /// [`BufferError::InvalidConfig`] if the product overflows `usize`.
    pub fn chunk_len(&self, packet_size: usize) -> Result<usize, BufferError> {
        packet_size
            .checked_mul(self.chunk_packets)
            .ok_or(BufferError::InvalidConfig {
                reason: "packet_size * chunk_packets overflows",
            })
    }
}
