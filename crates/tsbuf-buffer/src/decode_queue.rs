use std::collections::VecDeque;
use std::sync::Arc;

use bytes::Bytes;
use tokio::sync::oneshot;
use tsbuf_types::PacketDecoder;

use crate::error::BufferError;
use crate::pool::DecodePool;

/// One packet's decode, in flight or finished.
///
/// Holds the receiving half of a one-shot channel. The worker that owns
/// the sending half writes the outcome exactly once; [`wait`](Self::wait)
/// blocks until it has.
pub struct DecodeTask<P> {
    index: u64,
    outcome: oneshot::Receiver<Result<P, BufferError>>,
}

impl<P> DecodeTask<P> {
    /// Zero-based stream position of the packet.
    #[must_use]
    pub fn index(&self) -> u64 {
        self.index
    }

    /// Block until the worker reports, then return its outcome.
    ///
    /// # Errors
    ///
    /// The decode's own per-packet error, or [`BufferError::WorkerLost`]
    /// if the worker went away without reporting.
    ///
    /// # Panics
    ///
    /// Panics when called from inside an async execution context.
    pub fn wait(self) -> Result<P, BufferError> {
        let index = self.index;
        self.outcome
            .blocking_recv()
            .unwrap_or_else(|_| Err(BufferError::WorkerLost { index }))
    }
}

/// Fans a chunk out into per-packet decode tasks and hands results back
/// in stream order.
///
/// ```text
///   chunk ─┬─ copy[0] ──► worker ──► outcome ─┐
///          ├─ copy[1] ──► worker ──► outcome ─┤  pending (FIFO)
///          └─ copy[k] ──► worker ──► outcome ─┘  pop_front → caller
/// ```
///
/// A task is queued before its job is submitted, so queue order is
/// stream order no matter which worker finishes first. Every job gets a
/// private copy of its bytes; the chunk itself can be overwritten the
/// moment [`dispatch`](Self::dispatch) returns.
pub struct DecodeQueue<D: PacketDecoder> {
    decoder: Arc<D>,
    pool: DecodePool,
    pending: VecDeque<DecodeTask<D::Packet>>,
    next_index: u64,
}

impl<D: PacketDecoder> DecodeQueue<D> {
    #[must_use]
    pub fn new(decoder: D, pool: DecodePool) -> Self {
        Self {
            decoder: Arc::new(decoder),
            pool,
            pending: VecDeque::new(),
            next_index: 0,
        }
    }

    /// Split `chunk` into `packet_size` slices and start one decode per
    /// slice. Returns the number of tasks queued, `⌈len / packet_size⌉`.
    ///
    /// A final slice shorter than `packet_size` is still queued; its
    /// outcome is [`BufferError::TruncatedPacket`] and the decoder never
    /// sees it.
    ///
    /// # Panics
    ///
    /// Panics if `packet_size` is 0.
    pub fn dispatch(&mut self, chunk: &[u8], packet_size: usize) -> usize {
        let mut queued = 0;
        for slice in chunk.chunks(packet_size) {
            let index = self.next_index;
            self.next_index += 1;

            let (tx, rx) = oneshot::channel();
            self.pending.push_back(DecodeTask { index, outcome: rx });

            if slice.len() < packet_size {
                log::warn!(
                    "packet {index} truncated at end of stream ({} of {packet_size} bytes)",
                    slice.len()
                );
            }

            let bytes = Bytes::copy_from_slice(slice);
            let decoder = Arc::clone(&self.decoder);
            self.pool.execute(move || {
                // The receiver may already be gone if the buffer was dropped.
                let _ = tx.send(decode_one(decoder.as_ref(), index, &bytes, packet_size));
            });
            queued += 1;
        }
        queued
    }

    /// Wait for the oldest task and return its outcome, or `None` if no
    /// task is pending.
    pub fn pop(&mut self) -> Option<Result<D::Packet, BufferError>> {
        self.pending.pop_front().map(DecodeTask::wait)
    }

    /// Number of tasks dispatched but not yet drained.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

fn decode_one<D: PacketDecoder>(
    decoder: &D,
    index: u64,
    bytes: &[u8],
    packet_size: usize,
) -> Result<D::Packet, BufferError> {
    if bytes.len() < packet_size {
        return Err(BufferError::TruncatedPacket {
            index,
            len: bytes.len(),
            expected: packet_size,
        });
    }
    decoder.decode(bytes).map_err(|e| BufferError::Decode {
        index,
        source: Box::new(e),
    })
}
