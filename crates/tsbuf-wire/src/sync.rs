use std::io::Read;

use crate::error::FormatError;
use crate::source::{ByteSource, read_full};

/// The reserved byte that starts every packet.
pub const SYNC_BYTE: u8 = 0x47;

/// Smallest packet the format allows. Also the first index at which a
/// second sync byte is accepted during detection.
pub const MIN_PACKET_SIZE: usize = 188;

/// Largest packet size the detector can measure (188 plus a 16-byte
/// Reed-Solomon trailer).
pub const MAX_PACKET_SIZE: usize = 204;

/// Bytes read from the head of the stream on the first probe.
pub const PROBE_LEN: usize = 193;

/// Probe length after extension: just enough to see the second sync
/// byte of a [`MAX_PACKET_SIZE`] packet.
pub const EXTENDED_PROBE_LEN: usize = MAX_PACKET_SIZE + 1;

/// How the detector put the source back on a packet boundary.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Resync {
    /// The source was seeked back to offset 0; the probe bytes will be
    /// read again as part of the first chunk.
    Rewound,
    /// The source cannot seek, so this many extra bytes were discarded
    /// to land on the next packet start after the probe.
    Skipped(usize),
}

/// Result of a successful packet-size detection.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Detection {
    pub packet_size: usize,
    /// Number of bytes the probe consumed before resync.
    pub probe_len: usize,
    pub resync: Resync,
}

/// Measures the packet size of a stream from its first few hundred bytes.
///
/// The stream must begin with [`SYNC_BYTE`]. The packet size is the index
/// of the next sync byte at or after [`MIN_PACKET_SIZE`]:
///
/// ```text
///   offset 0                188    193          205
///   ┌──┬─────────────────────┬──────┬────────────┐
///   │47│ ...packet body...   │47?   │ (extended) │
///   └──┴─────────────────────┴──────┴────────────┘
///        first probe: [0, 193)   second: [193, 205)
/// ```
///
/// The first probe covers sizes 188 to 192. If it finds nothing, the probe
/// is extended to [`EXTENDED_PROBE_LEN`] bytes so 204-byte packets are
/// found too.
///
/// After detection the source is resynchronized. A seekable source goes
/// back to offset 0. A forward-only source skips
/// `packet_size - (probe_len - packet_size)` bytes, which lands on the
/// first packet start after the probe (offset `2 * packet_size`). The
/// first two packets of a forward-only stream are therefore not seen by
/// the reader.
#[derive(Clone, Copy, Debug, Default)]
pub struct SyncDetector;

impl SyncDetector {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Probe `source` and return the packet size plus how the source was
    /// resynchronized.
    ///
    /// # Errors
    ///
    /// - [`FormatError::MissingLeadingSync`] if fewer than [`PROBE_LEN`]
    ///   bytes are available. A probe read that fails outright is an
    ///   I/O error, not a missing sync byte, and reports `Io` instead.
    /// - [`FormatError::NotSyncAligned`] if byte 0 is not [`SYNC_BYTE`].
    /// - [`FormatError::NoSecondSyncMarker`] if no second sync byte shows
    ///   up in the (extended) probe window.
    /// - [`FormatError::Io`] if reading, seeking, or the resync skip fails.
    pub fn detect<S: ByteSource + ?Sized>(&self, source: &mut S) -> Result<Detection, FormatError> {
        let mut probe = [0u8; EXTENDED_PROBE_LEN];

        let got = read_full(source, &mut probe[..PROBE_LEN]).map_err(|e| {
            FormatError::io(format!("reading first {PROBE_LEN} bytes failed"), e)
        })?;
        if got < PROBE_LEN {
            return Err(FormatError::MissingLeadingSync {
                needed: PROBE_LEN,
                available: got,
            });
        }

        if probe[0] != SYNC_BYTE {
            return Err(FormatError::NotSyncAligned { found: probe[0] });
        }

        let mut window = PROBE_LEN;
        let packet_size = if let Some(size) = second_sync(&probe[..window]) {
            size
        } else {
            let extra = read_full(source, &mut probe[PROBE_LEN..]).map_err(|e| {
                FormatError::io(
                    format!("extending probe to {EXTENDED_PROBE_LEN} bytes failed"),
                    e,
                )
            })?;
            window += extra;
            second_sync(&probe[..window]).ok_or(FormatError::NoSecondSyncMarker { window })?
        };

        let resync = resync(source, packet_size, window)?;
        log::debug!("detected packet size {packet_size} from {window} probe bytes ({resync:?})");

        Ok(Detection {
            packet_size,
            probe_len: window,
            resync,
        })
    }
}

/// Index of the first sync byte at or after [`MIN_PACKET_SIZE`].
fn second_sync(probe: &[u8]) -> Option<usize> {
    probe
        .iter()
        .enumerate()
        .skip(MIN_PACKET_SIZE)
        .find_map(|(idx, &b)| (b == SYNC_BYTE).then_some(idx))
}

fn resync<S: ByteSource + ?Sized>(
    source: &mut S,
    packet_size: usize,
    probe_len: usize,
) -> Result<Resync, FormatError> {
    let rewound = source
        .rewind_to_start()
        .map_err(|e| FormatError::io("seeking to 0 failed", e))?;
    if rewound {
        return Ok(Resync::Rewound);
    }

    // probe_len < 2 * packet_size always holds, so this lands inside packet 2.
    let skip = packet_size - (probe_len - packet_size);
    let mut discard = vec![0u8; skip];
    source
        .read_exact(&mut discard)
        .map_err(|e| FormatError::io(format!("reading {skip} bytes to sync reader failed"), e))?;
    Ok(Resync::Skipped(skip))
}
