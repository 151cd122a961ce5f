//! Shared fixtures for the integration suite and the benches.
//!
//! Streams built here are valid transport streams: every packet starts
//! with the sync byte, carries PID [`FIXTURE_PID`] with an advancing
//! continuity counter, and stores its own index as a big-endian `u32` at
//! the start of its payload. No byte after the header ever equals
//! `0x47` within the first 205 bytes, so auto-detection always finds the
//! real boundary.

use std::io::{self, Cursor, Read};
use std::time::Duration;

use tsbuf_types::{PacketDecoder, PacketError, TsPacket};
use tsbuf_wire::ByteSource;
use tsbuf_wire::sync::{MIN_PACKET_SIZE, SYNC_BYTE};

pub const FIXTURE_PID: u16 = 0x0100;

/// Build `count` packets of `packet_size` bytes (188 or more).
#[must_use]
pub fn ts_stream(packet_size: usize, count: u32) -> Vec<u8> {
    assert!(packet_size >= MIN_PACKET_SIZE);
    let mut out = Vec::with_capacity(packet_size * count as usize);
    for index in 0..count {
        out.extend_from_slice(&ts_packet(packet_size, index));
    }
    out
}

/// One fixture packet.
#[must_use]
pub fn ts_packet(packet_size: usize, index: u32) -> Vec<u8> {
    let mut packet = vec![0u8; packet_size];
    packet[0] = SYNC_BYTE;
    packet[1] = (FIXTURE_PID >> 8) as u8;
    packet[2] = (FIXTURE_PID & 0xFF) as u8;
    // Payload only, continuity counter = index mod 16.
    packet[3] = 0x10 | (index & 0x0F) as u8;
    packet[4..8].copy_from_slice(&index.to_be_bytes());
    packet
}

/// Read the fixture index back out of a decoded packet.
#[must_use]
pub fn tag_of(packet: &TsPacket) -> u32 {
    u32::from_be_bytes([
        packet.payload[0],
        packet.payload[1],
        packet.payload[2],
        packet.payload[3],
    ])
}

/// Decodes only the fixture index; optionally sleeps per packet and
/// fails on one chosen index.
#[derive(Clone, Debug, Default)]
pub struct TagDecoder {
    /// Sleep `delays[index % len]` microseconds before answering.
    pub delays: Vec<u64>,
    pub fail_on: Option<u32>,
}

impl PacketDecoder for TagDecoder {
    type Packet = u32;
    type Error = PacketError;

    fn decode(&self, bytes: &[u8]) -> Result<u32, PacketError> {
        if bytes[0] != SYNC_BYTE {
            return Err(PacketError::MissingSync { found: bytes[0] });
        }
        let tag = u32::from_be_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]);
        if !self.delays.is_empty() {
            let delay = self.delays[tag as usize % self.delays.len()];
            std::thread::sleep(Duration::from_micros(delay));
        }
        if self.fail_on == Some(tag) {
            return Err(PacketError::MissingSync { found: bytes[0] });
        }
        Ok(tag)
    }
}

/// In-memory source that can be made forward-only and can fail every
/// read once `fail_at` bytes have been served.
///
/// Tracks the absolute offset of every read so tests can assert where
/// chunk reads begin.
pub struct ScriptedSource {
    inner: Cursor<Vec<u8>>,
    seekable: bool,
    fail_at: Option<u64>,
    /// Absolute offset at the start of each successful non-empty read.
    pub read_offsets: Vec<u64>,
}

impl ScriptedSource {
    #[must_use]
    pub fn seekable(data: Vec<u8>) -> Self {
        Self {
            inner: Cursor::new(data),
            seekable: true,
            fail_at: None,
            read_offsets: Vec::new(),
        }
    }

    #[must_use]
    pub fn forward_only(data: Vec<u8>) -> Self {
        Self {
            seekable: false,
            ..Self::seekable(data)
        }
    }

    /// Serve at most `m` bytes, then fail every read.
    #[must_use]
    pub fn failing_after(mut self, m: u64) -> Self {
        self.fail_at = Some(m);
        self
    }

    /// Current absolute read offset.
    #[must_use]
    pub fn position(&self) -> u64 {
        self.inner.position()
    }
}

impl Read for ScriptedSource {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let pos = self.inner.position();
        let mut want = buf.len();
        if let Some(limit) = self.fail_at {
            if pos >= limit {
                return Err(io::Error::new(io::ErrorKind::BrokenPipe, "scripted failure"));
            }
            want = want.min(usize::try_from(limit - pos).unwrap_or(usize::MAX));
        }
        let n = self.inner.read(&mut buf[..want])?;
        if n > 0 {
            self.read_offsets.push(pos);
        }
        Ok(n)
    }
}

impl ByteSource for ScriptedSource {
    fn rewind_to_start(&mut self) -> io::Result<bool> {
        if !self.seekable {
            return Ok(false);
        }
        self.inner.set_position(0);
        Ok(true)
    }
}
