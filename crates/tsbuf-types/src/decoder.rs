use crate::error::PacketError;
use crate::packet::TsPacket;

/// Turns one packet's bytes into a structured value.
///
/// This is the seam between framing and interpretation. The buffering
/// layer calls `decode` from worker threads, one call per packet, with a
/// slice it owns for the duration of the call. Implementations must be
/// pure with respect to that slice: nothing may be kept from it after
/// `decode` returns (copy what you need into `Packet`).
///
/// Each call is independent. A decoder must not assume calls arrive in
/// stream order or on the same thread; the buffer restores order on its
/// own.
pub trait PacketDecoder: Send + Sync + 'static {
    type Packet: Send + 'static;
    type Error: std::error::Error + Send + Sync + 'static;

    /// Decode one packet.
    ///
    /// # Errors
    ///
    /// Whatever the format considers malformed. The error is reported
    /// for this packet only.
    fn decode(&self, bytes: &[u8]) -> Result<Self::Packet, Self::Error>;
}

/// Reference decoder for transport stream packets.
///
/// Parses the 4-byte header and locates the adaptation field and
/// payload; see [`TsPacket::decode`].
#[derive(Clone, Copy, Debug, Default)]
pub struct TsPacketDecoder;

impl PacketDecoder for TsPacketDecoder {
    type Packet = TsPacket;
    type Error = PacketError;

    fn decode(&self, bytes: &[u8]) -> Result<TsPacket, PacketError> {
        TsPacket::decode(bytes)
    }
}
