/// Errors produced while turning one packet's bytes into a [`TsPacket`].
///
/// These are per-packet: a `PacketError` for packet *k* says nothing
/// about packet *k + 1*. The buffering layer hands them back to the
/// caller on the `next()` call that drains packet *k*.
///
/// [`TsPacket`]: crate::packet::TsPacket
#[derive(Debug, thiserror::Error)]
pub enum PacketError {
    /// Fewer bytes than the 188-byte minimum.
    #[error("packet too short: {len} bytes, need at least 188")]
    TooShort { len: usize },

    /// The packet does not begin with the sync byte.
    #[error("packet does not start with sync byte: found {found:#04X}")]
    MissingSync { found: u8 },

    /// Adaptation field control `0b00` is reserved by the format;
    /// such packets carry nothing a decoder may interpret.
    #[error("reserved adaptation field control on PID {pid:#06X}")]
    ReservedAdaptationFieldControl { pid: u16 },

    /// The adaptation field claims more bytes than the packet body holds.
    #[error("adaptation field length {len} overflows the 184-byte packet body")]
    AdaptationFieldOverflow { len: u8 },
}
