use tsbuf_wire::sync::{MIN_PACKET_SIZE, SYNC_BYTE};

use crate::error::PacketError;

/// Size of the fixed packet header in bytes.
pub const HEADER_SIZE: usize = 4;

/// Stuffing packets are sent on this PID and carry no data.
pub const NULL_PID: u16 = 0x1FFF;

/// The two-bit field telling whether an adaptation field, a payload,
/// or both follow the header.
///
/// ```text
/// ┌──────┬──────────────────────┐
/// │ Bits │ Variant              │
/// ├──────┼──────────────────────┤
/// │ 00   │ Reserved             │
/// │ 01   │ PayloadOnly          │
/// │ 10   │ AdaptationOnly       │
/// │ 11   │ AdaptationAndPayload │
/// └──────┴──────────────────────┘
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AdaptationFieldControl {
    Reserved,
    PayloadOnly,
    AdaptationOnly,
    AdaptationAndPayload,
}

impl AdaptationFieldControl {
    /// Build from the low two bits of `raw`.
    #[must_use]
    pub fn from_bits(raw: u8) -> Self {
        match raw & 0b11 {
            0b01 => Self::PayloadOnly,
            0b10 => Self::AdaptationOnly,
            0b11 => Self::AdaptationAndPayload,
            _ => Self::Reserved,
        }
    }

    #[must_use]
    pub fn has_adaptation_field(self) -> bool {
        matches!(self, Self::AdaptationOnly | Self::AdaptationAndPayload)
    }

    #[must_use]
    pub fn has_payload(self) -> bool {
        matches!(self, Self::PayloadOnly | Self::AdaptationAndPayload)
    }
}

/// The 4-byte packet header.
///
/// ```text
///  byte 0    byte 1                    byte 2     byte 3
/// ┌────────┬─┬─┬─┬──────────────────┬──────────┬───┬───┬──────┐
/// │ 0x47   │E│S│P│ PID (13 bits)    ...        │SC │AFC│ CC   │
/// └────────┴─┴─┴─┴──────────────────┴──────────┴───┴───┴──────┘
///   E = transport error, S = payload unit start, P = priority,
///   SC = scrambling control, AFC = adaptation field control,
///   CC = continuity counter
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PacketHeader {
    pub transport_error: bool,
    pub payload_unit_start: bool,
    pub transport_priority: bool,
    pub pid: u16,
    pub scrambling_control: u8,
    pub adaptation_field_control: AdaptationFieldControl,
    pub continuity_counter: u8,
}

impl PacketHeader {
    /// Parse the header from the first [`HEADER_SIZE`] bytes of `buf`.
    ///
    /// # Errors
    ///
    /// - [`PacketError::TooShort`] if `buf` is shorter than the header.
    /// - [`PacketError::MissingSync`] if byte 0 is not the sync byte.
    pub fn read_from(buf: &[u8]) -> Result<Self, PacketError> {
        if buf.len() < HEADER_SIZE {
            return Err(PacketError::TooShort { len: buf.len() });
        }
        if buf[0] != SYNC_BYTE {
            return Err(PacketError::MissingSync { found: buf[0] });
        }

        Ok(Self {
            transport_error: buf[1] & 0x80 != 0,
            payload_unit_start: buf[1] & 0x40 != 0,
            transport_priority: buf[1] & 0x20 != 0,
            pid: (u16::from(buf[1] & 0x1F) << 8) | u16::from(buf[2]),
            scrambling_control: buf[3] >> 6,
            adaptation_field_control: AdaptationFieldControl::from_bits(buf[3] >> 4),
            continuity_counter: buf[3] & 0x0F,
        })
    }

    #[must_use]
    pub fn is_null(&self) -> bool {
        self.pid == NULL_PID
    }
}

/// One decoded packet.
///
/// Only the first 188 bytes are interpreted. Anything after them (the
/// 4 to 16 trailing bytes of 192- or 204-byte formats) is counted in
/// `trailer_len` and otherwise ignored.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TsPacket {
    pub header: PacketHeader,
    /// Length byte of the adaptation field, when one is present.
    pub adaptation_field_len: Option<u8>,
    pub payload: Vec<u8>,
    pub trailer_len: usize,
}

impl TsPacket {
    /// Decode a packet of at least [`MIN_PACKET_SIZE`] bytes.
    ///
    /// # Errors
    ///
    /// - [`PacketError::TooShort`] for fewer than 188 bytes.
    /// - [`PacketError::MissingSync`] when byte 0 is not 0x47.
    /// - [`PacketError::ReservedAdaptationFieldControl`] for AFC `0b00`.
    /// - [`PacketError::AdaptationFieldOverflow`] when the adaptation
    ///   field runs past the end of the 188-byte body.
    pub fn decode(buf: &[u8]) -> Result<Self, PacketError> {
        if buf.len() < MIN_PACKET_SIZE {
            return Err(PacketError::TooShort { len: buf.len() });
        }
        let header = PacketHeader::read_from(buf)?;
        let afc = header.adaptation_field_control;
        if afc == AdaptationFieldControl::Reserved {
            return Err(PacketError::ReservedAdaptationFieldControl { pid: header.pid });
        }

        let body = &buf[HEADER_SIZE..MIN_PACKET_SIZE];
        let mut payload_start = 0;
        let mut adaptation_field_len = None;

        if afc.has_adaptation_field() {
            let len = body[0];
            if 1 + usize::from(len) > body.len() {
                return Err(PacketError::AdaptationFieldOverflow { len });
            }
            adaptation_field_len = Some(len);
            payload_start = 1 + usize::from(len);
        }

        let payload = if afc.has_payload() {
            body[payload_start..].to_vec()
        } else {
            Vec::new()
        };

        Ok(Self {
            header,
            adaptation_field_len,
            payload,
            trailer_len: buf.len() - MIN_PACKET_SIZE,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(pid: u16, flags: u8, afc: u8, cc: u8) -> Vec<u8> {
        let mut buf = vec![0xFFu8; MIN_PACKET_SIZE];
        buf[0] = SYNC_BYTE;
        buf[1] = flags | ((pid >> 8) as u8 & 0x1F);
        buf[2] = (pid & 0xFF) as u8;
        buf[3] = (afc << 4) | (cc & 0x0F);
        buf
    }

    #[test]
    fn parses_header_fields() {
        let buf = raw(0x0100, 0x40, 0b01, 7);
        let header = PacketHeader::read_from(&buf).unwrap();
        assert_eq!(header.pid, 0x0100);
        assert!(header.payload_unit_start);
        assert!(!header.transport_error);
        assert!(!header.transport_priority);
        assert_eq!(header.scrambling_control, 0);
        assert_eq!(header.adaptation_field_control, AdaptationFieldControl::PayloadOnly);
        assert_eq!(header.continuity_counter, 7);
    }

    #[test]
    fn thirteen_bit_pid() {
        let buf = raw(NULL_PID, 0xE0, 0b01, 0);
        let header = PacketHeader::read_from(&buf).unwrap();
        assert_eq!(header.pid, NULL_PID);
        assert!(header.is_null());
        assert!(header.transport_error);
        assert!(header.transport_priority);
    }

    #[test]
    fn payload_only_packet_has_184_byte_payload() {
        let packet = TsPacket::decode(&raw(0x11, 0, 0b01, 0)).unwrap();
        assert_eq!(packet.adaptation_field_len, None);
        assert_eq!(packet.payload.len(), 184);
        assert_eq!(packet.trailer_len, 0);
    }

    #[test]
    fn adaptation_field_shrinks_payload() {
        let mut buf = raw(0x11, 0, 0b11, 0);
        buf[4] = 7;
        let packet = TsPacket::decode(&buf).unwrap();
        assert_eq!(packet.adaptation_field_len, Some(7));
        assert_eq!(packet.payload.len(), 184 - 8);
    }

    #[test]
    fn adaptation_only_packet_has_no_payload() {
        let mut buf = raw(0x11, 0, 0b10, 0);
        buf[4] = 183;
        let packet = TsPacket::decode(&buf).unwrap();
        assert_eq!(packet.adaptation_field_len, Some(183));
        assert!(packet.payload.is_empty());
    }

    #[test]
    fn rejects_overlong_adaptation_field() {
        let mut buf = raw(0x11, 0, 0b11, 0);
        buf[4] = 184;
        assert!(matches!(
            TsPacket::decode(&buf),
            Err(PacketError::AdaptationFieldOverflow { len: 184 })
        ));
    }

    #[test]
    fn rejects_reserved_afc() {
        let buf = raw(0x42, 0, 0b00, 0);
        assert!(matches!(
            TsPacket::decode(&buf),
            Err(PacketError::ReservedAdaptationFieldControl { pid: 0x42 })
        ));
    }

    #[test]
    fn rejects_short_and_unsynced() {
        assert!(matches!(
            TsPacket::decode(&[SYNC_BYTE; 100]),
            Err(PacketError::TooShort { len: 100 })
        ));
        let mut buf = raw(0x11, 0, 0b01, 0);
        buf[0] = 0x48;
        assert!(matches!(
            TsPacket::decode(&buf),
            Err(PacketError::MissingSync { found: 0x48 })
        ));
    }

    #[test]
    fn trailer_is_counted_not_parsed() {
        let mut buf = raw(0x11, 0, 0b01, 0);
        buf.extend_from_slice(&[0xAA; 16]);
        let packet = TsPacket::decode(&buf).unwrap();
        assert_eq!(packet.trailer_len, 16);
        assert_eq!(packet.payload.len(), 184);
        assert!(packet.payload.iter().all(|&b| b == 0xFF));
    }
}
