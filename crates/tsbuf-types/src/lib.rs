#![warn(clippy::pedantic)]

pub mod decoder;
pub mod error;
pub mod packet;

pub use decoder::{PacketDecoder, TsPacketDecoder};
pub use error::PacketError;
pub use packet::{AdaptationFieldControl, PacketHeader, TsPacket};
