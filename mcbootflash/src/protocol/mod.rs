//! MCC 16-bit bootloader wire protocol.

pub mod checksum;
pub mod packet;

// Re-export common types
pub use checksum::checksum;
pub use packet::{
    Checksum, Command, CommandCode, FLASH_UNLOCK_KEY, MemoryRange, Packet, Response, ResponseCode,
    ResponseKind, ResponsePacket, Version, decode, encode, response_kind_for,
};
