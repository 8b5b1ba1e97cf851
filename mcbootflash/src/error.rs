//! Error types for mcbootflash.

use std::io;
use thiserror::Error;

use crate::protocol::ResponseCode;

/// Result type for mcbootflash operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for mcbootflash operations.
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error (serial port, file operations).
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Serial port error.
    #[cfg(feature = "native")]
    #[error("Serial port error: {0}")]
    Serial(#[from] serialport::Error),

    /// The bootloader did not answer during connection bring-up.
    #[error("No response from bootloader: {0}")]
    ConnectionFailed(#[source] Box<Error>),

    /// A packet did not have the byte length its type requires.
    #[error("Malformed packet: expected {expected} bytes, got {actual}")]
    MalformedPacket {
        /// Fixed size of the expected packet type.
        expected: usize,
        /// Number of bytes actually available.
        actual: usize,
    },

    /// No response type is known for this command code.
    #[error("Unknown command code {0:#04x}")]
    UnknownCommand(u8),

    /// The response does not belong to the command that was sent.
    #[error("Protocol mismatch: {0}")]
    ProtocolMismatch(Mismatch),

    /// Device reported UNSUPPORTED_COMMAND.
    #[error("Bootloader does not support the command")]
    UnsupportedCommand,

    /// Device reported BAD_ADDRESS.
    #[error("Bootloader rejected the address")]
    BadAddress,

    /// Device reported BAD_LENGTH.
    #[error("Bootloader rejected the data length")]
    BadLength,

    /// Device reported VERIFY_FAIL.
    #[error("Bootloader reported no valid application")]
    VerifyFail,

    /// The firmware image has nothing to write inside program memory.
    #[error("HEX file contains no data that fits entirely within program memory")]
    EmptyImage,

    /// An application was still present after erasing.
    #[error("Existing application could not be erased (unlock sequence or address range may be incorrect)")]
    EraseVerificationFailed,

    /// Local and onboard checksums differ after a write.
    #[error("Checksum mismatch while writing: local {local:#06x}, device {remote:#06x} (unlock sequence may be incorrect)")]
    ChecksumMismatch {
        /// Checksum computed on the host.
        local: u16,
        /// Checksum reported by the device.
        remote: u16,
    },

    /// The device did not accept the flashed application.
    #[error("Self verification failed after flashing")]
    FlashVerificationFailed,

    /// Firmware file could not be parsed.
    #[error("Invalid HEX file: {0}")]
    InvalidHex(String),

    /// Caller-supplied value does not fit the protocol.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Device parameters make the operation impossible.
    #[error("Unsupported: {0}")]
    Unsupported(String),
}

/// Ways a response can fail to match the exchange it belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Mismatch {
    /// The echoed command code differs from the one sent.
    #[error("sent command {sent:#04x}, response echoes {received:#04x}")]
    Command {
        /// Code of the command that was sent.
        sent: u8,
        /// Code found in the response.
        received: u8,
    },

    /// The result byte is not a code the bootloader defines.
    #[error("unrecognized response code {0:#04x}")]
    ResponseCode(u8),

    /// The reported program memory range ends before it starts.
    #[error("program memory range {start:#08x}..{end:#08x} is reversed")]
    MemoryRange {
        /// Reported first word address.
        start: u32,
        /// Reported end word address.
        end: u32,
    },
}

impl Error {
    /// Classify a response code.
    ///
    /// Returns `None` for [`ResponseCode::Success`]. `Undefined` is never
    /// success and maps to a protocol mismatch, like any unknown code.
    pub fn from_response_code(code: ResponseCode) -> Option<Self> {
        match code {
            ResponseCode::Success => None,
            ResponseCode::UnsupportedCommand => Some(Self::UnsupportedCommand),
            ResponseCode::BadAddress => Some(Self::BadAddress),
            ResponseCode::BadLength => Some(Self::BadLength),
            ResponseCode::VerifyFail => Some(Self::VerifyFail),
            ResponseCode::Undefined | ResponseCode::Unknown(_) => Some(Self::ProtocolMismatch(
                Mismatch::ResponseCode(code.as_u8()),
            )),
        }
    }

    /// Whether this error was reported by the device itself.
    pub fn is_device_error(&self) -> bool {
        matches!(
            self,
            Self::UnsupportedCommand | Self::BadAddress | Self::BadLength | Self::VerifyFail
        )
    }

    /// Whether this error means the device could not be talked to at all.
    pub fn is_connection_error(&self) -> bool {
        match self {
            Self::ConnectionFailed(_) | Self::Io(_) => true,
            #[cfg(feature = "native")]
            Self::Serial(_) => true,
            _ => false,
        }
    }
}
