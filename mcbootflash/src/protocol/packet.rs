//! Fixed-layout packets exchanged with the MCC 16-bit bootloader.
//!
//! Every packet starts with the same 11-byte command header. Responses
//! append a result byte, except the READ_VERSION response which reuses the
//! bare header and carries the bootloader attributes after it:
//!
//! ```text
//! Command (11 bytes):
//! +---------+-------------+-----------------+---------+
//! | command | data_length | unlock_sequence | address |
//! +---------+-------------+-----------------+---------+
//! |   u8    |     u16     |       u32       |   u32   |
//! +---------+-------------+-----------------+---------+
//!
//! Response (12 bytes)    = Command + success(u8)
//! MemoryRange (20 bytes) = Response + program_start(u32) + program_end(u32)
//! Checksum (14 bytes)    = Response + checksum(u16)
//!
//! Version (37 bytes) = Command
//!   + version(u16) + max_packet_length(u16) + 2 pad
//!   + device_id(u16) + 2 pad
//!   + erase_size(u16) + write_size(u16) + 12 pad
//! ```
//!
//! All fields are little-endian. Packets are never length-prefixed: the
//! response layout is selected by the command that was sent, see
//! [`response_kind_for`].

use std::fmt;
use std::io::{self, Read, Write};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use crate::error::{Error, Result};

/// Key required in `unlock_sequence` for flash-mutating commands.
///
/// A wrong key makes ERASE_FLASH and WRITE_FLASH fail silently.
pub const FLASH_UNLOCK_KEY: u32 = 0x00AA0055;

/// Commands understood by the bootloader.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandCode {
    /// Read bootloader version and attributes (0x00).
    ReadVersion,
    /// Read flash contents (0x01).
    ReadFlash,
    /// Write flash (0x02).
    WriteFlash,
    /// Erase flash pages (0x03).
    EraseFlash,
    /// Checksum a flash region (0x08).
    CalcChecksum,
    /// Reset the device (0x09).
    ResetDevice,
    /// Check whether a valid application is present (0x0A).
    SelfVerify,
    /// Read the program memory address range (0x0B).
    GetMemoryAddressRange,
    /// Any code the bootloader does not define.
    Unknown(u8),
}

impl CommandCode {
    /// Wire value of this code.
    pub fn as_u8(self) -> u8 {
        match self {
            Self::ReadVersion => 0x00,
            Self::ReadFlash => 0x01,
            Self::WriteFlash => 0x02,
            Self::EraseFlash => 0x03,
            Self::CalcChecksum => 0x08,
            Self::ResetDevice => 0x09,
            Self::SelfVerify => 0x0A,
            Self::GetMemoryAddressRange => 0x0B,
            Self::Unknown(v) => v,
        }
    }
}

impl From<u8> for CommandCode {
    fn from(value: u8) -> Self {
        match value {
            0x00 => Self::ReadVersion,
            0x01 => Self::ReadFlash,
            0x02 => Self::WriteFlash,
            0x03 => Self::EraseFlash,
            0x08 => Self::CalcChecksum,
            0x09 => Self::ResetDevice,
            0x0A => Self::SelfVerify,
            0x0B => Self::GetMemoryAddressRange,
            v => Self::Unknown(v),
        }
    }
}

impl fmt::Display for CommandCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ReadVersion => write!(f, "READ_VERSION"),
            Self::ReadFlash => write!(f, "READ_FLASH"),
            Self::WriteFlash => write!(f, "WRITE_FLASH"),
            Self::EraseFlash => write!(f, "ERASE_FLASH"),
            Self::CalcChecksum => write!(f, "CALC_CHECKSUM"),
            Self::ResetDevice => write!(f, "RESET_DEVICE"),
            Self::SelfVerify => write!(f, "SELF_VERIFY"),
            Self::GetMemoryAddressRange => write!(f, "GET_MEMORY_ADDRESS_RANGE"),
            Self::Unknown(v) => write!(f, "UNKNOWN({v:#04x})"),
        }
    }
}

/// Result codes sent by the bootloader.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ResponseCode {
    /// No result yet (0x00).
    #[default]
    Undefined,
    /// Command succeeded (0x01).
    Success,
    /// Command not supported (0xFF).
    UnsupportedCommand,
    /// Address out of range (0xFE).
    BadAddress,
    /// Length out of range (0xFD).
    BadLength,
    /// No valid application (0xFC).
    VerifyFail,
    /// Any code the bootloader does not define.
    Unknown(u8),
}

impl ResponseCode {
    /// Wire value of this code.
    pub fn as_u8(self) -> u8 {
        match self {
            Self::Undefined => 0x00,
            Self::Success => 0x01,
            Self::UnsupportedCommand => 0xFF,
            Self::BadAddress => 0xFE,
            Self::BadLength => 0xFD,
            Self::VerifyFail => 0xFC,
            Self::Unknown(v) => v,
        }
    }
}

impl From<u8> for ResponseCode {
    fn from(value: u8) -> Self {
        match value {
            0x00 => Self::Undefined,
            0x01 => Self::Success,
            0xFF => Self::UnsupportedCommand,
            0xFE => Self::BadAddress,
            0xFD => Self::BadLength,
            0xFC => Self::VerifyFail,
            v => Self::Unknown(v),
        }
    }
}

/// A fixed-size, little-endian packet.
pub trait Packet: Sized {
    /// Encoded length in bytes.
    const SIZE: usize;

    /// Serialize fields in declared order.
    fn write_to<W: Write>(&self, writer: &mut W) -> io::Result<()>;

    /// Parse fields in declared order.
    fn read_from<R: Read>(reader: &mut R) -> io::Result<Self>;
}

/// Serialize a packet to its fixed byte layout.
#[allow(clippy::unwrap_used)] // Writing to Vec<u8> cannot fail
pub fn encode<P: Packet>(packet: &P) -> Vec<u8> {
    let mut buf = Vec::with_capacity(P::SIZE);
    packet.write_to(&mut buf).unwrap();
    buf
}

/// Parse a packet from exactly `P::SIZE` bytes.
pub fn decode<P: Packet>(bytes: &[u8]) -> Result<P> {
    if bytes.len() != P::SIZE {
        return Err(Error::MalformedPacket {
            expected: P::SIZE,
            actual: bytes.len(),
        });
    }
    let mut reader = bytes;
    Ok(P::read_from(&mut reader)?)
}

/// Command header, sent to the bootloader and echoed in every response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Command {
    /// Command code.
    pub command: CommandCode,
    /// Payload length, or a command-specific count.
    pub data_length: u16,
    /// [`FLASH_UNLOCK_KEY`] for erase/write, zero otherwise.
    pub unlock_sequence: u32,
    /// Word address the command applies to.
    pub address: u32,
}

impl Command {
    /// Create a command with all other fields zeroed.
    pub fn new(command: CommandCode) -> Self {
        Self {
            command,
            data_length: 0,
            unlock_sequence: 0,
            address: 0,
        }
    }

    /// Build a READ_VERSION command.
    pub fn read_version() -> Self {
        Self::new(CommandCode::ReadVersion)
    }

    /// Build a GET_MEMORY_ADDRESS_RANGE command.
    pub fn get_memory_address_range() -> Self {
        Self::new(CommandCode::GetMemoryAddressRange)
    }

    /// Build an ERASE_FLASH command for `pages` erase pages from `address`.
    pub fn erase_flash(address: u32, pages: u16) -> Self {
        Self {
            command: CommandCode::EraseFlash,
            data_length: pages,
            unlock_sequence: FLASH_UNLOCK_KEY,
            address,
        }
    }

    /// Build a WRITE_FLASH command announcing `length` payload bytes.
    pub fn write_flash(address: u32, length: u16) -> Self {
        Self {
            command: CommandCode::WriteFlash,
            data_length: length,
            unlock_sequence: FLASH_UNLOCK_KEY,
            address,
        }
    }

    /// Build a CALC_CHECKSUM command over `length` bytes from `address`.
    pub fn calc_checksum(address: u32, length: u16) -> Self {
        Self {
            command: CommandCode::CalcChecksum,
            data_length: length,
            unlock_sequence: 0,
            address,
        }
    }

    /// Build a SELF_VERIFY command.
    pub fn self_verify() -> Self {
        Self::new(CommandCode::SelfVerify)
    }

    /// Build a RESET_DEVICE command.
    pub fn reset_device() -> Self {
        Self::new(CommandCode::ResetDevice)
    }
}

impl Packet for Command {
    const SIZE: usize = 11;

    fn write_to<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        writer.write_u8(self.command.as_u8())?;
        writer.write_u16::<LittleEndian>(self.data_length)?;
        writer.write_u32::<LittleEndian>(self.unlock_sequence)?;
        writer.write_u32::<LittleEndian>(self.address)
    }

    fn read_from<R: Read>(reader: &mut R) -> io::Result<Self> {
        Ok(Self {
            command: reader.read_u8()?.into(),
            data_length: reader.read_u16::<LittleEndian>()?,
            unlock_sequence: reader.read_u32::<LittleEndian>()?,
            address: reader.read_u32::<LittleEndian>()?,
        })
    }
}

/// Generic response: echoed header plus result code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Response {
    /// Echo of the command header.
    pub header: Command,
    /// Result code.
    pub success: ResponseCode,
}

impl Response {
    /// Create a response echoing `header`.
    pub fn new(header: Command, success: ResponseCode) -> Self {
        Self { header, success }
    }
}

impl Packet for Response {
    const SIZE: usize = Command::SIZE + 1;

    fn write_to<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        self.header.write_to(writer)?;
        writer.write_u8(self.success.as_u8())
    }

    fn read_from<R: Read>(reader: &mut R) -> io::Result<Self> {
        Ok(Self {
            header: Command::read_from(reader)?,
            success: reader.read_u8()?.into(),
        })
    }
}

/// Response to READ_VERSION. Has no result byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Version {
    /// Echo of the command header.
    pub header: Command,
    /// Bootloader version.
    pub version: u16,
    /// Largest packet (header plus payload) the bootloader accepts.
    pub max_packet_length: u16,
    /// Device identifier.
    pub device_id: u16,
    /// Erase page size.
    pub erase_size: u16,
    /// Write block size.
    pub write_size: u16,
}

impl Packet for Version {
    const SIZE: usize = Command::SIZE + 26;

    fn write_to<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        self.header.write_to(writer)?;
        writer.write_u16::<LittleEndian>(self.version)?;
        writer.write_u16::<LittleEndian>(self.max_packet_length)?;
        writer.write_all(&[0; 2])?;
        writer.write_u16::<LittleEndian>(self.device_id)?;
        writer.write_all(&[0; 2])?;
        writer.write_u16::<LittleEndian>(self.erase_size)?;
        writer.write_u16::<LittleEndian>(self.write_size)?;
        writer.write_all(&[0; 12])
    }

    fn read_from<R: Read>(reader: &mut R) -> io::Result<Self> {
        let mut pad = [0u8; 12];
        let header = Command::read_from(reader)?;
        let version = reader.read_u16::<LittleEndian>()?;
        let max_packet_length = reader.read_u16::<LittleEndian>()?;
        reader.read_exact(&mut pad[..2])?;
        let device_id = reader.read_u16::<LittleEndian>()?;
        reader.read_exact(&mut pad[..2])?;
        let erase_size = reader.read_u16::<LittleEndian>()?;
        let write_size = reader.read_u16::<LittleEndian>()?;
        reader.read_exact(&mut pad)?;

        Ok(Self {
            header,
            version,
            max_packet_length,
            device_id,
            erase_size,
            write_size,
        })
    }
}

/// Response to GET_MEMORY_ADDRESS_RANGE.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MemoryRange {
    /// Generic response part.
    pub response: Response,
    /// First word address of program memory.
    pub program_start: u32,
    /// Word address one past the end of program memory.
    pub program_end: u32,
}

impl Packet for MemoryRange {
    const SIZE: usize = Response::SIZE + 8;

    fn write_to<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        self.response.write_to(writer)?;
        writer.write_u32::<LittleEndian>(self.program_start)?;
        writer.write_u32::<LittleEndian>(self.program_end)
    }

    fn read_from<R: Read>(reader: &mut R) -> io::Result<Self> {
        Ok(Self {
            response: Response::read_from(reader)?,
            program_start: reader.read_u32::<LittleEndian>()?,
            program_end: reader.read_u32::<LittleEndian>()?,
        })
    }
}

/// Response to CALC_CHECKSUM.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Checksum {
    /// Generic response part.
    pub response: Response,
    /// Checksum computed by the device.
    pub checksum: u16,
}

impl Packet for Checksum {
    const SIZE: usize = Response::SIZE + 2;

    fn write_to<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        self.response.write_to(writer)?;
        writer.write_u16::<LittleEndian>(self.checksum)
    }

    fn read_from<R: Read>(reader: &mut R) -> io::Result<Self> {
        Ok(Self {
            response: Response::read_from(reader)?,
            checksum: reader.read_u16::<LittleEndian>()?,
        })
    }
}

/// Response layouts, selected by the command that was sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResponseKind {
    /// [`Version`].
    Version,
    /// [`Response`].
    Response,
    /// [`MemoryRange`].
    MemoryRange,
    /// [`Checksum`].
    Checksum,
}

impl ResponseKind {
    /// Encoded length of this response layout.
    pub const fn size(self) -> usize {
        match self {
            Self::Version => Version::SIZE,
            Self::Response => Response::SIZE,
            Self::MemoryRange => MemoryRange::SIZE,
            Self::Checksum => Checksum::SIZE,
        }
    }

    /// Parse `bytes` as this layout.
    pub fn decode(self, bytes: &[u8]) -> Result<ResponsePacket> {
        Ok(match self {
            Self::Version => ResponsePacket::Version(decode(bytes)?),
            Self::Response => ResponsePacket::Response(decode(bytes)?),
            Self::MemoryRange => ResponsePacket::MemoryRange(decode(bytes)?),
            Self::Checksum => ResponsePacket::Checksum(decode(bytes)?),
        })
    }
}

/// Response layout the bootloader answers `command` with.
pub fn response_kind_for(command: CommandCode) -> Result<ResponseKind> {
    match command {
        CommandCode::ReadVersion => Ok(ResponseKind::Version),
        CommandCode::ReadFlash
        | CommandCode::WriteFlash
        | CommandCode::EraseFlash
        | CommandCode::ResetDevice
        | CommandCode::SelfVerify => Ok(ResponseKind::Response),
        CommandCode::CalcChecksum => Ok(ResponseKind::Checksum),
        CommandCode::GetMemoryAddressRange => Ok(ResponseKind::MemoryRange),
        CommandCode::Unknown(code) => Err(Error::UnknownCommand(code)),
    }
}

/// Any decoded response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResponsePacket {
    /// Answer to READ_VERSION.
    Version(Version),
    /// Answer to READ_FLASH, WRITE_FLASH, ERASE_FLASH, RESET_DEVICE, SELF_VERIFY.
    Response(Response),
    /// Answer to GET_MEMORY_ADDRESS_RANGE.
    MemoryRange(MemoryRange),
    /// Answer to CALC_CHECKSUM.
    Checksum(Checksum),
}

impl ResponsePacket {
    /// Echoed command header.
    pub fn header(&self) -> &Command {
        match self {
            Self::Version(v) => &v.header,
            Self::Response(r) => &r.header,
            Self::MemoryRange(m) => &m.response.header,
            Self::Checksum(c) => &c.response.header,
        }
    }

    /// Echoed command code.
    pub fn command(&self) -> CommandCode {
        self.header().command
    }

    /// Result code, absent for version responses.
    pub fn success(&self) -> Option<ResponseCode> {
        match self {
            Self::Version(_) => None,
            Self::Response(r) => Some(r.success),
            Self::MemoryRange(m) => Some(m.response.success),
            Self::Checksum(c) => Some(c.response.success),
        }
    }

    /// Layout of this response.
    pub fn kind(&self) -> ResponseKind {
        match self {
            Self::Version(_) => ResponseKind::Version,
            Self::Response(_) => ResponseKind::Response,
            Self::MemoryRange(_) => ResponseKind::MemoryRange,
            Self::Checksum(_) => ResponseKind::Checksum,
        }
    }

    /// Serialize the contained packet.
    pub fn encode(&self) -> Vec<u8> {
        match self {
            Self::Version(v) => encode(v),
            Self::Response(r) => encode(r),
            Self::MemoryRange(m) => encode(m),
            Self::Checksum(c) => encode(c),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_COMMANDS: [CommandCode; 8] = [
        CommandCode::ReadVersion,
        CommandCode::ReadFlash,
        CommandCode::WriteFlash,
        CommandCode::EraseFlash,
        CommandCode::CalcChecksum,
        CommandCode::ResetDevice,
        CommandCode::SelfVerify,
        CommandCode::GetMemoryAddressRange,
    ];

    fn sample_header() -> Command {
        Command {
            command: CommandCode::WriteFlash,
            data_length: 0xBEEF,
            unlock_sequence: FLASH_UNLOCK_KEY,
            address: 0x1234_5678,
        }
    }

    #[test]
    fn test_declared_sizes() {
        assert_eq!(Command::SIZE, 11);
        assert_eq!(Response::SIZE, 12);
        assert_eq!(Version::SIZE, 37);
        assert_eq!(MemoryRange::SIZE, 20);
        assert_eq!(Checksum::SIZE, 14);
    }

    #[test]
    fn test_command_layout() {
        let data = encode(&sample_header());
        assert_eq!(
            data,
            [
                0x02, // command
                0xEF, 0xBE, // data_length
                0x55, 0x00, 0xAA, 0x00, // unlock_sequence
                0x78, 0x56, 0x34, 0x12, // address
            ]
        );
    }

    #[test]
    fn test_version_layout_has_no_success_byte() {
        let version = Version {
            header: Command::read_version(),
            version: 0x0102,
            max_packet_length: 0x0304,
            device_id: 0x0506,
            erase_size: 0x0708,
            write_size: 0x090A,
        };
        let data = encode(&version);
        assert_eq!(data.len(), Version::SIZE);
        // Attributes start right after the 11-byte header.
        assert_eq!(&data[11..15], &[0x02, 0x01, 0x04, 0x03]);
        assert_eq!(&data[15..17], &[0x00, 0x00]);
        assert_eq!(&data[17..19], &[0x06, 0x05]);
        assert_eq!(&data[19..21], &[0x00, 0x00]);
        assert_eq!(&data[21..25], &[0x08, 0x07, 0x0A, 0x09]);
        assert!(data[25..].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_roundtrip_every_layout() {
        let response = Response::new(sample_header(), ResponseCode::BadLength);
        let version = Version {
            header: Command::read_version(),
            version: u16::MAX,
            max_packet_length: 256,
            device_id: 0x3456,
            erase_size: 1024,
            write_size: 8,
        };
        let range = MemoryRange {
            response: Response::new(Command::get_memory_address_range(), ResponseCode::Success),
            program_start: 0x1800,
            program_end: u32::MAX,
        };
        let checksum = Checksum {
            response: Response::new(Command::calc_checksum(0x1000, 20), ResponseCode::Success),
            checksum: 0xA5A5,
        };

        assert_eq!(decode::<Command>(&encode(&sample_header())).unwrap(), sample_header());
        assert_eq!(decode::<Response>(&encode(&response)).unwrap(), response);
        assert_eq!(decode::<Version>(&encode(&version)).unwrap(), version);
        assert_eq!(decode::<MemoryRange>(&encode(&range)).unwrap(), range);
        assert_eq!(decode::<Checksum>(&encode(&checksum)).unwrap(), checksum);
    }

    #[test]
    fn test_unknown_codes_roundtrip() {
        let header = Command::new(CommandCode::from(0x42));
        let response = Response::new(header, ResponseCode::from(0x7F));
        let decoded = decode::<Response>(&encode(&response)).unwrap();
        assert_eq!(decoded.header.command, CommandCode::Unknown(0x42));
        assert_eq!(decoded.success, ResponseCode::Unknown(0x7F));
    }

    #[test]
    fn test_size_is_independent_of_values() {
        for code in ALL_COMMANDS {
            let zero = Command::new(code);
            let full = Command {
                command: code,
                data_length: u16::MAX,
                unlock_sequence: u32::MAX,
                address: u32::MAX,
            };
            assert_eq!(encode(&zero).len(), Command::SIZE);
            assert_eq!(encode(&full).len(), Command::SIZE);
        }
    }

    #[test]
    fn test_decode_rejects_wrong_length() {
        let mut data = encode(&Response::new(sample_header(), ResponseCode::Success));
        data.pop();
        match decode::<Response>(&data) {
            Err(Error::MalformedPacket { expected, actual }) => {
                assert_eq!(expected, 12);
                assert_eq!(actual, 11);
            },
            other => panic!("expected MalformedPacket, got {other:?}"),
        }

        data.extend_from_slice(&[0, 0]);
        assert!(matches!(
            decode::<Response>(&data),
            Err(Error::MalformedPacket { .. })
        ));
        assert!(matches!(
            decode::<Version>(&[]),
            Err(Error::MalformedPacket { expected: 37, actual: 0 })
        ));
    }

    #[test]
    fn test_response_kind_table() {
        assert_eq!(
            response_kind_for(CommandCode::ReadVersion).unwrap(),
            ResponseKind::Version
        );
        for code in [
            CommandCode::ReadFlash,
            CommandCode::WriteFlash,
            CommandCode::EraseFlash,
            CommandCode::ResetDevice,
            CommandCode::SelfVerify,
        ] {
            assert_eq!(response_kind_for(code).unwrap(), ResponseKind::Response);
        }
        assert_eq!(
            response_kind_for(CommandCode::CalcChecksum).unwrap(),
            ResponseKind::Checksum
        );
        assert_eq!(
            response_kind_for(CommandCode::GetMemoryAddressRange).unwrap(),
            ResponseKind::MemoryRange
        );
    }

    #[test]
    fn test_response_kind_table_is_total_over_defined_codes() {
        for value in 0..=u8::MAX {
            let code = CommandCode::from(value);
            let result = response_kind_for(code);
            if ALL_COMMANDS.contains(&code) {
                assert!(result.is_ok(), "{code} should have a response kind");
            } else {
                assert!(matches!(result, Err(Error::UnknownCommand(v)) if v == value));
            }
        }
    }

    #[test]
    fn test_code_conversions() {
        for value in 0..=u8::MAX {
            assert_eq!(CommandCode::from(value).as_u8(), value);
            assert_eq!(ResponseCode::from(value).as_u8(), value);
        }
        assert_eq!(ResponseCode::default(), ResponseCode::Undefined);
    }

    #[test]
    fn test_kind_decode_dispatch() {
        let checksum = Checksum {
            response: Response::new(Command::calc_checksum(0x800, 4), ResponseCode::Success),
            checksum: 7,
        };
        let packet = ResponseKind::Checksum.decode(&encode(&checksum)).unwrap();
        assert_eq!(packet, ResponsePacket::Checksum(checksum));
        assert_eq!(packet.command(), CommandCode::CalcChecksum);
        assert_eq!(packet.success(), Some(ResponseCode::Success));
        assert_eq!(packet.kind().size(), Checksum::SIZE);
        assert_eq!(packet.encode(), encode(&checksum));
    }

    #[test]
    fn test_command_constructors() {
        let erase = Command::erase_flash(0x1000, 4);
        assert_eq!(erase.unlock_sequence, FLASH_UNLOCK_KEY);
        assert_eq!(erase.data_length, 4);

        let write = Command::write_flash(0x1000, 240);
        assert_eq!(write.unlock_sequence, FLASH_UNLOCK_KEY);

        for cmd in [
            Command::read_version(),
            Command::get_memory_address_range(),
            Command::calc_checksum(0x1000, 20),
            Command::self_verify(),
            Command::reset_device(),
        ] {
            assert_eq!(cmd.unlock_sequence, 0);
        }
    }
}
