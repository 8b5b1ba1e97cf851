//! Flash engine for the MCC 16-bit bootloader.
//!
//! [`Bootloader`] drives the strictly half-duplex command/response exchange:
//! every command is answered by exactly one fixed-size response before the
//! next command may be sent.
//!
//! ## Flash sequence
//!
//! ```text
//! SELF_VERIFY       program present?  -> skip erase if not
//! ERASE_FLASH       whole program memory (timeout x10)
//! SELF_VERIFY       must now report VERIFY_FAIL
//! WRITE_FLASH  \
//! CALC_CHECKSUM/    per chunk, in address order
//! SELF_VERIFY       authoritative pass/fail
//! ```
//!
//! ## Example
//!
//! ```rust,no_run
//! use mcbootflash::{Bootloader, HexImage, SerialConfig};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = SerialConfig::new("/dev/ttyUSB0", 115200);
//!     let mut bootloader = Bootloader::open(&config)?;
//!
//!     let image = HexImage::from_file("firmware.hex")?;
//!     bootloader.flash(&image, |written, total| {
//!         println!("{written}/{total} bytes");
//!     })?;
//!     bootloader.reset()?;
//!     Ok(())
//! }
//! ```

use std::ops::Range;
use std::path::Path;

use log::{debug, info, trace};

use crate::error::{Error, Mismatch, Result};
use crate::image::{HexImage, Segment};
use crate::port::{Port, ScopedTimeout};
use crate::protocol::{
    self, Command, Packet, ResponseKind, ResponsePacket, encode, response_kind_for,
};

/// Erasing is slow; the port timeout is scaled by this for ERASE_FLASH.
const ERASE_TIMEOUT_FACTOR: u32 = 10;

/// Device parameters reported by READ_VERSION.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct BootAttributes {
    /// Bootloader version.
    pub version: u16,
    /// Largest packet (header plus payload) the bootloader accepts.
    pub max_packet_length: u16,
    /// Device identifier.
    pub device_id: u16,
    /// Flash erase page size. Erase ranges must align with it.
    pub erase_size: u16,
    /// Flash write block size. Writes must align with it.
    pub write_size: u16,
}

/// Options for [`Bootloader::erase`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EraseOptions {
    /// Erase even if no application is detected.
    pub force: bool,
    /// Check afterwards that no application is detected any more.
    pub verify: bool,
}

impl Default for EraseOptions {
    fn default() -> Self {
        Self {
            force: false,
            verify: true,
        }
    }
}

/// Connection to a device running the MCC 16-bit bootloader.
///
/// Generic over the port type `P`, which must implement the `Port` trait.
/// A value only exists after bring-up succeeded, so every operation sees
/// valid device attributes.
pub struct Bootloader<P: Port> {
    port: P,
    attributes: BootAttributes,
    memory_range: Range<u32>,
}

impl<P: Port> Bootloader<P> {
    /// Connect to the bootloader over an open port.
    ///
    /// Reads the bootloader attributes and the program memory range. A
    /// device that does not answer, or answers with garbage, fails with
    /// [`Error::ConnectionFailed`].
    pub fn connect(mut port: P) -> Result<Self> {
        info!("Connecting to bootloader on {}...", port.name());

        let (attributes, memory_range) = bring_up(&mut port).map_err(|e| match e {
            Error::Io(_) | Error::MalformedPacket { .. } => Error::ConnectionFailed(Box::new(e)),
            #[cfg(feature = "native")]
            Error::Serial(_) => Error::ConnectionFailed(Box::new(e)),
            other => other,
        })?;

        info!("Connected");
        Ok(Self {
            port,
            attributes,
            memory_range,
        })
    }

    /// Device parameters captured at connect time.
    pub fn attributes(&self) -> &BootAttributes {
        &self.attributes
    }

    /// Program memory range in word addresses, end exclusive.
    pub fn memory_range(&self) -> Range<u32> {
        self.memory_range
            .clone()
    }

    /// Get a reference to the underlying port.
    pub fn port(&self) -> &P {
        &self.port
    }

    /// Get a mutable reference to the underlying port.
    pub fn port_mut(&mut self) -> &mut P {
        &mut self.port
    }

    /// Consume the bootloader and return the underlying port.
    pub fn into_port(self) -> P {
        self.port
    }

    /// Send a command with optional payload and read its response.
    ///
    /// Fails if the response echoes a different command, or if a result
    /// code other than SUCCESS is reported.
    pub fn exchange(&mut self, command: &Command, payload: &[u8]) -> Result<ResponsePacket> {
        exchange(&mut self.port, command, payload)
    }

    /// Whether the device reports a valid application.
    ///
    /// VERIFY_FAIL is the expected answer on a blank device and yields
    /// `false`. Any other failure is returned as an error.
    pub fn detect_program(&mut self) -> Result<bool> {
        let response = transact(&mut self.port, &Command::self_verify(), &[])?;
        match response
            .success()
            .and_then(Error::from_response_code)
        {
            None => Ok(true),
            Some(Error::VerifyFail) => Ok(false),
            Some(e) => Err(e),
        }
    }

    /// Erase `range` (word addresses, end exclusive).
    ///
    /// Unless `force` is set, nothing is erased when no application is
    /// detected. With `verify`, an application still detected afterwards
    /// fails with [`Error::EraseVerificationFailed`].
    pub fn erase(&mut self, range: Range<u32>, options: EraseOptions) -> Result<()> {
        let pages = self.page_count(&range)?;

        if !options.force && !self.detect_program()? {
            info!("No application detected, skipping flash erase");
            return Ok(());
        }

        info!("Erasing flash...");
        debug!(
            "Erasing addresses {:#08x}:{:#08x} ({pages} pages)",
            range.start, range.end
        );
        {
            let mut port = ScopedTimeout::scale(&mut self.port, ERASE_TIMEOUT_FACTOR)?;
            exchange(&mut *port, &Command::erase_flash(range.start, pages), &[])?;
        }

        if options.verify {
            if self.detect_program()? {
                debug!("An application was detected; flash erase failed");
                debug!("unlock_sequence field may be incorrect");
                return Err(Error::EraseVerificationFailed);
            }
            info!("No application detected; flash erase successful");
        }

        Ok(())
    }

    /// Erase the whole program memory.
    pub fn erase_all(&mut self, options: EraseOptions) -> Result<()> {
        self.erase(self.memory_range(), options)
    }

    fn page_count(&self, range: &Range<u32>) -> Result<u16> {
        if range.end < range.start {
            return Err(Error::InvalidArgument(format!(
                "erase range {:#08x}..{:#08x} is reversed",
                range.start, range.end
            )));
        }
        if self.attributes.erase_size == 0 {
            return Err(Error::Unsupported(
                "device reports an erase size of zero".into(),
            ));
        }

        let pages = (range.end - range.start) / u32::from(self.attributes.erase_size);
        u16::try_from(pages).map_err(|_| {
            Error::InvalidArgument(format!("{pages} erase pages do not fit in one command"))
        })
    }

    /// Write a segment, padded with its pad byte to a multiple of `align`.
    pub fn write_flash(&mut self, segment: &Segment, align: usize) -> Result<()> {
        let payload = segment.to_padded(align);
        let length = u16::try_from(payload.len()).map_err(|_| {
            Error::InvalidArgument(format!(
                "{} bytes do not fit in one write",
                payload.len()
            ))
        })?;

        debug!(
            "Writing {} bytes to {:#08x}",
            segment.len(),
            segment.min_address()
        );
        self.exchange(
            &Command::write_flash(segment.min_address() >> 1, length),
            &payload,
        )?;
        Ok(())
    }

    /// Checksum computed by the device over `length` bytes from word `address`.
    pub fn remote_checksum(&mut self, address: u32, length: u16) -> Result<u16> {
        match self.exchange(&Command::calc_checksum(address, length), &[])? {
            ResponsePacket::Checksum(response) => Ok(response.checksum),
            other => Err(unexpected_layout(ResponseKind::Checksum, &other)),
        }
    }

    /// Compare the local checksum of `segment` with the device's.
    pub fn checksum(&mut self, segment: &Segment) -> Result<()> {
        let length = u16::try_from(segment.len()).map_err(|_| {
            Error::InvalidArgument(format!(
                "{} bytes do not fit in one checksum",
                segment.len()
            ))
        })?;
        let local = protocol::checksum(segment.as_bytes());
        let remote = self.remote_checksum(segment.min_address() >> 1, length)?;

        if local != remote {
            debug!("Checksum mismatch: {local:#06x} != {remote:#06x}");
            debug!("unlock_sequence field may be incorrect");
            return Err(Error::ChecksumMismatch { local, remote });
        }

        debug!("Checksum OK: {local:#06x}");
        Ok(())
    }

    /// Ask the device to verify the application.
    pub fn self_verify(&mut self) -> Result<()> {
        self.exchange(&Command::self_verify(), &[])?;
        info!("Self verify OK");
        Ok(())
    }

    /// Bytes per WRITE_FLASH: what fits after the header, rounded down to
    /// whole write blocks.
    pub fn chunk_size(&self) -> Result<usize> {
        let write_size = usize::from(self.attributes.write_size);
        if write_size == 0 {
            return Err(Error::Unsupported(
                "device reports a write size of zero".into(),
            ));
        }

        let room = usize::from(self.attributes.max_packet_length).saturating_sub(Command::SIZE);
        let chunk = room - room % write_size;
        if chunk == 0 {
            return Err(Error::Unsupported(format!(
                "max packet length {} cannot carry a {write_size}-byte write block",
                self.attributes.max_packet_length
            )));
        }
        Ok(chunk)
    }

    /// Flash an application image.
    ///
    /// Only image bytes inside program memory are written. `progress` is
    /// called with (bytes written, total bytes) after every chunk.
    pub fn flash<F>(&mut self, image: &HexImage, mut progress: F) -> Result<()>
    where
        F: FnMut(usize, usize),
    {
        // Image addresses count bytes, device addresses count 16-bit words.
        let Range { start, end } = self.memory_range();
        let byte_range = start.saturating_mul(2)..end.saturating_mul(2);
        let segments = image
            .restrict(byte_range)
            .segments();
        if segments.is_empty() {
            return Err(Error::EmptyImage);
        }

        let chunk_size = self.chunk_size()?;
        let align = usize::from(self.attributes.write_size);

        self.erase_all(EraseOptions::default())?;

        let total: usize = segments
            .iter()
            .map(Segment::len)
            .sum();
        info!(
            "Flashing {total} bytes in {} segment(s)",
            segments.len()
        );

        let mut written = 0;
        for (index, segment) in segments.iter().enumerate() {
            debug!(
                "Flashing segment {index} at {:#08x} ({} bytes)",
                segment.min_address(),
                segment.len()
            );

            for chunk in segment.chunks(chunk_size) {
                self.write_flash(&chunk, align)?;
                written += chunk.len();
                debug!("{written} bytes written of {total}");
                progress(written, total);
                self.checksum(&chunk)?;
            }
        }

        match self.self_verify() {
            Err(Error::VerifyFail) => Err(Error::FlashVerificationFailed),
            other => other,
        }
    }

    /// Load an Intel HEX file and flash it.
    pub fn flash_file<F>(&mut self, path: impl AsRef<Path>, progress: F) -> Result<()>
    where
        F: FnMut(usize, usize),
    {
        let image = HexImage::from_file(path)?;
        self.flash(&image, progress)
    }

    /// Reset the device, starting the application if one is present.
    pub fn reset(&mut self) -> Result<()> {
        self.exchange(&Command::reset_device(), &[])?;
        info!("Device reset");
        Ok(())
    }
}

#[cfg(feature = "native")]
mod native_impl {
    use super::{Bootloader, Result};
    use crate::port::{NativePort, SerialConfig};

    impl Bootloader<NativePort> {
        /// Open a serial port and connect to the bootloader.
        pub fn open(config: &SerialConfig) -> Result<Self> {
            let port = NativePort::open(config)?;
            Self::connect(port)
        }
    }
}

fn bring_up<P: Port + ?Sized>(port: &mut P) -> Result<(BootAttributes, Range<u32>)> {
    port.clear_buffers()?;

    let attributes = match exchange(port, &Command::read_version(), &[])? {
        ResponsePacket::Version(v) => BootAttributes {
            version: v.version,
            max_packet_length: v.max_packet_length,
            device_id: v.device_id,
            erase_size: v.erase_size,
            write_size: v.write_size,
        },
        other => return Err(unexpected_layout(ResponseKind::Version, &other)),
    };
    debug!("Got bootloader attributes:");
    debug!("Version:           {:#06x}", attributes.version);
    debug!("Max packet length: {}", attributes.max_packet_length);
    debug!("Device ID:         {:#06x}", attributes.device_id);
    debug!("Erase size:        {}", attributes.erase_size);
    debug!("Write size:        {}", attributes.write_size);

    let memory_range = match exchange(port, &Command::get_memory_address_range(), &[])? {
        ResponsePacket::MemoryRange(m) => m.program_start..m.program_end,
        other => return Err(unexpected_layout(ResponseKind::MemoryRange, &other)),
    };
    if memory_range.end < memory_range.start {
        return Err(Error::ProtocolMismatch(Mismatch::MemoryRange {
            start: memory_range.start,
            end: memory_range.end,
        }));
    }
    debug!(
        "Got program memory range: {:#08x}:{:#08x}",
        memory_range.start, memory_range.end
    );

    Ok((attributes, memory_range))
}

/// Write a command and read the response its code calls for.
///
/// Checks the echoed command code but not the result code.
fn transact<P: Port + ?Sized>(
    port: &mut P,
    command: &Command,
    payload: &[u8],
) -> Result<ResponsePacket> {
    let kind = response_kind_for(command.command)?;

    let mut request = encode(command);
    request.extend_from_slice(payload);
    trace!("Sending {} ({} bytes): {request:02X?}", command.command, request.len());
    port.write_all_bytes(&request)?;

    let bytes = port.read_bytes(kind.size())?;
    trace!("Received {} bytes: {bytes:02X?}", bytes.len());
    let response = kind.decode(&bytes)?;

    if response.command() != command.command {
        debug!("Command code mismatch:");
        debug!("Sent:     {}", command.command);
        debug!("Received: {}", response.command());
        return Err(Error::ProtocolMismatch(Mismatch::Command {
            sent: command.command.as_u8(),
            received: response.command().as_u8(),
        }));
    }

    Ok(response)
}

fn exchange<P: Port + ?Sized>(
    port: &mut P,
    command: &Command,
    payload: &[u8],
) -> Result<ResponsePacket> {
    let response = transact(port, command, payload)?;

    if let Some(err) = response
        .success()
        .and_then(Error::from_response_code)
    {
        debug!("Command failed:");
        debug!("Command:  {:02X?}", encode(command));
        debug!("Response: {:02X?}", response.encode());
        return Err(err);
    }

    Ok(response)
}

fn unexpected_layout(expected: ResponseKind, got: &ResponsePacket) -> Error {
    Error::MalformedPacket {
        expected: expected.size(),
        actual: got
            .kind()
            .size(),
    }
}
