//! Serial transport boundary.
//!
//! The bootloader engine only needs blocking reads and writes with a
//! configurable timeout. [`Port`] captures that contract so the engine can
//! run against a real serial port ([`NativePort`]) or an in-memory script in
//! tests.
//!
//! ```text
//! +------------------+
//! |  Bootloader<P>   |  exchange(), erase(), flash() ...
//! +--------+---------+
//!          |
//!          v
//! +--------+---------+
//! |   Port Trait     |  write_all_bytes(), read_bytes(n), timeout
//! +--------+---------+
//!          |
//!          v
//! +--------+---------+
//! | Native SerialPort|
//! |   (serialport)   |
//! +------------------+
//! ```
//!
//! ## Example
//!
//! ```rust,no_run
//! use mcbootflash::port::Port;
//!
//! fn example<P: Port>(port: &mut P) -> mcbootflash::Result<()> {
//!     port.write_all_bytes(&[0x00; 11])?;
//!     let reply = port.read_bytes(37)?;
//!     println!("Received {} bytes", reply.len());
//!     Ok(())
//! }
//! ```

#[cfg(feature = "native")]
pub mod native;

#[cfg(test)]
pub(crate) mod mock;

use std::io::{ErrorKind, Read, Write};
use std::ops::{Deref, DerefMut};
use std::time::Duration;

use log::warn;

use crate::error::Result;

/// Default read timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Default baud rate.
pub const DEFAULT_BAUD_RATE: u32 = 115_200;

/// Serial port configuration.
#[derive(Debug, Clone)]
pub struct SerialConfig {
    /// Port name/path (e.g., "/dev/ttyUSB0", "COM3").
    pub port_name: String,
    /// Baud rate.
    pub baud_rate: u32,
    /// Read/write timeout.
    pub timeout: Duration,
    /// Data bits.
    pub data_bits: DataBits,
    /// Parity.
    pub parity: Parity,
    /// Stop bits.
    pub stop_bits: StopBits,
    /// Flow control.
    pub flow_control: FlowControl,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            port_name: String::new(),
            baud_rate: DEFAULT_BAUD_RATE,
            timeout: DEFAULT_TIMEOUT,
            data_bits: DataBits::Eight,
            parity: Parity::None,
            stop_bits: StopBits::One,
            flow_control: FlowControl::None,
        }
    }
}

impl SerialConfig {
    /// Create a new configuration with port name and baud rate.
    pub fn new(port_name: impl Into<String>, baud_rate: u32) -> Self {
        Self {
            port_name: port_name.into(),
            baud_rate,
            ..Default::default()
        }
    }

    /// Set the timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Number of data bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DataBits {
    /// 7 data bits.
    Seven,
    /// 8 data bits.
    #[default]
    Eight,
}

/// Parity checking mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Parity {
    /// No parity.
    #[default]
    None,
    /// Odd parity.
    Odd,
    /// Even parity.
    Even,
}

/// Number of stop bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StopBits {
    /// 1 stop bit.
    #[default]
    One,
    /// 2 stop bits.
    Two,
}

/// Flow control mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FlowControl {
    /// No flow control.
    #[default]
    None,
    /// Hardware flow control (RTS/CTS).
    Hardware,
}

/// Serial port information.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct PortInfo {
    /// Port name/path.
    pub name: String,
    /// USB vendor ID (if available).
    pub vid: Option<u16>,
    /// USB product ID (if available).
    pub pid: Option<u16>,
    /// Manufacturer string (if available).
    pub manufacturer: Option<String>,
    /// Product string (if available).
    pub product: Option<String>,
    /// Serial number (if available).
    pub serial_number: Option<String>,
}

/// Byte stream the bootloader is reached through.
pub trait Port: Read + Write + Send {
    /// Set the read/write timeout.
    fn set_timeout(&mut self, timeout: Duration) -> Result<()>;

    /// Get the current timeout.
    fn timeout(&self) -> Duration;

    /// Discard anything pending in the input and output buffers.
    fn clear_buffers(&mut self) -> Result<()>;

    /// Get the port name/path.
    fn name(&self) -> &str;

    /// Write all bytes, blocking until complete.
    fn write_all_bytes(&mut self, buf: &[u8]) -> Result<()> {
        std::io::Write::write_all(self, buf)?;
        std::io::Write::flush(self)?;
        Ok(())
    }

    /// Read up to `n` bytes.
    ///
    /// Blocks until `n` bytes have arrived or the port times out. On timeout
    /// or end of stream the bytes received so far are returned, so a short
    /// result means the device stopped answering.
    fn read_bytes(&mut self, n: usize) -> Result<Vec<u8>> {
        let mut buf = vec![0u8; n];
        let mut filled = 0;

        while filled < n {
            match self.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(count) => filled += count,
                Err(e) if e.kind() == ErrorKind::Interrupted => {},
                Err(e) if e.kind() == ErrorKind::TimedOut => break,
                Err(e) => return Err(e.into()),
            }
        }

        buf.truncate(filled);
        Ok(buf)
    }
}

/// Trait for listing available serial ports.
///
/// This is separated from `Port` because it's a static operation that
/// doesn't require an open port instance.
pub trait PortEnumerator {
    /// List all available serial ports.
    fn list_ports() -> Result<Vec<PortInfo>>;
}

/// Temporarily scales a port's timeout.
///
/// The previous timeout is restored when the guard is dropped, whether or
/// not the work done through it succeeded.
pub struct ScopedTimeout<'a, P: Port + ?Sized> {
    port: &'a mut P,
    previous: Duration,
}

impl<'a, P: Port + ?Sized> ScopedTimeout<'a, P> {
    /// Multiply the port timeout by `factor` until the guard is dropped.
    pub fn scale(port: &'a mut P, factor: u32) -> Result<Self> {
        let previous = port.timeout();
        let scaled = previous
            .checked_mul(factor)
            .unwrap_or(Duration::MAX);
        port.set_timeout(scaled)?;
        Ok(Self { port, previous })
    }

    /// Timeout that will be restored on drop.
    pub fn previous(&self) -> Duration {
        self.previous
    }
}

impl<P: Port + ?Sized> Deref for ScopedTimeout<'_, P> {
    type Target = P;

    fn deref(&self) -> &P {
        self.port
    }
}

impl<P: Port + ?Sized> DerefMut for ScopedTimeout<'_, P> {
    fn deref_mut(&mut self) -> &mut P {
        self.port
    }
}

impl<P: Port + ?Sized> Drop for ScopedTimeout<'_, P> {
    fn drop(&mut self) {
        if let Err(e) = self
            .port
            .set_timeout(self.previous)
        {
            warn!("Failed to restore port timeout to {:?}: {e}", self.previous);
        }
    }
}

#[cfg(feature = "native")]
pub use native::{NativePort, NativePortEnumerator};
