//! # mcbootflash
//!
//! A library for flashing devices running Microchip's MCC 16-bit bootloader
//! (PIC24, dsPIC33) over a serial port.
//!
//! This crate provides:
//!
//! - The bootloader's fixed-layout packet codec
//! - The flash engine: erase, chunked write with checksum verification,
//!   self-verify and reset
//! - Intel HEX firmware image handling
//! - A serial [`Port`] abstraction with a native implementation
//!
//! ## Features
//!
//! - `native` (default): Native serial port support via the `serialport` crate
//! - `serde`: Serialization support for data types
//!
//! ## Example
//!
//! ```rust,no_run
//! use mcbootflash::{Bootloader, HexImage, SerialConfig};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let image = HexImage::from_file("firmware.hex")?;
//!
//!     #[cfg(feature = "native")]
//!     {
//!         let config = SerialConfig::new("/dev/ttyUSB0", 115200);
//!         let mut bootloader = Bootloader::open(&config)?;
//!
//!         bootloader.flash(&image, |written, total| {
//!             println!("Flashing: {written}/{total}");
//!         })?;
//!
//!         bootloader.reset()?;
//!     }
//!
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod bootloader;
pub mod error;
pub mod image;
pub mod port;
pub mod protocol;

// Re-exports for convenience
#[cfg(feature = "native")]
pub use port::{NativePort, NativePortEnumerator};
pub use {
    bootloader::{BootAttributes, Bootloader, EraseOptions},
    error::{Error, Mismatch, Result},
    image::{HexImage, Segment},
    port::{Port, PortEnumerator, PortInfo, ScopedTimeout, SerialConfig},
    protocol::{CommandCode, FLASH_UNLOCK_KEY, ResponseCode},
};
