//! Firmware image handling.

pub mod hex;

pub use hex::{DEFAULT_PADDING, HexImage, Segment};
