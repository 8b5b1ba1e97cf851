//! Flash checksum as computed by the bootloader's CALC_CHECKSUM command.
//!
//! Data is taken in 4-byte little-endian groups. Each group contributes its
//! low 16 bits plus bits 16..24; the top byte of every group is the phantom
//! byte of a 24-bit instruction word and is ignored. The sum wraps at 16 bits.

/// Compute the bootloader checksum of `data`.
///
/// A trailing group shorter than 4 bytes is treated as if zero-padded.
pub fn checksum(data: &[u8]) -> u16 {
    data.chunks(4).fold(0u16, |acc, group| {
        let mut word = [0u8; 4];
        word[..group.len()].copy_from_slice(group);
        let low = u16::from_le_bytes([word[0], word[1]]);
        let high = u16::from(word[2]);
        acc.wrapping_add(low).wrapping_add(high)
    })
}
