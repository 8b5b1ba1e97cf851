//! Intel HEX firmware images.
//!
//! A [`HexImage`] is a sparse map from byte address to byte. Images are
//! restricted to the device's program memory and split into maximal
//! contiguous [`Segment`]s before flashing; gaps between segments are never
//! transmitted.

use std::collections::BTreeMap;
use std::fs;
use std::ops::Range;
use std::path::Path;

use log::debug;

use crate::error::{Error, Result};

/// Pad byte used when none is configured. Matches erased flash.
pub const DEFAULT_PADDING: u8 = 0xFF;

/// Sparse firmware image parsed from Intel HEX.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HexImage {
    bytes: BTreeMap<u32, u8>,
    padding: u8,
}

impl Default for HexImage {
    fn default() -> Self {
        Self {
            bytes: BTreeMap::new(),
            padding: DEFAULT_PADDING,
        }
    }
}

impl HexImage {
    /// Load an image from an Intel HEX file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        debug!("Loading HEX file: {}", path.display());
        let text = fs::read_to_string(path)?;
        Self::parse(&text)
    }

    /// Parse Intel HEX text.
    ///
    /// Later data records overwrite earlier bytes at the same address.
    pub fn parse(text: &str) -> Result<Self> {
        use ihex::Record;

        let mut image = Self::default();
        let mut base_address: u32 = 0;

        for record in ihex::Reader::new(text) {
            let record = record.map_err(|e| Error::InvalidHex(e.to_string()))?;
            match record {
                Record::Data { offset, value } => {
                    // Base is at most 0xFFFF_0000, so adding a 16-bit offset cannot wrap.
                    let start = base_address + u32::from(offset);
                    let last = u32::try_from(value.len().saturating_sub(1))
                        .ok()
                        .and_then(|tail| start.checked_add(tail));
                    if last.is_none() {
                        return Err(Error::InvalidHex(format!(
                            "data record at {start:#010x} exceeds the 32-bit address space"
                        )));
                    }
                    for (i, byte) in value.into_iter().enumerate() {
                        #[allow(clippy::cast_possible_truncation)] // Bounded by `last` above
                        image
                            .bytes
                            .insert(start + i as u32, byte);
                    }
                },
                Record::ExtendedSegmentAddress(segment) => {
                    base_address = u32::from(segment) * 16;
                },
                Record::ExtendedLinearAddress(upper) => {
                    base_address = u32::from(upper) << 16;
                },
                Record::EndOfFile => break,
                Record::StartSegmentAddress { .. } | Record::StartLinearAddress(_) => {},
            }
        }

        debug!("Parsed HEX image: {} bytes", image.len());
        Ok(image)
    }

    /// Use `padding` when filling partial write blocks.
    #[must_use]
    pub fn with_padding(mut self, padding: u8) -> Self {
        self.padding = padding;
        self
    }

    /// Declared pad byte.
    pub fn padding(&self) -> u8 {
        self.padding
    }

    /// Number of addressed bytes.
    pub fn len(&self) -> usize {
        self.bytes
            .len()
    }

    /// Whether the image holds no data.
    pub fn is_empty(&self) -> bool {
        self.bytes
            .is_empty()
    }

    /// Keep only bytes whose address lies in `range`.
    ///
    /// An empty or reversed range yields an empty image.
    #[must_use]
    pub fn restrict(&self, range: Range<u32>) -> Self {
        if range.is_empty() {
            return Self {
                bytes: BTreeMap::new(),
                padding: self.padding,
            };
        }
        Self {
            bytes: self
                .bytes
                .range(range)
                .map(|(&addr, &byte)| (addr, byte))
                .collect(),
            padding: self.padding,
        }
    }

    /// Split into maximal contiguous segments, in address order.
    pub fn segments(&self) -> Vec<Segment> {
        let mut segments: Vec<Segment> = Vec::new();

        for (&addr, &byte) in &self.bytes {
            match segments.last_mut() {
                Some(seg) if seg.max_address().checked_add(1) == Some(addr) => seg
                    .data
                    .push(byte),
                _ => segments.push(Segment {
                    start: addr,
                    data: vec![byte],
                    padding: self.padding,
                }),
            }
        }

        segments
    }
}

/// Contiguous run of image bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    start: u32,
    data: Vec<u8>,
    padding: u8,
}

impl Segment {
    /// Create a segment starting at byte address `start`.
    pub fn new(start: u32, data: Vec<u8>) -> Self {
        Self {
            start,
            data,
            padding: DEFAULT_PADDING,
        }
    }

    /// Use `padding` as the pad byte.
    #[must_use]
    pub fn with_padding(mut self, padding: u8) -> Self {
        self.padding = padding;
        self
    }

    /// First byte address.
    pub fn min_address(&self) -> u32 {
        self.start
    }

    /// Last byte address (inclusive). Equals `min_address` for an empty
    /// segment.
    #[allow(clippy::cast_possible_truncation)] // Parsing rejects data past u32::MAX
    pub fn max_address(&self) -> u32 {
        self.start
            .saturating_add(self.data.len().saturating_sub(1) as u32)
    }

    /// Byte address one past the end. Saturates at `u32::MAX` for a
    /// segment that reaches the top of the address space.
    #[allow(clippy::cast_possible_truncation)] // Parsing rejects data past u32::MAX
    pub fn end_address(&self) -> u32 {
        self.start
            .saturating_add(self.data.len() as u32)
    }

    /// Number of bytes.
    pub fn len(&self) -> usize {
        self.data
            .len()
    }

    /// Whether the segment holds no bytes.
    pub fn is_empty(&self) -> bool {
        self.data
            .is_empty()
    }

    /// Declared pad byte.
    pub fn padding(&self) -> u8 {
        self.padding
    }

    /// Raw bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Sub-segment covering the part of `range` inside this segment.
    #[must_use]
    pub fn slice(&self, range: Range<u32>) -> Self {
        let lo = range
            .start
            .clamp(self.start, self.end_address());
        let hi = range
            .end
            .clamp(lo, self.end_address());
        let from = (lo - self.start) as usize;
        let to = (hi - self.start) as usize;
        Self {
            start: lo,
            data: self.data[from..to].to_vec(),
            padding: self.padding,
        }
    }

    /// Consecutive sub-segments of at most `size` bytes, in address order.
    ///
    /// # Panics
    ///
    /// Panics if `size` is zero.
    pub fn chunks(&self, size: usize) -> impl Iterator<Item = Segment> + '_ {
        assert!(size > 0, "chunk size must be non-zero");
        self.data
            .chunks(size)
            .enumerate()
            .map(move |(i, data)| {
                #[allow(clippy::cast_possible_truncation)] // Offset lies inside the segment
                let offset = (i * size) as u32;
                Segment {
                    start: self.start + offset,
                    data: data.to_vec(),
                    padding: self.padding,
                }
            })
    }

    /// Bytes padded at the end with the pad byte to a multiple of `align`.
    pub fn to_padded(&self, align: usize) -> Vec<u8> {
        let mut bytes = self.data.clone();
        if align > 1 {
            let len = bytes.len().div_ceil(align) * align;
            bytes.resize(len, self.padding);
        }
        bytes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // 4 bytes at 0x0000, 2 bytes at 0x0010, EOF.
    const SIMPLE: &str = "\
:0400000001020304F2
:02001000AABB89
:00000001FF
";

    fn image_from(records: &[(u32, &[u8])]) -> HexImage {
        let mut image = HexImage::default();
        for &(start, data) in records {
            for (i, &b) in data.iter().enumerate() {
                image
                    .bytes
                    .insert(start + i as u32, b);
            }
        }
        image
    }

    #[test]
    fn test_parse_data_records() {
        let image = HexImage::parse(SIMPLE).unwrap();
        assert_eq!(image.len(), 6);
        let segments = image.segments();
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0].min_address(), 0x0000);
        assert_eq!(segments[0].as_bytes(), &[1, 2, 3, 4]);
        assert_eq!(segments[1].min_address(), 0x0010);
        assert_eq!(segments[1].max_address(), 0x0011);
    }

    #[test]
    fn test_parse_extended_linear_address() {
        let text = "\
:020000040001F9
:020000001234B8
:00000001FF
";
        let image = HexImage::parse(text).unwrap();
        let segments = image.segments();
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].min_address(), 0x0001_0000);
        assert_eq!(segments[0].as_bytes(), &[0x12, 0x34]);
    }

    #[test]
    fn test_parse_extended_segment_address() {
        let text = "\
:020000021000EC
:01000000AB54
:00000001FF
";
        let image = HexImage::parse(text).unwrap();
        assert_eq!(image.segments()[0].min_address(), 0x0001_0000);
    }

    #[test]
    fn test_parse_rejects_bad_checksum() {
        let text = ":0400000001020304F3\n:00000001FF\n";
        assert!(matches!(
            HexImage::parse(text),
            Err(Error::InvalidHex(_))
        ));
    }

    #[test]
    fn test_later_records_overwrite() {
        let text = "\
:020000001122CB
:0100010033CB
:00000001FF
";
        let image = HexImage::parse(text).unwrap();
        assert_eq!(image.segments()[0].as_bytes(), &[0x11, 0x33]);
    }

    #[test]
    fn test_parse_data_at_top_of_address_space() {
        let text = "\
:02000004FFFFFC
:02FFFE00AABB9C
:00000001FF
";
        let image = HexImage::parse(text).unwrap();
        let segments = image.segments();
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].min_address(), 0xFFFF_FFFE);
        assert_eq!(segments[0].max_address(), 0xFFFF_FFFF);
        assert_eq!(segments[0].end_address(), u32::MAX);
        assert_eq!(segments[0].as_bytes(), &[0xAA, 0xBB]);
    }

    #[test]
    fn test_parse_rejects_data_past_address_space() {
        let text = "\
:02000004FFFFFC
:03FFFE00AABBCCCF
:00000001FF
";
        assert!(matches!(
            HexImage::parse(text),
            Err(Error::InvalidHex(msg)) if msg.contains("0xfffffffe")
        ));
    }

    #[test]
    fn test_from_file_missing() {
        assert!(matches!(
            HexImage::from_file("/nonexistent/firmware.hex"),
            Err(Error::Io(_))
        ));
    }

    #[test]
    fn test_restrict_to_range() {
        let image = image_from(&[(0x1FFE, &[1, 2, 3, 4]), (0x4000, &[9])]);
        let restricted = image.restrict(0x2000..0x4000);
        let segments = restricted.segments();
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].min_address(), 0x2000);
        assert_eq!(segments[0].as_bytes(), &[3, 4]);

        assert!(image.restrict(0x5000..0x6000).is_empty());
    }

    #[test]
    fn test_restrict_reversed_range_is_empty() {
        let image = image_from(&[(0x1000, &[1, 2, 3])]).with_padding(0x00);
        let (start, end) = (0x2000, 0x1000);
        let restricted = image.restrict(start..end);
        assert!(restricted.is_empty());
        assert_eq!(restricted.padding(), 0x00);
    }

    #[test]
    fn test_segments_are_maximal() {
        let image = image_from(&[(0x10, &[1, 2]), (0x12, &[3]), (0x20, &[4])]);
        let segments = image.segments();
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0].as_bytes(), &[1, 2, 3]);
        assert_eq!(segments[0].end_address(), 0x13);
        assert_eq!(segments[1].min_address(), 0x20);
    }

    #[test]
    fn test_padding_propagates() {
        let image = image_from(&[(0, &[1])]).with_padding(0x00);
        assert_eq!(image.padding(), 0x00);
        assert_eq!(image.segments()[0].padding(), 0x00);
        assert_eq!(HexImage::default().padding(), 0xFF);
    }

    #[test]
    fn test_slice() {
        let seg = Segment::new(0x100, (0u8..16).collect());
        let part = seg.slice(0x104..0x108);
        assert_eq!(part.min_address(), 0x104);
        assert_eq!(part.as_bytes(), &[4, 5, 6, 7]);

        let clamped = seg.slice(0x0F0..0x102);
        assert_eq!(clamped.min_address(), 0x100);
        assert_eq!(clamped.len(), 2);

        assert!(seg.slice(0x200..0x300).is_empty());
    }

    #[test]
    fn test_chunks_cover_segment_in_order() {
        let seg = Segment::new(0x2000, (0u8..20).collect());
        let chunks: Vec<_> = seg.chunks(8).collect();
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].min_address(), 0x2000);
        assert_eq!(chunks[1].min_address(), 0x2008);
        assert_eq!(chunks[2].min_address(), 0x2010);
        assert_eq!(chunks[2].len(), 4);

        let joined: Vec<u8> = chunks
            .iter()
            .flat_map(|c| c.as_bytes().to_vec())
            .collect();
        assert_eq!(joined, seg.as_bytes());
    }

    #[test]
    fn test_single_byte_segment_is_one_chunk() {
        let seg = Segment::new(0x400, vec![0xAB]);
        let chunks: Vec<_> = seg.chunks(240).collect();
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].as_bytes(), &[0xAB]);
    }

    #[test]
    fn test_chunks_reach_top_of_address_space() {
        let seg = Segment::new(0xFFFF_FFFC, vec![1, 2, 3, 4]);
        let starts: Vec<u32> = seg
            .chunks(2)
            .map(|c| c.min_address())
            .collect();
        assert_eq!(starts, vec![0xFFFF_FFFC, 0xFFFF_FFFE]);
        assert_eq!(seg.max_address(), u32::MAX);
        assert_eq!(seg.slice(0xFFFF_FFFE..u32::MAX).as_bytes(), &[3]);
    }

    #[test]
    fn test_to_padded() {
        let seg = Segment::new(0, vec![1, 2, 3]).with_padding(0xEE);
        assert_eq!(seg.to_padded(8), vec![1, 2, 3, 0xEE, 0xEE, 0xEE, 0xEE, 0xEE]);
        assert_eq!(seg.to_padded(3), vec![1, 2, 3]);
        assert_eq!(seg.to_padded(1), vec![1, 2, 3]);
    }
}
