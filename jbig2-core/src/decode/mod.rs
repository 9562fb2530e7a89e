//! Segment data decoding, one module per region or dictionary type, plus the
//! region segment information field (7.4.1) that all regions share.

pub(crate) mod generic;
pub(crate) mod refinement;
pub(crate) mod symbol;
pub(crate) mod text;

use crate::bitmap::CombinationOperator;
use crate::error::{ParseError, RegionError, Result, bail};
use crate::reader::Reader;

/// The largest width, height or offset of a page or region.
pub const MAX_BITMAP_SIZE: u32 = 65_536;

/// Parsed region segment information field (7.4.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct RegionInfo {
    /// "This four-byte field gives the width in pixels of the bitmap encoded
    /// in this segment." (7.4.1.1)
    pub(crate) width: u32,
    /// "This four-byte field gives the height in pixels of the bitmap encoded
    /// in this segment." (7.4.1.2)
    pub(crate) height: u32,
    /// "This four-byte field gives the horizontal offset in pixels of the
    /// bitmap encoded in this segment relative to the page bitmap." (7.4.1.3)
    pub(crate) x: u32,
    /// "This four-byte field gives the vertical offset in pixels of the bitmap
    /// encoded in this segment relative to the page bitmap." (7.4.1.4)
    pub(crate) y: u32,
    /// "Bits 0-2: External combination operator." (7.4.1.5)
    pub(crate) operator: CombinationOperator,
}

/// Parse the region segment information field (7.4.1).
pub(crate) fn parse_region_info(reader: &mut Reader<'_>) -> Result<RegionInfo> {
    let width = reader.read_u32().ok_or(ParseError::UnexpectedEof)?;
    let height = reader.read_u32().ok_or(ParseError::UnexpectedEof)?;
    let x = reader.read_u32().ok_or(ParseError::UnexpectedEof)?;
    let y = reader.read_u32().ok_or(ParseError::UnexpectedEof)?;
    let flags = reader.read_byte().ok_or(ParseError::UnexpectedEof)?;

    // "Bits 3-7: Reserved; must be 0." Colour extension is not supported
    // either.
    if flags & 0xF8 != 0 {
        bail!(RegionError::InvalidCombinationOperator);
    }

    let operator = CombinationOperator::from_value(flags & 0x07)?;

    if width == 0 || height == 0 || width > MAX_BITMAP_SIZE || height > MAX_BITMAP_SIZE {
        bail!(RegionError::InvalidDimension);
    }

    if x > MAX_BITMAP_SIZE || y > MAX_BITMAP_SIZE {
        bail!(RegionError::InvalidDimension);
    }

    Ok(RegionInfo {
        width,
        height,
        x,
        y,
        operator,
    })
}

/// An adaptive template pixel, relative to the pixel being decoded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct AtPixel {
    pub(crate) x: i8,
    pub(crate) y: i8,
}

impl AtPixel {
    pub(crate) const fn new(x: i8, y: i8) -> Self {
        Self { x, y }
    }
}

/// Read `count` adaptive template pixels, each as a signed X and a signed Y
/// byte.
pub(crate) fn parse_at_pixels(reader: &mut Reader<'_>, count: usize) -> Result<Vec<AtPixel>> {
    (0..count)
        .map(|_| {
            let x = reader.read_i8().ok_or(ParseError::UnexpectedEof)?;
            let y = reader.read_i8().ok_or(ParseError::UnexpectedEof)?;
            Ok(AtPixel { x, y })
        })
        .collect()
}
