//! Page information segments (7.4.8) and the page bitmap.

use crate::bitmap::{Bitmap, CombinationOperator, SET, UNSET};
use crate::decode::{MAX_BITMAP_SIZE, RegionInfo};
use crate::error::{ParseError, RegionError, Result, bail};
use crate::reader::Reader;

/// Parsed page information segment (7.4.8).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct PageInformation {
    /// "This is a four-byte value containing the width in pixels of the page's
    /// bitmap." (7.4.8.1)
    pub(crate) width: u32,
    /// "This is a four-byte value containing the height in pixels of the
    /// page's bitmap." (7.4.8.2)
    ///
    /// `None` if the height was given as 0xFFFFFFFF and is only known once
    /// all regions are decoded.
    pub(crate) height: Option<u32>,
    /// "Bit 2: Page default pixel value. This bit contains the initial value
    /// for every pixel in the page, before any region segments are decoded or
    /// drawn." (7.4.8.5)
    pub(crate) default_pixel: u8,
    /// "Bits 3-4: Page default combination operator." (7.4.8.5)
    pub(crate) default_operator: CombinationOperator,
    /// "Bit 6: Page combination operator overridden. If this bit is 0, then
    /// every direct region segment associated with this page must use the
    /// page's default combination operator." (7.4.8.5)
    pub(crate) operator_overridden: bool,
    /// "Bit 15: Page is striped." (7.4.8.6)
    pub(crate) striped: bool,
    /// "Bits 0-14: Maximum stripe size." (7.4.8.6)
    pub(crate) max_stripe_size: u16,
}

/// Parse a page information segment (7.4.8).
pub(crate) fn parse_page_information(reader: &mut Reader<'_>) -> Result<PageInformation> {
    let width = reader.read_u32().ok_or(ParseError::UnexpectedEof)?;
    let height = reader.read_u32().ok_or(ParseError::UnexpectedEof)?;

    // 7.4.8.3 and 7.4.8.4: the resolution is not needed for decoding.
    reader.skip_bytes(8).ok_or(ParseError::UnexpectedEof)?;

    let flags = reader.read_byte().ok_or(ParseError::UnexpectedEof)?;
    let striping = reader.read_u16().ok_or(ParseError::UnexpectedEof)?;

    let height = (height != 0xFFFF_FFFF).then_some(height);

    if width > MAX_BITMAP_SIZE || height.is_some_and(|h| h > MAX_BITMAP_SIZE) {
        bail!(RegionError::InvalidDimension);
    }

    Ok(PageInformation {
        width,
        height,
        default_pixel: if flags & 0x04 != 0 { SET } else { UNSET },
        // Two bits only, so REPLACE can't be the default.
        default_operator: CombinationOperator::from_value((flags >> 3) & 0x03)?,
        operator_overridden: flags & 0x40 != 0,
        striped: striping & 0x8000 != 0,
        max_stripe_size: striping & 0x7FFF,
    })
}

/// The page bitmap that immediate regions are combined into.
#[derive(Debug, Clone)]
pub(crate) struct Page {
    info: PageInformation,
    bitmap: Bitmap,
}

impl Page {
    pub(crate) fn new(info: PageInformation) -> Result<Self> {
        // A page of unknown height starts out empty and grows with its
        // regions.
        let bitmap = Bitmap::new(info.width, info.height.unwrap_or(0), info.default_pixel)?;

        Ok(Self { info, bitmap })
    }

    /// Combine a region bitmap into the page at the position and with the
    /// operator of its region segment information field (7.4.1).
    pub(crate) fn paint(&mut self, region: &Bitmap, info: &RegionInfo) -> Result<()> {
        if !self.info.operator_overridden && info.operator != self.info.default_operator {
            log::debug!(
                "region uses {:?} although the page doesn't override {:?}",
                info.operator,
                self.info.default_operator
            );
        }

        // "If the page information segment's page bitmap height field is
        // 0xFFFFFFFF, then [...] the page bitmap must be extended."
        let grow = self.info.height.is_none().then_some(self.info.default_pixel);

        self.bitmap
            .paint(region, info.x as i32, info.y as i32, info.operator, grow)
    }

    /// The part of the page covered by a region, as the reference of a
    /// refinement of the page itself (7.4.7.5).
    pub(crate) fn region(&self, info: &RegionInfo) -> Result<Bitmap> {
        self.bitmap
            .sub_bitmap(info.x as i32, info.y as i32, info.width, info.height)
    }

    pub(crate) fn into_bitmap(self) -> Bitmap {
        self.bitmap
    }
}
