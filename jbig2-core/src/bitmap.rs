//! Bitmaps and the combination operators (7.4.1.5).
//!
//! A bitmap stores one byte per pixel: `0x00` for a pixel that is not set
//! and `0xFF` for a set (black) pixel. Decoding procedures only ever look at
//! single bits, so [`Bitmap::pixel`] returns `0` or `1`.

use crate::error::{RegionError, Result, bail, err};

/// The largest number of pixels a single bitmap may have.
pub const MAX_PIXELS: u64 = 1 << 28;

pub(crate) const SET: u8 = 0xFF;
pub(crate) const UNSET: u8 = 0x00;

/// "These operators describe how the segment's bitmap is to be combined with
/// the page bitmap." (7.4.1.5)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CombinationOperator {
    /// 0 OR
    Or,
    /// 1 AND
    And,
    /// 2 XOR
    Xor,
    /// 3 XNOR
    NotXor,
    /// 4 REPLACE
    Replace,
}

impl CombinationOperator {
    pub(crate) fn from_value(value: u8) -> Result<Self> {
        match value {
            0 => Ok(Self::Or),
            1 => Ok(Self::And),
            2 => Ok(Self::Xor),
            3 => Ok(Self::NotXor),
            4 => Ok(Self::Replace),
            _ => err!(RegionError::InvalidCombinationOperator),
        }
    }

    /// Combine a target pixel with a source pixel.
    #[inline]
    pub(crate) fn apply(self, target: u8, source: u8) -> u8 {
        match self {
            Self::Or => target | source,
            Self::And => target & source,
            Self::Xor => target ^ source,
            Self::NotXor => !(target ^ source),
            Self::Replace => source,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Bitmap {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl Bitmap {
    /// Create a bitmap with every pixel set to `fill`.
    pub(crate) fn new(width: u32, height: u32, fill: u8) -> Result<Self> {
        let len = pixel_count(width, height)?;

        Ok(Self {
            width,
            height,
            data: vec![fill; len],
        })
    }

    /// Create a bitmap from rows of pixels, `0` meaning unset.
    #[cfg(test)]
    pub(crate) fn from_rows(rows: &[&[u8]]) -> Self {
        let height = rows.len() as u32;
        let width = rows.first().map_or(0, |row| row.len()) as u32;
        let data = rows
            .iter()
            .flat_map(|row| row.iter().map(|&p| if p != 0 { SET } else { UNSET }))
            .collect();

        Self {
            width,
            height,
            data,
        }
    }

    #[inline]
    pub(crate) fn width(&self) -> u32 {
        self.width
    }

    #[inline]
    pub(crate) fn height(&self) -> u32 {
        self.height
    }

    /// The pixel at the given position as a single bit. Pixels outside of
    /// the bitmap are `0`.
    #[inline]
    pub(crate) fn pixel(&self, x: i32, y: i32) -> u8 {
        if x < 0 || y < 0 || x as u32 >= self.width || y as u32 >= self.height {
            return 0;
        }

        self.data[y as usize * self.width as usize + x as usize] & 1
    }

    /// Set the pixel at the given position. Positions outside of the bitmap
    /// are ignored.
    #[inline]
    pub(crate) fn set_pixel(&mut self, x: u32, y: u32, bit: u8) {
        if x >= self.width || y >= self.height {
            return;
        }

        self.data[y as usize * self.width as usize + x as usize] = if bit != 0 { SET } else { UNSET };
    }

    /// Copy row `source` over row `target`.
    pub(crate) fn copy_row(&mut self, target: u32, source: u32) {
        if target >= self.height || source >= self.height || target == source {
            return;
        }

        let width = self.width as usize;
        let start = source as usize * width;
        self.data
            .copy_within(start..start + width, target as usize * width);
    }

    /// Extract a `width` x `height` part starting at (`x`, `y`). Pixels
    /// outside of this bitmap are unset.
    pub(crate) fn sub_bitmap(&self, x: i32, y: i32, width: u32, height: u32) -> Result<Self> {
        let mut result = Self::new(width, height, UNSET)?;

        for row in 0..height {
            for col in 0..width {
                let bit = self.pixel(x + col as i32, y + row as i32);
                result.set_pixel(col, row, bit);
            }
        }

        Ok(result)
    }

    /// Combine `source` into this bitmap with its top left corner at
    /// (`x`, `y`). Pixels that fall outside of this bitmap are skipped.
    ///
    /// If `grow` holds a pixel value and the source reaches below the last
    /// row, the bitmap first grows to fit it, filling new rows with that
    /// pixel.
    pub(crate) fn paint(
        &mut self,
        source: &Self,
        x: i32,
        y: i32,
        operator: CombinationOperator,
        grow: Option<u8>,
    ) -> Result<()> {
        if let Some(fill) = grow {
            let bottom = i64::from(y) + i64::from(source.height);

            if bottom > i64::from(self.height) {
                let Ok(height) = u32::try_from(bottom) else {
                    bail!(RegionError::InvalidDimension);
                };
                let len = pixel_count(self.width, height)?;

                self.data.resize(len, fill);
                self.height = height;
            }
        }

        let x_start = x.max(0);
        let y_start = y.max(0);
        let x_end = (i64::from(x) + i64::from(source.width)).min(i64::from(self.width));
        let y_end = (i64::from(y) + i64::from(source.height)).min(i64::from(self.height));

        if i64::from(x_start) >= x_end || i64::from(y_start) >= y_end {
            return Ok(());
        }

        let (x_end, y_end) = (x_end as i32, y_end as i32);
        let width = self.width as usize;
        let source_width = source.width as usize;

        for target_y in y_start..y_end {
            let source_y = (target_y - y) as usize;
            let target_row = &mut self.data[target_y as usize * width..][..width];
            let source_row = &source.data[source_y * source_width..][..source_width];

            for target_x in x_start..x_end {
                let source_x = (target_x - x) as usize;
                let target = &mut target_row[target_x as usize];
                *target = operator.apply(*target, source_row[source_x]);
            }
        }

        Ok(())
    }

    /// Pack the bitmap into rows of bytes, most significant bit first, with
    /// a set bit for a set pixel. Every row is padded to a whole byte.
    pub(crate) fn pack(&self) -> (usize, Vec<u8>) {
        let stride = (self.width as usize).div_ceil(8);
        let mut packed = vec![0; stride * self.height as usize];

        if stride == 0 {
            return (stride, packed);
        }

        for (row, out) in self
            .data
            .chunks_exact(self.width as usize)
            .zip(packed.chunks_exact_mut(stride))
        {
            for (i, &pixel) in row.iter().enumerate() {
                if pixel != UNSET {
                    out[i / 8] |= 0x80 >> (i % 8);
                }
            }
        }

        (stride, packed)
    }
}

fn pixel_count(width: u32, height: u32) -> Result<usize> {
    let count = u64::from(width) * u64::from(height);

    if count > MAX_PIXELS {
        bail!(RegionError::InvalidDimension);
    }

    Ok(count as usize)
}
