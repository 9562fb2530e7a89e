/*!
A decoder for MMR coded bitmaps.

JBIG2 generic regions and symbol dictionaries can store their bitmaps with
the two-dimensional coding scheme of ITU-T T.6 (known as CCITT Group 4, or
"Modified Modified READ"). This crate decodes such data into a sequence of
pixel runs which are handed to a [`Decoder`] sink.

Only the coding used inside JBIG2 is supported: pure two-dimensional coding
without EOL codes and without uncompressed mode.

# Safety
This crate forbids unsafe code via a crate-level attribute.
*/

#![forbid(unsafe_code)]

use core::fmt;

use log::warn;

use crate::bit::BitReader;
use crate::tables::{EOFB, Mode};

mod bit;
mod tables;

const WHITE: u8 = 0;
const BLACK: u8 = 1;

/// Errors that can occur while decoding MMR data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeError {
    /// The data ended before all rows were decoded.
    UnexpectedEof,
    /// A bit sequence did not match any mode or run length code.
    InvalidCode,
    /// A run length overflowed.
    Overflow,
    /// A coded line did not match the number of columns.
    LineLength,
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnexpectedEof => write!(f, "unexpected end of MMR data"),
            Self::InvalidCode => write!(f, "invalid MMR code"),
            Self::Overflow => write!(f, "MMR run length overflow"),
            Self::LineLength => write!(f, "MMR coded line has the wrong length"),
        }
    }
}

impl core::error::Error for DecodeError {}

/// Result type for MMR decoding.
pub type Result<T> = core::result::Result<T, DecodeError>;

/// Settings for decoding a single MMR coded bitmap.
#[derive(Copy, Clone, Debug)]
pub struct DecodeSettings {
    /// The width of the bitmap in pixels.
    pub columns: u32,
    /// The number of rows to decode.
    pub rows: u32,
    /// Whether the data may end with an EOFB marker. If it does, decoding
    /// stops there even if fewer than `rows` rows were decoded.
    pub end_of_block: bool,
}

/// A sink for decoded pixels.
pub trait Decoder {
    /// Push `count` pixels of the same color.
    fn push_pixels(&mut self, black: bool, count: usize);
    /// Called once a row is complete.
    fn next_line(&mut self);
}

/// Decode MMR data into the given sink.
///
/// Returns the number of bytes that were consumed.
pub fn decode(data: &[u8], decoder: &mut impl Decoder, settings: &DecodeSettings) -> Result<usize> {
    let mut reader = BitReader::new(data);
    let mut ctx = DecoderContext::new(decoder, settings.columns as usize);

    for _ in 0..settings.rows {
        if settings.end_of_block && reader.peek_bits(24) == Ok(EOFB) {
            break;
        }

        ctx.decode_line(&mut reader)?;
    }

    if settings.end_of_block && reader.peek_bits(24) == Ok(EOFB) {
        reader.read_bits(24)?;
    }

    Ok(reader.byte_pos())
}

struct DecoderContext<'a, T: Decoder> {
    /// The previous line, with one extra white pixel on the right so that
    /// `b1` and `b2` can point one past the last column.
    reference_line: Vec<u8>,
    /// The line we are currently decoding.
    coding_line: Vec<u8>,
    decoder: &'a mut T,
    /// "The reference or starting changing element on the coding line."
    /// `None` stands for the imaginary element in front of the first pixel.
    a0: Option<usize>,
    /// The color of the run starting at `a0`.
    color: u8,
    columns: usize,
}

impl<'a, T: Decoder> DecoderContext<'a, T> {
    fn new(decoder: &'a mut T, columns: usize) -> Self {
        Self {
            // "The reference line for the first coding line in a page is an
            // imaginary white line."
            reference_line: vec![WHITE; columns + 1],
            coding_line: Vec::with_capacity(columns + 1),
            decoder,
            a0: None,
            color: WHITE,
            columns,
        }
    }

    fn decode_line(&mut self, reader: &mut BitReader<'_>) -> Result<()> {
        self.a0 = None;
        self.color = WHITE;
        self.coding_line.clear();

        while self.position() < self.columns {
            match reader.read_mode()? {
                Mode::Pass => {
                    let b2 = self.find_b2(self.find_b1());
                    self.fill_to(b2)?;
                }
                Mode::Horizontal => {
                    let a0a1 = reader.read_run(self.color == WHITE)?;
                    self.fill(a0a1)?;
                    self.color ^= 1;

                    let a1a2 = reader.read_run(self.color == WHITE)?;
                    self.fill(a1a2)?;
                    self.color ^= 1;
                }
                Mode::Vertical(delta) => {
                    let b1 = self.find_b1();
                    let a1 = b1
                        .checked_add_signed(isize::from(delta))
                        .ok_or(DecodeError::InvalidCode)?;

                    if a1 < self.position() {
                        warn!("vertical mode moved a1 in front of a0");

                        return Err(DecodeError::InvalidCode);
                    }

                    self.fill_to(a1)?;
                    self.color ^= 1;
                }
            }
        }

        if self.coding_line.len() != self.columns {
            warn!("coding line has wrong size");

            return Err(DecodeError::LineLength);
        }

        self.decoder.next_line();

        core::mem::swap(&mut self.reference_line, &mut self.coding_line);
        self.reference_line.push(WHITE);

        Ok(())
    }

    /// The pixel position at which the next run starts.
    fn position(&self) -> usize {
        self.a0.unwrap_or(0)
    }

    /// "The first changing element on the reference line to the right of a0
    /// and of opposite colour to the colour of a0."
    fn find_b1(&self) -> usize {
        let target = self.color ^ 1;

        let (mut idx, mut last) = match self.a0 {
            Some(a0) => (a0 + 1, self.reference_line[a0]),
            None => (0, WHITE),
        };

        while idx < self.columns {
            let current = self.reference_line[idx];

            if current != last && current == target {
                break;
            }

            last = current;
            idx += 1;
        }

        idx.min(self.columns)
    }

    /// "The next changing element to the right of b1, on the reference line."
    fn find_b2(&self, b1: usize) -> usize {
        let color = self.reference_line[b1];
        let mut idx = b1;

        while idx < self.columns && self.reference_line[idx] == color {
            idx += 1;
        }

        idx
    }

    fn fill_to(&mut self, end: usize) -> Result<()> {
        let count = end
            .checked_sub(self.position())
            .ok_or(DecodeError::InvalidCode)?;

        self.fill(count)
    }

    fn fill(&mut self, count: usize) -> Result<()> {
        let end = self.position() + count;

        if end > self.columns {
            warn!("run exceeds line width ({end} > {})", self.columns);

            return Err(DecodeError::LineLength);
        }

        self.coding_line
            .extend(core::iter::repeat_n(self.color, count));
        self.decoder.push_pixels(self.color == BLACK, count);
        self.a0 = Some(end);

        Ok(())
    }
}
