//! Huffman table decoding (Annex B).
//!
//! A table is a list of lines, each with a prefix code, a range base and the
//! number of extra bits that follow the prefix. The fifteen standard tables
//! of B.5 live in [`standard`]. Custom tables come from table segments
//! (B.2) and from the symbol ID code tables of text regions (7.4.3.1.7);
//! their prefix codes are assigned with [`HuffmanTable::build`].

mod standard;

use std::borrow::Cow;

use crate::error::{DecodeError, HuffmanError, ParseError, Result, bail};
use crate::reader::Reader;

pub(crate) use standard::StandardTable;

/// How the value of a table line is computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LineKind {
    /// `RANGELOW + HTOFFSET`.
    Standard,
    /// The lower range line: `RANGELOW - HTOFFSET`, with a 32-bit offset.
    Negative,
    /// The out-of-band value.
    OutOfBand,
}

/// A single line of a Huffman table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct TableLine {
    /// The range base (or the upper end of the range for negative lines).
    pub(crate) value: i32,
    /// PREFLEN, the length of the prefix code in bits.
    pub(crate) prefix_len: u8,
    /// RANGELEN, the number of extra bits following the prefix.
    pub(crate) range_len: u8,
    /// The assigned prefix code.
    pub(crate) prefix: u32,
    pub(crate) kind: LineKind,
}

impl TableLine {
    /// A line without an assigned prefix code.
    pub(crate) const fn new(value: i32, prefix_len: u8, range_len: u8, kind: LineKind) -> Self {
        Self {
            value,
            prefix_len,
            range_len,
            prefix: 0,
            kind,
        }
    }

    /// A line with a literal prefix code.
    pub(crate) const fn with_prefix(
        value: i32,
        prefix_len: u8,
        range_len: u8,
        prefix: u32,
        kind: LineKind,
    ) -> Self {
        Self {
            value,
            prefix_len,
            range_len,
            prefix,
            kind,
        }
    }
}

/// A Huffman table, with its lines sorted by prefix length.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct HuffmanTable {
    lines: Cow<'static, [TableLine]>,
}

impl HuffmanTable {
    pub(crate) const fn from_static(lines: &'static [TableLine]) -> Self {
        Self {
            lines: Cow::Borrowed(lines),
        }
    }

    /// Build a table from lines annotated with their prefix lengths by
    /// assigning canonical prefix codes (B.3).
    ///
    /// "Note that the PREFLEN value 0 indicates that the table line is never
    /// used." Such lines are dropped. The remaining lines keep their relative
    /// order within a prefix length.
    pub(crate) fn build(mut lines: Vec<TableLine>) -> Result<Self> {
        lines.retain(|line| line.prefix_len != 0);
        if lines.iter().any(|line| line.prefix_len > 31) {
            bail!(HuffmanError::PrefixOverflow);
        }
        lines.sort_by_key(|line| line.prefix_len);

        let mut code = 0_u32;
        let mut prev_len = 0_u8;

        for (i, line) in lines.iter_mut().enumerate() {
            if i > 0 {
                code += 1;
            }

            if line.prefix_len > prev_len {
                // FIRSTCODE[CURLEN] = (FIRSTCODE[CURLEN - 1] + LENCOUNT[CURLEN - 1]) * 2
                code <<= line.prefix_len - prev_len;
                prev_len = line.prefix_len;
            }

            // More codes of this length than the length can express.
            if code >= 1 << line.prefix_len {
                bail!(HuffmanError::PrefixOverflow);
            }

            line.prefix = code;
        }

        Ok(Self {
            lines: Cow::Owned(lines),
        })
    }

    /// Parse a table segment (7.4.13).
    pub(crate) fn parse(reader: &mut Reader<'_>) -> Result<Self> {
        let flags = reader.read_byte().ok_or(ParseError::UnexpectedEof)?;
        let low = reader.read_i32().ok_or(ParseError::UnexpectedEof)?;
        let high = reader.read_i32().ok_or(ParseError::UnexpectedEof)?;

        // The lower range line covers everything below `low`.
        let Some(below_low) = low.checked_sub(1) else {
            bail!(HuffmanError::InvalidTable);
        };

        let has_oob = flags & 0x01 != 0;
        let prefix_bits = ((flags >> 1) & 0x07) + 1;
        let range_bits = ((flags >> 4) & 0x07) + 1;

        let read = |reader: &mut Reader<'_>, bits: u8| -> Result<u8> {
            let value = reader.read_bits(bits).ok_or(ParseError::UnexpectedEof)?;
            u8::try_from(value).map_err(|_| HuffmanError::InvalidTable.into())
        };

        let mut lines = Vec::new();
        let mut current = i64::from(low);

        while current < i64::from(high) {
            let prefix_len = read(reader, prefix_bits)?;
            let range_len = read(reader, range_bits)?;

            if range_len > 32 {
                bail!(HuffmanError::InvalidTable);
            }

            lines.push(TableLine::new(
                current as i32,
                prefix_len,
                range_len,
                LineKind::Standard,
            ));
            current += 1 << range_len;
        }

        let prefix_len = read(reader, prefix_bits)?;
        lines.push(TableLine::new(below_low, prefix_len, 32, LineKind::Negative));

        let prefix_len = read(reader, prefix_bits)?;
        lines.push(TableLine::new(high, prefix_len, 32, LineKind::Standard));

        if has_oob {
            let prefix_len = read(reader, prefix_bits)?;
            lines.push(TableLine::new(0, prefix_len, 0, LineKind::OutOfBand));
        }

        reader.align();

        Self::build(lines)
    }

    /// Whether the table has an out-of-band line.
    pub(crate) fn has_oob(&self) -> bool {
        self.lines.iter().any(|l| l.kind == LineKind::OutOfBand)
    }

    /// Decode one value. `None` is the out-of-band value.
    pub(crate) fn decode(&self, reader: &mut Reader<'_>) -> Result<Option<i32>> {
        let mut code = 0_u32;
        let mut len = 0_u8;

        for line in self.lines.iter() {
            while len < line.prefix_len {
                let bit = reader.read_bit().ok_or(ParseError::UnexpectedEof)?;
                code = (code << 1) | u32::from(bit);
                len += 1;
            }

            if code != line.prefix {
                continue;
            }

            let value = match line.kind {
                LineKind::OutOfBand => return Ok(None),
                LineKind::Negative => {
                    let offset = reader.read_bits(32).ok_or(ParseError::UnexpectedEof)?;
                    i64::from(line.value) - i64::from(offset)
                }
                LineKind::Standard if line.range_len == 0 => i64::from(line.value),
                LineKind::Standard => {
                    let offset = reader
                        .read_bits(line.range_len)
                        .ok_or(ParseError::UnexpectedEof)?;
                    i64::from(line.value) + i64::from(offset)
                }
            };

            return i32::try_from(value)
                .map(Some)
                .map_err(|_| DecodeError::Overflow);
        }

        bail!(HuffmanError::InvalidCode)
    }

    /// Decode one value that must not be out-of-band.
    pub(crate) fn decode_value(&self, reader: &mut Reader<'_>) -> Result<i32> {
        self.decode(reader)?
            .ok_or_else(|| HuffmanError::UnexpectedOob.into())
    }

    #[cfg(test)]
    pub(crate) fn lines(&self) -> &[TableLine] {
        &self.lines
    }
}
