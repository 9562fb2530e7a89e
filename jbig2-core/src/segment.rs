//! Segment headers (7.2) and segment framing.

use crate::error::{FormatError, ParseError, Result, SegmentError, bail, err};
use crate::reader::Reader;

/// "The segment type is a number between 0 and 63, inclusive. Not all values
/// are allowed." (7.3)
///
/// Region types come in intermediate, immediate and immediate lossless
/// flavours. Those are kept as flags on the [`SegmentHeader`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SegmentType {
    /// Type 0.
    SymbolDictionary,
    /// Types 4, 6 and 7.
    TextRegion,
    /// Type 16.
    PatternDictionary,
    /// Types 20, 22 and 23.
    HalftoneRegion,
    /// Types 36, 38 and 39.
    GenericRegion,
    /// Types 40, 42 and 43.
    GenericRefinementRegion,
    /// Type 48.
    PageInformation,
    /// Type 49.
    EndOfPage,
    /// Type 50.
    EndOfStripe,
    /// Type 51.
    EndOfFile,
    /// Type 52.
    Profiles,
    /// Type 53.
    Tables,
    /// Type 62.
    Extension,
}

impl SegmentType {
    /// Map a type code to the segment type and its immediate and lossless
    /// flags.
    ///
    /// "All other segment types are reserved and must not be used." (7.3)
    fn from_code(code: u8) -> Result<(Self, bool, bool)> {
        let parsed = match code {
            0 => (Self::SymbolDictionary, false, false),
            4 => (Self::TextRegion, false, false),
            6 => (Self::TextRegion, true, false),
            7 => (Self::TextRegion, true, true),
            16 => (Self::PatternDictionary, false, false),
            20 => (Self::HalftoneRegion, false, false),
            22 => (Self::HalftoneRegion, true, false),
            23 => (Self::HalftoneRegion, true, true),
            36 => (Self::GenericRegion, false, false),
            38 => (Self::GenericRegion, true, false),
            39 => (Self::GenericRegion, true, true),
            40 => (Self::GenericRefinementRegion, false, false),
            42 => (Self::GenericRefinementRegion, true, false),
            43 => (Self::GenericRefinementRegion, true, true),
            48 => (Self::PageInformation, false, false),
            49 => (Self::EndOfPage, false, false),
            50 => (Self::EndOfStripe, false, false),
            51 => (Self::EndOfFile, false, false),
            52 => (Self::Profiles, false, false),
            53 => (Self::Tables, false, false),
            62 => (Self::Extension, false, false),
            _ => bail!(SegmentError::UnknownType),
        };

        Ok(parsed)
    }
}

/// A parsed segment header (7.2.1).
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct SegmentHeader {
    /// "This four-byte field contains the segment's segment number." (7.2.2)
    pub(crate) number: u32,
    pub(crate) segment_type: SegmentType,
    /// Whether the region is combined with the page right away instead of
    /// being stored for later segments.
    pub(crate) immediate: bool,
    pub(crate) lossless: bool,
    /// "This field encodes the number of the page to which this segment
    /// belongs." (7.2.6)
    pub(crate) page_association: u32,
    /// "This field contains the segment numbers of the segments that this
    /// segment refers to, if any." (7.2.5)
    pub(crate) referred_segments: Vec<u32>,
    /// The length of the data part, `None` if it was given as 0xFFFFFFFF.
    pub(crate) data_length: Option<u32>,
}

/// A segment header together with its data part.
#[derive(Debug)]
pub(crate) struct Segment<'a> {
    pub(crate) header: SegmentHeader,
    pub(crate) data: &'a [u8],
}

/// Parse a segment header (7.2).
pub(crate) fn parse_segment_header(reader: &mut Reader<'_>) -> Result<SegmentHeader> {
    let number = reader.read_u32().ok_or(ParseError::UnexpectedEof)?;

    // 7.2.3: "Bits 0-5: Segment type." "Bit 6: Page association field size."
    let flags = reader.read_byte().ok_or(ParseError::UnexpectedEof)?;
    let (segment_type, immediate, lossless) = SegmentType::from_code(flags & 0x3F)?;
    let long_page_association = flags & 0x40 != 0;

    // 7.2.4: "The three most significant bits of the first byte in this field
    // determine the length of the field. If the value of this three-bit
    // subfield is between 0 and 4, then the field is one byte long. If the
    // value of this three-bit subfield is 7, then the field is at least five
    // bytes long. This three-bit subfield must not contain values of 5 and 6."
    let count_byte = reader.read_byte().ok_or(ParseError::UnexpectedEof)?;

    let referred_count = match count_byte >> 5 {
        count @ 0..=4 => u32::from(count),
        7 => {
            let rest = reader.read_bytes(3).ok_or(ParseError::UnexpectedEof)?;
            let field = u32::from_be_bytes([count_byte, rest[0], rest[1], rest[2]]);

            // "Bits 29-31: Indication of long-form format. This field must
            // contain the value 7."
            if field >> 29 != 7 {
                bail!(SegmentError::InvalidReferredCount);
            }

            let count = field & 0x1FFF_FFFF;

            // One retention bit for this segment plus one per referred segment.
            let retention_bytes = (count as usize + 1).div_ceil(8);
            reader
                .skip_bytes(retention_bytes)
                .ok_or(ParseError::UnexpectedEof)?;

            count
        }
        _ => bail!(SegmentError::InvalidReferredCount),
    };

    // 7.2.5: "When the current segment's number is 256 or less, then each
    // referred-to segment number is one byte long. Otherwise, when the
    // current segment's number is 65536 or less, each referred-to segment
    // number is two bytes long. Otherwise, each referred-to segment number is
    // four bytes long."
    let mut referred_segments = Vec::with_capacity((referred_count as usize).min(reader.tail().len()));
    for _ in 0..referred_count {
        let referred = if number <= 256 {
            reader.read_byte().map(u32::from)
        } else if number <= 65536 {
            reader.read_u16().map(u32::from)
        } else {
            reader.read_u32()
        }
        .ok_or(ParseError::UnexpectedEof)?;

        // "If a segment refers to other segments, it must refer to only
        // segments with lower segment numbers."
        if referred >= number {
            bail!(SegmentError::InvalidReference);
        }

        referred_segments.push(referred);
    }

    let page_association = if long_page_association {
        reader.read_u32()
    } else {
        reader.read_byte().map(u32::from)
    }
    .ok_or(ParseError::UnexpectedEof)?;

    let data_length = match reader.read_u32().ok_or(ParseError::UnexpectedEof)? {
        0xFFFF_FFFF => None,
        length => Some(length),
    };

    Ok(SegmentHeader {
        number,
        segment_type,
        immediate,
        lossless,
        page_association,
        referred_segments,
        data_length,
    })
}

/// Read the data part that belongs to `header`.
///
/// "If the segment's type is 'Immediate generic region', then the length
/// field may contain the value 0xFFFFFFFF." (7.2.7) The data part then ends
/// with an end sequence and a four-byte row count, both of which belong to
/// the segment.
pub(crate) fn parse_segment_data<'a>(
    reader: &mut Reader<'a>,
    header: SegmentHeader,
) -> Result<Segment<'a>> {
    let length = match header.data_length {
        Some(length) => length as usize,
        None if header.segment_type == SegmentType::GenericRegion && header.immediate => {
            scan_unknown_length(reader.tail())?
        }
        None => bail!(FormatError::UnknownDataLength),
    };

    let data = reader.read_bytes(length).ok_or(ParseError::UnexpectedEof)?;

    Ok(Segment { header, data })
}

/// Find the length of an immediate generic region whose data length is
/// unknown.
///
/// "The form of encoding used by the segment may be determined by examining
/// the eighteenth byte of its segment data part, and the end sequences can
/// occur anywhere after that eighteenth byte." (7.2.7)
fn scan_unknown_length(data: &[u8]) -> Result<usize> {
    // The region segment information field takes up the first 17 bytes.
    let flags = *data.get(17).ok_or(ParseError::UnexpectedEof)?;

    // "if MMR is 1, they are preceded by the two-byte sequence 0x00 0x00; if
    // MMR is 0, they are preceded by the two-byte sequence 0xFF 0xAC."
    // Arithmetic coded regions first carry their adaptive pixels, which may
    // contain the end sequence themselves.
    let (marker, start): ([u8; 2], usize) = if flags & 0x01 != 0 {
        ([0x00, 0x00], 18)
    } else if (flags >> 1) & 0x03 == 0 {
        ([0xFF, 0xAC], 26)
    } else {
        ([0xFF, 0xAC], 20)
    };

    let coded = data.get(start..).unwrap_or_default();
    match coded.windows(2).position(|w| w == marker) {
        Some(pos) => {
            let length = start + pos + marker.len() + 4;
            if length > data.len() {
                err!(ParseError::UnexpectedEof)
            } else {
                Ok(length)
            }
        }
        None => err!(SegmentError::MissingEndMarker),
    }
}
