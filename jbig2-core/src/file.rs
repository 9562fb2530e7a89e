//! Standalone JBIG2 files (Annex D of ITU-T T.88).
//!
//! Only single page files are accepted, since the decoder produces exactly
//! one page bitmap.

use crate::error::{FormatError, ParseError, Result, bail};
use crate::reader::Reader;
use crate::segment::{
    Segment, SegmentHeader, SegmentType, parse_segment_data, parse_segment_header,
};

/// "There are two standalone file organizations possible for a JBIG2
/// bitstream." (Annex D)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FileOrganization {
    /// "A file header is followed by a sequence of segments. The two parts of
    /// each segment are stored together." (D.1)
    Sequential,
    /// "A file header is followed by a sequence of segments headers; the last
    /// segment header is followed by the data for the first segment, then the
    /// data for the second segment, and so on." (D.2)
    RandomAccess,
}

/// "This is an 8-byte sequence containing 0x97 0x4A 0x42 0x32 0x0D 0x0A 0x1A
/// 0x0A." (D.4.1)
const FILE_HEADER_ID: [u8; 8] = [0x97, 0x4A, 0x42, 0x32, 0x0D, 0x0A, 0x1A, 0x0A];

/// Parse a standalone file into its segments, in the order in which they
/// have to be processed.
pub(crate) fn parse_file(data: &[u8]) -> Result<Vec<Segment<'_>>> {
    let mut reader = Reader::new(data);
    let organization = parse_file_header(&mut reader)?;

    log::debug!("file uses {organization:?} organization");

    match organization {
        FileOrganization::Sequential => parse_segments_sequential(&mut reader),
        FileOrganization::RandomAccess => parse_segments_random_access(&mut reader),
    }
}

fn parse_file_header(reader: &mut Reader<'_>) -> Result<FileOrganization> {
    let id = reader.read_bytes(8).ok_or(ParseError::UnexpectedEof)?;
    if id != FILE_HEADER_ID {
        bail!(FormatError::InvalidHeader);
    }

    // D.4.2
    let flags = reader.read_byte().ok_or(ParseError::UnexpectedEof)?;

    // Bits 2 and 3 announce extended templates and coloured regions, neither
    // of which is supported.
    if flags & 0xFC != 0 {
        bail!(FormatError::ReservedBits);
    }

    // "Bit 1: Unknown number of pages. If this bit is 0, then the number of
    // pages contained in the file is known."
    if flags & 0x02 != 0 {
        bail!(FormatError::UnknownPageCount);
    }

    // "Bit 0: File organization type. If this bit is 0, the file uses the
    // random-access organization. If this bit is 1, the file uses the
    // sequential organization."
    let organization = if flags & 0x01 != 0 {
        FileOrganization::Sequential
    } else {
        FileOrganization::RandomAccess
    };

    // D.4.3
    let pages = reader.read_u32().ok_or(ParseError::UnexpectedEof)?;
    if pages != 1 {
        bail!(FormatError::InvalidPageCount);
    }

    Ok(organization)
}

/// The rest of a sequential file is an ordinary segment stream.
fn parse_segments_sequential<'a>(reader: &mut Reader<'a>) -> Result<Vec<Segment<'a>>> {
    let mut segments = Vec::new();

    while !reader.at_end() {
        let header = parse_segment_header(reader)?;
        segments.push(parse_segment_data(reader, header)?);
    }

    Ok(segments)
}

fn parse_segments_random_access<'a>(reader: &mut Reader<'a>) -> Result<Vec<Segment<'a>>> {
    let mut headers: Vec<SegmentHeader> = Vec::new();

    while !reader.at_end() {
        let header = parse_segment_header(reader)?;

        // "If a file contains an end of file segment, it must be the last
        // segment." (7.4.11)
        let is_eof = header.segment_type == SegmentType::EndOfFile;
        headers.push(header);

        if is_eof {
            break;
        }
    }

    let mut segments = Vec::with_capacity(headers.len());

    for header in headers {
        // The data of a segment can only be found if all segments before it
        // declare their length.
        if header.data_length.is_none() {
            bail!(FormatError::UnknownDataLength);
        }

        let segment = parse_segment_data(reader, header)?;

        if !matches!(
            segment.header.segment_type,
            SegmentType::EndOfPage | SegmentType::EndOfFile
        ) {
            segments.push(segment);
        }
    }

    Ok(segments)
}
