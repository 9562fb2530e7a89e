/*!
A memory-safe, pure-Rust decoder for JBIG2 segment streams.

`jbig2-core` decodes JBIG2 images as specified in ITU-T T.88 (also known as
ISO/IEC 14492), in the form in which they are embedded in PDF documents: an
optional global segment stream that several images share, followed by the
local segment stream of one image. Both are decoded into a single page
bitmap, which is returned packed to one bit per pixel.

Standalone JBIG2 files in sequential or random-access organisation can be
decoded with [`decode_file`].

# Example
```rust,no_run
use jbig2_core::{Decoder, MaskingType, Report};

let global = std::fs::read("global.jb2").unwrap();
let local = std::fs::read("local.jb2").unwrap();

let mut reports: Vec<Report> = Vec::new();
let image = Decoder::new(&global, &local)
    .decode(MaskingType::None, &mut reports)
    .unwrap();

println!("{}x{} image, {} warnings", image.width, image.height, reports.len());
```

# Unsupported features
Pattern dictionaries, halftone regions and refinement/aggregate coded
symbol dictionaries are rejected with [`DecodeError::Unsupported`].

# Safety
This crate forbids unsafe code via a crate-level attribute.
*/

#![forbid(unsafe_code)]

mod arithmetic;
mod bitmap;
mod decode;
mod error;
mod file;
mod huffman;
mod integer;
mod page_info;
mod reader;
mod report;
mod segment;
mod store;

#[cfg(test)]
#[path = "../tests/common/mq.rs"]
mod mq;

use decode::{generic, refinement, symbol, text};
use page_info::{Page, parse_page_information};
use reader::Reader;
use segment::{Segment, SegmentHeader, SegmentType, parse_segment_data, parse_segment_header};
use store::{SegmentStore, StoredSegment};

pub use bitmap::MAX_PIXELS;
pub use decode::MAX_BITMAP_SIZE;
pub use error::{
    DecodeError, FormatError, HuffmanError, ParseError, RegionError, Result, SegmentError,
    SymbolError, TemplateError,
};
pub use report::{LogReporter, Report, Reporter, Severity};

use bitmap::{Bitmap, CombinationOperator};
use decode::RegionInfo;
use error::bail;
use huffman::HuffmanTable;

/// How the decoded image is going to be used by the caller.
///
/// The decoder doesn't interpret this value, it is handed back unchanged in
/// the [`PackedImage`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MaskingType {
    /// A regular image.
    #[default]
    None,
    /// A stencil mask.
    ImageMask,
    /// A soft mask.
    SoftMask,
}

/// A decoded page, packed to one bit per pixel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackedImage {
    /// The width of the image in pixels.
    pub width: u32,
    /// The height of the image in pixels.
    pub height: u32,
    /// The number of bytes per row. Every row is padded to a whole byte.
    pub stride: usize,
    /// The rows of the image, most significant bit first. A set bit is a
    /// set (black) pixel.
    pub data: Vec<u8>,
    /// The masking type the image was decoded for.
    pub masking: MaskingType,
}

impl PackedImage {
    /// Whether the pixel at the given position is set. Positions outside of
    /// the image are never set.
    pub fn pixel(&self, x: u32, y: u32) -> bool {
        if x >= self.width || y >= self.height {
            return false;
        }

        let byte = self.data[y as usize * self.stride + x as usize / 8];
        byte & (0x80 >> (x % 8)) != 0
    }

    /// Convert the image into an 8-bit grayscale image, with set pixels
    /// black and all others white.
    #[cfg(feature = "image")]
    pub fn to_luma8(&self) -> image::GrayImage {
        image::GrayImage::from_fn(self.width, self.height, |x, y| {
            image::Luma([if self.pixel(x, y) { 0 } else { 255 }])
        })
    }
}

/// A decoder for the segment streams of one embedded JBIG2 image.
#[derive(Debug, Clone, Copy)]
pub struct Decoder<'a> {
    global: &'a [u8],
    local: &'a [u8],
}

impl<'a> Decoder<'a> {
    /// Create a decoder for the given global and local segment data. Either
    /// may be empty.
    pub fn new(global: &'a [u8], local: &'a [u8]) -> Self {
        Self { global, local }
    }

    /// Decode the global and then the local segments into one page.
    ///
    /// Warnings go to `reporter`. If decoding fails, the error is reported
    /// as well before it is returned.
    pub fn decode(self, masking: MaskingType, reporter: &mut impl Reporter) -> Result<PackedImage> {
        let result = self.decode_streams(masking, reporter);
        report_failure(result, reporter)
    }

    fn decode_streams(self, masking: MaskingType, reporter: &mut impl Reporter) -> Result<PackedImage> {
        let mut ctx = DecodeContext::new();

        for data in [self.global, self.local] {
            if !data.is_empty() {
                ctx.process_stream(data, reporter)?;
            }
        }

        ctx.finish(masking)
    }
}

/// Decode an embedded JBIG2 image, reporting warnings through the `log`
/// crate.
///
/// # Example
/// ```rust,no_run
/// use jbig2_core::MaskingType;
///
/// let data = std::fs::read("image.jb2").unwrap();
/// let image = jbig2_core::decode(&[], &data, MaskingType::None).unwrap();
/// assert_eq!(image.data.len(), image.stride * image.height as usize);
/// ```
pub fn decode(global: &[u8], local: &[u8], masking: MaskingType) -> Result<PackedImage> {
    Decoder::new(global, local).decode(masking, &mut LogReporter)
}

/// Decode a standalone JBIG2 file (Annex D) that contains a single page.
pub fn decode_file(data: &[u8], reporter: &mut impl Reporter) -> Result<PackedImage> {
    let result = decode_file_segments(data, reporter);
    report_failure(result, reporter)
}

fn decode_file_segments(data: &[u8], reporter: &mut impl Reporter) -> Result<PackedImage> {
    let segments = file::parse_file(data)?;
    let mut ctx = DecodeContext::new();

    for segment in &segments {
        ctx.process_segment(segment, reporter)?;
    }

    ctx.finish(MaskingType::None)
}

fn report_failure<T>(result: Result<T>, reporter: &mut impl Reporter) -> Result<T> {
    if let Err(e) = &result {
        reporter.report(Severity::Error, &e.to_string());
    }

    result
}

/// The state of one decode: the page and every stored segment result.
struct DecodeContext {
    /// `None` until the page information segment is processed.
    page: Option<Page>,
    store: SegmentStore,
}

impl DecodeContext {
    fn new() -> Self {
        Self {
            page: None,
            store: SegmentStore::new(),
        }
    }

    /// Process all segments of a segment stream, in order.
    fn process_stream(&mut self, data: &[u8], reporter: &mut impl Reporter) -> Result<()> {
        let mut reader = Reader::new(data);

        while !reader.at_end() {
            let header = parse_segment_header(&mut reader)?;
            let segment = parse_segment_data(&mut reader, header)?;
            self.process_segment(&segment, reporter)?;
        }

        Ok(())
    }

    /// Process one segment and check that its data was consumed.
    fn process_segment(&mut self, segment: &Segment<'_>, reporter: &mut impl Reporter) -> Result<()> {
        let header = &segment.header;

        log::debug!(
            "segment {}: {:?}{}, page {}, {} bytes, refers to {:?}",
            header.number,
            header.segment_type,
            match (header.immediate, header.lossless) {
                (true, true) => " (immediate lossless)",
                (true, false) => " (immediate)",
                _ => "",
            },
            header.page_association,
            segment.data.len(),
            header.referred_segments
        );

        let mut reader = Reader::new(segment.data);

        self.dispatch(segment, &mut reader, reporter)
            .map_err(|e| match e {
                // The reader ends with the segment, so reading past its end
                // means the handler overran the segment data.
                DecodeError::Parse(ParseError::UnexpectedEof) => SegmentError::DataOverrun.into(),
                e => e,
            })?;

        let left = segment.data.len().saturating_sub(reader.position());
        if left > 0 {
            reporter.report(
                Severity::Warning,
                &format!("handler doesn't process all segment data - {left} bytes left"),
            );
        }

        Ok(())
    }

    fn dispatch(
        &mut self,
        segment: &Segment<'_>,
        reader: &mut Reader<'_>,
        reporter: &mut impl Reporter,
    ) -> Result<()> {
        let header = &segment.header;

        match header.segment_type {
            // 7.4.2
            SegmentType::SymbolDictionary => {
                let mut references = self.store.references(&header.referred_segments)?;
                let dictionary = symbol::decode(reader, &mut references, reporter)?;
                self.store
                    .insert(header.number, StoredSegment::SymbolDictionary(dictionary));
            }
            // 7.4.3
            SegmentType::TextRegion => {
                let mut references = self.store.references(&header.referred_segments)?;
                let (info, region) = text::decode(reader, &mut references)?;
                self.finish_region(header, &info, region)?;
            }
            SegmentType::PatternDictionary => {
                bail!(DecodeError::Unsupported("pattern dictionaries"));
            }
            SegmentType::HalftoneRegion => {
                bail!(DecodeError::Unsupported("halftone regions"));
            }
            // 7.4.6
            SegmentType::GenericRegion => {
                let (info, region) = generic::decode_region(reader, header.data_length.is_none())?;
                self.finish_region(header, &info, region)?;
            }
            // 7.4.7
            SegmentType::GenericRefinementRegion => {
                let refinement_header = refinement::parse_header(reader)?;
                let info = refinement_header.info;

                // "3) Determine the buffer associated with the region segment
                // that this segment refers to." (7.4.7.5)
                let reference = match header.referred_segments.as_slice() {
                    [] => {
                        // "If there are no referred-to segments, then use the
                        // page bitmap as the reference buffer."
                        if info.operator != CombinationOperator::Replace {
                            bail!(RegionError::InvalidPageRefinement);
                        }

                        self.page()?.region(&info)?
                    }
                    [number] => self.store.take_bitmap(*number)?,
                    _ => bail!(RegionError::InvalidReferenceCount),
                };

                let region = refinement::decode_region(reader, &refinement_header, &reference)?;
                self.finish_region(header, &info, region)?;
            }
            // 7.4.8
            SegmentType::PageInformation => {
                let info = parse_page_information(reader)?;

                log::debug!(
                    "page is {} x {:?}, striped: {}, maximum stripe size: {}",
                    info.width,
                    info.height,
                    info.striped,
                    info.max_stripe_size
                );

                self.page = Some(Page::new(info)?);
            }
            // 7.4.9 and 7.4.11
            SegmentType::EndOfPage | SegmentType::EndOfFile => {
                if !segment.data.is_empty() {
                    bail!(FormatError::NonEmptyEndSegment);
                }

                let message = if header.segment_type == SegmentType::EndOfPage {
                    "end-of-page segment detected and ignored"
                } else {
                    "end-of-file segment detected and ignored"
                };
                reporter.report(Severity::Warning, message);
            }
            // 7.4.10 and 7.4.12
            SegmentType::EndOfStripe | SegmentType::Profiles => reader.skip_to_end(),
            // 7.4.13
            SegmentType::Tables => {
                let table = HuffmanTable::parse(reader)?;
                self.store
                    .insert(header.number, StoredSegment::HuffmanTable(table));
            }
            // 7.4.14
            SegmentType::Extension => {
                let extension = reader.read_u32().ok_or(ParseError::UnexpectedEof)?;

                // "Bit 31: Necessary. If this bit is 1, then the decoder must
                // be able to understand the extension to decode the page."
                if extension & 0x8000_0000 != 0 {
                    bail!(SegmentError::NecessaryExtension);
                }

                log::debug!("skipping extension {:#x}", extension & 0x3FFF_FFFF);
                reader.skip_to_end();
            }
        }

        Ok(())
    }

    fn page(&self) -> Result<&Page> {
        self.page
            .as_ref()
            .ok_or_else(|| FormatError::MissingPageInfo.into())
    }

    /// Combine an immediate region into the page, or store an intermediate
    /// one for later segments.
    fn finish_region(
        &mut self,
        header: &SegmentHeader,
        info: &RegionInfo,
        region: Bitmap,
    ) -> Result<()> {
        if header.immediate {
            let page = self
                .page
                .as_mut()
                .ok_or(FormatError::MissingPageInfo)?;
            page.paint(&region, info)
        } else {
            self.store
                .insert(header.number, StoredSegment::Bitmap(region));
            Ok(())
        }
    }

    /// Pack the page bitmap.
    fn finish(self, masking: MaskingType) -> Result<PackedImage> {
        let bitmap = self
            .page
            .ok_or(FormatError::MissingPageInfo)?
            .into_bitmap();
        let (stride, data) = bitmap.pack();

        Ok(PackedImage {
            width: bitmap.width(),
            height: bitmap.height(),
            stride,
            data,
            masking,
        })
    }
}
