//! Errors that abort decoding.
//!
//! Problems that still leave a usable image are not errors. Those go to the
//! [`Reporter`](crate::Reporter) as warnings.

use core::fmt;

/// Why decoding a segment stream failed.
///
/// Every error is fatal: once one is returned, no part of the image is
/// usable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeError {
    /// The data ended too early.
    Parse(ParseError),
    /// The file header or the page structure is broken.
    Format(FormatError),
    /// A segment header is broken or refers to an unusable segment.
    Segment(SegmentError),
    /// Huffman coded data or a Huffman table is broken.
    Huffman(HuffmanError),
    /// A region has invalid parameters.
    Region(RegionError),
    /// A region uses a template that doesn't exist.
    Template(TemplateError),
    /// A symbol dictionary or the symbols of a text region are broken.
    Symbol(SymbolError),
    /// The MMR coded data of a bitmap is broken.
    Mmr(jbig2_mmr::DecodeError),
    /// A decoded value or a coordinate computed from it doesn't fit into
    /// 32 bits.
    Overflow,
    /// A part of the format that this decoder does not implement.
    Unsupported(&'static str),
}

/// Reading past the end of the data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseError {
    /// The data ended in the middle of a field.
    UnexpectedEof,
}

/// Problems with the file header or the page structure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatError {
    /// The file doesn't start with the JBIG2 ID string.
    InvalidHeader,
    /// A reserved flag bit is set.
    ReservedBits,
    /// The file does not declare its number of pages.
    UnknownPageCount,
    /// The file does not contain exactly one page.
    InvalidPageCount,
    /// A region appeared before the page information segment.
    MissingPageInfo,
    /// An end of page or end of file segment carries data.
    NonEmptyEndSegment,
    /// A segment other than an immediate generic region has an unknown length.
    UnknownDataLength,
}

/// Problems with segment headers and references between segments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentError {
    /// The segment type is reserved.
    UnknownType,
    /// The referred-to segment count field is malformed.
    InvalidReferredCount,
    /// A segment refers to a segment that doesn't precede it.
    InvalidReference,
    /// A referred-to segment is missing or has the wrong type.
    MissingReference,
    /// A region of unknown length doesn't end with an end sequence.
    MissingEndMarker,
    /// A segment handler read past the end of the segment data.
    DataOverrun,
    /// An extension segment that must be understood was encountered.
    NecessaryExtension,
}

/// Problems with Huffman tables and Huffman coded data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HuffmanError {
    /// The data contains a code that is not in the table.
    InvalidCode,
    /// A table selection field uses a reserved value.
    InvalidSelection,
    /// A custom table was selected, but no referred-to table is left.
    MissingTables,
    /// Referred Huffman tables were left unused.
    UnusedTables,
    /// An out-of-band value where a number is required.
    UnexpectedOob,
    /// Too many codes of one length to form a prefix code.
    PrefixOverflow,
    /// A custom table has an invalid value range.
    InvalidTable,
    /// An invalid run code in a symbol ID code table.
    InvalidRunCode,
}

/// Invalid region parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegionError {
    /// The combination operator is reserved.
    InvalidCombinationOperator,
    /// A width, height or offset is zero or too large.
    InvalidDimension,
    /// A refinement reference has a different size than the region.
    ReferenceSizeMismatch,
    /// A refinement region refers to more than one segment.
    InvalidReferenceCount,
    /// A refinement of the page bitmap must use the replace operator.
    InvalidPageRefinement,
}

/// Invalid template selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemplateError {
    /// The template number doesn't exist for the region type.
    Invalid,
}

/// Problems with symbols and symbol dictionaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolError {
    /// A text region refers to no symbols at all.
    NoSymbols,
    /// More symbols or instances were decoded than declared.
    TooManySymbols,
    /// A symbol ID is not below the number of available symbols.
    OutOfRange,
    /// An out-of-band value where a number is required.
    UnexpectedOob,
    /// A symbol dictionary flag combination is not allowed.
    InvalidFlags,
    /// Arithmetic contexts were to be reused but no dictionary retained them.
    MissingContext,
    /// An export run length is negative.
    InvalidExportRun,
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Parse(e) => fmt::Display::fmt(e, f),
            Self::Format(e) => fmt::Display::fmt(e, f),
            Self::Segment(e) => fmt::Display::fmt(e, f),
            Self::Huffman(e) => fmt::Display::fmt(e, f),
            Self::Region(e) => fmt::Display::fmt(e, f),
            Self::Template(e) => fmt::Display::fmt(e, f),
            Self::Symbol(e) => fmt::Display::fmt(e, f),
            Self::Mmr(e) => write!(f, "MMR data: {e}"),
            Self::Overflow => f.write_str("value out of range"),
            Self::Unsupported(what) => write!(f, "{what} are not supported"),
        }
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::UnexpectedEof => "data ended unexpectedly",
        })
    }
}

impl fmt::Display for FormatError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::InvalidHeader => "not a JBIG2 file",
            Self::ReservedBits => "reserved flag bits are set",
            Self::UnknownPageCount => "file doesn't declare its number of pages",
            Self::InvalidPageCount => "file must contain exactly one page",
            Self::MissingPageInfo => "no page information segment before the first region",
            Self::NonEmptyEndSegment => "end of page or end of file segment has data",
            Self::UnknownDataLength => "segment data length is unknown",
        })
    }
}

impl fmt::Display for SegmentError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::UnknownType => "reserved segment type",
            Self::InvalidReferredCount => "malformed referred-to segment count",
            Self::InvalidReference => "segment refers to a later segment",
            Self::MissingReference => "referred-to segment is missing or has wrong type",
            Self::MissingEndMarker => "region of unknown length has no end sequence",
            Self::DataOverrun => "segment handler read past the segment data",
            Self::NecessaryExtension => "unsupported necessary extension segment",
        })
    }
}

impl fmt::Display for HuffmanError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::InvalidCode => "code not found in Huffman table",
            Self::InvalidSelection => "reserved Huffman table selection",
            Self::MissingTables => "custom Huffman table selected but none left",
            Self::UnusedTables => "referred Huffman tables were not used",
            Self::UnexpectedOob => "out-of-band value where a number is required",
            Self::PrefixOverflow => "too many Huffman codes of the same length",
            Self::InvalidTable => "invalid custom Huffman table",
            Self::InvalidRunCode => "invalid symbol ID run code",
        })
    }
}

impl fmt::Display for RegionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::InvalidCombinationOperator => "reserved combination operator",
            Self::InvalidDimension => "region size or position out of range",
            Self::ReferenceSizeMismatch => "reference bitmap has a different size",
            Self::InvalidReferenceCount => "refinement region has invalid references",
            Self::InvalidPageRefinement => "page refinement must use the replace operator",
        })
    }
}

impl fmt::Display for TemplateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Invalid => "no such template",
        })
    }
}

impl fmt::Display for SymbolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::NoSymbols => "text region without symbols",
            Self::TooManySymbols => "more symbols than declared",
            Self::OutOfRange => "symbol ID out of range",
            Self::UnexpectedOob => "out-of-band value where a symbol is required",
            Self::InvalidFlags => "invalid symbol dictionary flags",
            Self::MissingContext => "no retained arithmetic contexts to reuse",
            Self::InvalidExportRun => "negative export run length",
        })
    }
}

/// Convert each kind of error into its [`DecodeError`] variant.
macro_rules! wrap_errors {
    ($($kind:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$kind> for DecodeError {
                fn from(e: $kind) -> Self {
                    Self::$variant(e)
                }
            }
        )*
    };
}

wrap_errors! {
    ParseError => Parse,
    FormatError => Format,
    SegmentError => Segment,
    HuffmanError => Huffman,
    RegionError => Region,
    TemplateError => Template,
    SymbolError => Symbol,
    jbig2_mmr::DecodeError => Mmr,
}

impl core::error::Error for DecodeError {}
impl core::error::Error for ParseError {}
impl core::error::Error for FormatError {}
impl core::error::Error for SegmentError {}
impl core::error::Error for HuffmanError {}
impl core::error::Error for RegionError {}
impl core::error::Error for TemplateError {}
impl core::error::Error for SymbolError {}

/// The result of a decoding step.
pub type Result<T> = core::result::Result<T, DecodeError>;

macro_rules! bail {
    ($err:expr) => {
        return Err($err.into())
    };
}

macro_rules! err {
    ($err:expr) => {
        Err($err.into())
    };
}

pub(crate) use bail;
pub(crate) use err;
