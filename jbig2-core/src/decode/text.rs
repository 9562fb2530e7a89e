//! Text region decoding (6.4, 7.4.3).

use super::refinement::{self, RefinementParams};
use super::{AtPixel, RegionInfo, parse_at_pixels, parse_region_info};
use crate::arithmetic::{ArithmeticDecoder, ArithmeticState};
use crate::bitmap::{Bitmap, CombinationOperator, SET, UNSET};
use crate::error::{DecodeError, HuffmanError, ParseError, RegionError, Result, SymbolError, bail};
use crate::huffman::{HuffmanTable, LineKind, StandardTable, TableLine};
use crate::integer::{IntegerDecoder, SymbolIdDecoder};
use crate::reader::Reader;
use crate::store::References;

/// Decode a text region segment (7.4.3.2) into its region bitmap.
pub(crate) fn decode(
    reader: &mut Reader<'_>,
    references: &mut References<'_>,
) -> Result<(RegionInfo, Bitmap)> {
    let header = parse_header(reader)?;

    // "SBNUMSYMS: the total number of symbols in all the referred-to symbol
    // dictionaries."
    let symbols = references.symbols();
    if symbols.is_empty() {
        bail!(SymbolError::NoSymbols);
    }
    let num_symbols = u32::try_from(symbols.len()).map_err(|_| SymbolError::TooManySymbols)?;

    let mut coding = match &header.huffman {
        Some(selection) => {
            let tables = select_tables(references, selection)?;
            // 7.4.3.1.7
            let symbol_ids = decode_symbol_id_table(reader, num_symbols)?;

            Coding::Huffman { tables, symbol_ids }
        }
        None => {
            let decoder = ArithmeticDecoder::new(reader.tail());
            reader.skip_to_end();

            Coding::Arithmetic {
                decoder,
                contexts: IntegerContexts::new(symbol_code_length(num_symbols)),
                refinement_state: ArithmeticState::new(refinement::context_bits(
                    header.flags.refinement_template,
                )),
            }
        }
    };

    let region = decode_instances(reader, &mut coding, &symbols, &header)?;

    if let Coding::Huffman { .. } = coding {
        reader.align();
    }

    Ok((header.info, region))
}

/// SBSYMCODELEN, the number of bits of an arithmetically coded symbol ID.
fn symbol_code_length(num_symbols: u32) -> u32 {
    if num_symbols <= 1 {
        0
    } else {
        u32::BITS - (num_symbols - 1).leading_zeros()
    }
}

/// Decode all symbol instances and combine them into the region bitmap
/// (6.4.5).
fn decode_instances(
    reader: &mut Reader<'_>,
    coding: &mut Coding<'_>,
    symbols: &[&Bitmap],
    header: &Header,
) -> Result<Bitmap> {
    let flags = &header.flags;

    // "1) Fill a bitmap SBREG, of the size given by SBW and SBH, with the
    // SBDEFPIXEL value."
    let fill = if flags.default_pixel { SET } else { UNSET };
    let mut region = Bitmap::new(header.info.width, header.info.height, fill)?;

    let strips = 1_i32 << flags.log_strips;

    // "2) Decode the initial STRIPT value as described in 6.4.6. Negate the
    // decoded value and assign this negated value to the variable STRIPT."
    let mut strip_t = coding
        .read_strip_delta_t(reader, strips)?
        .checked_neg()
        .ok_or(DecodeError::Overflow)?;
    let mut first_s = 0_i32;
    let mut instances = 0_u32;

    // "4) Decode each strip as follows:"
    while instances < header.num_instances {
        let delta_t = coding.read_strip_delta_t(reader, strips)?;
        strip_t = strip_t.checked_add(delta_t).ok_or(DecodeError::Overflow)?;

        let mut current_s: Option<i32> = None;

        loop {
            let s = match current_s {
                None => {
                    let delta_first_s = coding.read_first_s(reader)?;
                    first_s = first_s
                        .checked_add(delta_first_s)
                        .ok_or(DecodeError::Overflow)?;
                    first_s
                }
                Some(s) => {
                    // "If the result of this decoding is OOB then the last
                    // symbol instance of the strip has been decoded."
                    let Some(delta_s) = coding.read_delta_s(reader)? else {
                        break;
                    };

                    s.checked_add(delta_s)
                        .and_then(|s| s.checked_add(flags.delta_s_offset))
                        .ok_or(DecodeError::Overflow)?
                }
            };

            if instances >= header.num_instances {
                bail!(SymbolError::TooManySymbols);
            }

            let t = strip_t
                .checked_add(coding.read_instance_t(reader, flags.log_strips)?)
                .ok_or(DecodeError::Overflow)?;

            let id = coding.read_symbol_id(reader)?;
            let symbol = *symbols.get(id).ok_or(SymbolError::OutOfRange)?;

            let refined = if flags.refine && coding.read_refinement_flag(reader)? {
                Some(coding.refine(reader, symbol, header)?)
            } else {
                None
            };
            let bitmap = refined.as_ref().unwrap_or(symbol);

            let next_s = place(&mut region, bitmap, s, t, flags)?;
            current_s = Some(next_s);
            instances += 1;
        }
    }

    Ok(region)
}

/// Combine one symbol instance into the region and return the updated
/// CURS (6.4.5, steps 3 c) x) to xi)).
fn place(region: &mut Bitmap, symbol: &Bitmap, s: i32, t: i32, flags: &Flags) -> Result<i32> {
    let width = i32::try_from(symbol.width()).map_err(|_| RegionError::InvalidDimension)?;
    let height = i32::try_from(symbol.height()).map_err(|_| RegionError::InvalidDimension)?;

    // The extent of the symbol along the S axis, minus one.
    let extent = (if flags.transposed { height } else { width }) - 1;

    // Whether the reference corner sits at the far end of the S axis.
    let corner_at_end = if flags.transposed {
        flags.reference_corner.is_bottom()
    } else {
        flags.reference_corner.is_right()
    };

    let overflow = || DecodeError::Overflow;

    let s = if corner_at_end {
        s.checked_add(extent).ok_or_else(overflow)?
    } else {
        s
    };

    let (x, y) = if flags.transposed { (t, s) } else { (s, t) };
    let x = if flags.reference_corner.is_right() {
        x.checked_sub(width - 1).ok_or_else(overflow)?
    } else {
        x
    };
    let y = if flags.reference_corner.is_bottom() {
        y.checked_sub(height - 1).ok_or_else(overflow)?
    } else {
        y
    };

    region.paint(symbol, x, y, flags.operator, None)?;

    if corner_at_end {
        Ok(s)
    } else {
        s.checked_add(extent).ok_or_else(overflow)
    }
}

/// The integer decoders of an arithmetically coded text region (Table 31).
struct IntegerContexts {
    /// IADT.
    strip_delta_t: IntegerDecoder,
    /// IAFS.
    first_s: IntegerDecoder,
    /// IADS.
    delta_s: IntegerDecoder,
    /// IAIT.
    instance_t: IntegerDecoder,
    /// IAID.
    symbol_id: SymbolIdDecoder,
    /// IARI.
    refinement: IntegerDecoder,
    /// IARDW.
    refinement_width: IntegerDecoder,
    /// IARDH.
    refinement_height: IntegerDecoder,
    /// IARDX.
    refinement_x: IntegerDecoder,
    /// IARDY.
    refinement_y: IntegerDecoder,
}

impl IntegerContexts {
    fn new(symbol_code_length: u32) -> Self {
        Self {
            strip_delta_t: IntegerDecoder::new(),
            first_s: IntegerDecoder::new(),
            delta_s: IntegerDecoder::new(),
            instance_t: IntegerDecoder::new(),
            symbol_id: SymbolIdDecoder::new(symbol_code_length),
            refinement: IntegerDecoder::new(),
            refinement_width: IntegerDecoder::new(),
            refinement_height: IntegerDecoder::new(),
            refinement_x: IntegerDecoder::new(),
            refinement_y: IntegerDecoder::new(),
        }
    }
}

/// The Huffman tables of a text region (7.4.3.1.6).
struct HuffmanTables<'a> {
    first_s: &'a HuffmanTable,
    delta_s: &'a HuffmanTable,
    delta_t: &'a HuffmanTable,
    refinement_width: &'a HuffmanTable,
    refinement_height: &'a HuffmanTable,
    refinement_x: &'a HuffmanTable,
    refinement_y: &'a HuffmanTable,
    refinement_size: &'a HuffmanTable,
}

/// The coding specific part of text region decoding.
enum Coding<'a> {
    Huffman {
        tables: HuffmanTables<'a>,
        /// SBSYMCODES.
        symbol_ids: HuffmanTable,
    },
    Arithmetic {
        decoder: ArithmeticDecoder<'a>,
        contexts: IntegerContexts,
        /// The refinement statistics, shared by all refined instances.
        refinement_state: ArithmeticState,
    },
}

impl Coding<'_> {
    /// Decode a strip delta T, already multiplied by SBSTRIPS (6.4.6).
    fn read_strip_delta_t(&mut self, reader: &mut Reader<'_>, strips: i32) -> Result<i32> {
        let value = match self {
            Self::Huffman { tables, .. } => tables.delta_t.decode_value(reader)?,
            Self::Arithmetic {
                decoder, contexts, ..
            } => contexts
                .strip_delta_t
                .decode_value(decoder, SymbolError::UnexpectedOob)?,
        };

        value.checked_mul(strips).ok_or(DecodeError::Overflow)
    }

    /// Decode the S coordinate delta of the first instance of a strip
    /// (6.4.7).
    fn read_first_s(&mut self, reader: &mut Reader<'_>) -> Result<i32> {
        match self {
            Self::Huffman { tables, .. } => tables.first_s.decode_value(reader),
            Self::Arithmetic {
                decoder, contexts, ..
            } => contexts
                .first_s
                .decode_value(decoder, SymbolError::UnexpectedOob),
        }
    }

    /// Decode the S coordinate delta of a following instance (6.4.8).
    fn read_delta_s(&mut self, reader: &mut Reader<'_>) -> Result<Option<i32>> {
        match self {
            Self::Huffman { tables, .. } => tables.delta_s.decode(reader),
            Self::Arithmetic {
                decoder, contexts, ..
            } => contexts.delta_s.decode(decoder),
        }
    }

    /// Decode the T coordinate of an instance within its strip (6.4.9).
    fn read_instance_t(&mut self, reader: &mut Reader<'_>, log_strips: u8) -> Result<i32> {
        // "If SBSTRIPS = 1, then the value decoded is always zero."
        if log_strips == 0 {
            return Ok(0);
        }

        match self {
            Self::Huffman { .. } => {
                let value = reader
                    .read_bits(log_strips)
                    .ok_or(ParseError::UnexpectedEof)?;
                Ok(value as i32)
            }
            Self::Arithmetic {
                decoder, contexts, ..
            } => contexts
                .instance_t
                .decode_value(decoder, SymbolError::UnexpectedOob),
        }
    }

    /// Decode the symbol ID of an instance (6.4.10).
    fn read_symbol_id(&mut self, reader: &mut Reader<'_>) -> Result<usize> {
        match self {
            Self::Huffman { symbol_ids, .. } => {
                let id = symbol_ids.decode_value(reader)?;
                usize::try_from(id).map_err(|_| SymbolError::OutOfRange.into())
            }
            Self::Arithmetic {
                decoder, contexts, ..
            } => Ok(contexts.symbol_id.decode(decoder) as usize),
        }
    }

    /// Decode R_I, whether the instance is refined (6.4.11).
    fn read_refinement_flag(&mut self, reader: &mut Reader<'_>) -> Result<bool> {
        match self {
            Self::Huffman { .. } => {
                let bit = reader.read_bit().ok_or(ParseError::UnexpectedEof)?;
                Ok(bit == 1)
            }
            Self::Arithmetic {
                decoder, contexts, ..
            } => {
                let value = contexts
                    .refinement
                    .decode_value(decoder, SymbolError::UnexpectedOob)?;
                Ok(value != 0)
            }
        }
    }

    /// Decode RDW, RDH, RDX and RDY (6.4.11.1).
    fn read_refinement_deltas(&mut self, reader: &mut Reader<'_>) -> Result<[i32; 4]> {
        match self {
            Self::Huffman { tables, .. } => Ok([
                tables.refinement_width.decode_value(reader)?,
                tables.refinement_height.decode_value(reader)?,
                tables.refinement_x.decode_value(reader)?,
                tables.refinement_y.decode_value(reader)?,
            ]),
            Self::Arithmetic {
                decoder, contexts, ..
            } => Ok([
                contexts
                    .refinement_width
                    .decode_value(decoder, SymbolError::UnexpectedOob)?,
                contexts
                    .refinement_height
                    .decode_value(decoder, SymbolError::UnexpectedOob)?,
                contexts
                    .refinement_x
                    .decode_value(decoder, SymbolError::UnexpectedOob)?,
                contexts
                    .refinement_y
                    .decode_value(decoder, SymbolError::UnexpectedOob)?,
            ]),
        }
    }

    /// Decode a refined instance bitmap with `symbol` as its reference
    /// (6.4.11.1).
    fn refine(
        &mut self,
        reader: &mut Reader<'_>,
        symbol: &Bitmap,
        header: &Header,
    ) -> Result<Bitmap> {
        let [rdw, rdh, rdx, rdy] = self.read_refinement_deltas(reader)?;

        let width = symbol
            .width()
            .checked_add_signed(rdw)
            .ok_or(RegionError::InvalidDimension)?;
        let height = symbol
            .height()
            .checked_add_signed(rdh)
            .ok_or(RegionError::InvalidDimension)?;

        // "GRREFERENCEDX = ⌊RDW / 2⌋ + RDX", "GRREFERENCEDY = ⌊RDH / 2⌋ + RDY"
        let reference_dx = rdw
            .div_euclid(2)
            .checked_add(rdx)
            .ok_or(DecodeError::Overflow)?;
        let reference_dy = rdh
            .div_euclid(2)
            .checked_add(rdy)
            .ok_or(DecodeError::Overflow)?;

        let template = header.flags.refinement_template;
        let params = RefinementParams {
            width,
            height,
            template,
            reference: symbol,
            reference_dx,
            reference_dy,
            typical_prediction: false,
            at_pixels: &header.refinement_at_pixels,
        };

        match self {
            Self::Huffman { tables, .. } => {
                // "BMSIZE: the size in bytes of the refinement bitmap data"
                let size = tables.refinement_size.decode_value(reader)?;
                let size = usize::try_from(size).map_err(|_| RegionError::InvalidDimension)?;
                reader.align();

                let data = reader.read_bytes(size).ok_or(ParseError::UnexpectedEof)?;
                let mut decoder = ArithmeticDecoder::new(data);
                let mut state = ArithmeticState::new(refinement::context_bits(template));

                refinement::decode_bitmap(&mut decoder, &mut state, &params)
            }
            Self::Arithmetic {
                decoder,
                refinement_state,
                ..
            } => refinement::decode_bitmap(decoder, refinement_state, &params),
        }
    }
}

/// Select the Huffman tables of a text region (7.4.3.1.6).
fn select_tables<'a>(
    references: &mut References<'a>,
    selection: &HuffmanSelection,
) -> Result<HuffmanTables<'a>> {
    use StandardTable::*;

    // The custom tables are used in the order of the selection fields.
    Ok(HuffmanTables {
        first_s: references.select_table(selection.first_s, 3, &[F, G])?,
        delta_s: references.select_table(selection.delta_s, 3, &[H, I, J])?,
        delta_t: references.select_table(selection.delta_t, 3, &[K, L, M])?,
        refinement_width: references.select_table(selection.refinement_width, 3, &[N, O])?,
        refinement_height: references.select_table(selection.refinement_height, 3, &[N, O])?,
        refinement_x: references.select_table(selection.refinement_x, 3, &[N, O])?,
        refinement_y: references.select_table(selection.refinement_y, 3, &[N, O])?,
        refinement_size: references.select_table(selection.refinement_size, 1, &[A])?,
    })
}

/// Read the run code lengths and the symbol ID code lengths, and build the
/// symbol ID Huffman table (7.4.3.1.7).
fn decode_symbol_id_table(reader: &mut Reader<'_>, num_symbols: u32) -> Result<HuffmanTable> {
    // "1) Read the code lengths for RUNCODE0 through RUNCODE34; each is
    // stored as a four-bit value."
    let mut run_code_lines = Vec::with_capacity(35);
    for run_code in 0..35 {
        let prefix_len = reader.read_bits(4).ok_or(ParseError::UnexpectedEof)? as u8;
        run_code_lines.push(TableLine::new(run_code, prefix_len, 0, LineKind::Standard));
    }
    let run_codes = HuffmanTable::build(run_code_lines)?;

    let num_symbols = num_symbols as usize;
    let mut lengths: Vec<u8> = Vec::with_capacity(num_symbols.min(4096));

    while lengths.len() < num_symbols {
        let (length, repeat) = match run_codes.decode_value(reader)? {
            code @ 0..=31 => (code as u8, 1),
            // "Repeat the previous symbol ID code length 3 to 6 times."
            32 => {
                let previous = *lengths.last().ok_or(HuffmanError::InvalidRunCode)?;
                let extra = reader.read_bits(2).ok_or(ParseError::UnexpectedEof)?;
                (previous, extra as usize + 3)
            }
            // "Repeat a symbol ID code length of 0 for 3 to 10 times."
            33 => {
                let extra = reader.read_bits(3).ok_or(ParseError::UnexpectedEof)?;
                (0, extra as usize + 3)
            }
            // "Repeat a symbol ID code length of 0 for 11 to 138 times."
            34 => {
                let extra = reader.read_bits(7).ok_or(ParseError::UnexpectedEof)?;
                (0, extra as usize + 11)
            }
            _ => bail!(HuffmanError::InvalidRunCode),
        };

        if lengths.len() + repeat > num_symbols {
            bail!(HuffmanError::InvalidRunCode);
        }

        lengths.extend(std::iter::repeat_n(length, repeat));
    }

    // "3) Skip over the remaining bits in the last byte read"
    reader.align();

    let lines = lengths
        .iter()
        .enumerate()
        .map(|(id, &prefix_len)| TableLine::new(id as i32, prefix_len, 0, LineKind::Standard))
        .collect();

    HuffmanTable::build(lines)
}

/// REFCORNER (7.4.3.1.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ReferenceCorner {
    BottomLeft,
    TopLeft,
    BottomRight,
    TopRight,
}

impl ReferenceCorner {
    fn from_value(value: u16) -> Self {
        match value & 0x03 {
            0 => Self::BottomLeft,
            1 => Self::TopLeft,
            2 => Self::BottomRight,
            _ => Self::TopRight,
        }
    }

    fn is_right(self) -> bool {
        matches!(self, Self::BottomRight | Self::TopRight)
    }

    fn is_bottom(self) -> bool {
        matches!(self, Self::BottomLeft | Self::BottomRight)
    }
}

/// Text region segment flags (7.4.3.1.1).
#[derive(Debug, Clone, Copy)]
struct Flags {
    /// SBHUFF.
    huffman: bool,
    /// SBREFINE.
    refine: bool,
    /// LOGSBSTRIPS.
    log_strips: u8,
    /// REFCORNER.
    reference_corner: ReferenceCorner,
    /// TRANSPOSED.
    transposed: bool,
    /// SBCOMBOP.
    operator: CombinationOperator,
    /// SBDEFPIXEL.
    default_pixel: bool,
    /// SBDSOFFSET.
    delta_s_offset: i32,
    /// SBRTEMPLATE.
    refinement_template: u8,
}

impl Flags {
    fn parse(flags: u16) -> Result<Self> {
        // "Bits 10-14: SBDSOFFSET", a signed five-bit value.
        let offset = i32::from((flags >> 10) & 0x1F);
        let delta_s_offset = if offset & 0x10 != 0 { offset - 32 } else { offset };

        Ok(Self {
            huffman: flags & 0x0001 != 0,
            refine: flags & 0x0002 != 0,
            log_strips: ((flags >> 2) & 0x03) as u8,
            reference_corner: ReferenceCorner::from_value(flags >> 4),
            transposed: flags & 0x0040 != 0,
            // "Bits 7-8: SBCOMBOP", so REPLACE is not available.
            operator: CombinationOperator::from_value(((flags >> 7) & 0x03) as u8)?,
            default_pixel: flags & 0x0200 != 0,
            delta_s_offset,
            refinement_template: ((flags >> 15) & 0x01) as u8,
        })
    }
}

/// The table selection fields of the text region segment Huffman flags
/// (7.4.3.1.2).
#[derive(Debug, Clone, Copy)]
struct HuffmanSelection {
    /// SBHUFFFS.
    first_s: u16,
    /// SBHUFFDS.
    delta_s: u16,
    /// SBHUFFDT.
    delta_t: u16,
    /// SBHUFFRDW.
    refinement_width: u16,
    /// SBHUFFRDH.
    refinement_height: u16,
    /// SBHUFFRDX.
    refinement_x: u16,
    /// SBHUFFRDY.
    refinement_y: u16,
    /// SBHUFFRSIZE.
    refinement_size: u16,
}

impl HuffmanSelection {
    fn parse(flags: u16) -> Result<Self> {
        // "Bit 15: Reserved; must be 0."
        if flags & 0x8000 != 0 {
            bail!(HuffmanError::InvalidSelection);
        }

        Ok(Self {
            first_s: flags & 0x03,
            delta_s: (flags >> 2) & 0x03,
            delta_t: (flags >> 4) & 0x03,
            refinement_width: (flags >> 6) & 0x03,
            refinement_height: (flags >> 8) & 0x03,
            refinement_x: (flags >> 10) & 0x03,
            refinement_y: (flags >> 12) & 0x03,
            refinement_size: (flags >> 14) & 0x01,
        })
    }
}

/// A parsed text region segment header (7.4.3.1).
#[derive(Debug, Clone)]
struct Header {
    info: RegionInfo,
    flags: Flags,
    huffman: Option<HuffmanSelection>,
    /// SBRAT.
    refinement_at_pixels: Vec<AtPixel>,
    /// SBNUMINSTANCES.
    num_instances: u32,
}

fn parse_header(reader: &mut Reader<'_>) -> Result<Header> {
    let info = parse_region_info(reader)?;
    let flags = Flags::parse(reader.read_u16().ok_or(ParseError::UnexpectedEof)?)?;

    let huffman = if flags.huffman {
        let value = reader.read_u16().ok_or(ParseError::UnexpectedEof)?;
        Some(HuffmanSelection::parse(value)?)
    } else {
        None
    };

    // "This field is only present if SBREFINE is 1 and SBRTEMPLATE is 0."
    let refinement_at_pixels = if flags.refine && flags.refinement_template == 0 {
        parse_at_pixels(reader, 2)?
    } else {
        Vec::new()
    };

    let num_instances = reader.read_u32().ok_or(ParseError::UnexpectedEof)?;

    Ok(Header {
        info,
        flags,
        huffman,
        refinement_at_pixels,
        num_instances,
    })
}
