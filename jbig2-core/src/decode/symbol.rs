//! Symbol dictionary decoding (6.5, 7.4.2).

use super::generic::{self, GenericParams};
use super::{AtPixel, parse_at_pixels};
use crate::arithmetic::{ArithmeticDecoder, ArithmeticState};
use crate::bitmap::{Bitmap, UNSET};
use crate::error::{DecodeError, ParseError, RegionError, Result, SymbolError, bail};
use crate::huffman::{HuffmanTable, StandardTable};
use crate::integer::IntegerDecoder;
use crate::reader::Reader;
use crate::report::{Reporter, Severity};
use crate::store::References;

/// A decoded symbol dictionary.
#[derive(Debug, Clone)]
pub(crate) struct SymbolDictionary {
    /// The exported symbols, SDEXSYMS.
    pub(crate) symbols: Vec<Bitmap>,
    /// The generic region statistics, if the dictionary retained them for a
    /// later dictionary.
    pub(crate) generic_state: Option<ArithmeticState>,
}

/// Symbol dictionary flags (7.4.2.1.1).
#[derive(Debug, Clone, Copy)]
struct Flags {
    /// SDHUFF.
    huffman: bool,
    /// SDREFAGG.
    refinement: bool,
    /// SDHUFFDH.
    delta_height_table: u16,
    /// SDHUFFDW.
    delta_width_table: u16,
    /// SDHUFFBMSIZE.
    bitmap_size_table: u16,
    /// SDHUFFAGGINST.
    aggregate_instance_table: u16,
    context_used: bool,
    context_retained: bool,
    /// SDTEMPLATE.
    template: u8,
    /// SDRTEMPLATE.
    refinement_template: u8,
}

impl Flags {
    fn parse(flags: u16) -> Result<Self> {
        // "Bits 13-15: Reserved; must be 0."
        if flags >> 13 != 0 {
            bail!(SymbolError::InvalidFlags);
        }

        let parsed = Self {
            huffman: flags & 0x0001 != 0,
            refinement: flags & 0x0002 != 0,
            delta_height_table: (flags >> 2) & 0x03,
            delta_width_table: (flags >> 4) & 0x03,
            bitmap_size_table: (flags >> 6) & 0x01,
            aggregate_instance_table: (flags >> 7) & 0x01,
            context_used: flags & 0x0100 != 0,
            context_retained: flags & 0x0200 != 0,
            template: ((flags >> 10) & 0x03) as u8,
            refinement_template: ((flags >> 12) & 0x01) as u8,
        };

        parsed.validate()?;

        Ok(parsed)
    }

    /// Reject the flag combinations that 7.4.2.1.1 rules out.
    fn validate(&self) -> Result<()> {
        // "If SDHUFF is 0 or SDREFAGG is 0 then this field must contain the
        // value 0." (SDHUFFAGGINST)
        if (!self.huffman || !self.refinement) && self.aggregate_instance_table != 0 {
            bail!(SymbolError::InvalidFlags);
        }

        if !self.huffman {
            if self.delta_height_table != 0
                || self.delta_width_table != 0
                || self.bitmap_size_table != 0
            {
                bail!(SymbolError::InvalidFlags);
            }
        } else {
            if !self.refinement
                && (self.context_used || self.context_retained || self.refinement_template != 0)
            {
                bail!(SymbolError::InvalidFlags);
            }

            if self.template != 0 {
                bail!(SymbolError::InvalidFlags);
            }
        }

        Ok(())
    }
}

/// A parsed symbol dictionary header (7.4.2.1).
#[derive(Debug, Clone)]
struct Header {
    flags: Flags,
    /// SDAT.
    at_pixels: Vec<AtPixel>,
    /// SDNUMEXSYMS.
    num_exported: u32,
    /// SDNUMNEWSYMS.
    num_new: u32,
}

fn parse_header(reader: &mut Reader<'_>) -> Result<Header> {
    let flags = Flags::parse(reader.read_u16().ok_or(ParseError::UnexpectedEof)?)?;

    let at_pixels = if flags.huffman {
        Vec::new()
    } else {
        parse_at_pixels(reader, generic::at_pixel_count(flags.template))?
    };

    // SDRAT. Only needed by refinement coded symbols, which are not decoded,
    // but the field still has to be skipped.
    if flags.refinement && flags.refinement_template == 0 {
        parse_at_pixels(reader, 2)?;
    }

    let num_exported = reader.read_u32().ok_or(ParseError::UnexpectedEof)?;
    let num_new = reader.read_u32().ok_or(ParseError::UnexpectedEof)?;

    Ok(Header {
        flags,
        at_pixels,
        num_exported,
        num_new,
    })
}

/// The coding specific part of symbol dictionary decoding.
enum Coding<'a> {
    Huffman {
        delta_height: &'a HuffmanTable,
        delta_width: &'a HuffmanTable,
        bitmap_size: &'a HuffmanTable,
        export_run: &'a HuffmanTable,
    },
    Arithmetic {
        decoder: ArithmeticDecoder<'a>,
        /// IADH.
        delta_height: IntegerDecoder,
        /// IADW.
        delta_width: IntegerDecoder,
        /// IAEX.
        export_run: IntegerDecoder,
        generic_state: ArithmeticState,
    },
}

/// Decode a symbol dictionary segment (7.4.2.2).
pub(crate) fn decode(
    reader: &mut Reader<'_>,
    references: &mut References<'_>,
    reporter: &mut impl Reporter,
) -> Result<SymbolDictionary> {
    let header = parse_header(reader)?;
    let flags = header.flags;

    if flags.refinement {
        bail!(DecodeError::Unsupported("refinement/aggregate coded symbols"));
    }

    // "1) [...] Set SDINSYMS to the array of symbols exported by the symbol
    // dictionary segments referred to by this segment."
    let input_symbols = references.symbols();

    let mut coding = if flags.huffman {
        // 7.4.2.1.6
        let delta_height = references.select_table(
            flags.delta_height_table,
            3,
            &[StandardTable::D, StandardTable::E],
        )?;
        let delta_width = references.select_table(
            flags.delta_width_table,
            3,
            &[StandardTable::B, StandardTable::C],
        )?;
        let bitmap_size = references.select_table(flags.bitmap_size_table, 1, &[StandardTable::A])?;
        // Only read by refinement/aggregate coding, but a custom table is
        // still consumed.
        references.select_table(flags.aggregate_instance_table, 1, &[StandardTable::A])?;
        references.check_tables_used()?;

        Coding::Huffman {
            delta_height,
            delta_width,
            bitmap_size,
            export_run: StandardTable::A.table(),
        }
    } else {
        let bits = generic::context_bits(flags.template);
        let mut generic_state = ArithmeticState::new(bits);

        // "3) If SDHUFF is 0 and bit 0 of the second byte of this segment's
        // segment data header ("bitmap coding context used") is 1, then set
        // the arithmetic coding statistics for the generic region decoding
        // procedure to the values that they contained at the end of decoding
        // the last symbol dictionary referred to by this segment."
        if flags.context_used {
            let retained = references
                .last_dictionary()
                .and_then(|dictionary| dictionary.generic_state.as_ref())
                .ok_or(SymbolError::MissingContext)?;
            generic_state.reset_from(bits, retained);
        }

        let decoder = ArithmeticDecoder::new(reader.tail());
        reader.skip_to_end();

        Coding::Arithmetic {
            decoder,
            delta_height: IntegerDecoder::new(),
            delta_width: IntegerDecoder::new(),
            export_run: IntegerDecoder::new(),
            generic_state,
        }
    };

    let new_symbols = decode_new_symbols(reader, &mut coding, &header)?;
    let exported = decode_exports(
        reader,
        &mut coding,
        &input_symbols,
        new_symbols,
        reporter,
    )?;

    if exported.len() != header.num_exported as usize {
        log::debug!(
            "symbol dictionary exports {} symbols instead of {}",
            exported.len(),
            header.num_exported
        );
    }

    let generic_state = match coding {
        Coding::Huffman { .. } => {
            reader.align();
            None
        }
        // "5) If SDHUFF is 0 and bit 1 of the second byte of this segment's
        // segment data header ("bitmap coding context retained") is 1, then
        // preserve the current contents of the arithmetic coding statistics."
        Coding::Arithmetic { generic_state, .. } => flags.context_retained.then_some(generic_state),
    };

    Ok(SymbolDictionary {
        symbols: exported,
        generic_state,
    })
}

/// Decode the height classes of new symbols (6.5.5, steps 1 to 4).
fn decode_new_symbols(
    reader: &mut Reader<'_>,
    coding: &mut Coding<'_>,
    header: &Header,
) -> Result<Vec<Bitmap>> {
    let num_new = header.num_new;
    let mut symbols = Vec::with_capacity(num_new.min(4096) as usize);

    let mut height: u32 = 0;

    while (symbols.len() as u32) < num_new {
        // "b) Decode the height class delta height as described in 6.5.6."
        let delta_height = match coding {
            Coding::Huffman { delta_height, .. } => delta_height.decode_value(reader)?,
            Coding::Arithmetic {
                decoder,
                delta_height,
                ..
            } => delta_height.decode_value(decoder, SymbolError::UnexpectedOob)?,
        };
        height = height
            .checked_add_signed(delta_height)
            .ok_or(RegionError::InvalidDimension)?;

        let mut width: u32 = 0;
        let first_symbol = symbols.len();
        // Widths of the height class for the collective bitmap.
        let mut widths = Vec::new();

        // "c) Decode each symbol within the height class as follows:"
        loop {
            let delta_width = match coding {
                Coding::Huffman { delta_width, .. } => delta_width.decode(reader)?,
                Coding::Arithmetic {
                    decoder,
                    delta_width,
                    ..
                } => delta_width.decode(decoder)?,
            };

            // "If the result of this decoding is OOB then all the symbols in
            // this height class have been decoded."
            let Some(delta_width) = delta_width else {
                break;
            };

            if (symbols.len() + widths.len()) as u32 >= num_new {
                bail!(SymbolError::TooManySymbols);
            }

            width = width
                .checked_add_signed(delta_width)
                .ok_or(RegionError::InvalidDimension)?;

            if width == 0 || height == 0 {
                bail!(RegionError::InvalidDimension);
            }

            match coding {
                Coding::Huffman { .. } => widths.push(width),
                Coding::Arithmetic {
                    decoder,
                    generic_state,
                    ..
                } => {
                    // 6.5.8.1, Table 16.
                    let params = GenericParams {
                        width,
                        height,
                        template: header.flags.template,
                        typical_prediction: false,
                        at_pixels: &header.at_pixels,
                    };
                    symbols.push(generic::decode_arithmetic(decoder, generic_state, &params)?);
                }
            }
        }

        // An empty height class makes no progress.
        if symbols.len() == first_symbol && widths.is_empty() {
            bail!(SymbolError::UnexpectedOob);
        }

        if let Coding::Huffman { bitmap_size, .. } = coding {
            let collective = decode_collective_bitmap(reader, *bitmap_size, &widths, height)?;
            symbols.extend(collective);
        }
    }

    Ok(symbols)
}

/// Read the collective bitmap of a height class and split it into its
/// symbols (6.5.9).
fn decode_collective_bitmap(
    reader: &mut Reader<'_>,
    bitmap_size: &HuffmanTable,
    widths: &[u32],
    height: u32,
) -> Result<Vec<Bitmap>> {
    let total_width = widths.iter().try_fold(0_u32, |total, &width| {
        total.checked_add(width).ok_or(RegionError::InvalidDimension)
    })?;

    // "1) Read the size in bytes using the SDHUFFBMSIZE Huffman table."
    let size = bitmap_size.decode_value(reader)?;
    let size = usize::try_from(size).map_err(|_| RegionError::InvalidDimension)?;

    // "2) Skip over any bits remaining in the last byte read."
    reader.align();

    let collective = if size == 0 {
        // "3) If BMSIZE is zero, then the bitmap is stored uncompressed, and
        // the actual size in bytes is HCHEIGHT × ⌈TOTWIDTH / 8⌉."
        let mut bitmap = Bitmap::new(total_width, height, UNSET)?;
        let stride = total_width.div_ceil(8) as usize;
        let mut rows = reader
            .read_substream(Some(stride * height as usize))
            .ok_or(ParseError::UnexpectedEof)?;

        for y in 0..height {
            let row = rows.read_bytes(stride).ok_or(ParseError::UnexpectedEof)?;
            for x in 0..total_width {
                let byte = row[(x / 8) as usize];
                bitmap.set_pixel(x, y, (byte >> (7 - x % 8)) & 1);
            }
        }

        bitmap
    } else {
        // "4) Otherwise, decode the bitmap using a generic bitmap decoding
        // procedure as described in 6.2." (MMR = 1, Table 19)
        let data = reader.read_bytes(size).ok_or(ParseError::UnexpectedEof)?;
        generic::decode_mmr(data, total_width, height)?.0
    };

    let mut x = 0;
    widths
        .iter()
        .map(|&width| {
            let symbol = collective.sub_bitmap(x as i32, 0, width, height);
            x += width;
            symbol
        })
        .collect()
}

/// Decode the export flags and collect the exported symbols (6.5.10).
fn decode_exports(
    reader: &mut Reader<'_>,
    coding: &mut Coding<'_>,
    input_symbols: &[&Bitmap],
    new_symbols: Vec<Bitmap>,
    reporter: &mut impl Reporter,
) -> Result<Vec<Bitmap>> {
    let total = input_symbols.len() + new_symbols.len();
    let mut flags = Vec::with_capacity(total);

    // "1) Set: EXINDEX = 0, CUREXFLAG = 0"
    let mut current = false;

    while flags.len() < total {
        // "2) Decode a value using Table B.1 if SDHUFF is 1, or the IAEX
        // integer arithmetic decoding procedure if SDHUFF is 0."
        let run = match coding {
            Coding::Huffman { export_run, .. } => export_run.decode(reader)?,
            Coding::Arithmetic {
                decoder,
                export_run,
                ..
            } => export_run.decode(decoder)?,
        };

        let Some(run) = run else {
            reporter.report(
                Severity::Warning,
                &format!(
                    "export flags of symbol dictionary ended early, {} symbols are not exported",
                    total - flags.len()
                ),
            );
            flags.resize(total, false);
            break;
        };

        let run = usize::try_from(run).map_err(|_| SymbolError::InvalidExportRun)?;
        let left = total - flags.len();
        let run = if run > left {
            reporter.report(
                Severity::Warning,
                &format!("export run of {run} exceeds the {left} remaining symbols"),
            );
            left
        } else {
            run
        };

        // "3) Set EXFLAGS[EXINDEX] through EXFLAGS[EXINDEX + EXRUNLENGTH − 1]
        // to CUREXFLAG."
        flags.resize(flags.len() + run, current);
        current = !current;
    }

    let (input_flags, new_flags) = flags.split_at(input_symbols.len());

    let exported = input_symbols
        .iter()
        .zip(input_flags)
        .filter(|(_, exported)| **exported)
        .map(|(symbol, _)| (*symbol).clone())
        .chain(
            new_symbols
                .into_iter()
                .zip(new_flags)
                .filter(|(_, exported)| **exported)
                .map(|(symbol, _)| symbol),
        )
        .collect();

    Ok(exported)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bitmap::SET;
    use crate::mq::{Contexts, MqEncoder};
    use crate::store::{SegmentStore, StoredSegment};

    fn decode_data(data: &[u8], store: &SegmentStore, referred: &[u32]) -> Result<SymbolDictionary> {
        let mut references = store.references(referred)?;
        let mut reports = Vec::new();
        decode(&mut Reader::new(data), &mut references, &mut reports)
    }

    const NOMINAL_AT: [u8; 8] = [3, 0xFF, 0xFD, 0xFF, 2, 0xFE, 0xFE, 0xFE];

    fn arithmetic_header(flags: u16, exported: u32, new: u32) -> Vec<u8> {
        let mut data = Vec::new();
        data.extend(flags.to_be_bytes());
        data.extend(NOMINAL_AT);
        data.extend(exported.to_be_bytes());
        data.extend(new.to_be_bytes());
        data
    }

    /// Encode symbols of one height class with template 0 and the nominal
    /// adaptive pixels, exporting every symbol.
    fn encode_symbols(
        encoder: &mut MqEncoder,
        generic: &mut Contexts,
        symbols: &[Vec<Vec<u8>>],
        num_input: usize,
    ) {
        let mut iadh = Contexts::new(9);
        let mut iadw = Contexts::new(9);
        let mut iaex = Contexts::new(9);

        let height = symbols[0].len() as i32;
        encoder.encode_integer(&mut iadh, Some(height));

        let mut width = 0;
        for symbol in symbols {
            let w = symbol[0].len() as i32;
            encoder.encode_integer(&mut iadw, Some(w - width));
            width = w;

            for (y, row) in symbol.iter().enumerate() {
                for (x, &pixel) in row.iter().enumerate() {
                    let cx = crate::mq::generic_template0_context(symbol, x as i32, y as i32);
                    encoder.encode(generic, cx, pixel);
                }
            }
        }
        encoder.encode_integer(&mut iadw, None);

        encoder.encode_integer(&mut iaex, Some(num_input as i32));
        encoder.encode_integer(&mut iaex, Some(symbols.len() as i32));
    }

    fn rows(bitmap: &Bitmap) -> Vec<Vec<u8>> {
        (0..bitmap.height() as i32)
            .map(|y| (0..bitmap.width() as i32).map(|x| bitmap.pixel(x, y)).collect())
            .collect()
    }

    #[test]
    fn huffman_uncompressed_symbol() {
        let data = [
            0x00, 0x01, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x01, 0xB7, 0xE0, 0xC0, 0xC0,
            0x00, 0x40,
        ];
        let mut reader = Reader::new(&data);
        let mut references = References::default();
        let dictionary = decode(&mut reader, &mut references, &mut Vec::new()).unwrap();

        assert!(reader.at_end());
        assert_eq!(dictionary.symbols, [Bitmap::new(2, 2, SET).unwrap()]);
        assert!(dictionary.generic_state.is_none());
    }

    #[test]
    fn huffman_mmr_collective_bitmap() {
        // Two symbols of widths 3 and 5 in one 8 x 2 collective bitmap,
        // "WWBBBBWW" on both rows.
        let mut data = vec![0x00, 0x01];
        data.extend(2_u32.to_be_bytes());
        data.extend(2_u32.to_be_bytes());
        // HCDH 2 (10), DW 3 (1110 000), DW 2 (110), OOB (111111),
        // BMSIZE 2 (0 0010), padding.
        data.extend([0b1011_1000, 0b0110_1111, 0b1100_0100]);
        data.extend([0x2E, 0xFC]);
        // Runs 0 and 2 from table B.1.
        data.extend([0b0000_0000, 0b1000_0000]);

        let dictionary = decode_data(&data, &SegmentStore::new(), &[]).unwrap();

        assert_eq!(dictionary.symbols.len(), 2);
        assert_eq!(rows(&dictionary.symbols[0]), [[0, 0, 1], [0, 0, 1]]);
        assert_eq!(rows(&dictionary.symbols[1]), [[1, 1, 1, 0, 0], [1, 1, 1, 0, 0]]);
    }

    #[test]
    fn arithmetic_symbols() {
        let symbols = vec![
            vec![vec![1, 0, 1], vec![0, 1, 0], vec![1, 1, 1]],
            vec![vec![1, 1, 1, 1], vec![1, 0, 0, 1], vec![0, 1, 1, 0]],
        ];

        let mut encoder = MqEncoder::new();
        let mut generic = Contexts::new(16);
        encode_symbols(&mut encoder, &mut generic, &symbols, 0);

        let mut data = arithmetic_header(0x0000, 2, 2);
        data.extend(encoder.finish());

        let dictionary = decode_data(&data, &SegmentStore::new(), &[]).unwrap();
        let decoded: Vec<_> = dictionary.symbols.iter().map(rows).collect();

        assert_eq!(decoded, symbols);
    }

    #[test]
    fn exports_input_symbols() {
        let mut store = SegmentStore::new();
        store.insert(
            0,
            StoredSegment::SymbolDictionary(SymbolDictionary {
                symbols: vec![Bitmap::new(1, 1, SET).unwrap()],
                generic_state: None,
            }),
        );

        let symbols = vec![vec![vec![0, 1], vec![1, 0]]];
        let mut encoder = MqEncoder::new();
        let mut generic = Contexts::new(16);

        // Exports nothing of the input symbol, then the new symbol.
        encode_symbols(&mut encoder, &mut generic, &symbols, 1);
        let mut data = arithmetic_header(0x0000, 1, 1);
        data.extend(encoder.finish());

        let dictionary = decode_data(&data, &store, &[0]).unwrap();
        assert_eq!(dictionary.symbols.len(), 1);
        assert_eq!(rows(&dictionary.symbols[0]), symbols[0]);
    }

    /// One new 2 x 2 symbol followed by the given export runs.
    fn single_symbol_with_exports(runs: &[Option<i32>]) -> Vec<u8> {
        let symbol = vec![vec![1, 1], vec![1, 1]];
        let mut encoder = MqEncoder::new();
        let mut generic = Contexts::new(16);
        let mut iadh = Contexts::new(9);
        let mut iadw = Contexts::new(9);
        let mut iaex = Contexts::new(9);

        encoder.encode_integer(&mut iadh, Some(2));
        encoder.encode_integer(&mut iadw, Some(2));
        for (y, row) in symbol.iter().enumerate() {
            for (x, &pixel) in row.iter().enumerate() {
                let cx = crate::mq::generic_template0_context(&symbol, x as i32, y as i32);
                encoder.encode(&mut generic, cx, pixel);
            }
        }
        encoder.encode_integer(&mut iadw, None);
        for &run in runs {
            encoder.encode_integer(&mut iaex, run);
        }

        let mut data = arithmetic_header(0x0000, 1, 1);
        data.extend(encoder.finish());
        data
    }

    #[test]
    fn early_end_of_export_flags() {
        // A run of zero unexported symbols flips the flag, then OOB.
        let data = single_symbol_with_exports(&[Some(0), None]);

        let mut reports = Vec::new();
        let mut references = References::default();
        let dictionary = decode(&mut Reader::new(&data), &mut references, &mut reports).unwrap();

        assert!(dictionary.symbols.is_empty());
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].severity, Severity::Warning);
    }

    #[test]
    fn overlong_export_run() {
        let data = single_symbol_with_exports(&[Some(0), Some(5)]);

        let mut reports = Vec::new();
        let mut references = References::default();
        let dictionary = decode(&mut Reader::new(&data), &mut references, &mut reports).unwrap();

        assert_eq!(dictionary.symbols, [Bitmap::new(2, 2, SET).unwrap()]);
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].severity, Severity::Warning);
    }

    #[test]
    fn negative_export_run() {
        let data = single_symbol_with_exports(&[Some(-1)]);

        assert_eq!(
            decode_data(&data, &SegmentStore::new(), &[]).map(|d| d.symbols.len()),
            Err(SymbolError::InvalidExportRun.into())
        );
    }

    #[test]
    fn empty_symbols() {
        for (height, width) in [(0, 1), (1, 0)] {
            let mut encoder = MqEncoder::new();
            let mut iadh = Contexts::new(9);
            let mut iadw = Contexts::new(9);
            encoder.encode_integer(&mut iadh, Some(height));
            encoder.encode_integer(&mut iadw, Some(width));

            let mut data = arithmetic_header(0x0000, 1, 1);
            data.extend(encoder.finish());

            assert_eq!(
                decode_data(&data, &SegmentStore::new(), &[]).map(|d| d.symbols.len()),
                Err(RegionError::InvalidDimension.into()),
                "{width} x {height}"
            );
        }
    }

    #[test]
    fn too_many_symbols_in_height_class() {
        let symbols = vec![vec![vec![1]], vec![vec![1, 1]]];
        let mut encoder = MqEncoder::new();
        let mut generic = Contexts::new(16);
        encode_symbols(&mut encoder, &mut generic, &symbols, 0);

        let mut data = arithmetic_header(0x0000, 1, 1);
        data.extend(encoder.finish());

        assert_eq!(
            decode_data(&data, &SegmentStore::new(), &[]).map(|d| d.symbols.len()),
            Err(SymbolError::TooManySymbols.into())
        );
    }

    #[test]
    fn retained_contexts() {
        let first = vec![vec![vec![1, 0, 1, 1], vec![0, 1, 1, 0]]];
        let second = vec![vec![vec![0, 1, 1, 1], vec![1, 1, 0, 0]]];

        // The first dictionary retains its statistics.
        let mut encoder = MqEncoder::new();
        let mut generic = Contexts::new(16);
        encode_symbols(&mut encoder, &mut generic, &first, 0);
        let mut data = arithmetic_header(0x0200, 1, 1);
        data.extend(encoder.finish());

        let dictionary = decode_data(&data, &SegmentStore::new(), &[]).unwrap();
        assert!(dictionary.generic_state.is_some());

        let mut store = SegmentStore::new();
        store.insert(0, StoredSegment::SymbolDictionary(dictionary));

        // The second one continues with them and keeps the symbols of the
        // first one out of its exports.
        let mut encoder = MqEncoder::new();
        encode_symbols(&mut encoder, &mut generic, &second, 1);
        let mut data = arithmetic_header(0x0100, 1, 1);
        data.extend(encoder.finish());

        let dictionary = decode_data(&data, &store, &[0]).unwrap();
        assert_eq!(dictionary.symbols.len(), 1);
        assert_eq!(rows(&dictionary.symbols[0]), second[0]);

        // Without a referred dictionary there is nothing to continue with.
        assert_eq!(
            decode_data(&data, &SegmentStore::new(), &[]).map(|d| d.symbols.len()),
            Err(SymbolError::MissingContext.into())
        );
    }

    #[test]
    fn invalid_flags() {
        for flags in [0x2000_u16, 0x0080, 0x0004, 0x0401, 0x0101] {
            let mut data = flags.to_be_bytes().to_vec();
            data.extend([0; 16]);

            assert_eq!(
                decode_data(&data, &SegmentStore::new(), &[]).map(|d| d.symbols.len()),
                Err(SymbolError::InvalidFlags.into()),
                "{flags:#06x}"
            );
        }
    }

    #[test]
    fn refinement_is_unsupported() {
        let mut data = 0x0002_u16.to_be_bytes().to_vec();
        data.extend(NOMINAL_AT);
        data.extend([0xFF; 4]);
        data.extend([0; 8]);

        assert!(matches!(
            decode_data(&data, &SegmentStore::new(), &[]),
            Err(DecodeError::Unsupported(_))
        ));
    }
}
