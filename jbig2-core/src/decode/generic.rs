//! Generic region decoding (6.2, 7.4.6).

use super::{AtPixel, RegionInfo, parse_at_pixels, parse_region_info};
use crate::arithmetic::{ArithmeticDecoder, ArithmeticState};
use crate::bitmap::{Bitmap, UNSET};
use crate::error::{FormatError, ParseError, RegionError, Result, TemplateError, bail};
use crate::reader::Reader;

/// A pixel of a context template, relative to the pixel being decoded.
#[derive(Debug, Clone, Copy)]
enum TemplatePixel {
    Fixed(i8, i8),
    /// The adaptive pixel with the given index.
    Adaptive(usize),
}

use TemplatePixel::{Adaptive, Fixed};

/// The template pixels of GBTEMPLATE 0 to 3 (Figures 3 to 6). The first
/// pixel ends up in the least significant bit of the context.
const TEMPLATES: [&[TemplatePixel]; 4] = [
    &[
        Fixed(-1, 0),
        Fixed(-2, 0),
        Fixed(-3, 0),
        Fixed(-4, 0),
        Adaptive(0),
        Fixed(2, -1),
        Fixed(1, -1),
        Fixed(0, -1),
        Fixed(-1, -1),
        Fixed(-2, -1),
        Adaptive(1),
        Adaptive(2),
        Fixed(1, -2),
        Fixed(0, -2),
        Fixed(-1, -2),
        Adaptive(3),
    ],
    &[
        Fixed(-1, 0),
        Fixed(-2, 0),
        Fixed(-3, 0),
        Adaptive(0),
        Fixed(2, -1),
        Fixed(1, -1),
        Fixed(0, -1),
        Fixed(-1, -1),
        Fixed(-2, -1),
        Fixed(2, -2),
        Fixed(1, -2),
        Fixed(0, -2),
        Fixed(-1, -2),
    ],
    &[
        Fixed(-1, 0),
        Fixed(-2, 0),
        Adaptive(0),
        Fixed(1, -1),
        Fixed(0, -1),
        Fixed(-1, -1),
        Fixed(-2, -1),
        Fixed(1, -2),
        Fixed(0, -2),
        Fixed(-1, -2),
    ],
    &[
        Fixed(-1, 0),
        Fixed(-2, 0),
        Fixed(-3, 0),
        Fixed(-4, 0),
        Adaptive(0),
        Fixed(1, -1),
        Fixed(0, -1),
        Fixed(-1, -1),
        Fixed(-2, -1),
        Fixed(-3, -1),
    ],
];

/// The contexts used to decode SLTP (Figures 8 to 11).
const SLTP_CONTEXTS: [usize; 4] = [0x9B25, 0x0795, 0x00E5, 0x0195];

/// The nominal adaptive pixel positions, as used by encoders that do not
/// move them.
#[cfg(test)]
pub(crate) const NOMINAL_AT_PIXELS: [AtPixel; 4] = [
    AtPixel::new(3, -1),
    AtPixel::new(-3, -1),
    AtPixel::new(2, -2),
    AtPixel::new(-2, -2),
];

/// The number of context bits of a template.
pub(crate) fn context_bits(template: u8) -> u32 {
    match template {
        0 => 16,
        1 => 13,
        _ => 10,
    }
}

/// The number of adaptive pixels a template uses.
pub(crate) fn at_pixel_count(template: u8) -> usize {
    if template == 0 { 4 } else { 1 }
}

/// Parameters of the generic region decoding procedure (Table 2).
#[derive(Debug, Clone, Copy)]
pub(crate) struct GenericParams<'a> {
    pub(crate) width: u32,
    pub(crate) height: u32,
    /// GBTEMPLATE, 0 to 3.
    pub(crate) template: u8,
    /// TPGDON.
    pub(crate) typical_prediction: bool,
    /// GBAT.
    pub(crate) at_pixels: &'a [AtPixel],
}

/// Decode a bitmap with template based arithmetic coding (6.2.5).
///
/// `state` must have been reset for the context size of the template.
pub(crate) fn decode_arithmetic(
    decoder: &mut ArithmeticDecoder<'_>,
    state: &mut ArithmeticState,
    params: &GenericParams<'_>,
) -> Result<Bitmap> {
    let template = *TEMPLATES
        .get(usize::from(params.template))
        .ok_or(TemplateError::Invalid)?;

    if params.at_pixels.len() < at_pixel_count(params.template) {
        bail!(TemplateError::Invalid);
    }

    // Resolve the adaptive pixels once.
    let offsets: Vec<(i32, i32)> = template
        .iter()
        .map(|pixel| match *pixel {
            Fixed(x, y) => (i32::from(x), i32::from(y)),
            Adaptive(i) => (
                i32::from(params.at_pixels[i].x),
                i32::from(params.at_pixels[i].y),
            ),
        })
        .collect();

    let mut bitmap = Bitmap::new(params.width, params.height, UNSET)?;

    // "1) Set: LTP = 0"
    let mut ltp = 0;

    for y in 0..params.height {
        // "b) If TPGDON is 1, then decode a bit using the arithmetic entropy
        // coder [...] Let SLTP be the value of this bit. Set: LTP = LTP XOR SLTP"
        if params.typical_prediction {
            let cx = SLTP_CONTEXTS[usize::from(params.template)];
            ltp ^= decoder.read_bit(cx, state);
        }

        // "c) If LTP = 1 then set every pixel of the current row of GBREG
        // equal to the corresponding pixel of the row immediately above."
        if ltp == 1 {
            if y > 0 {
                bitmap.copy_row(y, y - 1);
            }
            continue;
        }

        // "d) If LTP = 0 then, from left to right, decode each pixel of the
        // current row of GBREG."
        for x in 0..params.width {
            let (xi, yi) = (x as i32, y as i32);
            let cx = offsets
                .iter()
                .enumerate()
                .fold(0_usize, |cx, (bit, &(dx, dy))| {
                    cx | usize::from(bitmap.pixel(xi + dx, yi + dy)) << bit
                });

            let pixel = decoder.read_bit(cx, state);
            bitmap.set_pixel(x, y, pixel);
        }
    }

    Ok(bitmap)
}

/// Decode an MMR coded bitmap (6.2.6).
///
/// Returns the bitmap and the number of bytes that were consumed.
pub(crate) fn decode_mmr(data: &[u8], width: u32, height: u32) -> Result<(Bitmap, usize)> {
    struct Sink<'a> {
        bitmap: &'a mut Bitmap,
        x: u32,
        y: u32,
    }

    impl jbig2_mmr::Decoder for Sink<'_> {
        fn push_pixels(&mut self, black: bool, count: usize) {
            // "Pixels decoded by the MMR decoder having the value 'black'
            // shall be treated as having the value 1."
            for _ in 0..count {
                self.bitmap.set_pixel(self.x, self.y, u8::from(black));
                self.x += 1;
            }
        }

        fn next_line(&mut self) {
            self.x = 0;
            self.y += 1;
        }
    }

    let mut bitmap = Bitmap::new(width, height, UNSET)?;
    let mut sink = Sink {
        bitmap: &mut bitmap,
        x: 0,
        y: 0,
    };

    let settings = jbig2_mmr::DecodeSettings {
        columns: width,
        rows: height,
        // "If the number of bytes contained in the encoded bitmap is known in
        // advance, then it is permissible for the data stream not to contain
        // an EOFB."
        end_of_block: true,
    };

    let consumed = jbig2_mmr::decode(data, &mut sink, &settings)?;

    Ok((bitmap, consumed))
}

/// Decode a generic region segment (7.4.6).
///
/// If the segment had an unknown data length, its data ends with the row
/// count (7.4.6.4), which replaces the region height.
pub(crate) fn decode_region(
    reader: &mut Reader<'_>,
    unknown_length: bool,
) -> Result<(RegionInfo, Bitmap)> {
    let mut info = parse_region_info(reader)?;

    // 7.4.6.2: "Bit 0: MMR", "Bits 1-2: GBTEMPLATE", "Bit 3: TPGDON"
    let flags = reader.read_byte().ok_or(ParseError::UnexpectedEof)?;
    if flags & 0xF0 != 0 {
        bail!(FormatError::ReservedBits);
    }

    let mmr = flags & 0x01 != 0;
    let template = (flags >> 1) & 0x03;
    let typical_prediction = flags & 0x08 != 0;

    let at_pixels = if mmr {
        Vec::new()
    } else {
        parse_at_pixels(reader, at_pixel_count(template))?
    };

    let mut data = reader.tail();
    reader.skip_to_end();

    if unknown_length {
        let Some(split) = data.len().checked_sub(4) else {
            bail!(ParseError::UnexpectedEof);
        };
        let (coded, row_count) = data.split_at(split);
        let row_count = u32::from_be_bytes([row_count[0], row_count[1], row_count[2], row_count[3]]);

        // "[...] it must be no greater than the region segment bitmap height
        // value in the segment's region segment information field."
        if row_count > info.height {
            bail!(RegionError::InvalidDimension);
        }

        info.height = row_count;
        data = coded;
    }

    let bitmap = if mmr {
        decode_mmr(data, info.width, info.height)?.0
    } else {
        let mut decoder = ArithmeticDecoder::new(data);
        let mut state = ArithmeticState::new(context_bits(template));
        let params = GenericParams {
            width: info.width,
            height: info.height,
            template,
            typical_prediction,
            at_pixels: &at_pixels,
        };

        decode_arithmetic(&mut decoder, &mut state, &params)?
    };

    Ok((info, bitmap))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mq::{Contexts, MqEncoder, encode_generic_template0, generic_template0_context};

    fn rows(bitmap: &Bitmap) -> Vec<Vec<u8>> {
        (0..bitmap.height() as i32)
            .map(|y| (0..bitmap.width() as i32).map(|x| bitmap.pixel(x, y)).collect())
            .collect()
    }

    fn decode_template0(data: &[u8], width: u32, height: u32, tpgdon: bool) -> Bitmap {
        let mut decoder = ArithmeticDecoder::new(data);
        let mut state = ArithmeticState::new(16);
        let params = GenericParams {
            width,
            height,
            template: 0,
            typical_prediction: tpgdon,
            at_pixels: &NOMINAL_AT_PIXELS,
        };

        decode_arithmetic(&mut decoder, &mut state, &params).unwrap()
    }

    #[test]
    fn all_background() {
        let mut encoder = MqEncoder::new();
        let mut contexts = Contexts::new(16);
        for _ in 0..64 {
            encoder.encode(&mut contexts, 0, 0);
        }
        let data = encoder.finish();

        let bitmap = decode_template0(&data, 8, 8, false);
        assert_eq!(bitmap, Bitmap::new(8, 8, UNSET).unwrap());
    }

    #[test]
    fn pattern() {
        let expected: Vec<Vec<u8>> = (0..12)
            .map(|y| (0..17).map(|x| u8::from((x * 3 + y * 5) % 7 < 3)).collect())
            .collect();
        let data = encode_generic_template0(&expected);

        let bitmap = decode_template0(&data, 17, 12, false);
        assert_eq!(rows(&bitmap), expected);
    }

    #[test]
    fn typical_prediction_copies_rows() {
        // SLTP = 1 on the first row turns LTP on, so the first row stays
        // empty. The second row flips it back and is coded pixel by pixel.
        let image = vec![vec![0, 0, 0, 0], vec![1, 0, 0, 0]];
        let mut encoder = MqEncoder::new();
        let mut contexts = Contexts::new(16);
        encoder.encode(&mut contexts, 0x9B25, 1);
        encoder.encode(&mut contexts, 0x9B25, 1);
        for x in 0..4 {
            let cx = generic_template0_context(&image, x, 1);
            encoder.encode(&mut contexts, cx, image[1][x as usize]);
        }
        encoder.encode(&mut contexts, 0x9B25, 1);
        let data = encoder.finish();

        let bitmap = decode_template0(&data, 4, 3, true);
        assert_eq!(
            bitmap,
            Bitmap::from_rows(&[&[0, 0, 0, 0], &[1, 0, 0, 0], &[1, 0, 0, 0]])
        );
    }

    #[test]
    fn mmr_bitmap() {
        // Two rows of "WWBBBBWW": horizontal mode, then vertical 0 twice and
        // a run to the end on the second row.
        let (bitmap, consumed) = decode_mmr(&[0x2E, 0xFC], 8, 2).unwrap();

        assert_eq!(consumed, 2);
        assert_eq!(
            rows(&bitmap),
            [[0, 0, 1, 1, 1, 1, 0, 0], [0, 0, 1, 1, 1, 1, 0, 0]]
        );
    }

    #[test]
    fn region_segment() {
        let expected: Vec<Vec<u8>> = (0..5)
            .map(|y| (0..9).map(|x| u8::from(x == y || x == 8 - y)).collect())
            .collect();

        let mut data = Vec::new();
        data.extend(9_u32.to_be_bytes());
        data.extend(5_u32.to_be_bytes());
        data.extend(0_u32.to_be_bytes());
        data.extend(0_u32.to_be_bytes());
        data.push(0x04);
        data.push(0x00);
        data.extend([3, 0xFF, 0xFD, 0xFF, 2, 0xFE, 0xFE, 0xFE]);
        data.extend(encode_generic_template0(&expected));

        let mut reader = Reader::new(&data);
        let (info, bitmap) = decode_region(&mut reader, false).unwrap();

        assert!(reader.at_end());
        assert_eq!((info.width, info.height), (9, 5));
        assert_eq!(rows(&bitmap), expected);
    }

    #[test]
    fn row_count_of_unknown_length_region() {
        let expected = vec![vec![1, 0, 1, 1], vec![0, 1, 1, 0]];

        let mut data = Vec::new();
        data.extend(4_u32.to_be_bytes());
        data.extend(10_u32.to_be_bytes());
        data.extend(0_u32.to_be_bytes());
        data.extend(0_u32.to_be_bytes());
        data.push(0x00);
        data.push(0x00);
        data.extend([3, 0xFF, 0xFD, 0xFF, 2, 0xFE, 0xFE, 0xFE]);
        data.extend(encode_generic_template0(&expected));
        data.extend(2_u32.to_be_bytes());

        let (info, bitmap) = decode_region(&mut Reader::new(&data), true).unwrap();
        assert_eq!(info.height, 2);
        assert_eq!(rows(&bitmap), expected);

        let len = data.len();
        data[len - 1] = 11;
        assert_eq!(
            decode_region(&mut Reader::new(&data), true).map(|(info, _)| info),
            Err(RegionError::InvalidDimension.into())
        );
    }

    #[test]
    fn reserved_flags() {
        let mut data = vec![0, 0, 0, 1, 0, 0, 0, 1, 0, 0, 0, 0, 0, 0, 0, 0, 0];
        data.push(0x10);

        assert_eq!(
            decode_region(&mut Reader::new(&data), false).map(|(info, _)| info),
            Err(FormatError::ReservedBits.into())
        );
    }
}
