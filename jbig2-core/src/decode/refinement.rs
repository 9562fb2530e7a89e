//! Generic refinement region decoding (6.3, 7.4.7).

use super::{AtPixel, RegionInfo, parse_at_pixels, parse_region_info};
use crate::arithmetic::{ArithmeticDecoder, ArithmeticState};
use crate::bitmap::{Bitmap, UNSET};
use crate::error::{FormatError, ParseError, RegionError, Result, bail};
use crate::reader::Reader;

/// A pixel of a refinement template, either in the bitmap being decoded or
/// in the reference bitmap.
#[derive(Debug, Clone, Copy)]
enum TemplatePixel {
    Region(i8, i8),
    /// GRAT1, in the bitmap being decoded.
    RegionAdaptive,
    Reference(i8, i8),
    /// GRAT2, in the reference bitmap.
    ReferenceAdaptive,
}

use TemplatePixel::{Reference, ReferenceAdaptive, Region, RegionAdaptive};

/// Figure 12. The first pixel is the most significant bit of the context.
const TEMPLATE0: [TemplatePixel; 13] = [
    RegionAdaptive,
    Region(0, -1),
    Region(1, -1),
    Region(-1, 0),
    ReferenceAdaptive,
    Reference(0, -1),
    Reference(1, -1),
    Reference(-1, 0),
    Reference(0, 0),
    Reference(1, 0),
    Reference(-1, 1),
    Reference(0, 1),
    Reference(1, 1),
];

/// Figure 13.
const TEMPLATE1: [TemplatePixel; 10] = [
    Region(-1, -1),
    Region(0, -1),
    Region(1, -1),
    Region(-1, 0),
    Reference(0, -1),
    Reference(-1, 0),
    Reference(0, 0),
    Reference(1, 0),
    Reference(0, 1),
    Reference(1, 1),
];

/// The default GRAT pixels, used when a template without adaptive pixels
/// is selected.
pub(crate) const DEFAULT_AT_PIXELS: [AtPixel; 2] = [AtPixel::new(-1, -1), AtPixel::new(-1, -1)];

pub(crate) fn context_bits(template: u8) -> u32 {
    if template == 0 { 13 } else { 10 }
}

/// Parameters of the generic refinement region decoding procedure
/// (Table 6).
#[derive(Debug, Clone, Copy)]
pub(crate) struct RefinementParams<'a> {
    pub(crate) width: u32,
    pub(crate) height: u32,
    /// GRTEMPLATE, 0 or 1.
    pub(crate) template: u8,
    /// GRREFERENCE.
    pub(crate) reference: &'a Bitmap,
    /// GRREFERENCEDX.
    pub(crate) reference_dx: i32,
    /// GRREFERENCEDY.
    pub(crate) reference_dy: i32,
    /// TPGRON.
    pub(crate) typical_prediction: bool,
    /// GRAT.
    pub(crate) at_pixels: &'a [AtPixel],
}

impl RefinementParams<'_> {
    fn template(&self) -> &'static [TemplatePixel] {
        if self.template == 0 { &TEMPLATE0 } else { &TEMPLATE1 }
    }

    fn at_pixel(&self, index: usize) -> (i32, i32) {
        let at = self
            .at_pixels
            .get(index)
            .copied()
            .unwrap_or(DEFAULT_AT_PIXELS[index]);
        (i32::from(at.x), i32::from(at.y))
    }

    /// The context of the pixel at (`x`, `y`) (6.3.5.3).
    fn context(&self, region: &Bitmap, x: i32, y: i32) -> usize {
        let ref_x = x - self.reference_dx;
        let ref_y = y - self.reference_dy;

        self.template().iter().fold(0, |cx, pixel| {
            let bit = match *pixel {
                Region(dx, dy) => region.pixel(x + i32::from(dx), y + i32::from(dy)),
                RegionAdaptive => {
                    let (dx, dy) = self.at_pixel(0);
                    region.pixel(x + dx, y + dy)
                }
                Reference(dx, dy) => self
                    .reference
                    .pixel(ref_x + i32::from(dx), ref_y + i32::from(dy)),
                ReferenceAdaptive => {
                    let (dx, dy) = self.at_pixel(1);
                    self.reference.pixel(ref_x + dx, ref_y + dy)
                }
            };

            (cx << 1) | usize::from(bit)
        })
    }

    /// The predicted value of a pixel, if the 3 x 3 neighbourhood of the
    /// corresponding reference pixel is uniform (TPGRPIX and TPGRVAL).
    fn predicted(&self, x: i32, y: i32) -> Option<u8> {
        let ref_x = x - self.reference_dx;
        let ref_y = y - self.reference_dy;
        let value = self.reference.pixel(ref_x, ref_y);

        let uniform = (-1..=1).all(|dy| {
            (-1..=1).all(|dx| self.reference.pixel(ref_x + dx, ref_y + dy) == value)
        });

        uniform.then_some(value)
    }
}

/// Decode a refinement bitmap (6.3.5.6).
///
/// `state` must have been reset for the context size of the template.
pub(crate) fn decode_bitmap(
    decoder: &mut ArithmeticDecoder<'_>,
    state: &mut ArithmeticState,
    params: &RefinementParams<'_>,
) -> Result<Bitmap> {
    let mut region = Bitmap::new(params.width, params.height, UNSET)?;

    // The context with only the reference pixel at the current position set
    // (Figures 14 and 15).
    let sltp_context = if params.template == 0 { 0x0010 } else { 0x0008 };

    // "1) Set LTP = 0."
    let mut ltp = 0;

    for y in 0..params.height as i32 {
        if params.typical_prediction {
            ltp ^= decoder.read_bit(sltp_context, state);
        }

        for x in 0..params.width as i32 {
            // "d) If LTP = 1 then, from left to right, implicitly decode
            // certain pixels of the current row of GRREG, and explicitly
            // decode the rest."
            let predicted = if ltp == 1 {
                params.predicted(x, y)
            } else {
                None
            };

            let pixel = match predicted {
                Some(value) => value,
                None => {
                    let cx = params.context(&region, x, y);
                    decoder.read_bit(cx, state)
                }
            };

            region.set_pixel(x as u32, y as u32, pixel);
        }
    }

    Ok(region)
}

/// Parsed generic refinement region segment header (7.4.7.2 to 7.4.7.3).
#[derive(Debug, Clone)]
pub(crate) struct RefinementHeader {
    pub(crate) info: RegionInfo,
    template: u8,
    typical_prediction: bool,
    at_pixels: Vec<AtPixel>,
}

pub(crate) fn parse_header(reader: &mut Reader<'_>) -> Result<RefinementHeader> {
    let info = parse_region_info(reader)?;

    // "Bit 0: GRTEMPLATE", "Bit 1: TPGRON", "Bits 2-7: Reserved; must be 0."
    let flags = reader.read_byte().ok_or(ParseError::UnexpectedEof)?;
    if flags & 0xFC != 0 {
        bail!(FormatError::ReservedBits);
    }

    let template = flags & 0x01;
    let at_pixels = if template == 0 {
        parse_at_pixels(reader, 2)?
    } else {
        Vec::new()
    };

    Ok(RefinementHeader {
        info,
        template,
        typical_prediction: flags & 0x02 != 0,
        at_pixels,
    })
}

/// Decode the data of a generic refinement region segment against its
/// reference bitmap, which must have the size of the region.
pub(crate) fn decode_region(
    reader: &mut Reader<'_>,
    header: &RefinementHeader,
    reference: &Bitmap,
) -> Result<Bitmap> {
    if reference.width() != header.info.width || reference.height() != header.info.height {
        bail!(RegionError::ReferenceSizeMismatch);
    }

    let params = RefinementParams {
        width: header.info.width,
        height: header.info.height,
        template: header.template,
        reference,
        reference_dx: 0,
        reference_dy: 0,
        typical_prediction: header.typical_prediction,
        at_pixels: &header.at_pixels,
    };

    let mut decoder = ArithmeticDecoder::new(reader.tail());
    reader.skip_to_end();

    let mut state = ArithmeticState::new(context_bits(header.template));
    decode_bitmap(&mut decoder, &mut state, &params)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::mq::{Contexts, MqEncoder};

    /// Arithmetically code `target` as a refinement of `params.reference`,
    /// without typical prediction.
    pub(crate) fn encode_refinement(
        encoder: &mut MqEncoder,
        contexts: &mut Contexts,
        params: &RefinementParams<'_>,
        target: &Bitmap,
    ) {
        let mut partial = Bitmap::new(target.width(), target.height(), UNSET).unwrap();

        for y in 0..target.height() as i32 {
            for x in 0..target.width() as i32 {
                let cx = params.context(&partial, x, y);
                let bit = target.pixel(x, y);
                encoder.encode(contexts, cx, bit);
                partial.set_pixel(x as u32, y as u32, bit);
            }
        }
    }

    fn reference() -> Bitmap {
        Bitmap::from_rows(&[
            &[0, 1, 1, 0, 0],
            &[1, 1, 1, 1, 0],
            &[0, 1, 1, 0, 0],
            &[0, 0, 1, 0, 0],
        ])
    }

    #[test]
    fn refines_both_templates() {
        let reference = reference();
        let target = Bitmap::from_rows(&[
            &[0, 1, 1, 1, 0],
            &[1, 1, 0, 1, 1],
            &[0, 1, 1, 0, 0],
            &[1, 0, 1, 0, 1],
        ]);
        let at_pixels = [AtPixel::new(-1, -1), AtPixel::new(1, 1)];

        for template in [0, 1] {
            let params = RefinementParams {
                width: 5,
                height: 4,
                template,
                reference: &reference,
                reference_dx: 1,
                reference_dy: -1,
                typical_prediction: false,
                at_pixels: &at_pixels,
            };

            let mut encoder = MqEncoder::new();
            let mut contexts = Contexts::new(context_bits(template));
            encode_refinement(&mut encoder, &mut contexts, &params, &target);
            let data = encoder.finish();

            let mut decoder = ArithmeticDecoder::new(&data);
            let mut state = ArithmeticState::new(context_bits(template));
            let decoded = decode_bitmap(&mut decoder, &mut state, &params).unwrap();

            assert_eq!(decoded, target, "template {template}");
        }
    }

    #[test]
    fn typical_prediction_of_uniform_areas() {
        // Every pixel of an empty reference has a uniform neighbourhood, so
        // with LTP set nothing but the SLTP bits is coded.
        let reference = Bitmap::new(6, 3, UNSET).unwrap();
        let params = RefinementParams {
            width: 6,
            height: 3,
            template: 1,
            reference: &reference,
            reference_dx: 0,
            reference_dy: 0,
            typical_prediction: true,
            at_pixels: &[],
        };

        let mut encoder = MqEncoder::new();
        let mut contexts = Contexts::new(10);
        for sltp in [1, 0, 0] {
            encoder.encode(&mut contexts, 0x0008, sltp);
        }
        let data = encoder.finish();

        let mut decoder = ArithmeticDecoder::new(&data);
        let mut state = ArithmeticState::new(10);
        let decoded = decode_bitmap(&mut decoder, &mut state, &params).unwrap();

        assert_eq!(decoded, reference);
    }

    #[test]
    fn region_segment() {
        let reference = reference();
        let target = Bitmap::from_rows(&[
            &[1, 1, 1, 0, 0],
            &[1, 1, 1, 1, 0],
            &[0, 1, 1, 0, 0],
            &[0, 0, 1, 1, 0],
        ]);

        let mut data = Vec::new();
        data.extend(5_u32.to_be_bytes());
        data.extend(4_u32.to_be_bytes());
        data.extend(2_u32.to_be_bytes());
        data.extend(1_u32.to_be_bytes());
        data.push(0x04);
        data.push(0x00);
        data.extend([0xFF, 0xFF, 0xFF, 0xFF]);

        let params = RefinementParams {
            width: 5,
            height: 4,
            template: 0,
            reference: &reference,
            reference_dx: 0,
            reference_dy: 0,
            typical_prediction: false,
            at_pixels: &DEFAULT_AT_PIXELS,
        };
        let mut encoder = MqEncoder::new();
        let mut contexts = Contexts::new(13);
        encode_refinement(&mut encoder, &mut contexts, &params, &target);
        data.extend(encoder.finish());

        let mut reader = Reader::new(&data);
        let header = parse_header(&mut reader).unwrap();
        assert_eq!((header.info.x, header.info.y), (2, 1));

        let decoded = decode_region(&mut reader, &header, &reference).unwrap();
        assert!(reader.at_end());
        assert_eq!(decoded, target);
    }

    #[test]
    fn reference_size_must_match() {
        let mut data = Vec::new();
        data.extend(4_u32.to_be_bytes());
        data.extend(4_u32.to_be_bytes());
        data.extend(0_u32.to_be_bytes());
        data.extend(0_u32.to_be_bytes());
        data.push(0x00);
        data.push(0x01);

        let mut reader = Reader::new(&data);
        let header = parse_header(&mut reader).unwrap();

        assert_eq!(
            decode_region(&mut reader, &header, &reference()),
            Err(RegionError::ReferenceSizeMismatch.into())
        );
    }

    #[test]
    fn reserved_flags() {
        let mut data = vec![0, 0, 0, 1, 0, 0, 0, 1, 0, 0, 0, 0, 0, 0, 0, 0, 0];
        data.push(0x04);

        assert_eq!(
            parse_header(&mut Reader::new(&data)).map(|h| h.info),
            Err(FormatError::ReservedBits.into())
        );
    }
}
